//! Local file resolution
//!
//! Resolves media-root-relative paths to on-disk files. Traversal outside the
//! root is rejected rather than resolved. A successful [`Resolved::Found`]
//! only guarantees the file existed at the moment of the check; callers must
//! treat a failed read afterwards as equivalent to not-found.

use std::path::{Component, Path, PathBuf};

/// Result of resolving a media-root-relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// File exists under the media root
    Found(PathBuf),
    /// File is absent; `expected` is the absolute path that was checked
    NotFound { expected: PathBuf },
}

/// Resolves stored relative paths against a configured media root
#[derive(Debug, Clone)]
pub struct LocalResolver {
    media_root: PathBuf,
}

impl LocalResolver {
    pub fn new(media_root: impl Into<PathBuf>) -> Self {
        Self {
            media_root: media_root.into(),
        }
    }

    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// Resolve a relative path against the media root.
    pub fn resolve(&self, rel: &str) -> Resolved {
        let rel = rel.trim_start_matches('/');
        let expected = self.media_root.join(rel);

        if Path::new(rel)
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Resolved::NotFound { expected };
        }

        if expected.is_file() {
            Resolved::Found(expected)
        } else {
            Resolved::NotFound { expected }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_existing_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("properties")).unwrap();
        std::fs::write(root.path().join("properties/house.jpg"), b"jpeg").unwrap();

        let resolver = LocalResolver::new(root.path());
        assert_eq!(
            resolver.resolve("properties/house.jpg"),
            Resolved::Found(root.path().join("properties/house.jpg"))
        );
    }

    #[test]
    fn test_resolve_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let resolver = LocalResolver::new(root.path());

        assert_eq!(
            resolver.resolve("properties/missing.jpg"),
            Resolved::NotFound {
                expected: root.path().join("properties/missing.jpg")
            }
        );
    }

    #[test]
    fn test_leading_slash_is_root_relative() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("properties")).unwrap();
        std::fs::write(root.path().join("properties/house.jpg"), b"jpeg").unwrap();

        let resolver = LocalResolver::new(root.path());
        assert_eq!(
            resolver.resolve("/properties/house.jpg"),
            Resolved::Found(root.path().join("properties/house.jpg"))
        );
    }

    #[test]
    fn test_traversal_is_rejected_even_when_target_exists() {
        let root = tempfile::tempdir().unwrap();
        let media = root.path().join("media");
        std::fs::create_dir_all(&media).unwrap();
        std::fs::write(root.path().join("outside.jpg"), b"jpeg").unwrap();

        let resolver = LocalResolver::new(&media);
        assert!(matches!(
            resolver.resolve("../outside.jpg"),
            Resolved::NotFound { .. }
        ));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("properties")).unwrap();

        let resolver = LocalResolver::new(root.path());
        assert!(matches!(
            resolver.resolve("properties"),
            Resolved::NotFound { .. }
        ));
    }
}
