//! Reference classification
//!
//! Turns the raw string persisted in a record field into a typed
//! [`AssetReference`]. Classification is a pure function of the raw value and
//! the classifier configuration; it never touches the filesystem or network.
//! All downstream logic switches on the variant, never on ad hoc string
//! probing.

use serde::Serialize;
use url::Url;

use medrec_common::checksum::SHORT_DIGEST_LEN;

/// Longest digest suffix recognized as a canonical key.
const MAX_DIGEST_LEN: usize = 12;

/// Classifier configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// CDN hostname treated as definitive evidence that a URL is already
    /// migrated.
    pub trusted_host: String,
}

impl ClassifierConfig {
    pub fn new(trusted_host: impl Into<String>) -> Self {
        Self {
            trusted_host: trusted_host.into(),
        }
    }
}

/// The classified form of a raw stored value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AssetReference {
    /// No value
    Empty,
    /// Path relative to the local media root (leading `/` stripped)
    LocalPath(String),
    /// Absolute URL; `trusted` flags whether its host is the trusted CDN
    RemoteUrl { url: String, trusted: bool },
    /// Bare identifier already representing a remote asset
    RemoteIdentifier(String),
    /// Non-empty value matching no known shape; never silently coerced
    Unresolvable(String),
}

/// Classify a raw stored field value.
///
/// Shapes, in match order:
///
/// - blank → [`AssetReference::Empty`]
/// - `http://`/`https://` prefix → [`AssetReference::RemoteUrl`]
/// - `..` traversal anywhere → [`AssetReference::Unresolvable`]
/// - final segment stem carrying a content-digest suffix (`house-abc123.jpg`,
///   the shape uploads emit) → [`AssetReference::RemoteIdentifier`]
/// - separator plus extension (`properties/house.jpg`) →
///   [`AssetReference::LocalPath`]
/// - separator without extension (`properties/house`, extension-less public
///   id) → [`AssetReference::RemoteIdentifier`]
/// - bare token without separator or extension → assumed already-migrated
///   [`AssetReference::RemoteIdentifier`]; callers should confirm with a
///   remote existence check before trusting it
/// - anything else → [`AssetReference::Unresolvable`]
pub fn classify(raw: &str, config: &ClassifierConfig) -> AssetReference {
    let value = raw.trim();
    if value.is_empty() {
        return AssetReference::Empty;
    }

    if value.starts_with("http://") || value.starts_with("https://") {
        return match Url::parse(value) {
            Ok(url) => AssetReference::RemoteUrl {
                url: value.to_string(),
                trusted: url.host_str() == Some(config.trusted_host.as_str()),
            },
            Err(_) => AssetReference::Unresolvable(value.to_string()),
        };
    }

    if has_traversal(value) {
        return AssetReference::Unresolvable(value.to_string());
    }

    let path = value.trim_start_matches('/');
    if path.is_empty() {
        return AssetReference::Unresolvable(value.to_string());
    }

    if has_digest_suffix(path) {
        return AssetReference::RemoteIdentifier(path.to_string());
    }

    let has_separator = path.contains('/');
    let has_extension = extension_of(path).is_some();

    match (has_separator, has_extension) {
        (true, true) => AssetReference::LocalPath(path.to_string()),
        (true, false) => AssetReference::RemoteIdentifier(path.to_string()),
        (false, false) if is_plain_token(path) => {
            AssetReference::RemoteIdentifier(path.to_string())
        }
        _ => AssetReference::Unresolvable(value.to_string()),
    }
}

/// Derive the canonical identifier carried by a remote URL.
///
/// Takes the path after `/upload/`, strips a leading `v<digits>/` version
/// segment, and percent-decodes the remainder. URLs without an `/upload/`
/// segment fall back to the bare URL path.
pub fn derive_identifier(url: &str) -> Option<String> {
    let part = if let Some(idx) = url.find("/upload/") {
        &url[idx + "/upload/".len()..]
    } else {
        // Fallback: just drop scheme and host.
        let parsed = Url::parse(url).ok()?;
        let path = parsed.path().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        return decode_segmentwise(strip_version_segment(path));
    };

    if part.is_empty() {
        return None;
    }
    decode_segmentwise(strip_version_segment(part))
}

/// Strip a leading `v<digits>/` version segment.
fn strip_version_segment(path: &str) -> &str {
    if let Some((first, rest)) = path.split_once('/') {
        let mut chars = first.chars();
        if chars.next() == Some('v') && first.len() > 1 && chars.all(|c| c.is_ascii_digit()) {
            return rest;
        }
    }
    path
}

fn decode_segmentwise(path: &str) -> Option<String> {
    let decoded = urlencoding::decode(path).ok()?.into_owned();
    if decoded.trim().is_empty() {
        None
    } else {
        Some(decoded)
    }
}

/// True when any path segment is `..`.
fn has_traversal(value: &str) -> bool {
    value.split(['/', '\\']).any(|segment| segment == "..")
}

/// Extension of the final path segment, when it looks like a media file
/// extension (1-5 alphanumeric characters after a dot).
fn extension_of(path: &str) -> Option<&str> {
    let last = path.rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
        return None;
    }
    if ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}

/// Whether the final segment's stem ends in `-<hex digest>` of the length
/// canonical uploads emit. Recognizing this shape is what keeps
/// classification pure: a value this tool wrote is identifiable without I/O.
fn has_digest_suffix(path: &str) -> bool {
    let last = match path.rsplit('/').next() {
        Some(segment) => segment,
        None => return false,
    };
    let stem = match last.rsplit_once('.') {
        Some((stem, ext))
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            stem
        }
        Some(_) => return false,
        None => last,
    };
    let suffix = match stem.rsplit_once('-') {
        Some((head, suffix)) if !head.is_empty() => suffix,
        _ => return false,
    };
    suffix.len() >= SHORT_DIGEST_LEN
        && suffix.len() <= MAX_DIGEST_LEN
        && suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

/// Bare identifier token: alphanumerics plus `-`, `_`.
fn is_plain_token(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn cfg() -> ClassifierConfig {
        ClassifierConfig::new("cdn.example.com")
    }

    #[test]
    fn test_blank_values_are_empty() {
        assert_eq!(classify("", &cfg()), AssetReference::Empty);
        assert_eq!(classify("   ", &cfg()), AssetReference::Empty);
        assert_eq!(classify("\t\n", &cfg()), AssetReference::Empty);
    }

    #[test]
    fn test_trusted_url() {
        let raw = "https://cdn.example.com/upload/v17/properties/house.jpg";
        assert_eq!(
            classify(raw, &cfg()),
            AssetReference::RemoteUrl {
                url: raw.to_string(),
                trusted: true,
            }
        );
    }

    #[test]
    fn test_untrusted_url() {
        let raw = "https://other.example.net/upload/properties/house.jpg";
        assert_eq!(
            classify(raw, &cfg()),
            AssetReference::RemoteUrl {
                url: raw.to_string(),
                trusted: false,
            }
        );
    }

    #[test]
    fn test_http_scheme_is_still_remote() {
        let raw = "http://cdn.example.com/upload/properties/house.jpg";
        assert_eq!(
            classify(raw, &cfg()),
            AssetReference::RemoteUrl {
                url: raw.to_string(),
                trusted: true,
            }
        );
    }

    #[test]
    fn test_malformed_url_is_unresolvable() {
        assert_eq!(
            classify("http://", &cfg()),
            AssetReference::Unresolvable("http://".to_string())
        );
    }

    #[test]
    fn test_local_path() {
        assert_eq!(
            classify("properties/house.jpg", &cfg()),
            AssetReference::LocalPath("properties/house.jpg".to_string())
        );
    }

    #[test]
    fn test_leading_slash_stripped() {
        assert_eq!(
            classify("/properties/house.jpg", &cfg()),
            AssetReference::LocalPath("properties/house.jpg".to_string())
        );
    }

    #[test]
    fn test_digest_suffixed_key_is_remote_identifier() {
        assert_eq!(
            classify("properties/house-abc123.jpg", &cfg()),
            AssetReference::RemoteIdentifier("properties/house-abc123.jpg".to_string())
        );
    }

    #[test]
    fn test_non_hex_suffix_is_local_path() {
        // "cottage" is not a hex digest even though it follows a dash.
        assert_eq!(
            classify("properties/stone-cottage.jpg", &cfg()),
            AssetReference::LocalPath("properties/stone-cottage.jpg".to_string())
        );
    }

    #[test]
    fn test_extensionless_public_id() {
        assert_eq!(
            classify("properties/house", &cfg()),
            AssetReference::RemoteIdentifier("properties/house".to_string())
        );
    }

    #[test]
    fn test_bare_token_is_remote_identifier() {
        assert_eq!(
            classify("placeholder_cover", &cfg()),
            AssetReference::RemoteIdentifier("placeholder_cover".to_string())
        );
    }

    #[test]
    fn test_bare_filename_is_unresolvable() {
        assert_eq!(
            classify("house.jpg", &cfg()),
            AssetReference::Unresolvable("house.jpg".to_string())
        );
    }

    #[test]
    fn test_traversal_is_unresolvable() {
        assert_eq!(
            classify("../etc/passwd.txt", &cfg()),
            AssetReference::Unresolvable("../etc/passwd.txt".to_string())
        );
        assert_eq!(
            classify("properties/../../secret.jpg", &cfg()),
            AssetReference::Unresolvable("properties/../../secret.jpg".to_string())
        );
    }

    #[test]
    fn test_garbage_is_unresolvable() {
        assert_eq!(
            classify("???", &cfg()),
            AssetReference::Unresolvable("???".to_string())
        );
    }

    #[test]
    fn test_derive_identifier_with_version_segment() {
        assert_eq!(
            derive_identifier("https://cdn.example.com/upload/v17/properties/house.jpg"),
            Some("properties/house.jpg".to_string())
        );
    }

    #[test]
    fn test_derive_identifier_without_version() {
        assert_eq!(
            derive_identifier("https://cdn.example.com/upload/properties/house.jpg"),
            Some("properties/house.jpg".to_string())
        );
    }

    #[test]
    fn test_derive_identifier_percent_decodes() {
        assert_eq!(
            derive_identifier("https://cdn.example.com/upload/v3/properties/lake%20house.jpg"),
            Some("properties/lake house.jpg".to_string())
        );
    }

    #[test]
    fn test_derive_identifier_no_upload_segment_falls_back_to_path() {
        assert_eq!(
            derive_identifier("https://img.example.net/properties/house.jpg"),
            Some("properties/house.jpg".to_string())
        );
    }

    #[test]
    fn test_derive_identifier_bare_host() {
        assert_eq!(derive_identifier("https://cdn.example.com/"), None);
        assert_eq!(derive_identifier("https://cdn.example.com/upload/"), None);
    }

    #[test]
    fn test_version_segment_only_strips_digits() {
        // "vault/house.jpg" keeps its first segment.
        assert_eq!(
            derive_identifier("https://cdn.example.com/upload/vault/house.jpg"),
            Some("vault/house.jpg".to_string())
        );
    }
}
