//! Remote store contract
//!
//! Capability surface the engine needs from whichever object store backs the
//! CDN: existence by identifier and upload-by-content. The engine, not the
//! store, is responsible for never uploading an already-migrated reference.

use async_trait::async_trait;
use thiserror::Error;

use medrec_common::checksum::short_digest;

/// Remote store failures, split by whether retrying can help
#[derive(Error, Debug, Clone)]
pub enum RemoteStoreError {
    /// Network trouble, timeouts, throttling; retried by the caller
    #[error("transient remote store error: {0}")]
    Transient(String),

    /// Bad credentials or a rejected request; aborts the batch
    #[error("permanent remote store error: {0}")]
    Permanent(String),
}

impl RemoteStoreError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, RemoteStoreError::Permanent(_))
    }
}

/// A successfully stored remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Stable identifier, sufficient to reconstruct `url` without
    /// re-uploading
    pub identifier: String,
    /// Canonical URL the CDN serves the object from
    pub url: String,
}

/// External collaborator contract for the remote object/CDN store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Does an object with this identifier exist?
    async fn exists(&self, identifier: &str) -> Result<bool, RemoteStoreError>;

    /// Upload bytes under the given folder and file name, returning the
    /// assigned identifier and canonical URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        name: &str,
    ) -> Result<RemoteObject, RemoteStoreError>;
}

/// Optional pre-upload side filter (resize, re-encode). Applied to the bytes
/// just before upload; not part of the reconciliation decision itself.
pub trait PreUploadHook: Send + Sync {
    fn apply(&self, bytes: Vec<u8>, name: &str) -> anyhow::Result<Vec<u8>>;
}

/// Canonical content-addressed key for an upload:
/// `<folder>/<stem>-<digest><.ext>`.
///
/// The digest suffix makes re-uploads of identical bytes land on the same
/// key, and makes keys this tool wrote recognizable to the classifier.
pub fn canonical_key(folder: &str, name: &str, bytes: &[u8]) -> String {
    let digest = short_digest(bytes);
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let folder = folder.trim_matches('/');
    match ext {
        Some(ext) => format!("{}/{}-{}.{}", folder, stem, digest, ext),
        None => format!("{}/{}-{}", folder, stem, digest),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::reference::{classify, AssetReference, ClassifierConfig};

    #[test]
    fn test_canonical_key_keeps_extension() {
        let key = canonical_key("properties", "house.jpg", b"hello world");
        assert_eq!(key, "properties/house-b94d27.jpg");
    }

    #[test]
    fn test_canonical_key_without_extension() {
        let key = canonical_key("properties", "house", b"hello world");
        assert_eq!(key, "properties/house-b94d27");
    }

    #[test]
    fn test_canonical_key_trims_folder_slashes() {
        let key = canonical_key("/properties/", "house.jpg", b"hello world");
        assert_eq!(key, "properties/house-b94d27.jpg");
    }

    #[test]
    fn test_canonical_key_round_trips_through_classifier() {
        let key = canonical_key("properties", "house.jpg", b"jpeg bytes");
        let cfg = ClassifierConfig::new("cdn.example.com");
        assert_eq!(classify(&key, &cfg), AssetReference::RemoteIdentifier(key));
    }
}
