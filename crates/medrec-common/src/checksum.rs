//! Content digests for media assets
//!
//! Canonical asset keys embed a short SHA-256 digest of the file bytes, so
//! re-uploading identical content always lands on the same remote key.

use sha2::{Digest, Sha256};

/// Number of hex characters embedded in canonical asset keys.
pub const SHORT_DIGEST_LEN: usize = 6;

/// Short content digest used as the key suffix (`house-abc123.jpg`).
pub fn short_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let full = hex::encode(hasher.finalize());
    full[..SHORT_DIGEST_LEN].to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_short_digest_known_value() {
        // First SHORT_DIGEST_LEN hex chars of sha256("hello world").
        assert_eq!(short_digest(b"hello world"), "b94d27");
    }

    #[test]
    fn test_short_digest_is_lowercase_hex() {
        let digest = short_digest(b"properties/house.jpg");
        assert_eq!(digest.len(), SHORT_DIGEST_LEN);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
