//! SHA256 hashing for content identity

use sha2::{Digest, Sha256};

/// Compute the content hash stored alongside file content.
///
/// Lowercase hex SHA256 over the UTF-8 bytes of `content`.
pub fn content_hash(content: &str) -> String {
    sha256(content.as_bytes())
}

/// Compute SHA256 hash of data
pub fn sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
