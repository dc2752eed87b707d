//! Stable hashing for fragment IDs

use sha2::{Digest, Sha256};

/// First 16 hex chars of SHA-256 over the path and the first 1000 chars of content.
pub fn fragment_id(path: &str, content: &str) -> String {
    let content_prefix: String = content.chars().take(1000).collect();
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(b"\0");
    hasher.update(content_prefix.as_bytes());
    format!("{:x}", hasher.finalize())[..16].to_string()
}
