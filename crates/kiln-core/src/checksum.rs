//! SHA-256 content hashing for change detection.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of a string
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let result = hasher.finalize();
    format!("{:x}", result)
}
