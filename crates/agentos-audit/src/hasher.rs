// hasher.rs — SHA-256 hashing utilities.
//
// All hashes in the flight recorder are SHA-256, hex-encoded. The genesis
// `prev_hash` is the all-zero 32-byte digest per spec: 64 `'0'` characters.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::AuditError;

/// The genesis `prev_hash`: a 32-byte all-zero digest, hex-encoded (64 chars).
pub fn genesis_hash() -> String {
    "0".repeat(64)
}

/// Hash arbitrary bytes, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Hash a UTF-8 string, returning a lowercase hex-encoded SHA-256 string.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}

/// Hash the contents of a file on disk.
pub fn hash_file(path: &Path) -> Result<String, AuditError> {
    let data = std::fs::read(path).map_err(|source| AuditError::HashFileFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hash_bytes(&data))
}

/// `entry_hash = SHA256(prev_hash || canonical_bytes_excluding_entry_hash)`.
///
/// `canonical_bytes` must already exclude the `entry_hash` field itself —
/// callers build it from the entry with that field blanked.
pub fn chain_hash(prev_hash: &str, canonical_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(canonical_bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_determinism() {
        let input = b"hello world";
        assert_eq!(hash_bytes(input), hash_bytes(input));
    }

    #[test]
    fn hash_uniqueness() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn hash_known_value() {
        assert_eq!(
            hash_str(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn genesis_hash_is_all_zero_and_64_chars() {
        let g = genesis_hash();
        assert_eq!(g.len(), 64);
        assert!(g.chars().all(|c| c == '0'));
    }

    #[test]
    fn chain_hash_changes_with_prev() {
        let a = chain_hash(&genesis_hash(), b"payload");
        let b = chain_hash("deadbeef", b"payload");
        assert_ne!(a, b);
    }
}
