//! Content hashing for index invalidation.
//!
//! Change detection only, not security: a fast non-cryptographic hash of
//! the concatenated source documents. The stored index is valid only while
//! the hash of the current content matches the stamped one.

use std::hash::Hasher;
use twox_hash::XxHash64;

/// Hash the two source documents into a fixed-width hex stamp.
pub fn content_hash(primary: &str, secondary: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(primary.as_bytes());
    hasher.write(secondary.as_bytes());
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_content_same_hash() {
        assert_eq!(content_hash("rules", "expansion"), content_hash("rules", "expansion"));
    }

    #[test]
    fn changed_content_changes_hash() {
        let base = content_hash("rules", "expansion");
        assert_ne!(base, content_hash("rules v2", "expansion"));
        assert_ne!(base, content_hash("rules", "expansion v2"));
    }
}
