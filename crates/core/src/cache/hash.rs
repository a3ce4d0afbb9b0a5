//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute the primary key of an entry from its generation and request URL.
///
/// The same URL gets a distinct key in every generation, so generations never
/// share rows.
pub fn compute_entry_key(generation: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(generation.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_entry_key("dashboard-shell-v1", "https://app.test/");
        let hash2 = compute_entry_key("dashboard-shell-v1", "https://app.test/");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_different_generation() {
        let v1 = compute_entry_key("dashboard-shell-v1", "https://app.test/");
        let v2 = compute_entry_key("dashboard-shell-v2", "https://app.test/");
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_hash_separator_prevents_collisions() {
        let a = compute_entry_key("ab", "c");
        let b = compute_entry_key("a", "bc");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_entry_key("dashboard-shell-v1", "https://app.test/");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
