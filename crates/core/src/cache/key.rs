//! Request-identity cache key generation.

use sha2::{Digest, Sha256};

/// Compute the cache key identifying a request: method + canonical URL.
pub fn identity_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = identity_key("GET", "https://example.com/");
        let key2 = identity_key("GET", "https://example.com/");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_differs_by_method() {
        let get = identity_key("GET", "https://example.com/");
        let head = identity_key("HEAD", "https://example.com/");
        assert_ne!(get, head);
    }

    #[test]
    fn test_key_differs_by_url() {
        let a = identity_key("GET", "https://example.com/a");
        let b = identity_key("GET", "https://example.com/b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_format() {
        let key = identity_key("GET", "https://example.com/");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
