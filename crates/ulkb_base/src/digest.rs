//! Content digests.
//!
//! Kernel objects expose a raw s-expression dump; its SHA-256 hex digest
//! identifies the object's structure. Theories use the same digest to
//! detect state equality across reset boundaries.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of `data`.
pub fn hex_digest(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let out = hasher.finalize();
    let mut hex = String::with_capacity(out.len() * 2);
    for byte in out {
        use std::fmt::Write;
        write!(hex, "{:02x}", byte).expect("writing to a String cannot fail");
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        assert_eq!(hex_digest("abc"), hex_digest("abc"));
        assert_ne!(hex_digest("abc"), hex_digest("abd"));
    }

    #[test]
    fn digest_is_hex_encoded_sha256() {
        let d = hex_digest("");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit()));
        // Well-known SHA-256 of the empty string.
        assert_eq!(
            d,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
