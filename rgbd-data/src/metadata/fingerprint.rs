//! Content fingerprints over a bounded file prefix

use sha2::{Digest, Sha256};
use std::fmt;

/// Number of leading bytes that contribute to a fingerprint (1 MiB).
pub const FINGERPRINT_PREFIX_LEN: usize = 1 << 20;

/// Stable identity of a video file, used to key settings and caches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// SHA-256 of at most the first [`FINGERPRINT_PREFIX_LEN`] bytes. Bytes past
/// the prefix do not contribute.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let prefix = &bytes[..bytes.len().min(FINGERPRINT_PREFIX_LEN)];
    Fingerprint(sha256_hex(prefix))
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut s = String::with_capacity(digest.len() * 2);
    for b in digest {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bytes_match() {
        let a = vec![7u8; 4096];
        let b = a.clone();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).as_str().len(), 64);
    }

    #[test]
    fn test_prefix_difference_changes_fingerprint() {
        let a = vec![1u8; 2048];
        let mut b = a.clone();
        b[100] = 2;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_bytes_past_prefix_are_ignored() {
        let mut a = vec![3u8; FINGERPRINT_PREFIX_LEN + 10];
        let b = a.clone();
        a[FINGERPRINT_PREFIX_LEN + 5] = 9;
        assert_eq!(fingerprint(&a), fingerprint(&b));

        a[FINGERPRINT_PREFIX_LEN - 1] = 9;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_short_and_empty_inputs() {
        assert_eq!(
            fingerprint(&[]).as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_ne!(fingerprint(b"a"), fingerprint(b"ab"));
    }
}
