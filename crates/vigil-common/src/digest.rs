//! Content digests and export signing
//!
//! Hashing instead of storing raw content lets an auditor prove that
//! content was or wasn't altered later without the audit trail
//! becoming a second repository of sensitive data.

use crate::error::{AuditError, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

type HmacSha256 = Hmac<Sha256>;

/// Compute the SHA-256 hex digest of a byte sequence
pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Compute the SHA-256 hex digest of a file, streamed in chunks
pub fn sha256_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute an HMAC-SHA256 signature over a byte sequence, hex-encoded
pub fn sign_hmac(key: &[u8], content: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AuditError::config(format!("Invalid signing key: {}", e)))?;
    mac.update(content);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compute an HMAC-SHA256 signature over a file, hex-encoded
pub fn sign_hmac_file(key: &[u8], path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AuditError::config(format!("Invalid signing key: {}", e)))?;
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        mac.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compare two hex-encoded MAC values in constant time
pub fn macs_equal(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let (Ok(a_bytes), Ok(b_bytes)) = (hex::decode(a.trim()), hex::decode(b.trim())) else {
        return false;
    };
    if a_bytes.len() != b_bytes.len() {
        return false;
    }
    a_bytes.ct_eq(&b_bytes).into()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_deterministic() {
        let body = b"{\"query\": \"SELECT * FROM patients\"}";
        assert_eq!(sha256_hex(body), sha256_hex(body));
    }

    #[test]
    fn test_sha256_single_bit_flip_changes_digest() {
        let original = b"audit payload".to_vec();
        let mut flipped = original.clone();
        flipped[0] ^= 0x01;

        let digest_a = sha256_hex(&original);
        let digest_b = sha256_hex(&flipped);
        assert_ne!(digest_a, digest_b);

        // Avalanche: roughly half the hex characters should differ
        let differing = digest_a
            .chars()
            .zip(digest_b.chars())
            .filter(|(a, b)| a != b)
            .count();
        assert!(differing > 16, "only {} hex chars changed", differing);
    }

    #[test]
    fn test_sha256_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        std::fs::write(&path, b"streamed content").unwrap();

        assert_eq!(sha256_file(&path).unwrap(), sha256_hex(b"streamed content"));
    }

    #[test]
    fn test_hmac_sign_and_compare() {
        let signature = sign_hmac(b"secret-key", b"exported rows").unwrap();
        let again = sign_hmac(b"secret-key", b"exported rows").unwrap();
        assert!(macs_equal(&signature, &again));
    }

    #[test]
    fn test_hmac_wrong_key_rejected() {
        let signature = sign_hmac(b"secret-key", b"exported rows").unwrap();
        let forged = sign_hmac(b"other-key", b"exported rows").unwrap();
        assert!(!macs_equal(&signature, &forged));
    }

    #[test]
    fn test_hmac_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");
        std::fs::write(&path, b"id,timestamp\n1,2026-01-01\n").unwrap();

        let from_file = sign_hmac_file(b"k", &path).unwrap();
        let from_bytes = sign_hmac(b"k", b"id,timestamp\n1,2026-01-01\n").unwrap();
        assert!(macs_equal(&from_file, &from_bytes));
    }

    #[test]
    fn test_macs_equal_rejects_garbage() {
        assert!(!macs_equal("not-hex", "also-not-hex"));
        assert!(!macs_equal("abcd", "abcdef"));
    }
}
