//! Hash verification utilities
//!
//! SHA1 for Mojang-hosted files, MD5 for distribution artifacts.

use md5::Md5;
use sha1::{Digest, Sha1};
use std::path::Path;

/// Calculate SHA1 hash of a file
pub fn sha1_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(sha1_hex(&bytes))
}

/// SHA1 of a byte slice as lowercase hex
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Verify file hash matches expected
pub fn verify_sha1(path: &Path, expected: &str) -> anyhow::Result<bool> {
    let actual = sha1_file(path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

/// Calculate MD5 hash of a file
pub fn md5_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(md5_hex(&bytes))
}

/// MD5 of a byte slice as lowercase hex
pub fn md5_hex(bytes: &[u8]) -> String {
    hex::encode(Md5::digest(bytes))
}

/// Verify file MD5 matches expected
pub fn verify_md5(path: &Path, expected: &str) -> anyhow::Result<bool> {
    let actual = md5_file(path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(md5_hex(b"hello"), "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(
            sha1_hex(b"hello"),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[test]
    fn test_verify_md5_ignores_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mod.jar");
        std::fs::write(&path, b"hello").unwrap();

        assert!(verify_md5(&path, "5D41402ABC4B2A76B9719D911017C592").unwrap());
        assert!(!verify_md5(&path, "00000000000000000000000000000000").unwrap());
    }
}
