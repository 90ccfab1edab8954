//! Hashing - SHA-256 content digests for write-if-changed

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Whether `path` already holds exactly `content`. A missing file never matches.
pub fn file_matches(path: &Path, content: &str) -> io::Result<bool> {
    match fs::read(path) {
        Ok(existing) => Ok(sha256_hex(&existing) == sha256_hex(content.as_bytes())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
