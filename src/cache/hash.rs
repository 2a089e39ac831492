// src/cache/hash.rs

//! Content hashing used to derive cache keys.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use blake3::Hasher;

/// Compute the blake3 hash of a single file's contents, as lowercase hex.
pub fn compute_file_hash(path: &Path) -> std::io::Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Incremental builder for a node's cache key.
///
/// Every field is written as a tagged, length-prefixed record so that
/// adjacent values can never run together into the same byte stream.
#[derive(Debug, Default)]
pub struct KeyHasher {
    inner: Hasher,
}

impl KeyHasher {
    pub fn new() -> Self {
        Self {
            inner: Hasher::new(),
        }
    }

    pub fn field(&mut self, tag: &str, value: &str) -> &mut Self {
        for part in [tag, value] {
            self.inner.update(&(part.len() as u64).to_le_bytes());
            self.inner.update(part.as_bytes());
        }
        self
    }

    pub fn finish(&self) -> String {
        self.inner.finalize().to_hex().to_string()
    }
}
