// src/cache/location.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::CacheError;

/// Validated root under which a request's artifacts are stored.
///
/// Accepts either a plain filesystem path or a `file://` URI. Anything else
/// (an empty string, another URI scheme, a `file://` URI naming a remote
/// host) is rejected by [`CacheLocation::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    root: PathBuf,
}

impl CacheLocation {
    pub fn parse(location: &str) -> Result<Self, CacheError> {
        let invalid = |reason: &str| CacheError::InvalidLocation {
            location: location.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = location.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty location"));
        }

        let path = match split_scheme(trimmed) {
            None => PathBuf::from(trimmed),
            Some(("file", rest)) => {
                let rest = rest
                    .strip_prefix("//")
                    .ok_or_else(|| invalid("file URI must start with file://"))?;
                let (host, path) = match rest.find('/') {
                    Some(idx) => rest.split_at(idx),
                    None => (rest, ""),
                };
                if !host.is_empty() && !host.eq_ignore_ascii_case("localhost") {
                    return Err(invalid("file URI names a remote host"));
                }
                if path.is_empty() {
                    return Err(invalid("file URI has no path"));
                }
                if path.contains(['?', '#']) {
                    return Err(invalid("file URI must not carry a query or fragment"));
                }
                PathBuf::from(percent_decode(path).ok_or_else(|| invalid("bad percent-encoding"))?)
            }
            Some((scheme, _)) => {
                return Err(invalid(&format!("unsupported scheme '{scheme}'")));
            }
        };

        if path.as_os_str().is_empty() {
            return Err(invalid("empty path"));
        }

        Ok(Self { root: path })
    }

    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory (and parents) if it does not exist yet.
    pub fn ensure(&self) -> Result<(), CacheError> {
        if self.root.is_dir() {
            debug!(root = ?self.root, "cache root already exists");
            return Ok(());
        }
        if self.root.exists() {
            return Err(CacheError::InvalidLocation {
                location: self.root.display().to_string(),
                reason: "exists but is not a directory".to_string(),
            });
        }

        fs::create_dir_all(&self.root).map_err(|source| CacheError::Io {
            path: self.root.clone(),
            source,
        })?;
        info!(root = ?self.root, "created cache root");
        Ok(())
    }
}

/// Split `scheme:rest` when `location` starts with a URI scheme.
///
/// Single-letter schemes are treated as Windows drive letters (`C:\...`).
fn split_scheme(location: &str) -> Option<(&str, &str)> {
    let idx = location.find(':')?;
    let scheme = &location[..idx];
    let looks_like_scheme = scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if looks_like_scheme {
        Some((scheme, &location[idx + 1..]))
    } else {
        None
    }
}

fn percent_decode(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
