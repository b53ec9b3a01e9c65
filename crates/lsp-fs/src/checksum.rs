//! SHA-256 checksum utilities
//!
//! Manifest staleness checks compare the checksum of the manifest shipped
//! with a package against the copy stored next to the installed payload.
//! All checksums use the canonical `sha256:<hex>` format.

use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::Path;

use crate::{Error, Result};

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of raw bytes.
pub fn compute_bytes_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the SHA-256 checksum of a file's contents.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    Ok(compute_bytes_checksum(&content))
}

/// Compare `source` bytes against the file stored at `stored`.
///
/// A missing stored file is a mismatch, not an error.
pub fn matches_file(source: &[u8], stored: &Path) -> Result<bool> {
    match std::fs::read(stored) {
        Ok(content) => Ok(compute_bytes_checksum(source) == compute_bytes_checksum(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(stored, e)),
    }
}
