//! Content signatures for plugin binaries, artifacts and manifests
//!
//! A signature is the first 16 hex characters of the SHA-256 of the file
//! contents. Same contents = same signature, regardless of timestamps.

use crate::error::{WeavrError, WeavrResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

/// Number of digest bytes kept in a signature
const SIGNATURE_BYTES: usize = 8;

/// Hash a file's contents using SHA256
pub fn file_signature(path: &Path) -> WeavrResult<String> {
    let contents = fs::read(path).map_err(|e| WeavrError::Io {
        context: format!("reading {} for signature", path.display()),
        source: e,
    })?;
    Ok(bytes_signature(&contents))
}

/// Signature of a file, or `None` if it does not exist
pub fn file_signature_if_exists(path: &Path) -> WeavrResult<Option<String>> {
    match fs::read(path) {
        Ok(contents) => Ok(Some(bytes_signature(&contents))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(WeavrError::io(
            format!("reading {} for signature", path.display()),
            e,
        )),
    }
}

pub fn bytes_signature(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    hex::encode(&result[..SIGNATURE_BYTES])
}
