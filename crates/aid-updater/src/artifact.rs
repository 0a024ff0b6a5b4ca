//! Artifact verification.
//!
//! Checks a downloaded package against the SHA-256 announced by the manifest.
//!
//! # Security
//!
//! - The hash is computed over the staged file before anything is extracted
//! - Comparison is case-insensitive on the hex form and runs in constant time
//! - An empty expected hash is an explicit opt-out, not a missing value

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::UpdateError;

/// Buffer size for reading files during hash computation.
const HASH_BUFFER_SIZE: usize = 8192;

/// Verifies downloaded packages for integrity.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArtifactVerifier;

impl ArtifactVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Verify the file at `path` against `expected_hex`.
    ///
    /// Returns `Ok(false)` when verification was skipped because
    /// `expected_hex` is empty, `Ok(true)` when the hash matched.
    ///
    /// # Errors
    ///
    /// - [`UpdateError::HashMismatch`] if the digest differs
    /// - [`UpdateError::IoError`] if the file cannot be read
    pub fn verify(&self, path: &Path, expected_hex: &str) -> Result<bool, UpdateError> {
        let expected = expected_hex.trim().to_ascii_lowercase();
        if expected.is_empty() {
            tracing::debug!(path = %path.display(), "No package hash announced, skipping verification");
            return Ok(false);
        }

        let actual = hex::encode(self.compute_hash(path)?);

        if actual.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1 {
            tracing::error!(
                expected = %expected,
                actual = %actual,
                path = %path.display(),
                "Update package hash mismatch"
            );
            return Err(UpdateError::HashMismatch { expected, actual });
        }

        tracing::debug!(hash = %actual, path = %path.display(), "Package hash verified");
        Ok(true)
    }

    /// Compute the SHA-256 hash of a file, reading it in chunks.
    pub fn compute_hash(&self, path: &Path) -> Result<[u8; 32], UpdateError> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; HASH_BUFFER_SIZE];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize().into())
    }
}

/// Lower-case hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
