//! Error types for the update system.

use aid_core::TransportError;
use thiserror::Error;

use crate::manager::UpdateState;

/// Errors that can occur during update operations.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Manifest has no usable `version`
    #[error("missing version")]
    MissingVersion,

    /// Newer version announced without a download URL or a `sha256` key
    #[error("incomplete package descriptor")]
    IncompleteDescriptor,

    /// Manifest body is valid JSON but not a manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Manifest endpoint answered with a non-success status
    #[error("manifest request failed with status {status}")]
    ManifestStatus { status: u16 },

    /// Downloaded archive does not match the announced hash
    #[error("downloaded package is corrupted or incomplete: expected sha256 {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    /// Transport failure while fetching the manifest or the package
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// Installation failed
    #[error("installation failed: {0}")]
    InstallationFailed(String),

    /// Package archive could not be read
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// `apply()` called without a pending package
    #[error("no update pending (state: {state})")]
    NoPendingUpdate { state: UpdateState },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of an [`UpdateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout, DNS, connection refused, bad download status
    Network,
    /// Response received but unusable
    Protocol,
    /// Downloaded content hash mismatch
    Integrity,
    /// Filesystem failure while staging, extracting or copying
    Install,
    /// Caller or configuration mistake
    Usage,
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpdateError::Network(TransportError::Io(_)) => ErrorKind::Install,
            UpdateError::Network(_) => ErrorKind::Network,
            UpdateError::MissingVersion
            | UpdateError::IncompleteDescriptor
            | UpdateError::InvalidManifest(_)
            | UpdateError::ManifestStatus { .. }
            | UpdateError::JsonError(_) => ErrorKind::Protocol,
            UpdateError::HashMismatch { .. } => ErrorKind::Integrity,
            UpdateError::InstallationFailed(_)
            | UpdateError::Archive(_)
            | UpdateError::IoError(_) => ErrorKind::Install,
            UpdateError::ConfigError(_) | UpdateError::NoPendingUpdate { .. } => ErrorKind::Usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_errors_read_plainly() {
        assert_eq!(UpdateError::MissingVersion.to_string(), "missing version");
        assert_eq!(
            UpdateError::IncompleteDescriptor.to_string(),
            "incomplete package descriptor"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(UpdateError::MissingVersion.kind(), ErrorKind::Protocol);
        assert_eq!(
            UpdateError::Network(TransportError::Timeout("t".into())).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            UpdateError::Network(TransportError::Status { status: 503 }).kind(),
            ErrorKind::Network
        );
        assert_eq!(
            UpdateError::HashMismatch {
                expected: "a".into(),
                actual: "b".into()
            }
            .kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            UpdateError::InstallationFailed("disk full".into()).kind(),
            ErrorKind::Install
        );
        assert_eq!(
            UpdateError::NoPendingUpdate {
                state: UpdateState::Unknown
            }
            .kind(),
            ErrorKind::Usage
        );
    }
}
