//! Error types for the auth session.

use aid_core::{SettingsError, TransportError};
use thiserror::Error;

/// Errors returned by [`crate::TokenSession`] operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password left empty
    #[error("username and password must not be empty")]
    MissingCredentials,

    /// Login endpoint unreachable
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// Response received but not understood
    #[error("unexpected login response: {0}")]
    Protocol(String),

    /// The server refused the login; carries the server's message
    #[error("{0}")]
    Rejected(String),

    /// Session could not be persisted
    #[error("failed to persist session: {0}")]
    Storage(#[from] SettingsError),
}

/// Coarse classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    Network,
    Protocol,
    Rejected,
    Storage,
    Input,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::MissingCredentials => AuthErrorKind::Input,
            AuthError::Network(_) => AuthErrorKind::Network,
            AuthError::Protocol(_) => AuthErrorKind::Protocol,
            AuthError::Rejected(_) => AuthErrorKind::Rejected,
            AuthError::Storage(_) => AuthErrorKind::Storage,
        }
    }
}
