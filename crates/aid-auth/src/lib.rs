//! # aid-auth
//!
//! Login exchange and auth token lifecycle for the AI Diffusion client.
//!
//! [`TokenSession`] owns the single active session: token, owning worker id,
//! issue time and lifetime. It is created by [`TokenSession::login`],
//! persisted through the shared [`aid_core::SettingsStore`] after every
//! change, and expires lazily: [`TokenSession::is_valid`] clears a session
//! the first time it finds it expired.

pub mod config;
pub mod credentials;
pub mod error;
#[cfg(test)]
mod proptests;
pub mod response;
pub mod session;

pub use config::AuthConfig;
pub use credentials::Credentials;
pub use error::{AuthError, AuthErrorKind};
pub use response::{parse_login_response, LoginGrant};
pub use session::{SessionRecord, TokenSession};
