//! Login credentials.
//!
//! The password lives in a [`Zeroizing`] buffer. Neither field appears in
//! `Debug` output.

use std::fmt;

use zeroize::Zeroizing;

use crate::error::AuthError;

pub struct Credentials {
    username: String,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Both fields must be non-empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, AuthError> {
        let username = username.into();
        let password = Zeroizing::new(password.into());
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Query parameters for the login request.
    pub fn as_query(&self) -> [(&str, &str); 2] {
        [
            ("username", self.username.as_str()),
            ("password", self.password.as_str()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}
