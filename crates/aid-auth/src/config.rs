//! Configuration for the auth session.

use aid_core::settings::DEFAULT_TOKEN_EXPIRATION_SECS;
use serde::{Deserialize, Serialize};

/// Default login endpoint.
pub const DEFAULT_LOGIN_URL: &str = "https://xai.anta.com/aimodels-server/public/users/login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Login endpoint; credentials are sent as query parameters
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Token lifetime used when the settings carry none
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            default_ttl_seconds: default_ttl_seconds(),
        }
    }
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_ttl_seconds() -> i64 {
    DEFAULT_TOKEN_EXPIRATION_SECS
}
