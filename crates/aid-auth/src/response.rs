//! Login endpoint response.
//!
//! ```json
//! {"code": 200, "data": {"api": "<token>", "worker_id": "<id>"}, "msg": "..."}
//! ```
//!
//! `code == 200` is success and must carry both `data.api` and
//! `data.worker_id`. Any other numeric code is an application-level refusal
//! whose `msg` is shown to the user.

use std::fmt;

use serde_json::Value;

use crate::error::AuthError;

/// Application code for a successful login.
pub const SUCCESS_CODE: i64 = 200;

/// What a successful login hands back.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub subject_id: String,
}

impl fmt::Debug for LoginGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginGrant")
            .field("token", &"<redacted>")
            .field("subject_id", &self.subject_id)
            .finish()
    }
}

/// Interpret a login response body.
///
/// # Errors
///
/// - [`AuthError::Protocol`] if the body is not a JSON object with a numeric
///   `code`, or reports success without a token and subject id
/// - [`AuthError::Rejected`] for any other code
pub fn parse_login_response(body: &[u8]) -> Result<LoginGrant, AuthError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| AuthError::Protocol(format!("invalid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| AuthError::Protocol("response is not a JSON object".to_string()))?;

    let code = object
        .get("code")
        .and_then(Value::as_i64)
        .ok_or_else(|| AuthError::Protocol("missing numeric code".to_string()))?;

    if code != SUCCESS_CODE {
        let message = object
            .get("msg")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("login failed, code: {code}"));
        return Err(AuthError::Rejected(message));
    }

    let data = object.get("data");
    let token = data
        .and_then(|d| d.get("api"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty());
    let subject_id = data.and_then(|d| d.get("worker_id")).and_then(|id| match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    match (token, subject_id) {
        (Some(token), Some(subject_id)) => Ok(LoginGrant {
            token: token.to_string(),
            subject_id,
        }),
        _ => Err(AuthError::Protocol(
            "success response without token or worker id".to_string(),
        )),
    }
}
