//! Time-bounded auth session.
//!
//! A session is created by a successful login exchange, persisted to the
//! settings store right away, and cleared either by an explicit logout or by
//! the first validity check that finds it expired. There is no background
//! sweep.

use std::fmt;
use std::sync::Arc;

use aid_core::{Clock, HttpTransport, Settings, SettingsStore, SystemClock};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::credentials::Credentials;
use crate::error::AuthError;
use crate::response::parse_login_response;

/// The persisted session fields.
///
/// `token == ""` and `issued_at == 0` both mean "no session"; a record never
/// has only one of them set.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub subject_id: String,
    /// Unix seconds
    pub issued_at: i64,
    pub ttl_seconds: i64,
}

impl SessionRecord {
    /// An empty record with the given lifetime.
    pub fn empty(ttl_seconds: i64) -> Self {
        Self {
            token: String::new(),
            subject_id: String::new(),
            issued_at: 0,
            ttl_seconds,
        }
    }

    /// Read the session out of `settings`.
    ///
    /// A half-set record (token without timestamp or the reverse) is read as
    /// no session. A non-positive lifetime falls back to `default_ttl`.
    pub fn from_settings(settings: &Settings, default_ttl: i64) -> Self {
        let ttl_seconds = if settings.token_expiration > 0 {
            settings.token_expiration
        } else {
            default_ttl
        };

        if settings.user_token.is_empty() || settings.last_login_time == 0 {
            return Self::empty(ttl_seconds);
        }

        Self {
            token: settings.user_token.clone(),
            subject_id: settings.user_id.clone(),
            issued_at: settings.last_login_time,
            ttl_seconds,
        }
    }

    fn write_to(&self, settings: &mut Settings) {
        settings.user_token = self.token.clone();
        settings.user_id = self.subject_id.clone();
        settings.last_login_time = self.issued_at;
        settings.token_expiration = self.ttl_seconds;
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.token.is_empty()
            && self.issued_at != 0
            && now <= self.issued_at.saturating_add(self.ttl_seconds)
    }

    /// Last second at which the session is still valid.
    pub fn expires_at(&self) -> Option<i64> {
        (!self.is_empty()).then(|| self.issued_at.saturating_add(self.ttl_seconds))
    }

    /// Same lifetime, no session.
    pub fn cleared(&self) -> Self {
        Self::empty(self.ttl_seconds)
    }
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("token", &fingerprint(&self.token))
            .field("subject_id", &self.subject_id)
            .field("issued_at", &self.issued_at)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// The single active auth session.
///
/// All mutating operations take `&mut self`; the host serializes logins.
pub struct TokenSession {
    config: AuthConfig,
    transport: Arc<dyn HttpTransport>,
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    record: SessionRecord,
}

impl TokenSession {
    pub fn new(
        config: AuthConfig,
        transport: Arc<dyn HttpTransport>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self::with_clock(config, transport, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: AuthConfig,
        transport: Arc<dyn HttpTransport>,
        settings: Arc<dyn SettingsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let record = SessionRecord::from_settings(&settings.get(), config.default_ttl_seconds);
        debug!(session = ?record, "Loaded auth session");
        Self {
            config,
            transport,
            settings,
            clock,
            record,
        }
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn token(&self) -> &str {
        &self.record.token
    }

    pub fn subject_id(&self) -> &str {
        &self.record.subject_id
    }

    pub fn issued_at(&self) -> i64 {
        self.record.issued_at
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.record.ttl_seconds
    }

    /// Exchange credentials for a token.
    ///
    /// Makes exactly one request. On any error the session is left as it was.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        let credentials = Credentials::new(username, password)?;
        info!(url = %self.config.login_url, "Logging in");

        let response = self
            .transport
            .get(&self.config.login_url, &credentials.as_query())
            .await
            .map_err(|e| {
                warn!(error = %e, "Login request failed");
                AuthError::from(e)
            })?;
        if !response.is_success() {
            warn!(status = response.status, "Login endpoint returned an error status");
            return Err(AuthError::Protocol(format!(
                "login endpoint returned status {}",
                response.status
            )));
        }

        let grant = parse_login_response(&response.body).map_err(|e| {
            warn!(error = %e, "Login refused");
            e
        })?;

        let record = SessionRecord {
            token: grant.token,
            subject_id: grant.subject_id,
            issued_at: self.clock.now_unix(),
            ttl_seconds: self.record.ttl_seconds,
        };
        self.persist(&record)?;

        info!(
            subject_id = %record.subject_id,
            token = %fingerprint(&record.token),
            "Login succeeded"
        );
        self.record = record;
        Ok(())
    }

    /// Whether a session exists and has not expired.
    ///
    /// An expired session is cleared and the cleared state persisted. The
    /// in-memory session is cleared even if persisting fails.
    pub fn is_valid(&mut self) -> bool {
        if self.record.is_valid_at(self.clock.now_unix()) {
            return true;
        }

        let stored = self.settings.get();
        if !self.record.is_empty() || !stored.user_token.is_empty() || stored.last_login_time != 0 {
            info!(subject_id = %self.record.subject_id, "Auth session expired");
            let cleared = self.record.cleared();
            let mut next = stored;
            cleared.write_to(&mut next);
            self.settings.set(next);
            if let Err(e) = self.settings.save() {
                warn!(error = %e, "Failed to persist expired session");
            }
            self.record = cleared;
        }
        false
    }

    /// The token, if the session is valid.
    pub fn valid_token(&mut self) -> Option<&str> {
        if self.is_valid() {
            Some(self.record.token.as_str())
        } else {
            None
        }
    }

    /// Clear the session and persist.
    ///
    /// The in-memory session is cleared even if persisting fails.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        info!(subject_id = %self.record.subject_id, "Logging out");
        let cleared = self.record.cleared();
        self.record = cleared.clone();
        self.persist(&cleared)
    }

    /// Change the token lifetime. Non-positive values are ignored.
    pub fn set_ttl(&mut self, ttl_seconds: i64) -> Result<(), AuthError> {
        if ttl_seconds <= 0 || ttl_seconds == self.record.ttl_seconds {
            return Ok(());
        }
        debug!(ttl_seconds, "Updating token lifetime");
        let mut record = self.record.clone();
        record.ttl_seconds = ttl_seconds;
        self.persist(&record)?;
        self.record = record;
        Ok(())
    }

    /// Write `record` into the settings and save; restore the previous
    /// settings if the save fails.
    fn persist(&self, record: &SessionRecord) -> Result<(), AuthError> {
        let previous = self.settings.get();
        let mut next = previous.clone();
        record.write_to(&mut next);
        self.settings.set(next);

        if let Err(e) = self.settings.save() {
            self.settings.set(previous);
            return Err(e.into());
        }
        Ok(())
    }
}

impl fmt::Debug for TokenSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSession")
            .field("config", &self.config)
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Short non-reversible token identifier for logs.
pub fn fingerprint(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..4])
}
