//! Update manifest interpretation.
//!
//! The manifest is a small JSON object:
//!
//! ```json
//! {"version": "2.0.0", "url": "https://.../plugin.zip", "sha256": "…", "expired": 86400}
//! ```
//!
//! Only `version` is required. An absent or empty `url` is replaced by the
//! configured fallback package URL. `sha256` may be an empty string, which
//! turns integrity verification off for that package; a missing `sha256` key
//! makes the descriptor incomplete. `expired` is a token lifetime hint for
//! the auth session and never fails the check.

use serde_json::{Map, Value};

use crate::error::UpdateError;

/// A package announced by the manifest, ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePackage {
    pub version: String,
    pub download_url: String,
    /// Lower- or upper-case hex SHA-256, or empty to skip verification
    pub content_hash: String,
}

impl UpdatePackage {
    pub fn verifies_integrity(&self) -> bool {
        !self.content_hash.is_empty()
    }
}

/// What a manifest means for the running version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestDecision {
    UpToDate { version: String },
    Available(UpdatePackage),
}

/// Parsed manifest fields, before comparison with the running version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Manifest {
    pub version: Option<String>,
    /// Download URL after fallback substitution
    pub url: Option<String>,
    pub sha256: Option<String>,
    /// Positive token lifetime override in seconds
    pub token_ttl: Option<u64>,
}

impl Manifest {
    /// Parse manifest bytes, substituting `fallback_url` for an absent or empty `url`.
    pub fn from_slice(data: &[u8], fallback_url: Option<&str>) -> Result<Self, UpdateError> {
        let value: Value = serde_json::from_slice(data)?;
        let object = value.as_object().ok_or_else(|| {
            UpdateError::InvalidManifest("manifest is not a JSON object".to_string())
        })?;
        Ok(Self::from_object(object, fallback_url))
    }

    fn from_object(object: &Map<String, Value>, fallback_url: Option<&str>) -> Self {
        // Compared verbatim against the running version, so no trimming.
        let version = object
            .get("version")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let url = non_empty_str(object.get("url")).or_else(|| {
            fallback_url
                .filter(|u| !u.is_empty())
                .map(str::to_string)
        });

        // Empty string is a valid value here: it opts out of verification.
        let sha256 = object
            .get("sha256")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string());

        let token_ttl = object
            .get("expired")
            .and_then(Value::as_u64)
            .filter(|ttl| *ttl > 0);

        Self {
            version,
            url,
            sha256,
            token_ttl,
        }
    }

    /// Decide what this manifest means for `current_version`.
    pub fn resolve(&self, current_version: &str) -> Result<ManifestDecision, UpdateError> {
        let version = self.version.as_ref().ok_or(UpdateError::MissingVersion)?;

        if version == current_version {
            return Ok(ManifestDecision::UpToDate {
                version: version.clone(),
            });
        }

        match (&self.url, &self.sha256) {
            (Some(url), Some(sha256)) => Ok(ManifestDecision::Available(UpdatePackage {
                version: version.clone(),
                download_url: url.clone(),
                content_hash: sha256.clone(),
            })),
            _ => Err(UpdateError::IncompleteDescriptor),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
