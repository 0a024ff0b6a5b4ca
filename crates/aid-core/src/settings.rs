//! Persisted user settings.
//!
//! The auth session and the host application share one settings document.
//! Only the session keys are typed here; anything else found in the file is
//! carried through untouched so a `save()` never drops foreign settings.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use directories::ProjectDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default token lifetime: one day.
pub const DEFAULT_TOKEN_EXPIRATION_SECS: i64 = 24 * 60 * 60;

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

/// The settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Auth token from the last successful login, empty when logged out
    #[serde(default)]
    pub user_token: String,

    /// Subject (worker) id the token was issued to
    #[serde(default)]
    pub user_id: String,

    /// Unix seconds of the last successful login, 0 when logged out
    #[serde(default)]
    pub last_login_time: i64,

    /// Token lifetime in seconds
    #[serde(default = "default_token_expiration")]
    pub token_expiration: i64,

    /// Keys owned by other parts of the application
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_token: String::new(),
            user_id: String::new(),
            last_login_time: 0,
            token_expiration: default_token_expiration(),
            extra: BTreeMap::new(),
        }
    }
}

fn default_token_expiration() -> i64 {
    DEFAULT_TOKEN_EXPIRATION_SECS
}

/// Typed get/set access to the settings document plus an atomic `save()`.
pub trait SettingsStore: Send + Sync {
    /// Current in-memory settings.
    fn get(&self) -> Settings;

    /// Replace the in-memory settings. Not durable until [`SettingsStore::save`].
    fn set(&self, settings: Settings);

    /// Durably write the in-memory settings.
    fn save(&self) -> Result<(), SettingsError>;
}

/// Settings stored as a JSON file, written atomically (temp file + rename).
pub struct JsonFileSettings {
    path: PathBuf,
    current: RwLock<Settings>,
}

impl JsonFileSettings {
    /// Open the settings file at `path`, starting from defaults if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let current = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    /// Platform-appropriate default location of the settings file.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "aid", "aid-plugin")
            .map(|dirs| dirs.config_dir().join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self) -> Settings {
        self.current.read().clone()
    }

    fn set(&self, settings: Settings) {
        *self.current.write() = settings;
    }

    fn save(&self) -> Result<(), SettingsError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let content = serde_json::to_string_pretty(&*self.current.read())?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| SettingsError::Io(e.error))?;

        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// In-memory settings store that records what was saved.
#[derive(Default)]
pub struct MemorySettings {
    current: RwLock<Settings>,
    saved: RwLock<Option<Settings>>,
    save_count: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemorySettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: RwLock::new(settings),
            ..Self::default()
        }
    }

    /// The last successfully saved document, if any.
    pub fn saved(&self) -> Option<Settings> {
        self.saved.read().clone()
    }

    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Make every following `save()` fail.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self) -> Settings {
        self.current.read().clone()
    }

    fn set(&self, settings: Settings) {
        *self.current.write() = settings;
    }

    fn save(&self) -> Result<(), SettingsError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SettingsError::Unavailable("save disabled".to_string()));
        }
        *self.saved.write() = Some(self.current.read().clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
