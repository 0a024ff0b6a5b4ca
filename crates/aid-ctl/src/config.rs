//! Configuration management for aid-ctl
//!
//! Configuration is stored in TOML format. Every section and field is
//! optional; missing values take their defaults.
//!
//! # Configuration File Locations
//!
//! - Linux: `~/.config/aid-plugin/aid-ctl.toml`
//! - macOS: `~/Library/Application Support/org.aid.aid-plugin/aid-ctl.toml`
//! - Windows: `%APPDATA%\aid\aid-plugin\config\aid-ctl.toml`

use std::path::{Path, PathBuf};

use aid_auth::AuthConfig;
use aid_core::{JsonFileSettings, NetworkConfig};
use aid_updater::UpdaterConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Host configuration
///
/// # Example TOML
///
/// ```toml
/// [updater]
/// manifest_url = "https://example.com/result.json"
/// plugin_dir = "/home/me/.local/share/krita/pykrita"
/// current_version = "1.4.0"
///
/// [auth]
/// login_url = "https://example.com/users/login"
///
/// [network]
/// connect_timeout_secs = 10
/// request_timeout_secs = 30
///
/// [settings]
/// path = ""  # Empty = default location
///
/// [logging]
/// level = "warn"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub updater: UpdaterConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub settings: SettingsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings file configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Path to the settings JSON file (empty = default location)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Values taken from the command line and the environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub manifest_url: Option<String>,
    pub plugin_dir: Option<PathBuf>,
    pub current_version: Option<String>,
    pub settings_path: Option<PathBuf>,
    pub verbose: bool,
    pub debug: bool,
}

impl Config {
    /// Load configuration from file.
    ///
    /// Not validated here; call [`Config::validate`] once overrides are applied.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from custom path, or the default location if it exists
    pub fn load_from(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        match custom_path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Get default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "aid", "aid-plugin")
            .map(|dirs| dirs.config_dir().join("aid-ctl.toml"))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Settings file to use: configured path or the platform default.
    pub fn settings_path(&self) -> Result<PathBuf, ConfigError> {
        self.settings
            .path
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(JsonFileSettings::default_path)
            .ok_or_else(|| {
                ConfigError::ValidationError("no settings path and no home directory".to_string())
            })
    }

    /// Apply CLI and environment overrides. They take precedence over the file.
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(ref url) = overrides.manifest_url {
            if !url.is_empty() {
                self.updater.manifest_url = url.clone();
            }
        }
        if let Some(ref dir) = overrides.plugin_dir {
            self.updater.plugin_dir = dir.clone();
        }
        if let Some(ref version) = overrides.current_version {
            self.updater.current_version = version.clone();
        }
        if let Some(ref path) = overrides.settings_path {
            self.settings.path = Some(path.clone());
        }
        if overrides.debug {
            self.logging.level = "debug".to_string();
        } else if overrides.verbose {
            self.logging.level = "info".to_string();
        }
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}'. Valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        for (name, url) in [
            ("updater.manifest_url", &self.updater.manifest_url),
            ("auth.login_url", &self.auth.login_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid {name} '{url}': must start with http:// or https://"
                )));
            }
        }

        if self.network.connect_timeout_secs == 0
            || self.network.request_timeout_secs == 0
            || self.network.read_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "network timeouts must be greater than 0".to_string(),
            ));
        }

        if self.auth.default_ttl_seconds <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.default_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
