//! Configuration for the plugin updater.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::UpdateError;

/// Default location of the update manifest.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://antaai.oss-cn-hangzhou.aliyuncs.com/comfyui/krita/result.json";

/// Archive used when the manifest does not name one.
pub const DEFAULT_PACKAGE_URL: &str =
    "https://antaai.oss-cn-hangzhou.aliyuncs.com/comfyui/krita/ai-diffusion-latest.zip";

/// Updater configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// URL of the update manifest
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,

    /// Package URL substituted when the manifest's `url` is absent or empty.
    /// `None` or an empty string disables the substitution.
    #[serde(default = "default_package_url")]
    pub fallback_package_url: Option<String>,

    /// Live plugin installation directory
    #[serde(default)]
    pub plugin_dir: PathBuf,

    /// Version of the running plugin
    #[serde(default = "default_current_version")]
    pub current_version: String,

    /// Parent directory for staging areas (empty = system temp dir)
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Base name for the staged archive and extraction directory
    #[serde(default = "default_package_name")]
    pub package_name: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            fallback_package_url: default_package_url(),
            plugin_dir: PathBuf::new(),
            current_version: default_current_version(),
            staging_dir: None,
            package_name: default_package_name(),
        }
    }
}

impl UpdaterConfig {
    /// Config for a given plugin directory and running version, defaults elsewhere.
    pub fn new(plugin_dir: impl Into<PathBuf>, current_version: impl Into<String>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            current_version: current_version.into(),
            ..Self::default()
        }
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.manifest_url.trim().is_empty() {
            return Err(UpdateError::ConfigError(
                "manifest_url must not be empty".to_string(),
            ));
        }
        if self.plugin_dir.as_os_str().is_empty() {
            return Err(UpdateError::ConfigError(
                "plugin_dir must be set".to_string(),
            ));
        }
        if self.current_version.trim().is_empty() {
            return Err(UpdateError::ConfigError(
                "current_version must not be empty".to_string(),
            ));
        }
        if self.package_name.is_empty()
            || self.package_name.contains(['/', '\\'])
            || self.package_name == ".."
        {
            return Err(UpdateError::ConfigError(format!(
                "invalid package_name: {:?}",
                self.package_name
            )));
        }
        Ok(())
    }
}

fn default_manifest_url() -> String {
    DEFAULT_MANIFEST_URL.to_string()
}

fn default_package_url() -> Option<String> {
    Some(DEFAULT_PACKAGE_URL.to_string())
}

fn default_current_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_package_name() -> String {
    "krita_ai_diffusion".to_string()
}
