//! CLI command definitions and argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::CliOverrides;

/// aid-ctl - update and sign in to the AI Diffusion plugin
#[derive(Parser, Debug)]
#[command(name = "aid-ctl")]
#[command(version, about = "Update and sign in to the AI Diffusion plugin")]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Settings file path
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Update manifest URL
    #[arg(long, env = "AID_MANIFEST_URL", global = true)]
    pub manifest_url: Option<String>,

    /// Live plugin directory
    #[arg(long, global = true)]
    pub plugin_dir: Option<PathBuf>,

    /// Version of the installed plugin
    #[arg(long = "current-version", global = true)]
    pub current_version: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the manifest for a new plugin version
    Check,
    /// Check, then download and install a new version if there is one
    Apply,
    /// Sign in and store the session token
    Login(LoginArgs),
    /// Clear the stored session
    Logout,
    /// Show session and updater status
    Status,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Worker id
    #[arg(short, long)]
    pub username: String,

    /// Password
    #[arg(short, long, env = "AID_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            manifest_url: self.manifest_url.clone(),
            plugin_dir: self.plugin_dir.clone(),
            current_version: self.current_version.clone(),
            settings_path: self.settings.clone(),
            verbose: self.verbose,
            debug: self.debug,
        }
    }
}
