//! # aid-ctl
//!
//! Command-line host for the AI Diffusion plugin. It reads the configuration
//! and the environment once, then drives the updater and the login session:
//!
//! - `check`: query the update manifest
//! - `apply`: check, then download, verify and install a new version
//! - `login` / `logout`: manage the stored session token
//! - `status`: show session validity and updater configuration

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::{Cli, Commands};
pub use config::{CliOverrides, Config, ConfigError};

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation completed successfully (exit code 0)
    Success = 0,
    /// General error (exit code 1)
    GeneralError = 1,
    /// Login refused by the server (exit code 2)
    AuthenticationFailed = 2,
    /// Endpoint unreachable or check failed (exit code 4)
    ConnectionFailed = 4,
    /// Invalid input provided (exit code 5)
    InvalidInput = 5,
    /// Download, verification or install failed (exit code 6)
    UpdateFailed = 6,
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }
}
