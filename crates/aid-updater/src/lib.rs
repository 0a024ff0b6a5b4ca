//! # aid-updater
//!
//! Plugin self-update for the AI Diffusion client.
//!
//! This crate handles:
//! - Fetching and interpreting the update manifest
//! - Downloading the package into a private staging area
//! - SHA-256 verification of the downloaded archive (opt-out with an empty hash)
//! - Extracting and overlaying the package onto the live plugin directory
//!
//! [`Updater`] drives the whole flow as a state machine. Failures never
//! escape `check()`/`apply()`; they land in the observable
//! [`UpdateStatus`] alongside a failure state.

pub mod artifact;
pub mod config;
pub mod error;
pub mod install;
pub mod manager;
pub mod manifest;
#[cfg(test)]
mod proptests;
pub mod staging;

pub use artifact::ArtifactVerifier;
pub use config::UpdaterConfig;
pub use error::{ErrorKind, UpdateError};
pub use install::{InstallReport, OverlayInstaller, PackageInstaller};
pub use manager::{UpdateState, UpdateStatus, Updater};
pub use manifest::{Manifest, ManifestDecision, UpdatePackage};
pub use staging::StagingArea;
