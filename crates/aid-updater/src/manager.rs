//! Update manager - drives the check/apply state machine.
//!
//! [`Updater`] combines the update components:
//! - [`HttpTransport`] for the manifest request and the package download
//! - [`ArtifactVerifier`] for the SHA-256 check of the staged archive
//! - [`StagingArea`] for the private download/extract directory
//! - [`PackageInstaller`] for extracting and overlaying the package
//!
//! Every transition publishes one [`UpdateStatus`] snapshot on a
//! `tokio::sync::watch` channel, so `state`, `latest_version` and `error`
//! are always observed together.

use std::fmt;
use std::sync::Arc;

use aid_core::HttpTransport;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::artifact::ArtifactVerifier;
use crate::config::UpdaterConfig;
use crate::error::UpdateError;
use crate::install::{OverlayInstaller, PackageInstaller};
use crate::manifest::{Manifest, ManifestDecision, UpdatePackage};
use crate::staging::StagingArea;

/// Current state of the updater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// No check performed yet
    #[default]
    Unknown,
    /// Manifest request in flight
    Checking,
    /// A different version is announced and a package is held
    Available,
    /// Manifest version equals the running version
    UpToDate,
    /// Package being fetched into the staging area
    Downloading,
    /// Package verified, being extracted and overlaid
    Installing,
    /// New version installed; sticky until the process restarts
    RestartRequired,
    /// Last check failed
    FailedCheck,
    /// Last apply failed
    FailedUpdate,
}

impl UpdateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateState::Unknown => "unknown",
            UpdateState::Checking => "checking",
            UpdateState::Available => "available",
            UpdateState::UpToDate => "up_to_date",
            UpdateState::Downloading => "downloading",
            UpdateState::Installing => "installing",
            UpdateState::RestartRequired => "restart_required",
            UpdateState::FailedCheck => "failed_check",
            UpdateState::FailedUpdate => "failed_update",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, UpdateState::FailedCheck | UpdateState::FailedUpdate)
    }
}

impl fmt::Display for UpdateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable snapshot of the updater.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub state: UpdateState,
    /// Version announced by the last successful manifest read
    pub latest_version: String,
    /// Message of the last failure, empty otherwise
    pub error: String,
}

/// Plugin updater.
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(ReqwestTransport::new(&NetworkConfig::default())?);
/// let mut updater = Updater::new(UpdaterConfig::new(plugin_dir, "1.0.0"), transport)?;
///
/// if updater.check().await == UpdateState::Available {
///     updater.apply().await?;
/// }
/// ```
pub struct Updater {
    config: UpdaterConfig,
    transport: Arc<dyn HttpTransport>,
    installer: Box<dyn PackageInstaller>,
    verifier: ArtifactVerifier,
    status: UpdateStatus,
    status_tx: watch::Sender<UpdateStatus>,
    current_version: String,
    /// Package announced by the last check, kept for `apply()`
    package: Option<UpdatePackage>,
    token_ttl_hint: Option<u64>,
}

impl Updater {
    /// Create an updater that installs into `config.plugin_dir`.
    pub fn new(config: UpdaterConfig, transport: Arc<dyn HttpTransport>) -> Result<Self, UpdateError> {
        let installer = Box::new(OverlayInstaller::new(config.plugin_dir.clone()));
        Self::with_installer(config, transport, installer)
    }

    /// Create an updater with a custom installer.
    pub fn with_installer(
        config: UpdaterConfig,
        transport: Arc<dyn HttpTransport>,
        installer: Box<dyn PackageInstaller>,
    ) -> Result<Self, UpdateError> {
        config.validate()?;

        let status = UpdateStatus::default();
        let (status_tx, _) = watch::channel(status.clone());
        let current_version = config.current_version.clone();

        Ok(Self {
            config,
            transport,
            installer,
            verifier: ArtifactVerifier::new(),
            status,
            status_tx,
            current_version,
            package: None,
            token_ttl_hint: None,
        })
    }

    /// Receive every status snapshot from now on.
    pub fn subscribe(&self) -> watch::Receiver<UpdateStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> &UpdateStatus {
        &self.status
    }

    pub fn state(&self) -> UpdateState {
        self.status.state
    }

    pub fn latest_version(&self) -> &str {
        &self.status.latest_version
    }

    pub fn error(&self) -> &str {
        &self.status.error
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Package held for `apply()`, if any.
    pub fn package(&self) -> Option<&UpdatePackage> {
        self.package.as_ref()
    }

    /// Token lifetime announced by the last manifest read, if positive.
    pub fn token_ttl_hint(&self) -> Option<u64> {
        self.token_ttl_hint
    }

    /// Whether the last manifest named a version other than the running one.
    pub fn is_available(&self) -> bool {
        !self.status.latest_version.is_empty() && self.status.latest_version != self.current_version
    }

    /// Check the manifest endpoint for a new version.
    ///
    /// Never fails: problems are recorded in [`UpdateStatus::error`] with
    /// [`UpdateState::FailedCheck`]. In [`UpdateState::RestartRequired`] this
    /// returns immediately without any network I/O.
    pub async fn check(&mut self) -> UpdateState {
        if self.status.state == UpdateState::RestartRequired {
            debug!("Restart pending, skipping update check");
            return self.status.state;
        }

        info!(url = %self.config.manifest_url, "Checking for updates");
        let latest = self.status.latest_version.clone();
        self.transition(UpdateState::Checking, latest, String::new());

        match self.fetch_manifest().await {
            Ok(ManifestDecision::UpToDate { version }) => {
                info!(version = %version, "Plugin is up to date");
                self.package = None;
                self.transition(UpdateState::UpToDate, version, String::new());
            }
            Ok(ManifestDecision::Available(package)) => {
                info!(
                    current = %self.current_version,
                    latest = %package.version,
                    "Update available"
                );
                let version = package.version.clone();
                self.package = Some(package);
                self.transition(UpdateState::Available, version, String::new());
            }
            Err(e) => {
                warn!(error = %e, "Update check failed");
                self.package = None;
                let latest = self.status.latest_version.clone();
                self.transition(UpdateState::FailedCheck, latest, e.to_string());
            }
        }

        self.status.state
    }

    async fn fetch_manifest(&mut self) -> Result<ManifestDecision, UpdateError> {
        let response = self.transport.get(&self.config.manifest_url, &[]).await?;
        if !response.is_success() {
            return Err(UpdateError::ManifestStatus {
                status: response.status,
            });
        }

        let manifest = Manifest::from_slice(
            &response.body,
            self.config.fallback_package_url.as_deref(),
        )?;
        self.token_ttl_hint = manifest.token_ttl;

        manifest.resolve(&self.current_version)
    }

    /// Download, verify and install the package found by the last check.
    ///
    /// Download and install failures are recorded in the status and reported
    /// as `Ok(UpdateState::FailedUpdate)`; the package is kept so the call
    /// can be retried.
    ///
    /// # Errors
    ///
    /// [`UpdateError::NoPendingUpdate`] if no package is held or the state is
    /// neither [`UpdateState::Available`] nor [`UpdateState::FailedUpdate`].
    /// No transition happens in that case.
    pub async fn apply(&mut self) -> Result<UpdateState, UpdateError> {
        let package = match (&self.package, self.status.state) {
            (Some(package), UpdateState::Available | UpdateState::FailedUpdate) => package.clone(),
            (_, state) => return Err(UpdateError::NoPendingUpdate { state }),
        };

        info!(version = %package.version, url = %package.download_url, "Applying update");
        let latest = self.status.latest_version.clone();
        self.transition(UpdateState::Downloading, latest.clone(), String::new());

        let result = match StagingArea::create(
            self.config.staging_dir.as_deref(),
            &self.config.package_name,
            &package.version,
        ) {
            Ok(staging) => {
                let result = self.download_and_install(&package, &staging).await;
                staging.discard();
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(version = %package.version, "Update installed, restart required");
                self.current_version = package.version;
                self.package = None;
                self.transition(UpdateState::RestartRequired, latest, String::new());
            }
            Err(e) => {
                error!(error = %e, "Update failed");
                self.transition(UpdateState::FailedUpdate, latest, e.to_string());
            }
        }

        Ok(self.status.state)
    }

    async fn download_and_install(
        &mut self,
        package: &UpdatePackage,
        staging: &StagingArea,
    ) -> Result<(), UpdateError> {
        let bytes = self
            .transport
            .download(&package.download_url, staging.archive_path())
            .await?;
        debug!(bytes, path = %staging.archive_path().display(), "Package downloaded");

        self.verifier
            .verify(staging.archive_path(), &package.content_hash)?;

        let latest = self.status.latest_version.clone();
        self.transition(UpdateState::Installing, latest, String::new());

        let report = self
            .installer
            .install(staging.archive_path(), staging.extract_dir())
            .await?;
        debug!(
            extracted = report.files_extracted,
            installed = report.files_installed,
            target = %self.installer.target_dir().display(),
            "Package installed"
        );
        Ok(())
    }

    /// Replace the whole status at once and publish it.
    fn transition(&mut self, state: UpdateState, latest_version: String, error: String) {
        debug!(from = %self.status.state, to = %state, "Update state transition");
        self.status = UpdateStatus {
            state,
            latest_version,
            error,
        };
        self.status_tx.send_replace(self.status.clone());
    }
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("current_version", &self.current_version)
            .field("package", &self.package)
            .finish_non_exhaustive()
    }
}
