//! Package installation.
//!
//! [`OverlayInstaller`] extracts the staged zip archive next to it and then
//! copies the extracted tree onto the live plugin directory. The copy merges:
//! existing files with the same relative path are overwritten, everything
//! else already in the plugin directory is left alone.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::UpdateError;

/// What an installation touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub files_extracted: usize,
    pub files_installed: usize,
}

/// Installs a downloaded, verified package archive.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install from `archive`, using `extract_dir` as scratch space.
    async fn install(&self, archive: &Path, extract_dir: &Path) -> Result<InstallReport, UpdateError>;

    /// Directory the package is installed into.
    fn target_dir(&self) -> &Path;
}

/// Extract-then-merge installer for zip packages.
#[derive(Debug, Clone)]
pub struct OverlayInstaller {
    plugin_dir: PathBuf,
}

impl OverlayInstaller {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
        }
    }
}

#[async_trait]
impl PackageInstaller for OverlayInstaller {
    async fn install(&self, archive: &Path, extract_dir: &Path) -> Result<InstallReport, UpdateError> {
        let archive = archive.to_path_buf();
        let extract_dir = extract_dir.to_path_buf();
        let plugin_dir = self.plugin_dir.clone();

        tokio::task::spawn_blocking(move || {
            info!(dir = %extract_dir.display(), "Extracting plugin archive");
            let files_extracted = extract_archive(&archive, &extract_dir)?;

            info!(dir = %plugin_dir.display(), "Installing new plugin version");
            let files_installed = overlay_dir(&extract_dir, &plugin_dir)?;

            Ok(InstallReport {
                files_extracted,
                files_installed,
            })
        })
        .await
        .map_err(|e| UpdateError::InstallationFailed(format!("install task failed: {e}")))?
    }

    fn target_dir(&self) -> &Path {
        &self.plugin_dir
    }
}

/// Extract a zip archive into `dest`, returning the number of files written.
///
/// Entries whose names would resolve outside `dest` are rejected.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize, UpdateError> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)?;
    fs::create_dir_all(dest)?;

    let mut files = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let relative = entry
            .enclosed_name()
            .map(|p| p.to_path_buf())
            .ok_or_else(|| {
                UpdateError::InstallationFailed(format!(
                    "archive entry escapes extraction directory: {}",
                    entry.name()
                ))
            })?;
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o777))?;
        }

        files += 1;
    }

    debug!(files, "Archive extracted");
    Ok(files)
}

/// Copy the tree at `src` onto `dst`, creating directories as needed.
///
/// Existing files are overwritten; nothing in `dst` is deleted. Symlinks in
/// the source tree are skipped. Returns the number of files copied.
pub fn overlay_dir(src: &Path, dst: &Path) -> Result<usize, UpdateError> {
    fs::create_dir_all(dst).map_err(|e| {
        UpdateError::InstallationFailed(format!("cannot create {}: {}", dst.display(), e))
    })?;

    let mut copied = 0;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let from = entry.path();
        let to = dst.join(entry.file_name());

        if file_type.is_dir() {
            copied += overlay_dir(&from, &to)?;
        } else if file_type.is_file() {
            fs::copy(&from, &to).map_err(|e| {
                UpdateError::InstallationFailed(format!("cannot write {}: {}", to.display(), e))
            })?;
            copied += 1;
        } else {
            warn!(path = %from.display(), "Skipping non-regular file in package");
        }
    }

    Ok(copied)
}
