//! Private staging area for one update attempt.
//!
//! The package is downloaded and extracted here, never into the live plugin
//! directory. The whole area is removed when the attempt ends, whatever the
//! outcome.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::UpdateError;

pub struct StagingArea {
    dir: TempDir,
    archive_path: PathBuf,
    extract_dir: PathBuf,
}

impl StagingArea {
    /// Create a fresh staging area under `root` (or the system temp dir).
    pub fn create(root: Option<&Path>, package_name: &str, version: &str) -> Result<Self, UpdateError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("aid-update-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let stem = format!("{}-{}", package_name, sanitize(version));
        let archive_path = dir.path().join(format!("{stem}.zip"));
        let extract_dir = dir.path().join(stem);

        debug!(path = %dir.path().display(), "Created staging area");
        Ok(Self {
            dir,
            archive_path,
            extract_dir,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the downloaded archive is written.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Where the archive is extracted before being overlaid.
    pub fn extract_dir(&self) -> &Path {
        &self.extract_dir
    }

    /// Remove the staging area. Failures are logged, never returned.
    pub fn discard(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!(path = %path.display(), "Staging area removed"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staging area"),
        }
    }
}

/// Keep a version string usable as a single path component.
fn sanitize(version: &str) -> String {
    version
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect::<String>()
        .replace("..", "_")
}
