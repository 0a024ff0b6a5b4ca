//! Property-based tests for aid-updater.
//!
//! # Properties Tested
//!
//! - Integrity: with a non-empty announced hash, the updater reaches
//!   `installing` iff the downloaded bytes hash to it (any letter case)
//! - Skip verification: an empty announced hash always proceeds to `installing`
//! - Version comparison: `up_to_date` iff the manifest version equals the
//!   running version

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aid_core::harness::StaticTransport;
use async_trait::async_trait;
use proptest::prelude::*;
use serde_json::json;
use tempfile::TempDir;

use crate::artifact::sha256_hex;
use crate::config::UpdaterConfig;
use crate::error::UpdateError;
use crate::install::{InstallReport, PackageInstaller};
use crate::manager::{UpdateState, Updater};

const MANIFEST_URL: &str = "https://updates.test/manifest.json";
const PACKAGE_URL: &str = "https://updates.test/pkg.zip";

// =============================================================================
// Helpers
// =============================================================================

/// Installer that only counts how often the updater got to `installing`.
struct CountingInstaller {
    calls: Arc<AtomicUsize>,
    dir: std::path::PathBuf,
}

#[async_trait]
impl PackageInstaller for CountingInstaller {
    async fn install(&self, _archive: &Path, _extract_dir: &Path) -> Result<InstallReport, UpdateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(InstallReport::default())
    }

    fn target_dir(&self) -> &Path {
        &self.dir
    }
}

/// Run check + apply for `content` announced with `hash`.
/// Returns the final state and how many times the installer ran.
fn run_apply(content: Vec<u8>, hash: String) -> (UpdateState, usize) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(StaticTransport::new());
        transport.respond_json(
            MANIFEST_URL,
            &json!({"version": "2.0.0", "url": PACKAGE_URL, "sha256": hash}),
        );
        transport.respond(PACKAGE_URL, 200, content);

        let mut config = UpdaterConfig::new(dir.path().join("plugin"), "1.0.0");
        config.manifest_url = MANIFEST_URL.to_string();
        config.staging_dir = Some(dir.path().join("staging"));

        let calls = Arc::new(AtomicUsize::new(0));
        let installer = Box::new(CountingInstaller {
            calls: calls.clone(),
            dir: dir.path().join("plugin"),
        });
        let mut updater = Updater::with_installer(config, transport, installer).unwrap();

        assert_eq!(updater.check().await, UpdateState::Available);
        let state = updater.apply().await.unwrap();
        (state, calls.load(Ordering::SeqCst))
    })
}

fn arb_content() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..4096)
}

fn arb_version() -> impl Strategy<Value = String> {
    (0u32..20, 0u32..20, 0u32..20).prop_map(|(a, b, c)| format!("{a}.{b}.{c}"))
}

// =============================================================================
// Integrity
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_matching_hash_installs(content in arb_content(), upper in any::<bool>()) {
        let mut hash = sha256_hex(&content);
        if upper {
            hash = hash.to_uppercase();
        }

        let (state, installs) = run_apply(content, hash);
        prop_assert_eq!(state, UpdateState::RestartRequired);
        prop_assert_eq!(installs, 1);
    }

    #[test]
    fn prop_wrong_hash_never_installs(
        content in arb_content(),
        other in arb_content(),
    ) {
        prop_assume!(content != other);

        let (state, installs) = run_apply(content, sha256_hex(&other));
        prop_assert_eq!(state, UpdateState::FailedUpdate);
        prop_assert_eq!(installs, 0);
    }

    #[test]
    fn prop_empty_hash_skips_verification(content in arb_content()) {
        let (state, installs) = run_apply(content, String::new());
        prop_assert_eq!(state, UpdateState::RestartRequired);
        prop_assert_eq!(installs, 1);
    }
}

// =============================================================================
// Version comparison
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_up_to_date_iff_equal(current in arb_version(), announced in arb_version()) {
        let manifest = crate::manifest::Manifest::from_slice(
            json!({"version": announced, "url": PACKAGE_URL, "sha256": ""})
                .to_string()
                .as_bytes(),
            None,
        )
        .unwrap();

        let decision = manifest.resolve(&current).unwrap();
        let up_to_date = matches!(decision, crate::manifest::ManifestDecision::UpToDate { .. });
        prop_assert_eq!(up_to_date, current == announced);
    }
}
