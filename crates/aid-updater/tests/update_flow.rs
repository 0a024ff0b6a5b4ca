//! End-to-end update flows against the in-memory transport.

use std::fs;
use std::io::Write;
use std::sync::Arc;

use aid_core::harness::{CallKind, StaticTransport};
use aid_updater::artifact::sha256_hex;
use aid_updater::{UpdateError, UpdateState, Updater, UpdaterConfig};
use serde_json::json;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const MANIFEST_URL: &str = "https://updates.test/result.json";
const PACKAGE_URL: &str = "https://updates.test/plugin-2.0.0.zip";
const FALLBACK_URL: &str = "https://updates.test/plugin-latest.zip";

struct Fixture {
    dir: TempDir,
    transport: Arc<StaticTransport>,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("plugin/ai_diffusion")).unwrap();
        fs::write(dir.path().join("plugin/ai_diffusion/__init__.py"), b"1.0.0").unwrap();
        fs::write(dir.path().join("plugin/ai_diffusion/styles.json"), b"user data").unwrap();
        Self {
            dir,
            transport: Arc::new(StaticTransport::new()),
        }
    }

    fn plugin_file(&self, name: &str) -> std::path::PathBuf {
        self.dir.path().join("plugin").join(name)
    }

    fn staging_root(&self) -> std::path::PathBuf {
        self.dir.path().join("staging")
    }

    fn updater(&self) -> Updater {
        let mut config = UpdaterConfig::new(self.dir.path().join("plugin"), "1.0.0");
        config.manifest_url = MANIFEST_URL.to_string();
        config.fallback_package_url = Some(FALLBACK_URL.to_string());
        config.staging_dir = Some(self.staging_root());
        Updater::new(config, self.transport.clone()).unwrap()
    }

    fn staging_is_empty(&self) -> bool {
        match fs::read_dir(self.staging_root()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

fn package_zip() -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = SimpleFileOptions::default();
        zip.add_directory("ai_diffusion/", options).unwrap();
        zip.start_file("ai_diffusion/__init__.py", options).unwrap();
        zip.write_all(b"2.0.0").unwrap();
        zip.start_file("ai_diffusion/ui/login.py", options).unwrap();
        zip.write_all(b"# login form").unwrap();
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

#[tokio::test]
async fn test_full_update_merges_into_plugin_dir() {
    let fixture = Fixture::new();
    let archive = package_zip();
    fixture.transport.respond_json(
        MANIFEST_URL,
        &json!({"version": "2.0.0", "url": PACKAGE_URL, "sha256": sha256_hex(&archive)}),
    );
    fixture.transport.respond(PACKAGE_URL, 200, archive);

    let mut updater = fixture.updater();
    assert_eq!(updater.check().await, UpdateState::Available);
    assert_eq!(updater.apply().await.unwrap(), UpdateState::RestartRequired);

    assert_eq!(updater.current_version(), "2.0.0");
    assert!(updater.package().is_none());
    assert_eq!(
        fs::read(fixture.plugin_file("ai_diffusion/__init__.py")).unwrap(),
        b"2.0.0"
    );
    assert!(fixture.plugin_file("ai_diffusion/ui/login.py").exists());
    assert_eq!(
        fs::read(fixture.plugin_file("ai_diffusion/styles.json")).unwrap(),
        b"user data"
    );
    assert!(fixture.staging_is_empty());
}

#[tokio::test]
async fn test_restart_required_is_sticky() {
    let fixture = Fixture::new();
    fixture.transport.respond_json(
        MANIFEST_URL,
        &json!({"version": "2.0.0", "url": PACKAGE_URL, "sha256": ""}),
    );
    fixture.transport.respond(PACKAGE_URL, 200, package_zip());

    let mut updater = fixture.updater();
    updater.check().await;
    updater.apply().await.unwrap();

    let calls = fixture.transport.call_count();
    assert_eq!(updater.check().await, UpdateState::RestartRequired);
    assert_eq!(fixture.transport.call_count(), calls);
}

#[tokio::test]
async fn test_hash_mismatch_leaves_plugin_untouched() {
    let fixture = Fixture::new();
    fixture.transport.respond_json(
        MANIFEST_URL,
        &json!({"version": "2.0.0", "url": PACKAGE_URL, "sha256": sha256_hex(b"something else")}),
    );
    fixture.transport.respond(PACKAGE_URL, 200, package_zip());

    let mut updater = fixture.updater();
    updater.check().await;
    assert_eq!(updater.apply().await.unwrap(), UpdateState::FailedUpdate);

    assert!(updater.error().contains("corrupted"));
    assert_eq!(updater.current_version(), "1.0.0");
    assert_eq!(
        fs::read(fixture.plugin_file("ai_diffusion/__init__.py")).unwrap(),
        b"1.0.0"
    );
    assert!(!fixture.plugin_file("ai_diffusion/ui/login.py").exists());
    assert!(fixture.staging_is_empty());
}

#[tokio::test]
async fn test_failed_update_can_be_retried() {
    let fixture = Fixture::new();
    fixture.transport.respond_json(
        MANIFEST_URL,
        &json!({"version": "2.0.0", "url": PACKAGE_URL, "sha256": ""}),
    );
    fixture.transport.fail_refused(PACKAGE_URL);

    let mut updater = fixture.updater();
    updater.check().await;
    assert_eq!(updater.apply().await.unwrap(), UpdateState::FailedUpdate);
    assert!(updater.package().is_some());
    assert_eq!(updater.latest_version(), "2.0.0");

    fixture.transport.respond(PACKAGE_URL, 200, package_zip());
    assert_eq!(updater.apply().await.unwrap(), UpdateState::RestartRequired);
    assert!(updater.error().is_empty());
}

#[tokio::test]
async fn test_corrupt_archive_fails_update() {
    let fixture = Fixture::new();
    fixture.transport.respond_json(
        MANIFEST_URL,
        &json!({"version": "2.0.0", "url": PACKAGE_URL, "sha256": ""}),
    );
    fixture.transport.respond(PACKAGE_URL, 200, &b"not a zip"[..]);

    let mut updater = fixture.updater();
    updater.check().await;
    assert_eq!(updater.apply().await.unwrap(), UpdateState::FailedUpdate);
    assert!(updater.error().starts_with("archive error"));
    assert!(fixture.staging_is_empty());
}

#[tokio::test]
async fn test_empty_url_downloads_from_fallback() {
    let fixture = Fixture::new();
    fixture.transport.respond_json(
        MANIFEST_URL,
        &json!({"version": "2.0.0", "url": "", "sha256": "abc123"}),
    );

    let mut updater = fixture.updater();
    assert_eq!(updater.check().await, UpdateState::Available);
    assert_eq!(updater.latest_version(), "2.0.0");
    assert_eq!(updater.package().unwrap().download_url, FALLBACK_URL);

    fixture.transport.respond(FALLBACK_URL, 200, package_zip());
    assert_eq!(updater.apply().await.unwrap(), UpdateState::FailedUpdate);

    let downloads: Vec<_> = fixture
        .transport
        .calls()
        .into_iter()
        .filter(|c| c.kind == CallKind::Download)
        .collect();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].url, FALLBACK_URL);
}

#[tokio::test]
async fn test_apply_after_up_to_date_is_rejected() {
    let fixture = Fixture::new();
    fixture
        .transport
        .respond_json(MANIFEST_URL, &json!({"version": "1.0.0"}));

    let mut updater = fixture.updater();
    assert_eq!(updater.check().await, UpdateState::UpToDate);

    let err = updater.apply().await.unwrap_err();
    assert!(matches!(
        err,
        UpdateError::NoPendingUpdate {
            state: UpdateState::UpToDate
        }
    ));
    assert_eq!(updater.state(), UpdateState::UpToDate);
}

#[tokio::test]
async fn test_incomplete_descriptor_drops_pending_package() {
    let fixture = Fixture::new();
    fixture.transport.respond_json(
        MANIFEST_URL,
        &json!({"version": "2.0.0", "url": PACKAGE_URL, "sha256": ""}),
    );

    let mut updater = fixture.updater();
    updater.check().await;
    assert!(updater.package().is_some());

    fixture
        .transport
        .respond_json(MANIFEST_URL, &json!({"version": "3.0.0", "url": PACKAGE_URL}));
    assert_eq!(updater.check().await, UpdateState::FailedCheck);
    assert_eq!(updater.error(), "incomplete package descriptor");
    assert!(updater.package().is_none());
    assert_eq!(updater.latest_version(), "2.0.0");
}
