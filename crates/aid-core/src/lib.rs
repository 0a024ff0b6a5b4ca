//! # aid-core
//!
//! Shared building blocks for the AI Diffusion plugin client.
//!
//! This crate holds the seams the updater and the auth session talk through:
//! - [`net::HttpTransport`]: single-shot `GET` and streaming download
//! - [`settings::SettingsStore`]: persisted user settings with atomic `save()`
//! - [`clock::Clock`]: wall-clock source, replaceable in tests
//!
//! [`harness`] carries in-memory doubles used by the test suites of the
//! dependent crates.

pub mod clock;
pub mod harness;
pub mod net;
pub mod settings;

pub use clock::{Clock, ManualClock, SystemClock};
pub use net::{
    DownloadProgress, HttpResponse, HttpTransport, NetworkConfig, ReqwestTransport,
    TransportError,
};
pub use settings::{JsonFileSettings, MemorySettings, Settings, SettingsError, SettingsStore};
