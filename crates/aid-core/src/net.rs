//! HTTP transport.
//!
//! Everything the plugin client sends over the network goes through
//! [`HttpTransport`]: a single-shot `GET` for small JSON documents and a
//! streaming `download` that writes a response body straight to a file.
//! [`ReqwestTransport`] is the production implementation; timeouts are
//! explicit and come from [`NetworkConfig`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Default connect timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout for `GET` in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default read timeout for streaming downloads in seconds.
const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request or read timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// DNS failure, connection refused, TLS handshake failure
    #[error("connection failed: {0}")]
    Connect(String),

    /// Server answered a download with a non-success status
    #[error("download failed with status {status}")]
    Status { status: u16 },

    /// Any other failure while talking to the server
    #[error("network error: {0}")]
    Network(String),

    /// Local IO error while writing a download
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network access used by the updater and the auth session.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one `GET` request with the given query parameters and buffer the body.
    ///
    /// A non-success status is not an error here; callers decide what it means.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, TransportError>;

    /// Stream the body at `url` into `dest`, returning the number of bytes written.
    ///
    /// Fails with [`TransportError::Status`] if the server does not answer 2xx.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError>;
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout for `GET` in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Read timeout for streaming downloads in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            read_timeout_secs: default_read_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_read_timeout() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("aid-plugin/{}", env!("CARGO_PKG_VERSION"))
}

/// Progress callback type for download progress reporting.
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// [`HttpTransport`] backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    request_timeout: Duration,
    progress_callback: Option<ProgressCallback>,
}

impl ReqwestTransport {
    pub fn new(config: &NetworkConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            progress_callback: None,
        })
    }

    /// Set the progress callback invoked for every chunk written by `download`.
    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(DownloadProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
    }

    fn report_progress(&self, downloaded: u64, total: Option<u64>) {
        if let Some(callback) = &self.progress_callback {
            callback(DownloadProgress { downloaded, total });
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        // Query values may carry credentials; only the bare URL is logged.
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!(url = %url, status, bytes = body.len(), "GET complete");

        Ok(HttpResponse { status, body })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        info!(url = %url, dest = %dest.display(), "Starting download");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        self.report_progress(downloaded, total);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| TransportError::Network(e.to_string()))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            self.report_progress(downloaded, total);
        }

        file.flush().await?;
        file.sync_all().await?;

        info!(bytes = downloaded, "Download complete");
        Ok(downloaded)
    }
}

/// Download progress information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub downloaded: u64,
    /// Total bytes, when the server announced a length.
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Progress as a percentage (0.0 to 100.0), if the total is known.
    pub fn percentage(&self) -> Option<f64> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.downloaded as f64 / total as f64) * 100.0),
        }
    }
}

impl std::fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.total, self.percentage()) {
            (Some(total), Some(pct)) => {
                write!(f, "{}/{} bytes ({:.1}%)", self.downloaded, total, pct)
            }
            _ => write!(f, "{} bytes", self.downloaded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config_default() {
        let config = NetworkConfig::default();
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.read_timeout_secs, 60);
        assert!(config.user_agent.starts_with("aid-plugin/"));
    }

    #[test]
    fn test_network_config_partial_json_uses_defaults() {
        let config: NetworkConfig =
            serde_json::from_str(r#"{"request_timeout_secs": 5}"#).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn test_http_response_success_range() {
        assert!(HttpResponse::new(200, "ok").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
        assert!(!HttpResponse::new(500, "").is_success());
    }

    #[test]
    fn test_download_progress_display() {
        let known = DownloadProgress {
            downloaded: 50,
            total: Some(200),
        };
        assert_eq!(known.percentage(), Some(25.0));
        assert_eq!(known.to_string(), "50/200 bytes (25.0%)");

        let unknown = DownloadProgress {
            downloaded: 7,
            total: None,
        };
        assert_eq!(unknown.percentage(), None);
        assert_eq!(unknown.to_string(), "7 bytes");
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(&NetworkConfig::default()).is_ok());
    }
}
