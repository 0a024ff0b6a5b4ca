//! Test harness for the plugin client.
//!
//! [`StaticTransport`] answers requests from a table of canned responses and
//! records every call, so tests can assert both on outcomes and on how many
//! network round trips were made.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::net::{HttpResponse, HttpTransport, TransportError};

/// A canned answer for one URL.
#[derive(Debug, Clone)]
pub enum Canned {
    Respond { status: u16, body: Bytes },
    Timeout,
    Refused,
}

/// Kind of call recorded by [`StaticTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Get,
    Download,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub url: String,
    pub query: Vec<(String, String)>,
}

/// In-memory [`HttpTransport`] with canned responses.
///
/// Unknown URLs answer `404`.
#[derive(Default)]
pub struct StaticTransport {
    routes: Mutex<HashMap<String, Canned>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<Bytes>) {
        self.routes.lock().insert(
            url.to_string(),
            Canned::Respond {
                status,
                body: body.into(),
            },
        );
    }

    pub fn respond_json(&self, url: &str, value: &serde_json::Value) {
        self.respond(url, 200, value.to_string());
    }

    pub fn fail_timeout(&self, url: &str) {
        self.routes.lock().insert(url.to_string(), Canned::Timeout);
    }

    pub fn fail_refused(&self, url: &str) {
        self.routes.lock().insert(url.to_string(), Canned::Refused);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.url == url).count()
    }

    fn lookup(&self, kind: CallKind, url: &str, query: &[(&str, &str)]) -> Canned {
        self.calls.lock().push(RecordedCall {
            kind,
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });

        self.routes
            .lock()
            .get(url)
            .cloned()
            .unwrap_or(Canned::Respond {
                status: 404,
                body: Bytes::new(),
            })
    }
}

#[async_trait]
impl HttpTransport for StaticTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<HttpResponse, TransportError> {
        match self.lookup(CallKind::Get, url, query) {
            Canned::Respond { status, body } => Ok(HttpResponse { status, body }),
            Canned::Timeout => Err(TransportError::Timeout(format!("GET {url}"))),
            Canned::Refused => Err(TransportError::Connect(format!("{url}: connection refused"))),
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        match self.lookup(CallKind::Download, url, &[]) {
            Canned::Respond { status, body } if (200..300).contains(&status) => {
                tokio::fs::write(dest, &body).await?;
                Ok(body.len() as u64)
            }
            Canned::Respond { status, .. } => Err(TransportError::Status { status }),
            Canned::Timeout => Err(TransportError::Timeout(format!("download {url}"))),
            Canned::Refused => Err(TransportError::Connect(format!("{url}: connection refused"))),
        }
    }
}
