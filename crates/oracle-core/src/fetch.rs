//! HTTP fetch capability supplied by the host
use crate::stage::StageError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFetchOptions {
    pub method: String,
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpFetchOptions {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: BTreeMap::new(),
        }
    }
}

impl HttpFetchOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            bytes: body.into(),
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body as text for diagnostics.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// One outbound request. Implementations must not retry.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, url: &str, options: &HttpFetchOptions)
        -> Result<HttpResponse, StageError>;
}

/// In-process fetcher that answers by URL host and records every request.
///
/// Hosts without a canned answer get `200 "Unknown request"`, which no
/// provider parser accepts.
#[derive(Debug, Default)]
pub struct CannedFetch {
    by_host: HashMap<String, HttpResponse>,
    fallback: Option<HttpResponse>,
    calls: Mutex<Vec<String>>,
}

impl CannedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests to `host` with `response`.
    pub fn route(mut self, host: impl Into<String>, response: HttpResponse) -> Self {
        self.by_host.insert(host.into(), response);
        self
    }

    /// Answer every request, whatever the host, with `response`.
    pub fn always(mut self, response: HttpResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HttpFetch for CannedFetch {
    async fn fetch(
        &self,
        url: &str,
        _options: &HttpFetchOptions,
    ) -> Result<HttpResponse, StageError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }

        let parsed = Url::parse(url).map_err(|e| StageError::fetch(0, e.to_string()))?;
        let host = parsed.host_str().unwrap_or_default();

        if let Some(response) = self.by_host.get(host) {
            return Ok(response.clone());
        }
        Ok(self
            .fallback
            .clone()
            .unwrap_or_else(|| HttpResponse::ok("Unknown request")))
    }
}
