//! reqwest-backed fetch capability for the local host
use async_trait::async_trait;
use oracle_core::{HttpFetch, HttpFetchOptions, HttpResponse, StageError};
use reqwest::Method;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn fetch(
        &self,
        url: &str,
        options: &HttpFetchOptions,
    ) -> Result<HttpResponse, StageError> {
        let method = Method::from_bytes(options.method.as_bytes())
            .map_err(|e| StageError::fetch(0, e.to_string()))?;

        let mut request = self.client.request(method, url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| StageError::fetch(0, e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StageError::fetch(status, e.to_string()))?;

        tracing::debug!(url, status, len = bytes.len(), "price feed responded");
        Ok(HttpResponse::new(status, bytes.to_vec()))
    }
}
