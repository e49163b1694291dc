//! HTTP transport used by the remote source.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use safebox_common::{Error, Result};

/// Status and body of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response from a status and a JSON value.
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: body.to_string().into_bytes(),
        }
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::Serialization(format!("Failed to parse response: {}", e)))
    }

    /// Body as lossy UTF-8, for error messages.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Abstract JSON-over-POST capability.
///
/// A transport failure (no response at all) is reported as
/// `Error::Connectivity`; any received response, including non-2xx ones,
/// is returned as `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the default client settings.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("SafeBox/0.1")
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Connectivity(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<HttpResponse> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Connectivity(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Connectivity(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
