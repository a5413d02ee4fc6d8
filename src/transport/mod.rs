//! Outbound transmission.
//!
//! The retry protocol only needs "POST this body with these headers, tell me
//! the status and body", so the wire is behind the [`Transport`] trait and
//! tests never open a socket.

pub mod headers;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::config::CONNECT_TIMEOUT;
use crate::error::{Error, Result};

/// Outcome of a single transmission attempt that produced a response.
#[derive(Debug, Clone)]
pub struct AttemptResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl AttemptResponse {
    /// Whether the status is in the HTTP success range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for the outbound call seam.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a JSON-serialized body to `url` with the given headers.
    ///
    /// Transport-level failures (no response at all) surface as `Err`; the
    /// retry loop treats them the same as non-success statuses.
    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: HeaderMap,
    ) -> Result<AttemptResponse>;

    /// Name of this transport.
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Blanket impl for `Arc<T>`.
#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: HeaderMap,
    ) -> Result<AttemptResponse> {
        (**self).post(url, body, headers).await
    }
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Real HTTP transport over reqwest.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default client configuration.
    ///
    /// Per-attempt deadlines are enforced by the dispatcher, so only the
    /// connect timeout is set here.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }

    /// Create with a custom reqwest client (testing or custom TLS config).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        headers: HeaderMap,
    ) -> Result<AttemptResponse> {
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    Error::Network(e)
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(AttemptResponse { status, body })
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        for (status, ok) in [(199, false), (200, true), (204, true), (299, true), (300, false), (403, false)] {
            let resp = AttemptResponse {
                status,
                body: String::new(),
            };
            assert_eq!(resp.is_success(), ok, "status {}", status);
        }
    }
}
