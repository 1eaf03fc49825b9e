//! Transport abstraction.
//!
//! The dispatcher only needs "send one request, get status, headers and a body
//! stream back". [`Transport`] captures exactly that, so sessions can run over
//! [`ReqwestTransport`] in production and over a scripted transport in tests.
//!
//! Bodies are handed back as a lazy byte stream; nothing is buffered until the
//! caller reads the [`Response`](crate::client::Response).

use crate::client::config::ClientConfig;
use crate::error::{AffinityError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use http::{HeaderMap, Method, StatusCode};
use std::time::Duration;
use url::Url;

/// Lazily read response body.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// A fully resolved request, ready to be sent.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute request URL
    pub url: Url,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Bytes>,
    /// Timeout for this request
    pub timeout: Option<Duration>,
}

/// Raw response returned by a [`Transport`].
pub struct TransportResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Final URL of the response
    pub url: Url,
    /// Unread body
    pub body: BodyStream,
}

impl TransportResponse {
    /// Build a response whose body is already in memory.
    pub fn from_bytes(status: StatusCode, headers: HeaderMap, url: Url, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        TransportResponse {
            status,
            headers,
            url,
            body: stream::once(async move { Ok(body) }).boxed(),
        }
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("url", &self.url.as_str())
            .finish_non_exhaustive()
    }
}

/// The HTTP primitive sessions are built on.
///
/// Implementations own connection pooling, TLS, redirects and the like. A
/// non-2xx status is a successful send; only failures to exchange the request
/// are errors, and they should be reported as [`AffinityError::Transport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response with its body unread.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with default configuration
    pub fn new() -> Self {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a transport using the timeout and proxy settings of `config`
    pub fn with_config(config: &ClientConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms));

        if !config.proxy_url.is_empty() {
            match reqwest::Proxy::all(&config.proxy_url) {
                Ok(proxy) => builder = builder.proxy(proxy),
                Err(e) => tracing::warn!("ignoring invalid proxy URL {}: {}", config.proxy_url, e),
            }
        }

        let client = builder.build().unwrap_or_default();

        ReqwestTransport { client }
    }

    /// Wrap an existing reqwest client
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut req_builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            req_builder = req_builder.timeout(timeout);
        }

        let response = req_builder.send().await.map_err(AffinityError::transport)?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().clone();
        let body = response
            .bytes_stream()
            .map_err(AffinityError::transport)
            .boxed();

        Ok(TransportResponse {
            status,
            headers,
            url,
            body,
        })
    }
}
