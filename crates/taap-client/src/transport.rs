//! The transport seam between the client and the network.
//!
//! [`ApiClient`](crate::ApiClient) never talks to `reqwest` directly; it hands
//! a fully resolved [`TransportRequest`] to a [`Transport`] and gets back the
//! raw status, headers, and body. Two HTTP adapters are provided:
//!
//! - [`SessionTransport`] keeps one `reqwest::Client` (and its connection
//!   pool) for the client's lifetime
//! - [`OneShotTransport`] builds a fresh client for every attempt, so no
//!   connection outlives a request

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use taap_core::ApiConfig;

use crate::error::{ConfigError, Result, TransportError};

/// A fully resolved request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL, without the query string.
    pub url: String,
    /// Merged request headers.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

/// The undecoded response to one attempt.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderMap,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Something that can perform one HTTP exchange.
///
/// Implementations report failures to obtain a response as
/// [`TransportError`]; any response that arrives, whatever its status, is
/// `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if no response was obtained within the timeout.
    async fn send(&self, request: TransportRequest) -> std::result::Result<RawResponse, TransportError>;
}

/// Transport backed by one long-lived `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct SessionTransport {
    client: reqwest::Client,
}

impl SessionTransport {
    /// Build a pooled client honoring `config.verify_ssl`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Init`] if the HTTP client cannot be created.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.verify_ssl)?,
        })
    }

    /// Wrap an existing `reqwest::Client`.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for SessionTransport {
    async fn send(&self, request: TransportRequest) -> std::result::Result<RawResponse, TransportError> {
        send_with(&self.client, request).await
    }
}

/// Transport that creates a new `reqwest::Client` for every request.
#[derive(Debug, Clone, Copy)]
pub struct OneShotTransport {
    verify_ssl: bool,
}

impl OneShotTransport {
    /// Create a one-shot transport honoring `config.verify_ssl`.
    #[must_use]
    pub const fn new(config: &ApiConfig) -> Self {
        Self {
            verify_ssl: config.verify_ssl,
        }
    }
}

#[async_trait]
impl Transport for OneShotTransport {
    async fn send(&self, request: TransportRequest) -> std::result::Result<RawResponse, TransportError> {
        let client =
            build_client(self.verify_ssl).map_err(|e| TransportError::Request(e.to_string()))?;
        send_with(&client, request).await
    }
}

fn build_client(verify_ssl: bool) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .danger_accept_invalid_certs(!verify_ssl)
        .build()
        .map_err(|e| ConfigError::Init {
            what: "HTTP client",
            reason: e.to_string(),
        })
}

async fn send_with(
    client: &reqwest::Client,
    request: TransportRequest,
) -> std::result::Result<RawResponse, TransportError> {
    let TransportRequest {
        method,
        url,
        headers,
        body,
        query,
        timeout,
    } = request;

    let mut builder = client.request(method, &url).headers(headers).timeout(timeout);
    if !query.is_empty() {
        builder = builder.query(&query);
    }
    if let Some(body) = &body {
        builder = builder.json(body);
    }

    let response = builder
        .send()
        .await
        .map_err(|e| TransportError::from_reqwest(&e, timeout))?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response
        .bytes()
        .await
        .map_err(|e| TransportError::from_reqwest(&e, timeout))?;

    Ok(RawResponse {
        status,
        headers,
        body: body.to_vec(),
    })
}
