//! A blocking wrapper around [`ApiClient`].
//!
//! [`BlockingApiClient`] owns a private current-thread tokio runtime and
//! drives the async pipeline to completion on it, so rate-limit waits and
//! backoff delays block the calling thread for exactly the durations the
//! async client would suspend for.

use reqwest::Method;
use taap_core::ApiConfig;
use tokio::runtime::Runtime;

use crate::client::{ApiClient, RequestOptions};
use crate::error::{ConfigError, Result};
use crate::response::ApiResponse;

/// Synchronous API client.
///
/// Must not be used from inside an async context: every call blocks the
/// current thread on a private runtime.
#[derive(Debug)]
pub struct BlockingApiClient {
    client: ApiClient,
    runtime: Runtime,
}

impl BlockingApiClient {
    /// Create a blocking client backed by a pooled session transport.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid or the
    /// runtime cannot be started.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::from_client(ApiClient::new(config)?)
    }

    /// Drive an existing async client from blocking code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Init`] if the runtime cannot be started.
    pub fn from_client(client: ApiClient) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ConfigError::Init {
                what: "blocking runtime",
                reason: e.to_string(),
            })?;

        Ok(Self { client, runtime })
    }

    /// The async client this wrapper drives.
    #[must_use]
    pub const fn async_client(&self) -> &ApiClient {
        &self.client
    }

    /// Execute a request, blocking until the final outcome.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime.
    pub fn execute(&self, method: Method, path: &str, options: RequestOptions) -> ApiResponse {
        self.runtime
            .block_on(self.client.execute(method, path, options))
    }

    /// Blocking `GET path`.
    pub fn get(&self, path: &str) -> ApiResponse {
        self.execute(Method::GET, path, RequestOptions::new())
    }

    /// Blocking `GET path` with query parameters and headers.
    pub fn get_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::GET, path, options)
    }

    /// Blocking `POST path` with a JSON body.
    pub fn post(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.execute(Method::POST, path, RequestOptions::new().json(body))
    }

    /// Blocking `POST path` with full options.
    pub fn post_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::POST, path, options)
    }

    /// Blocking `PUT path` with a JSON body.
    pub fn put(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.execute(Method::PUT, path, RequestOptions::new().json(body))
    }

    /// Blocking `PUT path` with full options.
    pub fn put_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::PUT, path, options)
    }

    /// Blocking `PATCH path` with a JSON body.
    pub fn patch(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.execute(Method::PATCH, path, RequestOptions::new().json(body))
    }

    /// Blocking `PATCH path` with full options.
    pub fn patch_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::PATCH, path, options)
    }

    /// Blocking `DELETE path`.
    pub fn delete(&self, path: &str) -> ApiResponse {
        self.execute(Method::DELETE, path, RequestOptions::new())
    }

    /// Blocking `DELETE path` with full options.
    pub fn delete_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::DELETE, path, options)
    }
}
