//! Transport error types.

use std::time::Duration;

use thiserror::Error;

pub use taap_core::{ConfigError, Result};

/// A failure before a well-formed response was obtained.
///
/// These errors are retried by the client and, once attempts run out,
/// reported through [`ApiResponse::error`](crate::ApiResponse::error) rather
/// than returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The attempt did not complete within the per-attempt timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request failed after a connection was made.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be read or decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Returns `true` if the attempt timed out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Classify a `reqwest` error raised while sending.
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
