//! Configuration error types.
//!
//! This module defines the only error that crosses the client's public API
//! boundary: invalid or unloadable configuration.

use thiserror::Error;

/// A result type using `ConfigError`.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading, validating, or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is missing or out of range.
    #[error("invalid configuration: {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field (e.g. `api.base_url`).
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// The environment variable name.
        var: String,
        /// The raw value that failed to parse.
        value: String,
    },

    /// The configuration file exists but could not be read or parsed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A runtime resource needed by a client could not be created.
    #[error("failed to initialize {what}: {reason}")]
    Init {
        /// The resource being created (e.g. "HTTP client").
        what: &'static str,
        /// The underlying failure.
        reason: String,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Configuration errors are programming errors and are never retried.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        false
    }
}
