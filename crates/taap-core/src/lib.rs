//! Core configuration for the TaaP test client.
//!
//! This crate provides the configuration surface shared by the platform's
//! collaborators:
//!
//! - **Sections**: immutable settings for the database, Redis, the HTTP API,
//!   container orchestration, and monitoring
//! - **Loading**: defaults, an optional YAML/TOML/JSON file, then environment
//!   overrides
//! - **Errors**: [`ConfigError`], the only error the HTTP client raises
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use taap_core::Config;
//!
//! # fn example() -> Result<(), taap_core::ConfigError> {
//! let config = Config::load(Some(Path::new("taap.yaml")))?;
//! config.validate()?;
//!
//! println!("API base URL: {}", config.api.base_url);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;

pub use config::{
    ApiConfig, Config, ContainerConfig, DatabaseConfig, MonitoringConfig, RedisConfig,
};
pub use error::{ConfigError, Result};
