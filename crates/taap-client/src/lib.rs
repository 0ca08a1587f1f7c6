//! HTTP client for the `TaaP` API.
//!
//! This crate sends requests to a configured API endpoint on behalf of test
//! drivers, including:
//!
//! - Sliding-window client-side rate limiting
//! - Exponential-backoff retries of transport failures
//! - A uniform [`ApiResponse`] envelope for every outcome
//! - Async ([`ApiClient`]) and blocking ([`BlockingApiClient`]) entry points
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │ BlockingApiClient│────▶│    ApiClient     │
//! │ (own runtime)    │     │ (retry, backoff) │
//! └──────────────────┘     └───┬─────────┬────┘
//!                              │         │
//!                 ┌────────────▼───┐ ┌───▼──────────────┐
//!                 │  RateLimiter   │ │    Transport     │
//!                 │ (shared window)│ │    (trait)       │
//!                 └────────────────┘ └───┬──────────┬───┘
//!                                        │          │
//!                          ┌─────────────▼──┐  ┌────▼───────────┐
//!                          │SessionTransport│  │OneShotTransport│
//!                          │ (pooled)       │  │ (per request)  │
//!                          └────────────────┘  └────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use taap_client::ApiClient;
//! use taap_core::ApiConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = ApiConfig::new("http://localhost:8080");
//! config.auth_token = Some("secret".to_string());
//!
//! let client = ApiClient::new(config)?;
//! let resp = client.get("/health").await;
//!
//! if resp.success {
//!     println!("{} in {:.3}s", resp.status_code, resp.elapsed_secs());
//! } else {
//!     println!("failed: {:?}", resp.error);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blocking;
pub mod client;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod rate_limit;
pub mod response;
pub mod transport;

pub use blocking::BlockingApiClient;
pub use client::{backoff_delay, ApiClient, ApiClientBuilder, RequestOptions, DEFAULT_USER_AGENT};
pub use error::{ConfigError, Result, TransportError};
pub use rate_limit::{Clock, RateLimiter, SystemClock};
pub use response::{ApiResponse, Payload};
pub use transport::{OneShotTransport, RawResponse, SessionTransport, Transport, TransportRequest};

pub use reqwest::header::{HeaderName, HeaderValue};
pub use reqwest::Method;

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockResponse, MockTransport, RecordedRequest};
#[cfg(any(test, feature = "test-utils"))]
pub use rate_limit::MockClock;
