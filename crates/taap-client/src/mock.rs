//! A scripted in-memory transport for tests.
//!
//! [`MockTransport`] answers requests without touching the network. Each
//! request is resolved, in order, from:
//!
//! 1. the queued script of outcomes ([`MockTransport::push_response`],
//!    [`MockTransport::push_error`])
//! 2. the fallback error, if one is set ([`MockTransport::fail_always`])
//! 3. the route table keyed by `METHOD:path` ([`MockTransport::add_response`])
//! 4. a `404 {"error": "Not found"}` JSON response
//!
//! Every request is logged, whatever its outcome.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::transport::{RawResponse, Transport, TransportRequest};

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl MockResponse {
    /// A JSON response with `Content-Type: application/json`.
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: body.to_string().into_bytes(),
        }
    }

    /// A plain-text response.
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
        Self {
            status,
            headers,
            body: body.into().into_bytes(),
        }
    }

    /// A response with an arbitrary body and no headers.
    #[must_use]
    pub fn raw(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add or replace a header.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `value` is not a valid header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(
            HeaderName::from_bytes(name.as_bytes()).expect("invalid header name"),
            HeaderValue::from_str(value).expect("invalid header value"),
        );
        self
    }

    fn into_raw(self) -> RawResponse {
        RawResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Full URL as sent.
    pub url: String,
    /// URL path component.
    pub path: String,
    /// Headers as sent.
    pub headers: HeaderMap,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Per-attempt timeout the client asked for.
    pub timeout: Duration,
    /// Wall-clock time the request reached the transport.
    pub timestamp: DateTime<Utc>,
    /// The same moment on the tokio clock, for measuring gaps in paused tests.
    pub instant: Instant,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Result<MockResponse, TransportError>>,
    fallback_error: Option<TransportError>,
    routes: HashMap<String, MockResponse>,
    log: Vec<RecordedRequest>,
}

/// Scripted transport with a request log.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    latency: Option<Duration>,
}

impl MockTransport {
    /// Create an empty mock; every request answers 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `latency` (on the tokio clock).
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Register a route answer for `method` and `path`.
    pub fn add_response(&self, method: &str, path: &str, response: MockResponse) {
        self.state
            .lock()
            .routes
            .insert(route_key(method, path), response);
    }

    /// Queue a response for the next unanswered request.
    pub fn push_response(&self, response: MockResponse) {
        self.state.lock().script.push_back(Ok(response));
    }

    /// Queue a transport failure for the next unanswered request.
    pub fn push_error(&self, error: TransportError) {
        self.state.lock().script.push_back(Err(error));
    }

    /// Fail every request not answered by the script with `error`.
    pub fn fail_always(&self, error: TransportError) {
        self.state.lock().fallback_error = Some(error);
    }

    /// All requests seen so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().log.clone()
    }

    /// Count logged requests, optionally filtered by method and path.
    #[must_use]
    pub fn request_count(&self, method: Option<&str>, path: Option<&str>) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|r| method.map_or(true, |m| r.method.as_str().eq_ignore_ascii_case(m)))
            .filter(|r| path.map_or(true, |p| r.path == p))
            .count()
    }

    /// Forget all logged requests.
    pub fn clear_log(&self) {
        self.state.lock().log.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let path = reqwest::Url::parse(&request.url)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| request.url.clone());

        let outcome = {
            let mut state = self.state.lock();
            let key = route_key(request.method.as_str(), &path);

            state.log.push(RecordedRequest {
                method: request.method,
                url: request.url,
                path,
                headers: request.headers,
                body: request.body,
                query: request.query,
                timeout: request.timeout,
                timestamp: Utc::now(),
                instant: Instant::now(),
            });

            if let Some(scripted) = state.script.pop_front() {
                scripted
            } else if let Some(error) = &state.fallback_error {
                Err(error.clone())
            } else if let Some(response) = state.routes.get(&key) {
                Ok(response.clone())
            } else {
                Ok(MockResponse::json(
                    404,
                    &serde_json::json!({ "error": "Not found" }),
                ))
            }
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        outcome.map(MockResponse::into_raw)
    }
}

fn route_key(method: &str, path: &str) -> String {
    format!("{}:{path}", method.to_ascii_uppercase())
}
