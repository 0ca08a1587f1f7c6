//! The rate-limited, retrying API client.
//!
//! Every request goes through the same pipeline:
//!
//! ```text
//! execute(method, path, options)
//!   │  join base URL + path, merge headers over defaults
//!   ▼
//! ┌─────────────── attempt 0..=retries ───────────────┐
//! │ RateLimiter::can_proceed()  ── no ──▶ sleep(wait)  │
//! │ Transport::send(timeout)                           │
//! │   ├─ response ──▶ decode body ──▶ return envelope  │
//! │   └─ failure  ──▶ sleep(2^attempt s), next attempt │
//! └────────────────────────────────────────────────────┘
//!   ▼
//! ApiResponse { status_code: 0, error: last failure }
//! ```
//!
//! Only failures to obtain a response are retried. A 4xx or 5xx response is
//! a definitive answer and is returned after a single attempt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::Method;
use taap_core::ApiConfig;
use tokio::time::Instant;
use tracing::Instrument;

use crate::error::{ConfigError, Result, TransportError};
use crate::rate_limit::RateLimiter;
use crate::response::{ApiResponse, Payload};
use crate::transport::{OneShotTransport, RawResponse, SessionTransport, Transport, TransportRequest};

/// `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = "TaaP-Test-Client/1.0";

/// Per-request body, headers, and query parameters.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// JSON body.
    pub body: Option<serde_json::Value>,
    /// Headers that override the client defaults.
    pub headers: HeaderMap,
    /// Query parameters.
    pub query: Vec<(String, String)>,
}

impl RequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JSON body.
    #[must_use]
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header, replacing any earlier value for the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ApiConfig,
    transport: Option<Arc<dyn Transport>>,
    rate_limiter: Option<RateLimiter>,
    span: Option<tracing::Span>,
}

impl ApiClientBuilder {
    /// Use `transport` instead of a [`SessionTransport`].
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use `limiter` instead of one built from `config.rate_limit`.
    #[must_use]
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Emit all request events inside `span`.
    #[must_use]
    pub fn span(mut self, span: tracing::Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Validate the configuration and build the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid, the auth
    /// token is not a valid header value, or the HTTP client cannot be
    /// created.
    pub fn build(self) -> Result<ApiClient> {
        let config = self.config;
        config.validate()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let default_headers = default_headers(config.auth_token.as_deref())?;

        let rate_limiter = match self.rate_limiter {
            Some(limiter) => limiter,
            None => RateLimiter::new(config.rate_limit, ApiConfig::RATE_LIMIT_WINDOW)?,
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(SessionTransport::new(&config)?),
        };
        let span = self
            .span
            .unwrap_or_else(|| tracing::info_span!("api_client", base_url = %base_url));

        Ok(ApiClient {
            inner: Arc::new(Inner {
                base_url,
                timeout: config.timeout(),
                retries: config.retries,
                default_headers,
                rate_limiter,
                transport,
                span,
            }),
        })
    }
}

struct Inner {
    base_url: String,
    timeout: Duration,
    retries: u32,
    default_headers: HeaderMap,
    rate_limiter: RateLimiter,
    transport: Arc<dyn Transport>,
    span: tracing::Span,
}

/// HTTP API client with retry, exponential backoff, and rate limiting.
///
/// Cloning is cheap; clones share one rate limiter and one transport.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl ApiClient {
    /// Create a client backed by a pooled [`SessionTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    /// Create a client that opens a fresh connection for every attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn oneshot(config: ApiConfig) -> Result<Self> {
        let transport = Arc::new(OneShotTransport::new(&config));
        Self::builder(config).transport(transport).build()
    }

    /// Start building a client from `config`.
    #[must_use]
    pub fn builder(config: ApiConfig) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            transport: None,
            rate_limiter: None,
            span: None,
        }
    }

    /// Base URL with any trailing slash removed.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Headers sent with every request unless overridden.
    #[must_use]
    pub fn default_headers(&self) -> &HeaderMap {
        &self.inner.default_headers
    }

    /// The limiter shared by this client and its clones.
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    /// Join `path` onto the base URL with exactly one `/` between them.
    #[must_use]
    pub fn resolve_url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Execute a request, retrying transport failures.
    ///
    /// Never fails: connectivity problems and error statuses are reported
    /// through the returned envelope.
    pub async fn execute(&self, method: Method, path: &str, options: RequestOptions) -> ApiResponse {
        let url = self.resolve_url(path);
        let span = tracing::debug_span!(
            parent: &self.inner.span,
            "request",
            method = %method,
            url = %url,
        );
        self.run(method, url, options).instrument(span).await
    }

    async fn run(&self, method: Method, url: String, options: RequestOptions) -> ApiResponse {
        let inner = &*self.inner;
        let headers = merge_headers(&inner.default_headers, &options.headers);
        let start = Instant::now();
        let mut last_error = None;

        for attempt in 0..=inner.retries {
            self.apply_rate_limit().await;

            let request = TransportRequest {
                method: method.clone(),
                url: url.clone(),
                headers: headers.clone(),
                body: options.body.clone(),
                query: options.query.clone(),
                timeout: inner.timeout,
            };

            tracing::debug!(attempt = attempt + 1, "Sending request");
            let outcome = match tokio::time::timeout(inner.timeout, inner.transport.send(request)).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(inner.timeout)),
            };

            match outcome.and_then(decode) {
                Ok((status, payload, headers)) => {
                    let response = ApiResponse::received(status, payload, headers, start.elapsed());
                    tracing::debug!(
                        status,
                        elapsed_ms = response.elapsed.as_millis(),
                        "Request completed"
                    );
                    return response;
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Request attempt failed");
                    last_error = Some(e);
                    if attempt < inner.retries {
                        tokio::time::sleep(backoff_delay(attempt)).await;
                    }
                }
            }
        }

        let error = last_error.map(|e| e.to_string()).unwrap_or_default();
        tracing::error!(
            attempts = u64::from(inner.retries) + 1,
            error = %error,
            "Request failed, no attempts left"
        );
        ApiResponse::failed(error, start.elapsed())
    }

    /// Wait out the window if the limiter refuses admission.
    ///
    /// The attempt goes ahead after the wait without being re-admitted.
    async fn apply_rate_limit(&self) {
        let limiter = &self.inner.rate_limiter;
        if !limiter.can_proceed() {
            let wait = limiter.wait_time();
            if !wait.is_zero() {
                tracing::debug!(wait_ms = wait.as_millis(), "Rate limit reached, waiting");
                tokio::time::sleep(wait).await;
            }
        }
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// `GET path`.
    pub async fn get(&self, path: &str) -> ApiResponse {
        self.execute(Method::GET, path, RequestOptions::new()).await
    }

    /// `GET path` with query parameters and headers.
    pub async fn get_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::GET, path, options).await
    }

    /// `POST path` with a JSON body.
    pub async fn post(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.execute(Method::POST, path, RequestOptions::new().json(body)).await
    }

    /// `POST path` with full options.
    pub async fn post_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::POST, path, options).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.execute(Method::PUT, path, RequestOptions::new().json(body)).await
    }

    /// `PUT path` with full options.
    pub async fn put_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::PUT, path, options).await
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch(&self, path: &str, body: serde_json::Value) -> ApiResponse {
        self.execute(Method::PATCH, path, RequestOptions::new().json(body)).await
    }

    /// `PATCH path` with full options.
    pub async fn patch_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::PATCH, path, options).await
    }

    /// `DELETE path`.
    pub async fn delete(&self, path: &str) -> ApiResponse {
        self.execute(Method::DELETE, path, RequestOptions::new()).await
    }

    /// `DELETE path` with full options.
    pub async fn delete_with(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.execute(Method::DELETE, path, options).await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("timeout", &self.inner.timeout)
            .field("retries", &self.inner.retries)
            .field("rate_limiter", &self.inner.rate_limiter)
            .finish_non_exhaustive()
    }
}

/// Delay before the attempt after `attempt`: 1s, 2s, 4s, ...
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.min(63))
}

fn default_headers(auth_token: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    if let Some(token) = auth_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| ConfigError::invalid("api.auth_token", e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// Caller headers replace every default value of the same name.
fn merge_headers(defaults: &HeaderMap, overrides: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for name in overrides.keys() {
        merged.remove(name);
    }
    for (name, value) in overrides {
        merged.append(name.clone(), value.clone());
    }
    merged
}

type Decoded = (u16, Payload, HashMap<String, String>);

/// Decode the body as JSON when the response declares it, else as text.
///
/// A status outside `100..=999` is not a valid HTTP response and is treated
/// as a failed attempt.
fn decode(raw: RawResponse) -> std::result::Result<Decoded, TransportError> {
    if !(100..=999).contains(&raw.status) {
        return Err(TransportError::Request(format!(
            "invalid HTTP status {}",
            raw.status
        )));
    }

    let is_json = raw
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    let payload = if is_json {
        if raw.body.iter().all(u8::is_ascii_whitespace) {
            Payload::Json(serde_json::Value::Null)
        } else {
            serde_json::from_slice(&raw.body)
                .map(Payload::Json)
                .map_err(|e| TransportError::Decode(e.to_string()))?
        }
    } else {
        Payload::Text(String::from_utf8_lossy(&raw.body).into_owned())
    };

    let headers = raw
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();

    Ok((raw.status, payload, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockResponse, MockTransport};
    use serde_json::json;

    fn config(base_url: &str, retries: u32) -> ApiConfig {
        ApiConfig {
            retries,
            ..ApiConfig::new(base_url)
        }
    }

    fn client_with(config: ApiConfig) -> (ApiClient, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::new());
        let client = ApiClient::builder(config)
            .transport(mock.clone())
            .build()
            .unwrap();
        (client, mock)
    }

    fn gaps(mock: &MockTransport) -> Vec<Duration> {
        mock.requests()
            .windows(2)
            .map(|w| w[1].instant - w[0].instant)
            .collect()
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(2), Duration::from_secs(4));
        assert_eq!(backoff_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(ApiClient::new(ApiConfig::new("")).is_err());
        assert!(ApiClient::new(ApiConfig::new("not a url")).is_err());

        let mut bad = ApiConfig::new("http://x");
        bad.timeout = 0;
        assert!(ApiClient::new(bad).is_err());

        let mut bad = ApiConfig::new("http://x");
        bad.rate_limit = 0;
        assert!(ApiClient::new(bad).is_err());

        let mut bad = ApiConfig::new("http://x");
        bad.auth_token = Some("line\nbreak".to_string());
        assert!(matches!(
            ApiClient::new(bad),
            Err(ConfigError::Invalid { ref field, .. }) if field == "api.auth_token"
        ));
    }

    #[test]
    fn maximum_rate_limit_builds() {
        let mut config = ApiConfig::new("http://x");
        config.rate_limit = u32::MAX;
        let (client, _mock) = client_with(config);
        assert_eq!(client.rate_limiter().max_requests(), u32::MAX);
        assert!(client.rate_limiter().is_empty());
    }

    #[test]
    fn default_headers_without_token() {
        let (client, _mock) = client_with(ApiConfig::new("http://x"));
        let headers = client.default_headers();
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "application/json");
        assert_eq!(headers[USER_AGENT], DEFAULT_USER_AGENT);
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn default_headers_with_token() {
        let mut config = ApiConfig::new("http://x");
        config.auth_token = Some("secret".to_string());
        let (client, _mock) = client_with(config);
        assert_eq!(client.default_headers()[AUTHORIZATION], "Bearer secret");
    }

    #[test]
    fn url_joining() {
        for base in ["http://host:8080/", "http://host:8080"] {
            let (client, _mock) = client_with(ApiConfig::new(base));
            assert_eq!(client.resolve_url("/users"), "http://host:8080/users");
            assert_eq!(client.resolve_url("users"), "http://host:8080/users");
        }

        let (client, _mock) = client_with(ApiConfig::new("http://host/api/v1/"));
        assert_eq!(client.resolve_url("/items/3"), "http://host/api/v1/items/3");
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_has_no_backoff() {
        let (client, mock) = client_with(config("http://x", 3));
        mock.push_response(MockResponse::json(200, &json!({"ok": true})));

        let resp = client.get("/health").await;

        assert!(resp.success);
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.payload, Some(Payload::Json(json!({"ok": true}))));
        assert!(resp.error.is_none());
        assert!(resp.elapsed < Duration::from_millis(1));
        assert_eq!(mock.request_count(None, None), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transport_failures_with_exponential_backoff() {
        let (client, mock) = client_with(config("http://x", 3));
        mock.push_error(TransportError::Connect("refused".into()));
        mock.push_error(TransportError::Connect("refused".into()));
        mock.push_error(TransportError::Connect("refused".into()));
        mock.push_response(MockResponse::text(200, "finally"));

        let resp = client.get("/flaky").await;

        assert!(resp.success);
        assert_eq!(resp.payload, Some(Payload::Text("finally".to_string())));
        assert_eq!(mock.request_count(None, None), 4);
        assert_eq!(
            gaps(&mock),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(resp.elapsed, Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_errors_are_not_retried() {
        let (client, mock) = client_with(config("http://x", 5));
        mock.add_response(
            "GET",
            "/boom",
            MockResponse::json(500, &json!({"error": "internal"})),
        );

        let resp = client.get("/boom").await;

        assert_eq!(mock.request_count(None, None), 1);
        assert_eq!(resp.status_code, 500);
        assert!(!resp.success);
        assert!(resp.error.is_none());
        assert_eq!(resp.json::<serde_json::Value>().unwrap()["error"], "internal");
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_payload_is_kept() {
        let (client, _mock) = client_with(config("http://x", 2));

        let resp = client.get("/users/999").await;

        assert_eq!(resp.status_code, 404);
        assert!(!resp.success);
        assert!(resp.error.is_none());
        assert_eq!(resp.payload, Some(Payload::Json(json!({"error": "Not found"}))));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error() {
        let (client, mock) = client_with(config("http://x", 2));
        mock.push_error(TransportError::Connect("first".into()));
        mock.push_error(TransportError::Connect("second".into()));
        mock.fail_always(TransportError::Connect("last".into()));

        let resp = client.get("/down").await;

        assert_eq!(mock.request_count(None, None), 3);
        assert_eq!(resp.status_code, 0);
        assert!(!resp.success);
        assert!(resp.payload.is_none());
        assert!(resp.headers.is_empty());
        assert_eq!(resp.error.as_deref(), Some("connection failed: last"));
        assert_eq!(resp.elapsed, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_one_attempt() {
        let (client, mock) = client_with(config("http://x", 0));
        mock.fail_always(TransportError::Request("reset".into()));

        let resp = client.get("/once").await;

        assert_eq!(mock.request_count(None, None), 1);
        assert_eq!(resp.elapsed, Duration::ZERO);
        assert!(!resp.success);
    }

    #[tokio::test(start_paused = true)]
    async fn per_attempt_timeout_scenario() {
        let mut config = config("http://x", 2);
        config.timeout = 1;
        config.rate_limit = 100;
        let mock = Arc::new(MockTransport::new().with_latency(Duration::from_secs(60)));
        mock.add_response("GET", "/a", MockResponse::text(200, "too late"));
        let client = ApiClient::builder(config)
            .transport(mock.clone())
            .build()
            .unwrap();

        let resp = client.execute(Method::GET, "/a", RequestOptions::new()).await;

        assert_eq!(mock.request_count(Some("GET"), Some("/a")), 3);
        assert_eq!(resp.status_code, 0);
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("request timed out after 1s"));
        // three 1s timeouts plus 1s + 2s of backoff
        assert_eq!(resp.elapsed, Duration::from_secs(6));
        assert!(resp.elapsed >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_json_is_retried() {
        let (client, mock) = client_with(config("http://x", 1));
        mock.push_response(
            MockResponse::raw(200, "{not json").with_header("content-type", "application/json"),
        );
        mock.push_response(MockResponse::json(200, &json!([1, 2, 3])));

        let resp = client.get("/list").await;

        assert!(resp.success);
        assert_eq!(resp.payload, Some(Payload::Json(json!([1, 2, 3]))));
        assert_eq!(mock.request_count(None, None), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_json_exhausts_as_decode_error() {
        let (client, mock) = client_with(config("http://x", 0));
        mock.push_response(
            MockResponse::raw(200, "<html>").with_header("content-type", "application/json"),
        );

        let resp = client.get("/x").await;

        assert_eq!(resp.status_code, 0);
        assert!(resp
            .error
            .as_deref()
            .is_some_and(|e| e.starts_with("invalid response body")));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_status_is_a_failed_attempt() {
        let (client, mock) = client_with(config("http://x", 1));
        mock.push_response(MockResponse::raw(0, "odd"));
        mock.push_response(MockResponse::raw(42, "odder"));

        let resp = client.get("/a").await;

        assert_eq!(mock.request_count(None, None), 2);
        assert_eq!(resp.status_code, 0);
        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("request failed: invalid HTTP status 42"));
        assert_eq!(resp.elapsed, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_json_body_is_null() {
        let (client, mock) = client_with(config("http://x", 0));
        mock.push_response(
            MockResponse::raw(204, Vec::new()).with_header("content-type", "application/json"),
        );

        let resp = client.delete("/users/1").await;

        assert!(resp.success);
        assert_eq!(resp.payload, Some(Payload::Json(serde_json::Value::Null)));
    }

    #[tokio::test(start_paused = true)]
    async fn non_json_content_type_is_text() {
        let (client, mock) = client_with(config("http://x", 0));
        mock.push_response(
            MockResponse::raw(200, r#"{"looks":"like json"}"#).with_header("content-type", "text/html"),
        );

        let resp = client.get("/page").await;

        assert_eq!(
            resp.payload,
            Some(Payload::Text(r#"{"looks":"like json"}"#.to_string()))
        );
        assert_eq!(resp.header("Content-Type"), Some("text/html"));
    }

    #[tokio::test(start_paused = true)]
    async fn caller_headers_override_defaults() {
        let mut config = config("http://x", 0);
        config.auth_token = Some("default-token".to_string());
        let (client, mock) = client_with(config);

        let options = RequestOptions::new()
            .header(ACCEPT, HeaderValue::from_static("text/csv"))
            .header(
                HeaderName::from_static("x-request-id"),
                HeaderValue::from_static("abc"),
            );
        client.get_with("/export", options).await;

        let sent = &mock.requests()[0].headers;
        assert_eq!(sent[ACCEPT], "text/csv");
        assert_eq!(sent.get_all(ACCEPT).iter().count(), 1);
        assert_eq!(sent["x-request-id"], "abc");
        assert_eq!(sent[CONTENT_TYPE], "application/json");
        assert_eq!(sent[AUTHORIZATION], "Bearer default-token");
    }

    #[tokio::test(start_paused = true)]
    async fn body_query_and_method_are_forwarded() {
        let (client, mock) = client_with(config("http://x/", 0));

        client.post("/users", json!({"name": "ada"})).await;
        client.put("/users/1", json!({"name": "grace"})).await;
        client.patch("/users/1", json!({"active": false})).await;
        client.delete("/users/1").await;
        client
            .get_with("/users", RequestOptions::new().query("page", "2").query("size", "10"))
            .await;

        let log = mock.requests();
        let methods: Vec<_> = log.iter().map(|r| r.method.clone()).collect();
        assert_eq!(
            methods,
            vec![Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::GET]
        );
        assert_eq!(log[0].url, "http://x/users");
        assert_eq!(log[0].body, Some(json!({"name": "ada"})));
        assert_eq!(log[2].body, Some(json!({"active": false})));
        assert!(log[3].body.is_none());
        assert_eq!(
            log[4].query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("size".to_string(), "10".to_string())
            ]
        );
        assert_eq!(log[4].timeout, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_delays_excess_requests() {
        let mut config = config("http://x", 0);
        config.rate_limit = 2;
        let (client, mock) = client_with(config);

        client.get("/a").await;
        client.get("/b").await;
        let third = client.get("/c").await;

        assert!(third.success);
        assert_eq!(gaps(&mock), vec![Duration::ZERO, Duration::from_secs(60)]);
        assert_eq!(third.elapsed, Duration::from_secs(60));
        // the delayed attempt was not recorded by the limiter
        assert_eq!(client.rate_limiter().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn clones_share_one_limiter() {
        let mut config = config("http://x", 0);
        config.rate_limit = 5;
        let (client, mock) = client_with(config);

        let requests = (0..10).map(|i| {
            let client = client.clone();
            async move { client.get(&format!("/items/{i}")).await }
        });
        let responses = futures::future::join_all(requests).await;

        assert_eq!(responses.len(), 10);
        assert!(responses.iter().all(|r| r.status_code == 404));
        assert_eq!(mock.request_count(None, None), 10);
        assert_eq!(client.rate_limiter().len(), 5);
    }
}
