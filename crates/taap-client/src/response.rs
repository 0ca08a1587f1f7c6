//! The uniform result envelope returned by every request.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

/// A decoded response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Body declared as `application/json` and decoded.
    Json(serde_json::Value),
    /// Any other body, kept as text.
    Text(String),
}

impl Payload {
    /// The JSON value, if the body was structured.
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// The raw text, if the body was not structured.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }
}

/// Outcome of one logical request, across all of its attempts.
///
/// `success` is true only when a response arrived with a status in `100..400`.
/// A remote error (4xx/5xx) keeps its `status_code` and leaves `error`
/// unset; `status_code` is 0 and `error` is set only when every attempt
/// failed before a response arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    /// HTTP status, or 0 when no response was obtained.
    pub status_code: u16,
    /// Decoded body of the final response.
    #[serde(rename = "data")]
    pub payload: Option<Payload>,
    /// Response headers, one value per name.
    pub headers: HashMap<String, String>,
    /// Time from the first attempt to the final outcome.
    #[serde(rename = "response_time", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Whether a response arrived with a status in `100..400`.
    pub success: bool,
    /// Last transport failure, when no response was obtained.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    /// Envelope for a response that arrived.
    #[must_use]
    pub fn received(
        status_code: u16,
        payload: Payload,
        headers: HashMap<String, String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            status_code,
            payload: Some(payload),
            headers,
            elapsed,
            success: (100..400).contains(&status_code),
            error: None,
        }
    }

    /// Envelope for a request where no attempt produced a response.
    #[must_use]
    pub fn failed(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            status_code: 0,
            payload: None,
            headers: HashMap::new(),
            elapsed,
            success: false,
            error: Some(error.into()),
        }
    }

    /// Elapsed time in fractional seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Deserialize a JSON payload into `T`.
    ///
    /// Returns `None` when there is no payload, the payload is text, or it
    /// does not match `T`.
    #[must_use]
    pub fn json<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.payload.as_ref()?.as_json()?;
        serde_json::from_value(value.clone()).ok()
    }

    /// The payload rendered as text (JSON payloads are re-encoded).
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match self.payload.as_ref()? {
            Payload::Text(text) => Some(text.clone()),
            Payload::Json(value) => Some(value.to_string()),
        }
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
