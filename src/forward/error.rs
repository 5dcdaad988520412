//! Upstream errors and the table mapping them to client responses.
//!
//! # Design Decisions
//! - The upstream step returns `Result<_, ForwardError>`; nothing panics or
//!   escapes to the server
//! - Each forwarder owns an `ErrorPolicy` naming the status and payload used
//!   for every error kind, so a lossy mapping is visible in one place
//! - Error bodies are JSON with an ISO8601 UTC timestamp

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::forward::cors::allow_any_origin;

/// Message of the audio forwarder's error payload.
pub const AUDIO_NOT_FOUND: &str = "Audio file not found";

/// Everything that can go wrong between receiving a request and producing
/// the backend's response.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    /// The inbound body could not be read (client went away, limit exceeded).
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    /// Network, DNS or protocol failure talking to the backend.
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),

    /// The backend did not produce response headers in time.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// The backend answered with a status the forwarder treats as failure.
    #[error("upstream responded with {0}")]
    NonSuccess(StatusCode),
}

/// Error classes the mapping table is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamFailure,
    UpstreamNonSuccess,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::UpstreamNonSuccess => "upstream_non_success",
        }
    }
}

impl ForwardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForwardError::NonSuccess(_) => ErrorKind::UpstreamNonSuccess,
            ForwardError::RequestBody(_)
            | ForwardError::Upstream(_)
            | ForwardError::Timeout(_) => ErrorKind::UpstreamFailure,
        }
    }
}

/// Shape of the JSON body written for an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPayload {
    /// `{error: "Proxy error: <message>", timestamp}`
    ProxyError,
    /// `{error: "Audio file not found", path: <suffix>, timestamp}`
    AudioNotFound,
}

/// Status and payload used for one error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorRule {
    pub status: StatusCode,
    pub payload: ErrorPayload,
}

/// Per-forwarder mapping from error kind to client response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPolicy {
    pub upstream_failure: ErrorRule,
    pub upstream_non_success: ErrorRule,
}

impl ErrorPolicy {
    /// Generic API forwarder: failures are a 500. Non-success statuses are
    /// passed through by that forwarder, so its rule only covers misuse.
    pub fn api() -> Self {
        let rule = ErrorRule {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            payload: ErrorPayload::ProxyError,
        };
        Self {
            upstream_failure: rule,
            upstream_non_success: rule,
        }
    }

    /// Audio forwarder: every failure, including a backend 5xx or an
    /// unreachable backend, is reported as a 404.
    pub fn audio() -> Self {
        let rule = ErrorRule {
            status: StatusCode::NOT_FOUND,
            payload: ErrorPayload::AudioNotFound,
        };
        Self {
            upstream_failure: rule,
            upstream_non_success: rule,
        }
    }

    pub fn rule(&self, kind: ErrorKind) -> ErrorRule {
        match kind {
            ErrorKind::UpstreamFailure => self.upstream_failure,
            ErrorKind::UpstreamNonSuccess => self.upstream_non_success,
        }
    }

    /// Build the client response for `error`. `suffix` is the request path
    /// with the mount prefix removed.
    pub fn respond(&self, error: &ForwardError, suffix: &str) -> Response {
        self.respond_at(error, suffix, &timestamp())
    }

    pub(crate) fn respond_at(&self, error: &ForwardError, suffix: &str, timestamp: &str) -> Response {
        let rule = self.rule(error.kind());
        let body = match rule.payload {
            ErrorPayload::ProxyError => ErrorBody {
                error: format!("Proxy error: {error}"),
                path: None,
                timestamp,
            },
            ErrorPayload::AudioNotFound => ErrorBody {
                error: AUDIO_NOT_FOUND.to_string(),
                path: Some(suffix),
                timestamp,
            },
        };
        json_response(rule.status, &body)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    timestamp: &'a str,
}

/// Current UTC time as `2024-05-01T12:00:00.000Z`.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 404 for a path no forwarder is mounted on.
pub fn no_route(path: &str) -> Response {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": "No matching route", "path": path }),
    )
}

/// Serialize `body` into a JSON response that browsers on any origin can read.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize error payload");
            b"{\"error\":\"Proxy error\"}".to_vec()
        }
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    allow_any_origin(headers);
    response
}
