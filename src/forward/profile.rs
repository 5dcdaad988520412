//! Forwarder profiles: everything that distinguishes one forwarder from
//! another, as data.

use axum::http::{header, HeaderName, HeaderValue, Uri};

use crate::config::MountConfig;
use crate::forward::cors::CorsPolicy;
use crate::forward::error::ErrorPolicy;
use crate::routing::MountMatcher;

/// Non-standard header telling nginx-style front proxies not to buffer.
pub const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");
/// Auth header accepted by the backend alongside `Authorization`.
pub const X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");

/// How the outbound response headers are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// Start empty and keep only the backend's `Content-Type`.
    Rebuild,
    /// Start from every backend header except hop-by-hop ones.
    Passthrough,
}

/// How the backend body reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Read the whole body before answering.
    Buffered,
    /// Hand the body stream through chunk by chunk.
    Streamed,
}

/// What to do with a non-2xx backend status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonSuccess {
    /// Relay it like any other response.
    Relay,
    /// Treat it as an `UpstreamNonSuccess` error.
    Fail,
}

/// Shaping of successful responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub headers: HeaderMode,
    pub body: BodyMode,
    pub non_success: NonSuccess,
    /// Used when the backend sent no `Content-Type`.
    pub default_content_type: HeaderValue,
    /// Set on every relayed response, replacing backend values.
    pub extra_headers: Vec<(HeaderName, HeaderValue)>,
}

/// A forwarder described as configuration.
#[derive(Debug, Clone)]
pub struct ForwardProfile {
    /// Label used in logs and metrics.
    pub name: &'static str,
    /// Inbound path prefix.
    pub mount: MountMatcher,
    /// Backend path prefix the remainder is appended to.
    pub backend_path: String,
    /// Whether the inbound query string is appended to the target.
    pub forward_query: bool,
    /// Inbound headers copied onto the outbound request.
    pub request_headers: Vec<HeaderName>,
    /// Whether non-GET/HEAD request bodies are forwarded.
    pub forward_body: bool,
    pub cors: CorsPolicy,
    pub response: ResponsePolicy,
    pub errors: ErrorPolicy,
}

/// Where a request goes upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Absolute backend URL.
    pub url: String,
    /// Inbound path with the mount removed (e.g. `/users/7`).
    pub suffix: String,
}

impl ForwardProfile {
    /// The generic API forwarder.
    pub fn api(mount: &MountConfig) -> Self {
        let cors = CorsPolicy::api();
        let extra_headers = vec![
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (header::ACCESS_CONTROL_ALLOW_METHODS, cors.allow_methods.clone()),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, cors.allow_headers.clone()),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ];

        Self {
            name: "api",
            mount: MountMatcher::new(&mount.mount),
            backend_path: mount.backend_path.clone(),
            forward_query: true,
            request_headers: vec![header::CONTENT_TYPE, X_AUTH_TOKEN, header::AUTHORIZATION],
            forward_body: true,
            cors,
            response: ResponsePolicy {
                headers: HeaderMode::Rebuild,
                body: BodyMode::Buffered,
                non_success: NonSuccess::Relay,
                default_content_type: HeaderValue::from_static("application/json"),
                extra_headers,
            },
            errors: ErrorPolicy::api(),
        }
    }

    /// The audio range forwarder.
    pub fn audio(mount: &MountConfig) -> Self {
        let extra_headers = vec![
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                HeaderValue::from_static("Content-Range, Content-Length, Accept-Ranges"),
            ),
            (header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600")),
            (X_ACCEL_BUFFERING, HeaderValue::from_static("no")),
        ];

        Self {
            name: "audio",
            mount: MountMatcher::new(&mount.mount),
            backend_path: mount.backend_path.clone(),
            forward_query: false,
            request_headers: vec![header::RANGE],
            forward_body: false,
            cors: CorsPolicy::audio(),
            response: ResponsePolicy {
                headers: HeaderMode::Passthrough,
                body: BodyMode::Streamed,
                non_success: NonSuccess::Fail,
                default_content_type: HeaderValue::from_static("audio/mpeg"),
                extra_headers,
            },
            errors: ErrorPolicy::audio(),
        }
    }

    /// Map an inbound URI onto the backend. `None` when the path is outside
    /// this forwarder's mount.
    ///
    /// `origin` must not end with `/`.
    pub fn target(&self, origin: &str, uri: &Uri) -> Option<UpstreamTarget> {
        let suffix = self.mount.strip(uri.path())?;

        let mut url = format!("{origin}{}{suffix}", self.backend_path);
        if self.forward_query {
            if let Some(query) = uri.query() {
                url.push('?');
                url.push_str(query);
            }
        }

        Some(UpstreamTarget {
            url,
            suffix: suffix.to_string(),
        })
    }
}
