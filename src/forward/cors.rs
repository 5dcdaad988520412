//! CORS preflight answers and origin injection.
//!
//! Both forwarders allow any origin. They differ only in the methods and
//! request headers they advertise on a preflight.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::Response,
};

/// Seconds a browser may cache a preflight answer.
pub const PREFLIGHT_MAX_AGE: u32 = 86_400;

/// What a forwarder advertises to browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    /// `Access-Control-Allow-Methods` value.
    pub allow_methods: HeaderValue,
    /// `Access-Control-Allow-Headers` value.
    pub allow_headers: HeaderValue,
    /// `Access-Control-Max-Age` in seconds.
    pub max_age: u32,
}

impl CorsPolicy {
    /// Policy of the generic API forwarder.
    pub fn api() -> Self {
        Self {
            allow_methods: HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
            allow_headers: HeaderValue::from_static("Content-Type, Authorization, X-Auth-Token"),
            max_age: PREFLIGHT_MAX_AGE,
        }
    }

    /// Policy of the audio forwarder.
    pub fn audio() -> Self {
        Self {
            allow_methods: HeaderValue::from_static("GET, HEAD, OPTIONS"),
            allow_headers: HeaderValue::from_static("Range, Content-Type"),
            max_age: PREFLIGHT_MAX_AGE,
        }
    }

    /// Answer an `OPTIONS` request: 200, no body, never touches the backend.
    pub fn preflight(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        allow_any_origin(headers);
        self.apply_allow_lists(headers);
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age));
        response
    }

    /// Add the method and header allow lists.
    fn apply_allow_lists(&self, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

/// Set `Access-Control-Allow-Origin: *`, replacing any backend value.
pub fn allow_any_origin(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}
