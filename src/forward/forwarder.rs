//! The generic forwarder.
//!
//! One linear transform per request:
//! ```text
//! OPTIONS ──────────────────────────────▶ preflight (no upstream call)
//! other   ─▶ rewrite ─▶ project headers ─▶ [read body] ─▶ upstream call
//!                                                            │
//!                         Ok(response) ─▶ shape headers/body ┤
//!                         Err(ForwardError) ─▶ ErrorPolicy ──┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request},
    response::Response,
};
use futures_util::TryStreamExt;

use crate::forward::error::{no_route, ForwardError};
use crate::forward::headers::{project, strip_hop_by_hop};
use crate::forward::profile::{BodyMode, ForwardProfile, HeaderMode, NonSuccess, UpstreamTarget};
use crate::observability::metrics;

/// Settings shared by every forwarder of one configuration generation.
#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    /// Backend origin without trailing `/`.
    pub origin: String,
    /// Largest request body read into memory.
    pub max_body_size: usize,
    /// Deadline for receiving response headers. Bodies are not bounded.
    pub timeout: Option<Duration>,
}

/// A `ForwardProfile` bound to a backend and an HTTP client.
#[derive(Debug, Clone)]
pub struct Forwarder {
    profile: Arc<ForwardProfile>,
    upstream: Arc<UpstreamSettings>,
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(
        profile: ForwardProfile,
        upstream: Arc<UpstreamSettings>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            profile: Arc::new(profile),
            upstream,
            client,
        }
    }

    pub fn profile(&self) -> &ForwardProfile {
        &self.profile
    }

    /// Turn one inbound request into one outbound response. Never fails:
    /// every error is rendered through the profile's `ErrorPolicy`.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start_time = Instant::now();
        let name = self.profile.name;

        if request.method() == Method::OPTIONS {
            let response = self.profile.cors.preflight();
            metrics::record_request(name, response.status().as_u16(), start_time);
            return response;
        }

        let Some(target) = self.profile.target(&self.upstream.origin, request.uri()) else {
            tracing::warn!(forwarder = name, path = %request.uri().path(), "Path outside forwarder mount");
            let response = no_route(request.uri().path());
            metrics::record_request(name, response.status().as_u16(), start_time);
            return response;
        };

        tracing::debug!(
            forwarder = name,
            method = %request.method(),
            target = %target.url,
            "Forwarding request"
        );

        let response = match self.forward(request, &target).await {
            Ok(response) => response,
            Err(e) => {
                let kind = e.kind();
                match &e {
                    ForwardError::NonSuccess(status) => tracing::warn!(
                        forwarder = name,
                        target = %target.url,
                        status = %status,
                        "Upstream returned non-success status"
                    ),
                    _ => tracing::error!(
                        forwarder = name,
                        target = %target.url,
                        error = %e,
                        "Upstream error"
                    ),
                }
                metrics::record_upstream_error(name, kind.as_str());
                self.profile.errors.respond(&e, &target.suffix)
            }
        };

        metrics::record_request(name, response.status().as_u16(), start_time);
        response
    }

    async fn forward(
        &self,
        request: Request<Body>,
        target: &UpstreamTarget,
    ) -> Result<Response, ForwardError> {
        let upstream = self.call_upstream(request, target).await?;
        self.relay(upstream).await
    }

    /// Perform the single upstream call.
    async fn call_upstream(
        &self,
        request: Request<Body>,
        target: &UpstreamTarget,
    ) -> Result<reqwest::Response, ForwardError> {
        let (parts, body) = request.into_parts();
        let headers = project(&parts.headers, &self.profile.request_headers);

        let mut outbound = self
            .client
            .request(parts.method.clone(), target.url.as_str())
            .headers(headers);

        if self.profile.forward_body && carries_body(&parts.method) {
            let bytes = axum::body::to_bytes(body, self.upstream.max_body_size)
                .await
                .map_err(|e| ForwardError::RequestBody(e.to_string()))?;
            outbound = outbound.body(bytes);
        }

        let send = outbound.send();
        let response = match self.upstream.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| ForwardError::Timeout(limit))??,
            None => send.await?,
        };

        if self.profile.response.non_success == NonSuccess::Fail
            && !response.status().is_success()
        {
            return Err(ForwardError::NonSuccess(response.status()));
        }
        Ok(response)
    }

    /// Shape a backend response according to the profile.
    async fn relay(&self, upstream: reqwest::Response) -> Result<Response, ForwardError> {
        let policy = &self.profile.response;
        let status = upstream.status();

        let mut headers = match policy.headers {
            HeaderMode::Rebuild => {
                let mut headers = HeaderMap::new();
                if let Some(content_type) = upstream.headers().get(header::CONTENT_TYPE) {
                    headers.insert(header::CONTENT_TYPE, content_type.clone());
                }
                headers
            }
            HeaderMode::Passthrough => {
                let mut headers = upstream.headers().clone();
                strip_hop_by_hop(&mut headers);
                headers
            }
        };
        if !headers.contains_key(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, policy.default_content_type.clone());
        }
        for (name, value) in &policy.extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        let body = match policy.body {
            BodyMode::Buffered => Body::from(upstream.bytes().await?),
            BodyMode::Streamed => {
                let name = self.profile.name;
                Body::from_stream(upstream.bytes_stream().inspect_err(move |e| {
                    tracing::warn!(forwarder = name, error = %e, "Upstream stream interrupted");
                }))
            }
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// GET and HEAD never forward a body.
fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}
