//! Metrics collection and exposition.
//!
//! # Metrics
//! - `edge_proxy_requests_total` (counter): responses by forwarder and status
//! - `edge_proxy_request_duration_seconds` (histogram): latency by forwarder
//! - `edge_proxy_upstream_errors_total` (counter): errors by forwarder and kind

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
/// Must run inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one answered request.
pub fn record_request(forwarder: &'static str, status: u16, start_time: Instant) {
    counter!(
        "edge_proxy_requests_total",
        "forwarder" => forwarder,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("edge_proxy_request_duration_seconds", "forwarder" => forwarder)
        .record(start_time.elapsed().as_secs_f64());
}

/// Record one upstream error by kind.
pub fn record_upstream_error(forwarder: &'static str, kind: &'static str) {
    counter!(
        "edge_proxy_upstream_errors_total",
        "forwarder" => forwarder,
        "kind" => kind
    )
    .increment(1);
}
