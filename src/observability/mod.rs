//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarders and the HTTP server produce:
//!     → logging.rs (structured log events, per-request spans)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID recorded on every request span
//! - Metric updates are fire-and-forget; without an installed recorder
//!   they are no-ops

pub mod logging;
pub mod metrics;
