//! Request forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (matched by routing)
//!     → profile.rs (mount → backend URL, header allowlist, policies)
//!     → headers.rs (project request headers, strip hop-by-hop)
//!     → forwarder.rs (single upstream call, response shaping)
//!     → error.rs (ForwardError → fixed JSON error via ErrorPolicy)
//!     → cors.rs (preflight answers, origin injection)
//! ```
//!
//! # Design Decisions
//! - The API and audio forwarders are two `ForwardProfile` values run by
//!   the same `Forwarder`
//! - Stateless per request: no retries, no caching, no shared mutable state
//! - Backend origin is injected, never hardcoded

pub mod cors;
pub mod error;
pub mod forwarder;
pub mod headers;
pub mod profile;

pub use cors::CorsPolicy;
pub use error::{ErrorKind, ErrorPolicy, ForwardError};
pub use forwarder::{Forwarder, UpstreamSettings};
pub use profile::{ForwardProfile, UpstreamTarget};
