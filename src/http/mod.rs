//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, dispatch)
//!     → request.rs (request ID, tracing span)
//!     → routing (pick forwarder by mount)
//!     → forward (upstream call, response shaping)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{request_span, UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
