//! Edge proxy library.
//!
//! Forwards browser traffic from a frontend host to one backend origin
//! through two mounts: a generic API forwarder and an audio range forwarder.

pub mod config;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
