//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (forwarder lookup)
//!     → matcher.rs (segment-aligned mount prefix)
//!     → Return: matched Forwarder or no match (404 JSON)
//!
//! Table Compilation (startup and reload):
//!     ProxyConfig
//!     → ForwardProfile per mount
//!     → Sort by mount length
//!     → Freeze as immutable ForwardTable
//! ```

pub mod matcher;
pub mod router;

pub use matcher::MountMatcher;
pub use router::ForwardTable;
