//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the backend origin is a bare http(s) origin
//! - Validate mount points and value ranges
//! - Detect overlapping mounts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{MountConfig, ProxyConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("backend.origin `{origin}` is invalid: {reason}")]
    InvalidOrigin { origin: String, reason: String },

    #[error("{field} `{value}` must start with '/' and must not end with '/'")]
    InvalidPath { field: &'static str, value: String },

    #[error("forwarder mounts `{0}` and `{1}` overlap")]
    OverlappingMounts(String, String),

    #[error("limits.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("timeouts.upstream_secs must be greater than zero when set")]
    ZeroTimeout,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(reason) = check_origin(&config.backend.origin) {
        errors.push(ValidationError::InvalidOrigin {
            origin: config.backend.origin.clone(),
            reason,
        });
    }

    check_mount(
        &config.forwarders.api,
        "forwarders.api.mount",
        "forwarders.api.backend_path",
        &mut errors,
    );
    check_mount(
        &config.forwarders.audio,
        "forwarders.audio.mount",
        "forwarders.audio.backend_path",
        &mut errors,
    );

    let api = config.forwarders.api.mount.as_str();
    let audio = config.forwarders.audio.mount.as_str();
    if mounts_overlap(api, audio) {
        errors.push(ValidationError::OverlappingMounts(
            api.to_string(),
            audio.to_string(),
        ));
    }

    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.timeouts.upstream_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_origin(origin: &str) -> Result<(), String> {
    let url = Url::parse(origin).map_err(|e| e.to_string())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    // Url normalizes a bare origin to path "/", anything longer is a real path.
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err("origin must not contain a path, query or fragment".to_string());
    }
    Ok(())
}

fn check_mount(
    mount: &MountConfig,
    mount_field: &'static str,
    backend_field: &'static str,
    errors: &mut Vec<ValidationError>,
) {
    if !is_valid_prefix(&mount.mount) {
        errors.push(ValidationError::InvalidPath {
            field: mount_field,
            value: mount.mount.clone(),
        });
    }
    // An empty backend path forwards straight onto the origin root.
    if !mount.backend_path.is_empty() && !is_valid_prefix(&mount.backend_path) {
        errors.push(ValidationError::InvalidPath {
            field: backend_field,
            value: mount.backend_path.clone(),
        });
    }
}

fn is_valid_prefix(path: &str) -> bool {
    path.len() > 1 && path.starts_with('/') && !path.ends_with('/')
}

/// Two mounts overlap when one is a segment-aligned prefix of the other.
fn mounts_overlap(a: &str, b: &str) -> bool {
    let nested = |outer: &str, inner: &str| {
        inner
            .strip_prefix(outer)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    };
    nested(a, b) || nested(b, a)
}
