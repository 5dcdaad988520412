//! Forwarder lookup.
//!
//! # Design Decisions
//! - Immutable after construction; a config reload builds a new table
//! - Longest mount wins, so nested mounts stay deterministic
//! - Explicit no-match rather than a silent default forwarder

use std::sync::Arc;
use std::time::Duration;

use crate::config::ProxyConfig;
use crate::forward::{ForwardProfile, Forwarder, UpstreamSettings};

/// The forwarders of one configuration generation.
#[derive(Debug, Clone)]
pub struct ForwardTable {
    forwarders: Vec<Forwarder>,
    origin: String,
}

impl ForwardTable {
    /// Compile the API and audio forwarders from a validated config.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, reqwest::Error> {
        // Env proxy variables never apply: the backend origin is fixed.
        let client = reqwest::Client::builder().no_proxy().build()?;

        let origin = config.backend.origin.trim_end_matches('/').to_string();
        let upstream = Arc::new(UpstreamSettings {
            origin: origin.clone(),
            max_body_size: config.limits.max_body_size,
            timeout: config.timeouts.upstream_secs.map(Duration::from_secs),
        });

        let profiles = [
            ForwardProfile::api(&config.forwarders.api),
            ForwardProfile::audio(&config.forwarders.audio),
        ];
        Ok(Self::new(
            profiles
                .into_iter()
                .map(|profile| Forwarder::new(profile, upstream.clone(), client.clone()))
                .collect(),
            origin,
        ))
    }

    pub fn new(mut forwarders: Vec<Forwarder>, origin: String) -> Self {
        forwarders.sort_by_key(|f| std::cmp::Reverse(f.profile().mount.prefix().len()));
        Self { forwarders, origin }
    }

    /// Find the forwarder mounted over `path`.
    pub fn route(&self, path: &str) -> Option<&Forwarder> {
        self.forwarders
            .iter()
            .find(|f| f.profile().mount.matches(path))
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}
