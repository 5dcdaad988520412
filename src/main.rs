//! Edge proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                  EDGE PROXY                  │
//!                        │                                              │
//!   Browser request      │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ─────────────────────┼─▶│  http   │──▶│ routing  │──▶│  forward  │──┼──▶ Backend origin
//!                        │  │ server  │   │  mounts  │   │  api or   │  │    /api/*, /audio/*
//!   Browser response     │  └─────────┘   └──────────┘   │  audio    │  │
//!   ◀────────────────────┼───────────── CORS + shaping ◀─┴───────────┘◀─┼───
//!                        │                                              │
//!                        │  config (TOML, hot reload) · observability   │
//!                        │  lifecycle (signals, graceful shutdown)      │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_proxy::config::{load_config, validate_config, ConfigError, ConfigWatcher, ProxyConfig};
use edge_proxy::http::HttpServer;
use edge_proxy::lifecycle::{wait_for_termination, Shutdown};
use edge_proxy::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "edge-proxy")]
#[command(about = "Forwards API and audio requests to a fixed backend origin", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `backend.origin`.
    #[arg(long)]
    backend_origin: Option<String>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload forwarders when the config file changes.
    #[arg(short, long, requires = "config")]
    watch: bool,
}

impl Cli {
    /// The configuration as written in the file, or defaults without one.
    fn load_file(&self) -> Result<ProxyConfig, ConfigError> {
        match &self.config {
            Some(path) => load_config(path),
            None => Ok(ProxyConfig::default()),
        }
    }

    fn apply_overrides(&self, mut config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
        if let Some(origin) = &self.backend_origin {
            config.backend.origin = origin.clone();
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let file_config = cli.load_file()?;
    let config = cli.apply_overrides(file_config.clone())?;

    logging::init_logging(&config.observability);
    tracing::info!("edge-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        origin = %config.backend.origin,
        api_mount = %config.forwarders.api.mount,
        audio_mount = %config.forwarders.audio.mount,
        upstream_timeout_secs = ?config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    // Overrides apply to the initial config only; reloaded files are taken as written.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path, file_config);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_termination().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
