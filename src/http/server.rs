//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all dispatcher
//! - Wire up middleware (request ID, tracing)
//! - Dispatch requests to the forwarder mounted over their path
//! - Swap in new forwarder tables on config reload
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{request_id::SetRequestIdLayer, trace::TraceLayer};

use crate::config::ProxyConfig;
use crate::forward::error::no_route;
use crate::http::request::{request_span, UuidRequestId};
use crate::observability::metrics;
use crate::routing::ForwardTable;

/// Errors that stop the server from starting or serving.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Current forwarder table; replaced wholesale on reload.
    pub table: Arc<ArcSwap<ForwardTable>>,
}

/// HTTP server for the edge proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    table: Arc<ArcSwap<ForwardTable>>,
}

impl HttpServer {
    /// Create a new HTTP server from a validated configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let table = Arc::new(ArcSwap::from_pointee(ForwardTable::from_config(&config)?));
        let state = AppState {
            table: table.clone(),
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            table,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(dispatch))
            .route("/{*path}", any(dispatch))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                request_span(request)
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The forwarder table currently serving requests.
    pub fn forward_table(&self) -> Arc<ForwardTable> {
        self.table.load_full()
    }

    /// Replace the forwarder table with one compiled from `config`.
    pub fn reload(&self, config: &ProxyConfig) -> Result<(), ServerError> {
        apply_config(&self.table, config)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Validated configs received on `config_updates` are applied without
    /// dropping connections. Returns once `shutdown` fires and in-flight
    /// requests have completed.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            origin = %self.forward_table().origin(),
            "HTTP server starting"
        );

        let table = self.table.clone();
        let bind_address = self.config.listener.bind_address.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if config.listener.bind_address != bind_address {
                    tracing::warn!(
                        current = %bind_address,
                        requested = %config.listener.bind_address,
                        "Listener address changes need a restart, ignoring"
                    );
                }
                match apply_config(&table, &config) {
                    Ok(()) => tracing::info!(origin = %config.backend.origin, "Forwarders reloaded"),
                    Err(e) => tracing::error!(error = %e, "Failed to apply reloaded config"),
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config the server was started with.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

fn apply_config(table: &ArcSwap<ForwardTable>, config: &ProxyConfig) -> Result<(), ServerError> {
    let next = ForwardTable::from_config(config)?;
    table.store(Arc::new(next));
    Ok(())
}

/// Catch-all handler: hand the request to the forwarder mounted over its path.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let table = state.table.load_full();
    match table.route(request.uri().path()) {
        Some(forwarder) => forwarder.handle(request).await,
        None => {
            let start_time = Instant::now();
            tracing::debug!(path = %request.uri().path(), "No forwarder mounted");
            let response = no_route(request.uri().path());
            metrics::record_request("none", response.status().as_u16(), start_time);
            response
        }
    }
}
