//! HTTP surface: router, shared state, and the serve loop.
//!
//! # Routes
//!
//! - `POST /api/download` runs the download pipeline
//! - `GET /health` liveness probe
//! - `GET /` endpoint listing
//!
//! Every route, including the JSON 404 fallback, passes the request gate first.

mod error;
mod gate;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use error::{ApiError, ErrorKind};
pub use gate::{FixedWindowGate, GateDecision, RequestGate};
pub use handlers::LinkRequest;

use crate::config::{Environment, ServerConfig};
use crate::pipeline::DownloadPipeline;

/// Interval between sweeps of expired rate-limit windows.
const GATE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared per-process state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DownloadPipeline>,
    pub gate: Arc<dyn RequestGate>,
    pub environment: Environment,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pipeline", &self.pipeline)
            .field("gate_limit", &self.gate.limit())
            .field("environment", &self.environment)
            .finish()
    }
}

impl AppState {
    /// Builds state from configuration with a [`FixedWindowGate`].
    ///
    /// # Errors
    ///
    /// Returns an error when the pipeline's HTTP clients cannot be built.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        Ok(Self {
            pipeline: Arc::new(DownloadPipeline::from_config(config)?),
            gate: Arc::new(FixedWindowGate::new(config.rate_limit)),
            environment: config.environment,
        })
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/download", post(handlers::download))
        .route("/health", get(handlers::health))
        .route("/", get(handlers::root))
        .fallback(handlers::fallback)
        .layer(middleware::from_fn_with_state(state.clone(), gate::enforce))
        .with_state(state)
}

/// Serves `state` on an already-bound listener until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error when the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let sweeper = tokio::spawn(sweep_gate(Arc::clone(&state.gate)));

    let result = axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("server error");

    sweeper.abort();
    result
}

/// Binds `config.socket_addr()` and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error when state cannot be built, the address cannot be bound,
/// or the server fails.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    let local = listener.local_addr().context("listener has no local address")?;

    info!(environment = ?config.environment, "TeraBox download server running on port {}", local.port());
    info!("Health check: http://localhost:{}/health", local.port());
    info!("API endpoint: http://localhost:{}/api/download", local.port());
    info!(
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window.as_secs(),
        "rate limit"
    );

    serve(listener, state, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn sweep_gate(gate: Arc<dyn RequestGate>) {
    let mut ticker = tokio::time::interval(GATE_SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        gate.purge_expired();
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => warn!(error = %e, "failed to listen for Ctrl-C; shutting down"),
    }
}
