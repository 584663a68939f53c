//! Instrumented demo service
//!
//! A small HTTP service that exercises the telemetry pipeline: every request
//! runs in a server span, handlers start child spans and emit correlated
//! logs, and request metrics are recorded in counters and histograms.
//!
//! # Endpoints
//!
//! - `GET /`, `/work`, `/error`, `/call_downstream` - instrumented demo routes
//! - `GET /metrics` - Prometheus scrape endpoint when metrics are pulled
//! - `GET /health` - liveness plus telemetry export counters
//!
//! # Example
//!
//! ```no_run
//! use service::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod error;
mod middleware;
mod routes;
mod state;

pub use config::Config;
pub use error::AppError;
pub use state::{AppState, Instruments};

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use telemetry::{Telemetry, TelemetryConfig};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the demo service.
///
/// Server and telemetry configuration both come from environment variables.
/// The telemetry pipeline is started before binding, so a misconfigured
/// backend stops the service before it accepts any request.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The telemetry configuration is invalid
/// - The server fails to bind to the configured address
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    let telemetry = Telemetry::init(TelemetryConfig::from_env()?)?;
    run_server_with_config(config, Arc::new(telemetry)).await
}

/// Runs the demo service with the provided configuration and pipeline.
///
/// The pipeline is flushed and shut down once the server stops.
///
/// # Errors
///
/// Returns an error if:
/// - The configured address is invalid
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config, telemetry: Arc<Telemetry>) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        service = telemetry.resource().service_name(),
        "Demo service starting"
    );

    let state = AppState::new(config, telemetry.clone())?;
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    telemetry.shutdown().await;
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::demo_routes(state.clone()))
        .merge(routes::metrics_routes(state.clone()))
        .merge(routes::health_routes(state))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
