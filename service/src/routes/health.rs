//! Health check endpoint.
//!
//! Provides a simple health check endpoint for load balancers and monitoring
//! systems, along with the telemetry pipeline's own counters.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use telemetry::TelemetryStats;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status (always "healthy" if reachable).
    pub status: &'static str,
    /// Service name, as reported in telemetry.
    pub service: String,
    /// Service version.
    pub version: &'static str,
    /// Export and drop counters of the telemetry pipeline.
    pub telemetry: TelemetryStats,
}

/// Creates the health check routes.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check handler.
///
/// Telemetry drops never make the service unhealthy; they are only reported.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let telemetry = state.telemetry();
    Json(HealthResponse {
        status: "healthy",
        service: telemetry.resource().service_name().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        telemetry: telemetry.stats(),
    })
}
