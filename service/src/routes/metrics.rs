//! Pull-mode scrape endpoint.

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use telemetry::backend::prometheus::CONTENT_TYPE;

/// Creates the scrape route: `GET /metrics`.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(scrape))
        .with_state(state)
}

/// Serves the current instrument values in the Prometheus text format.
///
/// Responds 404 when the pipeline pushes metrics instead.
async fn scrape(State(state): State<AppState>) -> Response {
    match state.telemetry().scrape() {
        Some(text) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], text).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            "Metrics are pushed to the configured backend, not scraped",
        )
            .into_response(),
    }
}
