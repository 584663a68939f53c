//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality used across all integration tests,
//! including test app setup and HTTP request helpers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use service::{create_router, AppState, Config};
use std::sync::Arc;
use std::time::Duration;
use telemetry::backend::InMemoryExporter;
use telemetry::config::{BackendKind, TelemetryConfig};
use telemetry::Telemetry;

/// Server configuration with near-instant simulated work.
pub fn fast_config() -> Config {
    Config {
        max_work_delay: Duration::from_millis(5),
        ..Config::default()
    }
}

/// Creates a test router whose metrics are scraped from `/metrics`.
pub fn pull_app() -> (Router, AppState) {
    pull_app_with(fast_config())
}

/// Like [`pull_app`], with a custom server configuration.
pub fn pull_app_with(config: Config) -> (Router, AppState) {
    let telemetry = Telemetry::init(TelemetryConfig::new(BackendKind::PrometheusPull)).unwrap();
    let state = AppState::new(config, Arc::new(telemetry)).unwrap();
    (create_router(state.clone()), state)
}

/// Creates a test router whose spans and logs are exported into memory.
///
/// Nothing is exported until the pipeline is flushed.
pub fn recording_app(config: Config) -> (Router, AppState, Arc<InMemoryExporter>) {
    let mut telemetry_config = TelemetryConfig::new(BackendKind::OtlpHttp)
        .with_service_name("demo-under-test")
        .with_flush_interval(Duration::from_secs(3600));
    telemetry_config.metric_interval = Duration::from_secs(3600);

    let exporter = Arc::new(InMemoryExporter::new());
    let telemetry = Telemetry::builder(telemetry_config)
        .with_exporter(exporter.clone())
        .build()
        .unwrap();
    let state = AppState::new(config, Arc::new(telemetry)).unwrap();
    (create_router(state.clone()), state, exporter)
}

/// Helper to make a GET request with optional extra headers.
///
/// # Returns
///
/// A tuple containing the response status code and the body as text.
pub async fn get_with_headers(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, String) {
    let mut request = Request::builder().method("GET").uri(uri);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response = tower::ServiceExt::oneshot(app, request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body_bytes).into_owned())
}

/// Helper to make a plain GET request.
pub async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    get_with_headers(app, uri, &[]).await
}
