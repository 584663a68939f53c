//! Health endpoint integration tests.

use axum::http::StatusCode;
use serde_json::Value;

use super::common::{fast_config, get, pull_app, recording_app};

#[tokio::test]
async fn test_health_reports_service_and_counters() {
    let (app, _state) = pull_app();

    let (status, body) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "unknown_service");
    assert!(json["version"].is_string());
    assert_eq!(json["telemetry"]["traces"]["dropped_overflow"], 0);
    assert!(json["telemetry"]["metrics"]["exports"].is_number());
}

#[tokio::test]
async fn test_health_counts_exported_records() {
    let (app, state, _exporter) = recording_app(fast_config());

    get(app.clone(), "/").await;
    state.telemetry().force_flush().await;

    let (_, body) = get(app, "/health").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["service"], "demo-under-test");
    assert_eq!(json["telemetry"]["traces"]["records_exported"], 2);
    assert!(json["telemetry"]["logs"]["records_exported"].as_u64().unwrap() >= 1);
}
