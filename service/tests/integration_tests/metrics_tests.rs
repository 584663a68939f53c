//! Request metrics as seen through the scrape endpoint.

use axum::http::StatusCode;
use std::time::Duration;
use telemetry::models::LabelSet;

use super::common::{fast_config, get, pull_app, pull_app_with};

#[tokio::test]
async fn test_scrape_shows_request_count_per_endpoint() {
    let (app, _state) = pull_app();

    for _ in 0..3 {
        let (status, _) = get(app.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, text) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        text.contains(r#"http_requests_total{endpoint="/",method="GET",status="200"} 3"#),
        "unexpected scrape:\n{text}"
    );
    assert!(text.contains("# TYPE http_request_duration_seconds histogram"));
    assert!(text.contains(
        r#"http_request_duration_seconds_count{endpoint="/",method="GET",status="200"} 3"#
    ));
}

#[tokio::test]
async fn test_scrape_and_health_are_not_counted() {
    let (app, state) = pull_app();

    get(app.clone(), "/health").await;
    get(app.clone(), "/metrics").await;
    let (_, text) = get(app, "/metrics").await;

    assert!(!text.contains(r#"endpoint="/metrics""#));
    assert!(!text.contains(r#"endpoint="/health""#));
    let snapshot = state.telemetry().reader().collect();
    assert!(snapshot
        .value(
            "http_requests_total",
            &LabelSet::from([("endpoint", "/metrics"), ("method", "GET"), ("status", "200")]),
        )
        .is_none());
}

#[tokio::test]
async fn test_failed_requests_are_labeled_with_status() {
    let (app, state) = pull_app();

    let (status, _) = get(app.clone(), "/error").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let snapshot = state.telemetry().reader().collect();
    let labels = LabelSet::from([("endpoint", "/error"), ("method", "GET"), ("status", "500")]);
    assert_eq!(snapshot.value("http_requests_total", &labels), Some(1.0));
}

#[tokio::test]
async fn test_in_flight_returns_to_zero() {
    let (app, state) = pull_app();

    get(app.clone(), "/work").await;
    get(app, "/work").await;

    let snapshot = state.telemetry().reader().collect();
    let labels = LabelSet::from([("endpoint", "/work")]);
    assert_eq!(snapshot.value("http_requests_in_flight", &labels), Some(0.0));
    let work = snapshot
        .metric("work_duration_seconds")
        .and_then(|m| m.point(&labels))
        .and_then(|p| p.value.as_histogram().map(|h| h.count));
    assert_eq!(work, Some(2));
}

#[tokio::test]
async fn test_cancelled_request_leaves_in_flight_at_zero() {
    let mut config = fast_config();
    config.max_work_delay = Duration::from_secs(30);
    let (app, _state) = pull_app_with(config);

    let slow_request = get(app.clone(), "/work");
    let cancelled = tokio::time::timeout(Duration::from_millis(50), slow_request).await;
    assert!(cancelled.is_err());

    let (_, text) = get(app, "/metrics").await;
    assert!(
        text.contains("http_requests_in_flight{endpoint=\"/work\"} 0\n"),
        "unexpected scrape:\n{text}"
    );
    assert!(!text.contains(r#"http_requests_total{endpoint="/work""#));
}

#[tokio::test]
async fn test_process_gauges_are_scraped() {
    let (app, _state) = pull_app();

    let (_, text) = get(app, "/metrics").await;

    assert!(text.contains("# TYPE process_uptime_seconds gauge"));
    let uptime: f64 = text
        .lines()
        .find_map(|line| line.strip_prefix("process_uptime_seconds "))
        .unwrap()
        .parse()
        .unwrap();
    assert!(uptime >= 0.0);
    if cfg!(target_os = "linux") {
        assert!(text.contains("# TYPE process_memory_usage_mb gauge"));
    }
}
