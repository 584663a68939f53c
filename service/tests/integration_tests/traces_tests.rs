//! Spans and correlated logs produced by the demo routes.

use axum::http::StatusCode;
use telemetry::models::{LogBody, Severity, SpanKind, SpanStatus};

use super::common::{fast_config, get, get_with_headers, recording_app};

const REMOTE_TRACE: &str = "4bf92f3577b34da6a3ce929d0e0e4736";
const REMOTE_PARENT: &str = "00f067aa0ba902b7";

#[tokio::test]
async fn test_request_span_wraps_handler_span() {
    let (app, state, exporter) = recording_app(fast_config());

    let (status, body) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("demo-under-test"));
    state.telemetry().force_flush().await;

    let spans = exporter.spans();
    let server = spans.iter().find(|s| s.name == "GET /").unwrap();
    let child = spans.iter().find(|s| s.name == "index-span").unwrap();
    assert_eq!(server.kind, SpanKind::Server);
    assert!(server.is_root());
    assert_eq!(child.trace_id, server.trace_id);
    assert_eq!(child.parent_span_id, Some(server.span_id));
    assert_eq!(server.attributes["http.status_code"], 200);
    assert_eq!(server.attributes["http.route"], "/");

    let logs = exporter.logs();
    let log = logs
        .iter()
        .find(|l| l.body == LogBody::from("Index endpoint called"))
        .unwrap();
    assert_eq!(log.trace_id, Some(server.trace_id));
    assert_eq!(log.span_id, Some(server.span_id));
}

#[tokio::test]
async fn test_incoming_traceparent_is_continued() {
    let (app, state, exporter) = recording_app(fast_config());
    let traceparent = format!("00-{REMOTE_TRACE}-{REMOTE_PARENT}-01");

    let (status, _) = get_with_headers(app, "/work", &[("traceparent", &traceparent)]).await;
    assert_eq!(status, StatusCode::OK);
    state.telemetry().force_flush().await;

    let spans = exporter.spans();
    let server = spans.iter().find(|s| s.name == "GET /work").unwrap();
    let work = spans.iter().find(|s| s.name == "work").unwrap();
    assert_eq!(server.trace_id.to_string(), REMOTE_TRACE);
    assert_eq!(
        server.parent_span_id.map(|id| id.to_string()).as_deref(),
        Some(REMOTE_PARENT)
    );
    assert_eq!(work.trace_id.to_string(), REMOTE_TRACE);
    assert_eq!(work.parent_span_id, Some(server.span_id));

    let logs = exporter.logs();
    let done = logs
        .iter()
        .find(|l| l.body == LogBody::from("Work endpoint done"))
        .unwrap();
    assert!(done.attributes["latency"].is_number());
    assert_eq!(done.span_id, Some(work.span_id));
}

#[tokio::test]
async fn test_malformed_traceparent_starts_new_trace() {
    let (app, state, exporter) = recording_app(fast_config());

    let (status, _) = get_with_headers(app, "/", &[("traceparent", "00-not-a-trace-01")]).await;
    assert_eq!(status, StatusCode::OK);
    state.telemetry().force_flush().await;

    let spans = exporter.spans();
    let server = spans.iter().find(|s| s.name == "GET /").unwrap();
    assert!(server.is_root());
    assert!(server.trace_id.is_valid());
}

#[tokio::test]
async fn test_error_route_marks_spans_and_logs_error() {
    let (app, state, exporter) = recording_app(fast_config());

    let (status, body) = get(app, "/error").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("/error"));
    state.telemetry().force_flush().await;

    let spans = exporter.spans();
    let server = spans.iter().find(|s| s.name == "GET /error").unwrap();
    let child = spans.iter().find(|s| s.name == "error-span").unwrap();
    assert_eq!(server.status, SpanStatus::Error);
    assert_eq!(server.attributes["http.status_code"], 500);
    assert_eq!(child.status, SpanStatus::Error);
    assert!(child.events.iter().any(|e| e.name == "exception"));

    let logs = exporter.logs();
    let error = logs
        .iter()
        .find(|l| l.severity == Severity::Error)
        .unwrap();
    assert_eq!(error.trace_id, Some(server.trace_id));
}

#[tokio::test]
async fn test_concurrent_requests_get_separate_traces() {
    let (app, state, exporter) = recording_app(fast_config());

    let requests = (0..10).map(|_| {
        let app = app.clone();
        tokio::spawn(async move { get(app, "/work").await })
    });
    for request in requests {
        assert_eq!(request.await.unwrap().0, StatusCode::OK);
    }
    state.telemetry().force_flush().await;

    let spans = exporter.spans();
    let servers: Vec<_> = spans.iter().filter(|s| s.name == "GET /work").collect();
    assert_eq!(servers.len(), 10);
    for server in &servers {
        let children: Vec<_> = spans
            .iter()
            .filter(|s| s.parent_span_id == Some(server.span_id))
            .collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].trace_id, server.trace_id);
    }
    let mut traces: Vec<_> = servers.iter().map(|s| s.trace_id).collect();
    traces.sort_by_key(|t| t.to_bytes());
    traces.dedup();
    assert_eq!(traces.len(), 10);
}
