//! Outbound calls carry the trace to the downstream service.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get as get_route;
use axum::Router;
use reqwest::Url;
use std::sync::{Arc, Mutex};
use telemetry::models::{SpanKind, SpanStatus};
use telemetry::propagation::parse_traceparent;
use tokio::net::TcpListener;

use super::common::{fast_config, get, recording_app};

#[derive(Clone, Default)]
struct Downstream {
    traceparents: Arc<Mutex<Vec<String>>>,
}

async fn downstream_handler(
    State(downstream): State<Downstream>,
    headers: HeaderMap,
) -> &'static str {
    if let Some(value) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        downstream.traceparents.lock().unwrap().push(value.to_string());
    }
    "downstream ok"
}

async fn start_downstream() -> (Url, Downstream) {
    let downstream = Downstream::default();
    let app = Router::new()
        .route("/", get_route(downstream_handler))
        .with_state(downstream.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (Url::parse(&format!("http://{addr}/")).unwrap(), downstream)
}

#[tokio::test]
async fn test_call_downstream_propagates_trace() {
    let (url, downstream) = start_downstream().await;
    let mut config = fast_config();
    config.downstream_url = url;
    let (app, state, exporter) = recording_app(config);

    let (status, body) = get(app, "/call_downstream").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("downstream ok"));
    state.telemetry().force_flush().await;

    let spans = exporter.spans();
    let server = spans
        .iter()
        .find(|s| s.name == "GET /call_downstream")
        .unwrap();
    let client = spans.iter().find(|s| s.name == "call-downstream").unwrap();
    assert_eq!(client.kind, SpanKind::Client);
    assert_eq!(client.parent_span_id, Some(server.span_id));

    let received = downstream.traceparents.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    let remote = parse_traceparent(&received[0]).unwrap();
    assert_eq!(remote.trace_id, server.trace_id);
    assert_eq!(remote.span_id, client.span_id);
}

#[tokio::test]
async fn test_unreachable_downstream_returns_502() {
    let mut config = fast_config();
    config.downstream_url = Url::parse("http://127.0.0.1:1/").unwrap();
    let (app, state, exporter) = recording_app(config);

    let (status, _) = get(app, "/call_downstream").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    state.telemetry().force_flush().await;

    let spans = exporter.spans();
    let client = spans.iter().find(|s| s.name == "call-downstream").unwrap();
    assert_eq!(client.status, SpanStatus::Error);
    // 502 is a server error from the caller's point of view too.
    let server = spans
        .iter()
        .find(|s| s.name == "GET /call_downstream")
        .unwrap();
    assert_eq!(server.status, SpanStatus::Error);
}
