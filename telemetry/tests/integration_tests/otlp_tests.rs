//! OTLP/HTTP export against an in-process collector.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::routing::post;
use axum::Router;
use prost::Message;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use telemetry::backend::otlp::proto::collector::logs::v1::ExportLogsServiceRequest;
use telemetry::backend::otlp::proto::collector::metrics::v1::ExportMetricsServiceRequest;
use telemetry::backend::otlp::proto::collector::trace::v1::ExportTraceServiceRequest;
use telemetry::backend::otlp::proto::common::v1::any_value::Value;
use telemetry::config::BackendKind;
use telemetry::models::LabelSet;
use telemetry::trace::Context;
use telemetry::Telemetry;
use url::Url;

use super::common::quiet_config;

#[derive(Clone, Default)]
struct Collector {
    received: Arc<Mutex<Vec<(String, Bytes)>>>,
    authorization: Arc<Mutex<Vec<String>>>,
    fail_next: Arc<AtomicUsize>,
}

impl Collector {
    fn bodies(&self, path: &str) -> Vec<Bytes> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
            .collect()
    }
}

async fn receive(
    State(collector): State<Collector>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(value) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        collector.authorization.lock().unwrap().push(value.to_string());
    }
    let failing = collector
        .fail_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    collector
        .received
        .lock()
        .unwrap()
        .push((uri.path().to_string(), body));
    StatusCode::OK
}

async fn start_collector() -> (Collector, Url) {
    let collector = Collector::default();
    let app = Router::new()
        .route("/v1/traces", post(receive))
        .route("/v1/logs", post(receive))
        .route("/v1/metrics", post(receive))
        .with_state(collector.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (collector, Url::parse(&format!("http://{addr}")).unwrap())
}

fn string_value(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::StringValue(s)) => Some(s.as_str()),
        _ => None,
    }
}

#[tokio::test]
async fn test_every_signal_is_delivered_as_protobuf() {
    let (collector, endpoint) = start_collector().await;
    let mut config = quiet_config(BackendKind::OtlpHttp).with_endpoint(endpoint);
    config.headers = vec![("authorization".to_string(), "Bearer secret".to_string())];
    let telemetry = Telemetry::init(config).unwrap();

    let cx = Context::new();
    let span = telemetry.tracer().start_span("GET /work", &cx);
    telemetry.logger().info("Work endpoint called", &cx);
    telemetry
        .meter()
        .counter("requests_total", "Total requests", "1")
        .increment(&LabelSet::from([("endpoint", "/work")]));
    span.end();
    telemetry.shutdown().await;

    let traces = collector.bodies("/v1/traces");
    assert_eq!(traces.len(), 1);
    let request = ExportTraceServiceRequest::decode(traces[0].clone()).unwrap();
    let resource_spans = &request.resource_spans[0];
    let service = resource_spans
        .resource
        .as_ref()
        .unwrap()
        .attributes
        .iter()
        .find(|kv| kv.key == "service.name")
        .unwrap();
    assert_eq!(
        string_value(service.value.as_ref().and_then(|v| v.value.as_ref())),
        Some("integration-test")
    );
    let exported = &resource_spans.scope_spans[0].spans[0];
    assert_eq!(exported.name, "GET /work");
    assert_eq!(exported.trace_id, span.context().trace_id.to_bytes().to_vec());

    let logs = collector.bodies("/v1/logs");
    let request = ExportLogsServiceRequest::decode(logs[0].clone()).unwrap();
    let record = &request.resource_logs[0].scope_logs[0].log_records[0];
    assert_eq!(
        string_value(record.body.as_ref().and_then(|v| v.value.as_ref())),
        Some("Work endpoint called")
    );
    assert_eq!(record.span_id, span.context().span_id.to_bytes().to_vec());

    let metrics = collector.bodies("/v1/metrics");
    let request = ExportMetricsServiceRequest::decode(metrics[0].clone()).unwrap();
    assert_eq!(
        request.resource_metrics[0].scope_metrics[0].metrics[0].name,
        "requests_total"
    );

    let authorization = collector.authorization.lock().unwrap();
    assert!(!authorization.is_empty());
    assert!(authorization.iter().all(|v| v == "Bearer secret"));
}

#[tokio::test]
async fn test_unavailable_collector_is_retried() {
    let (collector, endpoint) = start_collector().await;
    collector.fail_next.store(2, Ordering::SeqCst);
    let mut config = quiet_config(BackendKind::OtlpHttp).with_endpoint(endpoint);
    config.retry_attempts = 3;
    let telemetry = Telemetry::init(config).unwrap();

    telemetry
        .tracer()
        .start_span("retried", &Context::new())
        .end();
    telemetry.force_flush().await;

    assert_eq!(collector.bodies("/v1/traces").len(), 1);
    let stats = telemetry.stats();
    assert_eq!(stats.traces.batch_retries, 2);
    assert_eq!(stats.traces.batches_exported, 1);
}

#[tokio::test]
async fn test_unreachable_collector_drops_without_failing_callers() {
    let mut config = quiet_config(BackendKind::OtlpHttp)
        .with_endpoint(Url::parse("http://127.0.0.1:1").unwrap());
    config.retry_attempts = 1;
    let telemetry = Telemetry::init(config).unwrap();

    telemetry.tracer().start_span("lost", &Context::new()).end();
    telemetry.logger().info("lost too", &Context::new());
    telemetry.force_flush().await;

    let stats = telemetry.stats();
    assert_eq!(stats.traces.dropped_export, 1);
    assert_eq!(stats.logs.dropped_export, 1);
}
