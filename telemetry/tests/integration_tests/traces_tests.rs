//! Span recording through the pipeline.

use std::collections::{HashMap, HashSet};
use telemetry::config::BackendKind;
use telemetry::models::{Severity, SpanStatus};
use telemetry::propagation;
use telemetry::trace::Context;

use super::common::{quiet_config, recording_pipeline};

#[tokio::test]
async fn test_nested_spans_are_exported_with_parent() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));
    let cx = Context::new();

    let a = telemetry.tracer().start_span("a", &cx);
    let b = telemetry.tracer().start_span("b", &cx);
    b.end();
    a.end();
    telemetry.force_flush().await;

    let spans = exporter.spans();
    assert_eq!(spans.len(), 2);
    let a = spans.iter().find(|s| s.name == "a").unwrap();
    let b = spans.iter().find(|s| s.name == "b").unwrap();
    assert_eq!(a.trace_id, b.trace_id);
    assert_eq!(b.parent_span_id, Some(a.span_id));
    assert_eq!(a.parent_span_id, None);
    for span in &spans {
        assert!(span.end_time >= span.start_time);
    }
}

#[tokio::test]
async fn test_double_end_exports_once() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));
    let span = telemetry.tracer().start_span("twice", &Context::new());

    assert!(span.end().is_none());
    let warning = span.end().expect("second end is reported");
    assert_eq!(warning.name, "twice");
    telemetry.force_flush().await;

    assert_eq!(exporter.spans().len(), 1);
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_spans() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));
    let telemetry = std::sync::Arc::new(telemetry);

    let mut tasks = Vec::new();
    for n in 0..20 {
        let telemetry = telemetry.clone();
        tasks.push(tokio::spawn(async move {
            let cx = Context::new();
            let root = telemetry.tracer().start_span(format!("request-{n}"), &cx);
            tokio::task::yield_now().await;
            let child = telemetry.tracer().start_span(format!("child-{n}"), &cx);
            tokio::task::yield_now().await;
            child.end();
            root.end();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    telemetry.force_flush().await;

    let spans = exporter.spans();
    assert_eq!(spans.len(), 40);
    let traces: HashSet<_> = spans.iter().map(|s| s.trace_id).collect();
    assert_eq!(traces.len(), 20);
    for child in spans.iter().filter(|s| s.name.starts_with("child-")) {
        let n = child.name.trim_start_matches("child-");
        let root = spans
            .iter()
            .find(|s| s.name == format!("request-{n}"))
            .unwrap();
        assert_eq!(child.parent_span_id, Some(root.span_id));
        assert_eq!(child.trace_id, root.trace_id);
    }
}

#[tokio::test]
async fn test_forked_sub_flows_are_siblings() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));
    let telemetry = std::sync::Arc::new(telemetry);
    let cx = Context::new();
    let root = telemetry.tracer().start_span("root", &cx);

    let (started, a_is_open) = tokio::sync::oneshot::channel();
    let (release, released) = tokio::sync::oneshot::channel::<()>();
    let fetch_a = {
        let telemetry = telemetry.clone();
        let cx = cx.fork();
        tokio::spawn(async move {
            let span = telemetry.tracer().start_span("fetch-a", &cx);
            started.send(()).unwrap();
            released.await.unwrap();
            span.end();
        })
    };
    a_is_open.await.unwrap();

    let b_cx = cx.fork();
    let fetch_b = telemetry.tracer().start_span("fetch-b", &b_cx);
    assert_eq!(b_cx.depth(), 2);
    assert_eq!(cx.depth(), 1);
    fetch_b.end();
    release.send(()).unwrap();
    fetch_a.await.unwrap();
    root.end();
    telemetry.force_flush().await;

    let spans = exporter.spans();
    let root = spans.iter().find(|s| s.name == "root").unwrap();
    for name in ["fetch-a", "fetch-b"] {
        let sibling = spans.iter().find(|s| s.name == name).unwrap();
        assert_eq!(sibling.parent_span_id, Some(root.span_id), "{name}");
        assert_eq!(sibling.trace_id, root.trace_id);
    }
}

#[tokio::test]
async fn test_cancelled_request_closes_span_with_error() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));
    let telemetry = std::sync::Arc::new(telemetry);

    let handler = {
        let telemetry = telemetry.clone();
        async move {
            let cx = Context::new();
            let _span = telemetry.tracer().start_span("slow request", &cx);
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        }
    };
    let timed_out = tokio::time::timeout(std::time::Duration::from_millis(10), handler).await;
    assert!(timed_out.is_err());
    telemetry.force_flush().await;

    let spans = exporter.spans();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].status, SpanStatus::Error);
}

#[tokio::test]
async fn test_logs_are_correlated_across_propagated_trace() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));

    let upstream = Context::new();
    let call = telemetry.tracer().start_span("call downstream", &upstream);
    let mut headers = reqwest::header::HeaderMap::new();
    propagation::inject(&upstream, &mut headers);

    let downstream = propagation::extract(&headers);
    let handled = telemetry.tracer().start_span("handle", &downstream);
    telemetry
        .logger()
        .emit(Severity::Info, "downstream handled", HashMap::new(), &downstream);
    handled.end();
    call.end();
    telemetry.force_flush().await;

    let spans = exporter.spans();
    let handle = spans.iter().find(|s| s.name == "handle").unwrap();
    assert_eq!(handle.trace_id, call.context().trace_id);
    assert_eq!(handle.parent_span_id, Some(call.context().span_id));

    let logs = exporter.logs();
    assert_eq!(logs[0].trace_id, Some(call.context().trace_id));
    assert_eq!(logs[0].span_id, Some(handle.span_id));
}
