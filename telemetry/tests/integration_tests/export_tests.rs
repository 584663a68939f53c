//! Batching, overflow and failure behavior seen from the producer side.

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::backend::InMemoryExporter;
use telemetry::config::{BackendKind, OverflowPolicy};
use telemetry::models::{LabelSet, Severity, Temporality};
use telemetry::trace::Context;
use telemetry::Telemetry;

use super::common::{quiet_config, BlockingExporter};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_backend_does_not_slow_producers() {
    let mut config = quiet_config(BackendKind::OtlpHttp).with_batching(8, 64);
    config.flush_interval = Duration::from_millis(5);
    let exporter = Arc::new(BlockingExporter::default());
    let telemetry = Telemetry::builder(config)
        .with_exporter(exporter.clone())
        .build()
        .unwrap();
    let requests = telemetry.meter().counter("requests_total", "", "1");
    let labels = LabelSet::from([("endpoint", "/")]);

    // Let the workers pick up a batch and get stuck on it.
    for _ in 0..16 {
        telemetry.tracer().start_span("warmup", &Context::new()).end();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(exporter.attempts.load(Ordering::Relaxed) >= 1);

    const CALLS: u32 = 1_000;
    let started = Instant::now();
    for n in 0..CALLS {
        let cx = Context::new();
        let span = telemetry.tracer().start_span("request", &cx);
        requests.record(1.0, &labels);
        telemetry
            .logger()
            .emit(Severity::Info, format!("request {n}"), HashMap::new(), &cx);
        span.end();
    }
    let per_call = started.elapsed() / CALLS;

    assert!(per_call < Duration::from_millis(1), "took {per_call:?} per request");
    assert!(telemetry.stats().traces.dropped_overflow > 0);
    let snapshot = telemetry.registry().collect(Temporality::Cumulative);
    assert_eq!(
        snapshot.value("requests_total", &labels),
        Some(f64::from(CALLS))
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_overflow_drops_exactly_the_excess() {
    let config = quiet_config(BackendKind::OtlpHttp).with_batching(10, 10);
    let (telemetry, exporter) = {
        let exporter = Arc::new(InMemoryExporter::new());
        let telemetry = Telemetry::builder(config)
            .with_exporter(exporter.clone())
            .build()
            .unwrap();
        (telemetry, exporter)
    };

    // No await between sends: the worker cannot drain in between.
    let cx = Context::new();
    for n in 0..25 {
        telemetry.logger().info(format!("record {n}"), &cx);
    }
    assert_eq!(telemetry.stats().logs.dropped_overflow, 15);

    telemetry.shutdown().await;
    assert_eq!(exporter.logs().len(), 10);
    assert_eq!(telemetry.stats().logs.records_exported, 10);
}

#[tokio::test(flavor = "current_thread")]
async fn test_drop_oldest_keeps_the_newest_records() {
    let mut config = quiet_config(BackendKind::OtlpHttp).with_batching(3, 3);
    config.overflow_policy = OverflowPolicy::DropOldest;
    let exporter = Arc::new(InMemoryExporter::new());
    let telemetry = Telemetry::builder(config)
        .with_exporter(exporter.clone())
        .build()
        .unwrap();

    let cx = Context::new();
    for n in 0..5 {
        telemetry.logger().info(format!("record {n}"), &cx);
    }
    telemetry.shutdown().await;

    let bodies: Vec<_> = exporter
        .logs()
        .into_iter()
        .map(|r| serde_json::to_value(&r.body).unwrap())
        .collect();
    assert_eq!(bodies, vec!["record 2", "record 3", "record 4"]);
    assert_eq!(telemetry.stats().logs.dropped_overflow, 2);
}

#[tokio::test]
async fn test_failing_backend_counts_dropped_batches() {
    let mut config = quiet_config(BackendKind::OtlpHttp);
    config.retry_attempts = 2;
    let exporter = Arc::new(InMemoryExporter::new().with_permanent_failure());
    let telemetry = Telemetry::builder(config)
        .with_exporter(exporter.clone())
        .build()
        .unwrap();

    let cx = Context::new();
    for _ in 0..3 {
        telemetry.tracer().start_span("lost", &cx).end();
    }
    telemetry.force_flush().await;

    let stats = telemetry.stats();
    assert_eq!(stats.traces.dropped_export, 3);
    assert_eq!(stats.traces.batches_exported, 0);
    assert!(exporter.spans().is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mut config = quiet_config(BackendKind::OtlpHttp);
    config.retry_attempts = 3;
    let exporter = Arc::new(InMemoryExporter::new().with_transient_failures(2));
    let telemetry = Telemetry::builder(config)
        .with_exporter(exporter.clone())
        .build()
        .unwrap();

    telemetry.tracer().start_span("eventually", &Context::new()).end();
    telemetry.force_flush().await;

    assert_eq!(exporter.spans().len(), 1);
    let stats = telemetry.stats();
    assert_eq!(stats.traces.batch_retries, 2);
    assert_eq!(stats.traces.dropped(), 0);
}
