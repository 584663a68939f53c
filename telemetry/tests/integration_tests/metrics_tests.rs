//! Instruments, pull scrapes and push snapshots.

use std::sync::Arc;
use std::thread;
use telemetry::config::BackendKind;
use telemetry::metrics::InstrumentKind;
use telemetry::models::{LabelSet, Temporality};
use telemetry::Telemetry;

use super::common::{quiet_config, recording_pipeline};

#[tokio::test]
async fn test_pull_scrape_reports_per_label_totals() {
    let telemetry = Telemetry::init(quiet_config(BackendKind::PrometheusPull)).unwrap();
    let requests = telemetry
        .meter()
        .counter("requests_total", "Total requests", "1");

    for _ in 0..3 {
        requests.record(1.0, &LabelSet::from([("endpoint", "/")]));
    }
    requests.record(1.0, &LabelSet::from([("endpoint", "/work")]));

    let text = telemetry.scrape().expect("pull mode serves scrapes");
    assert!(text.contains("# TYPE requests_total counter\n"));
    assert!(text.contains("requests_total{endpoint=\"/\"} 3\n"));
    assert!(text.contains("requests_total{endpoint=\"/work\"} 1\n"));
    assert_eq!(telemetry.stats().metrics.exports, 1);
}

#[tokio::test]
async fn test_scrape_invokes_gauge_callbacks() {
    let telemetry = Telemetry::init(quiet_config(BackendKind::PrometheusPull)).unwrap();
    let queue_depth = Arc::new(std::sync::atomic::AtomicU64::new(4));
    let observed = queue_depth.clone();
    telemetry.meter().observable_gauge(
        "queue_depth",
        "Jobs waiting",
        "1",
        move |observer| {
            let depth = observed.load(std::sync::atomic::Ordering::Relaxed);
            #[allow(clippy::cast_precision_loss)]
            observer.observe(depth as f64, LabelSet::new());
        },
    );

    assert!(telemetry.scrape().unwrap().contains("queue_depth 4\n"));
    queue_depth.store(9, std::sync::atomic::Ordering::Relaxed);
    assert!(telemetry.scrape().unwrap().contains("queue_depth 9\n"));
}

#[tokio::test]
async fn test_concurrent_records_are_not_lost() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));
    let counter = telemetry.meter().counter("hits_total", "", "1");
    let latency = telemetry.meter().histogram("latency_seconds", "", "s");
    let labels = LabelSet::from([("endpoint", "/work")]);

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let counter = counter.clone();
            let latency = latency.clone();
            let labels = labels.clone();
            thread::spawn(move || {
                for _ in 0..1_000 {
                    counter.record(1.0, &labels);
                    latency.record(0.25, &labels);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    telemetry.force_flush().await;

    let snapshot = &exporter.snapshots()[0];
    assert_eq!(snapshot.value("hits_total", &labels), Some(8_000.0));
    let histogram = snapshot.metric("latency_seconds").unwrap();
    match &histogram.points[0].value {
        telemetry::models::MetricValue::Histogram(data) => {
            assert_eq!(data.count, 8_000);
            assert!((data.sum - 2_000.0).abs() < 1e-6);
        }
        other => panic!("expected a histogram, got {other:?}"),
    }
}

#[tokio::test]
async fn test_push_snapshots_are_cumulative() {
    let (telemetry, exporter) = recording_pipeline(quiet_config(BackendKind::OtlpHttp));
    let counter = telemetry.meter().counter("jobs_total", "", "1");
    let labels = LabelSet::new();

    counter.record(2.0, &labels);
    telemetry.force_flush().await;
    counter.record(3.0, &labels);
    telemetry.force_flush().await;

    let snapshots = exporter.snapshots();
    assert_eq!(snapshots[0].value("jobs_total", &labels), Some(2.0));
    assert_eq!(snapshots[1].value("jobs_total", &labels), Some(5.0));
}

#[tokio::test]
async fn test_delta_snapshots_do_not_double_count() {
    let mut config = quiet_config(BackendKind::OtlpHttp);
    config.temporality = Temporality::Delta;
    let (telemetry, exporter) = recording_pipeline(config);
    let counter = telemetry.meter().counter("jobs_total", "", "1");
    let labels = LabelSet::new();

    counter.record(2.0, &labels);
    telemetry.force_flush().await;
    counter.record(3.0, &labels);
    telemetry.shutdown().await;

    let snapshots = exporter.snapshots();
    assert_eq!(snapshots[0].value("jobs_total", &labels), Some(2.0));
    assert_eq!(snapshots[1].value("jobs_total", &labels), Some(3.0));
}

#[tokio::test]
async fn test_reregistration_reuses_or_conflicts() {
    let telemetry = Telemetry::init(quiet_config(BackendKind::PrometheusPull)).unwrap();
    let first = telemetry.meter().counter("requests_total", "", "1");
    let again = telemetry.meter().counter("requests_total", "", "1");
    assert!(first.same_instrument(&again));

    let conflict = telemetry
        .registry()
        .register("requests_total", InstrumentKind::Histogram, "", "")
        .unwrap_err();
    assert!(conflict.into_existing().same_instrument(&first));

    // The meter logs the conflict and hands back the existing counter.
    let reused = telemetry.meter().histogram("requests_total", "", "");
    assert_eq!(reused.kind(), InstrumentKind::Counter);
    assert_eq!(telemetry.registry().len(), 1);
}
