//! Metric reader.
//!
//! Push mode runs a periodic task that collects a snapshot and hands it to
//! the backend. Pull mode has no task: every scrape collects synchronously
//! and returns the rendered exposition text.

use super::InstrumentRegistry;
use crate::backend::{Exporter, PrometheusExporter};
use crate::export::{export_with_retry, RetryPolicy};
use crate::models::{MetricSnapshot, Temporality};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;

/// Counter values for the metric reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReaderStats {
    /// Snapshots delivered (pushed or scraped).
    pub exports: u64,
    /// Push exports dropped after retries were exhausted.
    pub failed_exports: u64,
}

#[derive(Debug, Default)]
struct Counters {
    exports: AtomicU64,
    failed_exports: AtomicU64,
}

enum Control {
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug)]
enum Mode {
    Push(mpsc::UnboundedSender<Control>),
    Pull(Arc<PrometheusExporter>),
    Disabled,
}

impl std::fmt::Debug for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flush(_) => write!(f, "Flush"),
            Self::Shutdown(_) => write!(f, "Shutdown"),
        }
    }
}

/// Collects instrument snapshots and delivers them to the metrics backend.
#[derive(Debug)]
pub struct MetricReader {
    registry: Arc<InstrumentRegistry>,
    mode: Mode,
    counters: Arc<Counters>,
}

impl MetricReader {
    /// Creates a push-mode reader and the task that drives it.
    #[must_use]
    pub fn push(
        registry: Arc<InstrumentRegistry>,
        exporter: Arc<dyn Exporter>,
        interval: Duration,
        temporality: Temporality,
        retry: RetryPolicy,
    ) -> (Self, PushWorker) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let worker = PushWorker {
            registry: registry.clone(),
            exporter,
            interval,
            temporality,
            retry,
            counters: counters.clone(),
            control: control_rx,
        };
        let reader = Self {
            registry,
            mode: Mode::Push(control_tx),
            counters,
        };
        (reader, worker)
    }

    /// Creates a pull-mode reader rendering through `exporter`.
    #[must_use]
    pub fn pull(registry: Arc<InstrumentRegistry>, exporter: Arc<PrometheusExporter>) -> Self {
        Self {
            registry,
            mode: Mode::Pull(exporter),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Creates a reader that never delivers anything.
    #[must_use]
    pub fn disabled(registry: Arc<InstrumentRegistry>) -> Self {
        Self {
            registry,
            mode: Mode::Disabled,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Returns true in pull mode.
    #[must_use]
    pub fn is_pull(&self) -> bool {
        matches!(self.mode, Mode::Pull(_))
    }

    /// Collects a cumulative snapshot without delivering it anywhere.
    #[must_use]
    pub fn collect(&self) -> MetricSnapshot {
        self.registry.collect(Temporality::Cumulative)
    }

    /// Serves one scrape: collects and renders the current values.
    ///
    /// Returns `None` unless the reader is in pull mode.
    #[must_use]
    pub fn scrape(&self) -> Option<String> {
        let Mode::Pull(exporter) = &self.mode else {
            return None;
        };
        let text = exporter.render(&self.collect());
        self.counters.exports.fetch_add(1, Ordering::Relaxed);
        Some(text)
    }

    /// Pushes a snapshot now and waits for the export to finish.
    pub async fn force_flush(&self) {
        if let Mode::Push(control) = &self.mode {
            let (done, wait) = oneshot::channel();
            if control.send(Control::Flush(done)).is_ok() {
                let _ = wait.await;
            }
        }
    }

    /// Pushes a final snapshot and stops the push task.
    pub async fn shutdown(&self) {
        if let Mode::Push(control) = &self.mode {
            let (done, wait) = oneshot::channel();
            if control.send(Control::Shutdown(done)).is_ok() {
                let _ = wait.await;
            }
        }
    }

    /// Returns the reader counters.
    #[must_use]
    pub fn stats(&self) -> ReaderStats {
        ReaderStats {
            exports: self.counters.exports.load(Ordering::Relaxed),
            failed_exports: self.counters.failed_exports.load(Ordering::Relaxed),
        }
    }
}

/// Periodic push task.
///
/// A snapshot whose export fails after all retries is counted in
/// `failed_exports`. With delta temporality its values were already taken
/// out of the series, so they are merged back and go out with the next
/// collection instead of being lost.
pub struct PushWorker {
    registry: Arc<InstrumentRegistry>,
    exporter: Arc<dyn Exporter>,
    interval: Duration,
    temporality: Temporality,
    retry: RetryPolicy,
    counters: Arc<Counters>,
    control: mpsc::UnboundedReceiver<Control>,
}

impl PushWorker {
    /// Runs until shutdown is requested or the reader is dropped.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        tracing::debug!(
            exporter = self.exporter.name(),
            interval = ?self.interval,
            "Metric push task started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => self.collect_and_export().await,
                control = self.control.recv() => match control {
                    Some(Control::Flush(done)) => {
                        self.collect_and_export().await;
                        let _ = done.send(());
                    }
                    Some(Control::Shutdown(done)) => {
                        self.collect_and_export().await;
                        let _ = done.send(());
                        break;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Metric push task stopped");
    }

    async fn collect_and_export(&self) {
        let snapshot = self.registry.collect(self.temporality);
        if snapshot.is_empty() {
            return;
        }

        let exporter: &dyn Exporter = self.exporter.as_ref();
        let snapshot = &snapshot;
        let outcome =
            export_with_retry(&self.retry, move || exporter.export_metrics(snapshot)).await;
        match outcome.result {
            Ok(()) => {
                self.counters.exports.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                self.counters.failed_exports.fetch_add(1, Ordering::Relaxed);
                if self.temporality == Temporality::Delta {
                    self.registry.restore(snapshot);
                }
                tracing::warn!(
                    exporter = self.exporter.name(),
                    retries = outcome.retries,
                    temporality = ?self.temporality,
                    %error,
                    "Metric snapshot export failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryExporter;
    use crate::metrics::Meter;
    use crate::models::LabelSet;

    fn retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 1,
            timeout: Duration::from_millis(200),
            step: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_pull_scrape() {
        let registry = Arc::new(InstrumentRegistry::new());
        let reader = MetricReader::pull(registry.clone(), Arc::new(PrometheusExporter::new()));
        let requests = Meter::new(registry).counter("requests_total", "Total requests", "1");

        for _ in 0..3 {
            requests.record(1.0, &LabelSet::from([("endpoint", "/")]));
        }
        requests.record(1.0, &LabelSet::from([("endpoint", "/work")]));

        let text = reader.scrape().unwrap();
        assert!(text.contains("requests_total{endpoint=\"/\"} 3\n"));
        assert!(text.contains("requests_total{endpoint=\"/work\"} 1\n"));
        assert_eq!(reader.stats().exports, 1);
    }

    #[test]
    fn test_scrape_outside_pull_mode() {
        let reader = MetricReader::disabled(Arc::new(InstrumentRegistry::new()));
        assert!(reader.scrape().is_none());
    }

    #[tokio::test]
    async fn test_push_reports_cumulative_totals() {
        let registry = Arc::new(InstrumentRegistry::new());
        let exporter = Arc::new(InMemoryExporter::new());
        let (reader, worker) = MetricReader::push(
            registry.clone(),
            exporter.clone(),
            Duration::from_secs(3600),
            Temporality::Cumulative,
            retry(),
        );
        tokio::spawn(worker.run());
        let counter = Meter::new(registry).counter("jobs", "", "");
        let labels = LabelSet::new();

        counter.record(2.0, &labels);
        reader.force_flush().await;
        counter.record(3.0, &labels);
        reader.force_flush().await;

        let snapshots = exporter.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].value("jobs", &labels), Some(2.0));
        assert_eq!(snapshots[1].value("jobs", &labels), Some(5.0));
        assert_eq!(reader.stats().exports, 2);
    }

    #[tokio::test]
    async fn test_push_delta_does_not_double_count() {
        let registry = Arc::new(InstrumentRegistry::new());
        let exporter = Arc::new(InMemoryExporter::new());
        let (reader, worker) = MetricReader::push(
            registry.clone(),
            exporter.clone(),
            Duration::from_secs(3600),
            Temporality::Delta,
            retry(),
        );
        tokio::spawn(worker.run());
        let counter = Meter::new(registry).counter("jobs", "", "");
        let labels = LabelSet::new();

        counter.record(2.0, &labels);
        reader.force_flush().await;
        counter.record(3.0, &labels);
        reader.shutdown().await;

        let snapshots = exporter.snapshots();
        assert_eq!(snapshots[0].value("jobs", &labels), Some(2.0));
        assert_eq!(snapshots[1].value("jobs", &labels), Some(3.0));
    }

    #[tokio::test]
    async fn test_failed_push_is_counted() {
        let registry = Arc::new(InstrumentRegistry::new());
        let exporter = Arc::new(InMemoryExporter::new().with_permanent_failure());
        let (reader, worker) = MetricReader::push(
            registry.clone(),
            exporter,
            Duration::from_secs(3600),
            Temporality::Cumulative,
            retry(),
        );
        tokio::spawn(worker.run());
        Meter::new(registry)
            .counter("jobs", "", "")
            .increment(&LabelSet::new());

        reader.force_flush().await;
        assert_eq!(reader.stats().failed_exports, 1);
        assert_eq!(reader.stats().exports, 0);
    }

    #[tokio::test]
    async fn test_failed_delta_is_carried_into_next_push() {
        let registry = Arc::new(InstrumentRegistry::new());
        // Both attempts of the first push fail.
        let exporter = Arc::new(InMemoryExporter::new().with_transient_failures(2));
        let (reader, worker) = MetricReader::push(
            registry.clone(),
            exporter.clone(),
            Duration::from_secs(3600),
            Temporality::Delta,
            retry(),
        );
        tokio::spawn(worker.run());
        let meter = Meter::new(registry);
        let counter = meter.counter("jobs", "", "");
        let latency = meter.histogram("latency", "", "ms");
        let labels = LabelSet::new();

        counter.record(2.0, &labels);
        latency.record(4.0, &labels);
        reader.force_flush().await;
        assert_eq!(reader.stats().failed_exports, 1);
        assert!(exporter.snapshots().is_empty());

        counter.record(3.0, &labels);
        latency.record(40.0, &labels);
        reader.force_flush().await;

        let snapshots = exporter.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].value("jobs", &labels), Some(5.0));
        let histogram = snapshots[0]
            .metric("latency")
            .and_then(|m| m.point(&labels))
            .and_then(|p| p.value.as_histogram())
            .unwrap();
        assert_eq!(histogram.count, 2);
        assert_eq!(histogram.sum, 44.0);
        assert_eq!(histogram.min, Some(4.0));
        assert_eq!(histogram.max, Some(40.0));
    }
}
