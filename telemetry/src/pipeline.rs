//! The `Telemetry` facade: one configured pipeline per process.
//!
//! [`Telemetry::init`] validates the configuration, builds the backend
//! adapters, and starts one batch worker per batched signal plus the metric
//! push task. Recorders ([`Tracer`], [`Logger`], [`Meter`]) are cheap clones
//! handed to request-handling code.

use crate::backend::{build_exporter, Exporter, PrometheusExporter, Signal};
use crate::config::{BackendKind, TelemetryConfig};
use crate::error::ConfigurationError;
use crate::export::{self, BatchConfig, BatchSender, RetryPolicy, SignalStatsSnapshot};
use crate::logs::Logger;
use crate::metrics::{InstrumentRegistry, Meter, MetricReader, ReaderStats};
use crate::models::{LogRecord, SpanData};
use crate::resource::Resource;
use crate::trace::Tracer;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Pipeline counters, reported by health endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryStats {
    /// Span queue counters.
    pub traces: SignalStatsSnapshot,
    /// Log queue counters.
    pub logs: SignalStatsSnapshot,
    /// Metric reader counters.
    pub metrics: ReaderStats,
}

impl TelemetryStats {
    /// Spans and log records lost, for any reason.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.traces.dropped() + self.logs.dropped()
    }
}

/// Runtime that drives the background tasks when the caller has none.
struct DedicatedRuntime {
    stop: Option<oneshot::Sender<()>>,
}

impl Drop for DedicatedRuntime {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Spawns background tasks on the caller's runtime, or on a dedicated
/// single-threaded runtime running on its own thread.
struct Spawner {
    handle: Handle,
    dedicated: Option<DedicatedRuntime>,
}

impl Spawner {
    fn new() -> Result<Self, ConfigurationError> {
        if let Ok(handle) = Handle::try_current() {
            return Ok(Self {
                handle,
                dedicated: None,
            });
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ConfigurationError::Runtime)?;
        let handle = runtime.handle().clone();
        let (stop, stopped) = oneshot::channel::<()>();
        std::thread::Builder::new()
            .name("telemetry-export".to_string())
            .spawn(move || {
                runtime.block_on(async {
                    let _ = stopped.await;
                });
            })
            .map_err(ConfigurationError::Runtime)?;
        tracing::debug!("No tokio runtime found, export tasks run on a dedicated thread");

        Ok(Self {
            handle,
            dedicated: Some(DedicatedRuntime { stop: Some(stop) }),
        })
    }

    fn spawn(&self, task: impl Future<Output = ()> + Send + 'static) {
        self.handle.spawn(task);
    }
}

/// Builder for [`Telemetry`].
#[must_use]
pub struct TelemetryBuilder {
    config: TelemetryConfig,
    exporter: Option<Arc<dyn Exporter>>,
}

impl std::fmt::Debug for TelemetryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryBuilder")
            .field("config", &self.config)
            .field("exporter", &self.exporter.as_ref().map(|e| e.name()))
            .finish()
    }
}

impl TelemetryBuilder {
    /// Sends every pushed signal to `exporter` instead of the configured backend.
    ///
    /// A pull-mode metrics backend still serves scrapes itself.
    pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Validates the configuration and starts the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a backend adapter
    /// cannot be built from it, or no runtime is available for the export
    /// tasks.
    pub fn build(self) -> Result<Telemetry, ConfigurationError> {
        let config = self.config;
        config.validate_config()?;

        let resource = Arc::new(config.resource());
        let spawner = Spawner::new()?;
        let batch = BatchConfig::from_config(&config);
        let registry = Arc::new(InstrumentRegistry::new());
        let mut exporters: Vec<Arc<dyn Exporter>> = Vec::new();

        let main_kind = config.backend;
        let carries = |signal: Signal| self.exporter.is_some() || main_kind.supports(signal);
        let main_exporter = if carries(Signal::Traces) || carries(Signal::Logs) {
            let exporter = match &self.exporter {
                Some(exporter) => exporter.clone(),
                None => build_exporter(main_kind, &config, resource.clone())?,
            };
            exporters.push(exporter.clone());
            Some(exporter)
        } else {
            None
        };

        let spans = match &main_exporter {
            Some(exporter) if carries(Signal::Traces) => {
                let (sender, worker) = export::channel::<SpanData>(batch, exporter.clone());
                spawner.spawn(worker.run());
                Some(sender)
            }
            _ => {
                disabled(Signal::Traces, main_kind);
                None
            }
        };
        let logs = match &main_exporter {
            Some(exporter) if carries(Signal::Logs) => {
                let (sender, worker) = export::channel::<LogRecord>(batch, exporter.clone());
                spawner.spawn(worker.run());
                Some(sender)
            }
            _ => {
                disabled(Signal::Logs, main_kind);
                None
            }
        };

        let metrics_kind = config.backend_for(Signal::Metrics);
        let reader = if metrics_kind == BackendKind::PrometheusPull {
            MetricReader::pull(registry.clone(), Arc::new(PrometheusExporter::new()))
        } else if self.exporter.is_some() || metrics_kind.supports(Signal::Metrics) {
            let exporter = match (&self.exporter, &main_exporter) {
                (Some(exporter), _) => exporter.clone(),
                (None, Some(exporter)) if metrics_kind == main_kind => exporter.clone(),
                _ => {
                    let exporter = build_exporter(metrics_kind, &config, resource.clone())?;
                    exporters.push(exporter.clone());
                    exporter
                }
            };
            let (reader, worker) = MetricReader::push(
                registry.clone(),
                exporter,
                config.metric_interval,
                config.temporality,
                RetryPolicy::from_config(&config),
            );
            spawner.spawn(worker.run());
            reader
        } else {
            disabled(Signal::Metrics, metrics_kind);
            MetricReader::disabled(registry.clone())
        };

        tracing::info!(
            service = resource.service_name(),
            backend = %main_kind,
            metrics_backend = %metrics_kind,
            traces = spans.is_some(),
            logs = logs.is_some(),
            metrics_pull = reader.is_pull(),
            "Telemetry pipeline started"
        );

        Ok(Telemetry {
            tracer: spans.clone().map_or_else(Tracer::noop, Tracer::new),
            logger: logs.clone().map_or_else(Logger::noop, Logger::new),
            meter: Meter::new(registry),
            resource,
            spans,
            logs,
            reader,
            exporters,
            shutdown_timeout: config.export_timeout,
            shut_down: AtomicBool::new(false),
            spawner: Mutex::new(Some(spawner)),
        })
    }
}

fn disabled(signal: Signal, kind: BackendKind) {
    tracing::info!(%signal, backend = %kind, "Backend does not carry this signal, export disabled");
}

/// A running telemetry pipeline.
pub struct Telemetry {
    resource: Arc<Resource>,
    tracer: Tracer,
    logger: Logger,
    meter: Meter,
    spans: Option<BatchSender<SpanData>>,
    logs: Option<BatchSender<LogRecord>>,
    reader: MetricReader,
    exporters: Vec<Arc<dyn Exporter>>,
    shutdown_timeout: Duration,
    shut_down: AtomicBool,
    spawner: Mutex<Option<Spawner>>,
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("resource", &self.resource)
            .field("traces", &self.spans.is_some())
            .field("logs", &self.logs.is_some())
            .field("metrics_pull", &self.reader.is_pull())
            .finish_non_exhaustive()
    }
}

impl Telemetry {
    /// Starts a pipeline for `config` with the configured backends.
    ///
    /// # Errors
    ///
    /// See [`TelemetryBuilder::build`].
    pub fn init(config: TelemetryConfig) -> Result<Self, ConfigurationError> {
        Self::builder(config).build()
    }

    /// Returns a builder for `config`.
    pub fn builder(config: TelemetryConfig) -> TelemetryBuilder {
        TelemetryBuilder {
            config,
            exporter: None,
        }
    }

    /// Returns the resource attached to every export.
    #[must_use]
    pub fn resource(&self) -> &Arc<Resource> {
        &self.resource
    }

    /// Returns the span recorder.
    #[must_use]
    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Returns the log recorder.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Returns the metric front-end.
    #[must_use]
    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    /// Returns the instrument registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<InstrumentRegistry> {
        self.meter.registry()
    }

    /// Returns the metric reader.
    #[must_use]
    pub fn reader(&self) -> &MetricReader {
        &self.reader
    }

    /// Serves one pull-mode scrape. Returns `None` when metrics are pushed.
    #[must_use]
    pub fn scrape(&self) -> Option<String> {
        self.reader.scrape()
    }

    /// Returns the pipeline counters.
    #[must_use]
    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            traces: self.spans.as_ref().map(BatchSender::stats).unwrap_or_default(),
            logs: self.logs.as_ref().map(BatchSender::stats).unwrap_or_default(),
            metrics: self.reader.stats(),
        }
    }

    /// Exports everything queued so far and pushes a metric snapshot.
    pub async fn force_flush(&self) {
        let flush = async {
            tokio::join!(
                flush(self.spans.as_ref()),
                flush(self.logs.as_ref()),
                self.reader.force_flush(),
            );
        };
        if tokio::time::timeout(self.shutdown_timeout, flush).await.is_err() {
            tracing::warn!(timeout = ?self.shutdown_timeout, "Telemetry flush timed out");
        }
    }

    /// Flushes and stops every background task.
    ///
    /// Bounded by the export timeout; records still queued when it elapses
    /// are lost. Calling it again does nothing.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let stop = async {
            tokio::join!(
                shutdown(self.spans.as_ref()),
                shutdown(self.logs.as_ref()),
                self.reader.shutdown(),
            );
            for exporter in &self.exporters {
                exporter.shutdown().await;
            }
        };
        if tokio::time::timeout(self.shutdown_timeout, stop).await.is_err() {
            tracing::warn!(timeout = ?self.shutdown_timeout, "Telemetry shutdown timed out");
        }

        let spawner = self
            .spawner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if spawner.is_some_and(|s| s.dedicated.is_some()) {
            tracing::debug!("Stopped dedicated export runtime");
        }
        tracing::info!(stats = ?self.stats(), "Telemetry pipeline shut down");
    }
}

async fn flush<T: export::Exportable>(sender: Option<&BatchSender<T>>) {
    if let Some(sender) = sender {
        sender.force_flush().await;
    }
}

async fn shutdown<T: export::Exportable>(sender: Option<&BatchSender<T>>) {
    if let Some(sender) = sender {
        sender.shutdown().await;
    }
}
