//! Shared helpers for the pipeline integration tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::backend::{Exporter, InMemoryExporter};
use telemetry::config::{BackendKind, TelemetryConfig};
use telemetry::error::ExportError;
use telemetry::models::{LogRecord, MetricSnapshot, SpanData};
use telemetry::Telemetry;

/// A configuration that only flushes when asked to.
pub fn quiet_config(kind: BackendKind) -> TelemetryConfig {
    let mut config = TelemetryConfig::new(kind)
        .with_service_name("integration-test")
        .with_flush_interval(Duration::from_secs(3600));
    config.metric_interval = Duration::from_secs(3600);
    config.export_timeout = Duration::from_secs(2);
    config
}

/// Starts a pipeline that exports into memory.
pub fn recording_pipeline(config: TelemetryConfig) -> (Telemetry, Arc<InMemoryExporter>) {
    let exporter = Arc::new(InMemoryExporter::new());
    let telemetry = Telemetry::builder(config)
        .with_exporter(exporter.clone())
        .build()
        .unwrap();
    (telemetry, exporter)
}

/// A backend whose exports never complete.
#[derive(Debug, Default)]
pub struct BlockingExporter {
    pub attempts: AtomicUsize,
}

impl BlockingExporter {
    async fn block(&self) -> Result<(), ExportError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[async_trait]
impl Exporter for BlockingExporter {
    fn name(&self) -> &'static str {
        "blocking"
    }

    async fn export_spans(&self, _batch: &[SpanData]) -> Result<(), ExportError> {
        self.block().await
    }

    async fn export_logs(&self, _batch: &[LogRecord]) -> Result<(), ExportError> {
        self.block().await
    }

    async fn export_metrics(&self, _snapshot: &MetricSnapshot) -> Result<(), ExportError> {
        self.block().await
    }
}
