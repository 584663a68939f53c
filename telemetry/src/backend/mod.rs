//! Backend adapters.
//!
//! Every backend implements [`Exporter`]. The pipeline only ever talks to
//! `Arc<dyn Exporter>`; which implementation sits behind it is decided once,
//! at startup, by [`build_exporter`] from the configured [`BackendKind`].
//!
//! Adapters own their transport (connecting lazily and reconnecting on
//! failure) but never retry: retry policy belongs to the batch exporter and
//! the metric reader.

mod memory;
pub mod otlp;
pub mod prometheus;
pub mod zipkin;

pub use memory::InMemoryExporter;
pub use otlp::{OtlpGrpcExporter, OtlpHttpExporter};
pub use prometheus::PrometheusExporter;
pub use zipkin::ZipkinExporter;

use crate::config::{BackendKind, TelemetryConfig};
use crate::error::{ConfigurationError, ExportError};
use crate::models::{LogRecord, MetricSnapshot, SpanData};
use crate::resource::Resource;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// The three telemetry signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Spans.
    Traces,
    /// Log records.
    Logs,
    /// Metric snapshots.
    Metrics,
}

impl Signal {
    /// Returns the lowercase signal name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Logs => "logs",
            Self::Metrics => "metrics",
        }
    }

    /// Returns the OTLP/HTTP path for this signal.
    #[must_use]
    pub fn otlp_path(self) -> &'static str {
        match self {
            Self::Traces => "/v1/traces",
            Self::Logs => "/v1/logs",
            Self::Metrics => "/v1/metrics",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sink for finished telemetry.
///
/// Each method makes a single attempt and reports success or failure.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Short backend name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Exports a batch of finished spans.
    async fn export_spans(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        let _ = batch;
        Err(ExportError::Unsupported {
            backend: self.name(),
            signal: Signal::Traces.as_str(),
        })
    }

    /// Exports a batch of log records.
    async fn export_logs(&self, batch: &[LogRecord]) -> Result<(), ExportError> {
        let _ = batch;
        Err(ExportError::Unsupported {
            backend: self.name(),
            signal: Signal::Logs.as_str(),
        })
    }

    /// Exports one metric snapshot.
    async fn export_metrics(&self, snapshot: &MetricSnapshot) -> Result<(), ExportError> {
        let _ = snapshot;
        Err(ExportError::Unsupported {
            backend: self.name(),
            signal: Signal::Metrics.as_str(),
        })
    }

    /// Releases transport resources. Called once, after the last export.
    async fn shutdown(&self) {}
}

/// Builds the adapter for one backend kind.
///
/// # Errors
///
/// Returns an error if the resolved endpoint or headers cannot be used by
/// the transport.
pub fn build_exporter(
    kind: BackendKind,
    config: &TelemetryConfig,
    resource: Arc<Resource>,
) -> Result<Arc<dyn Exporter>, ConfigurationError> {
    let exporter: Arc<dyn Exporter> = match kind {
        BackendKind::OtlpHttp => Arc::new(OtlpHttpExporter::new(config, resource)?),
        BackendKind::OtlpGrpc => Arc::new(OtlpGrpcExporter::new(config, resource)?),
        BackendKind::VendorTrace => Arc::new(ZipkinExporter::new(config, resource)?),
        BackendKind::PrometheusPull => Arc::new(PrometheusExporter::new()),
    };
    Ok(exporter)
}

/// Builds a `reqwest` header map from configured `key=value` pairs.
pub(crate) fn header_map(
    headers: &[(String, String)],
) -> Result<reqwest::header::HeaderMap, ConfigurationError> {
    headers
        .iter()
        .map(|(key, value)| {
            let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ConfigurationError::InvalidHeader(key.clone()))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|_| ConfigurationError::InvalidHeader(format!("{key}={value}")))?;
            Ok((name, value))
        })
        .collect()
}

/// Maps a `reqwest` failure to an export error.
pub(crate) fn transport_error(err: &reqwest::Error, timeout: std::time::Duration) -> ExportError {
    if err.is_timeout() {
        ExportError::Timeout(timeout)
    } else {
        ExportError::Transport(err.to_string())
    }
}

/// Maps a non-success HTTP status to an export error.
pub(crate) fn status_error(status: reqwest::StatusCode, message: String) -> ExportError {
    ExportError::Rejected {
        status: status.as_u16(),
        message,
        retryable: matches!(status.as_u16(), 408 | 429 | 502 | 503 | 504),
    }
}
