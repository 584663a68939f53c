//! OTLP over HTTP with protobuf payloads.

use super::convert;
use crate::backend::{header_map, status_error, transport_error, Exporter, Signal};
use crate::config::{BackendKind, TelemetryConfig};
use crate::error::{ConfigurationError, ExportError};
use crate::models::{LogRecord, MetricSnapshot, SpanData};
use crate::resource::Resource;
use async_trait::async_trait;
use prost::Message;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const PROTOBUF: &str = "application/x-protobuf";

/// Exports every signal to an OTLP/HTTP receiver.
#[derive(Debug)]
pub struct OtlpHttpExporter {
    client: reqwest::Client,
    traces_url: Url,
    logs_url: Url,
    metrics_url: Url,
    resource: Arc<Resource>,
    timeout: Duration,
}

impl OtlpHttpExporter {
    /// Creates an exporter from the pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured headers are not valid HTTP headers.
    pub fn new(
        config: &TelemetryConfig,
        resource: Arc<Resource>,
    ) -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder()
            .timeout(config.export_timeout)
            .default_headers(header_map(&config.headers)?)
            .build()
            .map_err(|e| ConfigurationError::InvalidValue {
                option: "OTEL_EXPORTER_OTLP_HEADERS",
                value: e.to_string(),
            })?;

        let url = |signal| {
            config
                .endpoint_for(BackendKind::OtlpHttp, signal)
                .ok_or(ConfigurationError::MissingOption("OTEL_EXPORTER_OTLP_ENDPOINT"))
        };

        Ok(Self {
            client,
            traces_url: url(Signal::Traces)?,
            logs_url: url(Signal::Logs)?,
            metrics_url: url(Signal::Metrics)?,
            resource,
            timeout: config.export_timeout,
        })
    }

    /// Returns the URL the given signal is posted to.
    #[must_use]
    pub fn url(&self, signal: Signal) -> &Url {
        match signal {
            Signal::Traces => &self.traces_url,
            Signal::Logs => &self.logs_url,
            Signal::Metrics => &self.metrics_url,
        }
    }

    async fn post(&self, signal: Signal, body: Vec<u8>) -> Result<(), ExportError> {
        let response = self
            .client
            .post(self.url(signal).clone())
            .header(CONTENT_TYPE, PROTOBUF)
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(status_error(status, message))
    }
}

#[async_trait]
impl Exporter for OtlpHttpExporter {
    fn name(&self) -> &'static str {
        BackendKind::OtlpHttp.as_str()
    }

    async fn export_spans(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        let body = convert::spans_request(&self.resource, batch).encode_to_vec();
        self.post(Signal::Traces, body).await
    }

    async fn export_logs(&self, batch: &[LogRecord]) -> Result<(), ExportError> {
        let body = convert::logs_request(&self.resource, batch).encode_to_vec();
        self.post(Signal::Logs, body).await
    }

    async fn export_metrics(&self, snapshot: &MetricSnapshot) -> Result<(), ExportError> {
        let body = convert::metrics_request(&self.resource, snapshot).encode_to_vec();
        self.post(Signal::Metrics, body).await
    }
}
