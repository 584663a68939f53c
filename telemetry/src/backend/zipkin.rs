//! Vendor trace export: Zipkin v2 JSON spans.
//!
//! Accepted by Zipkin and by Jaeger's Zipkin-compatible collector. Only spans
//! are carried; logs and metrics fall back to the trait defaults and are
//! reported as unsupported.

use crate::backend::{header_map, status_error, transport_error, Exporter, Signal};
use crate::config::{BackendKind, TelemetryConfig};
use crate::error::{ConfigurationError, ExportError};
use crate::models::{SpanData, SpanKind, SpanStatus};
use crate::resource::Resource;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A span in Zipkin v2 format.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ZipkinSpan {
    trace_id: String,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    timestamp: i64,
    duration: i64,
    local_endpoint: LocalEndpoint,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    tags: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<Annotation>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct LocalEndpoint {
    service_name: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct Annotation {
    timestamp: i64,
    value: String,
}

fn tag_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ZipkinSpan {
    /// Converts a finished span, stamping it with the resource's service name.
    #[must_use]
    pub fn from_span(span: &SpanData, resource: &Resource) -> Self {
        let kind = match span.kind {
            SpanKind::Internal => None,
            SpanKind::Server => Some("SERVER"),
            SpanKind::Client => Some("CLIENT"),
            SpanKind::Producer => Some("PRODUCER"),
            SpanKind::Consumer => Some("CONSUMER"),
        };

        let mut tags: BTreeMap<String, String> = span
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), tag_value(v)))
            .collect();
        if span.status == SpanStatus::Error {
            tags.insert(
                "error".to_string(),
                span.status_message.clone().unwrap_or_else(|| "true".to_string()),
            );
        }

        Self {
            trace_id: span.trace_id.to_string(),
            id: span.span_id.to_string(),
            parent_id: span.parent_span_id.map(|id| id.to_string()),
            name: span.name.clone(),
            kind,
            timestamp: span.start_time.timestamp_micros(),
            duration: span.duration().num_microseconds().unwrap_or(0).max(1),
            local_endpoint: LocalEndpoint {
                service_name: resource.service_name().to_string(),
            },
            tags,
            annotations: span
                .events
                .iter()
                .map(|event| Annotation {
                    timestamp: event.timestamp.timestamp_micros(),
                    value: event.name.clone(),
                })
                .collect(),
        }
    }
}

/// Exports spans to a Zipkin v2 `/api/v2/spans` endpoint.
#[derive(Debug)]
pub struct ZipkinExporter {
    client: reqwest::Client,
    url: Url,
    resource: Arc<Resource>,
    timeout: Duration,
}

impl ZipkinExporter {
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
        let url = config
            .endpoint_for(BackendKind::VendorTrace, Signal::Traces)
            .ok_or(ConfigurationError::MissingOption("OTEL_EXPORTER_OTLP_ENDPOINT"))?;

        Ok(Self {
            client,
            url,
            resource,
            timeout: config.export_timeout,
        })
    }

    /// Returns the URL spans are posted to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Exporter for ZipkinExporter {
    fn name(&self) -> &'static str {
        BackendKind::VendorTrace.as_str()
    }

    async fn export_spans(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        let spans: Vec<ZipkinSpan> = batch
            .iter()
            .map(|span| ZipkinSpan::from_span(span, &self.resource))
            .collect();

        let response = self
            .client
            .post(self.url.clone())
            .json(&spans)
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
