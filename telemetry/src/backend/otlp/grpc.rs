//! OTLP over gRPC.
//!
//! Channels are created lazily on first export, inside the runtime that
//! drives the export, and dropped after a transport failure so the next
//! attempt reconnects.

use super::convert;
use super::proto::collector::logs::v1::ExportLogsServiceResponse;
use super::proto::collector::metrics::v1::ExportMetricsServiceResponse;
use super::proto::collector::trace::v1::ExportTraceServiceResponse;
use crate::backend::{header_map, Exporter, Signal};
use crate::config::{BackendKind, TelemetryConfig};
use crate::error::{ConfigurationError, ExportError};
use crate::models::{LogRecord, MetricSnapshot, SpanData};
use crate::resource::Resource;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::MetadataMap;
use tonic::transport::{Channel, Endpoint};
use tonic::Code;

const TRACES_PATH: &str = "/opentelemetry.proto.collector.trace.v1.TraceService/Export";
const LOGS_PATH: &str = "/opentelemetry.proto.collector.logs.v1.LogsService/Export";
const METRICS_PATH: &str = "/opentelemetry.proto.collector.metrics.v1.MetricsService/Export";

/// One collector service endpoint and its (possibly not yet opened) channel.
#[derive(Debug)]
struct Target {
    endpoint: Endpoint,
    channel: Mutex<Option<Channel>>,
}

impl Target {
    fn new(config: &TelemetryConfig, signal: Signal) -> Result<Self, ConfigurationError> {
        let url = config
            .endpoint_for(BackendKind::OtlpGrpc, signal)
            .ok_or(ConfigurationError::MissingOption("OTEL_EXPORTER_OTLP_ENDPOINT"))?;
        let endpoint = Endpoint::from_shared(url.to_string())
            .map_err(|e| ConfigurationError::InvalidEndpoint {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })?
            .connect_timeout(config.export_timeout)
            .timeout(config.export_timeout);
        Ok(Self {
            endpoint,
            channel: Mutex::new(None),
        })
    }

    async fn channel(&self) -> Channel {
        let mut guard = self.channel.lock().await;
        guard
            .get_or_insert_with(|| self.endpoint.connect_lazy())
            .clone()
    }

    async fn reset(&self) {
        self.channel.lock().await.take();
    }
}

/// Exports every signal to an OTLP/gRPC receiver.
#[derive(Debug)]
pub struct OtlpGrpcExporter {
    traces: Target,
    logs: Target,
    metrics: Target,
    metadata: MetadataMap,
    resource: Arc<Resource>,
    timeout: Duration,
}

impl OtlpGrpcExporter {
    /// Creates an exporter from the pipeline configuration.
    ///
    /// No connection is attempted until the first export.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid URI or the configured
    /// headers are not valid metadata.
    pub fn new(
        config: &TelemetryConfig,
        resource: Arc<Resource>,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            traces: Target::new(config, Signal::Traces)?,
            logs: Target::new(config, Signal::Logs)?,
            metrics: Target::new(config, Signal::Metrics)?,
            metadata: MetadataMap::from_headers(header_map(&config.headers)?),
            resource,
            timeout: config.export_timeout,
        })
    }

    async fn unary<Req, Resp>(
        &self,
        target: &Target,
        path: &'static str,
        message: Req,
    ) -> Result<(), ExportError>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = tonic::client::Grpc::new(target.channel().await);
        if let Err(e) = grpc.ready().await {
            target.reset().await;
            return Err(ExportError::Transport(e.to_string()));
        }

        let mut request = tonic::Request::new(message);
        *request.metadata_mut() = self.metadata.clone();
        request.set_timeout(self.timeout);

        let codec = tonic_prost::ProstCodec::<Req, Resp>::default();
        match grpc
            .unary(request, PathAndQuery::from_static(path), codec)
            .await
        {
            Ok(_) => Ok(()),
            Err(status) => {
                if status.code() == Code::Unavailable {
                    target.reset().await;
                }
                Err(self.status_error(&status))
            }
        }
    }

    fn status_error(&self, status: &tonic::Status) -> ExportError {
        let code = status.code();
        if code == Code::DeadlineExceeded {
            return ExportError::Timeout(self.timeout);
        }
        ExportError::Rejected {
            status: u16::try_from(code as i32).unwrap_or(u16::MAX),
            message: status.message().to_string(),
            retryable: matches!(
                code,
                Code::Unavailable | Code::ResourceExhausted | Code::Aborted
            ),
        }
    }
}

#[async_trait]
impl Exporter for OtlpGrpcExporter {
    fn name(&self) -> &'static str {
        BackendKind::OtlpGrpc.as_str()
    }

    async fn export_spans(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        let request = convert::spans_request(&self.resource, batch);
        self.unary::<_, ExportTraceServiceResponse>(&self.traces, TRACES_PATH, request)
            .await
    }

    async fn export_logs(&self, batch: &[LogRecord]) -> Result<(), ExportError> {
        let request = convert::logs_request(&self.resource, batch);
        self.unary::<_, ExportLogsServiceResponse>(&self.logs, LOGS_PATH, request)
            .await
    }

    async fn export_metrics(&self, snapshot: &MetricSnapshot) -> Result<(), ExportError> {
        let request = convert::metrics_request(&self.resource, snapshot);
        self.unary::<_, ExportMetricsServiceResponse>(&self.metrics, METRICS_PATH, request)
            .await
    }

    async fn shutdown(&self) {
        for target in [&self.traces, &self.logs, &self.metrics] {
            target.reset().await;
        }
    }
}
