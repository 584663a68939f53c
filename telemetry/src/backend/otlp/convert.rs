//! Conversions from internal telemetry types to OTLP protobuf requests.

use super::proto::collector::logs::v1::ExportLogsServiceRequest;
use super::proto::collector::metrics::v1::ExportMetricsServiceRequest;
use super::proto::collector::trace::v1::ExportTraceServiceRequest;
use super::proto::common::v1::{
    any_value, AnyValue, ArrayValue, InstrumentationScope, KeyValue, KeyValueList,
};
use super::proto::{logs, metrics, resource, trace};
use super::SCOPE_NAME;
use crate::models::{
    DataPoint, InstrumentKind, LabelSet, LogBody, LogRecord, MetricData, MetricSnapshot,
    MetricValue, SpanData, SpanKind, SpanStatus, Temporality,
};
use crate::resource::Resource;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Converts a `DateTime<Utc>` to OTLP nanoseconds since epoch.
fn datetime_to_nanos(time: DateTime<Utc>) -> u64 {
    time.timestamp_nanos_opt()
        .and_then(|nanos| u64::try_from(nanos).ok())
        .unwrap_or(0)
}

/// Converts a `serde_json::Value` to OTLP `AnyValue`.
pub fn json_to_any_value(value: &serde_json::Value) -> AnyValue {
    use any_value::Value;

    let value = match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::BoolValue(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::IntValue(i)),
            None => n.as_f64().map(Value::DoubleValue),
        },
        serde_json::Value::String(s) => Some(Value::StringValue(s.clone())),
        serde_json::Value::Array(values) => Some(Value::ArrayValue(ArrayValue {
            values: values.iter().map(json_to_any_value).collect(),
        })),
        serde_json::Value::Object(map) => Some(Value::KvlistValue(KeyValueList {
            values: map
                .iter()
                .map(|(key, value)| KeyValue {
                    key: key.clone(),
                    value: Some(json_to_any_value(value)),
                })
                .collect(),
        })),
    };
    AnyValue { value }
}

fn string_value(value: &str) -> AnyValue {
    AnyValue {
        value: Some(any_value::Value::StringValue(value.to_string())),
    }
}

/// Converts an attribute map to OTLP key-values, sorted by key.
fn attributes_to_key_values(attributes: &HashMap<String, serde_json::Value>) -> Vec<KeyValue> {
    let mut pairs: Vec<_> = attributes.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(key, value)| KeyValue {
            key: key.clone(),
            value: Some(json_to_any_value(value)),
        })
        .collect()
}

fn labels_to_key_values(labels: &LabelSet) -> Vec<KeyValue> {
    labels
        .iter()
        .map(|(key, value)| KeyValue {
            key: key.to_string(),
            value: Some(string_value(value)),
        })
        .collect()
}

fn resource_to_proto(resource: &Resource) -> resource::v1::Resource {
    resource::v1::Resource {
        attributes: resource
            .iter()
            .map(|(key, value)| KeyValue {
                key: key.to_string(),
                value: Some(string_value(value)),
            })
            .collect(),
        dropped_attributes_count: 0,
    }
}

fn scope() -> InstrumentationScope {
    InstrumentationScope {
        name: SCOPE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ..Default::default()
    }
}

fn span_kind(kind: SpanKind) -> trace::v1::span::SpanKind {
    use trace::v1::span::SpanKind as Proto;
    match kind {
        SpanKind::Internal => Proto::Internal,
        SpanKind::Server => Proto::Server,
        SpanKind::Client => Proto::Client,
        SpanKind::Producer => Proto::Producer,
        SpanKind::Consumer => Proto::Consumer,
    }
}

fn span_to_proto(span: &SpanData) -> trace::v1::Span {
    use trace::v1::status::StatusCode;

    let code = match span.status {
        SpanStatus::Ok => StatusCode::Unset,
        SpanStatus::Error => StatusCode::Error,
    };
    trace::v1::Span {
        trace_id: span.trace_id.to_bytes().to_vec(),
        span_id: span.span_id.to_bytes().to_vec(),
        parent_span_id: span
            .parent_span_id
            .map(|id| id.to_bytes().to_vec())
            .unwrap_or_default(),
        name: span.name.clone(),
        kind: span_kind(span.kind) as i32,
        start_time_unix_nano: datetime_to_nanos(span.start_time),
        end_time_unix_nano: datetime_to_nanos(span.end_time),
        attributes: attributes_to_key_values(&span.attributes),
        events: span
            .events
            .iter()
            .map(|event| trace::v1::span::Event {
                time_unix_nano: datetime_to_nanos(event.timestamp),
                name: event.name.clone(),
                attributes: attributes_to_key_values(&event.attributes),
                dropped_attributes_count: 0,
            })
            .collect(),
        status: Some(trace::v1::Status {
            message: span.status_message.clone().unwrap_or_default(),
            code: code as i32,
        }),
        ..Default::default()
    }
}

/// Builds a trace export request for one batch.
#[must_use]
pub fn spans_request(resource: &Resource, batch: &[SpanData]) -> ExportTraceServiceRequest {
    ExportTraceServiceRequest {
        resource_spans: vec![trace::v1::ResourceSpans {
            resource: Some(resource_to_proto(resource)),
            scope_spans: vec![trace::v1::ScopeSpans {
                scope: Some(scope()),
                spans: batch.iter().map(span_to_proto).collect(),
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

fn log_to_proto(record: &LogRecord) -> logs::v1::LogRecord {
    let body = match &record.body {
        LogBody::Text(text) => string_value(text),
        LogBody::Structured(value) => json_to_any_value(value),
    };
    let time = datetime_to_nanos(record.timestamp);
    logs::v1::LogRecord {
        time_unix_nano: time,
        observed_time_unix_nano: time,
        severity_number: record.severity.number(),
        severity_text: record.severity.as_str().to_string(),
        body: Some(body),
        attributes: attributes_to_key_values(&record.attributes),
        trace_id: record
            .trace_id
            .map(|id| id.to_bytes().to_vec())
            .unwrap_or_default(),
        span_id: record
            .span_id
            .map(|id| id.to_bytes().to_vec())
            .unwrap_or_default(),
        ..Default::default()
    }
}

/// Builds a logs export request for one batch.
#[must_use]
pub fn logs_request(resource: &Resource, batch: &[LogRecord]) -> ExportLogsServiceRequest {
    ExportLogsServiceRequest {
        resource_logs: vec![logs::v1::ResourceLogs {
            resource: Some(resource_to_proto(resource)),
            scope_logs: vec![logs::v1::ScopeLogs {
                scope: Some(scope()),
                log_records: batch.iter().map(log_to_proto).collect(),
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}

fn temporality(temporality: Temporality) -> i32 {
    match temporality {
        Temporality::Cumulative => metrics::v1::AggregationTemporality::Cumulative as i32,
        Temporality::Delta => metrics::v1::AggregationTemporality::Delta as i32,
    }
}

fn number_point(point: &DataPoint, value: f64) -> metrics::v1::NumberDataPoint {
    metrics::v1::NumberDataPoint {
        attributes: labels_to_key_values(&point.labels),
        start_time_unix_nano: datetime_to_nanos(point.start_time),
        time_unix_nano: datetime_to_nanos(point.time),
        flags: 0,
        value: Some(metrics::v1::number_data_point::Value::AsDouble(value)),
    }
}

fn number_points(metric: &MetricData) -> Vec<metrics::v1::NumberDataPoint> {
    metric
        .points
        .iter()
        .filter_map(|point| point.value.as_simple().map(|v| number_point(point, v)))
        .collect()
}

fn metric_to_proto(metric: &MetricData) -> metrics::v1::Metric {
    use metrics::v1::metric::Data;

    let data = match metric.kind {
        InstrumentKind::Counter | InstrumentKind::UpDownCounter => Data::Sum(metrics::v1::Sum {
            data_points: number_points(metric),
            aggregation_temporality: temporality(metric.temporality),
            is_monotonic: metric.kind == InstrumentKind::Counter,
        }),
        InstrumentKind::ObservableGauge => Data::Gauge(metrics::v1::Gauge {
            data_points: number_points(metric),
        }),
        InstrumentKind::Histogram => Data::Histogram(metrics::v1::Histogram {
            data_points: metric
                .points
                .iter()
                .filter_map(|point| match &point.value {
                    MetricValue::Histogram(h) => Some(metrics::v1::HistogramDataPoint {
                        attributes: labels_to_key_values(&point.labels),
                        start_time_unix_nano: datetime_to_nanos(point.start_time),
                        time_unix_nano: datetime_to_nanos(point.time),
                        count: h.count,
                        sum: Some(h.sum),
                        bucket_counts: h.bucket_counts.clone(),
                        explicit_bounds: h.boundaries.clone(),
                        flags: 0,
                        min: h.min,
                        max: h.max,
                    }),
                    MetricValue::Simple(_) => None,
                })
                .collect(),
            aggregation_temporality: temporality(metric.temporality),
        }),
    };

    metrics::v1::Metric {
        name: metric.name.clone(),
        description: metric.description.clone(),
        unit: metric.unit.clone(),
        data: Some(data),
    }
}

/// Builds a metrics export request from one snapshot.
#[must_use]
pub fn metrics_request(
    resource: &Resource,
    snapshot: &MetricSnapshot,
) -> ExportMetricsServiceRequest {
    ExportMetricsServiceRequest {
        resource_metrics: vec![metrics::v1::ResourceMetrics {
            resource: Some(resource_to_proto(resource)),
            scope_metrics: vec![metrics::v1::ScopeMetrics {
                scope: Some(scope()),
                metrics: snapshot
                    .metrics
                    .iter()
                    .filter(|m| !m.points.is_empty())
                    .map(metric_to_proto)
                    .collect(),
                schema_url: String::new(),
            }],
            schema_url: String::new(),
        }],
    }
}
