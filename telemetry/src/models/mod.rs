//! Data models for spans, log records and metric snapshots.

pub mod log;
pub mod metric;
pub mod trace;

pub use log::{LogBody, LogRecord, Severity};
pub use metric::{
    DataPoint, HistogramBucket, HistogramData, InstrumentKind, LabelSet, MetricData,
    MetricSnapshot, MetricValue, Temporality,
};
pub use trace::{SpanContext, SpanData, SpanEvent, SpanId, SpanKind, SpanStatus, TraceId};
