//! Log recorder.

use crate::export::BatchSender;
use crate::models::{LogBody, LogRecord, Severity};
use crate::trace::Context;
use std::collections::HashMap;

/// Emits log records, correlated to the current span of the caller's context.
///
/// Records go through the same bounded queue machinery as spans, so `emit`
/// returns immediately even when the backend is unreachable.
#[derive(Debug, Clone, Default)]
pub struct Logger {
    sink: Option<BatchSender<LogRecord>>,
}

impl Logger {
    /// Creates a logger that queues records on `sink`.
    #[must_use]
    pub fn new(sink: BatchSender<LogRecord>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Creates a logger that discards everything.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Returns true if records are exported.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Emits one record.
    ///
    /// If a span is open in `cx`, the record carries its trace and span ids.
    pub fn emit(
        &self,
        severity: Severity,
        body: impl Into<LogBody>,
        attributes: HashMap<String, serde_json::Value>,
        cx: &Context,
    ) {
        let Some(sink) = &self.sink else {
            return;
        };
        let mut record = LogRecord::new(severity, body);
        record.attributes = attributes;
        sink.send(correlate(record, cx));
    }

    /// Emits an already-built record, correlating it if it is not yet.
    pub fn emit_record(&self, record: LogRecord, cx: &Context) {
        if let Some(sink) = &self.sink {
            sink.send(correlate(record, cx));
        }
    }

    /// Emits an `info` record without attributes.
    pub fn info(&self, body: impl Into<LogBody>, cx: &Context) {
        self.emit(Severity::Info, body, HashMap::new(), cx);
    }

    /// Emits a `warn` record without attributes.
    pub fn warn(&self, body: impl Into<LogBody>, cx: &Context) {
        self.emit(Severity::Warn, body, HashMap::new(), cx);
    }

    /// Emits an `error` record without attributes.
    pub fn error(&self, body: impl Into<LogBody>, cx: &Context) {
        self.emit(Severity::Error, body, HashMap::new(), cx);
    }
}

fn correlate(mut record: LogRecord, cx: &Context) -> LogRecord {
    if record.is_correlated() {
        return record;
    }
    if let Some(span) = cx.current() {
        record.trace_id = Some(span.trace_id);
        record.span_id = Some(span.span_id);
    }
    record
}
