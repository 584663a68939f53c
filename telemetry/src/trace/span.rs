//! Open span handles.

use super::Context;
use crate::error::DoubleEndWarning;
use crate::export::BatchSender;
use crate::models::{SpanContext, SpanData, SpanEvent, SpanId, SpanKind, SpanStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Status message of a span closed because its handle was dropped while open.
pub const DROPPED_SPAN_MESSAGE: &str = "span dropped before end";

/// Mutable state of a span that has not ended yet.
#[derive(Debug)]
struct OpenSpan {
    parent_span_id: Option<SpanId>,
    kind: SpanKind,
    start_time: DateTime<Utc>,
    status: SpanStatus,
    status_message: Option<String>,
    attributes: HashMap<String, serde_json::Value>,
    events: Vec<SpanEvent>,
}

fn to_value(value: impl Serialize) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// A started span.
///
/// Becomes the current span of its [`Context`] on start and stops being
/// current when it ends. Ending hands the finished span to the batch
/// exporter; a handle dropped without being ended is closed with an error
/// status so no span stays open forever.
pub struct SpanHandle {
    span: SpanContext,
    name: String,
    cx: Context,
    sink: Option<BatchSender<SpanData>>,
    state: Mutex<Option<OpenSpan>>,
}

impl fmt::Debug for SpanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanHandle")
            .field("name", &self.name)
            .field("span", &self.span)
            .field("ended", &self.is_ended())
            .finish_non_exhaustive()
    }
}

impl SpanHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn start(
        name: String,
        kind: SpanKind,
        span: SpanContext,
        parent_span_id: Option<SpanId>,
        attributes: HashMap<String, serde_json::Value>,
        cx: Context,
        sink: Option<BatchSender<SpanData>>,
    ) -> Self {
        cx.push(span);
        Self {
            span,
            name,
            cx,
            sink,
            state: Mutex::new(Some(OpenSpan {
                parent_span_id,
                kind,
                start_time: Utc::now(),
                status: SpanStatus::Ok,
                status_message: None,
                attributes,
                events: Vec::new(),
            })),
        }
    }

    fn with_open(&self, f: impl FnOnce(&mut OpenSpan)) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(open) = state.as_mut() {
            f(open);
        }
    }

    /// Returns the span's identity.
    #[must_use]
    pub fn context(&self) -> SpanContext {
        self.span
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once the span has ended.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Sets an attribute. Ignored after the span has ended.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Serialize) {
        let value = to_value(value);
        self.with_open(|open| {
            open.attributes.insert(key.into(), value);
        });
    }

    /// Adds a timestamped event.
    pub fn add_event(
        &self,
        name: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) {
        let event = SpanEvent {
            name: name.into(),
            timestamp: Utc::now(),
            attributes,
        };
        self.with_open(|open| open.events.push(event));
    }

    /// Sets the status reported when the span ends.
    pub fn set_status(&self, status: SpanStatus, message: Option<String>) {
        self.with_open(|open| {
            open.status = status;
            open.status_message = message;
        });
    }

    /// Marks the span as failed and records the error as an event.
    pub fn record_error(&self, error: &dyn fmt::Display) {
        let message = error.to_string();
        self.add_event(
            "exception",
            HashMap::from([(
                "exception.message".to_string(),
                serde_json::Value::String(message.clone()),
            )]),
        );
        self.set_status(SpanStatus::Error, Some(message));
    }

    /// Ends the span with the status set so far.
    ///
    /// Ending twice is a no-op that returns (and logs) a warning.
    pub fn end(&self) -> Option<DoubleEndWarning> {
        self.finish(None)
    }

    /// Ends the span with an explicit status.
    pub fn end_with_status(&self, status: SpanStatus) -> Option<DoubleEndWarning> {
        self.finish(Some((status, None)))
    }

    fn finish(&self, status: Option<(SpanStatus, Option<String>)>) -> Option<DoubleEndWarning> {
        let taken = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut open) = taken else {
            let warning = DoubleEndWarning {
                name: self.name.clone(),
                span_id: self.span.span_id,
            };
            tracing::warn!(span = %self.name, span_id = %self.span.span_id, "{warning}");
            return Some(warning);
        };

        if let Some((status, message)) = status {
            open.status = status;
            if message.is_some() {
                open.status_message = message;
            }
        }

        self.cx.remove(self.span.span_id);
        let end_time = Utc::now().max(open.start_time);
        let data = SpanData {
            trace_id: self.span.trace_id,
            span_id: self.span.span_id,
            parent_span_id: open.parent_span_id,
            name: self.name.clone(),
            kind: open.kind,
            status: open.status,
            status_message: open.status_message,
            start_time: open.start_time,
            end_time,
            attributes: open.attributes,
            events: open.events,
        };
        if let Some(sink) = &self.sink {
            sink.send(data);
        }
        None
    }
}

impl Drop for SpanHandle {
    fn drop(&mut self) {
        if !self.is_ended() {
            tracing::warn!(
                span = %self.name,
                span_id = %self.span.span_id,
                "Span dropped before end, closing with error status"
            );
            let _ = self.finish(Some((
                SpanStatus::Error,
                Some(DROPPED_SPAN_MESSAGE.to_string()),
            )));
        }
    }
}
