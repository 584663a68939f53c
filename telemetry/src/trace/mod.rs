//! Span recorder.
//!
//! [`Tracer::start_span`] allocates identifiers, makes the new span current
//! in the caller's [`Context`], and returns a [`SpanHandle`]. Ending the
//! handle restores the parent as current and hands the finished span to the
//! batch exporter. Nothing here waits on the backend.
//!
//! ```
//! use telemetry::trace::{Context, Tracer};
//!
//! let tracer = Tracer::noop();
//! let cx = Context::new();
//!
//! let outer = tracer.start_span("a", &cx);
//! let inner = tracer.start_span("b", &cx);
//! assert_eq!(inner.context().trace_id, outer.context().trace_id);
//!
//! inner.end();
//! assert_eq!(cx.current(), Some(outer.context()));
//! outer.end();
//! assert!(cx.current().is_none());
//! ```

mod context;
mod span;

pub use context::Context;
pub use span::{SpanHandle, DROPPED_SPAN_MESSAGE};

use crate::export::BatchSender;
use crate::models::{SpanContext, SpanData, SpanId, SpanKind, TraceId};
use serde::Serialize;
use std::collections::HashMap;

/// Starts spans and routes finished ones to the span queue.
///
/// Cheap to clone. A tracer without a queue still allocates identifiers so
/// log records stay correlated when the trace signal is disabled.
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    sink: Option<BatchSender<SpanData>>,
}

impl Tracer {
    /// Creates a tracer that queues finished spans on `sink`.
    #[must_use]
    pub fn new(sink: BatchSender<SpanData>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Creates a tracer that records nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self::default()
    }

    /// Returns true if finished spans are exported.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Starts an internal span under the current span of `cx`.
    #[must_use]
    pub fn start_span(&self, name: impl Into<String>, cx: &Context) -> SpanHandle {
        self.span_builder(name).start(cx)
    }

    /// Returns a builder for a span with a kind, attributes or an explicit parent.
    #[must_use]
    pub fn span_builder(&self, name: impl Into<String>) -> SpanBuilder {
        SpanBuilder {
            tracer: self.clone(),
            name: name.into(),
            kind: SpanKind::Internal,
            parent: None,
            attributes: HashMap::new(),
        }
    }
}

/// Span options applied at start.
#[derive(Debug)]
pub struct SpanBuilder {
    tracer: Tracer,
    name: String,
    kind: SpanKind,
    parent: Option<SpanContext>,
    attributes: HashMap<String, serde_json::Value>,
}

impl SpanBuilder {
    /// Sets the span kind.
    #[must_use]
    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Adds a start attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.attributes.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }

    /// Uses `parent` instead of the context's current span.
    #[must_use]
    pub fn with_parent(mut self, parent: SpanContext) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Starts the span and makes it current in `cx`.
    #[must_use]
    pub fn start(self, cx: &Context) -> SpanHandle {
        let parent = self.parent.or_else(|| cx.current());
        let trace_id = parent.map_or_else(TraceId::random, |p| p.trace_id);
        let span = SpanContext::new(trace_id, SpanId::random());

        SpanHandle::start(
            self.name,
            self.kind,
            span,
            parent.map(|p| p.span_id),
            self.attributes,
            cx.clone(),
            self.tracer.sink,
        )
    }
}
