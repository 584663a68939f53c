//! Per-request span context.

use crate::models::{SpanContext, SpanId};
use std::sync::{Arc, Mutex, PoisonError};

/// The "current span" of one logical unit of work.
///
/// A `Context` is created per request and passed explicitly to everything
/// that starts spans or emits logs on behalf of that request. Clones share
/// state, so a span started through one clone is current for all of them.
/// Work that runs concurrently within the request (spawned tasks, joined
/// futures) takes a [`Context::fork`] instead, so sibling spans all parent
/// to the span that was current at the fork and never nest under each other.
/// Separate requests use separate contexts and never see each other's spans.
#[derive(Debug, Clone, Default)]
pub struct Context {
    stack: Arc<Mutex<Vec<SpanContext>>>,
}

impl Context {
    /// Creates a context with no current span.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context whose current span lives in another process.
    ///
    /// Spans started in this context continue the remote trace.
    #[must_use]
    pub fn with_remote_parent(parent: SpanContext) -> Self {
        Self {
            stack: Arc::new(Mutex::new(vec![parent])),
        }
    }

    /// Starts an independent flow that continues from the current span.
    ///
    /// The fork's only entry is this context's current span. Spans started
    /// on the fork do not become current here, and the other way round.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            stack: Arc::new(Mutex::new(self.current().into_iter().collect())),
        }
    }

    /// Returns the current span, if any.
    #[must_use]
    pub fn current(&self) -> Option<SpanContext> {
        self.lock().last().copied()
    }

    /// Returns the number of open spans, a remote parent included.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn push(&self, span: SpanContext) {
        self.lock().push(span);
    }

    /// Detaches a span. Whatever was current before it becomes current again.
    pub(crate) fn remove(&self, span_id: SpanId) {
        let mut stack = self.lock();
        if let Some(index) = stack.iter().rposition(|s| s.span_id == span_id) {
            stack.remove(index);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SpanContext>> {
        self.stack.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
