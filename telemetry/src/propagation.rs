//! W3C trace-context propagation (`traceparent` header).

use crate::models::{SpanContext, SpanId, TraceId};
use crate::trace::Context;
use reqwest::header::{HeaderMap, HeaderValue};

/// Header carrying the caller's span.
pub const TRACEPARENT: &str = "traceparent";

const VERSION: &str = "00";
const SAMPLED: &str = "01";

/// Parses a `traceparent` value into a remote span context.
///
/// Returns `None` for malformed values, the reserved version `ff`, and
/// all-zero ids.
#[must_use]
pub fn parse_traceparent(value: &str) -> Option<SpanContext> {
    let mut parts = value.trim().split('-');
    let version = parts.next()?;
    let trace_id = parts.next()?;
    let span_id = parts.next()?;
    let flags = parts.next()?;

    if version.len() != 2 || !version.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if version.eq_ignore_ascii_case("ff") || (version == VERSION && parts.next().is_some()) {
        return None;
    }
    if flags.len() != 2 || !flags.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let trace_id = TraceId::from_hex(trace_id)?;
    let span_id = SpanId::from_hex(span_id)?;
    Some(SpanContext::remote(trace_id, span_id))
}

/// Formats a span as a `traceparent` value. Spans are always marked sampled.
#[must_use]
pub fn format_traceparent(span: &SpanContext) -> String {
    format!("{VERSION}-{}-{}-{SAMPLED}", span.trace_id, span.span_id)
}

/// Builds a request context that continues the trace in `headers`, if any.
#[must_use]
pub fn extract(headers: &HeaderMap) -> Context {
    headers
        .get(TRACEPARENT)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_traceparent)
        .map_or_else(Context::new, Context::with_remote_parent)
}

/// Writes the current span of `cx` into `headers`. Does nothing without one.
pub fn inject(cx: &Context, headers: &mut HeaderMap) {
    let Some(span) = cx.current() else {
        return;
    };
    if let Ok(value) = HeaderValue::from_str(&format_traceparent(&span)) {
        headers.insert(TRACEPARENT, value);
    }
}
