//! Instrumented handler wrapper.
//!
//! Every application request gets its own telemetry
//! [`Context`](telemetry::trace::Context), continued
//! from an incoming `traceparent` header when there is one, and a server
//! span that is current for the whole request. Handlers pull the context
//! out of the request extensions to start child spans and emit correlated
//! logs. Request count, latency and in-flight gauges are recorded here so
//! handlers do not have to.

use crate::state::AppState;
use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use telemetry::models::{LabelSet, SpanKind, SpanStatus};
use telemetry::propagation;
use telemetry::InstrumentHandle;

/// Wraps one request in a server span and records request metrics.
pub async fn instrument(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_string(), |p| p.as_str().to_string());

    let cx = propagation::extract(req.headers());
    let span = state
        .telemetry()
        .tracer()
        .span_builder(format!("{method} {endpoint}"))
        .with_kind(SpanKind::Server)
        .with_attribute("http.method", &method)
        .with_attribute("http.route", &endpoint)
        .start(&cx);
    req.extensions_mut().insert(cx);

    let instruments = state.instruments();
    let in_flight = InFlight::enter(
        instruments.in_flight.clone(),
        LabelSet::from([("endpoint", endpoint.as_str())]),
    );

    let response = next.run(req).await;

    let status = response.status();
    span.set_attribute("http.status_code", status.as_u16());
    if status.is_server_error() {
        span.set_status(SpanStatus::Error, Some(status.to_string()));
    }
    let labels = LabelSet::from([
        ("endpoint", endpoint.as_str()),
        ("method", method.as_str()),
        ("status", status.as_str()),
    ]);
    instruments.requests.increment(&labels);
    instruments
        .latency
        .record(started.elapsed().as_secs_f64(), &labels);
    drop(in_flight);
    span.end();

    response
}

/// Counts one request in `http_requests_in_flight` until dropped.
///
/// Dropping covers cancelled requests too: when the client goes away the
/// request future is dropped before the handler returns.
struct InFlight {
    gauge: InstrumentHandle,
    labels: LabelSet,
}

impl InFlight {
    fn enter(gauge: InstrumentHandle, labels: LabelSet) -> Self {
        gauge.increment(&labels);
        Self { gauge, labels }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.gauge.decrement(&self.labels);
    }
}
