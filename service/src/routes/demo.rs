//! Demo endpoints.
//!
//! Each handler does a little simulated work under a child span of the
//! request span and emits correlated logs.

use crate::error::AppError;
use crate::middleware::instrument;
use crate::state::AppState;
use axum::{
    extract::State,
    middleware,
    routing::get,
    Extension, Router,
};
use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::Url;
use std::collections::HashMap;
use std::time::Duration;
use telemetry::models::{LabelSet, Severity, SpanKind};
use telemetry::propagation;
use telemetry::trace::Context;

/// Creates the instrumented demo routes.
///
/// # Routes
///
/// - `GET /` - Short simulated work
/// - `GET /work` - Longer simulated work, recorded in `work_duration_seconds`
/// - `GET /error` - Always fails with 500
/// - `GET /call_downstream` - Calls the downstream service, propagating the trace
pub fn demo_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/work", get(work))
        .route("/error", get(error))
        .route("/call_downstream", get(call_downstream))
        .route_layer(middleware::from_fn_with_state(state.clone(), instrument))
        .with_state(state)
}

/// Picks a random delay between `min_fraction` of `max` and `max`.
fn work_delay(max: Duration, min_fraction: f64) -> Duration {
    max.mul_f64(rand::thread_rng().gen_range(min_fraction..=1.0))
}

async fn index(State(state): State<AppState>, Extension(cx): Extension<Context>) -> String {
    let telemetry = state.telemetry();
    telemetry.logger().info("Index endpoint called", &cx);

    let span = telemetry.tracer().start_span("index-span", &cx);
    tokio::time::sleep(work_delay(state.config().max_work_delay / 2, 0.2)).await;
    span.end();

    format!("{} - Hello!", telemetry.resource().service_name())
}

async fn work(State(state): State<AppState>, Extension(cx): Extension<Context>) -> String {
    let telemetry = state.telemetry();
    let span = telemetry.tracer().start_span("work", &cx);

    let delay = work_delay(state.config().max_work_delay, 0.2);
    tokio::time::sleep(delay).await;
    let seconds = delay.as_secs_f64();
    span.set_attribute("work.seconds", seconds);
    state
        .instruments()
        .work_time
        .record(seconds, &LabelSet::from([("endpoint", "/work")]));
    telemetry.logger().emit(
        Severity::Info,
        "Work endpoint done",
        HashMap::from([("latency".to_string(), serde_json::json!(seconds))]),
        &cx,
    );
    span.end();

    format!("Work completed in {seconds:.2} seconds")
}

async fn error(
    State(state): State<AppState>,
    Extension(cx): Extension<Context>,
) -> Result<String, AppError> {
    let telemetry = state.telemetry();
    let span = telemetry.tracer().start_span("error-span", &cx);
    let failure = AppError::Simulated("/error");

    telemetry.logger().emit(
        Severity::Error,
        "Simulated error triggered",
        HashMap::from([("endpoint".to_string(), serde_json::json!("/error"))]),
        &cx,
    );
    span.record_error(&failure);
    span.end();

    Err(failure)
}

async fn call_downstream(
    State(state): State<AppState>,
    Extension(cx): Extension<Context>,
) -> Result<String, AppError> {
    let telemetry = state.telemetry();
    let url = state.config().downstream_url.clone();
    telemetry.logger().info("Calling downstream", &cx);

    let span = telemetry
        .tracer()
        .span_builder("call-downstream")
        .with_kind(SpanKind::Client)
        .with_attribute("http.url", url.as_str())
        .start(&cx);
    let mut headers = HeaderMap::new();
    propagation::inject(&cx, &mut headers);

    let result = fetch(state.http(), url, headers).await;
    match &result {
        Ok(body) => telemetry
            .logger()
            .info(format!("Response from downstream: {body}"), &cx),
        Err(e) => {
            span.record_error(e);
            telemetry
                .logger()
                .error(format!("Downstream call failed: {e}"), &cx);
        }
    }
    span.end();

    let body = result?;
    Ok(format!(
        "{} called downstream, response: {body}",
        telemetry.resource().service_name()
    ))
}

async fn fetch(
    client: &reqwest::Client,
    url: Url,
    headers: HeaderMap,
) -> Result<String, reqwest::Error> {
    client
        .get(url)
        .headers(headers)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}
