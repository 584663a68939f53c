//! Startup from environment-style configuration.

use std::collections::HashMap;
use telemetry::config::{BackendKind, OverflowPolicy, TelemetryConfig};
use telemetry::error::ConfigurationError;
use telemetry::Telemetry;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_unknown_backend_fails_before_startup() {
    let err = TelemetryConfig::from_lookup(lookup(&[("OTEL_BACKEND", "carrier-pigeon")]))
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::UnknownBackend(ref kind) if kind == "carrier-pigeon"
    ));
}

#[test]
fn test_malformed_endpoint_fails_before_startup() {
    let err = TelemetryConfig::from_lookup(lookup(&[
        ("OTEL_BACKEND", "otlp-http"),
        ("OTEL_EXPORTER_OTLP_ENDPOINT", "not a url"),
    ]))
    .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidEndpoint { .. }));
}

#[tokio::test]
async fn test_mixed_backends_from_environment() {
    let config = TelemetryConfig::from_lookup(lookup(&[
        ("OTEL_BACKEND", "tempo"),
        ("OTEL_METRICS_BACKEND", "prometheus"),
        ("OTEL_SERVICE_NAME", "checkout"),
        ("OTEL_RESOURCE_ATTRIBUTES", "deployment.environment=test,team=payments"),
        ("OTEL_EXPORTER_OTLP_HEADERS", "authorization=Bearer abc"),
        ("OTEL_BSP_MAX_EXPORT_BATCH_SIZE", "64"),
        ("OTEL_BSP_MAX_QUEUE_SIZE", "256"),
        ("OTEL_BSP_OVERFLOW_POLICY", "drop-oldest"),
    ]))
    .unwrap();

    assert_eq!(config.backend, BackendKind::OtlpHttp);
    assert_eq!(config.metrics_backend, Some(BackendKind::PrometheusPull));
    assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);

    let telemetry = Telemetry::init(config).unwrap();
    assert_eq!(telemetry.resource().service_name(), "checkout");
    assert_eq!(telemetry.resource().get("team"), Some("payments"));
    assert!(telemetry.tracer().is_enabled());
    assert!(telemetry.logger().is_enabled());
    assert!(telemetry.scrape().is_some());
}

#[test]
fn test_vendor_trace_carries_only_spans() {
    assert!(BackendKind::VendorTrace.supports(telemetry::backend::Signal::Traces));
    assert!(!BackendKind::VendorTrace.supports(telemetry::backend::Signal::Logs));
    assert!(!BackendKind::PrometheusPull.supports(telemetry::backend::Signal::Traces));
}
