//! Backend selection.

use crate::backend::Signal;
use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of backends the pipeline can export to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// OTLP protobuf over HTTP (Tempo, Dynatrace, any collector on :4318).
    OtlpHttp,
    /// OTLP over gRPC (any collector or agent on :4317).
    OtlpGrpc,
    /// Zipkin v2 JSON spans, as accepted by Jaeger and Zipkin collectors.
    VendorTrace,
    /// Prometheus text exposition served on scrape.
    PrometheusPull,
}

impl BackendKind {
    /// Returns the canonical configuration name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OtlpHttp => "otlp-http",
            Self::OtlpGrpc => "otlp-grpc",
            Self::VendorTrace => "vendor-trace",
            Self::PrometheusPull => "prometheus-pull",
        }
    }

    /// Returns true if this backend carries the given signal.
    #[must_use]
    pub fn supports(self, signal: Signal) -> bool {
        match self {
            Self::OtlpHttp | Self::OtlpGrpc => true,
            Self::VendorTrace => signal == Signal::Traces,
            Self::PrometheusPull => signal == Signal::Metrics,
        }
    }

    /// Returns the endpoint used when none is configured.
    #[must_use]
    pub fn default_endpoint(self) -> Option<&'static str> {
        match self {
            Self::OtlpHttp => Some("http://localhost:4318"),
            Self::OtlpGrpc => Some("http://localhost:4317"),
            Self::VendorTrace => Some("http://localhost:9411"),
            Self::PrometheusPull => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "otlp-http" | "otlp" | "tempo" | "dynatrace" => Ok(Self::OtlpHttp),
            "otlp-grpc" | "alloy" => Ok(Self::OtlpGrpc),
            "vendor-trace" | "jaeger" | "zipkin" => Ok(Self::VendorTrace),
            "prometheus-pull" | "prometheus" => Ok(Self::PrometheusPull),
            _ => Err(ConfigurationError::UnknownBackend(s.to_string())),
        }
    }
}
