//! OpenTelemetry Protocol (OTLP) export.
//!
//! Both transports send the same protobuf requests, built by [`convert`]:
//! - [`OtlpHttpExporter`]: `application/x-protobuf` POSTs to `/v1/{signal}`
//! - [`OtlpGrpcExporter`]: unary calls to the collector services

pub mod convert;
mod grpc;
mod http;
pub mod proto;

pub use grpc::OtlpGrpcExporter;
pub use http::OtlpHttpExporter;

/// Instrumentation scope reported with every OTLP request.
pub(crate) const SCOPE_NAME: &str = "telemetry";
