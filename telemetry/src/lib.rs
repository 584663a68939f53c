//! Telemetry pipeline.
//!
//! Records spans, metrics and log records from request-handling code and
//! exports them to a backend chosen at startup, without ever making the
//! caller wait on the network.
//!
//! # Modules
//!
//! - [`trace`] - Span recorder and per-request context
//! - [`logs`] - Log recorder
//! - [`metrics`] - Instrument registry and metric reader
//! - [`export`] - Bounded per-signal queues and the batch exporter
//! - [`backend`] - OTLP, Zipkin and Prometheus adapters
//! - [`config`] - Environment-driven configuration
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use telemetry::backend::InMemoryExporter;
//! use telemetry::config::{BackendKind, TelemetryConfig};
//! use telemetry::models::LabelSet;
//! use telemetry::trace::Context;
//! use telemetry::Telemetry;
//!
//! # tokio_test_main();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test_main() {
//! let exporter = Arc::new(InMemoryExporter::new());
//! let telemetry = Telemetry::builder(TelemetryConfig::new(BackendKind::OtlpHttp))
//!     .with_exporter(exporter.clone())
//!     .build()
//!     .unwrap();
//!
//! let cx = Context::new();
//! let span = telemetry.tracer().start_span("checkout", &cx);
//! telemetry.logger().info("Checkout started", &cx);
//! telemetry
//!     .meter()
//!     .counter("checkouts_total", "Completed checkouts", "1")
//!     .increment(&LabelSet::from([("region", "eu")]));
//! span.end();
//!
//! telemetry.shutdown().await;
//! assert_eq!(exporter.spans().len(), 1);
//! assert!(exporter.logs()[0].is_correlated());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod logs;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod propagation;
pub mod resource;
pub mod trace;

pub use config::{BackendKind, TelemetryConfig};
pub use error::{ConfigurationError, ConflictError, DoubleEndWarning, ExportError};
pub use logs::Logger;
pub use metrics::{InstrumentHandle, Meter};
pub use pipeline::{Telemetry, TelemetryBuilder, TelemetryStats};
pub use resource::Resource;
pub use trace::{Context, SpanHandle, Tracer};

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde_json;
