//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use crate::config::Config;
use std::sync::Arc;
use std::time::{Duration, Instant};
use telemetry::models::LabelSet;
use telemetry::{InstrumentHandle, Telemetry};

/// Instruments recorded by the request wrapper and handlers.
#[derive(Debug, Clone)]
pub struct Instruments {
    /// `http_requests_total`, labeled by endpoint, method and status.
    pub requests: InstrumentHandle,
    /// `http_request_duration_seconds`, labeled like `requests`.
    pub latency: InstrumentHandle,
    /// `http_requests_in_flight`.
    pub in_flight: InstrumentHandle,
    /// `work_duration_seconds`, the simulated work of `/work`.
    pub work_time: InstrumentHandle,
    /// `process_uptime_seconds`, observed at collection.
    pub uptime: InstrumentHandle,
    /// `process_memory_usage_mb`, resident memory observed at collection.
    pub memory: InstrumentHandle,
}

impl Instruments {
    fn register(telemetry: &Telemetry) -> Self {
        let meter = telemetry.meter();
        let started = Instant::now();
        Self {
            requests: meter.counter("http_requests_total", "Total HTTP requests", "1"),
            latency: meter.histogram(
                "http_request_duration_seconds",
                "HTTP request latency",
                "s",
            ),
            in_flight: meter.up_down_counter(
                "http_requests_in_flight",
                "Requests currently being handled",
                "1",
            ),
            work_time: meter.histogram("work_duration_seconds", "Work endpoint duration", "s"),
            uptime: meter.observable_gauge(
                "process_uptime_seconds",
                "Time since the service started",
                "s",
                move |observer| {
                    observer.observe(started.elapsed().as_secs_f64(), LabelSet::new());
                },
            ),
            memory: meter.observable_gauge(
                "process_memory_usage_mb",
                "Resident memory of the service process",
                "MB",
                |observer| {
                    if let Some(mb) = resident_memory_mb() {
                        observer.observe(mb, LabelSet::new());
                    }
                },
            ),
        }
    }
}

/// Resident set size of this process, from `/proc/self/status`.
#[cfg(target_os = "linux")]
fn resident_memory_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let kb: f64 = status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kb / 1024.0)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_mb() -> Option<f64> {
    None
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    telemetry: Arc<Telemetry>,
    instruments: Instruments,
    http: reqwest::Client,
    config: Arc<Config>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("telemetry", &self.telemetry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates the state and registers the service's instruments.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbound HTTP client cannot be built.
    pub fn new(config: Config, telemetry: Arc<Telemetry>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            instruments: Instruments::register(&telemetry),
            telemetry,
            http,
            config: Arc::new(config),
        })
    }

    /// Returns the telemetry pipeline.
    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Returns the registered instruments.
    #[must_use]
    pub fn instruments(&self) -> &Instruments {
        &self.instruments
    }

    /// Returns the outbound HTTP client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}
