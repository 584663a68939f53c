//! Pipeline configuration.
//!
//! Handles loading configuration from environment variables with sensible
//! defaults. Everything is validated before the pipeline starts: a bad
//! configuration fails startup instead of producing a silently unobservable
//! process.
//!
//! Recognized variables:
//! - `OTEL_BACKEND`: backend kind (required)
//! - `OTEL_METRICS_BACKEND`: backend kind for metrics only
//! - `OTEL_SERVICE_NAME`, `OTEL_RESOURCE_ATTRIBUTES`: resource identity
//! - `OTEL_EXPORTER_OTLP_ENDPOINT` and `OTEL_EXPORTER_OTLP_{TRACES,LOGS,METRICS}_ENDPOINT`
//! - `OTEL_EXPORTER_OTLP_HEADERS`: `key=value` pairs sent with every export
//! - `OTEL_BSP_MAX_EXPORT_BATCH_SIZE`, `OTEL_BSP_MAX_QUEUE_SIZE`,
//!   `OTEL_BSP_SCHEDULE_DELAY`, `OTEL_BSP_OVERFLOW_POLICY`
//! - `OTEL_EXPORTER_OTLP_TIMEOUT`, `OTEL_EXPORT_RETRY_ATTEMPTS`
//! - `OTEL_METRIC_EXPORT_INTERVAL`, `OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE`

mod backend;

pub use backend::BackendKind;

use crate::backend::Signal;
use crate::error::ConfigurationError;
use crate::models::Temporality;
use crate::resource::{parse_key_value_list, Resource, DEFAULT_SERVICE_NAME};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError};

/// What happens when a record arrives at a full queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Refuse the incoming record.
    #[default]
    DropNewest,
    /// Evict the oldest queued record to make room.
    DropOldest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropNewest => write!(f, "drop-newest"),
            Self::DropOldest => write!(f, "drop-oldest"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop-newest" | "reject" => Ok(Self::DropNewest),
            "drop-oldest" | "evict" => Ok(Self::DropOldest),
            _ => Err(ConfigurationError::InvalidValue {
                option: "OTEL_BSP_OVERFLOW_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

/// Telemetry pipeline configuration.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_batch_fits_queue"))]
pub struct TelemetryConfig {
    /// Backend for every signal.
    pub backend: BackendKind,

    /// Backend override for metrics.
    pub metrics_backend: Option<BackendKind>,

    /// Name reported as `service.name`.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Extra resource attributes.
    pub resource_attributes: Vec<(String, String)>,

    /// Base endpoint; signal paths are appended for HTTP backends.
    pub endpoint: Option<Url>,

    /// Full traces endpoint, used verbatim.
    pub traces_endpoint: Option<Url>,

    /// Full logs endpoint, used verbatim.
    pub logs_endpoint: Option<Url>,

    /// Full metrics endpoint, used verbatim.
    pub metrics_endpoint: Option<Url>,

    /// Headers sent with every export request (e.g. authorization).
    pub headers: Vec<(String, String)>,

    /// Maximum records per export; also the queue length that triggers a flush.
    #[validate(range(min = 1, message = "Batch size must be at least 1"))]
    pub batch_size: usize,

    /// Capacity of each per-signal queue.
    #[validate(range(min = 1, message = "Queue size must be at least 1"))]
    pub queue_size: usize,

    /// Time between flushes when the size trigger is not reached.
    #[validate(custom(function = "non_zero_duration"))]
    pub flush_interval: Duration,

    /// Per-attempt export timeout.
    #[validate(custom(function = "non_zero_duration"))]
    pub export_timeout: Duration,

    /// Retries after the first failed attempt.
    #[validate(range(max = 100, message = "Retry attempts cannot exceed 100"))]
    pub retry_attempts: u32,

    /// Behavior when a queue is full.
    pub overflow_policy: OverflowPolicy,

    /// Push-mode metric collection interval.
    #[validate(custom(function = "non_zero_duration"))]
    pub metric_interval: Duration,

    /// Temporality of pushed sums and histograms.
    pub temporality: Temporality,
}

fn non_zero_duration(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::new("zero_duration"));
    }
    Ok(())
}

fn validate_batch_fits_queue(config: &TelemetryConfig) -> Result<(), ValidationError> {
    if config.batch_size > config.queue_size {
        return Err(ValidationError::new("batch_size_exceeds_queue_size"));
    }
    Ok(())
}

impl TelemetryConfig {
    /// Creates a configuration with defaults for the given backend.
    #[must_use]
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            metrics_backend: None,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            resource_attributes: Vec::new(),
            endpoint: None,
            traces_endpoint: None,
            logs_endpoint: None,
            metrics_endpoint: None,
            headers: Vec::new(),
            batch_size: 512,
            queue_size: 2048,
            flush_interval: Duration::from_secs(5),
            export_timeout: Duration::from_secs(10),
            retry_attempts: 5,
            overflow_policy: OverflowPolicy::default(),
            metric_interval: Duration::from_secs(5),
            temporality: Temporality::default(),
        }
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Sets the base endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the batch size and queue capacity.
    #[must_use]
    pub fn with_batching(mut self, batch_size: usize, queue_size: usize) -> Self {
        self.batch_size = batch_size;
        self.queue_size = queue_size;
        self
    }

    /// Sets the flush interval.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `OTEL_BACKEND` is missing or unknown, or any other
    /// recognized variable is set to a value that cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`TelemetryConfig::from_env`].
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigurationError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend: BackendKind = get("OTEL_BACKEND")
            .ok_or(ConfigurationError::MissingOption("OTEL_BACKEND"))?
            .parse()?;
        let mut config = Self::new(backend);

        config.metrics_backend = get("OTEL_METRICS_BACKEND")
            .map(|v| v.parse())
            .transpose()?;
        if let Some(name) = get("OTEL_SERVICE_NAME") {
            config.service_name = name;
        }
        if let Some(list) = get("OTEL_RESOURCE_ATTRIBUTES") {
            config.resource_attributes = parse_key_value_list(&list, "OTEL_RESOURCE_ATTRIBUTES")?;
        }

        config.endpoint = get("OTEL_EXPORTER_OTLP_ENDPOINT")
            .map(|v| parse_endpoint(&v))
            .transpose()?;
        config.traces_endpoint = get("OTEL_EXPORTER_OTLP_TRACES_ENDPOINT")
            .map(|v| parse_endpoint(&v))
            .transpose()?;
        config.logs_endpoint = get("OTEL_EXPORTER_OTLP_LOGS_ENDPOINT")
            .map(|v| parse_endpoint(&v))
            .transpose()?;
        config.metrics_endpoint = get("OTEL_EXPORTER_OTLP_METRICS_ENDPOINT")
            .map(|v| parse_endpoint(&v))
            .transpose()?;

        if let Some(list) = get("OTEL_EXPORTER_OTLP_HEADERS") {
            config.headers = parse_headers(&list)?;
        }

        if let Some(v) = get("OTEL_BSP_MAX_EXPORT_BATCH_SIZE") {
            config.batch_size = parse_number(&v, "OTEL_BSP_MAX_EXPORT_BATCH_SIZE")?;
        }
        if let Some(v) = get("OTEL_BSP_MAX_QUEUE_SIZE") {
            config.queue_size = parse_number(&v, "OTEL_BSP_MAX_QUEUE_SIZE")?;
        }
        if let Some(v) = get("OTEL_BSP_SCHEDULE_DELAY") {
            config.flush_interval = parse_millis(&v, "OTEL_BSP_SCHEDULE_DELAY")?;
        }
        if let Some(v) = get("OTEL_BSP_OVERFLOW_POLICY") {
            config.overflow_policy = v.parse()?;
        }
        if let Some(v) = get("OTEL_EXPORTER_OTLP_TIMEOUT") {
            config.export_timeout = parse_millis(&v, "OTEL_EXPORTER_OTLP_TIMEOUT")?;
        }
        if let Some(v) = get("OTEL_EXPORT_RETRY_ATTEMPTS") {
            config.retry_attempts = parse_number(&v, "OTEL_EXPORT_RETRY_ATTEMPTS")?;
        }
        if let Some(v) = get("OTEL_METRIC_EXPORT_INTERVAL") {
            config.metric_interval = parse_millis(&v, "OTEL_METRIC_EXPORT_INTERVAL")?;
        }
        if let Some(v) = get("OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE") {
            config.temporality = match v.to_ascii_lowercase().as_str() {
                "cumulative" => Temporality::Cumulative,
                "delta" => Temporality::Delta,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        option: "OTEL_EXPORTER_OTLP_METRICS_TEMPORALITY_PREFERENCE",
                        value: v,
                    })
                }
            };
        }

        config.validate_config()?;
        Ok(config)
    }

    /// Validates field bounds, endpoints and headers.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate_config(&self) -> Result<(), ConfigurationError> {
        self.validate()?;
        for url in [
            &self.endpoint,
            &self.traces_endpoint,
            &self.logs_endpoint,
            &self.metrics_endpoint,
        ]
        .into_iter()
        .flatten()
        {
            check_scheme(url)?;
        }
        for (key, value) in &self.headers {
            reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|_| ConfigurationError::InvalidHeader(key.clone()))?;
            reqwest::header::HeaderValue::from_str(value)
                .map_err(|_| ConfigurationError::InvalidHeader(format!("{key}={value}")))?;
        }
        Ok(())
    }

    /// Returns the backend that receives the given signal.
    #[must_use]
    pub fn backend_for(&self, signal: Signal) -> BackendKind {
        match (signal, self.metrics_backend) {
            (Signal::Metrics, Some(kind)) => kind,
            _ => self.backend,
        }
    }

    /// Builds the resource descriptor.
    #[must_use]
    pub fn resource(&self) -> Resource {
        self.resource_attributes
            .iter()
            .fold(Resource::new(&self.service_name), |resource, (k, v)| {
                resource.with_attribute(k, v)
            })
    }

    /// Resolves the URL a backend sends the given signal to.
    ///
    /// Per-signal endpoints are used verbatim. Otherwise the base endpoint (or
    /// the backend's default) is used, with the signal path appended for
    /// HTTP-based backends. A base endpoint that already ends in an OTLP signal
    /// path is reduced to its root first.
    ///
    /// Returns `None` for backends that are not reached over the network.
    #[must_use]
    pub fn endpoint_for(&self, kind: BackendKind, signal: Signal) -> Option<Url> {
        let explicit = match signal {
            Signal::Traces => &self.traces_endpoint,
            Signal::Logs => &self.logs_endpoint,
            Signal::Metrics => &self.metrics_endpoint,
        };
        if let Some(url) = explicit {
            return Some(url.clone());
        }

        let mut url = match &self.endpoint {
            Some(url) => url.clone(),
            None => Url::parse(kind.default_endpoint()?).ok()?,
        };
        let root = ["/v1/traces", "/v1/logs", "/v1/metrics", "/api/v2/spans"]
            .iter()
            .fold(url.path().trim_end_matches('/'), |path, suffix| {
                path.strip_suffix(suffix).unwrap_or(path)
            })
            .to_string();

        match kind {
            BackendKind::OtlpHttp => url.set_path(&format!("{root}{}", signal.otlp_path())),
            BackendKind::VendorTrace => url.set_path(&format!("{root}/api/v2/spans")),
            BackendKind::OtlpGrpc => url.set_path(&root),
            BackendKind::PrometheusPull => return None,
        }
        Some(url)
    }
}

fn parse_endpoint(value: &str) -> Result<Url, ConfigurationError> {
    let url = Url::parse(value).map_err(|e| ConfigurationError::InvalidEndpoint {
        endpoint: value.to_string(),
        reason: e.to_string(),
    })?;
    check_scheme(&url)?;
    Ok(url)
}

fn check_scheme(url: &Url) -> Result<(), ConfigurationError> {
    match url.scheme() {
        "http" | "https" if url.host().is_some() => Ok(()),
        scheme => Err(ConfigurationError::InvalidEndpoint {
            endpoint: url.to_string(),
            reason: format!("unsupported scheme '{scheme}' or missing host"),
        }),
    }
}

fn parse_headers(list: &str) -> Result<Vec<(String, String)>, ConfigurationError> {
    parse_key_value_list(list, "OTEL_EXPORTER_OTLP_HEADERS")
        .map_err(|_| ConfigurationError::InvalidHeader(list.to_string()))
}

fn parse_number<T: FromStr>(value: &str, option: &'static str) -> Result<T, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        option,
        value: value.to_string(),
    })
}

fn parse_millis(value: &str, option: &'static str) -> Result<Duration, ConfigurationError> {
    parse_number::<u64>(value, option).map(Duration::from_millis)
}
