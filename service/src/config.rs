//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{Context as _, Result};
use reqwest::Url;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration.
///
/// Configuration values can be set via environment variables:
/// - `SERVICE_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `SERVICE_PORT`: The port to listen on (default: 5000)
/// - `DOWNSTREAM_URL`: Service called by `/call_downstream` (default: `http://localhost:5001/`)
/// - `SERVICE_MAX_WORK_MS`: Upper bound of the simulated work delay (default: 1000)
///
/// Telemetry is configured separately through the `OTEL_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// The service called by `/call_downstream`.
    pub downstream_url: Url,
    /// Upper bound of the random delay handlers sleep to simulate work.
    pub max_work_delay: Duration,
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `SERVICE_PORT` is set but cannot be parsed as a valid port number
    /// - `DOWNSTREAM_URL` is set but is not a valid URL
    /// - `SERVICE_MAX_WORK_MS` is set but is not a number
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let host = lookup("SERVICE_HOST").unwrap_or(defaults.host);
        let port = lookup("SERVICE_PORT")
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("SERVICE_PORT must be a port number")?
            .unwrap_or(defaults.port);
        let downstream_url = lookup("DOWNSTREAM_URL")
            .map(|u| Url::parse(&u))
            .transpose()
            .context("DOWNSTREAM_URL must be an absolute URL")?
            .unwrap_or(defaults.downstream_url);
        let max_work_delay = lookup("SERVICE_MAX_WORK_MS")
            .map(|ms| ms.parse::<u64>().map(Duration::from_millis))
            .transpose()
            .context("SERVICE_MAX_WORK_MS must be a number of milliseconds")?
            .unwrap_or(defaults.max_work_delay);

        Ok(Self {
            host,
            port,
            downstream_url,
            max_work_delay,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port do not form a valid socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            downstream_url: Url::parse("http://localhost:5001/")
                .expect("Default downstream URL is valid"),
            max_work_delay: Duration::from_millis(1000),
        }
    }
}
