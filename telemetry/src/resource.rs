//! Resource descriptor: the static identity attached to all emitted telemetry.

use crate::error::ConfigurationError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Attribute key holding the service name.
pub const SERVICE_NAME: &str = "service.name";

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "unknown_service";

/// Immutable string attributes describing the emitting process.
///
/// Always contains [`SERVICE_NAME`]. Built once at startup and shared
/// read-only (behind an `Arc`) by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    attributes: BTreeMap<String, String>,
}

impl Resource {
    /// Creates a resource for the named service.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(SERVICE_NAME.to_string(), service_name.into());
        attributes.insert("telemetry.sdk.language".to_string(), "rust".to_string());
        attributes.insert(
            "telemetry.sdk.version".to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Self { attributes }
    }

    /// Adds an attribute. The service name cannot be replaced this way.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != SERVICE_NAME {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Adds attributes parsed from a `key=value,key=value` list.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry has no `=` or an empty key.
    pub fn with_attribute_list(mut self, list: &str) -> Result<Self, ConfigurationError> {
        for (key, value) in parse_key_value_list(list, "OTEL_RESOURCE_ATTRIBUTES")? {
            self = self.with_attribute(key, value);
        }
        Ok(self)
    }

    /// Returns the service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        self.attributes
            .get(SERVICE_NAME)
            .map_or(DEFAULT_SERVICE_NAME, String::as_str)
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Iterates all attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for Resource {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME)
    }
}

/// Parses a comma-separated `key=value` list, trimming whitespace around each part.
pub(crate) fn parse_key_value_list(
    list: &str,
    option: &'static str,
) -> Result<Vec<(String, String)>, ConfigurationError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, value) =
                entry
                    .split_once('=')
                    .ok_or_else(|| ConfigurationError::InvalidValue {
                        option,
                        value: entry.to_string(),
                    })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigurationError::InvalidValue {
                    option,
                    value: entry.to_string(),
                });
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}
