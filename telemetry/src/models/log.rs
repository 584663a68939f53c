//! Log record data model.

use super::trace::{SpanId, TraceId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Detailed debug information.
    Trace,
    /// Debug information.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Critical/fatal conditions.
    Fatal,
}

impl Severity {
    /// Returns the OTLP severity number (the first number of each range).
    #[must_use]
    pub fn number(self) -> i32 {
        match self {
            Self::Trace => 1,
            Self::Debug => 5,
            Self::Info => 9,
            Self::Warn => 13,
            Self::Error => 17,
            Self::Fatal => 21,
        }
    }

    /// Returns the upper-case severity text.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_lowercase())
    }
}

/// A log record body: either plain text or a structured value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogBody {
    /// Plain text.
    Text(String),
    /// A structured value (usually a JSON object).
    Structured(serde_json::Value),
}

impl From<&str> for LogBody {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for LogBody {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<serde_json::Value> for LogBody {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Structured(other),
        }
    }
}

/// A single log record. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// Severity level.
    pub severity: Severity,

    /// The log body.
    pub body: LogBody,

    /// Additional key-value attributes.
    pub attributes: HashMap<String, serde_json::Value>,

    /// Trace of the span open when the record was emitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,

    /// Span open when the record was emitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<SpanId>,
}

impl LogRecord {
    /// Creates an uncorrelated log record with the current timestamp.
    #[must_use]
    pub fn new(severity: Severity, body: impl Into<LogBody>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            body: body.into(),
            attributes: HashMap::new(),
            trace_id: None,
            span_id: None,
        }
    }

    /// Adds an attribute to the record.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.attributes.insert(
            key.into(),
            serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
        );
        self
    }

    /// Returns true if the record is correlated to a span.
    #[must_use]
    pub fn is_correlated(&self) -> bool {
        self.trace_id.is_some() && self.span_id.is_some()
    }
}
