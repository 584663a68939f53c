//! Error types for the telemetry pipeline.
//!
//! Only [`ConfigurationError`] is fatal, and only at startup. Everything else
//! is reported to the caller as a value (or logged) and never fails the
//! request that produced the telemetry.

use crate::metrics::{InstrumentHandle, InstrumentKind};
use crate::models::SpanId;
use thiserror::Error;

/// Errors raised while building the pipeline from configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The backend kind is not one of the supported kinds.
    #[error("Unknown backend kind: '{0}'")]
    UnknownBackend(String),

    /// A required option is not set.
    #[error("Missing required option: {0}")]
    MissingOption(&'static str),

    /// An option is set but cannot be parsed.
    #[error("Invalid value for {option}: '{value}'")]
    InvalidValue {
        /// The option name.
        option: &'static str,
        /// The rejected value.
        value: String,
    },

    /// An endpoint is not a valid absolute URL.
    #[error("Malformed endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A header entry is not a valid `key=value` pair.
    #[error("Malformed header: '{0}'")]
    InvalidHeader(String),

    /// Field-level validation failed.
    #[error("Validation failed: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    /// No tokio runtime was running and a dedicated one could not be started.
    #[error("Failed to start the export runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// An instrument was requested under a name already registered with a different kind.
///
/// The error carries the existing instrument so callers can keep recording
/// against it.
#[derive(Debug, Error)]
#[error("Instrument '{name}' is already registered as {existing}, requested {requested}")]
pub struct ConflictError {
    /// The instrument name.
    pub name: String,
    /// The kind of the instrument already in the registry.
    pub existing: InstrumentKind,
    /// The kind that was requested.
    pub requested: InstrumentKind,
    handle: InstrumentHandle,
}

impl ConflictError {
    pub(crate) fn new(requested: InstrumentKind, handle: InstrumentHandle) -> Self {
        Self {
            name: handle.name().to_string(),
            existing: handle.kind(),
            requested,
            handle,
        }
    }

    /// Returns the instrument that is already registered under this name.
    #[must_use]
    pub fn into_existing(self) -> InstrumentHandle {
        self.handle
    }
}

/// A backend failed to accept a batch.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The transport failed (connection refused, reset, DNS, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The export did not complete within the configured timeout.
    #[error("Export timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The backend answered but rejected the batch.
    #[error("Backend rejected batch with status {status}: {message}")]
    Rejected {
        /// Status code reported by the backend (HTTP status or gRPC code).
        status: u16,
        /// Message reported by the backend.
        message: String,
        /// Whether the same batch may succeed if sent again.
        retryable: bool,
    },

    /// The batch could not be encoded for the wire.
    #[error("Failed to encode batch: {0}")]
    Encode(String),

    /// The backend does not carry this signal.
    #[error("Backend '{backend}' does not support {signal}")]
    Unsupported {
        /// Backend name.
        backend: &'static str,
        /// Signal name.
        signal: &'static str,
    },
}

impl ExportError {
    /// Returns true if sending the same batch again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Rejected { retryable, .. } => *retryable,
            Self::Encode(_) | Self::Unsupported { .. } => false,
        }
    }
}

/// A span was ended more than once. The second end had no effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Span '{name}' ({span_id}) was already ended")]
pub struct DoubleEndWarning {
    /// The span name.
    pub name: String,
    /// The span id.
    pub span_id: SpanId,
}
