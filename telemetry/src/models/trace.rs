//! Trace and span data models.
//!
//! Defines identifiers, span context and the immutable [`SpanData`] handed to
//! the batch exporter once a span has ended.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// A 128-bit trace identifier shared by every span of one logical operation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId([u8; 16]);

/// A 64-bit span identifier, unique per span.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId([u8; 8]);

macro_rules! impl_id {
    ($ty:ident, $len:literal) => {
        impl $ty {
            /// The invalid (all-zero) identifier.
            pub const INVALID: Self = Self([0; $len]);

            /// Generates a new random, non-zero identifier.
            #[must_use]
            pub fn random() -> Self {
                let mut rng = rand::thread_rng();
                let mut bytes = [0u8; $len];
                loop {
                    rng.fill_bytes(&mut bytes);
                    if bytes != [0; $len] {
                        return Self(bytes);
                    }
                }
            }

            /// Creates an identifier from raw bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            /// Returns the raw bytes of the identifier.
            #[must_use]
            pub const fn to_bytes(self) -> [u8; $len] {
                self.0
            }

            /// Parses a lowercase or uppercase hex string of the exact length.
            ///
            /// Returns `None` for malformed or all-zero input.
            #[must_use]
            pub fn from_hex(s: &str) -> Option<Self> {
                let mut bytes = [0u8; $len];
                hex::decode_to_slice(s, &mut bytes).ok()?;
                let id = Self(bytes);
                id.is_valid().then_some(id)
            }

            /// Returns true unless the identifier is all zeros.
            #[must_use]
            pub fn is_valid(&self) -> bool {
                self.0 != [0; $len]
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({self})", stringify!($ty))
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }
    };
}

impl_id!(TraceId, 16);
impl_id!(SpanId, 8);

/// The identity of a span, as seen by its children and by correlated logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SpanContext {
    /// The trace this span belongs to.
    pub trace_id: TraceId,
    /// The span itself.
    pub span_id: SpanId,
    /// Whether the span came from another process.
    pub is_remote: bool,
}

impl SpanContext {
    /// Creates a local span context.
    #[must_use]
    pub fn new(trace_id: TraceId, span_id: SpanId) -> Self {
        Self {
            trace_id,
            span_id,
            is_remote: false,
        }
    }

    /// Creates a span context received from another process.
    #[must_use]
    pub fn remote(trace_id: TraceId, span_id: SpanId) -> Self {
        Self {
            trace_id,
            span_id,
            is_remote: true,
        }
    }
}

/// Status of a finished span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    /// The span completed without error.
    #[default]
    Ok,
    /// The span encountered an error.
    Error,
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Kind of span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    /// Default span kind (internal operation).
    #[default]
    Internal,
    /// The span represents a server handling a request.
    Server,
    /// The span represents a client making a request.
    Client,
    /// The span represents a producer sending a message.
    Producer,
    /// The span represents a consumer receiving a message.
    Consumer,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::Server => write!(f, "server"),
            Self::Client => write!(f, "client"),
            Self::Producer => write!(f, "producer"),
            Self::Consumer => write!(f, "consumer"),
        }
    }
}

/// An event within a span.
#[derive(Debug, Clone, Serialize)]
pub struct SpanEvent {
    /// The name of the event.
    pub name: String,
    /// Timestamp when the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Additional attributes for the event.
    pub attributes: HashMap<String, serde_json::Value>,
}

/// A finished span.
///
/// Produced exactly once when a span ends and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct SpanData {
    /// Identifier of the trace this span belongs to.
    pub trace_id: TraceId,

    /// Identifier of this span.
    pub span_id: SpanId,

    /// The parent span ID (None for root spans).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,

    /// The name/operation of this span.
    pub name: String,

    /// The kind of span.
    pub kind: SpanKind,

    /// The status of the span.
    pub status: SpanStatus,

    /// Description attached to an error status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,

    /// Timestamp when the span started.
    pub start_time: DateTime<Utc>,

    /// Timestamp when the span ended. Never earlier than `start_time`.
    pub end_time: DateTime<Utc>,

    /// Additional attributes for the span.
    pub attributes: HashMap<String, serde_json::Value>,

    /// Events that occurred during the span.
    pub events: Vec<SpanEvent>,
}

impl SpanData {
    /// Returns the duration of the span.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Returns true if this is a root span (no parent).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Returns the span's own context.
    #[must_use]
    pub fn context(&self) -> SpanContext {
        SpanContext::new(self.trace_id, self.span_id)
    }
}
