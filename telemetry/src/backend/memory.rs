//! In-memory exporter for development and testing.

use crate::backend::Exporter;
use crate::error::ExportError;
use crate::models::{LogRecord, MetricSnapshot, SpanData};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// How exports to an [`InMemoryExporter`] fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    None,
    /// The next `n` attempts fail with a retryable error.
    Transient(usize),
    /// Every attempt fails with a non-retryable error.
    Permanent,
}

/// Records everything it is given.
///
/// Can be configured to be slow or to fail, to exercise the retry and
/// overflow paths of the batch exporter.
#[derive(Debug)]
pub struct InMemoryExporter {
    spans: RwLock<Vec<SpanData>>,
    logs: RwLock<Vec<LogRecord>>,
    snapshots: RwLock<Vec<MetricSnapshot>>,
    failure: RwLock<Failure>,
    delay: Option<Duration>,
    attempts: AtomicUsize,
    batches: AtomicUsize,
}

impl Default for InMemoryExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryExporter {
    /// Creates an exporter that accepts every export immediately.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spans: RwLock::new(Vec::new()),
            logs: RwLock::new(Vec::new()),
            snapshots: RwLock::new(Vec::new()),
            failure: RwLock::new(Failure::None),
            delay: None,
            attempts: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        }
    }

    /// Makes every export wait before completing.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes the next `attempts` exports fail with a retryable error.
    #[must_use]
    pub fn with_transient_failures(self, attempts: usize) -> Self {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) =
            Failure::Transient(attempts);
        self
    }

    /// Makes every export fail with a non-retryable error.
    #[must_use]
    pub fn with_permanent_failure(self) -> Self {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Failure::Permanent;
        self
    }

    /// Returns all exported spans, in export order.
    #[must_use]
    pub fn spans(&self) -> Vec<SpanData> {
        self.spans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns all exported log records, in export order.
    #[must_use]
    pub fn logs(&self) -> Vec<LogRecord> {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns all exported metric snapshots, in export order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<MetricSnapshot> {
        self.snapshots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of export attempts, failed ones included.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Returns the number of accepted exports.
    #[must_use]
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::Relaxed)
    }

    async fn attempt(&self) -> Result<(), ExportError> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut failure = self.failure.write().unwrap_or_else(PoisonError::into_inner);
        match *failure {
            Failure::None => {
                self.batches.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Failure::Transient(remaining) => {
                *failure = if remaining > 1 {
                    Failure::Transient(remaining - 1)
                } else {
                    Failure::None
                };
                Err(ExportError::Transport("connection refused".to_string()))
            }
            Failure::Permanent => Err(ExportError::Rejected {
                status: 400,
                message: "bad request".to_string(),
                retryable: false,
            }),
        }
    }
}

#[async_trait]
impl Exporter for InMemoryExporter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn export_spans(&self, batch: &[SpanData]) -> Result<(), ExportError> {
        self.attempt().await?;
        self.spans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(batch);
        Ok(())
    }

    async fn export_logs(&self, batch: &[LogRecord]) -> Result<(), ExportError> {
        self.attempt().await?;
        self.logs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(batch);
        Ok(())
    }

    async fn export_metrics(&self, snapshot: &MetricSnapshot) -> Result<(), ExportError> {
        self.attempt().await?;
        self.snapshots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot.clone());
        Ok(())
    }
}
