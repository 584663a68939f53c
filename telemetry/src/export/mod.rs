//! Batch exporter.
//!
//! Decouples the backend transport from request handling. Producers push
//! finished spans and log records into a bounded per-signal queue through a
//! [`BatchSender`]; a [`BatchWorker`] task drains the queue when it reaches
//! the batch size or when the flush interval elapses, whichever comes first.
//!
//! Producers never wait on the backend. When the queue is full the
//! configured [`OverflowPolicy`] decides which record is dropped, and every
//! drop is counted in [`SignalStats`].

mod retry;
mod stats;

pub use retry::RetryPolicy;
pub use stats::{SignalStats, SignalStatsSnapshot};

pub(crate) use retry::export_with_retry;

use crate::backend::{Exporter, Signal};
use crate::config::{OverflowPolicy, TelemetryConfig};
use crate::error::ExportError;
use crate::models::{LogRecord, SpanData};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::time::MissedTickBehavior;

/// Future returned by [`Exportable::export`].
pub type ExportFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ExportError>> + Send + 'a>>;

/// A record type the batch exporter can ship.
pub trait Exportable: Send + Sync + 'static {
    /// The signal this record belongs to.
    const SIGNAL: Signal;

    /// Hands one batch to the matching exporter method.
    fn export<'a>(exporter: &'a dyn Exporter, batch: &'a [Self]) -> ExportFuture<'a>
    where
        Self: Sized;
}

impl Exportable for SpanData {
    const SIGNAL: Signal = Signal::Traces;

    fn export<'a>(exporter: &'a dyn Exporter, batch: &'a [Self]) -> ExportFuture<'a> {
        exporter.export_spans(batch)
    }
}

impl Exportable for LogRecord {
    const SIGNAL: Signal = Signal::Logs;

    fn export<'a>(exporter: &'a dyn Exporter, batch: &'a [Self]) -> ExportFuture<'a> {
        exporter.export_logs(batch)
    }
}

/// Batching parameters for one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum records per export; also the size trigger.
    pub batch_size: usize,
    /// Queue capacity.
    pub queue_size: usize,
    /// Time trigger.
    pub flush_interval: Duration,
    /// What to drop when the queue is full.
    pub overflow_policy: OverflowPolicy,
    /// Retry policy for failed exports.
    pub retry: RetryPolicy,
}

impl BatchConfig {
    /// Builds batching parameters from the pipeline configuration.
    #[must_use]
    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            queue_size: config.queue_size,
            flush_interval: config.flush_interval,
            overflow_policy: config.overflow_policy,
            retry: RetryPolicy::from_config(config),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 512,
            queue_size: 2048,
            flush_interval: Duration::from_secs(5),
            overflow_policy: OverflowPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

enum Control {
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    size_trigger: Notify,
    closed: AtomicBool,
    stats: Arc<SignalStats>,
    config: BatchConfig,
}

impl<T> Shared<T> {
    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a bounded queue for one signal.
///
/// The sender side is cheap to clone and is handed to recorders; the worker
/// must be spawned on a runtime with [`BatchWorker::run`].
#[must_use]
pub fn channel<T: Exportable>(
    config: BatchConfig,
    exporter: Arc<dyn Exporter>,
) -> (BatchSender<T>, BatchWorker<T>) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(config.queue_size.min(4096))),
        size_trigger: Notify::new(),
        closed: AtomicBool::new(false),
        stats: Arc::new(SignalStats::default()),
        config,
    });
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    (
        BatchSender {
            shared: shared.clone(),
            control: control_tx,
        },
        BatchWorker {
            shared,
            exporter,
            control: control_rx,
        },
    )
}

/// Producer side of a batch queue.
pub struct BatchSender<T> {
    shared: Arc<Shared<T>>,
    control: mpsc::UnboundedSender<Control>,
}

impl<T> Clone for BatchSender<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            control: self.control.clone(),
        }
    }
}

impl<T> std::fmt::Debug for BatchSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchSender")
            .field("queued", &self.shared.lock().len())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<T: Exportable> BatchSender<T> {
    /// Enqueues a record. Never blocks on the backend.
    ///
    /// At a full queue, `DropNewest` refuses the record and `DropOldest`
    /// evicts the head of the queue; either way one drop is counted.
    pub fn send(&self, record: T) {
        if self.shared.closed.load(Ordering::Acquire) {
            tracing::debug!(signal = %T::SIGNAL, "Record submitted after shutdown was dropped");
            return;
        }

        let config = &self.shared.config;
        let len = {
            let mut queue = self.shared.lock();
            if queue.len() >= config.queue_size {
                match config.overflow_policy {
                    OverflowPolicy::DropNewest => {
                        drop(queue);
                        self.overflowed();
                        return;
                    }
                    OverflowPolicy::DropOldest => {
                        queue.pop_front();
                        self.overflowed();
                    }
                }
            }
            queue.push_back(record);
            queue.len()
        };

        if len >= config.batch_size {
            self.shared.size_trigger.notify_one();
        }
    }

    fn overflowed(&self) {
        let dropped = self.shared.stats.record_overflow();
        if dropped.is_power_of_two() {
            tracing::warn!(
                signal = %T::SIGNAL,
                dropped,
                policy = %self.shared.config.overflow_policy,
                "Export queue full, dropping records"
            );
        }
    }

    /// Returns the number of queued records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the counters for this signal.
    #[must_use]
    pub fn stats(&self) -> SignalStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Exports everything queued so far and waits for it to finish.
    ///
    /// Returns immediately if the worker is not running.
    pub async fn force_flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.control.send(Control::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Stops accepting records, exports what is queued and stops the worker.
    pub async fn shutdown(&self) {
        self.shared.closed.store(true, Ordering::Release);
        let (done, wait) = oneshot::channel();
        if self.control.send(Control::Shutdown(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

/// Consumer side of a batch queue: the background flush task.
pub struct BatchWorker<T> {
    shared: Arc<Shared<T>>,
    exporter: Arc<dyn Exporter>,
    control: mpsc::UnboundedReceiver<Control>,
}

impl<T: Exportable> BatchWorker<T> {
    /// Runs the flush loop until shutdown is requested or every sender is gone.
    pub async fn run(mut self) {
        let config = self.shared.config;
        let mut ticker = tokio::time::interval(config.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        tracing::debug!(
            signal = %T::SIGNAL,
            exporter = self.exporter.name(),
            "Batch worker started"
        );
        loop {
            tokio::select! {
                _ = ticker.tick() => self.drain().await,
                () = self.shared.size_trigger.notified() => {
                    self.drain().await;
                    ticker.reset();
                }
                control = self.control.recv() => match control {
                    Some(Control::Flush(done)) => {
                        self.drain().await;
                        let _ = done.send(());
                    }
                    Some(Control::Shutdown(done)) => {
                        self.shared.closed.store(true, Ordering::Release);
                        self.drain().await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        self.drain().await;
                        break;
                    }
                },
            }
        }
        tracing::debug!(signal = %T::SIGNAL, "Batch worker stopped");
    }

    /// Exports the records queued when the drain started, batch by batch.
    async fn drain(&self) {
        let mut pending = self.shared.lock().len();
        while pending > 0 {
            let batch: Vec<T> = {
                let mut queue = self.shared.lock();
                let take = queue.len().min(pending).min(self.shared.config.batch_size);
                queue.drain(..take).collect()
            };
            if batch.is_empty() {
                break;
            }
            pending = pending.saturating_sub(batch.len());
            self.export(batch).await;
        }
    }

    async fn export(&self, batch: Vec<T>) {
        let exporter: &dyn Exporter = self.exporter.as_ref();
        let records: &[T] = &batch;
        let retry = &self.shared.config.retry;
        let outcome = export_with_retry(retry, move || T::export(exporter, records)).await;

        match outcome.result {
            Ok(()) => self
                .shared
                .stats
                .record_export(batch.len(), outcome.retries),
            Err(error) => {
                self.shared
                    .stats
                    .record_failure(batch.len(), outcome.retries);
                tracing::warn!(
                    signal = %T::SIGNAL,
                    exporter = self.exporter.name(),
                    dropped = batch.len(),
                    retries = outcome.retries,
                    %error,
                    "Dropping batch after failed export"
                );
            }
        }
    }
}
