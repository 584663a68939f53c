//! Instrument registry and metric reader.
//!
//! The registry is a process-wide catalog of named instruments. Names are
//! unique: registering an existing name with the same kind returns the
//! existing instrument, with a different kind it fails with
//! [`ConflictError`].
//!
//! # Example
//!
//! ```
//! use telemetry::metrics::InstrumentRegistry;
//! use telemetry::models::{InstrumentKind, LabelSet, Temporality};
//!
//! let registry = InstrumentRegistry::new();
//! let requests = registry
//!     .register("requests_total", InstrumentKind::Counter, "Total requests", "1")
//!     .unwrap();
//! requests.record(1.0, &LabelSet::from([("endpoint", "/")]));
//!
//! let snapshot = registry.collect(Temporality::Cumulative);
//! assert_eq!(
//!     snapshot.value("requests_total", &LabelSet::from([("endpoint", "/")])),
//!     Some(1.0)
//! );
//! ```

mod instrument;
pub mod reader;

pub use crate::models::InstrumentKind;
pub use instrument::{
    GaugeCallback, GaugeObserver, InstrumentDescriptor, InstrumentHandle, DEFAULT_BOUNDARIES,
};
pub use reader::{MetricReader, ReaderStats};

use crate::error::ConflictError;
use crate::models::{MetricSnapshot, Temporality};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Catalog {
    by_name: HashMap<String, InstrumentHandle>,
    ordered: Vec<InstrumentHandle>,
}

/// Catalog of named instruments.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    catalog: RwLock<Catalog>,
}

impl InstrumentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instrument, or returns the one already registered under
    /// this name.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError`] if the name is registered with a different
    /// kind. The error carries the existing instrument.
    pub fn register(
        &self,
        name: &str,
        kind: InstrumentKind,
        description: &str,
        unit: &str,
    ) -> Result<InstrumentHandle, ConflictError> {
        self.register_descriptor(
            InstrumentDescriptor::new(name, kind)
                .with_description(description)
                .with_unit(unit),
        )
    }

    /// Registers an instrument from a full descriptor.
    ///
    /// # Errors
    ///
    /// See [`InstrumentRegistry::register`].
    pub fn register_descriptor(
        &self,
        descriptor: InstrumentDescriptor,
    ) -> Result<InstrumentHandle, ConflictError> {
        if let Some(existing) = self.get(&descriptor.name) {
            return check_kind(existing, descriptor.kind);
        }

        let mut catalog = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have registered the name between the two locks.
        if let Some(existing) = catalog.by_name.get(&descriptor.name) {
            return check_kind(existing.clone(), descriptor.kind);
        }

        tracing::debug!(
            instrument = %descriptor.name,
            kind = %descriptor.kind,
            "Registering instrument"
        );
        let handle = InstrumentHandle::new(descriptor);
        catalog
            .by_name
            .insert(handle.name().to_string(), handle.clone());
        catalog.ordered.push(handle.clone());
        Ok(handle)
    }

    /// Returns the instrument registered under a name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<InstrumentHandle> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .get(name)
            .cloned()
    }

    /// Returns the number of registered instruments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .len()
    }

    /// Returns true if no instrument is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collects a snapshot of every instrument, in registration order.
    ///
    /// Observable gauge callbacks run synchronously here. The registry lock
    /// is released before any series is read.
    #[must_use]
    pub fn collect(&self, temporality: Temporality) -> MetricSnapshot {
        let instruments = self
            .catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .clone();

        let collected_at = Utc::now();
        MetricSnapshot {
            collected_at,
            metrics: instruments
                .iter()
                .map(|instrument| instrument.collect(temporality, collected_at))
                .collect(),
        }
    }

    /// Puts the delta values of an undelivered snapshot back into their
    /// instruments, so they are reported by the next collection.
    pub(crate) fn restore(&self, snapshot: &MetricSnapshot) {
        for metric in &snapshot.metrics {
            if let Some(instrument) = self.get(&metric.name) {
                instrument.restore(metric);
            }
        }
    }
}

fn check_kind(
    existing: InstrumentHandle,
    requested: InstrumentKind,
) -> Result<InstrumentHandle, ConflictError> {
    if existing.kind() == requested {
        Ok(existing)
    } else {
        Err(ConflictError::new(requested, existing))
    }
}

/// Convenience front-end over an [`InstrumentRegistry`].
///
/// Kind conflicts are logged and the existing instrument is returned, so
/// application code never has to handle registration errors.
#[derive(Debug, Clone)]
pub struct Meter {
    registry: Arc<InstrumentRegistry>,
}

impl Meter {
    /// Creates a meter over a registry.
    #[must_use]
    pub fn new(registry: Arc<InstrumentRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<InstrumentRegistry> {
        &self.registry
    }

    fn get_or_reuse(&self, descriptor: InstrumentDescriptor) -> InstrumentHandle {
        self.registry
            .register_descriptor(descriptor)
            .unwrap_or_else(|conflict| {
                tracing::warn!(error = %conflict, "Reusing existing instrument");
                conflict.into_existing()
            })
    }

    /// Returns a monotonic counter.
    #[must_use]
    pub fn counter(&self, name: &str, description: &str, unit: &str) -> InstrumentHandle {
        self.get_or_reuse(
            InstrumentDescriptor::new(name, InstrumentKind::Counter)
                .with_description(description)
                .with_unit(unit),
        )
    }

    /// Returns an up-down counter.
    #[must_use]
    pub fn up_down_counter(&self, name: &str, description: &str, unit: &str) -> InstrumentHandle {
        self.get_or_reuse(
            InstrumentDescriptor::new(name, InstrumentKind::UpDownCounter)
                .with_description(description)
                .with_unit(unit),
        )
    }

    /// Returns a histogram with the default boundaries.
    #[must_use]
    pub fn histogram(&self, name: &str, description: &str, unit: &str) -> InstrumentHandle {
        self.get_or_reuse(
            InstrumentDescriptor::new(name, InstrumentKind::Histogram)
                .with_description(description)
                .with_unit(unit),
        )
    }

    /// Returns a histogram with explicit bucket boundaries.
    ///
    /// Boundaries only apply when the histogram is first registered.
    #[must_use]
    pub fn histogram_with_boundaries(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        boundaries: Vec<f64>,
    ) -> InstrumentHandle {
        self.get_or_reuse(
            InstrumentDescriptor::new(name, InstrumentKind::Histogram)
                .with_description(description)
                .with_unit(unit)
                .with_boundaries(boundaries),
        )
    }

    /// Returns an observable gauge reporting through `callback`.
    pub fn observable_gauge<F>(
        &self,
        name: &str,
        description: &str,
        unit: &str,
        callback: F,
    ) -> InstrumentHandle
    where
        F: Fn(&mut GaugeObserver) + Send + Sync + 'static,
    {
        let handle = self.get_or_reuse(
            InstrumentDescriptor::new(name, InstrumentKind::ObservableGauge)
                .with_description(description)
                .with_unit(unit),
        );
        handle.set_callback(callback);
        handle
    }
}
