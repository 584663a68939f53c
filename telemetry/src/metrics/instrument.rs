//! Instruments and their per-label-set series.

use crate::models::{
    DataPoint, HistogramData, InstrumentKind, LabelSet, MetricData, MetricValue, Temporality,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Default explicit bucket boundaries for histograms.
pub const DEFAULT_BOUNDARIES: [f64; 15] = [
    0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0, 250.0, 500.0, 750.0, 1000.0, 2500.0, 5000.0, 7500.0,
    10000.0,
];

/// Callback invoked at collection time to produce observable gauge values.
pub type GaugeCallback = Arc<dyn Fn(&mut GaugeObserver) + Send + Sync>;

/// Receives the values an observable gauge callback reports.
#[derive(Debug, Default)]
pub struct GaugeObserver {
    values: Vec<(LabelSet, f64)>,
}

impl GaugeObserver {
    /// Reports the current value for one label set.
    pub fn observe(&mut self, value: f64, labels: LabelSet) {
        if value.is_finite() {
            self.values.push((labels, value));
        }
    }
}

/// Describes an instrument to register.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentDescriptor {
    /// Unique instrument name.
    pub name: String,
    /// Instrument kind.
    pub kind: InstrumentKind,
    /// Human-readable description.
    pub description: String,
    /// Unit of recorded values.
    pub unit: String,
    /// Histogram bucket boundaries; `None` uses [`DEFAULT_BOUNDARIES`].
    pub boundaries: Option<Vec<f64>>,
}

impl InstrumentDescriptor {
    /// Creates a descriptor with an empty description and unit.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: InstrumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            unit: String::new(),
            boundaries: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Sets explicit histogram bucket boundaries.
    #[must_use]
    pub fn with_boundaries(mut self, boundaries: Vec<f64>) -> Self {
        self.boundaries = Some(boundaries);
        self
    }
}

/// An `f64` updated with compare-and-swap on its bit pattern.
#[derive(Debug, Default)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn add(&self, value: f64) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn take(&self) -> f64 {
        f64::from_bits(self.0.swap(0.0_f64.to_bits(), Ordering::AcqRel))
    }
}

#[derive(Debug)]
enum Accumulator {
    Sum(AtomicF64),
    Histogram(Mutex<HistogramData>),
}

/// State of one label set under one instrument.
#[derive(Debug)]
struct Series {
    start_time: Mutex<DateTime<Utc>>,
    accumulator: Accumulator,
}

fn empty_histogram(boundaries: &[f64]) -> HistogramData {
    HistogramData {
        boundaries: boundaries.to_vec(),
        bucket_counts: vec![0; boundaries.len() + 1],
        sum: 0.0,
        count: 0,
        min: None,
        max: None,
    }
}

impl Series {
    fn new(kind: InstrumentKind, boundaries: &[f64]) -> Self {
        let accumulator = match kind {
            InstrumentKind::Histogram => {
                Accumulator::Histogram(Mutex::new(empty_histogram(boundaries)))
            }
            _ => Accumulator::Sum(AtomicF64::default()),
        };
        Self {
            start_time: Mutex::new(Utc::now()),
            accumulator,
        }
    }

    fn record(&self, value: f64) {
        match &self.accumulator {
            Accumulator::Sum(sum) => sum.add(value),
            Accumulator::Histogram(histogram) => {
                let mut h = histogram.lock().unwrap_or_else(PoisonError::into_inner);
                let bucket = h.boundaries.partition_point(|bound| *bound < value);
                h.bucket_counts[bucket] += 1;
                h.sum += value;
                h.count += 1;
                h.min = Some(h.min.map_or(value, |min| min.min(value)));
                h.max = Some(h.max.map_or(value, |max| max.max(value)));
            }
        }
    }

    /// Adds a delta that was collected but never delivered back into the
    /// series, so the next collection reports it.
    fn merge(&self, point: &DataPoint) {
        {
            let mut start_time = self.start_time.lock().unwrap_or_else(PoisonError::into_inner);
            if point.start_time < *start_time {
                *start_time = point.start_time;
            }
        }
        match (&self.accumulator, &point.value) {
            (Accumulator::Sum(sum), MetricValue::Simple(value)) => sum.add(*value),
            (Accumulator::Histogram(histogram), MetricValue::Histogram(delta)) => {
                let mut h = histogram.lock().unwrap_or_else(PoisonError::into_inner);
                if h.boundaries != delta.boundaries {
                    return;
                }
                for (count, extra) in h.bucket_counts.iter_mut().zip(&delta.bucket_counts) {
                    *count += extra;
                }
                h.sum += delta.sum;
                h.count += delta.count;
                h.min = merge_extreme(h.min, delta.min, f64::min);
                h.max = merge_extreme(h.max, delta.max, f64::max);
            }
            _ => {}
        }
    }

    /// Reads the series; with delta temporality the accumulator is reset in
    /// the same step so no value is reported twice.
    fn collect(
        &self,
        labels: &LabelSet,
        temporality: Temporality,
        now: DateTime<Utc>,
    ) -> DataPoint {
        let mut start_time = self.start_time.lock().unwrap_or_else(PoisonError::into_inner);
        let value = match (&self.accumulator, temporality) {
            (Accumulator::Sum(sum), Temporality::Cumulative) => MetricValue::Simple(sum.load()),
            (Accumulator::Sum(sum), Temporality::Delta) => MetricValue::Simple(sum.take()),
            (Accumulator::Histogram(histogram), temporality) => {
                let mut h = histogram.lock().unwrap_or_else(PoisonError::into_inner);
                match temporality {
                    Temporality::Cumulative => MetricValue::Histogram(h.clone()),
                    Temporality::Delta => {
                        let fresh = empty_histogram(&h.boundaries);
                        MetricValue::Histogram(std::mem::replace(&mut *h, fresh))
                    }
                }
            }
        };
        let point = DataPoint {
            labels: labels.clone(),
            start_time: *start_time,
            time: now,
            value,
        };
        if temporality == Temporality::Delta {
            *start_time = now;
        }
        point
    }
}

fn merge_extreme(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

/// A registered metric instrument.
struct Instrument {
    descriptor: InstrumentDescriptor,
    boundaries: Vec<f64>,
    series: DashMap<LabelSet, Arc<Series>>,
    callback: RwLock<Option<GaugeCallback>>,
}

/// A cheap, cloneable handle to a registered instrument.
///
/// All recording goes through the handle; the registry is not touched on the
/// hot path.
#[derive(Clone)]
pub struct InstrumentHandle {
    inner: Arc<Instrument>,
}

impl fmt::Debug for InstrumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentHandle")
            .field("name", &self.inner.descriptor.name)
            .field("kind", &self.inner.descriptor.kind)
            .field("series", &self.inner.series.len())
            .finish_non_exhaustive()
    }
}

impl InstrumentHandle {
    pub(crate) fn new(descriptor: InstrumentDescriptor) -> Self {
        let mut boundaries = descriptor
            .boundaries
            .clone()
            .unwrap_or_else(|| DEFAULT_BOUNDARIES.to_vec());
        boundaries.retain(|b| b.is_finite());
        boundaries.sort_by(f64::total_cmp);
        boundaries.dedup();

        Self {
            inner: Arc::new(Instrument {
                descriptor,
                boundaries,
                series: DashMap::new(),
                callback: RwLock::new(None),
            }),
        }
    }

    /// Returns the instrument name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.descriptor.name
    }

    /// Returns the instrument kind.
    #[must_use]
    pub fn kind(&self) -> InstrumentKind {
        self.inner.descriptor.kind
    }

    /// Returns the instrument description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.inner.descriptor.description
    }

    /// Returns the instrument unit.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.inner.descriptor.unit
    }

    /// Returns the histogram bucket boundaries in effect.
    #[must_use]
    pub fn boundaries(&self) -> &[f64] {
        &self.inner.boundaries
    }

    /// Returns true if both handles refer to the same instrument.
    #[must_use]
    pub fn same_instrument(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Records a value against a label set.
    ///
    /// Counters add the value, up-down counters add it (possibly negative),
    /// histograms record one observation. Values that make no sense for the
    /// instrument (negative counter increments, non-finite numbers, any
    /// value on an observable gauge) are ignored with a warning.
    pub fn record(&self, value: f64, labels: &LabelSet) {
        let kind = self.kind();
        if kind == InstrumentKind::ObservableGauge {
            tracing::warn!(instrument = self.name(), "record() called on an observable gauge");
            return;
        }
        if !value.is_finite() || (kind == InstrumentKind::Counter && value < 0.0) {
            tracing::warn!(instrument = self.name(), value, "Ignoring invalid measurement");
            return;
        }

        self.series(labels).record(value);
    }

    fn series(&self, labels: &LabelSet) -> Arc<Series> {
        if let Some(series) = self.inner.series.get(labels) {
            return Arc::clone(series.value());
        }
        Arc::clone(
            self.inner
                .series
                .entry(labels.clone())
                .or_insert_with(|| Arc::new(Series::new(self.kind(), &self.inner.boundaries)))
                .value(),
        )
    }

    /// Adds one to a counter or up-down counter.
    pub fn increment(&self, labels: &LabelSet) {
        self.record(1.0, labels);
    }

    /// Subtracts one from an up-down counter.
    pub fn decrement(&self, labels: &LabelSet) {
        self.record(-1.0, labels);
    }

    /// Sets the callback an observable gauge invokes at collection time.
    ///
    /// Replaces any previous callback. Ignored with a warning on other kinds.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&mut GaugeObserver) + Send + Sync + 'static,
    {
        if self.kind() != InstrumentKind::ObservableGauge {
            tracing::warn!(
                instrument = self.name(),
                kind = %self.kind(),
                "set_callback() called on a synchronous instrument"
            );
            return;
        }
        *self
            .inner
            .callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Reads every series of this instrument.
    pub(crate) fn collect(&self, temporality: Temporality, now: DateTime<Utc>) -> MetricData {
        // Up-down counters are not monotonic, so they are always cumulative.
        let temporality = match self.kind() {
            InstrumentKind::UpDownCounter | InstrumentKind::ObservableGauge => {
                Temporality::Cumulative
            }
            _ => temporality,
        };

        let points = if self.kind() == InstrumentKind::ObservableGauge {
            self.observe(now)
        } else {
            let mut points: Vec<DataPoint> = self
                .inner
                .series
                .iter()
                .map(|entry| entry.value().collect(entry.key(), temporality, now))
                .collect();
            points.sort_by(|a, b| a.labels.cmp(&b.labels));
            points
        };

        MetricData {
            name: self.name().to_string(),
            description: self.description().to_string(),
            unit: self.unit().to_string(),
            kind: self.kind(),
            temporality,
            points,
        }
    }

    /// Puts undelivered delta values back into their series.
    ///
    /// Cumulative data is ignored: it is still held by the series.
    pub(crate) fn restore(&self, data: &MetricData) {
        if data.temporality != Temporality::Delta {
            return;
        }
        for point in &data.points {
            self.series(&point.labels).merge(point);
        }
    }

    fn observe(&self, now: DateTime<Utc>) -> Vec<DataPoint> {
        let callback = self
            .inner
            .callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(callback) = callback else {
            return Vec::new();
        };

        let mut observer = GaugeObserver::default();
        callback(&mut observer);
        observer
            .values
            .into_iter()
            .map(|(labels, value)| DataPoint {
                labels,
                start_time: now,
                time: now,
                value: MetricValue::Simple(value),
            })
            .collect()
    }
}
