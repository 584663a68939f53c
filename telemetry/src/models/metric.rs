//! Metric data model.
//!
//! Defines instrument kinds, label sets and the point-in-time snapshot the
//! metric reader hands to a backend.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of metric instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// A monotonic sum (e.g., request count).
    Counter,
    /// A distribution of observations (e.g., request latency).
    Histogram,
    /// A sum that can go up or down (e.g., requests in progress).
    UpDownCounter,
    /// A value read from a callback at collection time (e.g., memory usage).
    ObservableGauge,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counter => write!(f, "counter"),
            Self::Histogram => write!(f, "histogram"),
            Self::UpDownCounter => write!(f, "up_down_counter"),
            Self::ObservableGauge => write!(f, "observable_gauge"),
        }
    }
}

/// Whether sums report the running total or the change since the last collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Temporality {
    /// Values accumulate for the life of the process.
    #[default]
    Cumulative,
    /// Values reset after every collection.
    Delta,
}

/// The attributes identifying one time series under an instrument.
///
/// Keys are kept sorted, so two label sets with the same pairs are equal (and
/// hash equally) whatever order they were built in.
///
/// # Example
///
/// ```
/// use telemetry::models::LabelSet;
///
/// let a = LabelSet::from([("endpoint", "/"), ("method", "GET")]);
/// let b = LabelSet::from([("method", "GET"), ("endpoint", "/")]);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    /// Creates an empty label set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a label.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a label.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Iterates labels in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no labels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for LabelSet {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

/// A cumulative histogram bucket, as used by text exposition formats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    /// The inclusive upper bound of this bucket (`f64::INFINITY` for the last).
    pub upper_bound: f64,
    /// The cumulative count of observations up to this bound.
    pub count: u64,
}

/// Histogram data for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramData {
    /// Explicit bucket boundaries, ascending.
    pub boundaries: Vec<f64>,
    /// Per-bucket (non-cumulative) counts; one longer than `boundaries`.
    pub bucket_counts: Vec<u64>,
    /// The sum of all observed values.
    pub sum: f64,
    /// The total count of observations.
    pub count: u64,
    /// Smallest observation, if any.
    pub min: Option<f64>,
    /// Largest observation, if any.
    pub max: Option<f64>,
}

impl HistogramData {
    /// Returns cumulative buckets, ending with the `+Inf` bucket.
    #[must_use]
    pub fn cumulative_buckets(&self) -> Vec<HistogramBucket> {
        let mut running = 0;
        self.bucket_counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                running += count;
                HistogramBucket {
                    upper_bound: self.boundaries.get(i).copied().unwrap_or(f64::INFINITY),
                    count: running,
                }
            })
            .collect()
    }
}

/// The value of a data point, which varies by instrument kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    /// A simple numeric value (sums and gauges).
    Simple(f64),
    /// Histogram data for distribution instruments.
    Histogram(HistogramData),
}

impl MetricValue {
    /// Returns the simple value if this is a simple metric.
    #[must_use]
    pub fn as_simple(&self) -> Option<f64> {
        match self {
            Self::Simple(v) => Some(*v),
            Self::Histogram(_) => None,
        }
    }

    /// Returns the histogram data if this is a histogram metric.
    #[must_use]
    pub fn as_histogram(&self) -> Option<&HistogramData> {
        match self {
            Self::Simple(_) => None,
            Self::Histogram(h) => Some(h),
        }
    }
}

/// One series' value at collection time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    /// The series' labels.
    pub labels: LabelSet,
    /// Start of the aggregation window.
    pub start_time: DateTime<Utc>,
    /// Collection time.
    pub time: DateTime<Utc>,
    /// The value.
    pub value: MetricValue,
}

/// All series of one instrument at collection time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricData {
    /// Instrument name.
    pub name: String,
    /// Instrument description.
    pub description: String,
    /// Instrument unit.
    pub unit: String,
    /// Instrument kind.
    pub kind: InstrumentKind,
    /// Temporality of sum and histogram values.
    pub temporality: Temporality,
    /// One data point per label set.
    pub points: Vec<DataPoint>,
}

impl MetricData {
    /// Returns the data point for a label set.
    #[must_use]
    pub fn point(&self, labels: &LabelSet) -> Option<&DataPoint> {
        self.points.iter().find(|p| &p.labels == labels)
    }
}

/// A consistent point-in-time read of every instrument in a registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    /// When the collection started.
    pub collected_at: DateTime<Utc>,
    /// One entry per instrument, in registration order.
    pub metrics: Vec<MetricData>,
}

impl MetricSnapshot {
    /// Returns the entry for an instrument.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&MetricData> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Returns the simple value of one series.
    #[must_use]
    pub fn value(&self, name: &str, labels: &LabelSet) -> Option<f64> {
        self.metric(name)?.point(labels)?.value.as_simple()
    }

    /// Returns true if no instrument produced a data point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.iter().all(|m| m.points.is_empty())
    }
}
