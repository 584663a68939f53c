//! Prometheus text exposition (format 0.0.4).
//!
//! The pull backend never sends anything. Each scrape collects a cumulative
//! snapshot, hands it to [`PrometheusExporter`], and serves the rendered text.

use crate::backend::Exporter;
use crate::config::BackendKind;
use crate::error::ExportError;
use crate::models::{InstrumentKind, LabelSet, MetricData, MetricSnapshot, MetricValue};
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::{PoisonError, RwLock};

/// Content type of the exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Replaces characters that are not valid in a metric or label name.
fn sanitize_name(name: &str, allow_colon: bool) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

/// Renders `{k="v",...}`, with an optional trailing `le` label.
fn format_labels(labels: &LabelSet, le: Option<f64>) -> String {
    let mut parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", sanitize_name(k, false), escape_label_value(v)))
        .collect();
    if let Some(bound) = le {
        parts.push(format!("le=\"{}\"", format_value(bound)));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

fn type_name(kind: InstrumentKind) -> &'static str {
    match kind {
        InstrumentKind::Counter => "counter",
        InstrumentKind::UpDownCounter | InstrumentKind::ObservableGauge => "gauge",
        InstrumentKind::Histogram => "histogram",
    }
}

fn encode_metric(out: &mut String, metric: &MetricData) {
    let name = sanitize_name(&metric.name, true);
    if !metric.description.is_empty() {
        let _ = writeln!(out, "# HELP {name} {}", escape_help(&metric.description));
    }
    let _ = writeln!(out, "# TYPE {name} {}", type_name(metric.kind));

    for point in &metric.points {
        match &point.value {
            MetricValue::Simple(value) => {
                let _ = writeln!(
                    out,
                    "{name}{} {}",
                    format_labels(&point.labels, None),
                    format_value(*value)
                );
            }
            MetricValue::Histogram(histogram) => {
                for bucket in histogram.cumulative_buckets() {
                    let _ = writeln!(
                        out,
                        "{name}_bucket{} {}",
                        format_labels(&point.labels, Some(bucket.upper_bound)),
                        bucket.count
                    );
                }
                let labels = format_labels(&point.labels, None);
                let _ = writeln!(out, "{name}_sum{labels} {}", format_value(histogram.sum));
                let _ = writeln!(out, "{name}_count{labels} {}", histogram.count);
            }
        }
    }
}

/// Renders a snapshot in the Prometheus text format.
///
/// Instruments without data points are omitted.
#[must_use]
pub fn encode(snapshot: &MetricSnapshot) -> String {
    let mut out = String::new();
    for metric in snapshot.metrics.iter().filter(|m| !m.points.is_empty()) {
        encode_metric(&mut out, metric);
    }
    out
}

/// Pull backend: keeps the text of the most recent scrape.
#[derive(Debug, Default)]
pub struct PrometheusExporter {
    latest: RwLock<String>,
}

impl PrometheusExporter {
    /// Creates an exporter with nothing rendered yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders a snapshot and keeps it as the latest text.
    pub fn render(&self, snapshot: &MetricSnapshot) -> String {
        let text = encode(snapshot);
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clone_from(&text);
        text
    }

    /// Returns the text rendered by the last export.
    #[must_use]
    pub fn text(&self) -> String {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Exporter for PrometheusExporter {
    fn name(&self) -> &'static str {
        BackendKind::PrometheusPull.as_str()
    }

    async fn export_metrics(&self, snapshot: &MetricSnapshot) -> Result<(), ExportError> {
        self.render(snapshot);
        Ok(())
    }
}
