//! Metric descriptors and collected samples.
//!
//! These are the values handed to an external exporter. They are plain data
//! (`Serialize`) so the exporter is free to pick its own wire format.

use serde::Serialize;

use crate::error::{MetricsError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Histogram,
}

/// Static description of one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    pub label_names: Vec<String>,
}

impl MetricDescriptor {
    pub(crate) fn new(
        name: &str,
        help: &str,
        kind: MetricKind,
        label_names: &[&str],
    ) -> Result<Self> {
        validate_name(name)?;
        for l in label_names {
            validate_name(l)?;
        }
        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            kind,
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
        })
    }

    /// Zip label names with one tuple of values.
    pub(crate) fn labels_for(&self, values: &[String]) -> Vec<(String, String)> {
        self.label_names
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect()
    }

    pub(crate) fn check_cardinality(&self, got: usize) -> Result<()> {
        let expected = self.label_names.len();
        if expected != got {
            return Err(MetricsError::LabelCardinality { expected, got });
        }
        Ok(())
    }
}

/// One cumulative histogram bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub upper_bound: f64,
    pub cumulative_count: u64,
}

/// Point-in-time view of one histogram cell.
/// The implicit `+Inf` bucket equals `count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSnapshot {
    pub buckets: Vec<BucketCount>,
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SampleValue {
    Counter(u64),
    Histogram(HistogramSnapshot),
}

/// Current value of one label tuple within a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: SampleValue,
}

impl MetricSample {
    /// Look up a label value by name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn counter_value(&self) -> Option<u64> {
        match &self.value {
            SampleValue::Counter(v) => Some(*v),
            SampleValue::Histogram(_) => None,
        }
    }

    pub fn histogram(&self) -> Option<&HistogramSnapshot> {
        match &self.value {
            SampleValue::Histogram(h) => Some(h),
            SampleValue::Counter(_) => None,
        }
    }
}

/// Accepts `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(MetricsError::InvalidName(name.to_string()))
    }
}
