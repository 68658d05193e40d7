//! Labeled histograms with fixed bucket boundaries.
//!
//! Each cell stores per-bucket (non-cumulative) counts, a total count, and the
//! sum of observed values as `f64` bits. Snapshots cumulate the buckets. A
//! snapshot taken while observations are in flight may see `count` and the
//! buckets from slightly different instants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::desc::{
    BucketCount, HistogramSnapshot, MetricDescriptor, MetricKind, MetricSample, SampleValue,
};
use crate::error::{MetricsError, Result};
use crate::registry::Collector;

/// Latency boundaries in seconds, used when no explicit buckets are given.
pub const DEFAULT_LATENCY_BUCKETS: [f64; 11] =
    [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

struct AtomicHistogram {
    count: AtomicU64,
    sum_bits: AtomicU64,
    buckets: Box<[AtomicU64]>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum_bits: AtomicU64::new(0f64.to_bits()),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn observe(&self, bounds: &[f64], v: f64) {
        if let Some(i) = bounds.iter().position(|b| v <= *b) {
            self.buckets[i].fetch_add(1, Ordering::Relaxed);
        }
        let mut bits = self.sum_bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(bits) + v).to_bits();
            match self.sum_bits.compare_exchange_weak(
                bits,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => bits = current,
            }
        }
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self, bounds: &[f64]) -> HistogramSnapshot {
        let mut running = 0u64;
        let buckets = bounds
            .iter()
            .zip(self.buckets.iter())
            .map(|(&upper_bound, c)| {
                running += c.load(Ordering::Relaxed);
                BucketCount {
                    upper_bound,
                    cumulative_count: running,
                }
            })
            .collect();
        HistogramSnapshot {
            buckets,
            count: self.count.load(Ordering::Relaxed),
            sum: f64::from_bits(self.sum_bits.load(Ordering::Relaxed)),
        }
    }
}

/// Handle to one histogram cell. Cheap to clone.
#[derive(Clone)]
pub struct Histogram {
    bounds: Arc<[f64]>,
    cell: Arc<AtomicHistogram>,
}

impl Histogram {
    pub fn observe(&self, v: f64) {
        self.cell.observe(&self.bounds, v);
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        self.cell.snapshot(&self.bounds)
    }
}

pub struct HistogramVec {
    desc: MetricDescriptor,
    bounds: Arc<[f64]>,
    map: DashMap<Vec<String>, Arc<AtomicHistogram>>,
}

impl HistogramVec {
    /// An empty `buckets` selects [`DEFAULT_LATENCY_BUCKETS`].
    pub fn new(name: &str, help: &str, label_names: &[&str], buckets: &[f64]) -> Result<Self> {
        let bounds: Arc<[f64]> = if buckets.is_empty() {
            Arc::from(&DEFAULT_LATENCY_BUCKETS[..])
        } else {
            validate_buckets(buckets)?;
            Arc::from(buckets)
        };
        Ok(Self {
            desc: MetricDescriptor::new(name, help, MetricKind::Histogram, label_names)?,
            bounds,
            map: DashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn buckets(&self) -> &[f64] {
        &self.bounds
    }

    /// Resolve (or create) the cell for one label tuple.
    pub fn with_label_values(&self, values: &[&str]) -> Result<Histogram> {
        self.desc.check_cardinality(values.len())?;
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();

        if let Some(cell) = self.map.get(&key) {
            return Ok(Histogram {
                bounds: Arc::clone(&self.bounds),
                cell: Arc::clone(cell.value()),
            });
        }
        let n = self.bounds.len();
        let cell = self
            .map
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicHistogram::new(n)));
        Ok(Histogram {
            bounds: Arc::clone(&self.bounds),
            cell: Arc::clone(cell.value()),
        })
    }

    /// Shorthand for `with_label_values(values)?.observe(v)`.
    pub fn observe(&self, values: &[&str], v: f64) -> Result<()> {
        self.with_label_values(values)?.observe(v);
        Ok(())
    }

    /// Number of distinct label tuples seen so far.
    pub fn series_len(&self) -> usize {
        self.map.len()
    }
}

impl Collector for HistogramVec {
    fn describe(&self) -> Vec<MetricDescriptor> {
        vec![self.desc.clone()]
    }

    fn collect(&self) -> Vec<MetricSample> {
        self.map
            .iter()
            .map(|r| MetricSample {
                name: self.desc.name.clone(),
                labels: self.desc.labels_for(r.key()),
                value: SampleValue::Histogram(r.value().snapshot(&self.bounds)),
            })
            .collect()
    }
}

/// Boundaries must be finite and strictly increasing.
pub fn validate_buckets(buckets: &[f64]) -> Result<()> {
    if let Some(b) = buckets.iter().find(|b| !b.is_finite()) {
        return Err(MetricsError::InvalidBuckets(format!(
            "bucket bound {b} is not finite"
        )));
    }
    if let Some(w) = buckets.windows(2).find(|w| w[0] >= w[1]) {
        return Err(MetricsError::InvalidBuckets(format!(
            "bounds must be strictly increasing ({} >= {})",
            w[0], w[1]
        )));
    }
    Ok(())
}
