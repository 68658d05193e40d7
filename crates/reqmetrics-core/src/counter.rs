//! Labeled monotonic counters.
//!
//! Cells live in a `DashMap` keyed by the ordered label values. The first
//! access to a tuple inserts a zeroed cell; later accesses only touch the
//! shard holding that tuple, so unrelated tuples never contend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::desc::{MetricDescriptor, MetricKind, MetricSample, SampleValue};
use crate::error::Result;
use crate::registry::Collector;

/// Handle to one counter cell. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Counter {
    cell: Arc<AtomicU64>,
}

impl Counter {
    /// Increment by 1.
    pub fn inc(&self) {
        self.inc_by(1);
    }

    /// Increment by an arbitrary value.
    pub fn inc_by(&self, v: u64) {
        self.cell.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.cell.load(Ordering::Relaxed)
    }
}

pub struct CounterVec {
    desc: MetricDescriptor,
    map: DashMap<Vec<String>, Arc<AtomicU64>>,
}

impl CounterVec {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        Ok(Self {
            desc: MetricDescriptor::new(name, help, MetricKind::Counter, label_names)?,
            map: DashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    /// Resolve (or create) the cell for one label tuple.
    pub fn with_label_values(&self, values: &[&str]) -> Result<Counter> {
        self.desc.check_cardinality(values.len())?;
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();

        if let Some(cell) = self.map.get(&key) {
            return Ok(Counter { cell: Arc::clone(cell.value()) });
        }
        let cell = self
            .map
            .entry(key)
            .or_insert_with(|| Arc::new(AtomicU64::new(0)));
        Ok(Counter { cell: Arc::clone(cell.value()) })
    }

    /// Shorthand for `with_label_values(values)?.inc()`.
    pub fn inc(&self, values: &[&str]) -> Result<()> {
        self.with_label_values(values)?.inc();
        Ok(())
    }

    /// Current value for a tuple, `None` if it was never touched.
    pub fn get(&self, values: &[&str]) -> Option<u64> {
        let key: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        self.map.get(&key).map(|c| c.load(Ordering::Relaxed))
    }

    /// Number of distinct label tuples seen so far.
    pub fn series_len(&self) -> usize {
        self.map.len()
    }
}

impl Collector for CounterVec {
    fn describe(&self) -> Vec<MetricDescriptor> {
        vec![self.desc.clone()]
    }

    fn collect(&self) -> Vec<MetricSample> {
        self.map
            .iter()
            .map(|r| MetricSample {
                name: self.desc.name.clone(),
                labels: self.desc.labels_for(r.key()),
                value: SampleValue::Counter(r.value().load(Ordering::Relaxed)),
            })
            .collect()
    }
}
