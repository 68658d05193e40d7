//! Collector registry.
//!
//! Metric names are unique within a registry: registering a collector that
//! declares a name already present fails with [`MetricsError::DuplicateName`]
//! and leaves the registry untouched.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::desc::{MetricDescriptor, MetricSample};
use crate::error::{MetricsError, Result};

/// Anything that can describe its series and report their current values.
///
/// `collect` is called from the scrape path and must be safe to run
/// concurrently with ongoing updates.
pub trait Collector: Send + Sync {
    fn describe(&self) -> Vec<MetricDescriptor>;
    fn collect(&self) -> Vec<MetricSample>;
}

#[derive(Default)]
struct RegistryInner {
    names: HashSet<String>,
    collectors: Vec<Arc<dyn Collector>>,
}

#[derive(Default)]
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every series of `collector`, all or nothing.
    pub fn register(&self, collector: Arc<dyn Collector>) -> Result<()> {
        let descs = collector.describe();
        let mut inner = self.lock()?;

        let mut incoming = HashSet::new();
        for d in &descs {
            if inner.names.contains(&d.name) || !incoming.insert(d.name.clone()) {
                return Err(MetricsError::DuplicateName(d.name.clone()));
            }
        }

        for d in &descs {
            tracing::debug!(metric = %d.name, kind = ?d.kind, "metric registered");
        }
        inner.names.extend(incoming);
        inner.collectors.push(collector);
        Ok(())
    }

    /// Whether `name` is taken. A poisoned lock surfaces as `Internal`.
    pub fn is_registered(&self, name: &str) -> Result<bool> {
        Ok(self.lock()?.names.contains(name))
    }

    /// Descriptors of every registered series.
    pub fn describe(&self) -> Result<Vec<MetricDescriptor>> {
        let collectors = self.snapshot_collectors()?;
        Ok(collectors.iter().flat_map(|c| c.describe()).collect())
    }

    /// Collect all samples, sorted by metric name then labels.
    pub fn gather(&self) -> Result<Vec<MetricSample>> {
        let collectors = self.snapshot_collectors()?;
        let mut samples: Vec<MetricSample> =
            collectors.iter().flat_map(|c| c.collect()).collect();
        samples.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.labels.cmp(&b.labels)));
        Ok(samples)
    }

    // Collect outside the lock so a slow collector never blocks registration.
    fn snapshot_collectors(&self) -> Result<Vec<Arc<dyn Collector>>> {
        Ok(self.lock()?.collectors.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, RegistryInner>> {
        self.inner
            .lock()
            .map_err(|_| MetricsError::Internal("registry lock poisoned".into()))
    }
}

static DEFAULT_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Process-wide registry used when no explicit one is supplied.
pub fn default_registry() -> &'static Registry {
    &DEFAULT_REGISTRY
}
