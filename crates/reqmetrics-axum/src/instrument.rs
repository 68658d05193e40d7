//! Per-server request instrument.
//!
//! An [`Instrument`] owns the request counter and, when built with a histogram,
//! the latency histogram. Both are keyed by `(method, path, status_code)`. The
//! mode is fixed at construction; counter-only instruments never read the
//! clock.
//!
//! # Label cardinality
//! Every distinct path label creates a new series that lives for the rest of
//! the process. Wrap routes with their pattern (`/users/:id`), never with raw
//! request paths.

use std::sync::Arc;
use std::time::Instant;

use reqmetrics_core::error::Result;
use reqmetrics_core::{
    default_registry, Collector, CounterVec, HistogramVec, MetricDescriptor, MetricSample,
    Registry,
};

use crate::config::schema::default_namespace;
use crate::config::InstrumentConfig;
use crate::handler::Instrumented;

/// Label names shared by the counter and the histogram, in tuple order.
pub const LABEL_NAMES: [&str; 3] = ["method", "path", "status_code"];

const COUNTER_HELP: &str =
    "Total number of requests handled by the server, regardless of success or failure";
const HISTOGRAM_HELP: &str = "Histogram of response latency (seconds) handled by the server";

enum Mode {
    CounterOnly,
    CounterWithHistogram(HistogramVec),
}

struct InstrumentInner {
    api_group: String,
    counter: CounterVec,
    mode: Mode,
}

/// Shared handle; clones refer to the same series.
#[derive(Clone)]
pub struct Instrument {
    inner: Arc<InstrumentInner>,
}

impl Instrument {
    pub fn builder() -> InstrumentBuilder {
        InstrumentBuilder::default()
    }

    /// Default configuration, registered with the process-wide registry.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Build from validated config and register with `registry`.
    pub fn from_config(cfg: &InstrumentConfig, registry: &Registry) -> Result<Self> {
        cfg.validate()?;
        let mut b = Self::builder()
            .namespace(cfg.namespace.clone())
            .api_group(cfg.api_group.clone());
        if let Some(h) = &cfg.histogram {
            b = b.with_histogram(h.buckets.clone());
        }
        b.register(registry)
    }

    pub fn api_group(&self) -> &str {
        &self.inner.api_group
    }

    pub fn has_histogram(&self) -> bool {
        matches!(self.inner.mode, Mode::CounterWithHistogram(_))
    }

    pub fn counter(&self) -> &CounterVec {
        &self.inner.counter
    }

    pub fn histogram(&self) -> Option<&HistogramVec> {
        match &self.inner.mode {
            Mode::CounterOnly => None,
            Mode::CounterWithHistogram(h) => Some(h),
        }
    }

    /// The path label recorded for a route registered at `path`.
    pub fn full_path(&self, path: &str) -> String {
        format!("{}{}", self.inner.api_group, path)
    }

    /// Wrap `handler` so every completed call is counted (and timed, in
    /// histogram mode) under `api_group + path`.
    ///
    /// The result implements axum's `Handler` and can be passed to
    /// `axum::routing::get` and friends directly.
    pub fn wrap<H, T>(&self, path: &str, handler: H) -> Instrumented<H, T> {
        let full_path: Arc<str> = Arc::from(self.full_path(path));
        tracing::debug!(
            path = %full_path,
            histogram = self.has_histogram(),
            "handler instrumented"
        );
        Instrumented::new(handler, self.clone(), full_path)
    }

    pub(crate) fn start_timer(&self) -> Option<Instant> {
        match self.inner.mode {
            Mode::CounterOnly => None,
            Mode::CounterWithHistogram(_) => Some(Instant::now()),
        }
    }

    /// Record one completed request.
    pub(crate) fn record(
        &self,
        method: &str,
        path: &str,
        status: &str,
        started: Option<Instant>,
    ) {
        let labels = [method, path, status];
        if let Err(e) = self.inner.counter.inc(&labels) {
            tracing::warn!(error = %e, path, "request count dropped");
        }

        if let (Mode::CounterWithHistogram(h), Some(started)) = (&self.inner.mode, started) {
            let elapsed = started.elapsed().as_secs_f64();
            if let Err(e) = h.observe(&labels, elapsed) {
                tracing::warn!(error = %e, path, "latency observation dropped");
            }
        }
    }
}

impl Collector for Instrument {
    fn describe(&self) -> Vec<MetricDescriptor> {
        let mut out = self.inner.counter.describe();
        if let Mode::CounterWithHistogram(h) = &self.inner.mode {
            out.extend(h.describe());
        }
        out
    }

    fn collect(&self) -> Vec<MetricSample> {
        let mut out = self.inner.counter.collect();
        if let Mode::CounterWithHistogram(h) = &self.inner.mode {
            out.extend(h.collect());
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstrumentBuilder {
    namespace: Option<String>,
    api_group: String,
    buckets: Option<Vec<f64>>,
}

impl InstrumentBuilder {
    /// Metric name prefix, `http` by default.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Prefix prepended to every path label.
    pub fn api_group(mut self, api_group: impl Into<String>) -> Self {
        self.api_group = api_group.into();
        self
    }

    /// Enable latency measurement. An empty `buckets` selects the default
    /// latency buckets.
    pub fn with_histogram(mut self, buckets: Vec<f64>) -> Self {
        self.buckets = Some(buckets);
        self
    }

    /// Register with the process-wide registry.
    pub fn build(self) -> Result<Instrument> {
        self.register(default_registry())
    }

    /// Register with `registry`. Fails with `DuplicateName` if any of the
    /// instrument's metric names is taken; nothing is registered then.
    pub fn register(self, registry: &Registry) -> Result<Instrument> {
        let namespace = self.namespace.unwrap_or_else(default_namespace);

        let counter = CounterVec::new(
            &format!("{namespace}_handled_total"),
            COUNTER_HELP,
            &LABEL_NAMES,
        )?;
        let mode = match self.buckets {
            None => Mode::CounterOnly,
            Some(buckets) => Mode::CounterWithHistogram(HistogramVec::new(
                &format!("{namespace}_handled_latency_seconds"),
                HISTOGRAM_HELP,
                &LABEL_NAMES,
                &buckets,
            )?),
        };

        let instrument = Instrument {
            inner: Arc::new(InstrumentInner {
                api_group: self.api_group,
                counter,
                mode,
            }),
        };
        registry.register(Arc::new(instrument.clone()))?;

        tracing::info!(
            counter = instrument.counter().name(),
            histogram = instrument.histogram().map(|h| h.name()),
            api_group = %instrument.api_group(),
            "instrument registered"
        );
        Ok(instrument)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn counter_only_never_reads_the_clock() {
        let reg = Registry::new();
        let inst = Instrument::builder().register(&reg).unwrap();
        assert!(inst.start_timer().is_none());
    }

    #[test]
    fn histogram_mode_starts_a_timer() {
        let reg = Registry::new();
        let inst = Instrument::builder()
            .with_histogram(vec![])
            .register(&reg)
            .unwrap();
        assert!(inst.start_timer().is_some());
    }

    #[test]
    fn record_without_start_skips_latency() {
        let reg = Registry::new();
        let inst = Instrument::builder()
            .with_histogram(vec![])
            .register(&reg)
            .unwrap();
        inst.record("GET", "/x", "200", None);

        assert_eq!(inst.counter().get(&["GET", "/x", "200"]), Some(1));
        assert_eq!(inst.histogram().unwrap().series_len(), 0);
    }
}
