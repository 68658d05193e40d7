//! reqmetrics core: labeled counters and histograms, descriptors, and the
//! collector registry.
//!
//! This crate is the metrics backend the HTTP integration records into. It
//! carries no transport or runtime dependencies; exposition formats are left
//! to whoever consumes [`Registry::gather`].
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible path
//! surfaces as [`MetricsError`] so a bad label set or a name collision never
//! takes down a request task.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod counter;
pub mod desc;
pub mod error;
pub mod histogram;
pub mod registry;

pub use counter::{Counter, CounterVec};
pub use desc::{
    validate_name, BucketCount, HistogramSnapshot, MetricDescriptor, MetricKind, MetricSample,
    SampleValue,
};
pub use error::{ErrorKind, MetricsError, Result};
pub use histogram::{validate_buckets, Histogram, HistogramVec, DEFAULT_LATENCY_BUCKETS};
pub use registry::{default_registry, Collector, Registry};
