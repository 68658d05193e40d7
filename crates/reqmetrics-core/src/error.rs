//! Shared error type across reqmetrics crates.

use thiserror::Error;

/// Stable error codes, independent of the message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A metric with the same name is already registered.
    DuplicateName,
    /// Metric name is not a valid identifier.
    InvalidName,
    /// Histogram bucket boundaries are malformed.
    InvalidBuckets,
    /// Wrong number of label values.
    LabelCardinality,
    /// Unsupported configuration version.
    UnsupportedVersion,
    /// Malformed configuration.
    BadConfig,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DuplicateName => "DUPLICATE_NAME",
            ErrorKind::InvalidName => "INVALID_NAME",
            ErrorKind::InvalidBuckets => "INVALID_BUCKETS",
            ErrorKind::LabelCardinality => "LABEL_CARDINALITY",
            ErrorKind::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorKind::BadConfig => "BAD_CONFIG",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by the backend and the axum integration.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("duplicate metric name: {0}")]
    DuplicateName(String),
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),
    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(String),
    #[error("expected {expected} label values, got {got}")]
    LabelCardinality { expected: usize, got: usize },
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("bad config: {0}")]
    BadConfig(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MetricsError::DuplicateName(_) => ErrorKind::DuplicateName,
            MetricsError::InvalidName(_) => ErrorKind::InvalidName,
            MetricsError::InvalidBuckets(_) => ErrorKind::InvalidBuckets,
            MetricsError::LabelCardinality { .. } => ErrorKind::LabelCardinality,
            MetricsError::UnsupportedVersion => ErrorKind::UnsupportedVersion,
            MetricsError::BadConfig(_) => ErrorKind::BadConfig,
            MetricsError::Internal(_) => ErrorKind::Internal,
        }
    }
}
