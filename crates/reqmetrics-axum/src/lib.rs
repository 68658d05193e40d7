//! reqmetrics axum integration.
//!
//! Wraps individual route handlers so every completed request increments
//! `{namespace}_handled_total{method, path, status_code}` and, when enabled,
//! observes `{namespace}_handled_latency_seconds` under the same labels.
//!
//! ```ignore
//! let metrics = Instrument::builder().api_group("/v1").with_histogram(vec![]).build()?;
//! let app = Router::new().route("/users", get(metrics.wrap("/users", list_users)));
//! ```

pub mod config;
pub mod default;
pub mod handler;
pub mod instrument;

pub use default::{default_instrument, init_default, wrap_with_default};
pub use handler::Instrumented;
pub use instrument::{Instrument, InstrumentBuilder, LABEL_NAMES};
