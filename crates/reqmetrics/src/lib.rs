//! Top-level facade crate for reqmetrics.
//!
//! Re-exports the metrics backend and the axum integration so users can depend
//! on a single crate.

pub mod core {
    pub use reqmetrics_core::*;
}

pub mod http {
    pub use reqmetrics_axum::*;
}

pub use reqmetrics_axum::{wrap_with_default, Instrument};
