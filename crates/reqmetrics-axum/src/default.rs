//! Process-wide default instrument.
//!
//! Created on first use with the default configuration (no API group,
//! counter-only, `http` namespace) and registered with the process-wide
//! registry exactly once. Call [`init_default`] before serving traffic to fix
//! the initialization point and surface registration errors as values.

use once_cell::sync::OnceCell;

use reqmetrics_core::error::Result;

use crate::handler::Instrumented;
use crate::instrument::Instrument;

static DEFAULT_INSTRUMENT: OnceCell<Instrument> = OnceCell::new();

/// Create and register the default instrument if it does not exist yet.
pub fn init_default() -> Result<&'static Instrument> {
    DEFAULT_INSTRUMENT.get_or_try_init(Instrument::new)
}

/// The default instrument.
///
/// # Panics
/// If the default metric names are already taken in the process-wide
/// registry. A colliding registration is a configuration error the process
/// cannot recover from.
pub fn default_instrument() -> &'static Instrument {
    init_default().unwrap_or_else(|e| panic!("default instrument registration failed: {e}"))
}

/// [`Instrument::wrap`] on the default instrument.
pub fn wrap_with_default<H, T>(path: &str, handler: H) -> Instrumented<H, T> {
    default_instrument().wrap(path, handler)
}
