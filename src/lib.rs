#![doc(test(attr(deny(warnings))))]

//! Tally tracks daily habits and a monthly budget, and keeps the derived
//! read models (streaks, weekly histogram, monthly totals, category spend and
//! the dashboard) current as the underlying records change.

pub mod errors;
pub mod tracker;
pub mod utils;

pub use errors::TrackerError;
pub use tracker::Tracker;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Tally tracing initialized.");
    });
}
