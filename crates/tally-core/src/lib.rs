//! tally-core
//!
//! Derived metrics for habits and budgets: streaks, weekly histograms, monthly
//! totals, category spend and the dashboard read model.
//! Depends on tally-domain. No file I/O; persistence plugs in through [`storage`].

pub mod budget;
pub mod commands;
pub mod dashboard;
pub mod error;
pub mod histogram;
pub mod pipeline;
pub mod spend;
pub mod storage;
pub mod store;
pub mod streak;
pub mod time;
pub mod validation;

pub use budget::*;
pub use commands::*;
pub use dashboard::*;
pub use error::CoreError;
pub use histogram::*;
pub use pipeline::*;
pub use spend::*;
pub use storage::*;
pub use store::TableStore;
pub use streak::*;
pub use time::*;
