use tally_config::ConfigError;
use tally_core::CoreError;
use thiserror::Error;

/// Error type surfaced by the [`Tracker`](crate::Tracker) facade.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
