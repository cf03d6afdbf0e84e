//! Scheduler errors

use thiserror::Error;

/// Timer management failures
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The OS refused to start the timer thread
    #[error("Failed to spawn timer thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A timer needs a non-zero period
    #[error("Timer '{0}' has a zero interval")]
    ZeroInterval(String),
}

/// Result type alias
pub type SchedulerResult<T> = Result<T, SchedulerError>;
