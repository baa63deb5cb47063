use std::collections::TryReserveError;

use thiserror::Error;

/// Errors returned by scheduler construction, lifecycle and enqueue calls.
///
/// Faults raised inside a task's `run` never surface here; see
/// [`PanicPolicy`](crate::PanicPolicy).
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start()` was called while the worker is already running.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// The job queue could not grow to hold another job.
    #[error("failed to grow job queue: {0}")]
    Alloc(#[from] TryReserveError),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A config file could not be loaded or a placeholder key is missing.
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    /// A delay expression is neither a shorthand duration nor milliseconds.
    #[error("invalid delay: {0}")]
    InvalidDelay(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
