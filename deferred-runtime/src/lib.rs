//! Deferred Runtime - Core runtime for deferred task execution
//!
//! This crate provides a time-ordered job queue and the single-threaded
//! worker that drains it.

pub mod clock;
mod config;
mod error;
mod queue;
mod runnable;
mod scheduler;
mod task;
mod time_unit;

// Re-export public API
pub use clock::{now_ms, UnixMillis};
pub use self::config::{
    load_toml_config, load_yaml_config, resolve_config_value, PanicPolicy, SchedulerConfig,
    SCHEDULER_SECTION,
};
pub use error::{Result, SchedulerError};
pub use queue::{Job, JobQueue};
pub use runnable::{Runnable, RuntimeContext, Spawn};
pub use scheduler::{Scheduler, SchedulerBuilder};
pub use task::{BoxedTask, Task};
pub use time_unit::TimeUnit;
