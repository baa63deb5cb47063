//! # Deferred - Time-ordered Task Scheduling for Rust
//!
//! Queue work for a point in time and let a single background thread run it
//! when it comes due, earliest first.
//!
//! ## Features
//!
//! - **Absolute or relative times**: `schedule` (epoch ms), `schedule_in`
//!   (offset ms), `schedule_at` (chrono / `SystemTime`), `schedule_after`
//!   (`"5s"`, `"250ms"`, `${config.key:default}`)
//! - **Early wake-up**: a job due sooner than everything pending interrupts
//!   the worker's current wait
//! - **Shared context**: every task receives a reference to one value given
//!   at construction
//! - **Tagged tasks**: `#[derive(Task)]` lets several task kinds share a scheduler
//! - **Async work**: `Spawn` hands a `Runnable` to a tokio runtime when due
//! - **Config support**: worker settings from TOML/YAML plus `APP_` environment variables
//!
//! ## Quick Start
//!
//! ```rust
//! use deferred::{Scheduler, Task};
//! use std::sync::Mutex;
//!
//! #[derive(Task)]
//! enum Job {
//!     Greet(Greet),
//! }
//!
//! struct Greet(&'static str);
//!
//! impl Task<Mutex<Vec<String>>> for Greet {
//!     fn run(self, log: &Mutex<Vec<String>>, _at: i64) {
//!         log.lock().unwrap().push(format!("hello, {}", self.0));
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler: Scheduler<Job, Mutex<Vec<String>>> = Scheduler::new(Mutex::new(Vec::new()));
//! scheduler.schedule_in(Job::Greet(Greet("world")), 5)?;
//! scheduler.start()?;
//!
//! std::thread::sleep(std::time::Duration::from_millis(50));
//! scheduler.stop();
//! assert_eq!(*scheduler.context().lock().unwrap(), ["hello, world"]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! Create `config/application.toml`:
//!
//! ```toml
//! [scheduler]
//! thread_name = "mailer"
//! panic_policy = "catch_and_log"   # or "propagate"
//! initial_capacity = 128
//!
//! [jobs]
//! retry_delay = "30s"
//! ```
//!
//! and build with `SchedulerBuilder::with_toml("config/application.toml")?`.
//! Delay expressions such as `"${jobs.retry_delay:10s}"` passed to
//! `schedule_after` are resolved against the same file.

// Re-export macros
pub use deferred_macro::Task;

// Re-export core types
pub use deferred_runtime::{
    now_ms, BoxedTask, Job, PanicPolicy, Result, Runnable, RuntimeContext, Scheduler,
    SchedulerBuilder, SchedulerConfig, SchedulerError, Spawn, Task, TimeUnit, UnixMillis,
};

// Make deferred_runtime available for macro expansion
pub use deferred_runtime;
