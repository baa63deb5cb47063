use super::scheduler::Scheduler;
use crate::config::{load_toml_config, load_yaml_config, PanicPolicy, SchedulerConfig};
use crate::error::Result;
use crate::task::Task;
use config::Config;
use std::sync::Arc;
use tracing::info;

/// Builder for the scheduler
pub struct SchedulerBuilder {
    pub(crate) config: Arc<Config>,
    pub(crate) settings: SchedulerConfig,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Create a new scheduler builder with default config (empty)
    pub fn new() -> Self {
        Self {
            config: Arc::new(Config::default()),
            settings: SchedulerConfig::default(),
        }
    }

    /// Create with TOML config file
    ///
    /// Worker settings come from its `[scheduler]` table; the whole file is
    /// kept for resolving `${...}` placeholders in delay expressions.
    pub fn with_toml(path: &str) -> Result<Self> {
        Self::with_config(load_toml_config(path)?)
    }

    /// Create with YAML config file
    pub fn with_yaml(path: &str) -> Result<Self> {
        Self::with_config(load_yaml_config(path)?)
    }

    /// Create with custom config
    pub fn with_config(config: Config) -> Result<Self> {
        let settings = SchedulerConfig::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            settings,
        })
    }

    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.settings.thread_name = thread_name.into();
        self
    }

    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.settings.stack_size = Some(stack_size);
        self
    }

    pub fn panic_policy(mut self, panic_policy: PanicPolicy) -> Self {
        self.settings.panic_policy = panic_policy;
        self
    }

    pub fn initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.settings.initial_capacity = initial_capacity;
        self
    }

    /// Build the scheduler around `ctx` (does not start it yet)
    ///
    /// # Example
    ///
    /// ```rust
    /// use deferred_runtime::{PanicPolicy, SchedulerBuilder, BoxedTask};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let scheduler = SchedulerBuilder::new()
    ///     .thread_name("mailer")
    ///     .panic_policy(PanicPolicy::CatchAndLog)
    ///     .build::<BoxedTask<()>, ()>(());
    ///
    /// scheduler.start()?;  // <- spawning errors happen here
    /// scheduler.stop();
    /// # Ok(())
    /// # }
    /// ```
    pub fn build<T, C>(self, ctx: C) -> Scheduler<T, C>
    where
        T: Task<C>,
        C: Send + Sync + 'static,
    {
        info!(
            thread = %self.settings.thread_name,
            stack_size = ?self.settings.stack_size,
            panic_policy = ?self.settings.panic_policy,
            initial_capacity = self.settings.initial_capacity,
            "Building scheduler"
        );

        Scheduler::from_parts(ctx, self.settings, self.config)
    }
}
