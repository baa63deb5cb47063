use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// Key of the table `SchedulerConfig` is read from.
pub const SCHEDULER_SECTION: &str = "scheduler";

/// What the worker does when a task panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicPolicy {
    /// Catch the panic, log it, and keep the worker alive.
    #[default]
    CatchAndLog,
    /// Let the panic unwind and terminate the worker thread.
    Propagate,
}

/// Worker settings, read from the `[scheduler]` table of a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub thread_name: String,
    /// Worker stack size in bytes; the platform default when unset.
    pub stack_size: Option<usize>,
    pub panic_policy: PanicPolicy,
    /// Jobs the queue can hold before it first grows.
    pub initial_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            thread_name: "deferred-worker".to_string(),
            stack_size: None,
            panic_policy: PanicPolicy::default(),
            initial_capacity: 0,
        }
    }
}

impl SchedulerConfig {
    /// Read the `scheduler` table, falling back to defaults when it is absent
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.get::<SchedulerConfig>(SCHEDULER_SECTION) {
            Ok(settings) => Ok(settings),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Load config from a specific TOML file
pub fn load_toml_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Toml))
        .add_source(config::Environment::with_prefix("APP").separator("_"))
        .build()?;
    Ok(config)
}

/// Load config from a specific YAML file
pub fn load_yaml_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let config = Config::builder()
        .add_source(File::from(path.as_ref()).format(FileFormat::Yaml))
        .add_source(config::Environment::with_prefix("APP").separator("_"))
        .build()?;
    Ok(config)
}

/// Resolve config placeholder like ${jobs.delay} or ${jobs.delay:default}
pub fn resolve_config_value(value: &str, config: &Config) -> Result<String> {
    let Some(inner) = value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return Ok(value.to_string());
    };

    // ${jobs.delay:5s} falls back to "5s" when the key is missing
    if let Some((key, default_value)) = inner.split_once(':') {
        match config.get_string(key) {
            Ok(resolved) => Ok(resolved),
            Err(_) => Ok(default_value.to_string()),
        }
    } else {
        Ok(config.get_string(inner)?)
    }
}
