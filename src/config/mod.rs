//! Configuration management module for the live-state monitor.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Environment variable overrides
//! - Configuration file support
//! - Component-wise validation
mod logging;
mod monitoring;
mod retry;
mod watch;
pub use logging::*;
pub use monitoring::*;
pub use retry::*;
pub use watch::*;

use std::env;
use std::fmt::Debug;
use std::path::PathBuf;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Prefix of the environment variables that override file settings,
/// e.g. `MONITOR__WATCH__RESTART_ON_ERROR=true`.
pub const ENV_PREFIX: &str = "MONITOR";

/// Main configuration container for the monitor components
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Subscription supervision parameters
    #[serde(default)]
    pub watch: WatchConfig,
    /// Metrics and monitoring settings
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Log output location
    #[serde(default)]
    pub logging: LoggingConfig,
    /// TOML file of records preloaded into the daemon's local managers
    #[serde(default)]
    pub fixtures: Option<PathBuf>,
}

impl Debug for Settings {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("watch", &self.watch)
            .field("monitoring", &self.monitoring)
            .field("logging", &self.logging)
            .field("fixtures", &self.fixtures)
            .finish()
    }
}

impl Settings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `MONITOR__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred to allow further overrides via `with_override_config()`.
    /// Callers MUST call `validate()` before using the configuration.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/monitor.toml");
    /// std::env::set_var("MONITOR__MONITORING__PROMETHEUS_ENABLED", "true");
    /// let settings = Settings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.watch.validate()?;
        self.monitoring.validate()?;
        self.logging.validate()?;
        if let Some(path) = &self.fixtures {
            if !path.is_file() {
                return Err(Error::InvalidConfig(format!(
                    "fixtures file {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
