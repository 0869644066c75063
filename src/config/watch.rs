use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use super::BackoffPolicy;
use crate::Error;
use crate::Result;

/// Supervision parameters for the manager subscriptions.
///
/// A failed subscription is left stopped unless `restart_on_error` is set,
/// in which case it is re-subscribed following the `restart` policy.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    #[serde(default = "default_restart_on_error")]
    pub restart_on_error: bool,

    #[serde(default)]
    pub restart: BackoffPolicy,

    /// How long shutdown waits for subscription tasks to stop
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            restart_on_error: default_restart_on_error(),
            restart: BackoffPolicy::default(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl WatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.shutdown_timeout_ms == 0 {
            return Err(Error::InvalidConfig("shutdown_timeout_ms must be greater than 0".into()));
        }
        if self.restart_on_error {
            self.restart.validate()?;
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn default_restart_on_error() -> bool {
    false
}

fn default_shutdown_timeout_ms() -> u64 {
    3000
}
