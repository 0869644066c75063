use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

const DEFAULT_METRICS_PORT: u16 = 9090;

/// Exposure of the `monitor_*` collectors on `/metrics`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub prometheus_enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub prometheus_port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: false,
            prometheus_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl MonitoringConfig {
    /// The port only matters while the endpoint is enabled; it must then be
    /// bindable without root.
    pub fn validate(&self) -> Result<()> {
        if !self.prometheus_enabled {
            if self.prometheus_port != DEFAULT_METRICS_PORT {
                tracing::warn!(
                    port = self.prometheus_port,
                    "metrics port set while the metrics endpoint is disabled"
                );
            }
            return Ok(());
        }

        match self.prometheus_port {
            0 => Err(Error::InvalidConfig("monitoring.prometheus_port must be set".into())),
            port if port < 1024 => Err(Error::InvalidConfig(format!(
                "monitoring.prometheus_port {port} needs root; pick 1024 or above"
            ))),
            _ => Ok(()),
        }
    }
}

fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}
