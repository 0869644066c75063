use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default = "default_file_name")]
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            file_name: default_file_name(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.file_name.trim().is_empty() {
            return Err(Error::InvalidConfig("logging.file_name cannot be empty".into()));
        }
        if self.file_name.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::InvalidConfig(format!(
                "logging.file_name {} must not contain a path separator",
                self.file_name
            )));
        }
        Ok(())
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_file_name() -> String {
    "monitor.log".to_string()
}
