//! Monitor Error Hierarchy
//!
//! Defines the error types surfaced by the live-state aggregator, categorized
//! by the component that raises them.

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A manager's search stream ended with an error
    #[error("Manager stream {stream} failed: {message}")]
    Manager {
        stream: &'static str,
        message: String,
    },

    /// A record handler rejected a delivered record
    #[error("Record handler failed: {0}")]
    Handler(String),

    /// The update callback reported a failure
    #[error("Update callback failed: {0}")]
    Update(String),

    /// Cancellation was observed while waiting
    #[error("Shutdown requested")]
    Shutdown,

    /// A watch channel lost its sender
    #[error("Signal channel closed")]
    SignalChannelClosed,

    /// Filesystem failures (log files)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn manager(
        stream: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Error::Manager {
            stream,
            message: message.into(),
        }
    }
}
