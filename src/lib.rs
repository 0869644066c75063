//! Live-state aggregator for the build/test robot.
//!
//! A [`Monitor`] subscribes to every configured manager, folds the streamed
//! records into one keyed [`Data`] snapshot owned by a [`DataOwner`], and
//! hands the complete snapshot to an [`UpdateHandler`] once per observed
//! change.
mod config;
mod constants;
mod data;
mod errors;
mod managers;
mod metrics;
mod monitor;
mod owner;
mod watch;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use errors::*;
pub use managers::*;
pub use metrics::*;
pub use monitor::*;
pub use owner::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
