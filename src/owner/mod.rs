//! Synchronization boundary around the aggregated [`Data`](crate::Data).
//!
//! Writers and the single reader share one exclusive region. The reader holds
//! it across its whole update round and only lets writers in while parked in
//! [`DataGuard::wait_for_change`], so an update round never observes a
//! partially applied mutation.
mod data_owner;
pub use data_owner::*;
