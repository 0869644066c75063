//! Bridges the managers' continuous searches into snapshot upserts.
//!
//! ```text
//! WatchSupervisor::start()
//!   ├─> job.devices    ─┐
//!   ├─> job.workers     │  UpsertHandler<R>
//!   ├─> build.tracks    ├──> DataOwner::upsert() ──> wakes the consumption loop
//!   ├─> ...             │
//!   └─> replay         ─┘
//! ```
//!
//! A stream that ends or fails stays stopped by default; the condition is
//! reported through a `warn!` log, the `monitor_subscription_exits_total`
//! counter and the stream's [`WatchState`]. Re-subscription is opt-in via
//! `watch.restart_on_error`.
mod supervisor;
pub use supervisor::*;
