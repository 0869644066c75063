//! Consumption loop: one update round per observed change.
//!
//! ```text
//! read() ──> generation += 1 ──> update(managers, data) ──> wait_for_change()
//!   ^                                                            │
//!   └──────────────────── writes applied while parked ───────────┘
//! ```
mod monitor;
pub use monitor::*;
