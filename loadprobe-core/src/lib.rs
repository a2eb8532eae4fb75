//! Core types for `loadprobe`.
//!
//! Everything here is I/O free: run configuration, the per-request
//! [`RequestOutcome`], and the reduction of a batch of outcomes into a
//! [`RunSummary`].
mod config;
mod constants;
mod outcome;
mod stats;

pub use config::*;
pub use constants::*;
pub use outcome::*;
pub use stats::*;
