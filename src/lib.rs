//! Critical sections with a selectable synchronization discipline.
//!
//! A [`region::Shared`] value owns one piece of shared state and brackets every access to it with
//! the backend chosen at startup through [`region::SyncPolicy`]: no synchronization, one exclusive
//! lock, or speculative regions that run on a private copy and retry transparently on conflict.

#![warn(missing_docs, missing_debug_implementations)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod lock;
pub mod region;

pub use region::{Region, RegionGuard, RegionStats, Shared, SyncPolicy};
