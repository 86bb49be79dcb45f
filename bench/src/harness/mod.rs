//! Partitioned benchmark harness.
//!
//! A benchmark goes through `generate → setup → run → check → teardown` once per repetition. The
//! run step either processes every partition on the calling thread or spawns one worker per
//! partition; in both cases each access to the shared collection is bracketed by a region of the
//! selected [`SyncPolicy`](tmsync::SyncPolicy).

mod bank;
mod config;
mod input;
mod registry;
mod runner;
mod session;
mod statistics;
mod workloads;

pub use bank::{Bank, BankTest, Declined};
pub use config::{parse_config, select_policy, ConfigError, RunSpec, POLICY_ENV};
pub use input::{partition, Input, DEFAULT_SEED, VALUE_RANGE};
pub use registry::{Constructor, Registry};
pub use runner::{Runner, Workload};
pub use session::run_repetitions;
pub use statistics::{ops_per_sec, Outcome, Report, Statistics, Summary};
pub use workloads::{
    ArrayInsertTest, ArraySumTest, HashInsertTest, ListInsertTest, TreeInsertTest, TreeRemoveTest,
};

/// Lifecycle of one benchmark.
pub trait Benchmark {
    /// Name under which the benchmark is registered.
    fn name(&self) -> &str;

    /// Generates `size` input values and splits them among `threads` workers.
    fn generate(&mut self, size: usize, threads: usize);

    /// Builds a fresh shared state.
    fn setup(&mut self);

    /// Runs every partition on the calling thread, in order.
    fn run_sequential(&mut self);

    /// Runs one worker thread per partition and waits for all of them.
    fn run_threaded(&mut self);

    /// Releases the shared state.
    fn teardown(&mut self);

    /// Returns `true` if the shared state matches a sequential execution.
    fn check(&mut self) -> bool;
}
