use std::fmt;
use std::ops::Range;
use std::thread;

use log::{debug, warn};
use tmsync::{RegionStats, Shared, SyncPolicy};

use super::input::{Input, DEFAULT_SEED};
use super::Benchmark;

/// The per-test part of a benchmark: how to build the shared state, what each worker does to it,
/// and how to check the result.
pub trait Workload: Sync {
    /// State shared by all workers.
    type State: Send;

    /// Name under which the workload is registered.
    fn name(&self) -> &'static str;

    /// Builds the initial shared state.
    fn setup(&self, input: &Input) -> Self::State;

    /// Processes `input.values()[range]`, the partition of worker `worker`, bracketing every
    /// access to `shared` with a region. Region bodies may run more than once under
    /// [`SyncPolicy::Optimistic`].
    fn run(&self, shared: &Shared<Self::State>, input: &Input, worker: usize, range: Range<usize>);

    /// Compares the final state against what a sequential execution over `input` produces.
    fn check(&self, input: &Input, state: &mut Self::State) -> bool;
}

/// Drives a [`Workload`] through the benchmark lifecycle under one synchronization policy.
pub struct Runner<W: Workload> {
    workload: W,
    policy: SyncPolicy,
    seed: u64,
    input: Input,
    shared: Option<Shared<W::State>>,
}

impl<W: Workload> fmt::Debug for Runner<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("workload", &self.workload.name())
            .field("policy", &self.policy)
            .field("seed", &self.seed)
            .field("input", &self.input.len())
            .finish()
    }
}

impl<W: Workload> Runner<W> {
    /// Creates a runner for `workload` under `policy`.
    pub fn new(workload: W, policy: SyncPolicy) -> Self {
        Self {
            workload,
            policy,
            seed: DEFAULT_SEED,
            input: Input::default(),
            shared: None,
        }
    }

    /// Uses `seed` for subsequent input generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replaces the generated input with `input`.
    pub fn set_input(&mut self, input: Input) {
        self.input = input;
    }

    /// The current input.
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// The shared state between `setup` and `teardown`.
    pub fn shared(&self) -> Option<&Shared<W::State>> {
        self.shared.as_ref()
    }

    /// Region counters of the current shared state.
    pub fn stats(&self) -> Option<RegionStats> {
        self.shared.as_ref().map(Shared::stats)
    }

    fn run_partition(&self, shared: &Shared<W::State>, worker: usize) {
        let range = self.input.ranges()[worker].clone();
        self.workload.run(shared, &self.input, worker, range);
    }
}

impl<W: Workload> Benchmark for Runner<W> {
    fn name(&self) -> &str {
        self.workload.name()
    }

    fn generate(&mut self, size: usize, threads: usize) {
        self.input = Input::generate(size, threads, self.seed);
        debug!(
            "{}: generated {size} values for {threads} workers (seed {:#x})",
            self.workload.name(),
            self.seed
        );
    }

    fn setup(&mut self) {
        let state = self.workload.setup(&self.input);
        self.shared = Some(Shared::new(self.policy, state));
    }

    fn run_sequential(&mut self) {
        let Some(shared) = &self.shared else {
            return;
        };
        for worker in 0..self.input.threads() {
            self.run_partition(shared, worker);
        }
    }

    fn run_threaded(&mut self) {
        if !self.policy.allows_parallel() && self.input.threads() > 1 {
            warn!(
                "{}: policy `{}` cannot run {} workers concurrently, running them in order",
                self.workload.name(),
                self.policy,
                self.input.threads()
            );
            self.run_sequential();
            return;
        }

        let Some(shared) = &self.shared else {
            return;
        };
        let this = &*self;
        thread::scope(|s| {
            for worker in 0..this.input.threads() {
                let _ = s.spawn(move || this.run_partition(shared, worker));
            }
        });
    }

    fn teardown(&mut self) {
        if let Some(shared) = self.shared.take() {
            let stats = shared.stats();
            debug!(
                "{}: teardown after {} regions, {} conflicts, {} aborts",
                self.workload.name(),
                stats.entries,
                stats.conflicts,
                stats.aborts
            );
        }
    }

    fn check(&mut self) -> bool {
        match self.shared.as_mut() {
            Some(shared) => self.workload.check(&self.input, shared.get_mut()),
            None => false,
        }
    }
}
