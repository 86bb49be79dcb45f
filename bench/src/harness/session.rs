use std::time::Instant;

use log::debug;

use super::{Benchmark, Outcome, Report, RunSpec};

/// Runs every repetition of `spec` on `bench`, handing each report to `on_report`.
///
/// A single-thread run uses [`Benchmark::run_sequential`], anything else
/// [`Benchmark::run_threaded`]. Only the run step is timed. Returns `true` if every repetition
/// passed its check.
pub fn run_repetitions<F>(bench: &mut dyn Benchmark, spec: &RunSpec, mut on_report: F) -> bool
where
    F: FnMut(Report),
{
    let mut all_passed = true;
    for repetition in 0..spec.repeat {
        bench.generate(spec.input_size, spec.threads);
        bench.setup();

        let start = Instant::now();
        if spec.threads == 1 {
            bench.run_sequential();
        } else {
            bench.run_threaded();
        }
        let elapsed = start.elapsed();

        let outcome = if bench.check() {
            Outcome::Ok(elapsed)
        } else {
            all_passed = false;
            Outcome::Fail
        };
        bench.teardown();
        debug!("{} repetition {repetition}: {outcome:?}", bench.name());

        on_report(Report {
            spec: spec.clone(),
            repetition,
            outcome,
        });
    }
    all_passed
}
