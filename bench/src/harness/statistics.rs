//! Per-repetition reports and their aggregation.

use std::fmt;
use std::time::Duration;

use tmsync::SyncPolicy;

use super::RunSpec;

/// Result of one repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The check passed; the run step took this long.
    Ok(Duration),
    /// The check failed.
    Fail,
}

/// Report for one repetition of a run line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// The run line.
    pub spec: RunSpec,
    /// 0-based repetition index.
    pub repetition: usize,
    /// What happened.
    pub outcome: Outcome,
}

impl Report {
    /// Returns `true` if this is the last repetition of its run line.
    pub fn is_last(&self) -> bool {
        self.repetition + 1 >= self.spec.repeat
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Ok(elapsed) => write!(
                f,
                "OK {} ms, {} ops/s",
                elapsed.as_millis(),
                ops_per_sec(self.spec.input_size, elapsed)
            ),
            Outcome::Fail => f.write_str("FAIL"),
        }
    }
}

/// Operations per second for `ops` operations taking `elapsed`.
pub fn ops_per_sec(ops: usize, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0;
    }
    (ops as f64 / secs).round() as u64
}

/// Aggregate of the repetitions of one run line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Repetitions that passed.
    pub passed: usize,
    /// Repetitions that failed.
    pub failed: usize,
    /// Total run time of the passing repetitions.
    pub total: Duration,
}

impl Summary {
    /// Mean run time of the passing repetitions.
    pub fn average(&self) -> Option<Duration> {
        let passed = u32::try_from(self.passed).ok().filter(|n| *n > 0)?;
        Some(self.total / passed)
    }

    /// Summary line for `spec` under `policy`.
    pub fn line(&self, spec: &RunSpec, policy: SyncPolicy) -> String {
        match self.average() {
            Some(average) if self.failed == 0 => format!(
                "> {} {} OK {} {} {} {} {}",
                spec.name,
                policy.label(),
                spec.input_size,
                spec.threads,
                spec.repeat,
                average.as_millis(),
                ops_per_sec(spec.input_size, average)
            ),
            _ => format!("> {} fail", spec.name),
        }
    }
}

/// Summaries of every run line seen so far, in the order the lines ran.
///
/// Each run line gets its own summary, even when the same line appears twice in a config.
#[derive(Debug, Default)]
pub struct Statistics {
    runs: Vec<(RunSpec, Summary)>,
}

impl Statistics {
    /// Starts a fresh summary for a run line that is about to run.
    pub fn begin(&mut self, spec: &RunSpec) {
        self.runs.push((spec.clone(), Summary::default()));
    }

    /// Adds a report to the statistics, returning the updated summary of its run line.
    ///
    /// The report belongs to the latest line begun with the same spec. A report with no such line
    /// begins one.
    pub fn add_report(&mut self, report: &Report) -> Summary {
        let index = match self.runs.iter().rposition(|(spec, _)| *spec == report.spec) {
            Some(index) => index,
            None => {
                self.begin(&report.spec);
                self.runs.len() - 1
            }
        };

        let summary = &mut self.runs[index].1;
        match report.outcome {
            Outcome::Ok(elapsed) => {
                summary.passed += 1;
                summary.total += elapsed;
            }
            Outcome::Fail => summary.failed += 1,
        }
        *summary
    }

    /// Summary of the latest run line with `spec`.
    pub fn summary(&self, spec: &RunSpec) -> Option<&Summary> {
        self.runs
            .iter()
            .rev()
            .find(|(run, _)| run == spec)
            .map(|(_, summary)| summary)
    }

    /// Number of run lines seen.
    pub fn runs(&self) -> usize {
        self.runs.len()
    }

    /// Run lines with at least one failed repetition.
    pub fn failures(&self) -> impl Iterator<Item = &RunSpec> + '_ {
        self.runs
            .iter()
            .filter(|(_, summary)| summary.failed > 0)
            .map(|(spec, _)| spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(repeat: usize) -> RunSpec {
        RunSpec {
            name: "ArraySumTest".into(),
            threads: 2,
            input_size: 1000,
            repeat,
        }
    }

    #[test]
    fn summary_line_averages_passing_runs() {
        let mut stats = Statistics::default();
        for (repetition, ms) in [10, 30].into_iter().enumerate() {
            let _ = stats.add_report(&Report {
                spec: spec(2),
                repetition,
                outcome: Outcome::Ok(Duration::from_millis(ms)),
            });
        }
        let summary = stats.summary(&spec(2)).copied().unwrap();
        assert_eq!(summary.average(), Some(Duration::from_millis(20)));
        assert_eq!(
            summary.line(&spec(2), SyncPolicy::Optimistic),
            "> ArraySumTest TM OK 1000 2 2 20 50000"
        );
        assert_eq!(stats.failures().count(), 0);
    }

    #[test]
    fn any_failure_fails_the_line() {
        let mut stats = Statistics::default();
        let report = Report {
            spec: spec(1),
            repetition: 0,
            outcome: Outcome::Fail,
        };
        assert!(report.is_last());
        assert_eq!(report.to_string(), "FAIL");
        let summary = stats.add_report(&report);
        assert_eq!(summary.line(&spec(1), SyncPolicy::Exclusive), "> ArraySumTest fail");
        assert_eq!(stats.failures().count(), 1);
    }

    #[test]
    fn repeated_run_lines_are_summarized_separately() {
        let mut stats = Statistics::default();

        stats.begin(&spec(1));
        let first = stats.add_report(&Report {
            spec: spec(1),
            repetition: 0,
            outcome: Outcome::Fail,
        });
        assert_eq!(first.line(&spec(1), SyncPolicy::Optimistic), "> ArraySumTest fail");

        stats.begin(&spec(1));
        let second = stats.add_report(&Report {
            spec: spec(1),
            repetition: 0,
            outcome: Outcome::Ok(Duration::from_millis(10)),
        });
        assert_eq!(
            second.line(&spec(1), SyncPolicy::Optimistic),
            "> ArraySumTest TM OK 1000 2 1 10 100000"
        );

        assert_eq!(stats.runs(), 2);
        assert_eq!(stats.summary(&spec(1)), Some(&second));
        assert_eq!(stats.failures().count(), 1);
    }
}
