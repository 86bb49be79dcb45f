//! Textual run configuration and policy selection.

use std::env;
use std::io::{self, BufRead};
use std::str::FromStr;

use thiserror::Error;
use tmsync::region::UnknownPolicy;
use tmsync::SyncPolicy;

/// Environment variable consulted when no policy is given on the command line.
pub const POLICY_ENV: &str = "TMSYNC_POLICY";

/// Errors in the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A run line does not have the `<name> <threads> <size> <repeat>` shape.
    #[error("line {line}: expected `<name> <threads> <input size> <repeat count>`, got `{text}`")]
    Malformed {
        /// 1-based line number, or 0 if unknown.
        line: usize,
        /// The offending text.
        text: String,
    },
    /// The policy name is not recognized.
    #[error(transparent)]
    Policy(#[from] UnknownPolicy),
    /// No benchmark is registered under the name.
    #[error("unknown benchmark `{0}`")]
    UnknownBenchmark(String),
    /// A run asked for zero threads.
    #[error("a run needs at least one thread")]
    NoThreads,
    /// A multi-threaded run under the `none` policy.
    #[error("policy `none` cannot run {0} threads")]
    Unsynchronized(usize),
    /// Reading the configuration failed.
    #[error("cannot read configuration: {0}")]
    Io(#[from] io::Error),
}

/// One run line: which benchmark, how many threads, how much input, how many repetitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunSpec {
    /// Benchmark name.
    pub name: String,
    /// Worker threads.
    pub threads: usize,
    /// Number of input values.
    pub input_size: usize,
    /// Repetitions.
    pub repeat: usize,
}

impl RunSpec {
    /// Rejects runs the policy cannot execute.
    pub fn validate(&self, policy: SyncPolicy) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        if self.threads > 1 && !policy.allows_parallel() {
            return Err(ConfigError::Unsynchronized(self.threads));
        }
        Ok(())
    }

    fn parse_line(line: usize, text: &str) -> Result<Self, ConfigError> {
        let malformed = || ConfigError::Malformed {
            line,
            text: text.to_string(),
        };
        let mut fields = text.split_whitespace();
        let name = fields.next().ok_or_else(malformed)?;
        let mut number = || -> Result<usize, ConfigError> {
            fields
                .next()
                .and_then(|field| field.parse().ok())
                .ok_or_else(malformed)
        };
        let threads = number()?;
        let input_size = number()?;
        let repeat = number()?;
        if fields.next().is_some() {
            return Err(malformed());
        }
        Ok(Self {
            name: name.to_string(),
            threads,
            input_size,
            repeat,
        })
    }
}

impl FromStr for RunSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(0, s.trim())
    }
}

/// Parses run lines from `reader`, skipping lines that do not start with an ASCII letter.
pub fn parse_config<R: BufRead>(reader: R) -> impl Iterator<Item = Result<RunSpec, ConfigError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Err(e) => Some(Err(ConfigError::from(e))),
            Ok(line) => {
                let text = line.trim();
                text.starts_with(|c: char| c.is_ascii_alphabetic())
                    .then(|| RunSpec::parse_line(index + 1, text))
            }
        })
}

/// Picks the policy from `arg`, then the [`POLICY_ENV`] variable, then `mutex`.
pub fn select_policy(arg: Option<&str>) -> Result<SyncPolicy, ConfigError> {
    let name = match arg {
        Some(name) => name.to_string(),
        None => match env::var(POLICY_ENV) {
            Ok(name) => name,
            Err(_) => return Ok(SyncPolicy::Exclusive),
        },
    };
    Ok(name.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let text = "# name threads size repeat\n\nArraySumTest 4 1000 3\n  TreeInsertTest 1 10 1 \n";
        let specs: Vec<_> = parse_config(text.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            specs,
            vec![
                RunSpec {
                    name: "ArraySumTest".into(),
                    threads: 4,
                    input_size: 1000,
                    repeat: 3
                },
                RunSpec {
                    name: "TreeInsertTest".into(),
                    threads: 1,
                    input_size: 10,
                    repeat: 1
                },
            ]
        );
    }

    #[test]
    fn malformed_lines_report_line_number() {
        let text = "ArraySumTest 4 1000\nArraySumTest 1 1 1\nListInsertTest four 1 1\n";
        let results: Vec<_> = parse_config(text.as_bytes()).collect();
        assert!(matches!(results[0], Err(ConfigError::Malformed { line: 1, .. })));
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(ConfigError::Malformed { line: 3, .. })));
    }

    #[test]
    fn validate_rejects_unsupported_runs() {
        let spec: RunSpec = "HashInsertTest 2 100 1".parse().unwrap();
        assert!(spec.validate(SyncPolicy::Exclusive).is_ok());
        assert!(matches!(
            spec.validate(SyncPolicy::None),
            Err(ConfigError::Unsynchronized(2))
        ));
        let spec: RunSpec = "HashInsertTest 0 100 1".parse().unwrap();
        assert!(matches!(
            spec.validate(SyncPolicy::Optimistic),
            Err(ConfigError::NoThreads)
        ));
    }

    #[test]
    fn explicit_policy_wins() {
        assert_eq!(select_policy(Some("stm")).unwrap(), SyncPolicy::Optimistic);
        assert!(matches!(
            select_policy(Some("htm")),
            Err(ConfigError::Policy(_))
        ));
    }
}
