//! Benchmark input and its partitioning among workers.

use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Input values are drawn from `0..VALUE_RANGE`.
pub const VALUE_RANGE: i64 = 1000;

/// Seed used unless a runner is given another one.
pub const DEFAULT_SEED: u64 = 0x7473_796e_6331;

/// Splits `0..len` into `threads` contiguous ranges of `len / threads` elements, the last range
/// also taking the remainder.
///
/// # Panics
///
/// Panics if `threads` is zero.
pub fn partition(len: usize, threads: usize) -> Vec<Range<usize>> {
    assert!(threads > 0, "cannot partition among zero threads");
    let per_thread = len / threads;
    (0..threads)
        .map(|i| {
            let start = i * per_thread;
            let end = if i + 1 == threads {
                len
            } else {
                start + per_thread
            };
            start..end
        })
        .collect()
}

/// A sequence of input values and its partitions, one per worker.
#[derive(Debug, Clone)]
pub struct Input {
    values: Vec<i64>,
    ranges: Vec<Range<usize>>,
    seed: u64,
}

impl Default for Input {
    fn default() -> Self {
        Self::from_values(Vec::new(), 1)
    }
}

impl Input {
    /// Draws `size` values from a generator seeded with `seed` and partitions them among
    /// `threads` workers.
    pub fn generate(size: usize, threads: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..size).map(|_| rng.gen_range(0..VALUE_RANGE)).collect();
        Self {
            seed,
            ..Self::from_values(values, threads)
        }
    }

    /// Partitions the given values among `threads` workers.
    pub fn from_values(values: Vec<i64>, threads: usize) -> Self {
        let ranges = partition(values.len(), threads);
        Self {
            values,
            ranges,
            seed: DEFAULT_SEED,
        }
    }

    /// All values.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Index ranges of the partitions.
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Values of partition `index`.
    pub fn partition(&self, index: usize) -> &[i64] {
        &self.values[self.ranges[index].clone()]
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of partitions.
    pub fn threads(&self) -> usize {
        self.ranges.len()
    }

    /// Seed the values were drawn with. Workloads derive per-worker generators from it.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sum of all values.
    pub fn sum(&self) -> i64 {
        self.values.iter().sum()
    }

    /// The values in ascending order.
    pub fn sorted(&self) -> Vec<i64> {
        let mut sorted = self.values.clone();
        sorted.sort_unstable();
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_last_range() {
        assert_eq!(partition(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(partition(2, 4), vec![0..0, 0..0, 0..0, 0..2]);
        assert_eq!(partition(0, 2), vec![0..0, 0..0]);
    }

    #[test]
    fn ranges_cover_input_without_overlap() {
        for len in [0, 1, 7, 1000] {
            for threads in 1..9 {
                let ranges = partition(len, threads);
                assert_eq!(ranges.len(), threads);
                assert_eq!(ranges[0].start, 0);
                assert_eq!(ranges[threads - 1].end, len);
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
            }
        }
    }

    #[test]
    #[should_panic]
    fn zero_threads_panics() {
        let _ = partition(5, 0);
    }

    #[test]
    fn generation_is_reproducible() {
        let a = Input::generate(100, 4, 7);
        let b = Input::generate(100, 2, 7);
        assert_eq!(a.values(), b.values());
        assert!(a.values().iter().all(|v| (0..VALUE_RANGE).contains(v)));
        assert_ne!(a.values(), Input::generate(100, 4, 8).values());
    }
}
