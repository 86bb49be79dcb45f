//! Built-in workloads, one per collection.

use std::ops::Range;

use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tmsync::Shared;

use super::{Input, Workload};
use crate::collections::{ChainedMap, DynArray, LinkedList, OrderedSet};

/// Largest bucket count `HashInsertTest` reserves up front.
const HASH_RESERVE_LIMIT: usize = 1 << 20;

/// Every worker adds its values to one shared sum.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArraySumTest;

impl Workload for ArraySumTest {
    type State = i64;

    fn name(&self) -> &'static str {
        "ArraySumTest"
    }

    fn setup(&self, _input: &Input) -> i64 {
        0
    }

    fn run(&self, shared: &Shared<i64>, input: &Input, _worker: usize, range: Range<usize>) {
        for &value in &input.values()[range] {
            shared.critical(|sum| *sum += value);
        }
    }

    fn check(&self, input: &Input, sum: &mut i64) -> bool {
        *sum == input.sum()
    }
}

/// Every worker appends its values to one shared array.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArrayInsertTest;

impl Workload for ArrayInsertTest {
    type State = DynArray<i64>;

    fn name(&self) -> &'static str {
        "ArrayInsertTest"
    }

    fn setup(&self, _input: &Input) -> DynArray<i64> {
        DynArray::new()
    }

    fn run(&self, shared: &Shared<DynArray<i64>>, input: &Input, _: usize, range: Range<usize>) {
        for &value in &input.values()[range] {
            shared.critical(|array| array.push_back(value));
        }
    }

    fn check(&self, input: &Input, array: &mut DynArray<i64>) -> bool {
        array.as_mut_slice().sort_unstable();
        array.as_slice() == input.sorted().as_slice()
    }
}

/// Every worker pushes each value at a randomly chosen end of one shared list.
#[derive(Debug, Default, Clone, Copy)]
pub struct ListInsertTest;

impl Workload for ListInsertTest {
    type State = LinkedList<i64>;

    fn name(&self) -> &'static str {
        "ListInsertTest"
    }

    fn setup(&self, _input: &Input) -> LinkedList<i64> {
        LinkedList::new()
    }

    fn run(&self, shared: &Shared<LinkedList<i64>>, input: &Input, worker: usize, range: Range<usize>) {
        let mut rng = StdRng::seed_from_u64(input.seed() ^ (worker as u64 + 1));
        for &value in &input.values()[range] {
            let front = rng.gen_bool(0.5);
            let _ = shared.critical(|list| {
                if front {
                    list.push_front(value)
                } else {
                    list.push_back(value)
                }
            });
        }
    }

    fn check(&self, input: &Input, list: &mut LinkedList<i64>) -> bool {
        list.len() == input.len() && list.iter().copied().sorted_unstable().eq(input.sorted())
    }
}

/// Every worker inserts its values into one shared ordered multiset.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeInsertTest;

impl Workload for TreeInsertTest {
    type State = OrderedSet<i64>;

    fn name(&self) -> &'static str {
        "TreeInsertTest"
    }

    fn setup(&self, _input: &Input) -> OrderedSet<i64> {
        OrderedSet::new()
    }

    fn run(&self, shared: &Shared<OrderedSet<i64>>, input: &Input, _: usize, range: Range<usize>) {
        for &value in &input.values()[range] {
            let _ = shared.critical(|set| set.insert_multi(value));
        }
    }

    fn check(&self, input: &Input, set: &mut OrderedSet<i64>) -> bool {
        set.validate().is_ok() && set.iter().copied().eq(input.sorted())
    }
}

/// The shared multiset starts with every value; every worker removes all copies of its values.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeRemoveTest;

impl Workload for TreeRemoveTest {
    type State = OrderedSet<i64>;

    fn name(&self) -> &'static str {
        "TreeRemoveTest"
    }

    fn setup(&self, input: &Input) -> OrderedSet<i64> {
        let mut set = OrderedSet::new();
        for &value in input.values() {
            let _ = set.insert_multi(value);
        }
        set
    }

    fn run(&self, shared: &Shared<OrderedSet<i64>>, input: &Input, _: usize, range: Range<usize>) {
        for value in &input.values()[range] {
            let _ = shared.critical(|set| set.remove_all(value));
        }
    }

    fn check(&self, _input: &Input, set: &mut OrderedSet<i64>) -> bool {
        set.is_empty() && set.validate().is_ok()
    }
}

/// Every worker inserts its values as keys of one shared hash multimap.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashInsertTest;

impl Workload for HashInsertTest {
    type State = ChainedMap<i64, i64>;

    fn name(&self) -> &'static str {
        "HashInsertTest"
    }

    fn setup(&self, input: &Input) -> ChainedMap<i64, i64> {
        let mut map = ChainedMap::new();
        map.reserve(input.len().min(HASH_RESERVE_LIMIT));
        map
    }

    fn run(&self, shared: &Shared<ChainedMap<i64, i64>>, input: &Input, _: usize, range: Range<usize>) {
        for &value in &input.values()[range] {
            let _ = shared.critical(|map| map.insert_multi(value, 0));
        }
    }

    fn check(&self, input: &Input, map: &mut ChainedMap<i64, i64>) -> bool {
        map.len() == input.len() && map.keys().copied().sorted_unstable().eq(input.sorted())
    }
}
