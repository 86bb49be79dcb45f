//! Collections and a partitioned benchmark harness for comparing synchronization policies.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod collections;
pub mod harness;
pub mod test;

pub use collections::{
    ChainedMap, DynArray, LinkedList, OrderedMap, OrderedSet, Position, PositionError, RbTree,
};
pub use harness::{Benchmark, Registry, Runner, Workload};
