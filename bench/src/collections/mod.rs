//! Single-threaded containers used as the shared state of benchmark workloads.
//!
//! Node-based containers store their nodes in an index arena. Positions handed out by them are
//! `(slot, stamp)` pairs: every allocation draws a fresh stamp from a counter owned by the
//! container, so a position stays valid until the element it names is removed (or the container is
//! cleared or rebuilt), and a stale position is reported instead of silently aliasing a reused slot.

mod chained_map;
mod compare;
mod dyn_array;
mod linked_list;
mod ordered_map;
mod ordered_set;
mod rbtree;

use thiserror::Error;

pub use chained_map::{ChainedMap, DefaultHashBuilder, Iter as MapIter};
pub use compare::{ByKey, Comparator, NaturalOrder};
pub use dyn_array::DynArray;
pub use linked_list::{Iter as ListIter, LinkedList};
pub use ordered_map::OrderedMap;
pub use ordered_set::OrderedSet;
pub use rbtree::{InvariantViolation, Iter as TreeIter, RbTree};

/// Why a position could not be resolved to an element.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    /// The element was removed, or the container was cleared or rebuilt since.
    #[error("position refers to an element that no longer exists")]
    Stale,
    /// The end position does not name an element.
    #[error("the end position has no element")]
    End,
}

/// A handle to an element of a node-based container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    index: usize,
    stamp: u64,
}

impl Position {
    /// The position one past the last element.
    pub const END: Position = Position {
        index: usize::MAX,
        stamp: 0,
    };

    pub(crate) const fn new(index: usize, stamp: u64) -> Self {
        Self { index, stamp }
    }

    /// Returns `true` for the end position.
    pub fn is_end(self) -> bool {
        self == Self::END
    }

    pub(crate) fn index(self) -> usize {
        self.index
    }

    pub(crate) fn stamp(self) -> u64 {
        self.stamp
    }
}

/// Monotonic source of allocation stamps. Zero is reserved for vacant slots and sentinels.
#[derive(Debug, Clone)]
pub(crate) struct Stamps(u64);

impl Stamps {
    pub(crate) const fn new() -> Self {
        Self(1)
    }

    pub(crate) fn next(&mut self) -> u64 {
        let stamp = self.0;
        self.0 += 1;
        stamp
    }
}

impl Default for Stamps {
    fn default() -> Self {
        Self::new()
    }
}
