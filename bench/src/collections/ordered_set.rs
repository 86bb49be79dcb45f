use std::fmt;

use super::rbtree::Iter;
use super::{Comparator, InvariantViolation, NaturalOrder, Position, PositionError, RbTree};

/// An ordered multiset of keys.
#[derive(Clone)]
pub struct OrderedSet<K, C = NaturalOrder> {
    tree: RbTree<K, C>,
}

impl<K> OrderedSet<K> {
    /// Creates an empty set in the natural order of `K`.
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, C: Default> Default for OrderedSet<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, C> OrderedSet<K, C> {
    /// Creates an empty set ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::with_comparator(cmp),
        }
    }

    /// Number of keys, counting duplicates.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The key at `pos`.
    pub fn get(&self, pos: Position) -> Result<&K, PositionError> {
        self.tree.get(pos)
    }

    /// Position of the smallest key.
    pub fn minimum(&self) -> Option<Position> {
        self.tree.minimum()
    }

    /// Position of the largest key.
    pub fn maximum(&self) -> Option<Position> {
        self.tree.maximum()
    }

    /// Position after `pos` in key order.
    pub fn next(&self, pos: Position) -> Result<Position, PositionError> {
        self.tree.successor(pos)
    }

    /// Position before `pos` in key order.
    pub fn prev(&self, pos: Position) -> Result<Position, PositionError> {
        self.tree.predecessor(pos)
    }

    /// Removes the key at `pos`, returning it with the position that followed it.
    pub fn remove(&mut self, pos: Position) -> Result<(K, Position), PositionError> {
        self.tree.remove(pos)
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Iterates over the keys in order.
    pub fn iter(&self) -> Iter<'_, K, C> {
        self.tree.iter()
    }
}

impl<K, C: Comparator<K>> OrderedSet<K, C> {
    /// Inserts `key`, replacing an equal key if present.
    pub fn insert(&mut self, key: K) -> Position {
        self.tree.insert(key)
    }

    /// Inserts `key` after any equal keys.
    pub fn insert_multi(&mut self, key: K) -> Position {
        self.tree.insert_multi(key)
    }

    /// Position of the first key equal to `key`.
    pub fn find(&self, key: &K) -> Option<Position> {
        self.tree.find(key)
    }

    /// Returns `true` if some key equals `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Number of keys equal to `key`.
    pub fn count(&self, key: &K) -> usize {
        let mut count = 0;
        let mut cursor = self.find(key);
        while let Some(pos) = cursor {
            match self.tree.get(pos) {
                Ok(found) if self.tree.comparator().compare(found, key).is_eq() => count += 1,
                _ => break,
            }
            cursor = self.tree.successor(pos).ok().filter(|next| !next.is_end());
        }
        count
    }

    /// Removes every key equal to `key`, returning how many were removed.
    pub fn remove_all(&mut self, key: &K) -> usize {
        let mut removed = 0;
        let mut cursor = self.find(key);
        while let Some(pos) = cursor {
            match self.tree.get(pos) {
                Ok(found) if self.tree.comparator().compare(found, key).is_eq() => {}
                _ => break,
            }
            let Ok((_, next)) = self.tree.remove(pos) else {
                break;
            };
            removed += 1;
            cursor = (!next.is_end()).then_some(next);
        }
        removed
    }

    /// Removes and returns the first key equal to `key`, or `K::default()` if there is none.
    pub fn take(&mut self, key: &K) -> K
    where
        K: Default,
    {
        self.find(key)
            .and_then(|pos| self.tree.remove(pos).ok())
            .map(|(key, _)| key)
            .unwrap_or_default()
    }

    /// Checks the balancing invariants, returning the black height.
    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        self.tree.validate()
    }
}

impl<K: fmt::Debug, C> fmt::Debug for OrderedSet<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, K, C> IntoIterator for &'a OrderedSet<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, C: Comparator<K> + Default> FromIterator<K> for OrderedSet<K, C> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<K, C: Comparator<K>> Extend<K> for OrderedSet<K, C> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            let _ = self.insert(key);
        }
    }
}
