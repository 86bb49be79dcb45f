use std::fmt;

use super::rbtree::Iter;
use super::{ByKey, Comparator, InvariantViolation, NaturalOrder, Position, PositionError, RbTree};

/// An ordered multimap from keys to values.
#[derive(Clone)]
pub struct OrderedMap<K, V, C = NaturalOrder> {
    tree: RbTree<(K, V), ByKey<C>>,
}

impl<K, V> OrderedMap<K, V> {
    /// Creates an empty map in the natural order of `K`.
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K, V, C: Default> Default for OrderedMap<K, V, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, V, C> OrderedMap<K, V, C> {
    /// Creates an empty map whose keys are ordered by `cmp`.
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            tree: RbTree::with_comparator(ByKey(cmp)),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The entry at `pos`.
    pub fn get(&self, pos: Position) -> Result<(&K, &V), PositionError> {
        self.tree.get(pos).map(|(key, value)| (key, value))
    }

    /// The value of the entry at `pos`, mutably.
    pub fn value_mut(&mut self, pos: Position) -> Result<&mut V, PositionError> {
        self.tree.get_mut(pos).map(|(_, value)| value)
    }

    /// Position of the entry with the smallest key.
    pub fn minimum(&self) -> Option<Position> {
        self.tree.minimum()
    }

    /// Position of the entry with the largest key.
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

    /// Removes the entry at `pos`, returning it with the position that followed it.
    pub fn remove(&mut self, pos: Position) -> Result<((K, V), Position), PositionError> {
        self.tree.remove(pos)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + '_ {
        self.entries().map(|(key, value)| (key, value))
    }

    /// Iterates over the keys in order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.entries().map(|(key, _)| key)
    }

    /// Iterates over the values in key order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.entries().map(|(_, value)| value)
    }

    fn entries(&self) -> Iter<'_, (K, V), ByKey<C>> {
        self.tree.iter()
    }
}

impl<K, V, C: Comparator<K>> OrderedMap<K, V, C> {
    /// Inserts `key` with `value`, replacing the entry with an equal key if present.
    pub fn insert(&mut self, key: K, value: V) -> Position {
        self.tree.insert((key, value))
    }

    /// Inserts `key` with `value` after any entries with an equal key.
    pub fn insert_multi(&mut self, key: K, value: V) -> Position {
        self.tree.insert_multi((key, value))
    }

    /// Position of the first entry with `key`.
    pub fn find(&self, key: &K) -> Option<Position> {
        let ByKey(cmp) = self.tree.comparator();
        self.tree.find_by(|(stored, _)| cmp.compare(stored, key))
    }

    /// Position of the first entry with `key` and `value`.
    pub fn find_value(&self, key: &K, value: &V) -> Option<Position>
    where
        V: PartialEq,
    {
        self.equal_range(key)
            .find(|(_, (_, v))| *v == value)
            .map(|(pos, _)| pos)
    }

    /// Returns `true` if some entry has `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Returns `true` if some entry has `key` and `value`.
    pub fn contains_value(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.find_value(key, value).is_some()
    }

    /// Number of entries with `key`.
    pub fn count(&self, key: &K) -> usize {
        self.equal_range(key).count()
    }

    /// Number of entries with `key` and `value`.
    pub fn count_value(&self, key: &K, value: &V) -> usize
    where
        V: PartialEq,
    {
        self.equal_range(key)
            .filter(|(_, (_, v))| *v == value)
            .count()
    }

    /// Removes every entry with `key`, returning how many were removed.
    pub fn remove_all(&mut self, key: &K) -> usize {
        let mut removed = 0;
        while let Some(pos) = self.find(key) {
            if self.tree.remove(pos).is_err() {
                break;
            }
            removed += 1;
        }
        removed
    }

    /// Removes the first entry with `key` and returns its value, or `V::default()` if there is
    /// none.
    pub fn take(&mut self, key: &K) -> V
    where
        V: Default,
    {
        self.find(key)
            .and_then(|pos| self.tree.remove(pos).ok())
            .map(|((_, value), _)| value)
            .unwrap_or_default()
    }

    /// Checks the balancing invariants, returning the black height.
    pub fn validate(&self) -> Result<usize, InvariantViolation> {
        self.tree.validate()
    }

    /// Positions and entries with `key`, in insertion order.
    fn equal_range<'a>(&'a self, key: &'a K) -> impl Iterator<Item = (Position, (&'a K, &'a V))> {
        let ByKey(cmp) = self.tree.comparator();
        let mut cursor = self.find(key);
        std::iter::from_fn(move || {
            let pos = cursor?;
            let (k, v) = self.tree.get(pos).ok()?;
            if !cmp.compare(k, key).is_eq() {
                return None;
            }
            cursor = self.tree.successor(pos).ok().filter(|next| !next.is_end());
            Some((pos, (k, v)))
        })
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for OrderedMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C: Comparator<K> + Default> FromIterator<(K, V)> for OrderedMap<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (key, value) in iter {
            let _ = map.insert(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_value() {
        let mut map = OrderedMap::<&str, i32>::new();
        let a = map.insert("a", 1);
        let _ = map.insert("a", 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(a), Ok((&"a", &2)));
        *map.value_mut(a).unwrap() += 1;
        assert_eq!(map.take(&"a"), 3);
        assert_eq!(map.take(&"a"), 0);
    }

    #[test]
    fn multimap_queries() {
        let mut map = OrderedMap::<i32, char>::new();
        for (k, v) in [(2, 'x'), (1, 'a'), (2, 'y'), (2, 'x'), (3, 'z')] {
            let _ = map.insert_multi(k, v);
        }
        assert_eq!(map.count(&2), 3);
        assert_eq!(map.count_value(&2, &'x'), 2);
        assert!(map.contains_value(&2, &'y'));
        assert!(!map.contains_value(&1, &'y'));
        let pos = map.find_value(&2, &'y').unwrap();
        assert_eq!(map.get(pos), Ok((&2, &'y')));
        assert!(map.values().copied().eq("axyxz".chars()));
        assert_eq!(map.remove_all(&2), 3);
        assert!(map.keys().copied().eq([1, 3]));
        assert!(map.validate().is_ok());
    }
}
