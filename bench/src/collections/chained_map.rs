use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault, Hash};
use std::mem;

use log::debug;

use super::{DynArray, Position, PositionError, Stamps};

/// Hasher used when none is given.
pub type DefaultHashBuilder = BuildHasherDefault<DefaultHasher>;

const MIN_BUCKETS: usize = 1024;
const MAX_BUCKETS: usize = 1 << (usize::BITS - 1);
const NIL: usize = usize::MAX;

#[derive(Clone, Copy)]
struct Slot<K, V> {
    entry: Option<(K, V)>,
    next: usize,
    stamp: u64,
}

impl<K, V> Default for Slot<K, V> {
    fn default() -> Self {
        Self {
            entry: None,
            next: NIL,
            stamp: 0,
        }
    }
}

/// A separately chained hash multimap.
///
/// The first `bucket_count` slots are chain heads and hold no entry. Each chain is kept sorted by
/// key, so lookups stop at the first larger key and equal keys stay adjacent in insertion order.
#[derive(Clone)]
pub struct ChainedMap<K, V, S = DefaultHashBuilder> {
    slots: DynArray<Slot<K, V>>,
    free: Vec<usize>,
    mask: usize,
    len: usize,
    stamps: Stamps,
    hasher: S,
}

/// An iterator over the entries of a `ChainedMap`, bucket by bucket.
pub struct Iter<'a, K, V, S> {
    map: &'a ChainedMap<K, V, S>,
    bucket: usize,
    cursor: usize,
    remaining: usize,
}

impl<K, V, S> fmt::Debug for Iter<'_, K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Iter").field(&self.remaining).finish()
    }
}

fn bucket_count_for(requested: usize) -> usize {
    if requested <= MIN_BUCKETS {
        MIN_BUCKETS
    } else if requested >= MAX_BUCKETS {
        MAX_BUCKETS
    } else {
        requested.next_power_of_two()
    }
}

impl<K: Ord + Hash, V> ChainedMap<K, V, DefaultHashBuilder> {
    /// Creates an empty map with the minimum number of buckets.
    pub fn new() -> Self {
        Self::with_buckets(MIN_BUCKETS)
    }

    /// Creates an empty map with at least `buckets` buckets.
    pub fn with_buckets(buckets: usize) -> Self {
        Self::with_buckets_and_hasher(buckets, DefaultHashBuilder::default())
    }
}

impl<K: Ord + Hash, V> Default for ChainedMap<K, V, DefaultHashBuilder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainedMap<K, V, S> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chain heads.
    pub fn bucket_count(&self) -> usize {
        self.mask + 1
    }

    /// The entry at `pos`.
    pub fn get(&self, pos: Position) -> Result<(&K, &V), PositionError> {
        let index = self.resolve(pos)?;
        let (key, value) = self.entry(index);
        Ok((key, value))
    }

    /// The value of the entry at `pos`, mutably.
    pub fn value_mut(&mut self, pos: Position) -> Result<&mut V, PositionError> {
        let index = self.resolve(pos)?;
        match &mut self.slots[index].entry {
            Some((_, value)) => Ok(value),
            None => Err(PositionError::Stale),
        }
    }

    /// Position of the first entry in iteration order.
    pub fn begin(&self) -> Position {
        self.first_from_bucket(0)
    }

    /// Removes every entry. Outstanding positions become stale.
    pub fn clear(&mut self) {
        let heads = self.bucket_count();
        self.slots.resize(heads);
        for head in self.slots.iter_mut() {
            head.next = NIL;
        }
        self.free.clear();
        self.len = 0;
    }

    /// Iterates over all entries. Entries of one chain come out in key order.
    pub fn iter(&self) -> Iter<'_, K, V, S> {
        Iter {
            map: self,
            bucket: 0,
            cursor: self.slots[0].next,
            remaining: self.len,
        }
    }

    /// Iterates over all keys.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    fn entry(&self, index: usize) -> &(K, V) {
        match &self.slots[index].entry {
            Some(entry) => entry,
            None => unreachable!("chains only link occupied slots"),
        }
    }

    fn position_of(&self, index: usize) -> Position {
        Position::new(index, self.slots[index].stamp)
    }

    fn resolve(&self, pos: Position) -> Result<usize, PositionError> {
        if pos.is_end() {
            return Err(PositionError::End);
        }
        match self.slots.get(pos.index()) {
            Some(slot) if slot.stamp != 0 && slot.stamp == pos.stamp() => Ok(pos.index()),
            _ => Err(PositionError::Stale),
        }
    }

    fn first_from_bucket(&self, bucket: usize) -> Position {
        (bucket..self.bucket_count())
            .map(|head| self.slots[head].next)
            .find(|&first| first != NIL)
            .map_or(Position::END, |first| self.position_of(first))
    }

    fn alloc(&mut self, key: K, value: V, next: usize) -> usize {
        let slot = Slot {
            entry: Some((key, value)),
            next,
            stamp: self.stamps.next(),
        };
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                index
            }
            None => {
                self.slots.push_back(slot);
                self.slots.len() - 1
            }
        }
    }

    /// Unlinks `index`, whose predecessor in the chain is `prev`.
    fn unlink(&mut self, prev: usize, index: usize) -> Option<(K, V)> {
        self.slots[prev].next = self.slots[index].next;
        let slot = mem::take(&mut self.slots[index]);
        self.free.push(index);
        self.len -= 1;
        slot.entry
    }
}

impl<K: Ord + Hash, V, S: BuildHasher> ChainedMap<K, V, S> {
    /// Creates an empty map with the minimum number of buckets and the given hasher.
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_buckets_and_hasher(MIN_BUCKETS, hasher)
    }

    /// Creates an empty map with at least `buckets` buckets and the given hasher.
    ///
    /// The bucket count is rounded up to a power of two, at least 1024.
    pub fn with_buckets_and_hasher(buckets: usize, hasher: S) -> Self {
        let count = bucket_count_for(buckets);
        let mut slots = DynArray::with_capacity(count);
        slots.resize(count);
        Self {
            slots,
            free: Vec::new(),
            mask: count - 1,
            len: 0,
            stamps: Stamps::new(),
            hasher,
        }
    }

    fn bucket(&self, key: &K) -> usize {
        self.hasher.hash_one(key) as usize & self.mask
    }

    /// Last slot of the chain of `key` whose key compares `<= key` (or `< key` if `strict`),
    /// falling back to the chain head.
    fn last_before(&self, key: &K, strict: bool) -> usize {
        let mut prev = self.bucket(key);
        loop {
            let next = self.slots[prev].next;
            if next == NIL {
                return prev;
            }
            let advance = if strict {
                self.entry(next).0 < *key
            } else {
                self.entry(next).0 <= *key
            };
            if !advance {
                return prev;
            }
            prev = next;
        }
    }

    /// Position of the first entry with `key`.
    pub fn find(&self, key: &K) -> Option<Position> {
        let next = self.slots[self.last_before(key, true)].next;
        (next != NIL && self.entry(next).0 == *key).then(|| self.position_of(next))
    }

    /// Position of the first entry with `key` and `value`.
    pub fn find_value(&self, key: &K, value: &V) -> Option<Position>
    where
        V: PartialEq,
    {
        let mut cursor = self.slots[self.last_before(key, true)].next;
        while cursor != NIL {
            let (k, v) = self.entry(cursor);
            if k != key {
                break;
            }
            if v == value {
                return Some(self.position_of(cursor));
            }
            cursor = self.slots[cursor].next;
        }
        None
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
        let mut cursor = self.slots[self.last_before(key, true)].next;
        let mut count = 0;
        while cursor != NIL && self.entry(cursor).0 == *key {
            count += 1;
            cursor = self.slots[cursor].next;
        }
        count
    }

    /// Number of entries with `key` and `value`.
    pub fn count_value(&self, key: &K, value: &V) -> usize
    where
        V: PartialEq,
    {
        let mut cursor = self.slots[self.last_before(key, true)].next;
        let mut count = 0;
        while cursor != NIL {
            let (k, v) = self.entry(cursor);
            if k != key {
                break;
            }
            count += usize::from(v == value);
            cursor = self.slots[cursor].next;
        }
        count
    }

    /// Inserts `key` with `value`, replacing the value of an existing entry with that key.
    pub fn insert(&mut self, key: K, value: V) -> Position {
        let prev = self.last_before(&key, false);
        if let Some((k, v)) = &mut self.slots[prev].entry {
            if *k == key {
                *v = value;
                return self.position_of(prev);
            }
        }
        self.link_after(prev, key, value)
    }

    /// Inserts `key` with `value` after any existing entries with that key.
    pub fn insert_multi(&mut self, key: K, value: V) -> Position {
        let prev = self.last_before(&key, false);
        self.link_after(prev, key, value)
    }

    fn link_after(&mut self, prev: usize, key: K, value: V) -> Position {
        let next = self.slots[prev].next;
        let index = self.alloc(key, value, next);
        self.slots[prev].next = index;
        self.len += 1;
        self.position_of(index)
    }

    /// Position following `pos` in iteration order.
    pub fn next(&self, pos: Position) -> Result<Position, PositionError> {
        let index = self.resolve(pos)?;
        Ok(self.following(index))
    }

    fn following(&self, index: usize) -> Position {
        match self.slots[index].next {
            NIL => self.first_from_bucket(self.bucket(&self.entry(index).0) + 1),
            next => self.position_of(next),
        }
    }

    /// Removes the entry at `pos`, returning it with the position that followed it.
    pub fn remove(&mut self, pos: Position) -> Result<((K, V), Position), PositionError> {
        let index = self.resolve(pos)?;
        let mut prev = self.bucket(&self.entry(index).0);
        while self.slots[prev].next != index {
            prev = self.slots[prev].next;
            if prev == NIL {
                return Err(PositionError::Stale);
            }
        }

        let next = self.following(index);
        let entry = self.unlink(prev, index).ok_or(PositionError::Stale)?;
        Ok((entry, next))
    }

    /// Removes every entry with `key`, returning how many were removed.
    pub fn remove_all(&mut self, key: &K) -> usize {
        let prev = self.last_before(key, true);
        let mut removed = 0;
        loop {
            let next = self.slots[prev].next;
            if next == NIL || self.entry(next).0 != *key {
                return removed;
            }
            let _ = self.unlink(prev, next);
            removed += 1;
        }
    }

    /// Rebuilds the map with room for `buckets` buckets.
    ///
    /// Does nothing unless `buckets` exceeds the current bucket count. Entries keep their relative
    /// order within equal keys, and every outstanding position becomes stale.
    pub fn reserve(&mut self, buckets: usize)
    where
        S: Clone,
    {
        if buckets <= self.bucket_count() {
            return;
        }
        let mut rebuilt = Self::with_buckets_and_hasher(buckets, self.hasher.clone());
        rebuilt.stamps = self.stamps.clone();
        for head in 0..self.bucket_count() {
            let mut cursor = self.slots[head].next;
            while cursor != NIL {
                let next = self.slots[cursor].next;
                if let Some((key, value)) = self.slots[cursor].entry.take() {
                    let _ = rebuilt.insert_multi(key, value);
                }
                cursor = next;
            }
        }
        debug!(
            "rebuilt hash map: {} -> {} buckets, {} entries",
            self.bucket_count(),
            rebuilt.bucket_count(),
            rebuilt.len
        );
        *self = rebuilt;
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for ChainedMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, S> IntoIterator for &'a ChainedMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> Iterator for Iter<'a, K, V, S> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor == NIL {
            self.bucket += 1;
            if self.bucket >= self.map.bucket_count() {
                return None;
            }
            self.cursor = self.map.slots[self.bucket].next;
        }
        let (key, value) = self.map.entry(self.cursor);
        self.cursor = self.map.slots[self.cursor].next;
        self.remaining -= 1;
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, S> ExactSizeIterator for Iter<'_, K, V, S> {}

impl<K: Ord + Hash, V> FromIterator<(K, V)> for ChainedMap<K, V, DefaultHashBuilder> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
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
    fn bucket_count_is_clamped_and_rounded() {
        assert_eq!(bucket_count_for(0), 1024);
        assert_eq!(bucket_count_for(1024), 1024);
        assert_eq!(bucket_count_for(1025), 2048);
        assert_eq!(bucket_count_for(usize::MAX), MAX_BUCKETS);
    }

    #[test]
    fn insert_replaces_and_insert_multi_appends() {
        let mut map = ChainedMap::new();
        let first = map.insert(1, "a");
        let replaced = map.insert(1, "b");
        assert_eq!(first, replaced);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(first), Ok((&1, &"b")));

        let _ = map.insert_multi(1, "c");
        let _ = map.insert_multi(1, "d");
        assert_eq!(map.count(&1), 3);
        let values: Vec<_> = map.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, ["b", "c", "d"]);
        assert_eq!(map.count_value(&1, &"c"), 1);
        assert!(map.contains_value(&1, &"d"));
        assert!(!map.contains_value(&1, &"a"));
    }

    #[test]
    fn remove_yields_following_entry() {
        let mut map = ChainedMap::new();
        for value in 0..3 {
            let _ = map.insert_multi(7, value);
        }
        let pos = map.find(&7).unwrap();
        let ((key, value), next) = map.remove(pos).unwrap();
        assert_eq!((key, value), (7, 0));
        assert_eq!(map.get(next), Ok((&7, &1)));
        assert_eq!(map.get(pos), Err(PositionError::Stale));
        assert_eq!(map.remove_all(&7), 2);
        assert!(map.is_empty());
        assert_eq!(map.begin(), Position::END);
    }

    #[test]
    fn reserve_keeps_entries_and_invalidates_positions() {
        let mut map: ChainedMap<_, _> = (0..5000).map(|k| (k, k * 2)).collect();
        let pos = map.find(&42).unwrap();
        map.reserve(100);
        assert_eq!(map.bucket_count(), 1024);
        assert_eq!(map.get(pos), Ok((&42, &84)));

        map.reserve(3000);
        assert_eq!(map.bucket_count(), 4096);
        assert_eq!(map.len(), 5000);
        assert_eq!(map.get(pos), Err(PositionError::Stale));
        for k in 0..5000 {
            let pos = map.find(&k).unwrap();
            assert_eq!(map.get(pos), Ok((&k, &(k * 2))));
        }
    }

    #[test]
    fn clear_resets_chains() {
        let mut map: ChainedMap<_, _> = (0..100).map(|k| (k, ())).collect();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.iter().count(), 0);
        assert!(!map.contains(&5));
        let _ = map.insert(5, ());
        assert_eq!(map.len(), 1);
    }
}
