use std::collections::HashMap;

use tmsync_bench::collections::{ChainedMap, PositionError};
use tmsync_bench::test::oracle::stress_multimap;

#[test]
fn stress_sequential() {
    const STEPS: usize = 4096;
    stress_multimap::<ChainedMap<u32, u64>>(STEPS, 64, 0xc4a1);
}

#[test]
fn stress_sequential_wide_keys() {
    const STEPS: usize = 4096;
    stress_multimap::<ChainedMap<u32, u64>>(STEPS, 1 << 16, 0xc4a2);
}

#[test]
fn iteration_visits_every_entry_once() {
    let mut map = ChainedMap::with_buckets(1);
    let mut expected = HashMap::new();
    for k in 0..3000u32 {
        let _ = map.insert_multi(k % 700, k);
        *expected.entry(k % 700).or_insert(0) += 1;
    }
    let mut seen = HashMap::new();
    for (key, _) in &map {
        *seen.entry(*key).or_insert(0) += 1;
    }
    assert_eq!(seen, expected);
    assert_eq!(map.iter().len(), 3000);
}

#[test]
fn walking_positions_covers_map() {
    let map: ChainedMap<u32, ()> = (0..500).map(|k| (k, ())).collect();
    let mut pos = map.begin();
    let mut keys = Vec::new();
    while !pos.is_end() {
        let (key, _) = map.get(pos).unwrap();
        keys.push(*key);
        pos = map.next(pos).unwrap();
    }
    assert_eq!(map.next(pos), Err(PositionError::End));
    keys.sort_unstable();
    assert!(keys.into_iter().eq(0..500));
}

#[test]
fn remove_walks_whole_map() {
    let mut map: ChainedMap<u32, u32> = (0..2000).map(|k| (k, k)).collect();
    let mut pos = map.begin();
    let mut removed = 0;
    while !pos.is_end() {
        let ((key, value), next) = map.remove(pos).unwrap();
        assert_eq!(key, value);
        assert_eq!(map.get(pos), Err(PositionError::Stale));
        removed += 1;
        pos = next;
    }
    assert_eq!(removed, 2000);
    assert!(map.is_empty());
}

#[test]
fn value_mut_updates_in_place() {
    let mut map = ChainedMap::new();
    let pos = map.insert("k", 1);
    *map.value_mut(pos).unwrap() += 41;
    assert_eq!(map.get(pos), Ok((&"k", &42)));
    assert_eq!(map.find(&"k"), Some(pos));
}
