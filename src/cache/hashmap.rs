//! Exact memo table over [`HashMap`].
//!
//! Entries are only dropped on request. A hit therefore always names a node
//! the ITE pass produced, as long as collapses evict what they free through
//! [`HashMapCache::remove_value`].

use std::collections::HashMap;
use std::hash::Hash;

pub struct HashMapCache<K, V> {
    entries: HashMap<K, V>,
    lookups: usize,
    found: usize,
}

impl<K, V> Default for HashMapCache<K, V> {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<K, V> HashMapCache<K, V> {
    /// Empty table pre-sized for `2^bits` results.
    pub fn new(bits: usize) -> Self {
        HashMapCache {
            entries: HashMap::with_capacity(1 << bits),
            lookups: 0,
            found: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.found
    }

    pub fn misses(&self) -> usize {
        self.lookups - self.found
    }

    /// Forget every result; the hit counters survive.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Hash + Eq, V: Copy + PartialEq> HashMapCache<K, V> {
    #[inline]
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.lookups += 1;
        let value = self.entries.get(key);
        self.found += value.is_some() as usize;
        value
    }

    #[inline]
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Keep the first result stored under `key`.
    #[inline]
    pub fn insert_if_absent(&mut self, key: K, value: V) {
        self.entries.entry(key).or_insert(value);
    }

    /// Evict every key that resolved to `value`.
    pub fn remove_value(&mut self, value: &V) {
        self.entries.retain(|_, v| v != value);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_counts_lookups() {
        let mut memo = HashMapCache::<(u32, u32), u32>::new(3);
        memo.insert((4, 5), 9);
        assert_eq!(memo.get(&(4, 5)), Some(&9));
        assert_eq!(memo.get(&(5, 4)), None);
        assert_eq!(memo.get(&(4, 5)), Some(&9));
        assert_eq!((memo.hits(), memo.misses()), (2, 1));

        memo.clear();
        assert!(memo.is_empty());
        assert_eq!(memo.get(&(4, 5)), None);
        assert_eq!(memo.misses(), 2);
    }

    #[test]
    fn test_first_result_wins() {
        let mut memo = HashMapCache::<(u32, u32), u32>::new(2);
        memo.insert_if_absent((1, 1), 5);
        memo.insert_if_absent((1, 1), 6);
        assert_eq!(memo.get(&(1, 1)), Some(&5));
        memo.insert((1, 1), 6);
        assert_eq!(memo.get(&(1, 1)), Some(&6));
    }

    #[test]
    fn test_eviction_by_value() {
        let mut memo = HashMapCache::<(u32, u32), u32>::new(2);
        memo.insert((1, 2), 7);
        memo.insert((3, 4), 7);
        memo.insert((5, 6), 8);
        memo.remove_value(&7);
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.get(&(5, 6)), Some(&8));
    }
}
