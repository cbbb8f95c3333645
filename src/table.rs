//! Unique table.
//!
//! A bucketed chaining table mapping a structural key to a value. Nodes are
//! hash-consed through it: [`Table::find_or_insert`] either records a new
//! key or returns the value already stored for an equal one.
//!
//! Cell `0` is a sentry, so `next == 0` terminates a chain.

use std::cmp::min;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    next: usize,
}

pub struct Table<K, V> {
    data: Vec<Option<Entry<K, V>>>,
    buckets: Vec<usize>,
    bitmask: u64,
    /// Released cells, reused before the data vector grows.
    free: Vec<usize>,
    /// Number of occupied cells.
    real_size: usize,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self::new(12)
    }
}

impl<K, V> Table<K, V> {
    /// Create a new table with `2^min(bits, 16)` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let buckets_bits = min(bits, 16);
        let buckets_size = 1 << buckets_bits;

        let mut data = Vec::with_capacity(1 << bits);
        data.push(None); // sentry

        Self {
            data,
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
            free: Vec::new(),
            real_size: 0,
        }
    }

    /// Get the number of occupied cells.
    pub fn len(&self) -> usize {
        self.real_size
    }

    pub fn is_empty(&self) -> bool {
        self.real_size == 0
    }

    pub fn clear(&mut self) {
        self.data.truncate(1);
        self.buckets.iter_mut().for_each(|b| *b = 0);
        self.free.clear();
        self.real_size = 0;
    }

    fn entry(&self, index: usize) -> &Entry<K, V> {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].as_ref().expect("chained cell must be occupied")
    }

    fn alloc(&mut self, entry: Entry<K, V>) -> usize {
        self.real_size += 1;
        match self.free.pop() {
            Some(index) => {
                self.data[index] = Some(entry);
                index
            }
            None => {
                self.data.push(Some(entry));
                self.data.len() - 1
            }
        }
    }

    /// Iterate over all stored (key, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.data.iter().flatten().map(|e| (&e.key, &e.value))
    }
}

impl<K, V> Table<K, V>
where
    K: MyHash + Eq,
    V: Copy,
{
    fn bucket_index(&self, key: &K) -> usize {
        (key.hash() & self.bitmask) as usize
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let mut index = self.buckets[self.bucket_index(key)];
        while index != 0 {
            let entry = self.entry(index);
            if &entry.key == key {
                return Some(entry.value);
            }
            index = entry.next;
        }
        None
    }

    /// Return the value stored under an equal key, or store `value` and return `None`.
    pub fn find_or_insert(&mut self, key: K, value: V) -> Option<V> {
        let bucket_index = self.bucket_index(&key);
        let mut index = self.buckets[bucket_index];

        if index == 0 {
            // Create new cell and put it into the bucket.
            let i = self.alloc(Entry { key, value, next: 0 });
            self.buckets[bucket_index] = i;
            return None;
        }

        loop {
            let entry = self.entry(index);
            if entry.key == key {
                return Some(entry.value);
            }
            if entry.next == 0 {
                // Append to the bucket.
                let i = self.alloc(Entry { key, value, next: 0 });
                if let Some(e) = self.data[index].as_mut() {
                    e.next = i;
                }
                return None;
            }
            index = entry.next;
        }
    }

    /// Remove the entry under `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let bucket_index = self.bucket_index(key);
        let mut prev = 0;
        let mut index = self.buckets[bucket_index];
        while index != 0 {
            let (found, next) = {
                let entry = self.entry(index);
                (&entry.key == key, entry.next)
            };
            if found {
                if prev == 0 {
                    self.buckets[bucket_index] = next;
                } else if let Some(e) = self.data[prev].as_mut() {
                    e.next = next;
                }
                let entry = self.data[index].take()?;
                self.free.push(index);
                self.real_size -= 1;
                return Some(entry.value);
            }
            prev = index;
            index = next;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_find_or_insert() {
        let mut table = Table::new(2);
        assert_eq!(table.find_or_insert(Item(5), 'a'), None);
        assert_eq!(table.find_or_insert(Item(-5), 'b'), None);
        assert_eq!(table.find_or_insert(Item(5), 'c'), Some('a'));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&Item(-5)), Some('b'));
    }

    #[test]
    fn test_remove_relinks_chain() {
        let mut table = Table::new(2);
        // All three collide in one bucket.
        table.find_or_insert(Item(1), 1);
        table.find_or_insert(Item(-1), 2);
        table.find_or_insert(Item(5), 3);
        assert_eq!(table.remove(&Item(-1)), Some(2));
        assert_eq!(table.get(&Item(1)), Some(1));
        assert_eq!(table.get(&Item(5)), Some(3));
        assert_eq!(table.get(&Item(-1)), None);
        assert_eq!(table.remove(&Item(-1)), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_freed_cells_are_reused() {
        let mut table = Table::new(1);
        for i in 0..10 {
            table.find_or_insert(Item(i), i);
        }
        for i in 0..10 {
            assert_eq!(table.remove(&Item(i)), Some(i));
        }
        assert!(table.is_empty());
        for i in 0..10 {
            table.find_or_insert(Item(i), i);
        }
        assert_eq!(table.iter().count(), 10);
    }
}
