//! Computed tables.
//!
//! The ITE engine memoizes the result of every positive cofactor pair it
//! completes, keyed by the pair of operand nodes it started from. Results
//! live in the same per-pass node table as the diagram under construction,
//! so entries have to be dropped when a collapse frees their node; see
//! [`HashMapCache::remove_value`].
//!
//! ```
//! use bnc_rs::cache::Cache;
//!
//! let mut cache = Cache::<(u32, u32), u32>::new(4);
//! cache.insert((1, 2), 42);
//! assert_eq!(cache.get(&(1, 2)), Some(&42));
//! cache.remove_value(&42);
//! assert!(cache.is_empty());
//! ```

mod hashmap;

pub use hashmap::HashMapCache;

/// Default cache implementation.
pub type Cache<K, V> = HashMapCache<K, V>;
