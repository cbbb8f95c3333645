//! Fixed-capacity variable sets.
//!
//! The ordering searches key their states by the set of variables visited so
//! far: the elimination state after a prefix depends only on which variables
//! it contains, not on their order. The word vector never grows, so two sets
//! over the same capacity compare and hash by content.

use crate::types::Variable;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: Vec<u64>,
    count: usize,
}

impl BitSet {
    const BITS_PER_WORD: usize = 64;

    /// An empty set able to hold `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(Self::BITS_PER_WORD)],
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.words.len() * Self::BITS_PER_WORD
    }

    #[inline]
    fn locate(v: Variable) -> (usize, u64) {
        let index = v as usize;
        (index / Self::BITS_PER_WORD, 1u64 << (index % Self::BITS_PER_WORD))
    }

    #[inline]
    pub fn contains(&self, v: Variable) -> bool {
        let (word, mask) = Self::locate(v);
        self.words.get(word).is_some_and(|w| w & mask != 0)
    }

    /// Returns `true` if `v` was not yet a member.
    ///
    /// # Panics
    ///
    /// Panics if `v` is outside the capacity.
    #[inline]
    pub fn insert(&mut self, v: Variable) -> bool {
        let (word, mask) = Self::locate(v);
        let fresh = self.words[word] & mask == 0;
        if fresh {
            self.words[word] |= mask;
            self.count += 1;
        }
        fresh
    }

    #[inline]
    pub fn remove(&mut self, v: Variable) -> bool {
        let (word, mask) = Self::locate(v);
        let Some(w) = self.words.get_mut(word) else {
            return false;
        };
        let present = *w & mask != 0;
        if present {
            *w &= !mask;
            self.count -= 1;
        }
        present
    }

    /// Copy of `self` with `v` added.
    pub fn with(&self, v: Variable) -> Self {
        let mut set = self.clone();
        set.insert(v);
        set
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
        self.count = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = Variable> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some((i * Self::BITS_PER_WORD + bit) as Variable)
            })
        })
    }
}

impl Extend<Variable> for BitSet {
    fn extend<I: IntoIterator<Item = Variable>>(&mut self, iter: I) {
        for v in iter {
            self.insert(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use test_log::test;

    use super::*;

    #[test]
    fn test_insert_remove() {
        let mut set = BitSet::new(100);
        assert!(set.is_empty());
        assert!(set.insert(42));
        assert!(!set.insert(42));
        assert!(set.contains(42));
        assert!(!set.contains(99));
        assert!(!set.contains(1000));
        assert_eq!(set.len(), 1);
        assert!(set.remove(42));
        assert!(!set.remove(42));
        assert!(set.is_empty());
    }

    #[test]
    fn test_iter_across_words() {
        let mut set = BitSet::new(130);
        set.extend([65, 3, 129, 64, 5]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 5, 64, 65, 129]);
        set.clear();
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn test_order_independent_key() {
        let a = BitSet::new(10).with(1).with(7);
        let b = BitSet::new(10).with(7).with(1);
        assert_eq!(a, b);
        let seen: HashSet<BitSet> = [a, b].into_iter().collect();
        assert_eq!(seen.len(), 1);
    }
}
