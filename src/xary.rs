//! Mixed-radix counters.
//!
//! An [`XAry`] holds one digit per variable, each bounded by that variable's
//! domain size. The digit at index 0 is the least significant one, so the
//! decimal value of a digit vector `d` with radices `r` is
//!
//! ```text
//! d[0] + r[0] * (d[1] + r[1] * (d[2] + ...))
//! ```
//!
//! Counters are used to enumerate every context of a multigraph layer and to
//! address the flat per-layer arrays. A [`Mapping`] projects a counter over
//! one variable list onto a counter over another (usually smaller) list.
//!
//! ```
//! use bnc_rs::xary::XAry;
//!
//! let mut x = XAry::new(vec![2, 3]);
//! let mut seen = 0;
//! loop {
//!     seen += 1;
//!     if !x.increment() {
//!         break;
//!     }
//! }
//! assert_eq!(seen, 6);
//! ```

use std::ops::{Index, IndexMut};

use crate::types::Variable;

/// For each position of a target list: the position of the same variable in
/// the source list, if present.
pub type Mapping = Vec<Option<usize>>;

/// Positions held fixed by [`XAry::restricted_increment`].
pub type Restriction = Vec<bool>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XAry {
    digits: Vec<u32>,
    dims: Vec<u32>,
}

impl XAry {
    /// Zero counter with the given radices.
    pub fn new(dims: Vec<u32>) -> Self {
        let digits = vec![0; dims.len()];
        Self { digits, dims }
    }

    /// Zero counter over `variables`, taking radices from `dimension`.
    pub fn over<'a>(dimension: &[u32], variables: impl IntoIterator<Item = &'a Variable>) -> Self {
        Self::new(variables.into_iter().map(|&v| dimension[v as usize]).collect())
    }

    /// Replace the radices and reset all digits to zero.
    pub fn set_dimension(&mut self, dims: Vec<u32>) {
        self.digits.clear();
        self.digits.resize(dims.len(), 0);
        self.dims = dims;
    }

    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    pub fn digits(&self) -> &[u32] {
        &self.digits
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn set_zero(&mut self) {
        self.digits.iter_mut().for_each(|d| *d = 0);
    }

    /// Number of distinct states. An empty counter has exactly one.
    pub fn max(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// Number of states reachable by [`restricted_increment`](Self::restricted_increment).
    pub fn max_restricted(&self, restrict: &[bool]) -> usize {
        self.dims
            .iter()
            .zip(restrict)
            .filter(|(_, &r)| !r)
            .map(|(&d, _)| d as usize)
            .product()
    }

    /// Add one, carrying into more significant digits.
    ///
    /// Returns `false` (leaving the counter at its last state) once every
    /// state has been visited.
    pub fn increment(&mut self) -> bool {
        for i in 0..self.digits.len() {
            if self.digits[i] + 1 < self.dims[i] {
                self.digits[i] += 1;
                self.digits[..i].iter_mut().for_each(|d| *d = 0);
                return true;
            }
        }
        false
    }

    /// Like [`increment`](Self::increment), but restricted positions never change.
    pub fn restricted_increment(&mut self, restrict: &[bool]) -> bool {
        debug_assert_eq!(restrict.len(), self.digits.len());
        for i in 0..self.digits.len() {
            if !restrict[i] && self.digits[i] + 1 < self.dims[i] {
                self.digits[i] += 1;
                for j in 0..i {
                    if !restrict[j] {
                        self.digits[j] = 0;
                    }
                }
                return true;
            }
        }
        false
    }

    /// Decimal value, least significant digit first.
    pub fn decimal(&self) -> usize {
        self.digits
            .iter()
            .zip(&self.dims)
            .rev()
            .fold(0, |acc, (&d, &r)| acc * r as usize + d as usize)
    }

    /// Inverse of [`decimal`](Self::decimal).
    pub fn set_decimal(&mut self, mut value: usize) {
        debug_assert!(value < self.max(), "Decimal {} exceeds counter range", value);
        for (d, &r) in self.digits.iter_mut().zip(&self.dims) {
            *d = (value % r as usize) as u32;
            value /= r as usize;
        }
    }

    /// Decimal value with the *first* digit most significant.
    ///
    /// This is the row order of Hugin and UAI tables.
    pub fn decimal_msb_first(&self) -> usize {
        self.digits
            .iter()
            .zip(&self.dims)
            .fold(0, |acc, (&d, &r)| acc * r as usize + d as usize)
    }

    /// Inverse of [`decimal_msb_first`](Self::decimal_msb_first).
    pub fn set_decimal_msb_first(&mut self, mut value: usize) {
        for (d, &r) in self.digits.iter_mut().zip(&self.dims).rev() {
            *d = (value % r as usize) as u32;
            value /= r as usize;
        }
    }

    /// Increment with the *last* digit least significant.
    pub fn increment_msb_first(&mut self) -> bool {
        for i in (0..self.digits.len()).rev() {
            if self.digits[i] + 1 < self.dims[i] {
                self.digits[i] += 1;
                self.digits[i + 1..].iter_mut().for_each(|d| *d = 0);
                return true;
            }
        }
        false
    }

    /// Step size of each position.
    pub fn stepsizes(&self) -> Vec<usize> {
        let mut steps = Vec::with_capacity(self.dims.len());
        let mut step = 1usize;
        for &r in &self.dims {
            steps.push(step);
            step *= r as usize;
        }
        steps
    }

    /// Copy digits from `other` through `map`; unmapped positions become zero.
    pub fn set_from(&mut self, other: &XAry, map: &[Option<usize>]) {
        debug_assert_eq!(map.len(), self.digits.len());
        for (d, m) in self.digits.iter_mut().zip(map) {
            *d = m.map_or(0, |i| other.digits[i]);
        }
    }

    /// Map each entry of the sorted list `to` onto its position in the sorted list `from`.
    pub fn create_map(from: &[Variable], to: &[Variable]) -> Mapping {
        let mut result = Vec::with_capacity(to.len());
        let (mut i, mut j) = (0, 0);
        while i < from.len() && j < to.len() {
            if from[i] < to[j] {
                i += 1;
            } else if to[j] < from[i] {
                result.push(None);
                j += 1;
            } else {
                result.push(Some(i));
                i += 1;
                j += 1;
            }
        }
        result.resize(to.len(), None);
        result
    }

    /// Like [`create_map`](Self::create_map) for lists in arbitrary order.
    pub fn create_map_unsorted(from: &[Variable], to: &[Variable]) -> Mapping {
        to.iter().map(|v| from.iter().position(|f| f == v)).collect()
    }

    /// Positions that a mapping pins (those with a source).
    pub fn restriction(map: &[Option<usize>]) -> Restriction {
        map.iter().map(Option::is_some).collect()
    }
}

impl Index<usize> for XAry {
    type Output = u32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.digits[index]
    }
}

impl IndexMut<usize> for XAry {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.digits[index]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use test_log::test;

    use super::*;

    #[test]
    fn test_enumeration_visits_every_state_once() {
        let mut x = XAry::new(vec![2, 3, 4]);
        let mut seen = HashSet::new();
        loop {
            assert!(seen.insert(x.digits().to_vec()));
            if !x.increment() {
                break;
            }
        }
        assert_eq!(seen.len(), 24);
        assert_eq!(x.max(), 24);
    }

    #[test]
    fn test_empty_counter_has_single_state() {
        let mut x = XAry::new(vec![]);
        assert_eq!(x.max(), 1);
        assert_eq!(x.decimal(), 0);
        assert!(!x.increment());
    }

    #[test]
    fn test_decimal_round_trip() {
        let mut x = XAry::new(vec![3, 2, 5]);
        for value in 0..x.max() {
            x.set_decimal(value);
            assert_eq!(x.decimal(), value);
        }
        x.set_decimal(0);
        let mut expected = 0;
        loop {
            assert_eq!(x.decimal(), expected);
            expected += 1;
            if !x.increment() {
                break;
            }
        }
    }

    #[test]
    fn test_msb_first() {
        let mut x = XAry::new(vec![2, 3]);
        x[0] = 1;
        x[1] = 2;
        assert_eq!(x.decimal(), 1 + 2 * 2);
        assert_eq!(x.decimal_msb_first(), 3 + 2);
        let mut y = XAry::new(vec![2, 3]);
        y.set_decimal_msb_first(5);
        assert_eq!(y, x);
    }

    #[test]
    fn test_msb_increment_order() {
        let mut x = XAry::new(vec![2, 3]);
        let mut rows = vec![x.decimal_msb_first()];
        while x.increment_msb_first() {
            rows.push(x.decimal_msb_first());
        }
        assert_eq!(rows, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_restricted_increment_keeps_pinned_digits() {
        let mut x = XAry::new(vec![2, 3, 2]);
        x[1] = 2;
        let restrict = vec![false, true, false];
        assert_eq!(x.max_restricted(&restrict), 4);
        let mut count = 1;
        while x.restricted_increment(&restrict) {
            assert_eq!(x[1], 2);
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn test_create_map() {
        let from = [1, 3, 5, 7];
        let to = [0, 3, 7, 9];
        assert_eq!(XAry::create_map(&from, &to), vec![None, Some(1), Some(3), None]);
        assert_eq!(XAry::create_map_unsorted(&[7, 1, 3], &[3, 7]), vec![Some(2), Some(0)]);
        assert_eq!(XAry::restriction(&[None, Some(0)]), vec![false, true]);
    }

    #[test]
    fn test_set_from_projects_context() {
        let mut parent = XAry::new(vec![2, 3, 4]);
        parent[0] = 1;
        parent[1] = 2;
        parent[2] = 3;
        let mut child = XAry::new(vec![4, 2, 5]);
        child.set_from(&parent, &[Some(2), Some(0), None]);
        assert_eq!(child.digits(), &[3, 1, 0]);
    }

    #[test]
    fn test_stepsizes() {
        let x = XAry::new(vec![2, 3, 4]);
        assert_eq!(x.stepsizes(), vec![1, 2, 6]);
    }
}
