//! Upper bounds on diagram size for a variable ordering.
//!
//! Every CPT is a *constraint* over its variable and the variable's parents.
//! Walking an ordering, a variable is *spanning* while it still occurs in a
//! constraint that is not yet satisfied (not every variable of it has been
//! visited). The number of distinct contexts at a level is at most the
//! product of the domains of the spanning variables, which bounds the number
//! of nodes at that level.
//!
//! | Kind        | Level cost                                   |
//! |-------------|----------------------------------------------|
//! | `Nodes`     | `width`                                      |
//! | `Edges`     | `width * dim(v)`                             |
//! | `Weights`   | `width * dim(v) * satisfied`                 |
//! | `Operators` | `width * dim(v) * (satisfied + 2)`           |
//!
//! where `width` is the product of the spanning domains *before* `v` is
//! visited and `satisfied` the number of constraints `v` completes.
//!
//! Integer bounds saturate at `u64::MAX`, which callers treat as
//! intractable. [`Bound::compute_exact`] uses arbitrary precision and
//! [`Bound::compute_score`] sums logarithms for search heuristics.

use std::collections::BTreeSet;

use log::debug;
use num_bigint::BigUint;

use crate::bayesnet::BayesNet;
use crate::partition::Partition;
use crate::types::Variable;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BoundKind {
    Nodes,
    Operators,
    Weights,
    Edges,
}

/// Arithmetic used to accumulate a bound.
pub trait Count: Clone {
    fn zero() -> Self;
    fn one() -> Self;
    /// `None` on overflow.
    fn checked_mul_u64(self, x: u64) -> Option<Self>;
    fn checked_add_count(self, other: Self) -> Option<Self>;
}

impl Count for u64 {
    fn zero() -> Self {
        0
    }
    fn one() -> Self {
        1
    }
    fn checked_mul_u64(self, x: u64) -> Option<Self> {
        self.checked_mul(x)
    }
    fn checked_add_count(self, other: Self) -> Option<Self> {
        self.checked_add(other)
    }
}

impl Count for BigUint {
    fn zero() -> Self {
        BigUint::from(0u32)
    }
    fn one() -> Self {
        BigUint::from(1u32)
    }
    fn checked_mul_u64(self, x: u64) -> Option<Self> {
        Some(self * x)
    }
    fn checked_add_count(self, other: Self) -> Option<Self> {
        Some(self + other)
    }
}

impl Count for f64 {
    fn zero() -> Self {
        0.0
    }
    fn one() -> Self {
        1.0
    }
    fn checked_mul_u64(self, x: u64) -> Option<Self> {
        Some(self * x as f64)
    }
    fn checked_add_count(self, other: Self) -> Option<Self> {
        Some(self + other)
    }
}

#[derive(Debug, Clone)]
pub struct Bound {
    dims: Vec<u32>,
    parents: Vec<Vec<Variable>>,
    enabled: Vec<bool>,
    variable_to_constraint: Vec<Vec<usize>>,
    constraint_to_variable: Vec<Vec<Variable>>,
    size: usize,
    nr_probabilities: usize,
}

impl Bound {
    /// Bound over every CPT of `bn`.
    pub fn new(bn: &BayesNet) -> Self {
        let n = bn.nr_variables();
        let mut bound = Self {
            dims: bn.dims().to_vec(),
            parents: (0..n as Variable).map(|v| bn.parents(v).to_vec()).collect(),
            enabled: vec![true; n],
            variable_to_constraint: Vec::new(),
            constraint_to_variable: Vec::new(),
            size: n,
            nr_probabilities: bn.nr_probabilities(),
        };
        bound.init();
        bound
    }

    /// Bound over the CPTs owned by `partition`, orderings spanning its
    /// owned and cutset variables.
    pub fn for_partition(bn: &BayesNet, partition: &Partition) -> Self {
        let mut bound = Self::new(bn);
        bound.init_partition(partition);
        bound
    }

    /// Rebuild the constraint incidence from the enabled CPTs.
    pub fn init(&mut self) {
        let n = self.dims.len();
        self.variable_to_constraint = vec![Vec::new(); n];
        self.constraint_to_variable = vec![Vec::new(); n];
        for cpt in 0..n {
            if !self.enabled[cpt] {
                continue;
            }
            self.variable_to_constraint[cpt].push(cpt);
            self.constraint_to_variable[cpt].push(cpt as Variable);
            for &p in &self.parents[cpt] {
                self.variable_to_constraint[p as usize].push(cpt);
                self.constraint_to_variable[cpt].push(p);
            }
        }
    }

    pub fn init_partition(&mut self, partition: &Partition) {
        self.enabled = vec![false; self.dims.len()];
        for &v in &partition.set {
            self.enabled[v as usize] = true;
        }
        self.size = partition.len();
        self.init();
    }

    /// Number of variables an ordering must list.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    pub fn is_enabled(&self, cpt: usize) -> bool {
        self.enabled[cpt]
    }

    /// Constraints (CPT ids) mentioning `v`.
    pub fn constraints_of(&self, v: Variable) -> &[usize] {
        &self.variable_to_constraint[v as usize]
    }

    /// Variables of constraint `c`, the CPT's own variable first.
    pub fn constraint(&self, c: usize) -> &[Variable] {
        &self.constraint_to_variable[c]
    }

    /// Saturating bound of the given kind.
    pub fn compute(&self, ordering: &[Variable], kind: BoundKind) -> u64 {
        self.compute_as::<u64>(ordering, kind).unwrap_or(u64::MAX)
    }

    pub fn compute_exact(&self, ordering: &[Variable], kind: BoundKind) -> BigUint {
        self.compute_as::<BigUint>(ordering, kind).unwrap_or_default()
    }

    pub fn compute_as<T: Count>(&self, ordering: &[Variable], kind: BoundKind) -> Option<T> {
        debug_assert!(ordering.len() <= self.dims.len());
        let mut elimination = Elimination::new(self);
        let mut bound = T::zero();
        for &v in ordering {
            bound = bound.checked_add_count(elimination.eliminate::<T>(v, kind)?)?;
        }
        Some(bound)
    }

    /// Sum over levels of the logarithm of the level width.
    pub fn compute_score(&self, ordering: &[Variable]) -> f64 {
        let mut elimination = Elimination::new(self);
        let mut score = 0.0;
        for &v in ordering {
            score += elimination.log_width();
            elimination.condition(v);
        }
        score
    }

    /// Weight bound relative to the number of CPT entries.
    pub fn compute_ratio(&self, ordering: &[Variable]) -> f64 {
        let weights = self.compute_as::<f64>(ordering, BoundKind::Weights).unwrap_or(f64::MAX);
        weights / self.nr_probabilities.max(1) as f64
    }

    /// Node bound respecting the branching of the pseudo-tree induced by
    /// `ordering`, saturating at `u64::MAX`.
    pub fn compute_tree(&self, ordering: &[Variable]) -> u64 {
        self.tree::<u64>(
            ordering,
            |bound, spanning| {
                spanning
                    .iter()
                    .try_fold(1u64, |acc, &s| acc.checked_mul(bound.dims[s as usize] as u64))
            },
            |level, dim| level.checked_mul(dim)?.checked_add(level),
        )
        .unwrap_or(u64::MAX)
    }

    /// Floating-point [`compute_tree`](Self::compute_tree) that does not
    /// saturate, for search energies.
    pub fn compute_tree_approx(&self, ordering: &[Variable]) -> f64 {
        self.tree::<f64>(
            ordering,
            |bound, spanning| Some(spanning.iter().map(|&s| bound.dims[s as usize] as f64).product()),
            |level, dim| Some(level * dim as f64 + level),
        )
        .unwrap_or(f64::MAX)
    }

    /// Log-domain analogue of [`compute_tree`](Self::compute_tree).
    pub fn compute_tree_score(&self, ordering: &[Variable]) -> f64 {
        self.tree::<f64>(
            ordering,
            |bound, spanning| Some(spanning.iter().map(|&s| (bound.dims[s as usize] as f64).ln()).sum()),
            |level, dim| Some(level + (1.0 + dim as f64).ln()),
        )
        .unwrap_or(f64::MAX)
    }

    /// Walk `ordering` backwards, growing a forest: roots whose spanning set
    /// mentions the current variable become its children.
    fn tree<T: Count>(
        &self,
        ordering: &[Variable],
        width: impl Fn(&Self, &BTreeSet<Variable>) -> Option<T>,
        branch: impl Fn(T, u64) -> Option<T>,
    ) -> Option<T> {
        struct Root<T> {
            bound: T,
            spanning: BTreeSet<Variable>,
        }

        let mut add_message = self.enabled.clone();
        let mut roots: Vec<Root<T>> = Vec::new();
        for &v in ordering.iter().rev() {
            let (children, rest): (Vec<_>, Vec<_>) = roots.into_iter().partition(|r| r.spanning.contains(&v));
            roots = rest;
            let nr_children = children.len();

            let mut root = Root {
                bound: T::zero(),
                spanning: BTreeSet::new(),
            };
            for child in children {
                root.bound = root.bound.checked_add_count(child.bound)?;
                root.spanning.extend(child.spanning);
            }

            for &c in &self.variable_to_constraint[v as usize] {
                if add_message[c] {
                    root.spanning.extend(self.constraint_to_variable[c].iter().copied());
                    add_message[c] = false;
                }
            }
            root.spanning.remove(&v);

            let mut level = width(self, &root.spanning)?;
            if nr_children > 1 {
                level = branch(level, self.dims[v as usize] as u64)?;
            }
            root.bound = root.bound.checked_add_count(level)?;
            roots.push(root);
        }

        roots
            .into_iter()
            .try_fold(T::zero(), |acc, r| acc.checked_add_count(r.bound))
    }

    /// Log a summary of every bound for `ordering`.
    pub fn log_stats(&self, ordering: &[Variable]) {
        debug!(
            "ordering bound: score {:.3}, nodes {}, edges {}, weights {}, ratio {:.3}, operators {}, tree {}",
            self.compute_score(ordering),
            self.compute(ordering, BoundKind::Nodes),
            self.compute(ordering, BoundKind::Edges),
            self.compute(ordering, BoundKind::Weights),
            self.compute_ratio(ordering),
            self.compute(ordering, BoundKind::Operators),
            self.compute_tree(ordering),
        );
    }
}

/// Incremental state of a walk along an ordering.
#[derive(Debug, Clone)]
pub struct Elimination<'a> {
    bound: &'a Bound,
    /// Unvisited variables per constraint.
    constraint_open: Vec<u32>,
    /// Unsatisfied constraints per variable.
    occurrences: Vec<u32>,
    spanning: BTreeSet<Variable>,
}

impl<'a> Elimination<'a> {
    pub fn new(bound: &'a Bound) -> Self {
        Self {
            bound,
            constraint_open: bound.constraint_to_variable.iter().map(|c| c.len() as u32).collect(),
            occurrences: bound.variable_to_constraint.iter().map(|c| c.len() as u32).collect(),
            spanning: BTreeSet::new(),
        }
    }

    pub fn spanning(&self) -> &BTreeSet<Variable> {
        &self.spanning
    }

    fn log_width(&self) -> f64 {
        self.spanning
            .iter()
            .map(|&s| (self.bound.dims[s as usize] as f64).ln())
            .sum()
    }

    /// Visit `v`; returns the number of constraints it completes.
    pub fn condition(&mut self, v: Variable) -> u64 {
        let mut insert = false;
        let mut satisfied = 0;
        for &c in &self.bound.variable_to_constraint[v as usize] {
            self.constraint_open[c] -= 1;
            if self.constraint_open[c] > 0 {
                insert = true;
                continue;
            }
            satisfied += 1;
            for &x in &self.bound.constraint_to_variable[c] {
                self.occurrences[x as usize] -= 1;
                if self.occurrences[x as usize] == 0 {
                    self.spanning.remove(&x);
                }
            }
        }
        if insert {
            self.spanning.insert(v);
        }
        satisfied
    }

    /// Visit `v` and return the cost of its level.
    pub fn eliminate<T: Count>(&mut self, v: Variable, kind: BoundKind) -> Option<T> {
        let mut level = T::one();
        for &s in &self.spanning {
            level = level.checked_mul_u64(self.bound.dims[s as usize] as u64)?;
        }
        let satisfied = self.condition(v);
        if kind != BoundKind::Nodes {
            level = level.checked_mul_u64(self.bound.dims[v as usize] as u64)?;
            match kind {
                BoundKind::Weights => level = level.checked_mul_u64(satisfied)?,
                BoundKind::Operators => level = level.checked_mul_u64(satisfied + 2)?,
                _ => {}
            }
        }
        Some(level)
    }
}
