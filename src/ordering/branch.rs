//! Branch-and-bound searches on the node bound.
//!
//! The elimination state after a prefix depends only on the *set* of
//! variables in it, so the best-first search closes states by their
//! [`BitSet`] and never expands a set twice. Searches are seeded with the
//! topological ordering's bound and fall back to that ordering when the
//! deadline passes first.

use std::cmp;
use std::collections::{BinaryHeap, HashSet};

use log::{debug, warn};

use super::{Ordering, Orderer};
use crate::bitset::BitSet;
use crate::bound::{Bound, BoundKind, Elimination};
use crate::deadline::Deadline;
use crate::types::Variable;

/// Closed states after which best-first search gives up.
const MAX_STATES: usize = 1 << 20;

#[derive(Debug, PartialEq, Eq)]
struct State {
    cost: u64,
    prefix: Ordering,
    visited: BitSet,
}

impl Ord for State {
    /// Cheapest first, deeper first among equals.
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| self.prefix.len().cmp(&other.prefix.len()))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

fn level<'b>(elimination: &Elimination<'b>, v: Variable) -> (Elimination<'b>, u64) {
    let mut next = elimination.clone();
    let cost = next.eliminate::<u64>(v, BoundKind::Nodes).unwrap_or(u64::MAX);
    (next, cost)
}

struct Exhaustive<'s> {
    variables: &'s [Variable],
    deadline: &'s Deadline,
    prefix: Ordering,
    used: BitSet,
    best: Ordering,
    best_cost: u64,
    leaves: usize,
}

impl<'s> Exhaustive<'s> {
    fn visit(&mut self, elimination: &Elimination<'_>, cost: u64) {
        if self.prefix.len() == self.variables.len() {
            self.leaves += 1;
            if cost < self.best_cost {
                self.best_cost = cost;
                self.best.clone_from(&self.prefix);
            }
            return;
        }
        if self.deadline.expired() {
            return;
        }
        for &v in self.variables {
            if self.used.contains(v) {
                continue;
            }
            let (next, step) = level(elimination, v);
            let total = cost.saturating_add(step);
            if total > self.best_cost {
                continue;
            }
            self.used.insert(v);
            self.prefix.push(v);
            self.visit(&next, total);
            self.prefix.pop();
            self.used.remove(v);
        }
    }
}

/// Cheapest node cost of the next `depth` levels.
fn look_ahead(elimination: &Elimination<'_>, variables: &[Variable], used: &mut BitSet, depth: usize) -> u64 {
    if depth == 0 || used.len() == variables.len() {
        return 0;
    }
    let mut best = u64::MAX;
    for &v in variables {
        if used.contains(v) {
            continue;
        }
        let (next, cost) = level(elimination, v);
        used.insert(v);
        let total = cost.saturating_add(look_ahead(&next, variables, used, depth - 1));
        used.remove(v);
        best = best.min(total);
    }
    best
}

impl Orderer<'_> {
    fn capacity(&self) -> usize {
        self.bn.nr_variables()
    }

    /// Optimal ordering for the node bound by best-first search.
    pub fn best_first(&self) -> Ordering {
        let initial = self.topological();
        let variables = self.variables();
        if variables.len() < 2 {
            return initial;
        }
        let upper = self.bound.compute(&initial, BoundKind::Nodes);

        let mut heap = BinaryHeap::new();
        let mut closed: HashSet<BitSet> = HashSet::new();
        heap.push(State {
            cost: 0,
            prefix: Vec::new(),
            visited: BitSet::new(self.capacity()),
        });

        while let Some(State { cost, prefix, visited }) = heap.pop() {
            if prefix.len() == variables.len() {
                debug!("best-first: node bound {} after {} states (initial {})", cost, closed.len(), upper);
                return prefix;
            }
            if !closed.insert(visited.clone()) {
                continue;
            }
            if self.deadline.expired() || closed.len() > MAX_STATES {
                warn!("best-first search gave up after {} states", closed.len());
                return initial;
            }

            let elimination = replay(&self.bound, &prefix);
            for &v in &variables {
                if visited.contains(v) {
                    continue;
                }
                let (_, step) = level(&elimination, v);
                let total = cost.saturating_add(step);
                let next = visited.with(v);
                if total > upper || closed.contains(&next) {
                    continue;
                }
                let mut extended = prefix.clone();
                extended.push(v);
                heap.push(State {
                    cost: total,
                    prefix: extended,
                    visited: next,
                });
            }
        }
        initial
    }

    /// Every permutation of the partition, pruned once the partial bound
    /// exceeds the best complete one.
    pub fn brute_force(&self) -> Ordering {
        let mut variables = self.variables();
        variables.sort_unstable();
        let mut search = Exhaustive {
            variables: &variables,
            deadline: &self.deadline,
            prefix: Vec::with_capacity(variables.len()),
            used: BitSet::new(self.capacity()),
            best: Vec::new(),
            best_cost: u64::MAX,
            leaves: 0,
        };
        search.visit(&Elimination::new(&self.bound), 0);
        debug!("brute force: {} complete orderings, node bound {}", search.leaves, search.best_cost);
        if search.best.len() != variables.len() {
            warn!("brute force search reached the deadline without a complete ordering");
            return self.topological();
        }
        search.best
    }

    /// Greedy ordering that picks, at every level, the variable whose best
    /// continuation over the next `depth` levels is cheapest.
    pub fn lookahead(&self, depth: usize) -> Ordering {
        let variables = self.variables();
        let mut used = BitSet::new(self.capacity());
        let mut elimination = Elimination::new(&self.bound);
        let mut ordering = Vec::with_capacity(variables.len());
        let mut warned = false;

        while ordering.len() < variables.len() {
            let depth = if self.deadline.expired() {
                if !warned {
                    warn!("lookahead reached the deadline, continuing greedily");
                    warned = true;
                }
                1
            } else {
                depth.max(1)
            };

            let mut best: Option<(u64, Variable)> = None;
            for &v in &variables {
                if used.contains(v) {
                    continue;
                }
                let (next, cost) = level(&elimination, v);
                used.insert(v);
                let total = cost.saturating_add(look_ahead(&next, &variables, &mut used, depth - 1));
                used.remove(v);
                if best.is_none_or(|(c, _)| total < c) {
                    best = Some((total, v));
                }
            }
            let Some((_, v)) = best else {
                break;
            };
            elimination.condition(v);
            used.insert(v);
            ordering.push(v);
        }
        ordering
    }
}

fn replay<'b>(bound: &'b Bound, prefix: &[Variable]) -> Elimination<'b> {
    let mut elimination = Elimination::new(bound);
    for &v in prefix {
        elimination.condition(v);
    }
    elimination
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::super::tests::{diamond, is_topological};
    use super::super::{OrderingOptions, OrderingStrategy};
    use super::*;
    use crate::bayesnet::BayesNet;
    use crate::partition::Partitions;

    fn orderer<'a>(bn: &'a BayesNet, parts: &'a Partitions, i: usize) -> Orderer<'a> {
        let options = OrderingOptions {
            strategy: OrderingStrategy::BestFirst,
            ..OrderingOptions::default()
        };
        Orderer::new(bn, parts.get(i), options)
    }

    #[test]
    fn test_best_first_matches_brute_force() {
        let bn = diamond();
        let parts = Partitions::one(&bn);
        let o = orderer(&bn, &parts, 0);
        let best = o.best_first();
        let brute = o.brute_force();
        assert_eq!(best.len(), 5);
        assert_eq!(
            o.bound().compute(&best, BoundKind::Nodes),
            o.bound().compute(&brute, BoundKind::Nodes)
        );
        assert!(o.bound().compute(&best, BoundKind::Nodes) <= o.bound().compute(&o.topological(), BoundKind::Nodes));
    }

    #[test]
    fn test_brute_force_is_optimal_on_chain() {
        let mut bn = BayesNet::new();
        let a = bn.add_variable("A", &["0", "1"]);
        let b = bn.add_variable("B", &["0", "1", "2"]);
        let c = bn.add_variable("C", &["0", "1"]);
        bn.set_potential(b, &[a], vec![1.0 / 3.0; 6]).unwrap();
        bn.set_potential(c, &[b], vec![0.5; 6]).unwrap();
        let parts = Partitions::one(&bn);
        let o = orderer(&bn, &parts, 0);
        let best = o.brute_force();
        // A, B, C: widths 1, 2, 3; the ternary variable spans last
        assert_eq!(o.bound().compute(&best, BoundKind::Nodes), 6);
        assert!(is_topological(&bn, &best) || is_topological(&bn, &best.iter().rev().copied().collect::<Vec<_>>()));
    }

    #[test]
    fn test_lookahead_depths() {
        let bn = diamond();
        let parts = Partitions::one(&bn);
        let o = orderer(&bn, &parts, 0);
        let optimum = o.bound().compute(&o.brute_force(), BoundKind::Nodes);
        for depth in [0, 1, 2, 5] {
            let ordering = o.lookahead(depth);
            let mut sorted = ordering.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
            assert!(o.bound().compute(&ordering, BoundKind::Nodes) >= optimum);
        }
        // a full-depth lookahead is exhaustive
        assert_eq!(o.bound().compute(&o.lookahead(5), BoundKind::Nodes), optimum);
    }

    #[test]
    fn test_search_over_partition_with_cutset() {
        let bn = diamond();
        let parts = Partitions::from_sets(vec![vec![0, 1, 4], vec![2, 3]], &bn);
        let o = orderer(&bn, &parts, 1);
        let mut best = o.best_first();
        best.sort_unstable();
        assert_eq!(best, vec![0, 1, 2, 3]);
    }
}
