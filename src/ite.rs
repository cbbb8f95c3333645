//! Conjunction of weighted diagrams.
//!
//! [`Ite`] conditions a pair of diagrams on the literals of an ordering and
//! reports, per step, what the product of the two cofactors looks like. It
//! keeps one [`Step`] per conditioned literal, so that undoing a step simply
//! returns to the previous pair.
//!
//! # Collapsed operands
//!
//! In a collapsed diagram a literal that a chain does not test follows the
//! high edge of the nearest chain node above it (see [`Bdd::evaluate`]). The
//! engine reproduces this walk: when a side moved along a low edge and a
//! later literal of the same variable is not tested, the side *jumps* to the
//! high child of the node it left. A side sitting at `FALSE` that can still
//! jump is therefore not dead yet, and a side with a pending jump is never
//! copied as a trivial result.
//!
//! The computed table maps an operand pair to its product. Pairs are
//! recorded right after a positive step, where no side has a pending jump,
//! so the result does not depend on the path that led to the pair.

use std::env;

use log::{debug, warn};

use crate::bdd::Bdd;
use crate::deadline::Deadline;
use crate::engine::{Conditioning, Satisfy};
use crate::error::{Error, Result};
use crate::node::{merge_weights, Weights};
use crate::reference::Ref;
use crate::types::Literal;

/// Levels and nodes per level written in the post-mortem dump.
const DUMP_DEPTH: usize = 4;
const DUMP_WIDTH: usize = 20;

#[derive(Debug, Copy, Clone)]
struct Step {
    nodes: [Ref; 2],
    /// Whether each side reached its node through a low edge in this step.
    via_low: [bool; 2],
}

/// Conditioning engine for the product of two diagrams.
#[derive(Debug)]
pub struct Ite {
    stack: Vec<Step>,
    weights: Weights,
    collapse: bool,
    cached: Ref,
}

impl Ite {
    pub fn new(a: Ref, b: Ref, collapse: bool) -> Self {
        Self {
            stack: vec![Step {
                nodes: [a, b],
                via_low: [false; 2],
            }],
            weights: Weights::new(),
            collapse,
            cached: Ref::FALSE,
        }
    }

    fn top(&self) -> Step {
        self.stack[self.stack.len() - 1]
    }

    /// The node `side` left through its low edge, if `l` may still jump from it.
    fn jump_parent(&self, bdd: &Bdd, side: usize, l: Literal) -> Option<Ref> {
        for k in (1..self.stack.len()).rev() {
            let (prev, step) = (self.stack[k - 1], self.stack[k]);
            if step.nodes[side] != prev.nodes[side] {
                let p = prev.nodes[side];
                return (step.via_low[side] && bdd.same_variable(bdd.literal(p), l.get())).then_some(p);
            }
        }
        None
    }

    fn key(nodes: [Ref; 2]) -> (Ref, Ref) {
        let [a, b] = nodes;
        (a.min(b), a.max(b))
    }

    fn condition_positive(&mut self, bdd: &mut Bdd, l: Literal) -> Satisfy {
        let top = self.top();
        let mut next = top.nodes;
        let mut acted = false;
        self.weights.clear();

        for (i, &n) in top.nodes.iter().enumerate() {
            if !n.is_terminal() && bdd.literal(n) == l.get() {
                self.weights = merge_weights(&self.weights, bdd.weights(n));
                next[i] = bdd.high(n);
                acted = true;
            } else if self.collapse && !n.is_true() {
                if let Some(p) = self.jump_parent(bdd, i, l) {
                    self.weights = merge_weights(&self.weights, bdd.weights(p));
                    next[i] = bdd.high(p);
                    acted = true;
                }
            }
        }
        if !acted {
            return Satisfy::Redundant;
        }

        self.stack.push(Step {
            nodes: next,
            via_low: [false; 2],
        });
        let [a, b] = next;
        if a.is_false() || b.is_false() {
            Satisfy::Unsatisfiable
        } else if a.is_true() && b.is_true() {
            Satisfy::Satisfiable
        } else if let Some(&c) = bdd.cache.get(&Self::key(next)) {
            self.cached = c;
            Satisfy::Cached
        } else if a.is_true() || b.is_true() {
            Satisfy::Trivial
        } else {
            Satisfy::Unsatisfied
        }
    }

    fn condition_negative(&mut self, bdd: &Bdd, ordering: &[Literal], level: usize) -> Satisfy {
        let l = ordering[level];
        let top = self.top();
        let mut step = Step {
            nodes: top.nodes,
            via_low: [false; 2],
        };
        for (i, &n) in top.nodes.iter().enumerate() {
            if !n.is_terminal() && bdd.literal(n) == l.get() {
                step.nodes[i] = bdd.low(n);
                step.via_low[i] = true;
            }
        }
        self.weights.clear();
        self.stack.push(step);

        let following = ordering.get(level + 1).copied();
        let pending = [0, 1].map(|i| {
            self.collapse && following.is_some_and(|next| self.jump_parent(bdd, i, next).is_some())
        });
        let dead = |i: usize| step.nodes[i].is_false() && !pending[i];

        let [a, b] = step.nodes;
        if dead(0) || dead(1) {
            Satisfy::Unsatisfiable
        } else if a.is_true() && b.is_true() {
            Satisfy::Satisfiable
        } else if (a.is_true() && !pending[1]) || (b.is_true() && !pending[0]) {
            Satisfy::Trivial
        } else {
            Satisfy::Unsatisfied
        }
    }
}

impl Conditioning for Ite {
    fn condition(&mut self, bdd: &mut Bdd, ordering: &[Literal], level: usize, positive: bool) -> Satisfy {
        if positive {
            self.condition_positive(bdd, ordering[level])
        } else {
            self.condition_negative(bdd, ordering, level)
        }
    }

    fn undo(&mut self) {
        self.stack.pop();
        self.weights.clear();
    }

    fn take_weights(&mut self) -> Weights {
        std::mem::take(&mut self.weights)
    }

    fn trivial(&self) -> Ref {
        let [a, b] = self.top().nodes;
        if a.is_true() {
            b
        } else {
            a
        }
    }

    fn cached(&self) -> Ref {
        self.cached
    }

    fn record(&mut self, bdd: &mut Bdd, result: Ref) {
        bdd.cache.insert_if_absent(Self::key(self.top().nodes), result);
    }
}

impl Bdd {
    /// Product of the diagrams `a` and `b` along `ordering`.
    ///
    /// The operands stay owned by the caller; the result carries one
    /// reference for the caller.
    pub fn conjoin(&mut self, a: Ref, b: Ref, ordering: &[Literal], collapse: bool) -> Result<Ref> {
        self.conjoin_until(a, b, ordering, collapse, &Deadline::none())
    }

    pub fn conjoin_until(
        &mut self,
        a: Ref,
        b: Ref,
        ordering: &[Literal],
        collapse: bool,
        deadline: &Deadline,
    ) -> Result<Ref> {
        if a.is_false() || b.is_false() {
            return Ok(Ref::FALSE);
        }
        if a.is_true() || b.is_true() {
            let other = if a.is_true() { b } else { a };
            let mut table = self.new_table();
            let c = self.copy(&mut table, other);
            return Ok(self.reference(c));
        }

        self.cache.clear();
        let mut ite = Ite::new(a, b, collapse);
        let result = self.build(&mut ite, ordering, collapse, deadline);
        debug!(
            "conjoin {} {}: cache {} hits, {} misses",
            a,
            b,
            self.cache.hits(),
            self.cache.misses()
        );
        match result {
            Err(Error::Internal { message, dump: None }) => {
                let dump = self.dump_context(&[a, b]);
                Err(Error::Internal { message, dump })
            }
            other => other,
        }
    }

    /// Write the neighbourhood of the operands for post-mortem inspection.
    fn dump_context(&self, roots: &[Ref]) -> Option<std::path::PathBuf> {
        let path = env::temp_dir().join(format!("bnc-conjoin-{}.dot", std::process::id()));
        let written = self
            .context_to_dot(roots, DUMP_DEPTH, DUMP_WIDTH)
            .map_err(|e| e.to_string())
            .and_then(|dot| std::fs::write(&path, dot).map_err(|e| e.to_string()));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("could not write conjoin context: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// Variable 0: literals 1, 2. Variable 1: literals 3, 4.
    fn manager() -> Bdd {
        Bdd::new(vec![0, 0, 0, 1, 1])
    }

    fn lits(xs: &[i32]) -> Vec<Literal> {
        xs.iter().map(|&x| Literal::new(x)).collect()
    }

    /// Full chain over `literals` with one weight per value.
    fn factor(bdd: &mut Bdd, literals: &[i32], weights: &[u32]) -> Ref {
        let mut root = Ref::FALSE;
        for (&l, &w) in literals.iter().zip(weights).rev() {
            root = bdd.mk_node(Literal::new(l), Ref::TRUE, root, vec![w]);
        }
        bdd.reference(root)
    }

    fn assignments() -> Vec<Vec<bool>> {
        let mut out = Vec::new();
        for a in [1, 2] {
            for b in [3, 4] {
                let mut x = vec![false; 5];
                x[a] = true;
                x[b] = true;
                out.push(x);
            }
        }
        out
    }

    fn value(w: u32) -> f64 {
        match w {
            10 => 0.3,
            11 => 0.7,
            12 => 0.4,
            13 => 0.6,
            _ => 1.0,
        }
    }

    #[test]
    fn test_independent_factors_multiply() {
        let mut bdd = manager();
        let ordering = lits(&[1, 2, 3, 4]);
        let pa = factor(&mut bdd, &[1, 2], &[10, 11]);
        let pb = factor(&mut bdd, &[3, 4], &[12, 13]);
        let ab = bdd.conjoin(pa, pb, &ordering, false).unwrap();

        let mut total = 0.0;
        for x in assignments() {
            let got = bdd.evaluate_with(ab, &ordering, &x, false, value);
            let expected = bdd.evaluate_with(pa, &ordering, &x, false, value)
                * bdd.evaluate_with(pb, &ordering, &x, false, value);
            assert!((got - expected).abs() < 1e-12);
            total += got;
        }
        assert!((total - 1.0).abs() < 1e-12);
        // P(B) is shared below both values of A
        assert_eq!(bdd.size(ab), 6);
    }

    #[test]
    fn test_terminal_operands() {
        let mut bdd = manager();
        let ordering = lits(&[1, 2]);
        let pa = factor(&mut bdd, &[1, 2], &[10, 11]);
        assert_eq!(bdd.conjoin(pa, Ref::FALSE, &ordering, false).unwrap(), Ref::FALSE);
        let c = bdd.conjoin(Ref::TRUE, pa, &ordering, false).unwrap();
        assert_ne!(c, pa);
        assert_eq!(bdd.size(c), bdd.size(pa));
    }

    #[test]
    fn test_conjoin_leaves_operands_intact() {
        let mut bdd = manager();
        let ordering = lits(&[1, 2, 3, 4]);
        let pa = factor(&mut bdd, &[1, 2], &[10, 11]);
        let pb = factor(&mut bdd, &[3, 4], &[12, 13]);
        let before = bdd.live_nodes();
        let ab = bdd.conjoin(pa, pb, &ordering, false).unwrap();
        bdd.release(ab);
        assert_eq!(bdd.live_nodes(), before);
    }

    #[test]
    fn test_collapsed_operands() {
        let mut bdd = manager();
        let ordering = lits(&[1, 2, 3, 4]);
        // Both values of B have weight 12; the chain collapses to one node.
        let pa = factor(&mut bdd, &[1, 2], &[10, 11]);
        let pb = factor(&mut bdd, &[3, 4], &[12, 12]);
        let pb_full = factor(&mut bdd, &[3, 4], &[12, 12]);
        let pb = bdd.collapse(pb);
        assert_eq!(bdd.size(pb), 3);

        let ab = bdd.conjoin(pa, pb, &ordering, true).unwrap();
        let reference = bdd.conjoin(pa, pb_full, &ordering, false).unwrap();
        for x in assignments() {
            assert_eq!(
                bdd.evaluate(ab, &ordering, &x, true),
                bdd.evaluate(reference, &ordering, &x, false)
            );
        }
        assert!(bdd.size(ab) < bdd.size(reference));
    }
}
