//! Top-down diagram construction.
//!
//! Both compilation engines build a diagram the same way: walk the literal
//! ordering depth-first, condition on a literal, create a node for it, and
//! descend into the positive and then the negative cofactor until the
//! conditioning engine reports a terminal outcome. Finished nodes are
//! collapsed (optionally), merged into the pass's unique table and attached
//! to their parent.
//!
//! The engines differ only in how they condition, which is captured by the
//! [`Conditioning`] trait: [`Ite`](crate::ite::Ite) conditions a pair of
//! diagrams, [`Sat`](crate::sat::Sat) conditions the rows of one CPT.

use log::debug;

use crate::bdd::Bdd;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::node::Weights;
use crate::reference::Ref;
use crate::types::Literal;

/// Outcome of conditioning on one literal.
///
/// Variants are ordered by precedence: combining two outcomes keeps the
/// greater one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Satisfy {
    /// Every constraint is resolved with weight left: the cofactor is `TRUE`.
    Satisfiable,
    /// Constraints remain: descend further.
    Unsatisfied,
    /// The literal does not affect anything: skip the level.
    Redundant,
    /// One side is resolved: the cofactor equals the other side.
    Trivial,
    /// The cofactor is `FALSE`.
    Unsatisfiable,
    /// The cofactor was computed before.
    Cached,
}

impl Satisfy {
    pub fn combine(self, other: Satisfy) -> Satisfy {
        self.max(other)
    }
}

/// A conditioning engine driven by [`Bdd::build`].
pub trait Conditioning {
    /// Condition on `ordering[level]` (`positive`) or on its negation.
    ///
    /// Every outcome except [`Satisfy::Redundant`] leaves one step on the
    /// engine's stack, which the driver removes with [`undo`](Self::undo).
    fn condition(&mut self, bdd: &mut Bdd, ordering: &[Literal], level: usize, positive: bool) -> Satisfy;

    fn undo(&mut self);

    /// Weights collected by the last positive step.
    fn take_weights(&mut self) -> Weights;

    /// Diagram to copy after a [`Satisfy::Trivial`] outcome.
    fn trivial(&self) -> Ref {
        Ref::TRUE
    }

    /// Result of a [`Satisfy::Cached`] outcome.
    fn cached(&self) -> Ref {
        Ref::FALSE
    }

    /// Called with every finished positive cofactor.
    fn record(&mut self, _bdd: &mut Bdd, _result: Ref) {}
}

#[derive(Debug, Copy, Clone)]
enum Slot {
    Root,
    High(Ref),
    Low(Ref),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Phase {
    Positive,
    Negative,
    Canonical,
}

#[derive(Debug)]
struct Frame {
    slot: Slot,
    level: usize,
    node: Ref,
    phase: Phase,
}

impl Frame {
    fn new(slot: Slot, level: usize) -> Self {
        Self {
            slot,
            level,
            node: Ref::FALSE,
            phase: Phase::Positive,
        }
    }
}

impl Bdd {
    /// Build a diagram by conditioning `engine` along `ordering`.
    ///
    /// The returned root carries one reference owned by the caller.
    pub fn build<C: Conditioning>(
        &mut self,
        engine: &mut C,
        ordering: &[Literal],
        collapse: bool,
        deadline: &Deadline,
    ) -> Result<Ref> {
        let mut table = self.new_table();
        let mut frames = vec![Frame::new(Slot::Root, 0)];
        let mut root = Ref::FALSE;
        let mut steps: u64 = 0;

        while let Some(frame) = frames.last_mut() {
            steps += 1;
            if steps % 1024 == 0 {
                deadline.check()?;
            }

            let phase = frame.phase;
            match phase {
                Phase::Positive => {
                    let Some(&l) = ordering.get(frame.level) else {
                        return Err(Error::internal(format!(
                            "ordering exhausted at level {} before the diagram was complete",
                            frame.level
                        )));
                    };
                    let outcome = engine.condition(self, ordering, frame.level, true);
                    debug!("build: +{} at L{} -> {:?}", l, frame.level, outcome);
                    if outcome == Satisfy::Redundant {
                        frame.level += 1;
                        continue;
                    }

                    let mut weights = engine.take_weights();
                    if outcome == Satisfy::Unsatisfiable {
                        weights.clear();
                    }
                    let n = self.create(l, weights);
                    frame.node = n;
                    frame.phase = Phase::Negative;
                    match outcome {
                        Satisfy::Satisfiable => {
                            self.set_high(n, Ref::TRUE);
                            engine.undo();
                        }
                        Satisfy::Unsatisfiable => {
                            self.set_high(n, Ref::FALSE);
                            engine.undo();
                        }
                        Satisfy::Trivial => {
                            let t = self.copy(&mut table, engine.trivial());
                            self.set_high(n, t);
                            engine.record(self, t);
                            engine.undo();
                        }
                        Satisfy::Cached => {
                            self.set_high(n, engine.cached());
                            engine.undo();
                        }
                        Satisfy::Unsatisfied => {
                            let level = frame.level + 1;
                            frames.push(Frame::new(Slot::High(n), level));
                        }
                        Satisfy::Redundant => unreachable!(),
                    }
                }

                Phase::Negative => {
                    let n = frame.node;
                    let outcome = engine.condition(self, ordering, frame.level, false);
                    debug!("build: -{} at L{} -> {:?}", self.literal(n), frame.level, outcome);
                    engine.take_weights();
                    frame.phase = Phase::Canonical;
                    match outcome {
                        Satisfy::Satisfiable => {
                            self.set_low(n, Ref::TRUE);
                            engine.undo();
                        }
                        Satisfy::Unsatisfiable => {
                            self.set_low(n, Ref::FALSE);
                            engine.undo();
                        }
                        Satisfy::Trivial => {
                            let e = self.copy(&mut table, engine.trivial());
                            self.set_low(n, e);
                            engine.undo();
                        }
                        Satisfy::Unsatisfied => {
                            let level = frame.level + 1;
                            frames.push(Frame::new(Slot::Low(n), level));
                        }
                        Satisfy::Redundant | Satisfy::Cached => {
                            return Err(Error::internal(format!(
                                "negative cofactor of {} at level {} reported {:?}",
                                self.literal(n),
                                frame.level,
                                outcome
                            )));
                        }
                    }
                }

                Phase::Canonical => {
                    let (n, slot) = (frame.node, frame.slot);
                    if collapse {
                        self.collapse_node(&mut table, n);
                    }
                    let c = self.merge(&mut table, n);
                    frames.pop();
                    match slot {
                        Slot::Root => root = self.reference(c),
                        Slot::High(p) => {
                            self.set_high(p, c);
                            engine.record(self, c);
                            engine.undo();
                        }
                        Slot::Low(p) => {
                            self.set_low(p, c);
                            engine.undo();
                        }
                    }
                }
            }
        }

        debug!("build: {} steps, {} canonical nodes", steps, table.len());
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_combine_keeps_precedence() {
        use Satisfy::*;
        assert_eq!(Satisfiable.combine(Unsatisfied), Unsatisfied);
        assert_eq!(Unsatisfied.combine(Redundant), Redundant);
        assert_eq!(Trivial.combine(Unsatisfiable), Unsatisfiable);
        assert_eq!(Cached.combine(Satisfiable), Cached);
    }

    /// Conditions a single positive literal: the diagram of `x`.
    struct Single {
        literal: i32,
        stack: usize,
    }

    impl Conditioning for Single {
        fn condition(&mut self, _bdd: &mut Bdd, ordering: &[Literal], level: usize, positive: bool) -> Satisfy {
            if ordering[level].get() != self.literal {
                return Satisfy::Redundant;
            }
            self.stack += 1;
            if positive {
                Satisfy::Satisfiable
            } else {
                Satisfy::Unsatisfiable
            }
        }
        fn undo(&mut self) {
            self.stack -= 1;
        }
        fn take_weights(&mut self) -> Weights {
            vec![]
        }
    }

    #[test]
    fn test_build_skips_redundant_levels() {
        let mut bdd = Bdd::default();
        let mut engine = Single { literal: 3, stack: 0 };
        let ordering: Vec<_> = (1..=4).map(Literal::new).collect();
        let root = bdd.build(&mut engine, &ordering, false, &Deadline::none()).unwrap();
        assert_eq!(bdd.literal(root), 3);
        assert!(bdd.high(root).is_true());
        assert!(bdd.low(root).is_false());
        assert_eq!(engine.stack, 0);
        bdd.release(root);
        assert_eq!(bdd.live_nodes(), 0);
    }
}
