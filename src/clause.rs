//! CPT rows as weighted diagrams.
//!
//! Row `r` of a CPT becomes the function that is `w_r` when the row's
//! literals all hold and `1` otherwise. The product of all rows of a CPT is
//! the CPT itself, so conjoining them yields the CPT diagram. Every clause
//! tests the domain of its variables completely, which makes it directly
//! conjoinable with the full chains produced by the SAT engine.

use log::debug;

use crate::bdd::Bdd;
use crate::closure::DomainClosure;
use crate::engine::Satisfy;
use crate::literals::CptNode;
use crate::node::Weights;
use crate::reference::Ref;
use crate::types::{Literal, WeightId};

impl Bdd {
    /// Diagram of one CPT row.
    ///
    /// `row` holds one positive literal per CPT variable, `ordering` the
    /// CPT's literals in diagram order. With `determinism`, weight `0` turns
    /// the matching path into `FALSE` and weight `1` is dropped.
    pub fn clause(
        &mut self,
        row: &[Literal],
        weight: WeightId,
        ordering: &[Literal],
        closure: &mut DomainClosure,
        determinism: bool,
    ) -> Ref {
        let in_row = |l: Literal| row.contains(&l);
        let last = match ordering.iter().rposition(|&l| in_row(l)) {
            Some(last) => last,
            None => return Ref::TRUE,
        };

        // Walk down to the last row literal, remembering what closed.
        let mut outcomes = Vec::with_capacity(last + 1);
        for &l in &ordering[..=last] {
            let outcome = if in_row(l) {
                closure.condition(l)
            } else {
                closure.condition(-l)
            };
            outcomes.push(outcome);
        }

        // Rebuild bottom-up.
        let mut root = Ref::TRUE;
        for k in (0..=last).rev() {
            let l = ordering[k];
            if in_row(l) {
                closure.undo(l);
                let low = if closure.condition(-l) == Satisfy::Unsatisfiable {
                    Ref::FALSE
                } else {
                    Ref::TRUE
                };
                closure.undo(-l);

                let (high, weights) = if k != last {
                    (root, Weights::new())
                } else if determinism && weight == 0 {
                    (Ref::FALSE, Weights::new())
                } else if determinism && weight == 1 {
                    (root, Weights::new())
                } else {
                    (root, vec![weight])
                };
                root = self.mk_node(l, high, low, weights);
            } else if outcomes[k] != Satisfy::Redundant {
                closure.undo(-l);
                root = self.mk_node(l, Ref::TRUE, root, Weights::new());
            }
        }
        self.reference(root)
    }

    /// One diagram per row of `cpt`.
    pub fn cpt_clauses(
        &mut self,
        cpt: &CptNode,
        ordering: &[Literal],
        closure: &mut DomainClosure,
        determinism: bool,
    ) -> Vec<Ref> {
        let mut counter = cpt.counter();
        let mut clauses = Vec::with_capacity(cpt.nr_rows());
        loop {
            let row: Vec<Literal> = cpt
                .literals
                .iter()
                .zip(counter.digits())
                .map(|(&base, &d)| Literal::positive(base + d))
                .collect();
            let weight = cpt.weights[counter.decimal()];
            clauses.push(self.clause(&row, weight, ordering, closure, determinism));
            if !counter.increment() {
                break;
            }
        }
        debug!("cpt {}: {} clauses", cpt.variable, clauses.len());
        clauses
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// Variable 0 has literals 1..=3.
    fn setup() -> (Bdd, DomainClosure) {
        let l2v = vec![0, 0, 0, 0];
        (Bdd::new(l2v.clone()), DomainClosure::new(&l2v, &[3]))
    }

    fn lits(xs: &[i32]) -> Vec<Literal> {
        xs.iter().map(|&x| Literal::new(x)).collect()
    }

    fn assignment(l: usize) -> Vec<bool> {
        let mut a = vec![false; 4];
        a[l] = true;
        a
    }

    #[test]
    fn test_clause_is_weight_on_match_and_one_elsewhere() {
        let (mut bdd, mut closure) = setup();
        let ordering = lits(&[1, 2, 3]);
        let c = bdd.clause(&lits(&[2]), 42, &ordering, &mut closure, false);
        assert_eq!(bdd.evaluate(c, &ordering, &assignment(1), false), Some(vec![]));
        assert_eq!(bdd.evaluate(c, &ordering, &assignment(2), false), Some(vec![42]));
        assert_eq!(bdd.evaluate(c, &ordering, &assignment(3), false), Some(vec![]));
        // l1 -> 1, else l2 -> w, else 1
        assert_eq!(bdd.live_nodes(), 2);
    }

    #[test]
    fn test_clause_on_last_value_closes_domain() {
        let (mut bdd, mut closure) = setup();
        let ordering = lits(&[1, 2, 3]);
        let c = bdd.clause(&lits(&[3]), 7, &ordering, &mut closure, false);
        assert_eq!(bdd.size(c), 5);
        let mut n = c;
        while bdd.literal(n) != 3 {
            n = bdd.low(n);
        }
        assert!(bdd.low(n).is_false());
    }

    #[test]
    fn test_determinism_turns_zero_into_false() {
        let (mut bdd, mut closure) = setup();
        let ordering = lits(&[1, 2, 3]);
        let c = bdd.clause(&lits(&[1]), 0, &ordering, &mut closure, true);
        assert_eq!(bdd.evaluate(c, &ordering, &assignment(1), false), None);
        assert_eq!(bdd.evaluate(c, &ordering, &assignment(2), false), Some(vec![]));
    }

    #[test]
    fn test_closure_is_restored() {
        let (mut bdd, mut closure) = setup();
        let ordering = lits(&[1, 2, 3]);
        bdd.clause(&lits(&[3]), 7, &ordering, &mut closure, false);
        assert!(!closure.is_redundant(Literal::new(1)));
        assert_eq!(closure.condition(Literal::new(-1)), Satisfy::Satisfiable);
        assert_eq!(closure.condition(Literal::new(-2)), Satisfy::Satisfiable);
        assert_eq!(closure.condition(Literal::new(-3)), Satisfy::Unsatisfiable);
    }
}
