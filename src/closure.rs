//! Domain closure.
//!
//! Tracks, per variable, the at-least-one constraint (how many values are
//! still possible) and the at-most-one constraint (whether a value has been
//! chosen) while literals are conditioned along an ordering.

use crate::engine::Satisfy;
use crate::literals::LiteralMap;
use crate::types::{Literal, Variable};

#[derive(Debug, Clone)]
pub struct DomainClosure {
    literal_to_variable: Vec<Variable>,
    /// Values not yet excluded.
    alo: Vec<u32>,
    /// Whether a value has been chosen.
    amo: Vec<bool>,
}

impl DomainClosure {
    pub fn new(literal_to_variable: &[Variable], dims: &[u32]) -> Self {
        Self {
            literal_to_variable: literal_to_variable.to_vec(),
            alo: dims.to_vec(),
            amo: vec![false; dims.len()],
        }
    }

    pub fn for_literals(map: &LiteralMap) -> Self {
        Self::new(map.literal_to_variable(), map.dims())
    }

    fn variable(&self, l: Literal) -> usize {
        self.literal_to_variable[l.index() as usize] as usize
    }

    /// Whether the variable of `l` already has a value.
    pub fn is_redundant(&self, l: Literal) -> bool {
        self.amo[self.variable(l)]
    }

    pub fn condition(&mut self, l: Literal) -> Satisfy {
        let v = self.variable(l);
        if self.amo[v] {
            return Satisfy::Redundant;
        }
        if l.is_negative() {
            self.alo[v] -= 1;
            if self.alo[v] == 0 {
                Satisfy::Unsatisfiable
            } else {
                Satisfy::Satisfiable
            }
        } else {
            self.amo[v] = true;
            Satisfy::Satisfiable
        }
    }

    /// Revert a non-redundant [`condition`](Self::condition).
    pub fn undo(&mut self, l: Literal) {
        let v = self.variable(l);
        if l.is_negative() {
            self.alo[v] += 1;
        } else {
            self.amo[v] = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// One variable with literals 1..=3.
    fn closure() -> DomainClosure {
        DomainClosure::new(&[0, 0, 0, 0], &[3])
    }

    #[test]
    fn test_excluding_every_value_is_unsatisfiable() {
        let mut c = closure();
        assert_eq!(c.condition(Literal::new(-1)), Satisfy::Satisfiable);
        assert_eq!(c.condition(Literal::new(-2)), Satisfy::Satisfiable);
        assert_eq!(c.condition(Literal::new(-3)), Satisfy::Unsatisfiable);
        c.undo(Literal::new(-3));
        assert_eq!(c.condition(Literal::new(3)), Satisfy::Satisfiable);
    }

    #[test]
    fn test_chosen_value_makes_others_redundant() {
        let mut c = closure();
        c.condition(Literal::new(2));
        assert!(c.is_redundant(Literal::new(3)));
        assert_eq!(c.condition(Literal::new(-3)), Satisfy::Redundant);
        c.undo(Literal::new(2));
        assert!(!c.is_redundant(Literal::new(3)));
    }
}
