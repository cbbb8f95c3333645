//! Top-down compilation of a single CPT.
//!
//! Every row of a CPT is treated as a clause over one literal per CPT
//! variable. Conditioning on a literal either *kills* rows (a negative
//! literal, or the other values of a chosen variable) or brings them one
//! literal closer to completion. A completed row contributes its weight to
//! the edge being built, and once no row is pending the cofactor is `TRUE`.
//!
//! Each [`Sat::condition`] call pushes one history entry: the conditioned
//! literal followed by the values it excluded. [`Sat::undo`] replays the
//! entry backwards and restores every counter exactly.

use std::collections::HashMap;

use log::debug;

use crate::bdd::Bdd;
use crate::deadline::Deadline;
use crate::engine::{Conditioning, Satisfy};
use crate::error::Result;
use crate::literals::CptNode;
use crate::node::Weights;
use crate::reference::Ref;
use crate::types::{Literal, Variable, WeightId};

/// Conditioning engine over the rows of one CPT.
#[derive(Debug, Clone)]
pub struct Sat {
    determinism: bool,
    literal_to_variable: Vec<Variable>,
    /// CPT position of every CPT variable.
    local: HashMap<Variable, usize>,
    base: Vec<u32>,
    dims: Vec<u32>,

    /// Rows containing each positive literal.
    literal_to_rows: Vec<Vec<usize>>,
    row_weight: Vec<WeightId>,

    /// Literals of each row not yet conditioned.
    row_open: Vec<u32>,
    /// Literal that resolved each row (`0` while pending).
    row_resolved_by: Vec<i32>,
    pending_rows: usize,
    values_left: Vec<u32>,
    chosen: Vec<bool>,
    constrained: Vec<bool>,

    history: Vec<Vec<Literal>>,
    weights: Weights,
}

impl Sat {
    pub fn new(cpt: &CptNode, literal_to_variable: &[Variable], determinism: bool) -> Self {
        let nr_literals = literal_to_variable.len();
        let mut literal_to_rows = vec![Vec::new(); nr_literals];
        let mut row_weight = Vec::with_capacity(cpt.nr_rows());

        let mut counter = cpt.counter();
        loop {
            let row = row_weight.len();
            row_weight.push(cpt.weights[counter.decimal()]);
            for (&base, &d) in cpt.literals.iter().zip(counter.digits()) {
                literal_to_rows[(base + d) as usize].push(row);
            }
            if !counter.increment() {
                break;
            }
        }

        let rows = row_weight.len();
        Self {
            determinism,
            literal_to_variable: literal_to_variable.to_vec(),
            local: cpt.variables.iter().enumerate().map(|(i, &v)| (v, i)).collect(),
            base: cpt.literals.clone(),
            dims: cpt.dims.clone(),
            literal_to_rows,
            row_weight,
            row_open: vec![cpt.variables.len() as u32; rows],
            row_resolved_by: vec![0; rows],
            pending_rows: rows,
            values_left: cpt.dims.clone(),
            chosen: vec![false; cpt.variables.len()],
            constrained: vec![false; nr_literals],
            history: Vec::new(),
            weights: Weights::new(),
        }
    }

    pub fn nr_rows(&self) -> usize {
        self.row_weight.len()
    }

    /// Rows neither completed nor killed.
    pub fn pending_rows(&self) -> usize {
        self.pending_rows
    }

    fn position(&self, l: Literal) -> Option<usize> {
        let v = *self.literal_to_variable.get(l.index() as usize)?;
        self.local.get(&v).copied()
    }

    fn impose(&mut self, l: Literal, v: usize) -> Satisfy {
        let mut entry = vec![l];
        self.constrained[l.index() as usize] = true;
        let outcome = if l.is_negative() {
            self.values_left[v] -= 1;
            if self.values_left[v] == 0 {
                Satisfy::Unsatisfiable
            } else {
                Satisfy::Unsatisfied
            }
        } else {
            for m in self.base[v]..self.base[v] + self.dims[v] {
                if !self.constrained[m as usize] {
                    entry.push(-Literal::positive(m));
                }
            }
            self.chosen[v] = true;
            Satisfy::Satisfiable
        };
        self.history.push(entry);
        outcome
    }

    /// Condition on `l` and propagate into the rows.
    pub fn condition(&mut self, l: Literal) -> Satisfy {
        self.weights.clear();
        let Some(v) = self.position(l) else {
            return Satisfy::Redundant;
        };
        if self.chosen[v] {
            return Satisfy::Redundant;
        }

        let mut outcome = self.impose(l, v);
        let entry = self.history.last().cloned().unwrap_or_default();
        for m in entry {
            if m.is_negative() {
                for &row in &self.literal_to_rows[m.index() as usize] {
                    if self.row_resolved_by[row] == 0 {
                        self.row_resolved_by[row] = m.get();
                        self.pending_rows -= 1;
                    }
                }
            } else {
                for &row in &self.literal_to_rows[m.index() as usize] {
                    if self.row_resolved_by[row] != 0 {
                        continue;
                    }
                    self.row_open[row] -= 1;
                    if self.row_open[row] > 0 {
                        continue;
                    }
                    self.row_resolved_by[row] = m.get();
                    self.pending_rows -= 1;

                    let w = self.row_weight[row];
                    if self.determinism && w == 0 {
                        outcome = outcome.combine(Satisfy::Unsatisfiable);
                    } else if !(self.determinism && w == 1) {
                        self.weights.push(w);
                    }
                }
            }
        }
        self.weights.sort_unstable();

        let rows = if self.pending_rows == 0 {
            Satisfy::Satisfiable
        } else {
            Satisfy::Unsatisfied
        };
        outcome.combine(rows)
    }

    /// Revert the last non-redundant [`condition`](Self::condition).
    pub fn undo(&mut self) {
        self.weights.clear();
        let Some(entry) = self.history.pop() else {
            return;
        };

        let first = entry[0];
        self.constrained[first.index() as usize] = false;
        if let Some(v) = self.position(first) {
            if first.is_negative() {
                self.values_left[v] += 1;
            } else {
                self.chosen[v] = false;
            }
        }

        for &m in entry.iter().rev() {
            for &row in &self.literal_to_rows[m.index() as usize] {
                let resolved = self.row_resolved_by[row];
                if m.is_negative() {
                    if resolved == m.get() {
                        self.row_resolved_by[row] = 0;
                        self.pending_rows += 1;
                    }
                } else if resolved == m.get() && self.row_open[row] == 0 {
                    self.row_resolved_by[row] = 0;
                    self.pending_rows += 1;
                    self.row_open[row] += 1;
                } else if resolved == 0 {
                    self.row_open[row] += 1;
                }
            }
        }
    }
}

impl Conditioning for Sat {
    fn condition(&mut self, _bdd: &mut Bdd, ordering: &[Literal], level: usize, positive: bool) -> Satisfy {
        let l = ordering[level];
        Sat::condition(self, if positive { l } else { -l })
    }

    fn undo(&mut self) {
        Sat::undo(self);
    }

    fn take_weights(&mut self) -> Weights {
        std::mem::take(&mut self.weights)
    }
}

impl Bdd {
    /// Compile the CPT behind `sat` top-down along `ordering`.
    ///
    /// `ordering` should list the CPT's literals only; others are skipped.
    pub fn solve(&mut self, sat: &mut Sat, ordering: &[Literal], collapse: bool) -> Result<Ref> {
        self.solve_until(sat, ordering, collapse, &Deadline::none())
    }

    pub fn solve_until(
        &mut self,
        sat: &mut Sat,
        ordering: &[Literal],
        collapse: bool,
        deadline: &Deadline,
    ) -> Result<Ref> {
        let root = self.build(sat, ordering, collapse, deadline)?;
        debug!("solve: {} rows, {} nodes", sat.nr_rows(), self.size(root));
        Ok(root)
    }
}
