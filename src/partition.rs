//! Splitting a network into partitions.
//!
//! A partition *owns* a set of variables (their CPTs are compiled in it) and
//! additionally sees a *cutset*: parents of owned variables that are owned by
//! another partition. Owned sets are disjoint and cover the network, cutsets
//! may overlap.
//!
//! Partition files start with `partition N` followed by one line per
//! partition listing its owned variables by name, comma separated.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::path::Path;

use log::debug;

use crate::bayesnet::BayesNet;
use crate::error::{Error, Result};
use crate::types::Variable;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub set: BTreeSet<Variable>,
    pub cutset: BTreeSet<Variable>,
}

impl Partition {
    pub fn new(set: impl IntoIterator<Item = Variable>, bn: &BayesNet) -> Self {
        let mut partition = Self {
            set: set.into_iter().collect(),
            cutset: BTreeSet::new(),
        };
        partition.determine_cutset(bn);
        partition
    }

    /// Recompute the cutset from the parents of the owned variables.
    pub fn determine_cutset(&mut self, bn: &BayesNet) {
        self.cutset = self
            .set
            .iter()
            .flat_map(|&v| bn.parents(v).iter().copied())
            .filter(|p| !self.set.contains(p))
            .collect();
    }

    /// Owned and cutset variables together.
    pub fn variables(&self) -> BTreeSet<Variable> {
        self.set.union(&self.cutset).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.set.len() + self.cutset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, v: Variable) -> bool {
        self.set.contains(&v) || self.cutset.contains(&v)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partitions {
    partitions: Vec<Partition>,
}

impl Partitions {
    /// A single partition owning every variable.
    pub fn one(bn: &BayesNet) -> Self {
        Self {
            partitions: vec![Partition::new(0..bn.nr_variables() as Variable, bn)],
        }
    }

    pub fn from_sets(sets: Vec<Vec<Variable>>, bn: &BayesNet) -> Self {
        Self {
            partitions: sets.into_iter().map(|s| Partition::new(s, bn)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn is_monolithic(&self) -> bool {
        self.partitions.len() == 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter()
    }

    pub fn get(&self, i: usize) -> &Partition {
        &self.partitions[i]
    }

    /// Index of the partition owning `v`.
    pub fn variable_to_partition(&self, v: Variable) -> Option<usize> {
        self.partitions.iter().position(|p| p.set.contains(&v))
    }

    /// Check that the owned sets are disjoint and cover the network.
    pub fn verify(&self, bn: &BayesNet) -> Result<()> {
        let mut uncovered: BTreeSet<Variable> = (0..bn.nr_variables() as Variable).collect();
        for (i, partition) in self.partitions.iter().enumerate() {
            for &v in &partition.set {
                if !uncovered.remove(&v) {
                    return Err(Error::InvalidPartition(format!(
                        "variable '{}' occurs in partition {} for the second time",
                        bn.name(v),
                        i + 1
                    )));
                }
            }
        }
        if !uncovered.is_empty() {
            let names: Vec<&str> = uncovered.iter().map(|&v| bn.name(v)).collect();
            return Err(Error::InvalidPartition(format!(
                "partitions do not cover all variables, missing {{{}}}",
                names.join(",")
            )));
        }
        Ok(())
    }

    /// Check that `ordering` lists exactly the variables of partition `i`.
    pub fn verify_ordering(&self, i: usize, ordering: &[Variable], bn: &BayesNet) -> Result<()> {
        let expected = self.partitions[i].variables();
        let got: BTreeSet<Variable> = ordering.iter().copied().collect();
        if got != expected || got.len() != ordering.len() {
            let names: Vec<&str> = expected.iter().map(|&v| bn.name(v)).collect();
            return Err(Error::InvalidOrdering(format!(
                "ordering of partition {} does not consist of partition and cutset {{{}}}",
                i + 1,
                names.join(",")
            )));
        }
        Ok(())
    }

    pub fn read(path: impl AsRef<Path>, bn: &BayesNet) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text, &path.display().to_string(), bn)
    }

    pub fn parse(text: &str, what: &str, bn: &BayesNet) -> Result<Self> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));
        let (_, header) = lines.next().ok_or_else(|| Error::parse(what, 1, "missing header"))?;
        let n: usize = header
            .strip_prefix("partition")
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| Error::parse(what, 1, "expected 'partition N'"))?;
        if n < 2 || n > bn.nr_variables() {
            return Err(Error::parse(
                what,
                1,
                "number of partitions must be at least 2 and at most the number of variables",
            ));
        }

        let mut sets = Vec::with_capacity(n);
        for (line, text) in lines.filter(|(_, l)| !l.is_empty()).take(n) {
            let mut set = Vec::new();
            for name in text.split(',').map(str::trim) {
                let v = bn
                    .variable(name)
                    .ok_or_else(|| Error::parse(what, line, format!("unknown variable '{}'", name)))?;
                set.push(v);
            }
            sets.push(set);
        }
        if sets.len() != n {
            return Err(Error::parse(what, 0, format!("expected {} partitions, found {}", n, sets.len())));
        }

        let partitions = Self::from_sets(sets, bn);
        debug!("read {} partitions from {}", partitions.len(), what);
        Ok(partitions)
    }

    pub fn to_file_string(&self, bn: &BayesNet) -> std::result::Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "partition {}", self.partitions.len())?;
        for partition in &self.partitions {
            let names: Vec<&str> = partition.set.iter().map(|&v| bn.name(v)).collect();
            writeln!(out, "{}", names.join(","))?;
        }
        Ok(out)
    }

    pub fn write(&self, path: impl AsRef<Path>, bn: &BayesNet) -> Result<()> {
        let path = path.as_ref();
        let text = self
            .to_file_string(bn)
            .map_err(|_| Error::internal("formatting the partition file failed"))?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }
}

impl<'a> IntoIterator for &'a Partitions {
    type Item = &'a Partition;
    type IntoIter = std::slice::Iter<'a, Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.partitions.iter()
    }
}
