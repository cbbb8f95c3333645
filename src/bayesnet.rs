//! In-memory Bayesian network.

use std::collections::HashMap;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::types::{Probability, Variable};

#[derive(Debug, Clone, Default)]
pub struct BayesNode {
    pub name: String,
    pub states: Vec<String>,
    pub parents: Vec<Variable>,
    /// Conditional probabilities in Hugin order: first parent most
    /// significant, the node's own value varying fastest.
    pub cpt: Vec<Probability>,
}

#[derive(Debug, Clone, Default)]
pub struct BayesNet {
    nodes: Vec<BayesNode>,
    dims: Vec<u32>,
    names: HashMap<String, Variable>,
}

impl BayesNet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Hugin `.net` file.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let bn = crate::net::parse_named(&text, &path.display().to_string())?;
        debug!("read {} with {} variables", path.display(), bn.nr_variables());
        Ok(bn)
    }

    /// Add a variable with the given value names and no parents.
    pub fn add_variable(&mut self, name: &str, states: &[&str]) -> Variable {
        let v = self.nodes.len() as Variable;
        let dim = states.len().max(1);
        self.nodes.push(BayesNode {
            name: name.to_string(),
            states: states.iter().map(|s| s.to_string()).collect(),
            parents: Vec::new(),
            cpt: vec![1.0 / dim as Probability; dim],
        });
        self.dims.push(states.len() as u32);
        self.names.insert(name.to_string(), v);
        v
    }

    /// Set the parents and the CPT (Hugin order) of `child`.
    pub fn set_potential(&mut self, child: Variable, parents: &[Variable], cpt: Vec<Probability>) -> Result<()> {
        let expected: usize = parents
            .iter()
            .chain(std::iter::once(&child))
            .map(|&v| self.dims[v as usize] as usize)
            .product();
        if cpt.len() != expected {
            return Err(Error::parse(
                self.name(child).to_string(),
                0,
                format!("potential has {} entries, expected {}", cpt.len(), expected),
            ));
        }
        let node = &mut self.nodes[child as usize];
        node.parents = parents.to_vec();
        node.cpt = cpt;
        Ok(())
    }

    pub fn nr_variables(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, v: Variable) -> &BayesNode {
        &self.nodes[v as usize]
    }

    pub fn nodes(&self) -> &[BayesNode] {
        &self.nodes
    }

    /// Domain size of every variable.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    pub fn dim(&self, v: Variable) -> u32 {
        self.dims[v as usize]
    }

    pub fn name(&self, v: Variable) -> &str {
        &self.nodes[v as usize].name
    }

    pub fn value_name(&self, v: Variable, value: u32) -> &str {
        &self.nodes[v as usize].states[value as usize]
    }

    pub fn variable(&self, name: &str) -> Option<Variable> {
        self.names.get(name).copied()
    }

    pub fn parents(&self, v: Variable) -> &[Variable] {
        &self.nodes[v as usize].parents
    }

    /// Children of every variable, in ascending order.
    pub fn children(&self) -> Vec<Vec<Variable>> {
        let mut children = vec![Vec::new(); self.nodes.len()];
        for (v, node) in self.nodes.iter().enumerate() {
            for &p in &node.parents {
                children[p as usize].push(v as Variable);
            }
        }
        children
    }

    pub fn cpt(&self, v: Variable) -> &[Probability] {
        &self.nodes[v as usize].cpt
    }

    /// Total number of CPT entries.
    pub fn nr_probabilities(&self) -> usize {
        self.nodes.iter().map(|n| n.cpt.len()).sum()
    }

    /// Variables without parents.
    pub fn roots(&self) -> Vec<Variable> {
        (0..self.nodes.len() as Variable)
            .filter(|&v| self.nodes[v as usize].parents.is_empty())
            .collect()
    }
}
