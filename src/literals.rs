//! Literal and weight encoding of a network.
//!
//! Every value of every variable gets a positive literal (`1..=L`, variable
//! by variable), and every CPT entry gets a symbolic weight identifier. A
//! [`CptNode`] stores one CPT re-indexed over its variables in ascending
//! order, with the first variable least significant, so that it can be
//! addressed with an [`XAry`] over the same list.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::path::Path;

use log::debug;

use crate::bayesnet::BayesNet;
use crate::error::{Error, Result};
use crate::types::{Literal, Probability, Variable, WeightId};
use crate::xary::XAry;

#[derive(Debug, Clone, Default)]
pub struct CptNode {
    /// The variable this CPT belongs to.
    pub variable: Variable,
    /// Variables of the CPT, ascending.
    pub variables: Vec<Variable>,
    /// Base literal of each variable.
    pub literals: Vec<u32>,
    pub dims: Vec<u32>,
    /// Weight identifier per row.
    pub weights: Vec<WeightId>,
    pub probabilities: Vec<Probability>,
}

impl CptNode {
    pub fn nr_rows(&self) -> usize {
        self.weights.len()
    }

    /// Position of the owning variable within [`variables`](Self::variables).
    pub fn variable_position(&self) -> usize {
        self.variables
            .iter()
            .position(|&v| v == self.variable)
            .unwrap_or_default()
    }

    /// Positive literals of every value of every CPT variable, ascending.
    pub fn all_literals(&self) -> Vec<Literal> {
        self.literals
            .iter()
            .zip(&self.dims)
            .flat_map(|(&l, &d)| (l..l + d).map(Literal::positive))
            .collect()
    }

    /// Counter over the CPT's variables.
    pub fn counter(&self) -> XAry {
        XAry::new(self.dims.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct LiteralMap {
    dimension: Vec<u32>,
    variable_to_literal: Vec<u32>,
    /// Index 0 is unused.
    literal_to_variable: Vec<Variable>,
    weight_to_probability: Vec<Probability>,
    names: Vec<String>,
    value_names: Vec<Vec<String>>,
    nodes: Vec<CptNode>,
}

impl LiteralMap {
    /// Encode `bn`.
    ///
    /// With `determinism`, probabilities 0 and 1 become the reserved weights
    /// `0` and `1`. With `encode_structure`, equal probabilities within one
    /// CPT share a weight identifier.
    pub fn encode(bn: &BayesNet, determinism: bool, encode_structure: bool) -> Self {
        let n = bn.nr_variables();
        let dimension = bn.dims().to_vec();
        let nr_literals: u32 = dimension.iter().sum();

        let mut variable_to_literal = Vec::with_capacity(n);
        let mut literal_to_variable = vec![0; nr_literals as usize + 1];
        let mut l = 1;
        for (v, &dim) in dimension.iter().enumerate() {
            variable_to_literal.push(l);
            for i in 0..dim {
                literal_to_variable[(l + i) as usize] = v as Variable;
            }
            l += dim;
        }

        let mut weight_to_probability = Vec::new();
        let mut nodes = Vec::with_capacity(n);
        for v in 0..n as Variable {
            let mut hugin_vars = bn.parents(v).to_vec();
            hugin_vars.push(v);
            let mut variables = hugin_vars.clone();
            variables.sort_unstable();

            let mut hugin = XAry::over(&dimension, &hugin_vars);
            let mut natural = XAry::over(&dimension, &variables);
            let map = XAry::create_map_unsorted(&hugin_vars, &variables);

            let cpt = bn.cpt(v);
            let mut weights = vec![0; cpt.len()];
            let mut probabilities = vec![0.0; cpt.len()];
            let mut shared: HashMap<u64, WeightId> = HashMap::new();
            for (i, &p) in cpt.iter().enumerate() {
                hugin.set_decimal_msb_first(i);
                natural.set_from(&hugin, &map);
                let row = natural.decimal();

                probabilities[row] = p;
                weights[row] = if determinism && (p == 0.0 || p == 1.0) {
                    p as WeightId
                } else if encode_structure {
                    *shared.entry(p.to_bits()).or_insert_with(|| {
                        weight_to_probability.push(p);
                        nr_literals + weight_to_probability.len() as WeightId
                    })
                } else {
                    weight_to_probability.push(p);
                    nr_literals + weight_to_probability.len() as WeightId
                };
            }

            nodes.push(CptNode {
                variable: v,
                literals: variables.iter().map(|&x| variable_to_literal[x as usize]).collect(),
                dims: variables.iter().map(|&x| dimension[x as usize]).collect(),
                variables,
                weights,
                probabilities,
            });
        }

        debug!(
            "encoded {} variables, {} literals, {} weights",
            n,
            nr_literals,
            weight_to_probability.len()
        );

        Self {
            dimension,
            variable_to_literal,
            literal_to_variable,
            weight_to_probability,
            names: bn.nodes().iter().map(|x| x.name.clone()).collect(),
            value_names: bn.nodes().iter().map(|x| x.states.clone()).collect(),
            nodes,
        }
    }

    pub fn nr_variables(&self) -> usize {
        self.variable_to_literal.len()
    }
    pub fn nr_literals(&self) -> u32 {
        (self.literal_to_variable.len() - 1) as u32
    }
    pub fn nr_weights(&self) -> usize {
        self.weight_to_probability.len()
    }

    pub fn dims(&self) -> &[u32] {
        &self.dimension
    }

    pub fn cpt(&self, v: Variable) -> &CptNode {
        &self.nodes[v as usize]
    }

    pub fn cpts(&self) -> &[CptNode] {
        &self.nodes
    }

    /// Literal of `variable = value`.
    pub fn literal(&self, v: Variable, value: u32) -> Literal {
        Literal::positive(self.variable_to_literal[v as usize] + value)
    }

    pub fn first_literal(&self, v: Variable) -> u32 {
        self.variable_to_literal[v as usize]
    }

    /// Variable of every literal, indexed by literal (index 0 unused).
    pub fn literal_to_variable(&self) -> &[Variable] {
        &self.literal_to_variable
    }

    pub fn variable_of(&self, l: Literal) -> Variable {
        self.literal_to_variable[l.index() as usize]
    }

    pub fn value_of(&self, l: Literal) -> u32 {
        l.index() - self.variable_to_literal[self.variable_of(l) as usize]
    }

    pub fn name(&self, v: Variable) -> &str {
        &self.names[v as usize]
    }

    pub fn value_name(&self, v: Variable, value: u32) -> &str {
        self.value_names
            .get(v as usize)
            .and_then(|names| names.get(value as usize))
            .map_or("", String::as_str)
    }

    pub fn is_probability(&self, w: WeightId) -> bool {
        w > self.nr_literals()
    }

    /// Numeric value of a weight identifier.
    pub fn weight_value(&self, w: WeightId) -> Probability {
        if self.is_probability(w) {
            self.weight_to_probability[(w - self.nr_literals() - 1) as usize]
        } else {
            w as Probability
        }
    }

    /// Write the `.map` file.
    pub fn write_map(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self
            .to_map_string()
            .map_err(|_| Error::internal("formatting the .map output failed"))?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }

    pub fn to_map_string(&self) -> std::result::Result<String, fmt::Error> {
        let mut s = String::new();
        writeln!(s, "map {} {} {}", self.nr_variables(), self.nr_literals(), self.nr_weights())?;
        for v in 0..self.nr_variables() {
            writeln!(
                s,
                "{},{},{},{}",
                v, self.dimension[v], self.variable_to_literal[v], self.names[v]
            )?;
        }
        for l in 1..self.literal_to_variable.len() {
            let v = self.literal_to_variable[l] as usize;
            let value = l - self.variable_to_literal[v] as usize;
            writeln!(s, "{},{},{}", l, v, self.value_names[v][value])?;
        }
        let base = self.nr_literals() as usize + 1;
        for (i, p) in self.weight_to_probability.iter().enumerate() {
            writeln!(s, "{},{}", base + i, p)?;
        }
        Ok(s)
    }

    /// Read a `.map` file back. The result carries no CPTs.
    pub fn read_map(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse_map(&text, &path.display().to_string())
    }

    pub fn parse_map(text: &str, what: &str) -> Result<Self> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));
        let bad = |line: usize, msg: &str| Error::parse(what, line, msg);

        let (line, header) = lines.next().ok_or_else(|| bad(0, "empty mapping"))?;
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 4 || fields[0] != "map" {
            return Err(bad(line, "expected 'map <variables> <literals> <weights>'"));
        }
        let parse_usize = |s: &str, line: usize| s.trim().parse::<usize>().map_err(|_| bad(line, "expected a number"));
        let nr_variables = parse_usize(fields[1], line)?;
        let nr_literals = parse_usize(fields[2], line)?;
        let nr_weights = parse_usize(fields[3], line)?;

        let mut m = LiteralMap {
            dimension: vec![0; nr_variables],
            variable_to_literal: vec![0; nr_variables],
            literal_to_variable: vec![0; nr_literals + 1],
            weight_to_probability: vec![0.0; nr_weights],
            names: vec![String::new(); nr_variables],
            value_names: vec![Vec::new(); nr_variables],
            nodes: Vec::new(),
        };

        for _ in 0..nr_variables {
            let (line, text) = lines.next().ok_or_else(|| bad(0, "missing variable line"))?;
            let f: Vec<&str> = text.splitn(4, ',').collect();
            if f.len() != 4 {
                return Err(bad(line, "expected 'v,dim,lit,name'"));
            }
            let v = parse_usize(f[0], line)?;
            if v >= nr_variables {
                return Err(bad(line, "variable out of range"));
            }
            m.dimension[v] = parse_usize(f[1], line)? as u32;
            m.variable_to_literal[v] = parse_usize(f[2], line)? as u32;
            m.names[v] = f[3].to_string();
            m.value_names[v] = vec![String::new(); m.dimension[v] as usize];
        }
        for _ in 0..nr_literals {
            let (line, text) = lines.next().ok_or_else(|| bad(0, "missing literal line"))?;
            let f: Vec<&str> = text.splitn(3, ',').collect();
            if f.len() != 3 {
                return Err(bad(line, "expected 'l,var,valuename'"));
            }
            let l = parse_usize(f[0], line)?;
            let v = parse_usize(f[1], line)?;
            if l == 0 || l > nr_literals || v >= nr_variables {
                return Err(bad(line, "literal out of range"));
            }
            m.literal_to_variable[l] = v as Variable;
            let value = l
                .checked_sub(m.variable_to_literal[v] as usize)
                .filter(|&x| x < m.value_names[v].len())
                .ok_or_else(|| bad(line, "literal outside its variable's range"))?;
            m.value_names[v][value] = f[2].to_string();
        }
        for _ in 0..nr_weights {
            let (line, text) = lines.next().ok_or_else(|| bad(0, "missing weight line"))?;
            let (w, p) = text.split_once(',').ok_or_else(|| bad(line, "expected 'w,probability'"))?;
            let w = parse_usize(w, line)?;
            let p: Probability = p.trim().parse().map_err(|_| bad(line, "expected a probability"))?;
            let index = w
                .checked_sub(nr_literals + 1)
                .filter(|&i| i < nr_weights)
                .ok_or_else(|| bad(line, "weight out of range"))?;
            m.weight_to_probability[index] = p;
        }
        Ok(m)
    }

    /// Write the network in UAI format, plus a `<path>.map` with value names.
    pub fn write_uai(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let (network, names) = self
            .to_uai_string()
            .and_then(|network| Ok((network, self.to_uai_names_string()?)))
            .map_err(|_| Error::internal("formatting the UAI output failed"))?;
        std::fs::write(path, network).map_err(|e| Error::io(path, e))?;

        let mut map_path = path.as_os_str().to_owned();
        map_path.push(".map");
        std::fs::write(&map_path, names).map_err(|e| Error::io(map_path, e))
    }

    pub fn to_uai_string(&self) -> std::result::Result<String, fmt::Error> {
        let mut s = String::new();
        writeln!(s, "BAYES")?;
        writeln!(s, "{}", self.nr_variables())?;
        let dims: Vec<String> = self.dimension.iter().map(|d| d.to_string()).collect();
        writeln!(s, "{}", dims.join(" "))?;
        writeln!(s, "{}", self.nodes.len())?;
        for cpt in &self.nodes {
            let vars: Vec<String> = cpt.variables.iter().map(|v| v.to_string()).collect();
            writeln!(s, "{} {}", cpt.variables.len(), vars.join(" "))?;
        }
        for cpt in &self.nodes {
            // UAI tables put the first variable most significant
            let mut x = cpt.counter();
            write!(s, "{}", cpt.nr_rows())?;
            loop {
                let w = cpt.weights[x.decimal()];
                write!(s, " {:?}", self.weight_value(w))?;
                if !x.increment_msb_first() {
                    break;
                }
            }
            writeln!(s)?;
        }
        Ok(s)
    }

    fn to_uai_names_string(&self) -> std::result::Result<String, fmt::Error> {
        let mut names = String::from("# <id>:<variable name>:<value 1>,...,<value n>\n");
        for v in 0..self.nr_variables() {
            writeln!(names, "{}:{}:{}", v, self.names[v], self.value_names[v].join(","))?;
        }
        Ok(names)
    }
}
