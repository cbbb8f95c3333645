//! Spanning trees: pseudo-trees annotated for layer-wise compilation.
//!
//! Each pseudo-tree node becomes a *layer* of the multigraph. The layer of
//! variable `v` keeps one OR node per assignment of its *spanning set*: the
//! variables above `v` that something at or below `v` still depends on. CPTs
//! are attached as *messages* to the deepest node mentioning them, where all
//! of their variables are known.
//!
//! | Quantity        | Per node                                       |
//! |-----------------|------------------------------------------------|
//! | OR nodes        | `cardinality` (product of spanning domains)    |
//! | AND nodes       | `cardinality * dim(v)` when branching, else 0  |
//! | OR edges        | `cardinality * dim(v)`                         |
//! | AND edges       | AND nodes times number of children             |
//! | weights         | OR edges times number of messages              |
//!
//! Layers are indexed in depth-first pre-order: the dummy root is layer 0
//! and a single terminal layer comes last, shared by every leaf.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::path::Path;

use log::{debug, info};

use crate::bound::Bound;
use crate::error::{Error, Result};
use crate::literals::LiteralMap;
use crate::pseudotree::{PseudoTree, PseudoTreeNode, DUMMY_ROOT};
use crate::types::{Variable, WeightId};
use crate::xary::{Mapping, Restriction, XAry};

/// Variable of the terminal layer.
pub const TERMINAL: Variable = DUMMY_ROOT - 1;

/// How a layer addresses its contexts from its parent's context.
#[derive(Debug, Clone, Default)]
pub struct XAryInfo {
    /// Position of the parent variable in this layer's spanning set
    /// (its length when absent).
    pub pos: usize,
    /// The parent variable is not in this spanning set: every value of the
    /// parent leads to the same node.
    pub expand: bool,
    /// Domains of the spanning variables.
    pub dimension: Vec<u32>,
    /// Parent spanning position of each spanning variable.
    pub map: Mapping,
    /// Positions fixed by the parent context.
    pub restrict: Restriction,
}

#[derive(Debug, Clone)]
pub struct SpanningNode {
    pub variable: Variable,
    pub index: usize,
    /// Domain size of `variable`; 0 for the dummy root and the terminal.
    pub dimension: u32,
    pub cardinality: usize,
    /// Ascending.
    pub spanning: Vec<Variable>,
    /// CPTs completed at this node.
    pub messages: Vec<Variable>,
    /// Layer indices.
    pub children: Vec<usize>,
    pub xary: XAryInfo,
}

impl SpanningNode {
    fn new(variable: Variable, index: usize, dimension: u32) -> Self {
        Self {
            variable,
            index,
            dimension,
            cardinality: 0,
            spanning: Vec::new(),
            messages: Vec::new(),
            children: Vec::new(),
            xary: XAryInfo::default(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.variable == DUMMY_ROOT
    }

    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_and_layer(&self) -> bool {
        self.children.len() > 1
    }

    pub fn edges_per_or(&self) -> usize {
        self.dimension as usize
    }

    pub fn edges_per_and(&self) -> usize {
        self.children.len()
    }

    pub fn weights_per_edge(&self) -> usize {
        self.messages.len()
    }

    pub fn or_bound(&self) -> usize {
        self.cardinality
    }

    pub fn and_bound(&self) -> usize {
        if self.is_and_layer() {
            self.or_bound().saturating_mul(self.edges_per_or())
        } else {
            0
        }
    }

    pub fn node_bound(&self) -> usize {
        self.or_bound().saturating_add(self.and_bound())
    }

    pub fn or_edge_bound(&self) -> usize {
        self.or_bound().saturating_mul(self.edges_per_or())
    }

    pub fn and_edge_bound(&self) -> usize {
        self.and_bound().saturating_mul(self.edges_per_and())
    }

    pub fn edge_bound(&self) -> usize {
        self.or_edge_bound().saturating_add(self.and_edge_bound())
    }

    pub fn weight_bound(&self) -> usize {
        self.or_edge_bound().saturating_mul(self.weights_per_edge())
    }

    /// Counter over this layer's contexts.
    pub fn counter(&self) -> XAry {
        XAry::new(self.xary.dimension.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpanningTree {
    /// Pre-order, terminal last.
    nodes: Vec<SpanningNode>,
    /// Per CPT: spanning position of each CPT variable at the node carrying it.
    cpt_map: Vec<Mapping>,
    /// Per CPT: position of the carrying node's variable among the CPT variables.
    cpt_variable_pos: Vec<usize>,
    pre_ordering: Vec<Variable>,
    is_tree: bool,
    max_cardinality: usize,
    or_bound: usize,
    and_bound: usize,
    or_edge_bound: usize,
    and_edge_bound: usize,
    weight_bound: usize,
    width: usize,
    height: usize,
}

impl SpanningTree {
    /// Annotate `pseudo` with the constraints of `bound`.
    ///
    /// Fails with [`Error::Unsupported`] when a layer has more contexts than
    /// can be addressed.
    pub fn new(bound: &Bound, pseudo: &PseudoTree, map: &LiteralMap) -> Result<Self> {
        let dims = bound.dims();
        let mut tree = Self {
            cpt_map: vec![Vec::new(); dims.len()],
            cpt_variable_pos: vec![0; dims.len()],
            pre_ordering: pseudo.pre_ordering().to_vec(),
            width: pseudo.width(),
            height: pseudo.height(),
            ..Self::default()
        };

        // pre-order layout
        let mut stack: Vec<(&PseudoTreeNode, Option<usize>)> = vec![(pseudo.root(), None)];
        while let Some((pseudo_node, parent)) = stack.pop() {
            let index = tree.nodes.len();
            let dimension = if pseudo_node.variable == DUMMY_ROOT {
                0
            } else {
                dims[pseudo_node.variable as usize]
            };
            tree.nodes.push(SpanningNode::new(pseudo_node.variable, index, dimension));
            if let Some(p) = parent {
                tree.nodes[p].children.push(index);
            }
            if pseudo_node.children.len() > 1 {
                tree.is_tree = true;
            }
            stack.extend(pseudo_node.children.iter().rev().map(|c| (c, Some(index))));
        }

        let terminal = tree.nodes.len();
        for node in &mut tree.nodes {
            if node.children.is_empty() {
                node.children.push(terminal);
            }
        }
        let mut terminal_node = SpanningNode::new(TERMINAL, terminal, 0);
        terminal_node.cardinality = 1;
        terminal_node.xary.expand = true;
        tree.nodes.push(terminal_node);

        // post-order: messages go to the first node completing them
        let mut added = vec![false; dims.len()];
        let mut frames: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some(frame) = frames.last_mut() {
            let (index, next) = *frame;
            if next < tree.nodes[index].children.len() {
                frame.1 += 1;
                let child = tree.nodes[index].children[next];
                if child != terminal {
                    frames.push((child, 0));
                }
                continue;
            }
            frames.pop();
            tree.annotate(index, bound, map, &mut added)?;
        }
        tree.nodes[0].cardinality = 0;

        info!(
            "spanning tree: {} layers, upper bound {}, max cardinality {}, {}",
            tree.nodes.len(),
            tree.upper_bound(),
            tree.max_cardinality,
            if tree.is_tree { "tree" } else { "chain" }
        );
        Ok(tree)
    }

    fn annotate(&mut self, index: usize, bound: &Bound, map: &LiteralMap, added: &mut [bool]) -> Result<()> {
        let dims = bound.dims();
        let variable = self.nodes[index].variable;
        let root = variable == DUMMY_ROOT;

        let mut messages = Vec::new();
        if !root {
            for &c in bound.constraints_of(variable) {
                if !added[c] {
                    added[c] = true;
                    messages.push(c as Variable);
                }
            }
        }

        let mut spanning: BTreeSet<Variable> = BTreeSet::new();
        for &c in &self.nodes[index].children {
            spanning.extend(self.nodes[c].spanning.iter().copied());
        }
        for &m in &messages {
            spanning.extend(bound.constraint(m as usize).iter().copied());
        }
        spanning.remove(&variable);
        let spanning: Vec<Variable> = spanning.into_iter().collect();

        let cardinality = if root {
            0
        } else {
            spanning
                .iter()
                .try_fold(1usize, |acc, &s| acc.checked_mul(dims[s as usize] as usize))
                .filter(|&c| c < u32::MAX as usize)
                .ok_or_else(|| {
                    Error::Unsupported(format!("layer of variable {} has too many contexts", variable))
                })?
        };

        for &c in &self.nodes[index].children.clone() {
            let child = &mut self.nodes[c];
            child.xary.map = XAry::create_map(&spanning, &child.spanning);
            child.xary.restrict = XAry::restriction(&child.xary.map);
            child.xary.dimension = child.spanning.iter().map(|&s| dims[s as usize]).collect();
            let pos = child.spanning.iter().position(|&s| s == variable);
            child.xary.expand = pos.is_none();
            child.xary.pos = pos.unwrap_or(child.spanning.len());
        }

        for &m in &messages {
            let cpt = map.cpt(m);
            self.cpt_map[m as usize] = XAry::create_map(&spanning, &cpt.variables);
            self.cpt_variable_pos[m as usize] = cpt.variables.iter().position(|&v| v == variable).unwrap_or_default();
        }

        let node = &mut self.nodes[index];
        node.messages = messages;
        node.spanning = spanning;
        node.cardinality = cardinality;
        if root {
            node.xary.dimension.clear();
        } else {
            debug!(
                "layer {} (variable {}): spanning {:?}, cardinality {}, {} messages",
                index,
                variable,
                node.spanning,
                cardinality,
                node.messages.len()
            );
        }

        self.max_cardinality = self.max_cardinality.max(node.cardinality);
        self.or_bound = self.or_bound.saturating_add(node.or_bound());
        self.and_bound = self.and_bound.saturating_add(node.and_bound());
        self.or_edge_bound = self.or_edge_bound.saturating_add(node.or_edge_bound());
        self.and_edge_bound = self.and_edge_bound.saturating_add(node.and_edge_bound());
        self.weight_bound = self.weight_bound.saturating_add(node.weight_bound());
        Ok(())
    }

    pub fn nodes(&self) -> &[SpanningNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &SpanningNode {
        &self.nodes[index]
    }

    pub fn root(&self) -> &SpanningNode {
        &self.nodes[0]
    }

    pub fn terminal(&self) -> &SpanningNode {
        &self.nodes[self.nodes.len() - 1]
    }

    pub fn cpt_map(&self, cpt: Variable) -> &[Option<usize>] {
        &self.cpt_map[cpt as usize]
    }

    pub fn cpt_variable_pos(&self, cpt: Variable) -> usize {
        self.cpt_variable_pos[cpt as usize]
    }

    /// Number of layers, dummy root and terminal included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 2
    }

    pub fn nr_variables(&self) -> usize {
        self.nodes.len().saturating_sub(2)
    }

    pub fn pre_ordering(&self) -> &[Variable] {
        &self.pre_ordering
    }

    /// Whether any layer branches into AND nodes.
    pub fn is_tree(&self) -> bool {
        self.is_tree
    }

    pub fn or_upper_bound(&self) -> usize {
        self.or_bound
    }

    pub fn and_upper_bound(&self) -> usize {
        self.and_bound
    }

    /// Node bound, terminal included.
    pub fn upper_bound(&self) -> usize {
        self.or_bound.saturating_add(self.and_bound).saturating_add(1)
    }

    pub fn edge_upper_bound(&self) -> usize {
        self.or_edge_bound.saturating_add(self.and_edge_bound)
    }

    pub fn weight_upper_bound(&self) -> usize {
        self.weight_bound
    }

    pub fn max_cardinality(&self) -> usize {
        self.max_cardinality
    }

    pub fn avg_cardinality(&self) -> f64 {
        self.or_bound as f64 / self.nr_variables().max(1) as f64
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Estimated memory for a compiled multigraph: symbolic edge weights,
    /// or one probability per edge.
    pub fn required_bytes(&self, probabilities: bool) -> usize {
        use std::mem::size_of;

        let nodes = self.or_bound.saturating_add(self.and_bound);
        let edge = size_of::<u64>()
            + if probabilities {
                size_of::<f64>()
            } else {
                size_of::<Vec<WeightId>>()
            };
        let mut bytes = nodes
            .saturating_mul(size_of::<Vec<u8>>() + size_of::<Variable>() + 1)
            .saturating_add(self.edge_upper_bound().saturating_mul(edge))
            .saturating_add(nodes.saturating_mul(size_of::<u64>()))
            .saturating_add(self.or_bound.saturating_mul(size_of::<u32>()));
        if !probabilities {
            bytes = bytes.saturating_add(self.weight_bound.saturating_mul(size_of::<WeightId>()));
        }
        bytes
    }

    pub fn required_mb(&self, probabilities: bool) -> f64 {
        self.required_bytes(probabilities) as f64 / 1e6
    }

    pub fn log_stats(&self) {
        debug!(
            "spanning tree: tree {}, bound {} (or {}, and {}), edges {}, weights {}, cardinality max {} avg {:.2}, width/height {}/{}, ~{:.3}MB",
            self.is_tree,
            self.upper_bound(),
            self.or_bound,
            self.and_bound,
            self.edge_upper_bound(),
            self.weight_bound,
            self.max_cardinality,
            self.avg_cardinality(),
            self.width,
            self.height,
            self.required_mb(false)
        );
    }

    /// Graphviz rendering of the layers.
    pub fn to_dot(&self) -> std::result::Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "digraph SPANNINGTREE {{")?;
        writeln!(out, "    forcelabels = true;")?;
        writeln!(out, "    center = true;")?;
        writeln!(out, "    rankdir = TB;")?;
        writeln!(out, "    edge [arrowsize=.5,dir = normal];")?;
        writeln!(out)?;
        writeln!(out, "    0 [ label = \"order\", shape = plaintext ];")?;
        for node in &self.nodes[1..self.nodes.len() - 1] {
            let spanning: Vec<String> = node.spanning.iter().map(|s| s.to_string()).collect();
            writeln!(
                out,
                "    {} [ fontsize=8, label = \"Variable {}\\nSpanning: {{{}}}\\nCardinality: {}\" ];",
                node.index,
                node.variable,
                spanning.join(","),
                node.cardinality
            )?;
        }
        writeln!(out)?;
        for node in &self.nodes {
            for &c in &node.children {
                if !self.nodes[c].is_terminal() {
                    writeln!(out, "    {} -> {};", node.index, c)?;
                }
            }
        }
        writeln!(out, "}}")?;
        Ok(out)
    }

    pub fn write_dot(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self
            .to_dot()
            .map_err(|_| Error::internal("formatting the spanning tree failed"))?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }
}
