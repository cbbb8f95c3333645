//! Multigraphs: layered AND-OR decision diagrams.
//!
//! A multigraph is compiled bottom-up from a [`SpanningTree`]. Layer `i`
//! holds one OR node per context of its spanning set; the OR node has one
//! edge per value of the layer variable, labelled with the product of the
//! CPT rows completed there and leading to the child layer's node for the
//! extended context. A layer with several children routes each value through
//! an AND node joining the children.
//!
//! | Node | Edges                        | Operators                    |
//! |------|------------------------------|------------------------------|
//! | OR   | one per value                | `2 * edges + weights`        |
//! | AND  | one per child layer          | `edges - 1`                  |
//!
//! With local structure, every new node is looked up in its layer's unique
//! table first and equal nodes are shared: the context slot then points at
//! the existing node. Without it, in a chain the node of context `c` is
//! always node `c` of its layer, which is what the parallel compiler relies
//! on.
//!
//! Edge labels are generic over [`EdgeWeight`]: [`Weights`] keeps the
//! symbolic weight identifiers, [`Product`] multiplies them out into one
//! probability.

use std::fmt::{self, Debug, Write as _};
use std::path::Path;

use log::{debug, info};

use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::literals::{CptNode, LiteralMap};
use crate::spanning::{SpanningNode, SpanningTree, TERMINAL};
use crate::table::Table;
use crate::types::{Probability, Variable, WeightId};
use crate::utils::{pairing2, pairing3, pairing_seq, MyHash};
use crate::xary::XAry;

/// Label of a multigraph edge.
pub trait EdgeWeight: Clone + Eq + Debug + Send + Sync {
    /// Neutral label.
    fn unit() -> Self;
    /// Label of an edge that cannot be taken.
    fn zero() -> Self;
    fn is_zero(&self) -> bool;
    /// Multiply in row `row` of `cpt`.
    fn multiply(&mut self, cpt: &CptNode, row: usize);
    fn value(&self, map: &LiteralMap) -> Probability;
    /// Number of weights written for this label.
    fn nr_weights(&self) -> usize;
    fn hash_value(&self) -> u64;
    /// ` n w1 .. wn`
    fn write_dd(&self, out: &mut String) -> fmt::Result;
    fn label(&self, map: &LiteralMap) -> String;
}

/// Sorted weight identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Weights(Vec<WeightId>);

impl Weights {
    pub fn ids(&self) -> &[WeightId] {
        &self.0
    }
}

impl EdgeWeight for Weights {
    fn unit() -> Self {
        Weights(Vec::new())
    }

    fn zero() -> Self {
        Weights(vec![0])
    }

    fn is_zero(&self) -> bool {
        self.0.first() == Some(&0)
    }

    fn multiply(&mut self, cpt: &CptNode, row: usize) {
        let w = cpt.weights[row];
        if w == 1 {
            return;
        }
        let at = self.0.partition_point(|&x| x < w);
        self.0.insert(at, w);
    }

    fn value(&self, map: &LiteralMap) -> Probability {
        self.0.iter().map(|&w| map.weight_value(w)).product()
    }

    fn nr_weights(&self) -> usize {
        self.0.len()
    }

    fn hash_value(&self) -> u64 {
        pairing_seq(self.0.iter().map(|&w| w as u64))
    }

    fn write_dd(&self, out: &mut String) -> fmt::Result {
        write!(out, " {}", self.0.len())?;
        for w in &self.0 {
            write!(out, " {}", w)?;
        }
        Ok(())
    }

    fn label(&self, _map: &LiteralMap) -> String {
        let ids: Vec<String> = self.0.iter().map(|w| w.to_string()).collect();
        ids.join(",")
    }
}

/// One multiplied probability.
#[derive(Debug, Clone, Copy)]
pub struct Product(pub Probability);

impl PartialEq for Product {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Product {}

impl EdgeWeight for Product {
    fn unit() -> Self {
        Product(1.0)
    }

    fn zero() -> Self {
        Product(0.0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    fn multiply(&mut self, cpt: &CptNode, row: usize) {
        self.0 *= cpt.probabilities[row];
    }

    fn value(&self, _map: &LiteralMap) -> Probability {
        self.0
    }

    fn nr_weights(&self) -> usize {
        usize::from(self.0 != 1.0)
    }

    fn hash_value(&self) -> u64 {
        self.0.to_bits()
    }

    fn write_dd(&self, out: &mut String) -> fmt::Result {
        if self.0 == 1.0 {
            out.write_str(" 0")
        } else {
            write!(out, " 1 {:?}", self.0)
        }
    }

    fn label(&self, _map: &LiteralMap) -> String {
        format!("{:.4}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub layer: u32,
    pub index: u32,
}

impl NodeId {
    pub fn new(layer: usize, index: usize) -> Self {
        Self {
            layer: layer as u32,
            index: index as u32,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.layer, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<W> {
    pub to: NodeId,
    pub weight: W,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MgNode<W> {
    pub variable: Variable,
    pub and: bool,
    pub edges: Vec<Edge<W>>,
}

impl<W: EdgeWeight> MyHash for MgNode<W> {
    fn hash(&self) -> u64 {
        let edges = pairing_seq(
            self.edges
                .iter()
                .map(|e| pairing3(e.to.layer as u64, e.to.index as u64, e.weight.hash_value())),
        );
        pairing2(pairing2(self.variable as u64, self.and as u64), edges)
    }
}

pub struct Layer<W> {
    pub variable: Variable,
    pub nodes: Vec<MgNode<W>>,
    /// Node index of every context.
    pub map: Vec<u32>,
    bound: usize,
    table: Table<MgNode<W>, u32>,
}

impl<W: EdgeWeight> Layer<W> {
    pub(crate) fn new(node: &SpanningNode) -> Self {
        let bound = node.node_bound();
        let bits = (usize::BITS - bound.leading_zeros()).min(20) as usize;
        Self {
            variable: node.variable,
            nodes: Vec::new(),
            map: vec![0; node.cardinality],
            bound,
            table: Table::new(bits),
        }
    }

    pub(crate) fn with_nodes(node: &SpanningNode, nodes: Vec<MgNode<W>>) -> Self {
        let mut layer = Self::new(node);
        layer.map = (0..nodes.len() as u32).collect();
        layer.nodes = nodes;
        layer
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Store `node` and return its index, sharing an equal node when
    /// `structure` is on.
    fn insert(&mut self, layer: usize, node: MgNode<W>, structure: bool) -> Result<u32> {
        if structure {
            if let Some(existing) = self.table.get(&node) {
                return Ok(existing);
            }
        }
        if self.nodes.len() >= self.bound {
            return Err(Error::BoundExceeded { layer, bound: self.bound });
        }
        let index = self.nodes.len() as u32;
        if structure {
            self.table.find_or_insert(node.clone(), index);
        }
        self.nodes.push(node);
        Ok(index)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MgSize {
    pub nodes: usize,
    pub and_nodes: usize,
    pub or_nodes: usize,
    pub edges: usize,
    pub weights: usize,
    pub operators: usize,
}

impl fmt::Display for MgSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes ({} or, {} and), {} edges, {} weights, {} operators",
            self.nodes, self.or_nodes, self.and_nodes, self.edges, self.weights, self.operators
        )
    }
}

/// Context index of `child` reached from its parent's context `ctx` when
/// the parent variable takes `value`.
pub(crate) fn child_context(tree: &SpanningTree, child: usize, ctx: &XAry, value: u32) -> usize {
    let info = &tree.node(child).xary;
    let mut decimal = 0;
    let mut step = 1;
    for (i, (&dim, source)) in info.dimension.iter().zip(&info.map).enumerate() {
        let digit = match source {
            Some(p) => ctx[*p],
            None if !info.expand && i == info.pos => value,
            None => 0,
        };
        decimal += digit as usize * step;
        step *= dim as usize;
    }
    decimal
}

/// Label of the edge for `value` under `ctx`; `None` when a completed CPT
/// row is the reserved zero weight.
pub(crate) fn edge_weight<W: EdgeWeight>(
    tree: &SpanningTree,
    map: &LiteralMap,
    node: &SpanningNode,
    ctx: &XAry,
    value: u32,
) -> Option<W> {
    let mut weight = W::unit();
    for &m in &node.messages {
        let cpt = map.cpt(m);
        let source = tree.cpt_map(m);
        let pos = tree.cpt_variable_pos(m);
        let mut row = 0;
        let mut step = 1;
        for (i, (&dim, s)) in cpt.dims.iter().zip(source).enumerate() {
            let digit = if i == pos { value } else { s.map_or(0, |p| ctx[p]) };
            row += digit as usize * step;
            step *= dim as usize;
        }
        if cpt.weights[row] == 0 {
            return None;
        }
        weight.multiply(cpt, row);
    }
    Some(weight)
}

pub struct MultiGraph<W> {
    layers: Vec<Layer<W>>,
    root: Option<NodeId>,
    terminal: NodeId,
    structure: bool,
    is_tree: bool,
}

/// Multigraph whose edges carry multiplied probabilities.
pub type MultiGraphProbability = MultiGraph<Product>;

impl<W: EdgeWeight> MultiGraph<W> {
    /// Compile `tree` layer by layer, deepest first.
    pub fn compile(tree: &SpanningTree, map: &LiteralMap, structure: bool, deadline: &Deadline) -> Result<Self> {
        let mut mg = Self::empty(tree);
        mg.structure = structure;
        for index in (1..tree.len() - 1).rev() {
            deadline.check()?;
            mg.compile_layer(tree, map, index, deadline)?;
            debug!(
                "layer {} (variable {}): {} of {} nodes",
                index,
                tree.node(index).variable,
                mg.layers[index].len(),
                tree.node(index).node_bound()
            );
        }
        mg.set_root(tree);

        info!("multigraph: {}", mg.size());
        Ok(mg)
    }

    pub(crate) fn empty(tree: &SpanningTree) -> Self {
        let terminal = tree.len() - 1;
        let mut layers: Vec<Layer<W>> = tree.nodes().iter().map(Layer::new).collect();
        let t = &mut layers[terminal];
        t.variable = TERMINAL;
        t.nodes.push(MgNode {
            variable: TERMINAL,
            and: false,
            edges: Vec::new(),
        });
        t.map = vec![0];
        Self {
            layers,
            root: None,
            terminal: NodeId::new(terminal, 0),
            structure: false,
            is_tree: tree.is_tree(),
        }
    }

    pub(crate) fn set_layer(&mut self, index: usize, layer: Layer<W>) {
        self.layers[index] = layer;
    }

    /// Point the root at the first layer; a pseudo-forest gets an AND node
    /// in the dummy root's layer joining its trees.
    pub(crate) fn set_root(&mut self, tree: &SpanningTree) {
        let trees: Vec<NodeId> = tree
            .root()
            .children
            .iter()
            .filter(|&&c| !tree.node(c).is_terminal())
            .map(|&c| NodeId::new(c, self.layers[c].map[0] as usize))
            .collect();
        self.root = match trees.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => {
                let layer = &mut self.layers[0];
                layer.nodes.push(MgNode {
                    variable: tree.root().variable,
                    and: true,
                    edges: trees
                        .iter()
                        .map(|&to| Edge {
                            to,
                            weight: W::unit(),
                        })
                        .collect(),
                });
                Some(NodeId::new(0, layer.nodes.len() - 1))
            }
        };
    }

    fn compile_layer(&mut self, tree: &SpanningTree, map: &LiteralMap, index: usize, deadline: &Deadline) -> Result<()> {
        let node = tree.node(index);
        let mut ctx = node.counter();
        let mut contexts = 0usize;
        loop {
            let mut edges = Vec::with_capacity(node.dimension as usize);
            for value in 0..node.dimension {
                let Some(weight) = edge_weight::<W>(tree, map, node, &ctx, value) else {
                    edges.push(Edge {
                        to: self.terminal,
                        weight: W::zero(),
                    });
                    continue;
                };
                let to = if node.is_and_layer() {
                    let and = MgNode {
                        variable: node.variable,
                        and: true,
                        edges: node
                            .children
                            .iter()
                            .map(|&c| Edge {
                                to: self.target(tree, c, &ctx, value),
                                weight: W::unit(),
                            })
                            .collect(),
                    };
                    NodeId::new(index, self.layers[index].insert(index, and, self.structure)? as usize)
                } else {
                    self.target(tree, node.children[0], &ctx, value)
                };
                edges.push(Edge { to, weight });
            }

            let or = MgNode {
                variable: node.variable,
                and: false,
                edges,
            };
            let slot = self.layers[index].insert(index, or, self.structure)?;
            self.layers[index].map[ctx.decimal()] = slot;

            contexts += 1;
            if contexts % 4096 == 0 {
                deadline.check()?;
            }
            if !ctx.increment() {
                break;
            }
        }
        Ok(())
    }

    fn target(&self, tree: &SpanningTree, child: usize, ctx: &XAry, value: u32) -> NodeId {
        if child + 1 == tree.len() {
            return self.terminal;
        }
        let c = child_context(tree, child, ctx, value);
        NodeId::new(child, self.layers[child].map[c] as usize)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn terminal(&self) -> NodeId {
        self.terminal
    }

    pub fn is_tree(&self) -> bool {
        self.is_tree
    }

    pub fn layers(&self) -> &[Layer<W>] {
        &self.layers
    }

    pub fn node(&self, id: NodeId) -> &MgNode<W> {
        &self.layers[id.layer as usize].nodes[id.index as usize]
    }

    /// Nodes reachable from the root in depth-first pre-order, children in
    /// edge order, terminal excluded.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let Some(root) = self.root else {
            return order;
        };
        let mut visited: Vec<Vec<bool>> = self.layers.iter().map(|l| vec![false; l.nodes.len()]).collect();
        visited[self.terminal.layer as usize][0] = true;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let seen = &mut visited[id.layer as usize][id.index as usize];
            if *seen {
                continue;
            }
            *seen = true;
            order.push(id);
            stack.extend(self.node(id).edges.iter().rev().map(|e| e.to));
        }
        order
    }

    pub fn size(&self) -> MgSize {
        let mut size = MgSize::default();
        for id in self.descendants() {
            let node = self.node(id);
            size.nodes += 1;
            size.edges += node.edges.len();
            if node.and {
                size.and_nodes += 1;
                size.operators += node.edges.len().saturating_sub(1);
            } else {
                size.or_nodes += 1;
                let weights: usize = node.edges.iter().map(|e| e.weight.nr_weights()).sum();
                size.weights += weights;
                size.operators += 2 * node.edges.len() + weights;
            }
        }
        size
    }

    /// Weighted model count.
    pub fn evaluate(&self, map: &LiteralMap) -> Probability {
        self.evaluate_evidence(map, &[])
    }

    /// Weighted model count restricted to `evidence`, indexed by variable.
    pub fn evaluate_evidence(&self, map: &LiteralMap, evidence: &[Option<u32>]) -> Probability {
        let Some(root) = self.root else {
            return 1.0;
        };
        let mut values: Vec<Vec<Probability>> = Vec::with_capacity(self.layers.len());
        values.resize_with(self.layers.len(), Vec::new);
        values[self.terminal.layer as usize] = vec![1.0];

        let value_of = |values: &[Vec<Probability>], id: NodeId| values[id.layer as usize][id.index as usize];
        for index in (0..self.layers.len() - 1).rev() {
            let layer = &self.layers[index];
            let observed = evidence.get(layer.variable as usize).copied().flatten();
            let mut v = vec![0.0; layer.nodes.len()];
            // AND nodes are stored before the OR nodes that use them
            for (i, node) in layer.nodes.iter().enumerate() {
                let x = if node.and {
                    node.edges
                        .iter()
                        .map(|e| if e.to.layer as usize == index { v[e.to.index as usize] } else { value_of(&values, e.to) })
                        .product()
                } else {
                    node.edges
                        .iter()
                        .enumerate()
                        .filter(|&(value, _)| observed.is_none_or(|o| o as usize == value))
                        .map(|(_, e)| {
                            let child = if e.to.layer as usize == index {
                                v[e.to.index as usize]
                            } else {
                                value_of(&values, e.to)
                            };
                            e.weight.value(map) * child
                        })
                        .sum()
                };
                v[i] = x;
            }
            values[index] = v;
        }
        value_of(&values, root)
    }

    /// Text dump: a `multigraph tree|chain N E` header, the terminal as
    /// `0 0`, then one `+|* variable nr_edges (to nr_weights w..)*` line per
    /// node in depth-first order. Node `k` of the dump is line `k`.
    pub fn to_dd_string(&self) -> std::result::Result<String, fmt::Error> {
        let order = self.descendants();
        let mut index: Vec<Vec<usize>> = self.layers.iter().map(|l| vec![0; l.nodes.len()]).collect();
        for (i, id) in order.iter().enumerate() {
            index[id.layer as usize][id.index as usize] = i + 1;
        }
        let size = self.size();

        let mut out = String::new();
        writeln!(
            out,
            "multigraph {} {} {}",
            if self.is_tree { "tree" } else { "chain" },
            size.nodes + 1,
            size.edges
        )?;
        writeln!(out, "0 0")?;
        for &id in &order {
            let node = self.node(id);
            write!(out, "{} {} {}", if node.and { '*' } else { '+' }, node.variable, node.edges.len())?;
            for e in &node.edges {
                write!(out, " {}", index[e.to.layer as usize][e.to.index as usize])?;
                e.weight.write_dd(&mut out)?;
            }
            writeln!(out)?;
        }
        Ok(out)
    }

    pub fn write_dd(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self
            .to_dd_string()
            .map_err(|_| Error::internal("formatting the multigraph dump failed"))?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }

    /// Graphviz rendering of the reachable nodes.
    pub fn to_dot(&self, map: &LiteralMap) -> std::result::Result<String, fmt::Error> {
        let name = |id: NodeId| format!("n{}_{}", id.layer, id.index);
        let mut out = String::new();
        writeln!(out, "digraph MULTIGRAPH {{")?;
        writeln!(out, "    center = true;")?;
        writeln!(out, "    rankdir = TB;")?;
        writeln!(out, "    edge [arrowsize=.5,dir = normal];")?;
        writeln!(out, "    {} [shape=square,label=\"T\"];", name(self.terminal))?;

        let order = self.descendants();
        for &id in &order {
            let node = self.node(id);
            if node.and {
                writeln!(out, "    {} [shape=circle,label=\"*\"];", name(id))?;
            } else {
                writeln!(out, "    {} [label=\"+\\n{}\"];", name(id), map.name(node.variable))?;
            }
        }
        for &id in &order {
            let node = self.node(id);
            for (value, e) in node.edges.iter().enumerate() {
                if node.and {
                    writeln!(out, "    {} -> {};", name(id), name(e.to))?;
                } else {
                    writeln!(
                        out,
                        "    {} -> {} [fontsize=8,label=\"{}\\n{}\"];",
                        name(id),
                        name(e.to),
                        map.value_name(node.variable, value as u32),
                        e.weight.label(map)
                    )?;
                }
            }
        }
        writeln!(out, "}}")?;
        Ok(out)
    }

    pub fn write_dot(&self, path: impl AsRef<Path>, map: &LiteralMap) -> Result<()> {
        let path = path.as_ref();
        let text = self
            .to_dot(map)
            .map_err(|_| Error::internal("formatting the multigraph DOT output failed"))?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }
}
