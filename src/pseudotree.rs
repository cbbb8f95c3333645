//! Pseudo-trees over the interaction graph of a partition.
//!
//! The interaction graph has one vertex per variable of a partition (owned and
//! cutset) and a clique per owned CPT. Eliminating vertices in the reverse of
//! an ordering triangulates the graph; every vertex hangs below the neighbour
//! that is eliminated soonest after it. Variables of one CPT therefore always
//! lie on a single root-to-leaf path, which is what lets the multigraph
//! compiler branch into independent AND children.
//!
//! Disconnected components hang below a dummy root with variable
//! [`DUMMY_ROOT`].
//!
//! The text format nests parentheses, root first:
//!
//! ```text
//! (4294967295(0(1)(2)))
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use log::debug;

use crate::bayesnet::BayesNet;
use crate::error::{Error, Result};
use crate::partition::Partition;
use crate::types::Variable;

/// Variable of the dummy root joining all components.
pub const DUMMY_ROOT: Variable = Variable::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudoTreeNode {
    pub variable: Variable,
    pub children: Vec<PseudoTreeNode>,
}

impl PseudoTreeNode {
    pub fn new(variable: Variable) -> Self {
        Self {
            variable,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl Default for PseudoTreeNode {
    fn default() -> Self {
        Self::new(DUMMY_ROOT)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PseudoTree {
    root: PseudoTreeNode,
    /// Depth-first pre-order, dummy root excluded.
    pre_ordering: Vec<Variable>,
    /// Ordering the tree was built from (reverse elimination order).
    ordering: Vec<Variable>,
    width: usize,
    height: usize,
}

/// Adjacency of the interaction graph, indexed by network variable.
fn interaction_graph(bn: &BayesNet, partition: &Partition) -> Vec<BTreeSet<Variable>> {
    let mut adjacency = vec![BTreeSet::new(); bn.nr_variables()];
    for &v in &partition.set {
        let scope: Vec<Variable> = bn.parents(v).iter().copied().chain(std::iter::once(v)).collect();
        for (i, &a) in scope.iter().enumerate() {
            for &b in &scope[i + 1..] {
                if a != b {
                    adjacency[a as usize].insert(b);
                    adjacency[b as usize].insert(a);
                }
            }
        }
    }
    adjacency
}

/// Remove `v` from the graph, connecting its neighbours pairwise.
/// Returns the neighbours `v` had.
fn eliminate(adjacency: &mut [BTreeSet<Variable>], v: Variable) -> BTreeSet<Variable> {
    let neighbours = std::mem::take(&mut adjacency[v as usize]);
    for &a in &neighbours {
        adjacency[a as usize].remove(&v);
        for &b in &neighbours {
            if a != b {
                adjacency[a as usize].insert(b);
            }
        }
    }
    neighbours
}

/// Number of edges eliminating `v` would add.
fn fill_in(adjacency: &[BTreeSet<Variable>], v: Variable) -> usize {
    let neighbours: Vec<Variable> = adjacency[v as usize].iter().copied().collect();
    let mut fill = 0;
    for (i, &a) in neighbours.iter().enumerate() {
        for &b in &neighbours[i + 1..] {
            if !adjacency[a as usize].contains(&b) {
                fill += 1;
            }
        }
    }
    fill
}

impl PseudoTree {
    /// Pseudo-tree induced by eliminating the partition in reverse `ordering`.
    pub fn from_ordering(bn: &BayesNet, partition: &Partition, ordering: &[Variable]) -> Result<Self> {
        Self::build(bn, partition, ordering, false)
    }

    /// Degenerate pseudo-tree: every variable is the only child of its
    /// predecessor in `ordering`. The width is still that of the induced graph.
    pub fn chain(bn: &BayesNet, partition: &Partition, ordering: &[Variable]) -> Result<Self> {
        Self::build(bn, partition, ordering, true)
    }

    /// Pseudo-tree along a min-fill ordering.
    pub fn generate(bn: &BayesNet, partition: &Partition) -> Result<Self> {
        let ordering = Self::min_fill(bn, partition);
        Self::from_ordering(bn, partition, &ordering)
    }

    /// Greedy min-fill ordering of a partition.
    ///
    /// Repeatedly eliminates the variable adding the fewest fill-in edges,
    /// breaking ties by degree and then by variable. The returned ordering
    /// is the reverse of that elimination.
    pub fn min_fill(bn: &BayesNet, partition: &Partition) -> Vec<Variable> {
        let mut adjacency = interaction_graph(bn, partition);
        let mut remaining = partition.variables();
        let mut elimination = Vec::with_capacity(remaining.len());

        while let Some(v) = remaining
            .iter()
            .copied()
            .min_by_key(|&v| (fill_in(&adjacency, v), adjacency[v as usize].len(), v))
        {
            eliminate(&mut adjacency, v);
            remaining.remove(&v);
            elimination.push(v);
        }

        elimination.reverse();
        elimination
    }

    fn build(bn: &BayesNet, partition: &Partition, ordering: &[Variable], chain: bool) -> Result<Self> {
        let variables = partition.variables();
        let unique: BTreeSet<Variable> = ordering.iter().copied().collect();
        if unique != variables || unique.len() != ordering.len() {
            return Err(Error::InvalidOrdering(format!(
                "pseudo-tree ordering lists {} variables, partition has {}",
                ordering.len(),
                variables.len()
            )));
        }

        let n = bn.nr_variables();
        let mut position = vec![usize::MAX; n];
        for (i, &v) in ordering.iter().enumerate() {
            position[v as usize] = i;
        }

        let mut adjacency = interaction_graph(bn, partition);
        let mut parent: Vec<Option<Variable>> = vec![None; n];
        let mut width = 0;
        for &v in ordering.iter().rev() {
            let neighbours = eliminate(&mut adjacency, v);
            width = width.max(neighbours.len());
            if !chain {
                parent[v as usize] = neighbours.iter().copied().max_by_key(|&u| position[u as usize]);
            }
        }
        if chain {
            for pair in ordering.windows(2) {
                parent[pair[1] as usize] = Some(pair[0]);
            }
        }

        // children are eliminated before their parent, so every subtree is
        // complete by the time its root is reached
        let mut children: Vec<Vec<Variable>> = vec![Vec::new(); n];
        let mut roots = Vec::new();
        for &v in ordering {
            match parent[v as usize] {
                Some(p) => children[p as usize].push(v),
                None => roots.push(v),
            }
        }
        let mut built: Vec<Option<PseudoTreeNode>> = vec![None; n];
        for &v in ordering.iter().rev() {
            let mut node = PseudoTreeNode::new(v);
            for &c in &children[v as usize] {
                if let Some(child) = built[c as usize].take() {
                    node.children.push(child);
                }
            }
            built[v as usize] = Some(node);
        }
        let mut root = PseudoTreeNode::new(DUMMY_ROOT);
        root.children = roots.iter().filter_map(|&r| built[r as usize].take()).collect();

        let mut tree = Self {
            root,
            pre_ordering: Vec::new(),
            ordering: ordering.to_vec(),
            width,
            height: 0,
        };
        tree.refresh();
        debug!(
            "pseudo-tree over {} variables: width {}, height {}, {} components{}",
            tree.len(),
            tree.width,
            tree.height,
            tree.root.children.len(),
            if chain { " (chain)" } else { "" }
        );
        Ok(tree)
    }

    /// Recompute the pre-order and the height from the node structure.
    fn refresh(&mut self) {
        self.pre_ordering.clear();
        self.height = 0;
        let mut stack: Vec<(&PseudoTreeNode, usize)> = self.root.children.iter().rev().map(|c| (c, 1)).collect();
        while let Some((node, depth)) = stack.pop() {
            self.pre_ordering.push(node.variable);
            self.height = self.height.max(depth);
            stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        }
    }

    pub fn root(&self) -> &PseudoTreeNode {
        &self.root
    }

    pub fn pre_ordering(&self) -> &[Variable] {
        &self.pre_ordering
    }

    /// Ordering the tree was induced from; empty for trees read from text.
    pub fn ordering(&self) -> &[Variable] {
        &self.ordering
    }

    pub fn len(&self) -> usize {
        self.pre_ordering.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Largest number of neighbours at elimination (induced width).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Variables on the longest root-to-leaf path.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn to_tree_string(&self) -> String {
        enum Step<'a> {
            Open(&'a PseudoTreeNode),
            Close,
        }

        let mut out = String::new();
        let mut stack = vec![Step::Open(&self.root)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(node) => {
                    out.push('(');
                    out.push_str(&node.variable.to_string());
                    stack.push(Step::Close);
                    stack.extend(node.children.iter().rev().map(Step::Open));
                }
                Step::Close => out.push(')'),
            }
        }
        out
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, format!("{}\n", self.to_tree_string())).map_err(|e| Error::io(path, e))
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&text, &path.display().to_string())
    }

    /// Parse the first line of `text`.
    pub fn parse(text: &str, what: &str) -> Result<Self> {
        let line = text.lines().next().unwrap_or("").trim();
        let bytes = line.as_bytes();

        // path of child indices from the root to the node being filled
        let mut path: Vec<usize> = Vec::new();
        let mut root = PseudoTreeNode::default();
        let mut open = 0usize;
        let mut expect_number = false;
        let mut seen_root = false;
        let mut i = 0;

        fn at<'a>(root: &'a mut PseudoTreeNode, path: &[usize]) -> &'a mut PseudoTreeNode {
            path.iter().fold(root, |node, &c| &mut node.children[c])
        }

        while i < bytes.len() {
            if seen_root && open == 0 {
                return Err(Error::parse(
                    what,
                    1,
                    format!("{} characters left after the pseudo-tree", bytes.len() - i),
                ));
            }
            match bytes[i] {
                b'(' if !expect_number => {
                    expect_number = true;
                    i += 1;
                }
                b')' if !expect_number && open > 0 => {
                    open -= 1;
                    path.pop();
                    i += 1;
                }
                c if expect_number => {
                    if !c.is_ascii_digit() {
                        return Err(Error::parse(
                            what,
                            1,
                            format!("read '{}' at position {}, expected a number", c as char, i),
                        ));
                    }
                    let start = i;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                    let variable: Variable = line[start..i]
                        .parse()
                        .map_err(|_| Error::parse(what, 1, format!("variable out of range at position {}", start)))?;
                    if seen_root {
                        let node = at(&mut root, &path);
                        node.children.push(PseudoTreeNode::new(variable));
                        path.push(node.children.len() - 1);
                    } else {
                        root.variable = variable;
                        seen_root = true;
                    }
                    open += 1;
                    expect_number = false;
                }
                c => {
                    return Err(Error::parse(
                        what,
                        1,
                        format!("unexpected '{}' at position {}", c as char, i),
                    ))
                }
            }
        }
        if open > 0 || expect_number {
            return Err(Error::parse(what, 1, format!("{} missing closing brackets", open.max(1))));
        }

        let mut tree = Self {
            root,
            ..Self::default()
        };
        tree.refresh();
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// A -> B, A -> C, B -> D, E isolated.
    fn network() -> BayesNet {
        let mut bn = BayesNet::new();
        let a = bn.add_variable("A", &["0", "1"]);
        let b = bn.add_variable("B", &["0", "1"]);
        let c = bn.add_variable("C", &["0", "1"]);
        let d = bn.add_variable("D", &["0", "1"]);
        bn.add_variable("E", &["0", "1"]);
        bn.set_potential(b, &[a], vec![0.5; 4]).unwrap();
        bn.set_potential(c, &[a], vec![0.5; 4]).unwrap();
        bn.set_potential(d, &[b], vec![0.5; 4]).unwrap();
        bn
    }

    #[test]
    fn test_tree_branches_at_common_parent() {
        let bn = network();
        let partition = Partition::new(0..5, &bn);
        let tree = PseudoTree::from_ordering(&bn, &partition, &[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(tree.to_tree_string(), "(4294967295(0(1(3))(2))(4))");
        assert_eq!(tree.pre_ordering(), &[0, 1, 3, 2, 4]);
        assert_eq!(tree.width(), 1);
        assert_eq!(tree.height(), 3);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_chain_follows_ordering() {
        let bn = network();
        let partition = Partition::new(0..5, &bn);
        let tree = PseudoTree::chain(&bn, &partition, &[0, 1, 2, 3, 4]).unwrap();
        assert_eq!(tree.root().children.len(), 1);
        assert_eq!(tree.pre_ordering(), &[0, 1, 2, 3, 4]);
        assert_eq!(tree.height(), 5);
        assert_eq!(tree.width(), 1);
    }

    #[test]
    fn test_fill_in_raises_width() {
        let bn = network();
        let partition = Partition::new(0..5, &bn);
        // eliminating A first connects B and C
        let tree = PseudoTree::from_ordering(&bn, &partition, &[4, 3, 2, 1, 0]).unwrap();
        assert_eq!(tree.width(), 2);
    }

    #[test]
    fn test_min_fill_is_a_permutation() {
        let bn = network();
        let partition = Partition::new(0..5, &bn);
        let mut ordering = PseudoTree::min_fill(&bn, &partition);
        let tree = PseudoTree::generate(&bn, &partition).unwrap();
        assert_eq!(tree.ordering(), ordering.as_slice());
        assert_eq!(tree.width(), 1);
        ordering.sort_unstable();
        assert_eq!(ordering, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_rejects_incomplete_ordering() {
        let bn = network();
        let partition = Partition::new(0..5, &bn);
        assert!(matches!(
            PseudoTree::from_ordering(&bn, &partition, &[0, 1, 2]),
            Err(Error::InvalidOrdering(_))
        ));
        assert!(PseudoTree::chain(&bn, &partition, &[0, 1, 2, 3, 3]).is_err());
    }

    #[test]
    fn test_parse_reads_written_tree() {
        let bn = network();
        let partition = Partition::new(0..5, &bn);
        let tree = PseudoTree::from_ordering(&bn, &partition, &[0, 1, 2, 3, 4]).unwrap();
        let parsed = PseudoTree::parse(&tree.to_tree_string(), "tree").unwrap();
        assert_eq!(parsed.root(), tree.root());
        assert_eq!(parsed.pre_ordering(), tree.pre_ordering());
        assert_eq!(parsed.height(), 3);
    }

    #[test]
    fn test_parse_errors() {
        assert!(PseudoTree::parse("(1(2)", "t").is_err());
        assert!(PseudoTree::parse("(1(x))", "t").is_err());
        assert!(PseudoTree::parse("(1(2))(3)", "t").is_err());
        assert!(PseudoTree::parse("1(2)", "t").is_err());
    }
}
