//! Composition orderings: the order in which partition diagrams are joined.
//!
//! A variable is *shared* when more than one partition mentions it, owned or
//! in the cutset. Partitions are joined in reverse ordering: each joined
//! partition becomes the parent of the earlier nodes whose context it shares
//! a variable with, and its context is the union of theirs plus its own
//! shared variables, minus the variables that no partition still to be
//! joined mentions. The score of an ordering is the sum over joins of the
//! product of the context's domain sizes.
//!
//! The tree built from an ordering gets a common root without a partition,
//! and its nodes are numbered in pre-order from that root.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::path::Path;

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::ordering::{parse_indices, to_index_string};
use crate::partition::Partitions;
use crate::types::Variable;
use crate::utils::next_permutation;

/// Largest number of partitions [`Composition::find_ordering`] enumerates.
pub const MAX_BRUTE_FORCE_PARTITIONS: usize = 12;
const MAX_ITERATIONS: usize = 10_000_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionNode {
    /// Pre-order index.
    pub id: usize,
    /// `None` for the common root.
    pub partition: Option<usize>,
    pub parent: Option<usize>,
    /// Ascending.
    pub context: Vec<Variable>,
    pub children: Vec<usize>,
}

impl CompositionNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Composition {
    dims: Vec<u32>,
    occurrences: Vec<u32>,
    /// Per partition, ascending.
    shared: Vec<Vec<Variable>>,
    ordering: Vec<usize>,
    /// Pre-order.
    nodes: Vec<CompositionNode>,
    partition_to_node: Vec<usize>,
}

fn is_related(shared: &[Variable], context: &BTreeSet<Variable>) -> bool {
    shared.iter().any(|v| context.contains(v))
}

impl Composition {
    pub fn new(dims: &[u32]) -> Self {
        Self {
            dims: dims.to_vec(),
            ..Self::default()
        }
    }

    /// Count occurrences and determine the shared variables of each partition.
    pub fn set_partitions(&mut self, partitions: &Partitions) {
        self.occurrences = vec![0; self.dims.len()];
        for partition in partitions.iter() {
            for &v in partition.set.iter().chain(&partition.cutset) {
                self.occurrences[v as usize] += 1;
            }
        }
        self.shared = partitions
            .iter()
            .map(|partition| {
                let mut shared: Vec<Variable> = partition
                    .set
                    .iter()
                    .chain(&partition.cutset)
                    .copied()
                    .filter(|&v| self.occurrences[v as usize] > 1)
                    .collect();
                shared.sort_unstable();
                shared
            })
            .collect();
        self.ordering.clear();
        self.nodes.clear();
        self.partition_to_node.clear();
        debug!(
            "composition over {} partitions, {} shared variables",
            self.shared.len(),
            self.occurrences.iter().filter(|&&c| c > 1).count()
        );
    }

    pub fn has_partitions(&self) -> bool {
        !self.shared.is_empty()
    }

    pub fn has_ordering(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub fn nr_partitions(&self) -> usize {
        self.shared.len()
    }

    /// Number of tree nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn shared(&self, partition: usize) -> &[Variable] {
        &self.shared[partition]
    }

    pub fn ordering(&self) -> &[usize] {
        &self.ordering
    }

    pub fn nodes(&self) -> &[CompositionNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&CompositionNode> {
        self.nodes.first()
    }

    pub fn partition_node(&self, partition: usize) -> &CompositionNode {
        &self.nodes[self.partition_to_node[partition]]
    }

    pub fn context(&self, node: usize) -> &[Variable] {
        &self.nodes[node].context
    }

    pub fn partition_context(&self, partition: usize) -> &[Variable] {
        &self.partition_node(partition).context
    }

    fn width(&self, context: &BTreeSet<Variable>) -> f64 {
        context.iter().map(|&v| self.dims[v as usize] as f64).product()
    }

    fn update_context(&self, occurrences: &mut [u32], partition: usize, context: &mut BTreeSet<Variable>) {
        for &v in &self.shared[partition] {
            let count = &mut occurrences[v as usize];
            *count = count.saturating_sub(1);
            if *count != 0 {
                context.insert(v);
            } else {
                context.remove(&v);
            }
        }
    }

    /// Cost of joining the partitions in `ordering`; with `chain`, every
    /// join takes the previous one as its only child.
    pub fn compute_score(&self, ordering: &[usize], chain: bool) -> f64 {
        let mut occurrences = self.occurrences.clone();
        let mut roots: Vec<BTreeSet<Variable>> = Vec::new();
        let mut score = 0.0;

        for &p in ordering.iter().rev() {
            let mut context = if chain {
                roots.pop().unwrap_or_default()
            } else {
                let shared = &self.shared[p];
                let (related, rest): (Vec<_>, Vec<_>) = roots.into_iter().partition(|r| is_related(shared, r));
                roots = rest;
                related.into_iter().flatten().collect()
            };
            self.update_context(&mut occurrences, p, &mut context);
            score += self.width(&context);
            roots.push(context);
        }
        score
    }

    /// Cheapest ordering over every permutation of the partitions.
    pub fn find_ordering(&self) -> Result<Vec<usize>> {
        let n = self.shared.len();
        if n > MAX_BRUTE_FORCE_PARTITIONS {
            return Err(Error::Unsupported(format!(
                "composition ordering over {} partitions (at most {})",
                n, MAX_BRUTE_FORCE_PARTITIONS
            )));
        }

        let mut ordering: Vec<usize> = (0..n).collect();
        let mut best = ordering.clone();
        let mut best_score = self.compute_score(&ordering, false);
        let mut iterations = 1;
        while next_permutation(&mut ordering) {
            let score = self.compute_score(&ordering, false);
            if score < best_score {
                best_score = score;
                best.clone_from(&ordering);
            }
            iterations += 1;
            if iterations >= MAX_ITERATIONS {
                warn!("composition search limited to {} orderings", MAX_ITERATIONS);
                break;
            }
        }
        info!("composition ordering {:?}, score {}", best, best_score);
        Ok(best)
    }

    /// Score of the cheapest composition of `partitions`.
    pub fn compute_best_score(dims: &[u32], partitions: &Partitions) -> Result<f64> {
        let mut composition = Self::new(dims);
        composition.set_partitions(partitions);
        let ordering = composition.find_ordering()?;
        Ok(composition.compute_score(&ordering, false))
    }

    /// Build the composition tree of `ordering` and number it.
    pub fn build_ordering(&mut self, ordering: &[usize], chain: bool) -> Result<()> {
        let n = self.shared.len();
        let mut seen = vec![false; n];
        for &p in ordering {
            if p >= n || std::mem::replace(&mut seen[p], true) {
                return Err(Error::InvalidOrdering(format!(
                    "composition ordering {:?} is not a permutation of 0..{}",
                    ordering, n
                )));
            }
        }
        if ordering.len() != n {
            return Err(Error::InvalidOrdering(format!(
                "composition ordering lists {} of {} partitions",
                ordering.len(),
                n
            )));
        }

        // built[i] is the node of the i-th join; the root comes last
        let mut occurrences = self.occurrences.clone();
        let mut built: Vec<CompositionNode> = Vec::with_capacity(n + 1);
        let mut roots: Vec<usize> = Vec::new();
        for &p in ordering.iter().rev() {
            let index = built.len();
            let mut context = BTreeSet::new();
            let children: Vec<usize> = if chain {
                roots.drain(..).collect()
            } else {
                let shared = &self.shared[p];
                let (related, rest): (Vec<usize>, Vec<usize>) = std::mem::take(&mut roots)
                    .into_iter()
                    .partition(|&r| shared.iter().any(|v| built[r].context.binary_search(v).is_ok()));
                roots = rest;
                related
            };
            for &c in &children {
                context.extend(built[c].context.iter().copied());
                built[c].parent = Some(index);
            }
            self.update_context(&mut occurrences, p, &mut context);
            built.push(CompositionNode {
                id: 0,
                partition: Some(p),
                parent: None,
                context: context.into_iter().collect(),
                children,
            });
            roots.push(index);
        }
        let root = built.len();
        for &r in &roots {
            built[r].parent = Some(root);
        }
        built.push(CompositionNode {
            children: roots,
            ..CompositionNode::default()
        });

        // pre-order renumbering
        let mut order = Vec::with_capacity(built.len());
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(built[i].children.iter().rev());
        }
        let mut id = vec![0; built.len()];
        for (k, &i) in order.iter().enumerate() {
            id[i] = k;
        }

        self.partition_to_node = vec![0; n];
        self.nodes = order
            .iter()
            .map(|&i| {
                let node = &built[i];
                if let Some(p) = node.partition {
                    self.partition_to_node[p] = id[i];
                }
                CompositionNode {
                    id: id[i],
                    partition: node.partition,
                    parent: node.parent.map(|x| id[x]),
                    context: node.context.clone(),
                    children: node.children.iter().map(|&c| id[c]).collect(),
                }
            })
            .collect();
        self.ordering = ordering.to_vec();
        debug!("composition tree with {} nodes", self.nodes.len());
        Ok(())
    }

    /// Box-drawing rendering with each node's context and its number of
    /// assignments.
    pub fn to_ascii(&self) -> std::result::Result<String, fmt::Error> {
        let mut out = String::new();
        if let Some(root) = self.root() {
            writeln!(out, "(*)")?;
            self.ascii_children(root, &mut String::new(), &mut out)?;
        }
        Ok(out)
    }

    fn ascii_children(
        &self,
        node: &CompositionNode,
        prefix: &mut String,
        out: &mut String,
    ) -> std::result::Result<(), fmt::Error> {
        for (k, &c) in node.children.iter().enumerate() {
            let child = &self.nodes[c];
            let last = k + 1 == node.children.len();
            let label = format!(
                "{}{}\u{2500}\u{2500}({})",
                prefix,
                if last { '\u{2514}' } else { '\u{251C}' },
                child.partition.unwrap_or_default()
            );
            let context: Vec<String> = child.context.iter().map(|v| v.to_string()).collect();
            let assignments: u64 = child.context.iter().map(|&v| self.dims[v as usize] as u64).product();
            writeln!(out, "{:<60}{{{}}} : {}", label, context.join(","), assignments)?;

            let len = prefix.len();
            prefix.push_str(if last { "    " } else { "\u{2502}   " });
            self.ascii_children(child, prefix, out)?;
            prefix.truncate(len);
        }
        Ok(())
    }

    pub fn write_ordering(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, to_index_string(&self.ordering)).map_err(|e| Error::io(path, e))
    }

    pub fn read_ordering(path: impl AsRef<Path>) -> Result<Vec<usize>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(parse_indices(&text, &path.display().to_string())?
            .into_iter()
            .map(|x| x as usize)
            .collect())
    }
}
