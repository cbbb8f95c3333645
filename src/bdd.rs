//! Weighted positive BDD manager.
//!
//! A WPBDD represents a weighted function over the literals of a network: a
//! decision node tests one positive literal, its high edge carries a multiset
//! of weight identifiers, and a path to `TRUE` contributes the product of the
//! weights along it. `FALSE` contributes zero.
//!
//! # Ownership
//!
//! Nodes live in a single arena ([`Storage`]) with a free-list, addressed by
//! [`Ref`] handles. The two terminals occupy slots `0` and `1` and are never
//! freed. Every decision node carries a reference count: one per parent edge,
//! plus one for every external holder of a root. Each diagram exclusively
//! owns its decision nodes, which makes the in-place rewrites of
//! [`Bdd::collapse`] and [`Bdd::uncollapse`] safe.
//!
//! Hash-consing happens per pass: every construction (conjoin, solve, copy,
//! collapse) builds its result against a fresh [`UniqueTable`], and
//! [`Bdd::merge`] replaces a finished node with its canonical twin.
//!
//! # Collapsed chains
//!
//! Literals of one variable are tested along a chain of low edges. When a
//! node and its low child lead to the same high child with the same weights,
//! the child is spliced out, unless its own low edge is `TRUE`. A literal
//! that a chain no longer tests then follows the high edge of the nearest
//! chain node above it, which is how [`Bdd::evaluate`] walks a collapsed
//! diagram.
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | [`Bdd::merge`] | replace a node by its canonical twin |
//! | [`Bdd::collapse`] | splice redundant chain nodes, bottom-up |
//! | [`Bdd::uncollapse`] | reinsert spliced nodes |
//! | [`Bdd::copy`] | import a sub-diagram into a table |
//! | [`Bdd::release`] | drop a root and everything only it kept alive |

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::{Debug, Write as _};
use std::path::Path;

use log::debug;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::literals::LiteralMap;
use crate::node::{Node, NodeKey, Weights, FALSE_LITERAL, TRUE_LITERAL};
use crate::reference::Ref;
use crate::storage::Storage;
use crate::table::Table;
use crate::types::{Literal, Probability, Variable, WeightId};

/// Per-pass canonical table.
pub type UniqueTable = Table<NodeKey, Ref>;

/// Computed table of the ITE engine: operand pair to result.
pub type ComputedTable = Cache<(Ref, Ref), Ref>;

pub struct Bdd {
    storage: Storage<Node>,
    /// Variable of each literal; index 0 unused.
    literal_to_variable: Vec<Variable>,
    pub(crate) cache: ComputedTable,
    table_bits: usize,
}

impl Bdd {
    /// Create a manager for literals `1..literal_to_variable.len()`.
    pub fn new(literal_to_variable: Vec<Variable>) -> Self {
        Self::with_capacity(literal_to_variable, 12, 14)
    }

    /// Like [`new`](Self::new), pre-sizing unique tables to `2^table_bits`
    /// buckets and the computed table to `2^cache_bits` entries.
    pub fn with_capacity(literal_to_variable: Vec<Variable>, table_bits: usize, cache_bits: usize) -> Self {
        let mut storage = Storage::new(16);

        // Allocate the terminal nodes:
        let f = storage.alloc(Node::terminal(FALSE_LITERAL));
        let t = storage.alloc(Node::terminal(TRUE_LITERAL));
        assert_eq!(f, Ref::FALSE.index());
        assert_eq!(t, Ref::TRUE.index());

        Self {
            storage,
            literal_to_variable,
            cache: ComputedTable::new(cache_bits),
            table_bits,
        }
    }

    pub fn for_literals(map: &LiteralMap) -> Self {
        Self::new(map.literal_to_variable().to_vec())
    }

    /// A fresh unique table for one construction pass.
    pub fn new_table(&self) -> UniqueTable {
        UniqueTable::new(self.table_bits)
    }

    pub fn cache(&self) -> &ComputedTable {
        &self.cache
    }
}

impl Default for Bdd {
    /// A manager where every literal is its own variable.
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bdd")
            .field("capacity", &self.storage.capacity())
            .field("size", &self.storage.size())
            .field("live_nodes", &self.live_nodes())
            .finish()
    }
}

impl Bdd {
    pub fn node(&self, r: Ref) -> &Node {
        self.storage.value(r.index())
    }
    pub fn literal(&self, r: Ref) -> i32 {
        self.node(r).literal
    }
    pub fn high(&self, r: Ref) -> Ref {
        self.node(r).high
    }
    pub fn low(&self, r: Ref) -> Ref {
        self.node(r).low
    }
    pub fn weights(&self, r: Ref) -> &[WeightId] {
        &self.node(r).weights
    }
    pub fn refs(&self, r: Ref) -> u32 {
        self.node(r).refs
    }

    /// Variable a positive literal belongs to.
    pub fn variable_of(&self, literal: i32) -> Option<Variable> {
        if literal <= 0 {
            return None;
        }
        match self.literal_to_variable.get(literal as usize) {
            Some(&v) => Some(v),
            // Without a literal map every literal stands for itself.
            None if self.literal_to_variable.is_empty() => Some(literal as Variable),
            None => None,
        }
    }

    pub fn same_variable(&self, a: i32, b: i32) -> bool {
        match (self.variable_of(a), self.variable_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    /// Number of decision nodes currently allocated.
    pub fn live_nodes(&self) -> usize {
        self.storage.real_size() - 2
    }

    /// Allocate an unattached node whose edges point at `FALSE`.
    pub fn create(&mut self, literal: Literal, weights: Weights) -> Ref {
        assert!(literal.is_positive(), "Decision nodes test positive literals");
        let i = self.storage.alloc(Node::new(literal, Ref::FALSE, Ref::FALSE, weights));
        Ref::new(i as u32)
    }

    /// Allocate a node and attach both children.
    pub fn mk_node(&mut self, literal: Literal, high: Ref, low: Ref, weights: Weights) -> Ref {
        let n = self.create(literal, weights);
        self.set_high(n, high);
        self.set_low(n, low);
        n
    }

    pub fn reference(&mut self, r: Ref) -> Ref {
        if !r.is_terminal() {
            self.storage.value_mut(r.index()).refs += 1;
        }
        r
    }

    pub fn dereference(&mut self, r: Ref) {
        if !r.is_terminal() {
            let node = self.storage.value_mut(r.index());
            assert!(node.refs > 0, "Dereferencing unreferenced node {}", r);
            node.refs -= 1;
        }
    }

    /// Point the high edge of `n` at `child`, releasing the previous child's reference.
    pub fn set_high(&mut self, n: Ref, child: Ref) {
        self.reference(child);
        let old = std::mem::replace(&mut self.storage.value_mut(n.index()).high, child);
        self.dereference(old);
    }

    /// Point the low edge of `n` at `child`, releasing the previous child's reference.
    pub fn set_low(&mut self, n: Ref, child: Ref) {
        self.reference(child);
        let old = std::mem::replace(&mut self.storage.value_mut(n.index()).low, child);
        self.dereference(old);
    }

    /// Free `n` regardless of its count, releasing (not destroying) its children.
    pub fn force_destroy(&mut self, n: Ref) {
        if n.is_terminal() {
            return;
        }
        let node = self.storage.free(n.index());
        self.dereference(node.high);
        self.dereference(node.low);
    }

    /// Free `n` if nothing refers to it. Returns whether it was freed.
    pub fn destroy(&mut self, n: Ref) -> bool {
        if n.is_terminal() || self.refs(n) > 0 {
            return false;
        }
        self.force_destroy(n);
        true
    }

    /// Free `n` and every descendant that becomes unreferenced.
    pub fn recursive_destroy(&mut self, n: Ref) {
        let mut worklist = vec![n];
        while let Some(n) = worklist.pop() {
            // A child reached through both edges is queued twice.
            if n.is_terminal() || !self.storage.is_occupied(n.index()) || self.refs(n) > 0 {
                continue;
            }
            let node = self.storage.free(n.index());
            for child in [node.high, node.low] {
                self.dereference(child);
                worklist.push(child);
            }
        }
    }

    /// Drop one external reference to `root` and free what it alone kept alive.
    pub fn release(&mut self, root: Ref) {
        self.dereference(root);
        self.recursive_destroy(root);
    }

    /// Replace the finished, unattached node `n` with its canonical twin.
    ///
    /// Returns the canonical node, which the caller then attaches.
    pub fn merge(&mut self, table: &mut UniqueTable, n: Ref) -> Ref {
        if n.is_terminal() {
            return n;
        }
        let key = self.node(n).key();
        match table.find_or_insert(key, n) {
            Some(canonical) if canonical != n => {
                debug!("merge: {} is a twin of {}", n, canonical);
                self.destroy(n);
                canonical
            }
            _ => n,
        }
    }

    /// Whether the low child of `n` can be spliced out.
    pub fn is_collapse_candidate(&self, n: Ref) -> bool {
        if n.is_terminal() {
            return false;
        }
        let node = self.node(n);
        if node.low.is_terminal() {
            return false;
        }
        let low = self.node(node.low);
        // A TRUE low edge ends the chain; splicing it would lose the spliced value.
        !low.low.is_true()
            && node.high == low.high
            && node.weights == low.weights
            && self.same_variable(node.literal, low.literal)
    }

    /// Splice redundant low children of `n` in place.
    ///
    /// Spliced nodes that become unreferenced are removed from `table` and
    /// from the computed table, then freed. Returns whether anything was
    /// spliced.
    pub fn collapse_node(&mut self, table: &mut UniqueTable, n: Ref) -> bool {
        let mut changed = false;
        while self.is_collapse_candidate(n) {
            let m = self.low(n);
            let next = self.low(m);
            debug!("collapse: {} skips {} -> {}", n, m, next);
            self.set_low(n, next);
            if self.refs(m) == 0 {
                let key = self.node(m).key();
                if table.get(&key) == Some(m) {
                    table.remove(&key);
                }
                self.cache.remove_value(&m);
                self.force_destroy(m);
            }
            changed = true;
        }
        changed
    }

    /// Collapse a whole diagram bottom-up, merging into a fresh table.
    ///
    /// `root` is owned by the caller; the returned root is owned in its place.
    pub fn collapse(&mut self, root: Ref) -> Ref {
        let mut table = self.new_table();
        let mut memo = HashMap::new();
        let result = self.collapse_rec(root, &mut table, &mut memo);
        if result != root {
            self.reference(result);
            self.release(root);
        }
        debug!("collapse: {} nodes remain", table.len());
        result
    }

    fn collapse_rec(&mut self, n: Ref, table: &mut UniqueTable, memo: &mut HashMap<Ref, Ref>) -> Ref {
        if n.is_terminal() {
            return n;
        }
        if let Some(&r) = memo.get(&n) {
            return r;
        }
        let high = self.collapse_rec(self.high(n), table, memo);
        if high != self.high(n) {
            self.redirect_high(n, high);
        }
        let low = self.collapse_rec(self.low(n), table, memo);
        if low != self.low(n) {
            self.redirect_low(n, low);
        }
        self.collapse_node(table, n);

        let key = self.node(n).key();
        let canonical = table.find_or_insert(key, n).unwrap_or(n);
        memo.insert(n, canonical);
        canonical
    }

    fn redirect_high(&mut self, n: Ref, child: Ref) {
        let old = self.high(n);
        self.set_high(n, child);
        self.destroy(old);
    }

    fn redirect_low(&mut self, n: Ref, child: Ref) {
        let old = self.low(n);
        self.set_low(n, child);
        self.destroy(old);
    }

    /// Import the diagram under `root` into `table`, creating new nodes.
    ///
    /// The result is unattached: the caller takes its reference.
    pub fn copy(&mut self, table: &mut UniqueTable, root: Ref) -> Ref {
        let mut memo = HashMap::new();
        self.copy_rec(table, root, &mut memo)
    }

    fn copy_rec(&mut self, table: &mut UniqueTable, n: Ref, memo: &mut HashMap<Ref, Ref>) -> Ref {
        if n.is_terminal() {
            return n;
        }
        if let Some(&r) = memo.get(&n) {
            return r;
        }
        let (literal, high, low, weights) = {
            let node = self.node(n);
            (node.literal, node.high, node.low, node.weights.clone())
        };
        let high = self.copy_rec(table, high, memo);
        let low = self.copy_rec(table, low, memo);
        let c = self.mk_node(Literal::new(literal), high, low, weights);
        let c = self.merge(table, c);
        memo.insert(n, c);
        c
    }

    /// Reinsert the chain nodes that collapsing spliced out.
    ///
    /// Afterwards every chain tests each literal of its variable that follows
    /// the chain head in `ordering`.
    pub fn uncollapse(&mut self, root: Ref, ordering: &[Literal]) {
        let mut expect: HashMap<i32, i32> = HashMap::new();
        for w in ordering.windows(2) {
            if self.same_variable(w[0].get(), w[1].get()) {
                expect.insert(w[0].get(), w[1].get());
            }
        }

        let mut inserted = 0;
        let mut visited = HashSet::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            if n.is_terminal() || !visited.insert(n) {
                continue;
            }
            if let Some(&l) = expect.get(&self.literal(n)) {
                if self.literal(self.low(n)) != l {
                    let (high, low, weights) = {
                        let node = self.node(n);
                        (node.high, node.low, node.weights.clone())
                    };
                    let x = self.mk_node(Literal::new(l), high, low, weights);
                    self.set_low(n, x);
                    inserted += 1;
                }
            }
            stack.push(self.low(n));
            stack.push(self.high(n));
        }
        debug!("uncollapse: inserted {} nodes", inserted);
    }

    /// Number of decision nodes plus the terminals reachable from `root`.
    pub fn size(&self, root: Ref) -> usize {
        self.descendants(root).len()
    }

    /// Arithmetic operations needed to evaluate the diagram.
    ///
    /// Two per decision node (one product, one sum) plus one per weight.
    pub fn operators(&self, root: Ref) -> usize {
        self.descendants(root)
            .into_iter()
            .filter(|r| !r.is_terminal())
            .map(|r| 2 + self.weights(r).len())
            .sum()
    }

    /// Every node reachable from `root`, terminals included.
    pub fn descendants(&self, root: Ref) -> HashSet<Ref> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([root]);
        while let Some(n) = queue.pop_front() {
            if !visited.insert(n) || n.is_terminal() {
                continue;
            }
            queue.push_back(self.high(n));
            queue.push_back(self.low(n));
        }
        visited
    }

    /// Variables tested anywhere in the diagram.
    pub fn support(&self, root: Ref) -> BTreeSet<Variable> {
        self.descendants(root)
            .into_iter()
            .filter(|r| !r.is_terminal())
            .filter_map(|r| self.variable_of(self.literal(r)))
            .collect()
    }

    /// Weights collected on the path selected by `assignment`.
    ///
    /// `assignment[l]` tells whether positive literal `l` holds; `ordering`
    /// lists the literals in diagram order. With `collapsed`, untested
    /// literals of a chain follow the nearest chain node above them. Returns
    /// `None` when the path ends in `FALSE`.
    pub fn evaluate(&self, root: Ref, ordering: &[Literal], assignment: &[bool], collapsed: bool) -> Option<Weights> {
        let mut weights = Weights::new();
        let mut current = root;
        let mut pending: Option<Ref> = None;
        for &l in ordering {
            if current.is_true() {
                break;
            }
            let l = l.get();
            let truth = assignment[l as usize];
            if !current.is_terminal() && self.literal(current) == l {
                if truth {
                    weights.extend_from_slice(self.weights(current));
                    current = self.high(current);
                    pending = None;
                } else {
                    pending = Some(current);
                    current = self.low(current);
                }
            } else if truth && collapsed {
                if let Some(p) = pending.filter(|&p| self.same_variable(self.literal(p), l)) {
                    weights.extend_from_slice(self.weights(p));
                    current = self.high(p);
                    pending = None;
                }
            }
        }
        if current.is_true() {
            weights.sort_unstable();
            Some(weights)
        } else {
            None
        }
    }

    /// Like [`evaluate`](Self::evaluate), multiplying the weight values.
    pub fn evaluate_with(
        &self,
        root: Ref,
        ordering: &[Literal],
        assignment: &[bool],
        collapsed: bool,
        weight_value: impl Fn(WeightId) -> Probability,
    ) -> Probability {
        match self.evaluate(root, ordering, assignment, collapsed) {
            Some(ws) => ws.into_iter().map(weight_value).product(),
            None => 0.0,
        }
    }

    /// Render the diagram in the `.ac` text format.
    ///
    /// ```text
    /// wpbdd <size>
    /// 0 0 0 0          (FALSE)
    /// 0 0 0 0          (TRUE)
    /// l t e n w1 .. wn (pre-order, high before low)
    /// ```
    pub fn to_ac_string(&self, root: Ref) -> std::result::Result<String, std::fmt::Error> {
        // Indices follow pre-order; 0 and 1 are the terminals.
        let mut index: HashMap<Ref, usize> = HashMap::from([(Ref::FALSE, 0), (Ref::TRUE, 1)]);
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(n) = stack.pop() {
            if index.contains_key(&n) {
                continue;
            }
            index.insert(n, index.len());
            order.push(n);
            stack.push(self.low(n));
            stack.push(self.high(n));
        }

        let mut out = String::new();
        writeln!(out, "wpbdd {}", self.size(root))?;
        writeln!(out, "0 0 0 0")?;
        writeln!(out, "0 0 0 0")?;
        for n in order {
            let node = self.node(n);
            write!(out, "{} {} {} {}", node.literal, index[&node.high], index[&node.low], node.weights.len())?;
            for w in &node.weights {
                write!(out, " {}", w)?;
            }
            writeln!(out)?;
        }
        Ok(out)
    }

    /// Write the `.ac` file of `root` to `path`.
    pub fn write_ac(&self, root: Ref, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self
            .to_ac_string(root)
            .map_err(|_| Error::internal("formatting the .ac output failed"))?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// Variable 0 has literals 1..=3, variable 1 has literals 4..=5.
    fn manager() -> Bdd {
        Bdd::new(vec![0, 0, 0, 0, 1, 1])
    }

    fn lits(xs: &[i32]) -> Vec<Literal> {
        xs.iter().map(|&x| Literal::new(x)).collect()
    }

    fn assignment(true_literals: &[i32]) -> Vec<bool> {
        let mut a = vec![false; 6];
        for &l in true_literals {
            a[l as usize] = true;
        }
        a
    }

    /// Full chain over variable 0 with the given high weights.
    fn chain(bdd: &mut Bdd, table: &mut UniqueTable, w: [WeightId; 3]) -> Ref {
        let n3 = bdd.mk_node(Literal::new(3), Ref::TRUE, Ref::FALSE, vec![w[2]]);
        let n3 = bdd.merge(table, n3);
        let n2 = bdd.mk_node(Literal::new(2), Ref::TRUE, n3, vec![w[1]]);
        let n2 = bdd.merge(table, n2);
        let n1 = bdd.mk_node(Literal::new(1), Ref::TRUE, n2, vec![w[0]]);
        let n1 = bdd.merge(table, n1);
        bdd.reference(n1)
    }

    #[test]
    fn test_terminals_are_preallocated() {
        let bdd = manager();
        assert_eq!(bdd.live_nodes(), 0);
        assert_eq!(bdd.literal(Ref::FALSE), FALSE_LITERAL);
        assert_eq!(bdd.literal(Ref::TRUE), TRUE_LITERAL);
    }

    #[test]
    fn test_merge_returns_twin_and_frees_duplicate() {
        let mut bdd = manager();
        let mut table = UniqueTable::default();
        let a = bdd.mk_node(Literal::new(4), Ref::TRUE, Ref::FALSE, vec![7]);
        let a = bdd.merge(&mut table, a);
        let b = bdd.mk_node(Literal::new(4), Ref::TRUE, Ref::FALSE, vec![7]);
        assert_eq!(bdd.live_nodes(), 2);
        let b = bdd.merge(&mut table, b);
        assert_eq!(a, b);
        assert_eq!(bdd.live_nodes(), 1);

        let c = bdd.mk_node(Literal::new(4), Ref::TRUE, Ref::FALSE, vec![8]);
        assert_ne!(bdd.merge(&mut table, c), a);
    }

    #[test]
    fn test_release_frees_everything() {
        let mut bdd = manager();
        let mut table = UniqueTable::default();
        let root = chain(&mut bdd, &mut table, [10, 11, 12]);
        assert_eq!(bdd.live_nodes(), 3);
        assert_eq!(bdd.size(root), 5);
        assert_eq!(bdd.operators(root), 9);
        bdd.release(root);
        assert_eq!(bdd.live_nodes(), 0);
    }

    #[test]
    fn test_collapse_preserves_evaluation() {
        let mut bdd = manager();
        let mut table = UniqueTable::default();
        let root = chain(&mut bdd, &mut table, [11, 10, 10]);
        let ordering = lits(&[1, 2, 3]);

        let before: Vec<_> = (1..=3)
            .map(|l| bdd.evaluate(root, &ordering, &assignment(&[l]), false))
            .collect();
        let root = bdd.collapse(root);
        assert_eq!(bdd.live_nodes(), 2);
        assert!(bdd.low(bdd.low(root)).is_false());

        let after: Vec<_> = (1..=3)
            .map(|l| bdd.evaluate(root, &ordering, &assignment(&[l]), true))
            .collect();
        assert_eq!(before, after);
        assert_eq!(after[2], Some(vec![10]));
    }

    #[test]
    fn test_collapse_requires_same_variable() {
        let mut bdd = manager();
        let m = bdd.mk_node(Literal::new(4), Ref::TRUE, Ref::FALSE, vec![]);
        let n = bdd.mk_node(Literal::new(3), Ref::TRUE, m, vec![]);
        assert!(!bdd.is_collapse_candidate(n));
    }

    #[test]
    fn test_collapse_keeps_true_chain_end() {
        let mut bdd = manager();
        let m = bdd.mk_node(Literal::new(3), Ref::TRUE, Ref::TRUE, vec![10]);
        let n = bdd.mk_node(Literal::new(2), Ref::TRUE, m, vec![10]);
        assert!(!bdd.is_collapse_candidate(n));
    }

    #[test]
    fn test_uncollapse_restores_chain() {
        let mut bdd = manager();
        let mut table = UniqueTable::default();
        let root = chain(&mut bdd, &mut table, [10, 10, 10]);
        let root = bdd.collapse(root);
        assert_eq!(bdd.live_nodes(), 1);

        let ordering = lits(&[1, 2, 3]);
        bdd.uncollapse(root, &ordering);
        assert_eq!(bdd.live_nodes(), 3);
        for l in 1..=3 {
            assert_eq!(bdd.evaluate(root, &ordering, &assignment(&[l]), false), Some(vec![10]));
        }
        bdd.release(root);
        assert_eq!(bdd.live_nodes(), 0);
    }

    #[test]
    fn test_copy_into_fresh_table() {
        let mut bdd = manager();
        let mut table = UniqueTable::default();
        let root = chain(&mut bdd, &mut table, [10, 11, 12]);
        let mut other = UniqueTable::default();
        let copy = bdd.copy(&mut other, root);
        let copy = bdd.reference(copy);
        assert_ne!(copy, root);
        assert_eq!(bdd.live_nodes(), 6);
        assert_eq!(other.len(), 3);
        bdd.release(root);
        bdd.release(copy);
        assert_eq!(bdd.live_nodes(), 0);
    }

    #[test]
    fn test_support() {
        let mut bdd = manager();
        let m = bdd.mk_node(Literal::new(4), Ref::TRUE, Ref::FALSE, vec![]);
        let n = bdd.mk_node(Literal::new(1), m, Ref::FALSE, vec![]);
        assert_eq!(bdd.support(n).into_iter().collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_ac_format() {
        let mut bdd = manager();
        let n = bdd.mk_node(Literal::new(4), Ref::TRUE, Ref::FALSE, vec![9, 12]);
        let ac = bdd.to_ac_string(n).unwrap();
        assert_eq!(ac, "wpbdd 3\n0 0 0 0\n0 0 0 0\n4 1 0 2 9 12\n");
    }
}
