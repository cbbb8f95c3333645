//! Variable orderings.
//!
//! An [`Ordering`] lists the variables of one partition (owned and cutset)
//! in compilation order. [`Orderer`] generates one with any of the
//! strategies below, scoring candidates with the partition's [`Bound`].
//!
//! | Index | Strategy                | Search                                           |
//! |-------|-------------------------|--------------------------------------------------|
//! | 0     | `Topological`           | DFS topological sorts over root permutations     |
//! | 1     | `BreadthFirst`          | BFS from the roots                               |
//! | 2     | `ReverseTopological`    | strategy 0, reversed                             |
//! | 3     | `BestFirst`             | best-first branch and bound on the node bound    |
//! | 4     | `BruteForce`            | every permutation, pruned on the node bound      |
//! | 5     | `Components`            | topological per weakly connected component       |
//! | 6     | `Lookahead`             | greedy with a fixed-depth exhaustive lookahead   |
//! | 7     | `Anneal`                | simulated annealing from 0, chain ratio energy   |
//! | 8     | `AllTopological`        | every topological sort                           |
//! | 9     | `AnnealMinFill`         | simulated annealing from 10, tree energy         |
//! | 10    | `MinFill`               | greedy min-fill elimination                      |
//!
//! Every search stops at the generator's deadline and returns the best
//! ordering found so far.
//!
//! Ordering files hold variable names in *elimination* order, the reverse of
//! the compilation order, separated by whitespace.

mod anneal;
mod branch;

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, warn};

use crate::bayesnet::BayesNet;
use crate::bound::{Bound, BoundKind};
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::literals::{CptNode, LiteralMap};
use crate::partition::Partition;
use crate::pseudotree::PseudoTree;
use crate::types::{Literal, Variable};
use crate::utils::next_permutation;

pub use anneal::{anneal, Energy, SaParams};

pub type Ordering = Vec<Variable>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OrderingStrategy {
    Topological,
    BreadthFirst,
    ReverseTopological,
    BestFirst,
    BruteForce,
    Components,
    Lookahead,
    Anneal,
    AllTopological,
    AnnealMinFill,
    MinFill,
}

impl OrderingStrategy {
    pub const ALL: [OrderingStrategy; 11] = [
        OrderingStrategy::Topological,
        OrderingStrategy::BreadthFirst,
        OrderingStrategy::ReverseTopological,
        OrderingStrategy::BestFirst,
        OrderingStrategy::BruteForce,
        OrderingStrategy::Components,
        OrderingStrategy::Lookahead,
        OrderingStrategy::Anneal,
        OrderingStrategy::AllTopological,
        OrderingStrategy::AnnealMinFill,
        OrderingStrategy::MinFill,
    ];

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            OrderingStrategy::Topological => "topological",
            OrderingStrategy::BreadthFirst => "bfs",
            OrderingStrategy::ReverseTopological => "reverse-topological",
            OrderingStrategy::BestFirst => "best-first",
            OrderingStrategy::BruteForce => "brute-force",
            OrderingStrategy::Components => "components",
            OrderingStrategy::Lookahead => "lookahead",
            OrderingStrategy::Anneal => "anneal",
            OrderingStrategy::AllTopological => "all-topological",
            OrderingStrategy::AnnealMinFill => "anneal-min-fill",
            OrderingStrategy::MinFill => "min-fill",
        }
    }
}

impl fmt::Display for OrderingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.name())
    }
}

impl FromStr for OrderingStrategy {
    type Err = String;

    /// Accepts the numeric index or the name.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<u32>() {
            return Self::from_index(index).ok_or_else(|| format!("unknown ordering strategy {}", index));
        }
        Self::ALL
            .iter()
            .copied()
            .find(|x| x.name() == s)
            .ok_or_else(|| format!("unknown ordering strategy '{}'", s))
    }
}

#[derive(Debug, Clone)]
pub struct OrderingOptions {
    pub strategy: OrderingStrategy,
    /// Depth of [`OrderingStrategy::Lookahead`].
    pub lookahead: usize,
    /// Wall clock granted to each search.
    pub time_limit: Duration,
    pub anneal: SaParams,
}

impl Default for OrderingOptions {
    fn default() -> Self {
        Self {
            strategy: OrderingStrategy::Topological,
            lookahead: 3,
            time_limit: Duration::from_secs(2),
            anneal: SaParams::default(),
        }
    }
}

/// Ordering generator for one partition.
pub struct Orderer<'a> {
    bn: &'a BayesNet,
    partition: &'a Partition,
    bound: Bound,
    /// Owned children of every variable.
    children: Vec<Vec<Variable>>,
    /// Owned parents per owned variable, `0` elsewhere.
    indegree: Vec<u32>,
    options: OrderingOptions,
    deadline: Deadline,
}

impl<'a> Orderer<'a> {
    pub fn new(bn: &'a BayesNet, partition: &'a Partition, options: OrderingOptions) -> Self {
        let n = bn.nr_variables();
        let mut children = vec![Vec::new(); n];
        let mut indegree = vec![0; n];
        for &v in &partition.set {
            indegree[v as usize] = bn.parents(v).len() as u32;
            for &p in bn.parents(v) {
                children[p as usize].push(v);
            }
        }
        for list in &mut children {
            list.sort_unstable();
        }

        Self {
            bn,
            partition,
            bound: Bound::for_partition(bn, partition),
            children,
            indegree,
            deadline: Deadline::after(options.time_limit),
            options,
        }
    }

    pub fn bound(&self) -> &Bound {
        &self.bound
    }

    pub fn options(&self) -> &OrderingOptions {
        &self.options
    }

    /// Number of variables an ordering has to list.
    pub fn len(&self) -> usize {
        self.partition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition.len() == 0
    }

    /// Variables of the partition, cutset first.
    pub fn variables(&self) -> Ordering {
        let mut variables: Ordering = self.partition.cutset.iter().copied().collect();
        variables.extend(self.partition.set.iter().copied());
        variables
    }

    /// Owned variables without parents followed by the cutset.
    fn roots(&self) -> Ordering {
        let mut roots: Ordering = self
            .partition
            .set
            .iter()
            .copied()
            .filter(|&v| self.indegree[v as usize] == 0)
            .collect();
        roots.extend(self.partition.cutset.iter().copied());
        roots
    }

    /// Run the configured strategy.
    pub fn generate(&self) -> Ordering {
        let strategy = self.options.strategy;
        let ordering = match strategy {
            OrderingStrategy::Topological => self.topological(),
            OrderingStrategy::BreadthFirst => self.breadth_first(),
            OrderingStrategy::ReverseTopological => self.reverse_topological(),
            OrderingStrategy::BestFirst => self.best_first(),
            OrderingStrategy::BruteForce => self.brute_force(),
            OrderingStrategy::Components => self.components(),
            OrderingStrategy::Lookahead => self.lookahead(self.options.lookahead),
            OrderingStrategy::Anneal => self.anneal(self.topological(), Energy::Ratio),
            OrderingStrategy::AllTopological => self.all_topological(),
            OrderingStrategy::AnnealMinFill => self.anneal(self.min_fill(), Energy::TreeNodes),
            OrderingStrategy::MinFill => self.min_fill(),
        };
        debug_assert_eq!(ordering.len(), self.len());
        info!(
            "ordering {} for {} variables: node bound {}",
            strategy,
            ordering.len(),
            self.bound.compute(&ordering, BoundKind::Nodes)
        );
        ordering
    }

    /// One DFS topological sort starting from `roots` in the given order.
    fn dfs_topological(&self, roots: &[Variable]) -> Ordering {
        let mut indegree = self.indegree.clone();
        let mut stack: Vec<Variable> = roots.iter().rev().copied().collect();
        let mut ordering = Vec::with_capacity(self.len());
        while let Some(v) = stack.pop() {
            for &c in self.children[v as usize].iter().rev() {
                let d = &mut indegree[c as usize];
                if *d != 0 {
                    *d -= 1;
                    if *d == 0 {
                        stack.push(c);
                    }
                }
            }
            ordering.push(v);
        }
        ordering
    }

    /// Best DFS topological sort over permutations of the roots, by
    /// [`Bound::compute_score`].
    pub fn topological(&self) -> Ordering {
        let mut roots = self.roots();
        let mut best = Ordering::new();
        let mut best_score = f64::MAX;
        let mut tried = 0usize;
        loop {
            let ordering = self.dfs_topological(&roots);
            let score = self.bound.compute_score(&ordering);
            if score < best_score {
                best_score = score;
                best = ordering;
            }
            tried += 1;
            if !next_permutation(&mut roots) || self.deadline.expired() {
                break;
            }
        }
        debug!("topological: {} root permutations tried, score {:.3}", tried, best_score);
        best
    }

    pub fn reverse_topological(&self) -> Ordering {
        let mut ordering = self.topological();
        ordering.reverse();
        ordering
    }

    /// Breadth-first visit from the roots. Not necessarily topological: a
    /// variable is placed as soon as any parent has been.
    pub fn breadth_first(&self) -> Ordering {
        let mut roots = self.roots();
        roots.sort_unstable();
        let mut queue: VecDeque<Variable> = roots.into_iter().collect();
        let mut done = vec![false; self.bn.nr_variables()];
        let mut ordering = Vec::with_capacity(self.len());
        while let Some(v) = queue.pop_front() {
            if std::mem::replace(&mut done[v as usize], true) {
                continue;
            }
            queue.extend(self.children[v as usize].iter().copied());
            ordering.push(v);
        }
        ordering
    }

    /// Topological sorts built per weakly connected component and then
    /// chained in component order, over permutations of the roots.
    pub fn components(&self) -> Ordering {
        let mut roots = self.roots();
        roots.sort_unstable();
        let leaves = self
            .partition
            .set
            .iter()
            .filter(|&&v| self.indegree[v as usize] > 0 && self.children[v as usize].is_empty())
            .count();
        if roots.len() == 1 && leaves == 1 {
            return self.topological();
        }

        let mut best = Ordering::new();
        let mut best_bound = u64::MAX;
        loop {
            let ordering = self.component_ordering(&roots);
            let bound = self.bound.compute(&ordering, BoundKind::Nodes);
            if best.is_empty() || bound < best_bound {
                best_bound = bound;
                best = ordering;
            }
            if !next_permutation(&mut roots) || self.deadline.expired() {
                break;
            }
        }
        best
    }

    fn component_ordering(&self, roots: &[Variable]) -> Ordering {
        let n = self.bn.nr_variables();
        let nr_components = roots.len();
        let mut component = vec![0usize; n];
        let mut encounter = vec![0u32; n];
        let mut component_parents = vec![Vec::<usize>::new(); nr_components];
        let mut component_children = vec![Vec::<usize>::new(); nr_components];

        for (c, &root) in roots.iter().enumerate() {
            let label = c + 1;
            let mut queue = VecDeque::from([root]);
            while let Some(v) = queue.pop_front() {
                let x = v as usize;
                if component[x] == 0 {
                    component[x] = label;
                    encounter[x] += 1;
                    queue.extend(self.children[x].iter().copied());
                } else if component[x] == label {
                    encounter[x] += 1;
                } else {
                    let other = component[x] - 1;
                    if !component_children[c].contains(&other) {
                        component_children[c].push(other);
                        component_parents[other].push(c);
                    }
                }
            }
        }

        let mut orders = vec![Ordering::new(); nr_components];
        for (c, &root) in roots.iter().enumerate() {
            let mut queue = VecDeque::from([root]);
            while let Some(v) = queue.pop_front() {
                for &child in &self.children[v as usize] {
                    let x = child as usize;
                    if component[x] == c + 1 {
                        encounter[x] -= 1;
                        if encounter[x] == 0 {
                            queue.push_back(child);
                        }
                    }
                }
                orders[c].push(v);
            }
        }

        let mut pending: Vec<usize> = component_parents.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..nr_components).filter(|&c| pending[c] == 0).collect();
        let mut placed = vec![false; nr_components];
        let mut ordering = Vec::with_capacity(self.len());
        while let Some(c) = queue.pop_front() {
            placed[c] = true;
            ordering.extend_from_slice(&orders[c]);
            for &child in &component_children[c] {
                pending[child] -= 1;
                if pending[child] == 0 {
                    queue.push_back(child);
                }
            }
        }
        // Components depending on each other both ways
        for c in (0..nr_components).filter(|&c| !placed[c]) {
            ordering.extend_from_slice(&orders[c]);
        }
        ordering
    }

    /// Exhaustive enumeration of topological sorts, keeping the one with the
    /// smallest node bound.
    pub fn all_topological(&self) -> Ordering {
        struct Search<'s, 'a> {
            orderer: &'s Orderer<'a>,
            variables: Ordering,
            indegree: Vec<u32>,
            visited: Vec<bool>,
            ordering: Ordering,
            best: Ordering,
            best_bound: u64,
            sorts: usize,
        }

        impl Search<'_, '_> {
            fn visit(&mut self) {
                if self.orderer.deadline.expired() {
                    return;
                }
                let mut extended = false;
                for i in 0..self.variables.len() {
                    let v = self.variables[i];
                    let x = v as usize;
                    if self.indegree[x] != 0 || self.visited[x] {
                        continue;
                    }
                    extended = true;
                    for &c in &self.orderer.children[x] {
                        self.indegree[c as usize] -= 1;
                    }
                    self.visited[x] = true;
                    self.ordering.push(v);

                    self.visit();

                    self.ordering.pop();
                    self.visited[x] = false;
                    for &c in &self.orderer.children[x] {
                        self.indegree[c as usize] += 1;
                    }
                }

                if !extended {
                    self.sorts += 1;
                    let bound = self.orderer.bound.compute(&self.ordering, BoundKind::Nodes);
                    if bound < self.best_bound {
                        self.best_bound = bound;
                        self.best = self.ordering.clone();
                    }
                }
            }
        }

        let initial = self.topological();
        let mut search = Search {
            orderer: self,
            variables: self.variables(),
            indegree: self.indegree.clone(),
            visited: vec![false; self.bn.nr_variables()],
            ordering: Vec::with_capacity(self.len()),
            best_bound: self.bound.compute(&initial, BoundKind::Nodes),
            best: initial,
            sorts: 0,
        };
        search.visit();
        if self.deadline.expired() {
            warn!("topological sort enumeration cut short after {} sorts", search.sorts);
        }
        debug!("all topological: {} sorts, node bound {}", search.sorts, search.best_bound);
        search.best
    }

    pub fn min_fill(&self) -> Ordering {
        PseudoTree::min_fill(self.bn, self.partition)
    }

    /// Anneal `initial` (all partition variables when empty).
    pub fn anneal(&self, initial: Ordering, energy: Energy) -> Ordering {
        let initial = if initial.is_empty() { self.variables() } else { initial };
        anneal(&self.bound, initial, energy, &self.options.anneal, &self.deadline)
    }
}

/// Elimination-order file contents: names of `ordering`, last variable first.
pub fn to_elimination_string(ordering: &[Variable], bn: &BayesNet) -> String {
    let names: Vec<&str> = ordering.iter().rev().map(|&v| bn.name(v)).collect();
    let mut text = names.join("\n");
    text.push('\n');
    text
}

pub fn write(ordering: &[Variable], bn: &BayesNet, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, to_elimination_string(ordering, bn)).map_err(|e| Error::io(path, e))
}

pub fn read(path: impl AsRef<Path>, bn: &BayesNet) -> Result<Ordering> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse(&text, &path.display().to_string(), bn)
}

/// Parse an elimination-order file back into a compilation ordering.
pub fn parse(text: &str, what: &str, bn: &BayesNet) -> Result<Ordering> {
    let mut seen = vec![false; bn.nr_variables()];
    let mut ordering = Vec::new();
    for (i, line) in text.lines().enumerate() {
        for name in line.split_whitespace() {
            let v = bn
                .variable(name)
                .ok_or_else(|| Error::parse(what, i + 1, format!("unknown variable in ordering: '{}'", name)))?;
            if std::mem::replace(&mut seen[v as usize], true) {
                return Err(Error::parse(
                    what,
                    i + 1,
                    format!("variable '{}' appears more than once in the ordering", name),
                ));
            }
            ordering.push(v);
        }
    }
    ordering.reverse();
    Ok(ordering)
}

/// Whitespace-separated numbers, in order.
pub fn to_index_string<T: fmt::Display>(items: &[T]) -> String {
    let mut text = items.iter().map(T::to_string).collect::<Vec<_>>().join(" ");
    text.push('\n');
    text
}

/// Parse whitespace-separated numbers, rejecting duplicates.
pub fn parse_indices(text: &str, what: &str) -> Result<Vec<u32>> {
    let mut items = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for (i, line) in text.lines().enumerate() {
        for word in line.split_whitespace() {
            let x: u32 = word
                .parse()
                .map_err(|_| Error::parse(what, i + 1, format!("expected a number, got '{}'", word)))?;
            if !seen.insert(x) {
                return Err(Error::parse(what, i + 1, format!("'{}' appears more than once", x)));
            }
            items.push(x);
        }
    }
    Ok(items)
}

/// Expand every variable into its literals, values in ascending order.
pub fn variable_to_literal_ordering(map: &LiteralMap, ordering: &[Variable]) -> Vec<Literal> {
    ordering
        .iter()
        .flat_map(|&v| (0..map.dims()[v as usize]).map(move |value| map.literal(v, value)))
        .collect()
}

/// Collapse a literal ordering into variables.
///
/// Fails if the literals of a variable are interleaved with those of another
/// or a variable has no literal at all.
pub fn literal_to_variable_ordering(map: &LiteralMap, literals: &[Literal]) -> Result<Ordering> {
    let mut processed = vec![false; map.nr_variables()];
    let mut ordering: Ordering = Vec::with_capacity(map.nr_variables());
    for &l in literals {
        if l.get() <= 0 || l.index() > map.nr_literals() {
            continue;
        }
        let v = map.variable_of(l);
        if ordering.last() == Some(&v) {
            continue;
        }
        if std::mem::replace(&mut processed[v as usize], true) {
            return Err(Error::InvalidOrdering(format!(
                "literals of variable '{}' are interleaved with other variables",
                map.name(v)
            )));
        }
        ordering.push(v);
    }
    if let Some(v) = processed.iter().position(|&p| !p) {
        return Err(Error::InvalidOrdering(format!(
            "variable '{}' is missing from the literal ordering",
            map.name(v as Variable)
        )));
    }
    Ok(ordering)
}

/// The literals of `ordering` that belong to `cpt`, order preserved.
pub fn restrict_to_cpt(ordering: &[Literal], cpt: &CptNode) -> Vec<Literal> {
    ordering
        .iter()
        .copied()
        .filter(|l| {
            cpt.literals
                .iter()
                .zip(&cpt.dims)
                .any(|(&base, &dim)| (base..base + dim).contains(&l.index()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::partition::Partitions;

    /// A -> B, A -> C, B -> D, C -> D; E isolated.
    pub(super) fn diamond() -> BayesNet {
        let mut bn = BayesNet::new();
        let a = bn.add_variable("A", &["0", "1"]);
        let b = bn.add_variable("B", &["0", "1"]);
        let c = bn.add_variable("C", &["0", "1"]);
        let d = bn.add_variable("D", &["0", "1", "2"]);
        bn.add_variable("E", &["0", "1"]);
        bn.set_potential(b, &[a], vec![0.5; 4]).unwrap();
        bn.set_potential(c, &[a], vec![0.5; 4]).unwrap();
        bn.set_potential(d, &[b, c], vec![1.0 / 3.0; 12]).unwrap();
        bn
    }

    pub(super) fn is_topological(bn: &BayesNet, ordering: &[Variable]) -> bool {
        let position = |v: Variable| ordering.iter().position(|&x| x == v);
        ordering
            .iter()
            .all(|&v| bn.parents(v).iter().all(|&p| position(p) < position(v)))
    }

    fn options(strategy: OrderingStrategy) -> OrderingOptions {
        OrderingOptions {
            strategy,
            anneal: SaParams {
                iterations: 20,
                t_initial: 10.0,
                damp: 1.5,
                ..SaParams::default()
            },
            ..OrderingOptions::default()
        }
    }

    fn is_permutation(ordering: &[Variable], n: usize) -> bool {
        let mut sorted = ordering.to_vec();
        sorted.sort_unstable();
        sorted == (0..n as Variable).collect::<Vec<_>>()
    }

    #[test]
    fn test_strategy_names() {
        for (i, s) in OrderingStrategy::ALL.iter().enumerate() {
            assert_eq!(s.index(), i as u32);
            assert_eq!(OrderingStrategy::from_str(&i.to_string()), Ok(*s));
            assert_eq!(OrderingStrategy::from_str(s.name()), Ok(*s));
        }
        assert!(OrderingStrategy::from_str("11").is_err());
        assert!(OrderingStrategy::from_str("best").is_err());
    }

    #[test]
    fn test_topological_strategies() {
        let bn = diamond();
        let partition = Partitions::one(&bn);
        for strategy in [
            OrderingStrategy::Topological,
            OrderingStrategy::Components,
            OrderingStrategy::AllTopological,
        ] {
            let orderer = Orderer::new(&bn, partition.get(0), options(strategy));
            let ordering = orderer.generate();
            assert!(is_permutation(&ordering, 5), "{}: {:?}", strategy, ordering);
            assert!(is_topological(&bn, &ordering), "{}: {:?}", strategy, ordering);
        }
    }

    #[test]
    fn test_every_strategy_yields_a_permutation() {
        let bn = diamond();
        let partition = Partitions::one(&bn);
        for strategy in OrderingStrategy::ALL {
            let ordering = Orderer::new(&bn, partition.get(0), options(strategy)).generate();
            assert!(is_permutation(&ordering, 5), "{}: {:?}", strategy, ordering);
        }
    }

    #[test]
    fn test_dfs_follows_root_order() {
        let bn = diamond();
        let partition = Partitions::one(&bn);
        let orderer = Orderer::new(&bn, partition.get(0), options(OrderingStrategy::Topological));
        assert_eq!(orderer.dfs_topological(&[0, 4]), vec![0, 1, 2, 3, 4]);
        assert_eq!(orderer.dfs_topological(&[4, 0]), vec![4, 0, 1, 2, 3]);
        assert_eq!(orderer.breadth_first(), vec![0, 4, 1, 2, 3]);
        let reverse = orderer.reverse_topological();
        assert!(is_topological(&bn, &reverse.iter().rev().copied().collect::<Vec<_>>()));
    }

    #[test]
    fn test_all_topological_is_no_worse() {
        let bn = diamond();
        let partition = Partitions::one(&bn);
        let orderer = Orderer::new(&bn, partition.get(0), options(OrderingStrategy::AllTopological));
        let initial = orderer.bound().compute(&orderer.topological(), BoundKind::Nodes);
        let best = orderer.bound().compute(&orderer.all_topological(), BoundKind::Nodes);
        assert!(best <= initial);
    }

    #[test]
    fn test_partition_orderings_include_cutset() {
        let bn = diamond();
        let parts = Partitions::from_sets(vec![vec![0, 1, 4], vec![2, 3]], &bn);
        let orderer = Orderer::new(&bn, parts.get(1), options(OrderingStrategy::Topological));
        assert_eq!(orderer.variables(), vec![0, 1, 2, 3]);
        let ordering = orderer.generate();
        let mut sorted = ordering.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        assert!(is_topological(&bn, &ordering));
        parts.verify_ordering(1, &ordering, &bn).unwrap();
    }

    #[test]
    fn test_elimination_file_round_trip() {
        let bn = diamond();
        let text = to_elimination_string(&[0, 1, 2, 3, 4], &bn);
        assert_eq!(text, "E\nD\nC\nB\nA\n");
        assert_eq!(parse(&text, "t", &bn).unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(parse("E D C B A", "t", &bn).unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(parse("A B A", "t", &bn).is_err());
        assert!(parse("A X", "t", &bn).is_err());
        assert_eq!(parse_indices("3 1\n2", "t").unwrap(), vec![3, 1, 2]);
        assert!(parse_indices("3 3", "t").is_err());
        assert!(parse_indices("3 x", "t").is_err());
        assert_eq!(to_index_string(&[3, 1, 2]), "3 1 2\n");
    }

    #[test]
    fn test_literal_orderings() {
        let bn = diamond();
        let map = LiteralMap::encode(&bn, false, false);
        // literals: A 1-2, B 3-4, C 5-6, D 7-9, E 10-11
        let literals = variable_to_literal_ordering(&map, &[3, 0, 1, 2, 4]);
        let raw: Vec<i32> = literals.iter().map(|l| l.get()).collect();
        assert_eq!(raw, vec![7, 8, 9, 1, 2, 3, 4, 5, 6, 10, 11]);
        assert_eq!(literal_to_variable_ordering(&map, &literals).unwrap(), vec![3, 0, 1, 2, 4]);

        let interleaved: Vec<Literal> = [1, 3, 2, 4, 5, 6, 7, 8, 9, 10, 11].map(Literal::new).to_vec();
        assert!(matches!(
            literal_to_variable_ordering(&map, &interleaved),
            Err(Error::InvalidOrdering(_))
        ));
        let missing: Vec<Literal> = [1, 2, 3, 4].map(Literal::new).to_vec();
        assert!(literal_to_variable_ordering(&map, &missing).is_err());

        let restricted: Vec<i32> = restrict_to_cpt(&literals, map.cpt(1)).iter().map(|l| l.get()).collect();
        assert_eq!(restricted, vec![1, 2, 3, 4]);
    }
}
