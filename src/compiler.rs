//! Compilation driver.
//!
//! A [`Compiler`] owns one network and walks it through the pipeline:
//!
//! 1. encode the network into literals and weights ([`LiteralMap`]);
//! 2. split it into [`Partitions`] (one by default, or read from a file);
//! 3. order every partition, or read the orderings back;
//! 4. compile every partition into the requested [`DiagramType`];
//! 5. write whatever [`Artifact`]s were asked for.
//!
//! | Diagram | Per partition                                   | Circuit file |
//! |---------|-------------------------------------------------|--------------|
//! | `wpbdd` | one WPBDD, the product of the partition's CPTs  | `.ac`        |
//! | `mg`    | an AND/OR multigraph along a chain              | `.mc.ac`     |
//! | `tdmg`  | an AND/OR multigraph along a pseudo-tree        | `.tdmc.ac`   |
//!
//! The wall-clock limit of [`Config::time_limit`] is enforced cooperatively:
//! every loop of the pipeline polls the shared [`Deadline`] and unwinds with
//! [`Error::Timeout`].

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::bayesnet::BayesNet;
use crate::bdd::Bdd;
use crate::bound::{Bound, BoundKind};
use crate::closure::DomainClosure;
use crate::composition::Composition;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::literals::LiteralMap;
use crate::multigraph::{EdgeWeight, MultiGraph, MultiGraphProbability, Weights};
use crate::ordering::{self, Orderer, Ordering, OrderingOptions, OrderingStrategy, SaParams};
use crate::parallel::{self, ParallelLevel, ParallelOptions, QueueKind};
use crate::partition::Partitions;
use crate::pseudotree::PseudoTree;
use crate::reference::Ref;
use crate::sat::Sat;
use crate::spanning::SpanningTree;
use crate::types::{Literal, Variable};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DiagramType {
    Wpbdd,
    /// Multigraph along a chain.
    Mg,
    /// Multigraph along a pseudo-tree.
    #[default]
    Tdmg,
}

impl DiagramType {
    pub fn name(self) -> &'static str {
        match self {
            DiagramType::Wpbdd => "wpbdd",
            DiagramType::Mg => "mg",
            DiagramType::Tdmg => "tdmg",
        }
    }

    pub fn is_multigraph(self) -> bool {
        self != DiagramType::Wpbdd
    }

    /// Ordering strategy used when none is configured.
    pub fn default_ordering(self) -> OrderingStrategy {
        match self {
            DiagramType::Tdmg => OrderingStrategy::MinFill,
            DiagramType::Wpbdd | DiagramType::Mg => OrderingStrategy::Anneal,
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DiagramType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "wpbdd" => Ok(DiagramType::Wpbdd),
            "mg" => Ok(DiagramType::Mg),
            "tdmg" => Ok(DiagramType::Tdmg),
            _ => Err(format!("unknown diagram type '{}'", s)),
        }
    }
}

/// How the CPT diagrams of a WPBDD are built.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Strategy {
    /// Conjoin one diagram per CPT row.
    BottomUp,
    /// Same CPT construction as [`Strategy::BottomUp`].
    TopDown,
    /// Solve every CPT top-down, then conjoin the CPTs.
    #[default]
    Hybrid,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::BottomUp => "bottomup",
            Strategy::TopDown => "topdown",
            Strategy::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "bottomup" => Ok(Strategy::BottomUp),
            "topdown" => Ok(Strategy::TopDown),
            "hybrid" => Ok(Strategy::Hybrid),
            _ => Err(format!("unknown compilation strategy '{}'", s)),
        }
    }
}

/// Files the compiler reads or writes.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Artifact {
    /// Compiled diagrams.
    Circuit,
    /// Literal and weight mapping.
    Mapping,
    Dot,
    /// Partition file.
    Partition,
    /// Variable names in elimination order.
    Elimination,
    /// Variable indices in compilation order.
    Variables,
    /// Literal indices in compilation order.
    Literals,
    Pseudo,
    /// Spanning trees in Graphviz format.
    Spanning,
    /// Composition ordering of the partitions.
    Composition,
    Uai,
}

impl Artifact {
    pub const ALL: [Artifact; 11] = [
        Artifact::Circuit,
        Artifact::Mapping,
        Artifact::Dot,
        Artifact::Partition,
        Artifact::Elimination,
        Artifact::Variables,
        Artifact::Literals,
        Artifact::Pseudo,
        Artifact::Spanning,
        Artifact::Composition,
        Artifact::Uai,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::Circuit => "circuit",
            Artifact::Mapping => "map",
            Artifact::Dot => "dot",
            Artifact::Partition => "part",
            Artifact::Elimination => "elim",
            Artifact::Variables => "var",
            Artifact::Literals => "lit",
            Artifact::Pseudo => "pseudo",
            Artifact::Spanning => "spanning",
            Artifact::Composition => "comp",
            Artifact::Uai => "uai",
        }
    }

    /// Default file extension, without the leading dot.
    pub fn extension(self, diagram: DiagramType) -> &'static str {
        match self {
            Artifact::Circuit => match diagram {
                DiagramType::Wpbdd => "ac",
                DiagramType::Mg => "mc.ac",
                DiagramType::Tdmg => "tdmc.ac",
            },
            Artifact::Mapping => "map",
            Artifact::Dot => "dot",
            Artifact::Partition => "part",
            Artifact::Elimination => "num",
            Artifact::Variables => "ord",
            Artifact::Literals => "lord",
            Artifact::Pseudo => "pseudo",
            Artifact::Spanning => "spanning.dot",
            Artifact::Composition => "comp",
            Artifact::Uai => "uai",
        }
    }

    pub fn is_readable(self) -> bool {
        matches!(
            self,
            Artifact::Partition
                | Artifact::Elimination
                | Artifact::Variables
                | Artifact::Literals
                | Artifact::Pseudo
                | Artifact::Composition
        )
    }

    /// Written once per partition rather than once per network.
    fn is_per_partition(self) -> bool {
        matches!(
            self,
            Artifact::Circuit
                | Artifact::Dot
                | Artifact::Elimination
                | Artifact::Variables
                | Artifact::Literals
                | Artifact::Pseudo
                | Artifact::Spanning
        )
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Artifact {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "order" => Ok(Artifact::Literals),
            "ac" => Ok(Artifact::Circuit),
            _ => Self::ALL
                .iter()
                .copied()
                .find(|a| a.name() == s)
                .ok_or_else(|| format!("unknown file type '{}'", s)),
        }
    }
}

/// File names of the artifacts: explicit ones, or the network's base name
/// with the artifact's extension.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    base: PathBuf,
    explicit: HashMap<Artifact, PathBuf>,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new("tmp")
    }
}

impl ArtifactPaths {
    /// `network` may carry an extension; it is dropped.
    pub fn new(network: impl AsRef<Path>) -> Self {
        Self {
            base: network.as_ref().with_extension(""),
            explicit: HashMap::new(),
        }
    }

    pub fn set(&mut self, artifact: Artifact, path: impl Into<PathBuf>) {
        self.explicit.insert(artifact, path.into());
    }

    pub fn is_set(&self, artifact: Artifact) -> bool {
        self.explicit.contains_key(&artifact)
    }

    /// Path of `artifact`; `part` is inserted before the last extension.
    pub fn path(&self, artifact: Artifact, diagram: DiagramType, part: Option<usize>) -> PathBuf {
        let path = match self.explicit.get(&artifact) {
            Some(path) => path.clone(),
            None => {
                let mut name = self.base.clone().into_os_string();
                name.push(".");
                name.push(artifact.extension(diagram));
                PathBuf::from(name)
            }
        };
        match part {
            None => path,
            Some(i) => {
                let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
                let name = match path.extension() {
                    Some(ext) => format!("{}.{}.{}", stem, i, ext.to_string_lossy()),
                    None => format!("{}.{}", stem, i),
                };
                path.with_file_name(name)
            }
        }
    }
}

/// Every tuning knob of the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub diagram: DiagramType,
    pub strategy: Strategy,
    /// Skip literals whose branches agree.
    pub collapse: bool,
    /// Turn zero-probability rows into `FALSE` and drop weight one.
    pub determinism: bool,
    /// Share weights between equal probabilities of a CPT.
    pub encode_structure: bool,
    /// Multigraph edges carry multiplied probabilities instead of weight ids.
    pub use_probability: bool,
    /// `None` picks [`DiagramType::default_ordering`].
    pub ordering_strategy: Option<OrderingStrategy>,
    pub ordering_time_limit: Duration,
    pub lookahead: usize,
    pub anneal: SaParams,
    /// Search the cheapest composition of the partitions instead of taking
    /// them in order.
    pub best_composition_ordering: bool,
    /// Log the bound statistics of every ordering.
    pub show_score: bool,
    /// Stop after ordering.
    pub no_compile: bool,
    /// `1` compiles sequentially, `0` uses one worker per CPU.
    pub workers: usize,
    pub queue: QueueKind,
    pub queue_capacity: usize,
    pub parallel_level: ParallelLevel,
    pub cache_bits: usize,
    pub table_bits: usize,
    /// Bytes a multigraph may take, before [`Config::memory_limit`].
    pub memory_budget: usize,
    /// Fraction of [`Config::memory_budget`] a spanning tree may claim.
    pub memory_limit: f64,
    pub time_limit: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diagram: DiagramType::default(),
            strategy: Strategy::default(),
            collapse: false,
            determinism: false,
            encode_structure: false,
            use_probability: false,
            ordering_strategy: None,
            ordering_time_limit: Duration::from_secs(2),
            lookahead: 3,
            anneal: SaParams::default(),
            best_composition_ordering: false,
            show_score: false,
            no_compile: false,
            workers: 1,
            queue: QueueKind::Spsc,
            queue_capacity: 64,
            parallel_level: ParallelLevel::Layer,
            cache_bits: 14,
            table_bits: 12,
            memory_budget: 8 << 30,
            memory_limit: 1.0,
            time_limit: None,
        }
    }
}

fn not_a_number(key: &str, value: &str) -> Error {
    Error::parse("-o", 0, format!("argument to option '{}' ({}) is not a number", key, value))
}

fn number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| not_a_number(key, value))
}

fn flag(key: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "yes" | "true" => Ok(true),
        "0" | "no" | "false" => Ok(false),
        _ => Err(not_a_number(key, value)),
    }
}

fn seconds(key: &str, value: &str) -> Result<Duration> {
    let s: f64 = number(key, value)?;
    if !(s >= 0.0 && s.is_finite()) {
        return Err(Error::parse("-o", 0, format!("option '{}' must be a non-negative number of seconds", key)));
    }
    Ok(Duration::from_secs_f64(s))
}

fn bits(key: &str, value: &str) -> Result<usize> {
    let b: usize = number(key, value)?;
    if b > 31 {
        return Err(Error::parse("-o", 0, format!("option '{}' takes at most 31 bits, got {}", key, b)));
    }
    Ok(b)
}

impl Config {
    /// Apply one `key=value` assignment.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "collapse" => self.collapse = flag(key, value)?,
            "determinism" => self.determinism = flag(key, value)?,
            "structure" | "encode_structure" => self.encode_structure = flag(key, value)?,
            "use_probability" => self.use_probability = flag(key, value)?,
            "best_composition_ordering" => self.best_composition_ordering = flag(key, value)?,
            "score" => self.show_score = flag(key, value)?,
            "no_compile" => self.no_compile = flag(key, value)?,
            "order" | "ordering" => {
                let strategy = value.parse().map_err(|e: String| Error::parse("-o", 0, e))?;
                self.ordering_strategy = Some(strategy);
            }
            "ordering_time" => self.ordering_time_limit = seconds(key, value)?,
            "lookahead" => self.lookahead = number(key, value)?,
            "sa_tries" => self.anneal.tries = number(key, value)?,
            "sa_iterations" => self.anneal.iterations = number(key, value)?,
            "sa_step_size" => self.anneal.step_size = number(key, value)?,
            "sa_k" => self.anneal.k = number(key, value)?,
            "sa_temp_init" => self.anneal.t_initial = number(key, value)?,
            "sa_temp_min" => self.anneal.t_min = number(key, value)?,
            "sa_damp_factor" => {
                let damp: f64 = number(key, value)?;
                if !(damp > 1.0) {
                    return Err(Error::parse("-o", 0, "option 'sa_damp_factor' must be greater than 1"));
                }
                self.anneal.damp = damp;
            }
            "sa_seed" => self.anneal.seed = number(key, value)?,
            "sa_runs" => self.anneal.runs = number(key, value)?,
            "sa_parallel" => self.anneal.parallel = flag(key, value)?,
            "workers" => self.workers = number(key, value)?,
            "queue" => self.queue = value.parse().map_err(|e: String| Error::parse("-o", 0, e))?,
            "queue_capacity" => {
                self.queue_capacity = number(key, value)?;
                if self.queue_capacity == 0 {
                    return Err(Error::parse("-o", 0, "option 'queue_capacity' must be positive"));
                }
            }
            "parallel_level" => {
                let index: usize = number(key, value)?;
                self.parallel_level = ParallelLevel::from_index(index)
                    .ok_or_else(|| Error::parse("-o", 0, format!("parallel level must be 1, 2 or 3, got {}", index)))?;
            }
            "cache_bits" => self.cache_bits = bits(key, value)?,
            "table_bits" => self.table_bits = bits(key, value)?,
            "buckets" => {
                let buckets: usize = number(key, value)?;
                self.cache_bits = buckets.max(1).next_power_of_two().trailing_zeros() as usize;
                self.cache_bits = self.cache_bits.min(31);
            }
            "memory" => {
                let mb: usize = number(key, value)?;
                self.memory_budget = mb.saturating_mul(1 << 20);
            }
            "resources" => {
                let fraction: f64 = number(key, value)?;
                if !(fraction > 0.0 && fraction <= 1.0) {
                    return Err(Error::parse(
                        "-o",
                        0,
                        format!("argument to option 'resources' ({}) must be in range (0, 1]", value),
                    ));
                }
                self.memory_limit = fraction;
            }
            "time" => {
                let limit = seconds(key, value)?;
                self.time_limit = (!limit.is_zero()).then_some(limit);
            }
            _ => return Err(Error::parse("-o", 0, format!("unknown option '{}'", key))),
        }
        Ok(())
    }

    /// Apply a `key=value` string.
    pub fn assign(&mut self, assignment: &str) -> Result<()> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| Error::parse("-o", 0, format!("expecting an assignment, got '{}'", assignment)))?;
        self.set(key.trim(), value)
    }

    pub fn is_parallel(&self) -> bool {
        self.workers != 1
    }

    /// Reject combinations that have no implementation.
    pub fn validate(&self) -> Result<()> {
        if self.is_parallel() && self.encode_structure {
            return Err(Error::Unsupported(
                "local structure with parallel compilation".to_string(),
            ));
        }
        if self.use_probability && !self.diagram.is_multigraph() {
            warn!("use_probability only applies to multigraphs");
        }
        Ok(())
    }

    pub fn ordering_options(&self) -> OrderingOptions {
        OrderingOptions {
            strategy: self.ordering_strategy.unwrap_or_else(|| self.diagram.default_ordering()),
            lookahead: self.lookahead,
            time_limit: self.ordering_time_limit,
            anneal: self.anneal,
        }
    }

    pub fn parallel_options(&self) -> ParallelOptions {
        ParallelOptions {
            workers: self.workers,
            queue: self.queue,
            level: self.parallel_level,
            capacity: self.queue_capacity,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PartitionStats {
    pub variables: usize,
    /// Node bound of the ordering.
    pub bound: u64,
    pub nodes: usize,
    pub edges: usize,
    pub operators: usize,
    pub and_nodes: usize,
    pub or_nodes: usize,
    pub time: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub partitions: Vec<PartitionStats>,
    /// Summed sizes of the CPT diagrams, before conjoining.
    pub cpt_nodes: usize,
    pub cpt_operators: usize,
    pub cpt_time: Duration,
    pub ordering_time: Duration,
    /// Spanning tree construction, multigraphs only.
    pub spanning_time: Duration,
    pub compile_time: Duration,
}

impl Stats {
    pub fn total_nodes(&self) -> usize {
        self.partitions.iter().map(|p| p.nodes).sum()
    }

    pub fn total_edges(&self) -> usize {
        self.partitions.iter().map(|p| p.edges).sum()
    }

    pub fn total_operators(&self) -> usize {
        self.partitions.iter().map(|p| p.operators).sum()
    }

    pub fn total_and_nodes(&self) -> usize {
        self.partitions.iter().map(|p| p.and_nodes).sum()
    }

    pub fn total_or_nodes(&self) -> usize {
        self.partitions.iter().map(|p| p.or_nodes).sum()
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ordering          : {:.3}s", self.ordering_time.as_secs_f64())?;
        if self.spanning_time > Duration::ZERO {
            writeln!(f, "spanning trees    : {:.3}ms", self.spanning_time.as_secs_f64() * 1e3)?;
        }
        if self.cpt_time > Duration::ZERO {
            writeln!(f, "compiled CPTs in  : {:.3}s", self.cpt_time.as_secs_f64())?;
            writeln!(f, "CPT #nodes        : {}", self.cpt_nodes)?;
            writeln!(f, "CPT #operators    : {}", self.cpt_operators)?;
        }
        writeln!(f, "total time        : {:.3}s", self.compile_time.as_secs_f64())?;
        for (i, p) in self.partitions.iter().enumerate() {
            writeln!(
                f,
                "partition {:<7} : {} variables, bound {}, {} nodes, {} edges, {} operators",
                i, p.variables, p.bound, p.nodes, p.edges, p.operators
            )?;
        }
        if self.total_and_nodes() + self.total_or_nodes() > 0 {
            writeln!(f, "total or #nodes   : {}", self.total_or_nodes())?;
            writeln!(f, "total and #nodes  : {}", self.total_and_nodes())?;
        }
        writeln!(f, "total #nodes      : {}", self.total_nodes())?;
        writeln!(f, "total #edges      : {}", self.total_edges())?;
        write!(f, "total #operators  : {}", self.total_operators())
    }
}

/// Compiled diagrams, one per partition.
pub enum Output {
    Wpbdd { bdd: Bdd, roots: Vec<Ref> },
    Symbolic(Vec<MultiGraph<Weights>>),
    Probability(Vec<MultiGraphProbability>),
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Wpbdd { roots, .. } => f.debug_struct("Wpbdd").field("roots", roots).finish(),
            Output::Symbolic(mgs) => write!(f, "Symbolic({} multigraphs)", mgs.len()),
            Output::Probability(mgs) => write!(f, "Probability({} multigraphs)", mgs.len()),
        }
    }
}

impl Output {
    pub fn len(&self) -> usize {
        match self {
            Output::Wpbdd { roots, .. } => roots.len(),
            Output::Symbolic(mgs) => mgs.len(),
            Output::Probability(mgs) => mgs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Compiler {
    config: Config,
    paths: ArtifactPaths,
    bn: BayesNet,
    map: LiteralMap,
    partitions: Partitions,
    orderings: Vec<Ordering>,
    pseudo: Vec<Option<PseudoTree>>,
    composition_ordering: Option<Vec<usize>>,
    composition: Option<Composition>,
    trees: Vec<SpanningTree>,
    output: Option<Output>,
    stats: Stats,
    deadline: Deadline,
}

impl Compiler {
    /// Encode `bn` under `config`. The time limit starts running here.
    pub fn new(bn: BayesNet, config: Config) -> Result<Self> {
        config.validate()?;
        let map = LiteralMap::encode(&bn, config.determinism, config.encode_structure);
        info!(
            "encoded {} variables: {} literals, {} weights",
            map.nr_variables(),
            map.nr_literals(),
            map.nr_weights()
        );
        let partitions = Partitions::one(&bn);
        Ok(Self {
            deadline: Deadline::from_limit(config.time_limit),
            config,
            paths: ArtifactPaths::default(),
            bn,
            map,
            partitions,
            orderings: Vec::new(),
            pseudo: Vec::new(),
            composition_ordering: None,
            composition: None,
            trees: Vec::new(),
            output: None,
            stats: Stats::default(),
        })
    }

    /// Load a `.net` file; artifacts default to names next to it.
    pub fn from_file(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref();
        let bn = BayesNet::read(path)?;
        let mut compiler = Self::new(bn, config)?;
        compiler.paths = ArtifactPaths::new(path);
        Ok(compiler)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bayesnet(&self) -> &BayesNet {
        &self.bn
    }

    pub fn literal_map(&self) -> &LiteralMap {
        &self.map
    }

    pub fn partitions(&self) -> &Partitions {
        &self.partitions
    }

    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    pub fn composition(&self) -> Option<&Composition> {
        self.composition.as_ref()
    }

    pub fn spanning_trees(&self) -> &[SpanningTree] {
        &self.trees
    }

    pub fn output(&self) -> Option<&Output> {
        self.output.as_ref()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> &mut ArtifactPaths {
        &mut self.paths
    }

    /// Replace the single default partition.
    pub fn set_partitions(&mut self, partitions: Partitions) -> Result<()> {
        partitions.verify(&self.bn)?;
        self.partitions = partitions;
        self.orderings.clear();
        self.pseudo.clear();
        Ok(())
    }

    /// Use `orderings`, one per partition, instead of generating them.
    pub fn set_orderings(&mut self, orderings: Vec<Ordering>) -> Result<()> {
        if orderings.len() != self.partitions.len() {
            return Err(Error::InvalidOrdering(format!(
                "{} orderings for {} partitions",
                orderings.len(),
                self.partitions.len()
            )));
        }
        for (i, ordering) in orderings.iter().enumerate() {
            self.partitions.verify_ordering(i, ordering, &self.bn)?;
        }
        self.orderings = orderings;
        Ok(())
    }

    fn part_index(&self, i: usize) -> Option<usize> {
        (self.partitions.len() > 1).then_some(i)
    }

    fn path(&self, artifact: Artifact, i: Option<usize>) -> PathBuf {
        self.paths.path(artifact, self.config.diagram, i)
    }

    /// Read one input artifact from its configured path.
    pub fn read(&mut self, artifact: Artifact) -> Result<()> {
        match artifact {
            Artifact::Partition => {
                let path = self.path(artifact, None);
                let partitions = Partitions::read(&path, &self.bn)?;
                info!("read {} partitions from {}", partitions.len(), path.display());
                self.set_partitions(partitions)
            }
            Artifact::Elimination | Artifact::Variables | Artifact::Literals => {
                let mut orderings = Vec::with_capacity(self.partitions.len());
                for i in 0..self.partitions.len() {
                    let path = self.path(artifact, self.part_index(i));
                    orderings.push(self.read_ordering(artifact, &path)?);
                }
                self.set_orderings(orderings)
            }
            Artifact::Pseudo => {
                let mut trees = Vec::with_capacity(self.partitions.len());
                let mut orderings = Vec::with_capacity(self.partitions.len());
                for i in 0..self.partitions.len() {
                    let tree = PseudoTree::read(self.path(artifact, self.part_index(i)))?;
                    orderings.push(tree.pre_ordering().to_vec());
                    trees.push(Some(tree));
                }
                self.set_orderings(orderings)?;
                self.pseudo = trees;
                Ok(())
            }
            Artifact::Composition => {
                self.composition_ordering = Some(Composition::read_ordering(self.path(artifact, None))?);
                Ok(())
            }
            _ => Err(Error::Unsupported(format!("reading '{}' files", artifact))),
        }
    }

    fn read_ordering(&self, artifact: Artifact, path: &Path) -> Result<Ordering> {
        let what = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        match artifact {
            Artifact::Elimination => ordering::parse(&text, &what, &self.bn),
            Artifact::Variables => {
                let ordering = ordering::parse_indices(&text, &what)?;
                if let Some(&v) = ordering.iter().find(|&&v| v as usize >= self.bn.nr_variables()) {
                    return Err(Error::parse(what, 0, format!("variable {} out of range", v)));
                }
                Ok(ordering)
            }
            _ => {
                if self.partitions.len() > 1 {
                    return Err(Error::Unsupported("literal orderings of partitioned networks".to_string()));
                }
                let literals: Vec<Literal> = ordering::parse_indices(&text, &what)?
                    .into_iter()
                    .map(Literal::positive)
                    .collect();
                ordering::literal_to_variable_ordering(&self.map, &literals)
            }
        }
    }

    /// Order every partition that has no ordering yet and compose the
    /// partitions.
    pub fn prepare(&mut self) -> Result<()> {
        let start = Instant::now();
        if self.orderings.len() != self.partitions.len() {
            let mut options = self.config.ordering_options();
            let mut orderings = Vec::with_capacity(self.partitions.len());
            for (i, partition) in self.partitions.iter().enumerate() {
                self.deadline.check()?;
                if let Some(remaining) = self.deadline.remaining() {
                    options.time_limit = options.time_limit.min(remaining);
                }
                let ordering = Orderer::new(&self.bn, partition, options.clone()).generate();
                self.partitions.verify_ordering(i, &ordering, &self.bn)?;
                orderings.push(ordering);
            }
            self.orderings = orderings;
        }
        self.stats.ordering_time = start.elapsed();

        if self.config.show_score {
            for (i, partition) in self.partitions.iter().enumerate() {
                debug!("partition {}:", i);
                Bound::for_partition(&self.bn, partition).log_stats(&self.orderings[i]);
            }
        }

        if self.partitions.len() > 1 && self.composition.is_none() {
            let mut composition = Composition::new(self.bn.dims());
            composition.set_partitions(&self.partitions);
            let ordering = match self.composition_ordering.take() {
                Some(ordering) => ordering,
                None if self.config.best_composition_ordering => composition.find_ordering()?,
                None => (0..self.partitions.len()).collect(),
            };
            composition.build_ordering(&ordering, self.config.diagram == DiagramType::Mg)?;
            let ascii = composition
                .to_ascii()
                .map_err(|_| Error::internal("rendering the composition tree failed"))?;
            debug!("composition:\n{}", ascii);
            self.composition_ordering = Some(ordering);
            self.composition = Some(composition);
        }
        Ok(())
    }

    /// Pseudo-tree of partition `i`, following the diagram type.
    fn pseudo_tree(&self, i: usize) -> Result<PseudoTree> {
        if let Some(Some(tree)) = self.pseudo.get(i) {
            return Ok(tree.clone());
        }
        let partition = self.partitions.get(i);
        match self.config.diagram {
            DiagramType::Tdmg => PseudoTree::from_ordering(&self.bn, partition, &self.orderings[i]),
            DiagramType::Wpbdd | DiagramType::Mg => PseudoTree::chain(&self.bn, partition, &self.orderings[i]),
        }
    }

    fn spanning_tree(&self, i: usize) -> Result<SpanningTree> {
        let bound = Bound::for_partition(&self.bn, self.partitions.get(i));
        SpanningTree::new(&bound, &self.pseudo_tree(i)?, &self.map)
    }

    /// Build the spanning trees of every partition.
    fn build_spanning_trees(&mut self) -> Result<()> {
        let start = Instant::now();
        let limit = self.config.memory_budget as f64 * self.config.memory_limit;
        let mut trees = Vec::with_capacity(self.partitions.len());
        for i in 0..self.partitions.len() {
            self.deadline.check()?;
            let tree = self.spanning_tree(i)?;
            tree.log_stats();
            if self.config.diagram == DiagramType::Tdmg && !tree.is_tree() {
                info!("partition {}: ordering is a chain", i);
            }
            let required = tree.required_bytes(self.config.use_probability);
            info!("partition {}: estimated {:.3}MB", i, tree.required_mb(self.config.use_probability));
            if required as f64 > limit {
                return Err(Error::Unsupported(format!(
                    "partition {} needs about {:.1}MB, over the limit of {:.1}MB",
                    i,
                    required as f64 / 1e6,
                    limit / 1e6
                )));
            }
            trees.push(tree);
        }
        self.trees = trees;
        self.stats.spanning_time = start.elapsed();
        Ok(())
    }

    /// Run the whole pipeline.
    pub fn compile(&mut self) -> Result<&Stats> {
        let start = Instant::now();
        self.prepare()?;
        if self.config.no_compile {
            info!("skipping compilation");
            return Ok(&self.stats);
        }

        let output = match self.config.diagram {
            DiagramType::Wpbdd => self.compile_wpbdd()?,
            DiagramType::Mg | DiagramType::Tdmg => {
                self.build_spanning_trees()?;
                if self.config.use_probability {
                    Output::Probability(self.compile_multigraphs()?)
                } else {
                    Output::Symbolic(self.compile_multigraphs()?)
                }
            }
        };
        self.output = Some(output);
        self.stats.compile_time = start.elapsed();
        info!(
            "compiled {} partitions in {:.3}s: {} nodes, {} edges, {} operators",
            self.partitions.len(),
            self.stats.compile_time.as_secs_f64(),
            self.stats.total_nodes(),
            self.stats.total_edges(),
            self.stats.total_operators()
        );
        Ok(&self.stats)
    }

    fn compile_wpbdd(&mut self) -> Result<Output> {
        let mut bdd = Bdd::with_capacity(
            self.map.literal_to_variable().to_vec(),
            self.config.table_bits,
            self.config.cache_bits,
        );
        let collapse = self.config.collapse;
        let mut roots = Vec::with_capacity(self.partitions.len());
        let mut stats = Vec::with_capacity(self.partitions.len());

        for (i, partition) in self.partitions.iter().enumerate() {
            let start = Instant::now();
            let ordering = ordering::variable_to_literal_ordering(&self.map, &self.orderings[i]);

            let cpt_start = Instant::now();
            let mut queue = VecDeque::with_capacity(partition.set.len());
            for &v in &partition.set {
                self.deadline.check()?;
                let root = self.compile_cpt(&mut bdd, v, &ordering)?;
                let (nodes, operators) = (bdd.size(root), bdd.operators(root));
                debug!("cpt {} ({}): {} nodes, {} operators", v, self.bn.name(v), nodes, operators);
                self.stats.cpt_nodes += nodes;
                self.stats.cpt_operators += operators;
                queue.push_back(root);
            }
            self.stats.cpt_time += cpt_start.elapsed();

            let root = conjoin_all(&mut bdd, queue, &ordering, collapse, &self.deadline)?;
            let nodes = bdd.size(root);
            let p = PartitionStats {
                variables: self.orderings[i].len(),
                bound: Bound::for_partition(&self.bn, partition).compute(&self.orderings[i], BoundKind::Nodes),
                nodes,
                edges: 2 * nodes,
                operators: bdd.operators(root),
                time: start.elapsed(),
                ..PartitionStats::default()
            };
            info!(
                "partition {}: {} nodes, {} operators (bound {}) in {:.3}s",
                i,
                p.nodes,
                p.operators,
                p.bound,
                p.time.as_secs_f64()
            );
            stats.push(p);
            roots.push(root);
        }
        self.stats.partitions = stats;
        Ok(Output::Wpbdd { bdd, roots })
    }

    /// Diagram of the CPT of `v`, restricted to its literals in `ordering`.
    fn compile_cpt(&self, bdd: &mut Bdd, v: Variable, ordering: &[Literal]) -> Result<Ref> {
        let cpt = self.map.cpt(v);
        let restricted = ordering::restrict_to_cpt(ordering, cpt);
        let determinism = self.config.determinism;
        let collapse = self.config.collapse;
        match self.config.strategy {
            Strategy::Hybrid => {
                let mut sat = Sat::new(cpt, self.map.literal_to_variable(), determinism);
                bdd.solve_until(&mut sat, &restricted, collapse, &self.deadline)
            }
            Strategy::BottomUp | Strategy::TopDown => {
                let mut closure = DomainClosure::for_literals(&self.map);
                let clauses = bdd.cpt_clauses(cpt, &restricted, &mut closure, determinism);
                let root = conjoin_all(bdd, clauses.into(), &restricted, false, &self.deadline)?;
                Ok(if collapse { bdd.collapse(root) } else { root })
            }
        }
    }

    fn compile_multigraphs<W: EdgeWeight>(&mut self) -> Result<Vec<MultiGraph<W>>> {
        let structure = self.config.encode_structure;
        let options = self.config.parallel_options();
        let parallel = self.config.is_parallel();

        let start = Instant::now();
        let mgs = if parallel && options.level == ParallelLevel::Partition {
            parallel::compile_partitions::<W>(&self.trees, &self.map, structure, &options, &self.deadline)?
        } else {
            let mut mgs = Vec::with_capacity(self.trees.len());
            for (i, tree) in self.trees.iter().enumerate() {
                let mg = if parallel && !tree.is_tree() {
                    parallel::compile_parallel::<W>(tree, &self.map, structure, &options, &self.deadline)?
                } else {
                    if parallel {
                        warn!("partition {}: AND layers are compiled sequentially", i);
                    }
                    MultiGraph::<W>::compile(tree, &self.map, structure, &self.deadline)?
                };
                mgs.push(mg);
            }
            mgs
        };
        let elapsed = start.elapsed();

        self.stats.partitions = mgs
            .iter()
            .zip(&self.orderings)
            .enumerate()
            .map(|(i, (mg, ordering))| {
                let size = mg.size();
                info!("partition {}: {}", i, size);
                PartitionStats {
                    variables: ordering.len(),
                    bound: self.trees[i].upper_bound() as u64,
                    nodes: size.nodes,
                    edges: size.edges,
                    operators: size.operators,
                    and_nodes: size.and_nodes,
                    or_nodes: size.or_nodes,
                    time: elapsed / mgs.len().max(1) as u32,
                }
            })
            .collect();
        Ok(mgs)
    }

    /// Write `artifact`, returning the files written.
    pub fn write(&self, artifact: Artifact) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if !artifact.is_per_partition() {
            let path = self.path(artifact, None);
            match artifact {
                Artifact::Mapping => self.map.write_map(&path)?,
                Artifact::Uai => self.map.write_uai(&path)?,
                Artifact::Partition if self.partitions.is_monolithic() => {
                    return Err(Error::Unsupported("partition file of a single partition".to_string()))
                }
                Artifact::Partition => self.partitions.write(&path, &self.bn)?,
                Artifact::Composition => match &self.composition {
                    Some(composition) => composition.write_ordering(&path)?,
                    None => {
                        return Err(Error::Unsupported(
                            "composition ordering of a single partition".to_string(),
                        ))
                    }
                },
                _ => unreachable!("per-partition artifact {}", artifact),
            }
            info!("wrote {} to {}", artifact, path.display());
            written.push(path);
            return Ok(written);
        }

        for i in 0..self.partitions.len() {
            let path = self.path(artifact, self.part_index(i));
            self.write_partition(artifact, i, &path)?;
            info!("wrote {} to {}", artifact, path.display());
            written.push(path);
        }
        Ok(written)
    }

    fn ordering(&self, i: usize) -> Result<&Ordering> {
        self.orderings
            .get(i)
            .ok_or_else(|| Error::InvalidOrdering(format!("partition {} has not been ordered", i)))
    }

    fn write_partition(&self, artifact: Artifact, i: usize, path: &Path) -> Result<()> {
        match artifact {
            Artifact::Elimination => ordering::write(self.ordering(i)?, &self.bn, path),
            Artifact::Variables => write_text(path, ordering::to_index_string(self.ordering(i)?)),
            Artifact::Literals => {
                let literals = ordering::variable_to_literal_ordering(&self.map, self.ordering(i)?);
                write_text(path, ordering::to_index_string(&literals))
            }
            Artifact::Pseudo => {
                self.ordering(i)?;
                if self.config.diagram != DiagramType::Tdmg && self.pseudo.get(i).is_none_or(Option::is_none) {
                    warn!("partition {}: no pseudo-tree, writing a chain", i);
                }
                self.pseudo_tree(i)?.write(path)
            }
            Artifact::Spanning => match self.trees.get(i) {
                Some(tree) => tree.write_dot(path),
                None => {
                    self.ordering(i)?;
                    self.spanning_tree(i)?.write_dot(path)
                }
            },
            Artifact::Circuit | Artifact::Dot => {
                let output = self
                    .output
                    .as_ref()
                    .ok_or_else(|| Error::Unsupported(format!("writing '{}' without a compiled diagram", artifact)))?;
                match (artifact, output) {
                    (Artifact::Circuit, Output::Wpbdd { bdd, roots }) => bdd.write_ac(roots[i], path),
                    (Artifact::Circuit, Output::Symbolic(mgs)) => mgs[i].write_dd(path),
                    (Artifact::Circuit, Output::Probability(mgs)) => mgs[i].write_dd(path),
                    (_, Output::Wpbdd { bdd, roots }) => {
                        let dot = bdd.to_dot(&[roots[i]]).map_err(|e| Error::internal(e.to_string()))?;
                        write_text(path, dot)
                    }
                    (_, Output::Symbolic(mgs)) => mgs[i].write_dot(path, &self.map),
                    (_, Output::Probability(mgs)) => mgs[i].write_dot(path, &self.map),
                }
            }
            _ => unreachable!("network-wide artifact {}", artifact),
        }
    }
}

fn write_text(path: &Path, text: String) -> Result<()> {
    std::fs::write(path, text).map_err(|e| Error::io(path, e))
}

/// Conjoin `queue` pairwise, first in first out, releasing the operands.
///
/// Takes ownership of the queued roots; the result carries one reference.
pub fn conjoin_all(
    bdd: &mut Bdd,
    mut queue: VecDeque<Ref>,
    ordering: &[Literal],
    collapse: bool,
    deadline: &Deadline,
) -> Result<Ref> {
    while queue.len() > 1 {
        let (Some(a), Some(b)) = (queue.pop_front(), queue.pop_front()) else {
            break;
        };
        let c = match bdd.conjoin_until(a, b, ordering, collapse, deadline) {
            Ok(c) => c,
            Err(e) => {
                bdd.release(a);
                bdd.release(b);
                for r in queue {
                    bdd.release(r);
                }
                return Err(e);
            }
        };
        bdd.release(a);
        bdd.release(b);
        debug!("conjoin: {} nodes, {} left", bdd.size(c), queue.len());
        queue.push_back(c);
    }
    Ok(queue.pop_front().unwrap_or(Ref::TRUE))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// A -> B -> C, C ternary, with a deterministic row.
    fn network() -> BayesNet {
        let mut bn = BayesNet::new();
        let a = bn.add_variable("A", &["a0", "a1"]);
        let b = bn.add_variable("B", &["b0", "b1"]);
        let c = bn.add_variable("C", &["c0", "c1", "c2"]);
        bn.set_potential(a, &[], vec![0.3, 0.7]).unwrap();
        bn.set_potential(b, &[a], vec![1.0, 0.0, 0.4, 0.6]).unwrap();
        bn.set_potential(c, &[b], vec![0.2, 0.3, 0.5, 0.1, 0.1, 0.8]).unwrap();
        bn
    }

    fn quick(diagram: DiagramType) -> Config {
        let mut config = Config {
            diagram,
            ordering_time_limit: Duration::from_millis(200),
            ..Config::default()
        };
        config.anneal.iterations = 20;
        config.anneal.damp = 1.5;
        config
    }

    /// Sum over every complete assignment of the WPBDD path products.
    fn wpbdd_mass(compiler: &Compiler) -> f64 {
        let Some(Output::Wpbdd { bdd, roots }) = compiler.output() else {
            panic!("no WPBDD");
        };
        let map = compiler.literal_map();
        let ordering = ordering::variable_to_literal_ordering(map, &compiler.orderings()[0]);
        let dims = map.dims().to_vec();
        let mut values = vec![0u32; dims.len()];
        let mut total = 0.0;
        loop {
            let mut assignment = vec![false; map.nr_literals() as usize + 1];
            for (v, &x) in values.iter().enumerate() {
                assignment[map.literal(v as Variable, x).index() as usize] = true;
            }
            total += bdd.evaluate_with(roots[0], &ordering, &assignment, compiler.config().collapse, |w| {
                map.weight_value(w)
            });
            let mut k = 0;
            while k < dims.len() {
                values[k] += 1;
                if values[k] < dims[k] {
                    break;
                }
                values[k] = 0;
                k += 1;
            }
            if k == dims.len() {
                break;
            }
        }
        total
    }

    #[test]
    fn test_config_set() {
        let mut config = Config::default();
        config.set("collapse", "1").unwrap();
        config.set("determinism", "yes").unwrap();
        config.set("order", "10").unwrap();
        config.set("sa_damp_factor", "1.01").unwrap();
        config.set("time", "0").unwrap();
        config.set("queue", "mpmc").unwrap();
        config.set("buckets", "1000").unwrap();
        assert!(config.collapse && config.determinism);
        assert_eq!(config.ordering_strategy, Some(OrderingStrategy::MinFill));
        assert_eq!(config.anneal.damp, 1.01);
        assert_eq!(config.time_limit, None);
        assert_eq!(config.queue, QueueKind::Mpmc);
        assert_eq!(config.cache_bits, 10);

        config.assign("time=1.5").unwrap();
        assert_eq!(config.time_limit, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_config_rejects_bad_input() {
        let mut config = Config::default();
        assert!(matches!(config.set("nonsense", "1"), Err(Error::Parse { .. })));
        assert!(matches!(config.set("workers", "many"), Err(Error::Parse { .. })));
        assert!(matches!(config.set("resources", "1.5"), Err(Error::Parse { .. })));
        assert!(matches!(config.set("parallel_level", "4"), Err(Error::Parse { .. })));
        assert!(matches!(config.set("sa_damp_factor", "0.9"), Err(Error::Parse { .. })));
        assert!(matches!(config.set("cache_bits", "40"), Err(Error::Parse { .. })));
        assert!(config.assign("collapse").is_err());
    }

    #[test]
    fn test_parallel_structure_rejected() {
        let config = Config {
            workers: 4,
            encode_structure: true,
            ..Config::default()
        };
        assert!(matches!(Compiler::new(network(), config), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_artifact_paths() {
        let mut paths = ArtifactPaths::new("nets/alarm.net");
        assert_eq!(
            paths.path(Artifact::Circuit, DiagramType::Tdmg, None),
            PathBuf::from("nets/alarm.tdmc.ac")
        );
        assert_eq!(paths.path(Artifact::Elimination, DiagramType::Mg, Some(2)), PathBuf::from("nets/alarm.2.num"));
        paths.set(Artifact::Mapping, "out/custom.map");
        assert_eq!(paths.path(Artifact::Mapping, DiagramType::Wpbdd, None), PathBuf::from("out/custom.map"));
        assert_eq!(
            paths.path(Artifact::Circuit, DiagramType::Mg, Some(0)),
            PathBuf::from("nets/alarm.mc.0.ac")
        );
        assert_eq!("order".parse::<Artifact>(), Ok(Artifact::Literals));
        assert!("nope".parse::<Artifact>().is_err());
    }

    #[test]
    fn test_wpbdd_strategies_count_to_one() {
        for strategy in [Strategy::BottomUp, Strategy::TopDown, Strategy::Hybrid] {
            for collapse in [false, true] {
                let config = Config {
                    strategy,
                    collapse,
                    ordering_strategy: Some(OrderingStrategy::Topological),
                    ..quick(DiagramType::Wpbdd)
                };
                let mut compiler = Compiler::new(network(), config).unwrap();
                compiler.compile().unwrap();
                assert!((wpbdd_mass(&compiler) - 1.0).abs() < 1e-9, "{} collapse {}", strategy, collapse);
                assert!(compiler.stats().total_nodes() > 2);
            }
        }
    }

    #[test]
    fn test_wpbdd_with_determinism() {
        let config = Config {
            determinism: true,
            ordering_strategy: Some(OrderingStrategy::Topological),
            ..quick(DiagramType::Wpbdd)
        };
        let mut compiler = Compiler::new(network(), config).unwrap();
        let stats = compiler.compile().unwrap().clone();
        assert!((wpbdd_mass(&compiler) - 1.0).abs() < 1e-9);
        assert_eq!(stats.partitions.len(), 1);
        assert_eq!(stats.total_edges(), 2 * stats.total_nodes());
        assert!(stats.cpt_nodes > 0);
    }

    #[test]
    fn test_multigraphs_count_to_one() {
        for diagram in [DiagramType::Mg, DiagramType::Tdmg] {
            for use_probability in [false, true] {
                let config = Config {
                    use_probability,
                    ..quick(diagram)
                };
                let mut compiler = Compiler::new(network(), config).unwrap();
                compiler.compile().unwrap();
                let total = match compiler.output() {
                    Some(Output::Symbolic(mgs)) => mgs[0].evaluate(compiler.literal_map()),
                    Some(Output::Probability(mgs)) => mgs[0].evaluate(compiler.literal_map()),
                    other => panic!("unexpected output {:?}", other),
                };
                assert!((total - 1.0).abs() < 1e-9);
                let stats = compiler.stats();
                assert!(stats.total_nodes() as u64 <= stats.partitions[0].bound);
                assert_eq!(stats.total_nodes(), stats.total_and_nodes() + stats.total_or_nodes());
            }
        }
    }

    #[test]
    fn test_parallel_multigraph_matches_sequential() {
        let compile = |config: Config| {
            let mut compiler = Compiler::new(network(), config).unwrap();
            compiler.compile().unwrap();
            let Some(Output::Symbolic(mgs)) = compiler.output() else {
                panic!("no multigraph");
            };
            mgs[0].to_dd_string().unwrap()
        };
        let base = Config {
            ordering_strategy: Some(OrderingStrategy::Topological),
            ..quick(DiagramType::Mg)
        };
        let sequential = compile(base.clone());

        for queue in [QueueKind::Spsc, QueueKind::Mpmc] {
            for parallel_level in [ParallelLevel::Layer, ParallelLevel::Node] {
                let config = Config {
                    workers: 3,
                    queue,
                    queue_capacity: 1,
                    parallel_level,
                    ..base.clone()
                };
                assert_eq!(compile(config), sequential, "{:?} {:?}", queue, parallel_level);
            }
        }
    }

    #[test]
    fn test_partitions_compile_over_shared_queue() {
        let bn = network();
        let config = Config {
            workers: 2,
            queue: QueueKind::Mpmc,
            parallel_level: ParallelLevel::Partition,
            ..quick(DiagramType::Mg)
        };
        let mut compiler = Compiler::new(bn.clone(), config).unwrap();
        compiler
            .set_partitions(Partitions::from_sets(vec![vec![0, 1], vec![2]], &bn))
            .unwrap();
        compiler.compile().unwrap();
        let Some(Output::Symbolic(mgs)) = compiler.output() else {
            panic!("no multigraphs");
        };
        assert_eq!(mgs.len(), 2);
        assert_eq!(compiler.stats().partitions.len(), 2);
    }

    #[test]
    fn test_partitions_and_composition() {
        let bn = network();
        let mut compiler = Compiler::new(bn.clone(), quick(DiagramType::Tdmg)).unwrap();
        compiler
            .set_partitions(Partitions::from_sets(vec![vec![0, 1], vec![2]], &bn))
            .unwrap();
        compiler.compile().unwrap();
        assert_eq!(compiler.output().map(Output::len), Some(2));
        let composition = compiler.composition().unwrap();
        assert_eq!(composition.nr_partitions(), 2);
        assert_eq!(compiler.stats().partitions.len(), 2);
        // the second partition orders its cutset too
        assert_eq!(compiler.orderings()[1].len(), 2);
    }

    #[test]
    fn test_partition_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("bnc-partition-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let bn = network();

        let mut compiler = Compiler::new(bn.clone(), quick(DiagramType::Tdmg)).unwrap();
        *compiler.paths_mut() = ArtifactPaths::new(dir.join("split.net"));
        compiler
            .set_partitions(Partitions::from_sets(vec![vec![0], vec![1, 2]], &bn))
            .unwrap();
        let written = compiler.write(Artifact::Partition).unwrap();
        assert_eq!(written, vec![dir.join("split.part")]);

        let mut reader = Compiler::new(bn, quick(DiagramType::Tdmg)).unwrap();
        *reader.paths_mut() = ArtifactPaths::new(dir.join("split.net"));
        reader.read(Artifact::Partition).unwrap();
        assert_eq!(reader.partitions().len(), 2);
        assert_eq!(reader.partitions().get(1).set.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_bad_partition_rejected() {
        let bn = network();
        let mut compiler = Compiler::new(bn.clone(), Config::default()).unwrap();
        let overlapping = Partitions::from_sets(vec![vec![0, 1], vec![1, 2]], &bn);
        assert!(matches!(compiler.set_partitions(overlapping), Err(Error::InvalidPartition(_))));
        assert!(matches!(compiler.set_orderings(vec![vec![0, 1]]), Err(Error::InvalidOrdering(_))));
    }

    #[test]
    fn test_time_limit() {
        let config = Config {
            time_limit: Some(Duration::ZERO),
            ..quick(DiagramType::Wpbdd)
        };
        let mut compiler = Compiler::new(network(), config).unwrap();
        assert!(matches!(compiler.compile(), Err(Error::Timeout)));
    }

    #[test]
    fn test_memory_limit() {
        let config = Config {
            memory_budget: 16,
            ..quick(DiagramType::Mg)
        };
        let mut compiler = Compiler::new(network(), config).unwrap();
        assert!(matches!(compiler.compile(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = std::env::temp_dir().join(format!("bnc-compiler-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let bn = network();

        let mut compiler = Compiler::new(bn.clone(), quick(DiagramType::Tdmg)).unwrap();
        *compiler.paths_mut() = ArtifactPaths::new(dir.join("chain.net"));
        compiler.compile().unwrap();
        for artifact in [
            Artifact::Circuit,
            Artifact::Mapping,
            Artifact::Dot,
            Artifact::Elimination,
            Artifact::Variables,
            Artifact::Literals,
            Artifact::Pseudo,
            Artifact::Spanning,
        ] {
            let written = compiler.write(artifact).unwrap();
            assert_eq!(written.len(), 1);
            assert!(written[0].exists(), "{}", written[0].display());
        }
        for artifact in [Artifact::Partition, Artifact::Composition] {
            assert!(matches!(compiler.write(artifact), Err(Error::Unsupported(_))));
        }
        assert!(!dir.join("chain.part").exists());
        assert!(std::fs::read_to_string(dir.join("chain.tdmc.ac"))
            .unwrap()
            .starts_with("multigraph"));

        for artifact in [Artifact::Elimination, Artifact::Variables, Artifact::Literals] {
            let mut reader = Compiler::new(bn.clone(), quick(DiagramType::Tdmg)).unwrap();
            *reader.paths_mut() = ArtifactPaths::new(dir.join("chain.net"));
            reader.read(artifact).unwrap();
            assert_eq!(reader.orderings(), compiler.orderings(), "{}", artifact);
        }

        // a pseudo-tree comes back in pre-order
        let mut reader = Compiler::new(bn.clone(), quick(DiagramType::Tdmg)).unwrap();
        *reader.paths_mut() = ArtifactPaths::new(dir.join("chain.net"));
        reader.read(Artifact::Pseudo).unwrap();
        let mut ordering = reader.orderings()[0].clone();
        ordering.sort_unstable();
        assert_eq!(ordering, vec![0, 1, 2]);
        reader.compile().unwrap();
        assert_eq!(reader.stats().total_nodes(), compiler.stats().total_nodes());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_no_compile_writes_orderings_only() {
        let config = Config {
            no_compile: true,
            ..quick(DiagramType::Wpbdd)
        };
        let mut compiler = Compiler::new(network(), config).unwrap();
        compiler.compile().unwrap();
        assert!(compiler.output().is_none());
        assert_eq!(compiler.orderings()[0].len(), 3);
        assert!(matches!(compiler.write(Artifact::Circuit), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_conjoin_all_of_nothing_is_true() {
        let mut bdd = Bdd::new(vec![0, 0, 0]);
        let r = conjoin_all(&mut bdd, VecDeque::new(), &[], false, &Deadline::none()).unwrap();
        assert_eq!(r, Ref::TRUE);
    }
}
