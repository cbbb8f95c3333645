//! # bnc-rs: compiling Bayesian networks
//!
//! **`bnc-rs`** compiles a discrete Bayesian network into a structure on which
//! probabilistic queries become a single pass of sums and products:
//!
//! - a **WPBDD** (weighted positive binary decision diagram), the product of
//!   the network's CPTs as one canonical diagram whose positive edges carry
//!   probability weights;
//! - an **AND/OR multigraph**, built layer by layer along a chain (`mg`) or a
//!   pseudo-tree (`tdmg`) with a size bound known before compilation starts.
//!
//! ## Pipeline
//!
//! | Step      | Module                         | What happens                                   |
//! |-----------|--------------------------------|------------------------------------------------|
//! | Input     | [`net`], [`bayesnet`]          | Hugin `.net` parsing                           |
//! | Encoding  | [`literals`]                   | one literal per value, one weight per entry    |
//! | Partition | [`partition`], [`composition`] | owned variables, cutsets, composition ordering |
//! | Ordering  | [`ordering`], [`bound`]        | search guided by the node bound                |
//! | WPBDD     | [`bdd`], [`sat`], [`ite`]      | CPT diagrams, then pairwise conjoins           |
//! | Multigraph| [`spanning`], [`multigraph`]   | per-layer contexts, AND/OR nodes               |
//! | Driver    | [`compiler`]                   | configuration, statistics, artifacts           |
//!
//! ## Basic usage
//!
//! ```rust
//! use bnc_rs::bayesnet::BayesNet;
//! use bnc_rs::compiler::{Compiler, Config, DiagramType, Output};
//!
//! let mut bn = BayesNet::new();
//! let rain = bn.add_variable("Rain", &["yes", "no"]);
//! let grass = bn.add_variable("Grass", &["wet", "dry"]);
//! bn.set_potential(rain, &[], vec![0.2, 0.8])?;
//! bn.set_potential(grass, &[rain], vec![0.9, 0.1, 0.3, 0.7])?;
//!
//! let config = Config {
//!     diagram: DiagramType::Tdmg,
//!     ..Config::default()
//! };
//! let mut compiler = Compiler::new(bn, config)?;
//! let stats = compiler.compile()?;
//! assert!(stats.total_nodes() > 0);
//!
//! // Without evidence, the weighted model count is one.
//! if let Some(Output::Symbolic(mgs)) = compiler.output() {
//!     let total = mgs[0].evaluate(compiler.literal_map());
//!     assert!((total - 1.0).abs() < 1e-9);
//! }
//! # Ok::<(), bnc_rs::error::Error>(())
//! ```
//!
//! The `bnc` binary wraps the same pipeline; see `bnc --help`.

pub mod bayesnet;
pub mod bdd;
pub mod bitset;
pub mod bound;
pub mod cache;
pub mod clause;
pub mod closure;
pub mod compiler;
pub mod composition;
pub mod deadline;
pub mod dot;
pub mod engine;
pub mod error;
pub mod ite;
pub mod literals;
pub mod multigraph;
pub mod net;
pub mod node;
pub mod ordering;
pub mod parallel;
pub mod partition;
pub mod pseudotree;
pub mod reference;
pub mod sat;
pub mod spanning;
pub mod storage;
pub mod table;
pub mod types;
pub mod utils;
pub mod xary;
