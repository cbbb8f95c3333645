//! End-to-end compilations of small networks given as `.net` text.

use std::collections::VecDeque;
use std::time::Duration;

use bnc_rs::bayesnet::BayesNet;
use bnc_rs::bdd::Bdd;
use bnc_rs::closure::DomainClosure;
use bnc_rs::compiler::{conjoin_all, Artifact, ArtifactPaths, Compiler, Config, DiagramType, Output, Strategy};
use bnc_rs::deadline::Deadline;
use bnc_rs::literals::LiteralMap;
use bnc_rs::net;
use bnc_rs::ordering::{self, OrderingStrategy};
use bnc_rs::partition::Partitions;
use bnc_rs::sat::Sat;
use bnc_rs::types::{Probability, Variable};

const ASIA: &str = r#"
net { name = "asia"; }

node asia   { states = ("yes" "no"); label = "Visit to Asia"; }
node tub    { states = ("yes" "no"); }
node smoke  { states = ("yes" "no"); }
node lung   { states = ("yes" "no"); }
node bronc  { states = ("yes" "no"); }
node either { states = ("yes" "no"); }
node xray   { states = ("yes" "no"); }
node dysp   { states = ("yes" "no"); }

% priors
potential (asia)  { data = (0.01 0.99); }
potential (smoke) { data = (0.5 0.5); }

potential (tub | asia)    { data = ((0.05 0.95) (0.01 0.99)); }
potential (lung | smoke)  { data = ((0.1 0.9) (0.01 0.99)); }
potential (bronc | smoke) { data = ((0.6 0.4) (0.3 0.7)); }
potential (either | lung tub) {
    data = (((1 0) (1 0))
            ((1 0) (0 1)));
}
potential (xray | either) { data = ((0.98 0.02) (0.05 0.95)); }
potential (dysp | bronc either) {
    data = (((0.9 0.1) (0.8 0.2))
            ((0.7 0.3) (0.1 0.9)));
}
"#;

/// A -> B -> C, C with three values.
const CHAIN: &str = r#"
net { }
node A { states = ("a0" "a1"); }
node B { states = ("b0" "b1"); }
node C { states = ("c0" "c1" "c2"); }
potential (A) { data = (0.3 0.7); }
potential (B | A) { data = ((0.9 0.1) (0.4 0.6)); }
potential (C | B) { data = ((0.2 0.3 0.5) (0.1 0.1 0.8)); }
"#;

/// Binary A -> B -> C: uniform root, skewed children.
const BINARY_CHAIN: &str = r#"
net { }
node A { states = ("a0" "a1"); }
node B { states = ("b0" "b1"); }
node C { states = ("c0" "c1"); }
potential (A) { data = (0.5 0.5); }
potential (B | A) { data = ((0.9 0.1) (0.4 0.6)); }
potential (C | B) { data = ((0.2 0.8) (0.75 0.25)); }
"#;

fn asia() -> BayesNet {
    net::parse(ASIA).unwrap()
}

fn config(diagram: DiagramType) -> Config {
    let mut config = Config {
        diagram,
        ordering_time_limit: Duration::from_millis(300),
        ..Config::default()
    };
    config.anneal.iterations = 20;
    config.anneal.damp = 1.5;
    config
}

/// Every complete assignment of `bn`, as one value per variable.
fn assignments(bn: &BayesNet) -> Vec<Vec<u32>> {
    let mut out = vec![Vec::new()];
    for &dim in bn.dims() {
        out = out
            .into_iter()
            .flat_map(|prefix| {
                (0..dim).map(move |x| {
                    let mut next = prefix.clone();
                    next.push(x);
                    next
                })
            })
            .collect();
    }
    out
}

/// Joint probability straight from the CPTs.
fn joint(bn: &BayesNet, values: &[u32]) -> Probability {
    (0..bn.nr_variables() as Variable)
        .map(|v| {
            let index = bn
                .parents(v)
                .iter()
                .chain(std::iter::once(&v))
                .fold(0usize, |acc, &x| acc * bn.dim(x) as usize + values[x as usize] as usize);
            bn.cpt(v)[index]
        })
        .product()
}

fn marginal(bn: &BayesNet, evidence: &[Option<u32>]) -> Probability {
    assignments(bn)
        .iter()
        .filter(|values| evidence.iter().zip(values.iter()).all(|(e, &x)| e.is_none_or(|e| e == x)))
        .map(|values| joint(bn, values))
        .sum()
}

fn literal_assignment(map: &LiteralMap, values: &[u32]) -> Vec<bool> {
    let mut assignment = vec![false; map.nr_literals() as usize + 1];
    for (v, &x) in values.iter().enumerate() {
        assignment[map.literal(v as Variable, x).index() as usize] = true;
    }
    assignment
}

#[test]
fn chain_compiles_in_every_diagram_type() {
    let bn = net::parse(CHAIN).unwrap();
    for diagram in [DiagramType::Wpbdd, DiagramType::Mg, DiagramType::Tdmg] {
        let mut compiler = Compiler::new(bn.clone(), config(diagram)).unwrap();
        let stats = compiler.compile().unwrap();
        assert_eq!(stats.partitions.len(), 1);
        assert!(stats.total_nodes() > 0, "{}", diagram);
        assert!(stats.total_operators() > 0, "{}", diagram);
    }
}

#[test]
fn collapsed_binary_chain_matches_hand_built_wpbdd() {
    // Ordering A, B, C. Each variable is a two-node chain `x0 -> x1 -> FALSE`
    // whose high edges carry one weight each. B has one chain per value of A
    // and C one per value of B:
    //
    //   A: 2 nodes, B: 2 x 2 nodes, C: 2 x 2 nodes, plus both terminals.
    //
    // Every weight id is distinct, so collapsing has nothing to splice.
    let bn = net::parse(BINARY_CHAIN).unwrap();
    for strategy in [Strategy::BottomUp, Strategy::Hybrid] {
        for collapse in [true, false] {
            let config = Config {
                strategy,
                collapse,
                determinism: false,
                ordering_strategy: Some(OrderingStrategy::Topological),
                ..config(DiagramType::Wpbdd)
            };
            let mut compiler = Compiler::new(bn.clone(), config).unwrap();
            let stats = compiler.compile().unwrap().clone();
            assert_eq!(compiler.orderings()[0], vec![0, 1, 2]);
            assert_eq!(stats.total_nodes(), 12, "{} collapse {}", strategy, collapse);
            assert_eq!(stats.total_operators(), 30, "{} collapse {}", strategy, collapse);

            let Some(Output::Wpbdd { bdd, roots }) = compiler.output() else {
                panic!("no WPBDD");
            };
            let map = compiler.literal_map();
            let ordering = ordering::variable_to_literal_ordering(map, &compiler.orderings()[0]);
            assert_eq!(bdd.literal(roots[0]), map.literal(0, 0).get());
            for values in assignments(&bn) {
                let assignment = literal_assignment(map, &values);
                let p = bdd.evaluate_with(roots[0], &ordering, &assignment, collapse, |w| map.weight_value(w));
                assert!(
                    (p - joint(&bn, &values)).abs() < 1e-12,
                    "{} collapse {} at {:?}: {}",
                    strategy,
                    collapse,
                    values,
                    p
                );
            }
        }
    }
}

#[test]
fn asia_multigraphs_answer_queries() {
    let bn = asia();
    let xray = bn.variable("xray").unwrap();
    let dysp = bn.variable("dysp").unwrap();
    let mut evidence = vec![None; bn.nr_variables()];
    evidence[xray as usize] = Some(0);
    evidence[dysp as usize] = Some(1);
    let expected = marginal(&bn, &evidence);

    for diagram in [DiagramType::Mg, DiagramType::Tdmg] {
        for determinism in [false, true] {
            for use_probability in [false, true] {
                let config = Config {
                    determinism,
                    use_probability,
                    ..config(diagram)
                };
                let mut compiler = Compiler::new(bn.clone(), config).unwrap();
                compiler.compile().unwrap();
                let map = compiler.literal_map();
                let (total, query) = match compiler.output() {
                    Some(Output::Symbolic(mgs)) => (mgs[0].evaluate(map), mgs[0].evaluate_evidence(map, &evidence)),
                    Some(Output::Probability(mgs)) => {
                        (mgs[0].evaluate(map), mgs[0].evaluate_evidence(map, &evidence))
                    }
                    other => panic!("unexpected output {:?}", other),
                };
                assert!((total - 1.0).abs() < 1e-9, "{} determinism {}", diagram, determinism);
                assert!(
                    (query - expected).abs() < 1e-12,
                    "{}: {} != {}",
                    diagram,
                    query,
                    expected
                );
            }
        }
    }
}

#[test]
fn asia_wpbdd_paths_are_joint_probabilities() {
    let bn = asia();
    for strategy in [Strategy::BottomUp, Strategy::Hybrid] {
        for determinism in [false, true] {
            let config = Config {
                strategy,
                determinism,
                ordering_strategy: Some(OrderingStrategy::Topological),
                ..config(DiagramType::Wpbdd)
            };
            let mut compiler = Compiler::new(bn.clone(), config).unwrap();
            compiler.compile().unwrap();
            let Some(Output::Wpbdd { bdd, roots }) = compiler.output() else {
                panic!("no WPBDD");
            };
            let map = compiler.literal_map();
            let ordering = ordering::variable_to_literal_ordering(map, &compiler.orderings()[0]);
            for values in assignments(&bn) {
                let assignment = literal_assignment(map, &values);
                let p = bdd.evaluate_with(roots[0], &ordering, &assignment, false, |w| map.weight_value(w));
                assert!(
                    (p - joint(&bn, &values)).abs() < 1e-12,
                    "{} determinism {} at {:?}",
                    strategy,
                    determinism,
                    values
                );
            }
        }
    }
}

#[test]
fn bound_dominates_multigraph_size() {
    let bn = asia();
    for strategy in OrderingStrategy::ALL {
        for diagram in [DiagramType::Mg, DiagramType::Tdmg] {
            let config = Config {
                ordering_strategy: Some(strategy),
                ..config(diagram)
            };
            let mut compiler = Compiler::new(bn.clone(), config).unwrap();
            compiler.compile().unwrap();
            let tree = &compiler.spanning_trees()[0];
            let stats = compiler.stats();
            assert!(
                stats.total_nodes() <= tree.upper_bound(),
                "{} with {}: {} nodes over a bound of {}",
                diagram,
                strategy,
                stats.total_nodes(),
                tree.upper_bound()
            );
        }
    }
}

#[test]
fn partitioned_asia_is_composed() {
    let bn = asia();
    let names = |ns: &[&str]| -> Vec<Variable> { ns.iter().map(|n| bn.variable(n).unwrap()).collect() };
    let partitions = Partitions::from_sets(
        vec![
            names(&["asia", "tub", "smoke", "lung", "bronc"]),
            names(&["either", "xray", "dysp"]),
        ],
        &bn,
    );
    assert_eq!(partitions.get(1).cutset.len(), 3);

    for diagram in [DiagramType::Wpbdd, DiagramType::Mg, DiagramType::Tdmg] {
        let config = Config {
            best_composition_ordering: true,
            ..config(diagram)
        };
        let mut compiler = Compiler::new(bn.clone(), config).unwrap();
        compiler.set_partitions(partitions.clone()).unwrap();
        compiler.compile().unwrap();

        let composition = compiler.composition().unwrap();
        assert_eq!(composition.nr_partitions(), 2);
        assert_eq!(composition.shared(1), names(&["tub", "lung", "bronc"]).as_slice());
        assert_eq!(compiler.output().map(Output::len), Some(2));
        assert_eq!(compiler.stats().partitions.len(), 2);
    }
}

#[test]
fn references_are_conserved() {
    let bn = asia();
    let map = LiteralMap::encode(&bn, false, false);
    let order: Vec<Variable> = (0..bn.nr_variables() as Variable).collect();
    let ordering = ordering::variable_to_literal_ordering(&map, &order);
    let mut bdd = Bdd::for_literals(&map);

    let mut cpts = VecDeque::new();
    for v in 0..bn.nr_variables() as Variable {
        let cpt = map.cpt(v);
        let restricted = ordering::restrict_to_cpt(&ordering, cpt);
        if v % 2 == 0 {
            let mut sat = Sat::new(cpt, map.literal_to_variable(), false);
            cpts.push_back(bdd.solve(&mut sat, &restricted, false).unwrap());
        } else {
            let mut closure = DomainClosure::for_literals(&map);
            let clauses = bdd.cpt_clauses(cpt, &restricted, &mut closure, false);
            cpts.push_back(conjoin_all(&mut bdd, clauses.into(), &restricted, false, &Deadline::none()).unwrap());
        }
    }
    let root = conjoin_all(&mut bdd, cpts, &ordering, false, &Deadline::none()).unwrap();
    assert_eq!(bdd.live_nodes() + 2, bdd.size(root));
    bdd.release(root);
    assert_eq!(bdd.live_nodes(), 0);
}

#[test]
fn compile_from_file_and_write_artifacts() {
    let dir = std::env::temp_dir().join(format!("bnc-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let net_path = dir.join("asia.net");
    std::fs::write(&net_path, ASIA).unwrap();

    let mut compiler = Compiler::from_file(&net_path, config(DiagramType::Wpbdd)).unwrap();
    compiler.paths_mut().set(Artifact::Circuit, dir.join("out.ac"));
    compiler.compile().unwrap();
    let circuit = compiler.write(Artifact::Circuit).unwrap();
    assert_eq!(circuit, vec![dir.join("out.ac")]);
    assert!(std::fs::read_to_string(&circuit[0]).unwrap().starts_with("wpbdd "));

    let mapping = compiler.write(Artifact::Mapping).unwrap();
    assert_eq!(mapping, vec![dir.join("asia.map")]);
    let map = LiteralMap::read_map(&mapping[0]).unwrap();
    assert_eq!(map.nr_variables(), 8);
    assert_eq!(map.nr_literals(), 16);

    let uai = compiler.write(Artifact::Uai).unwrap();
    assert!(std::fs::read_to_string(&uai[0]).unwrap().starts_with("BAYES"));

    assert_eq!(ArtifactPaths::new(&net_path).path(Artifact::Elimination, DiagramType::Wpbdd, None), dir.join("asia.num"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unreadable_network_is_reported() {
    let err = net::parse("node A { states = (\"x\" \"y\"); }\npotential (A | B) { data = (0.5 0.5); }").unwrap_err();
    assert!(err.to_string().contains("unknown node 'B'"), "{}", err);
    assert!(Compiler::from_file("/nonexistent/net.net", Config::default()).is_err());
}
