//! Compilation benchmarks on random layered networks.
//!
//! Run with:
//! ```bash
//! cargo bench --bench compile
//! ```

use std::time::Duration;

use bnc_rs::bayesnet::BayesNet;
use bnc_rs::compiler::{Compiler, Config, DiagramType};
use bnc_rs::ordering::OrderingStrategy;
use bnc_rs::types::Variable;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// `layers` layers of `width` binary variables, each with up to two parents
/// in the previous layer.
fn layered(layers: usize, width: usize, seed: u64) -> BayesNet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bn = BayesNet::new();
    let mut previous: Vec<Variable> = Vec::new();
    for layer in 0..layers {
        let mut current = Vec::with_capacity(width);
        for i in 0..width {
            let v = bn.add_variable(&format!("v{}_{}", layer, i), &["t", "f"]);
            let mut parents: Vec<Variable> = previous.choose_multiple(&mut rng, 2.min(previous.len())).copied().collect();
            parents.sort_unstable();
            let rows = 1 << parents.len();
            let cpt: Vec<f64> = (0..rows)
                .flat_map(|_| {
                    let p: f64 = rng.random_range(0.05..0.95);
                    [p, 1.0 - p]
                })
                .collect();
            bn.set_potential(v, &parents, cpt).unwrap();
            current.push(v);
        }
        previous = current;
    }
    bn
}

fn config(diagram: DiagramType) -> Config {
    Config {
        diagram,
        ordering_strategy: Some(OrderingStrategy::MinFill),
        ordering_time_limit: Duration::from_millis(100),
        ..Config::default()
    }
}

fn bench_diagram_types(c: &mut Criterion) {
    let mut group = c.benchmark_group("diagram_types");
    group.sample_size(10);
    let bn = layered(4, 4, 7);

    for diagram in [DiagramType::Wpbdd, DiagramType::Mg, DiagramType::Tdmg] {
        group.bench_with_input(BenchmarkId::new("layered_4x4", diagram), &diagram, |b, &diagram| {
            b.iter(|| {
                let mut compiler = Compiler::new(bn.clone(), config(diagram)).unwrap();
                compiler.compile().unwrap().total_nodes()
            });
        });
    }
    group.finish();
}

fn bench_multigraph_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("tdmg_scaling");
    group.sample_size(10);

    for layers in [2, 4, 6, 8] {
        let bn = layered(layers, 5, layers as u64);
        group.bench_with_input(BenchmarkId::new("layers", layers), &bn, |b, bn| {
            b.iter(|| {
                let mut compiler = Compiler::new(bn.clone(), config(DiagramType::Tdmg)).unwrap();
                compiler.compile().unwrap().total_nodes()
            });
        });
    }
    group.finish();
}

fn bench_parallel_layers(c: &mut Criterion) {
    let mut group = c.benchmark_group("mg_workers");
    group.sample_size(10);
    let bn = layered(5, 5, 11);

    for workers in [1, 2, 4] {
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            b.iter(|| {
                let config = Config {
                    workers,
                    ..config(DiagramType::Mg)
                };
                let mut compiler = Compiler::new(bn.clone(), config).unwrap();
                compiler.compile().unwrap().total_nodes()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_diagram_types, bench_multigraph_scaling, bench_parallel_layers);
criterion_main!(benches);
