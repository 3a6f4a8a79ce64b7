//! Criterion benchmarks for pricer_core path arithmetic and regression.
//!
//! Measures vectorised path operations, least-squares regression across
//! paths and graph forward/reverse sweeps at different path counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_core::graph::{
    BinaryFn, ComputationGraph, GraphExecutor, NodeType, UnaryFn, VariateKey, VariateSource,
};
use pricer_core::math::RegressionFit;
use pricer_core::vectorized::{Comparison, PathVector};

/// Deterministic pseudo-normal draws for reproducible benchmarks.
fn generate_draws(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let u = (i as f64 + 0.5) / n as f64;
            (u * 12.0 - 6.0).sin() * 1.5
        })
        .collect()
}

struct BenchDraws(Vec<f64>);

impl VariateSource for BenchDraws {
    fn paths(&self) -> usize {
        self.0.len()
    }

    fn draws(&self, _key: VariateKey) -> Option<&[f64]> {
        Some(&self.0)
    }
}

/// Benchmark elementwise path arithmetic and blending.
fn bench_path_vector(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_vector");

    for size in [1_000, 10_000, 100_000] {
        let spot = PathVector::from_paths(generate_draws(size).iter().map(|z| 100.0 * z.exp()).collect());
        let strike = PathVector::deterministic(size, 100.0);

        group.bench_with_input(BenchmarkId::new("call_payoff", size), &spot, |b, spot| {
            b.iter(|| {
                let intrinsic = spot.zip_map(&strike, |s, k| s - k).unwrap();
                let itm = spot.compare(&strike, Comparison::Gt).unwrap();
                let zero = PathVector::deterministic(size, 0.0);
                black_box(PathVector::select(&itm, &intrinsic, &zero).unwrap().expectation())
            });
        });
    }

    group.finish();
}

/// Benchmark polynomial regression fit and evaluation.
fn bench_regression(c: &mut Criterion) {
    let mut group = c.benchmark_group("regression");

    for size in [1_000, 10_000] {
        let x = generate_draws(size);
        let y: Vec<f64> = x.iter().map(|v| (v - 0.2).max(0.0) + 0.1 * v * v).collect();

        for order in [2, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("fit_order_{order}"), size),
                &(&x, &y),
                |b, (x, y)| {
                    b.iter(|| {
                        let fit = RegressionFit::fit(black_box(y), &[x.as_slice()], None, order)
                            .unwrap();
                        black_box(fit.evaluate(&[x.as_slice()]).unwrap())
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark forward and reverse sweeps over a small lognormal graph.
fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");

    let mut graph = ComputationGraph::new();
    let spot = graph.input("spot", 100.0);
    let vol = graph.input("vol", 0.2);
    let strike = graph.constant(100.0);
    let z = graph.variate(VariateKey { step: 0, factor: 0 });
    let shock = graph.push(NodeType::Binary(BinaryFn::Mul), &[vol, z]).unwrap();
    let growth = graph.push(NodeType::Unary(UnaryFn::Exp), &[shock]).unwrap();
    let s = graph.push(NodeType::Binary(BinaryFn::Mul), &[spot, growth]).unwrap();
    let diff = graph.push(NodeType::Binary(BinaryFn::Sub), &[s, strike]).unwrap();
    let zero = graph.constant(0.0);
    let payoff = graph.push(NodeType::Binary(BinaryFn::Max), &[diff, zero]).unwrap();

    for size in [1_000, 10_000] {
        let source = BenchDraws(generate_draws(size));
        let executor = GraphExecutor::new(&graph);

        group.bench_with_input(BenchmarkId::new("forward", size), &source, |b, source| {
            b.iter(|| black_box(executor.forward(source).unwrap()));
        });

        let forward = executor.forward(&source).unwrap();
        group.bench_with_input(BenchmarkId::new("backward", size), &forward, |b, forward| {
            b.iter(|| black_box(executor.backward(forward, payoff).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_path_vector, bench_regression, bench_graph);
criterion_main!(benches);
