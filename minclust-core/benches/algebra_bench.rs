//! Benchmarks for the CSR digraph algebra.
//!
//! These operators dominate exclusion-graph construction, so their
//! count-then-write-shrink protocol needs to stay cheap relative to a
//! single pass over the arcs.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use minclust_core::{Digraph, PointIndex, algebra};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn random_digraph(vertices: usize, degree: usize, seed: u64) -> Digraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows: Vec<Vec<PointIndex>> = (0..vertices)
        .map(|_| {
            let mut row: Vec<PointIndex> =
                (0..degree).map(|_| rng.random_range(0..vertices as PointIndex)).collect();
            row.sort_unstable();
            row.dedup();
            row
        })
        .collect();
    Digraph::from_rows(&rows).expect("bench digraph must build")
}

fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("digraph_algebra");
    for &vertices in &[1_000usize, 20_000] {
        let a = random_digraph(vertices, 10, 3);
        let b = random_digraph(vertices, 10, 5);
        group.throughput(Throughput::Elements(a.arc_count() as u64));

        group.bench_function(BenchmarkId::new("union", vertices), |bench| {
            bench.iter(|| algebra::union(black_box(&[&a, &b])).expect("union"));
        });
        group.bench_function(BenchmarkId::new("transpose", vertices), |bench| {
            bench.iter(|| algebra::transpose(black_box(&a)).expect("transpose"));
        });
        group.bench_function(BenchmarkId::new("difference", vertices), |bench| {
            bench.iter(|| algebra::difference(black_box(&a), &b, 10).expect("difference"));
        });
        group.bench_function(BenchmarkId::new("product", vertices), |bench| {
            bench.iter(|| {
                algebra::adjacency_product(black_box(&a), &b, true, false).expect("product")
            });
        });
        group.bench_function(BenchmarkId::new("delete_loops", vertices), |bench| {
            bench.iter(|| {
                let mut g = a.clone();
                algebra::delete_loops(&mut g);
                g
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_operators);
criterion_main!(benches);
