//! Benchmarks for store insertion and walk sampling.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{Rng, SeedableRng};

use triplewalk::graph::index::TripleStore;
use triplewalk::walk::{SamplerConfig, WalkMode, WalkSampler};

const ENTITIES: usize = 2_000;
const EDGES_PER_ENTITY: usize = 8;

/// Random graph with a fixed out-degree and a handful of predicates.
fn synthetic_edges() -> Vec<(String, String, String)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);
    let mut edges = Vec::with_capacity(ENTITIES * EDGES_PER_ENTITY);
    for s in 0..ENTITIES {
        for _ in 0..EDGES_PER_ENTITY {
            let p = rng.gen_range(0..16);
            let o = rng.gen_range(0..ENTITIES);
            edges.push((
                format!("http://ex.org/e{s}"),
                format!("http://ex.org/p{p}"),
                format!("http://ex.org/e{o}"),
            ));
        }
    }
    edges
}

fn synthetic_store() -> Arc<TripleStore> {
    let store = TripleStore::new();
    store.extend(synthetic_edges());
    Arc::new(store)
}

fn bench_insert(c: &mut Criterion) {
    let edges = synthetic_edges();

    c.bench_function("store_insert_16k", |bench| {
        bench.iter(|| {
            let store = TripleStore::new();
            for (s, p, o) in &edges {
                store.add(s, p, o);
            }
            black_box(store.len())
        })
    });
}

fn bench_mode(c: &mut Criterion, name: &str, mode: WalkMode) {
    let sampler = WalkSampler::new(
        synthetic_store(),
        SamplerConfig {
            mode,
            walks_per_entity: 100,
            depth: 4,
        },
    );
    let mut rng = rand::rngs::StdRng::seed_from_u64(0);

    c.bench_function(name, |bench| {
        bench.iter(|| {
            black_box(sampler.generate_walks_for_entity("http://ex.org/e0", 100, 4, &mut rng))
        })
    });
}

fn bench_random(c: &mut Criterion) {
    bench_mode(c, "random_100x4", WalkMode::Random);
}

fn bench_duplicate_free(c: &mut Criterion) {
    bench_mode(c, "duplicate_free_100x4", WalkMode::RandomDuplicateFree);
}

fn bench_mid(c: &mut Criterion) {
    bench_mode(c, "mid_100x4", WalkMode::Mid);
}

criterion_group!(
    benches,
    bench_insert,
    bench_random,
    bench_duplicate_free,
    bench_mid
);
criterion_main!(benches);
