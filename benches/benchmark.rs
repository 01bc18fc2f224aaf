use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_distr::StandardNormal;

use partsearch::normalizer::{MatchMode, TextNormalizer};
use partsearch::store::rank;
use partsearch::terms::TermDictionary;
use partsearch::vector_ops::{compute_cosine_similarity_simd, normalize_vector};
use std::sync::Arc;

const DIMENSIONS: usize = 384;
const TOP_K: usize = 10;

fn configure_criterion() -> Criterion {
    Criterion::default()
        .sample_size(20)
        .measurement_time(std::time::Duration::from_secs(10))
        .warm_up_time(std::time::Duration::from_secs(3))
        .configure_from_args()
}

fn random_vectors(rng: &mut StdRng, count: usize) -> Vec<Vec<f32>> {
    (0..count)
        .map(|_| {
            let mut v: Vec<f32> = (0..DIMENSIONS).map(|_| rng.sample(StandardNormal)).collect();
            normalize_vector(&mut v);
            v
        })
        .collect()
}

fn cosine(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let pair = random_vectors(&mut rng, 2);

    c.bench_function(&format!("cosine_{}d", DIMENSIONS), |b| {
        b.iter(|| compute_cosine_similarity_simd(black_box(&pair[0]), black_box(&pair[1])))
    });
}

fn linear_scan(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let query = random_vectors(&mut rng, 1).remove(0);

    let mut group = c.benchmark_group("rank_top_k");
    for catalog_size in [1_000, 10_000, 50_000] {
        let vectors = random_vectors(&mut rng, catalog_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(catalog_size),
            &vectors,
            |b, vectors| b.iter(|| rank(black_box(&query), vectors, TOP_K)),
        );
    }
    group.finish();
}

fn expansion(c: &mut Criterion) {
    let dictionary = Arc::new(TermDictionary::trade_defaults());
    let queries = [
        "replace txv and recharge r410a",
        "water heater t&p valve leaking",
        "condenser fan motor capacitor 45/5",
        "gfci outlet tripping in bathroom",
    ];

    let mut group = c.benchmark_group("enhance");
    for mode in [MatchMode::Substring, MatchMode::Token] {
        let normalizer = TextNormalizer::new(Arc::clone(&dictionary), mode);
        group.bench_with_input(BenchmarkId::from_parameter(mode), &normalizer, |b, normalizer| {
            b.iter(|| {
                for query in &queries {
                    black_box(normalizer.enhance(query));
                }
            })
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = configure_criterion();
    targets = cosine, linear_scan, expansion
}
criterion_main!(benches);
