use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emsig_stats::hypergeom::hypergeometric_upper_tail;
use emsig_stats::testing::{mann_whitney_u, Alternative};

fn random_f64(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

fn bench_hypergeometric(c: &mut Criterion) {
    let mut group = c.benchmark_group("hypergeometric");

    group.bench_function("universe_20k_sets_200x150", |b| {
        b.iter(|| hypergeometric_upper_tail(black_box(40), 150, 200, 20_000))
    });

    group.finish();
}

fn bench_mann_whitney(c: &mut Criterion) {
    let mut group = c.benchmark_group("mann_whitney");

    // 50-gene overlap against a 20k-gene ranking
    let sample = random_f64(50, 42);
    let background = random_f64(20_000, 137);

    group.bench_function("50_vs_20k", |b| {
        b.iter(|| mann_whitney_u(black_box(&sample), black_box(&background), Alternative::TwoSided))
    });

    group.finish();
}

criterion_group!(benches, bench_hypergeometric, bench_mann_whitney);
criterion_main!(benches);
