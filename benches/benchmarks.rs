//! Benchmarks for obstat accumulators
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use obstat::statistics::{Accumulator, Declaration, Observable};
use obstat::traits::Merge;

// ============================================================================
// Observable Benchmarks
// ============================================================================

fn bench_observable(c: &mut Criterion) {
    let mut group = c.benchmark_group("observable");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_scalar", |b| {
        let mut record = Observable::scalar();
        let mut i = 0u64;
        b.iter(|| {
            record.push(&[i as f64]).unwrap();
            i = i.wrapping_add(1);
        });
    });

    for len in [4usize, 64, 1024] {
        group.bench_with_input(BenchmarkId::new("push_vector", len), &len, |b, &len| {
            let mut record = Observable::vector(len);
            let value: Vec<f64> = (0..len).map(|k| k as f64).collect();
            b.iter(|| record.push(black_box(&value)).unwrap());
        });
    }

    group.bench_function("estimate", |b| {
        let mut record = Observable::vector(64);
        for i in 0..1_000u64 {
            record.push(&[i as f64; 64]).unwrap();
        }
        b.iter(|| black_box(record.estimate()));
    });

    group.finish();
}

// ============================================================================
// Accumulator Benchmarks
// ============================================================================

fn sample_accumulator(seed: u64) -> Accumulator {
    let mut stats = Accumulator::from_declarations([
        Declaration::scalar("energy"),
        Declaration::scalar("kinetic"),
        Declaration::vector("density", 128),
    ]);
    for i in 0..1_000u64 {
        let x = (i ^ seed) as f64;
        stats.add_scalar("energy", x).unwrap();
        stats.add_scalar("kinetic", x * 0.5).unwrap();
        stats.add_value("density", &[x; 128]).unwrap();
    }
    stats
}

fn bench_accumulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("accumulator");
    group.throughput(Throughput::Elements(1));

    group.bench_function("add_scalar", |b| {
        let mut stats = Accumulator::from_declarations(["energy"]);
        let mut i = 0u64;
        b.iter(|| {
            stats.add_scalar(black_box("energy"), i as f64).unwrap();
            i = i.wrapping_add(1);
        });
    });

    group.bench_function("evaluate_all", |b| {
        let stats = sample_accumulator(7);
        b.iter(|| black_box(stats.evaluate_all().unwrap()));
    });

    group.bench_function("merge", |b| {
        let s1 = sample_accumulator(1);
        let s2 = sample_accumulator(2);
        b.iter(|| s1.merge(black_box(&s2)).unwrap());
    });

    group.finish();
}

// ============================================================================
// Main
// ============================================================================

criterion_group!(benches, bench_observable, bench_accumulator);

criterion_main!(benches);
