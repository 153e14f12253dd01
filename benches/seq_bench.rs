//! Benchmarks for Seq composition and traversal.
//!
//! # Benchmark Categories
//!
//! 1. **Concat**: repeated owning and borrowing concatenation versus rebuilding a `Vec`
//! 2. **Bind**: flattening traversal
//! 3. **Traversal**: iterating strict, concatenated and lazy sequences

#![cfg(feature = "persistent")]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lambars_aff::persistent::Seq;
use std::hint::black_box;

// =============================================================================
// Concat
// =============================================================================

fn benchmark_concat(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("seq_concat");

    for count in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("Seq", count), &count, |bencher, &count| {
            bencher.iter(|| {
                let seq = (0..count).fold(Seq::empty(), |seq, index| {
                    seq.concat(Seq::from(vec![index, index + 1]))
                });
                black_box(seq.operand_count())
            });
        });

        group.bench_with_input(
            BenchmarkId::new("append_borrowed", count),
            &count,
            |bencher, &count| {
                let part = Seq::from(vec![0, 1]);
                bencher.iter(|| {
                    let mut accumulator = Seq::empty();
                    for _ in 0..count {
                        accumulator = accumulator.append(&part);
                    }
                    black_box(accumulator.operand_count())
                });
            },
        );

        group.bench_with_input(BenchmarkId::new("Vec", count), &count, |bencher, &count| {
            bencher.iter(|| {
                let vector = (0..count).fold(Vec::new(), |vector: Vec<i32>, index| {
                    let mut next = vector.clone();
                    next.extend([index, index + 1]);
                    next
                });
                black_box(vector.len())
            });
        });
    }

    group.finish();
}

// =============================================================================
// Bind
// =============================================================================

fn benchmark_bind(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("seq_bind");

    for size in [100, 1_000, 10_000] {
        let source: Seq<i32> = (0..size).collect();

        group.bench_with_input(BenchmarkId::new("bind_sum", size), &source, |bencher, source| {
            bencher.iter(|| {
                let bound = source.bind(|x| Seq::from(vec![x, x + 1, x + 2]));
                black_box(bound.iter().map(i64::from).sum::<i64>())
            });
        });

        group.bench_with_input(BenchmarkId::new("head", size), &source, |bencher, source| {
            bencher.iter(|| {
                let bound = source.bind(|x| Seq::from(vec![x, x + 1, x + 2]));
                black_box(bound.head())
            });
        });
    }

    group.finish();
}

// =============================================================================
// Traversal
// =============================================================================

fn benchmark_traversal(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("seq_traversal");
    let size = 10_000;

    let strict: Seq<i32> = (0..size).collect();
    let concatenated = Seq::concat_all((0..size / 100).map(|chunk| {
        (chunk * 100..(chunk + 1) * 100).collect::<Seq<i32>>()
    }));
    let mapped = strict.map(|x| x * 2);

    group.bench_function("strict", |bencher| {
        bencher.iter(|| black_box(strict.iter().map(i64::from).sum::<i64>()));
    });

    group.bench_function("concatenated", |bencher| {
        bencher.iter(|| black_box(concatenated.iter().map(i64::from).sum::<i64>()));
    });

    group.bench_function("mapped", |bencher| {
        bencher.iter(|| black_box(mapped.iter().map(i64::from).sum::<i64>()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_concat, benchmark_bind, benchmark_traversal);

criterion_main!(benches);
