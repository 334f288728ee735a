//! Criterion micro-benchmarks for the bitonic sort and offset tables.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use roost_sort::{sort_and_compute_offsets, sort_pairs, SortEntry};

fn entries(len: u32, key_count: u32) -> Vec<SortEntry> {
    (0..len)
        .map(|i| {
            let key = (u64::from(i).wrapping_mul(6364136223846793005) >> 33) as u32 % key_count;
            SortEntry::new(key, i)
        })
        .collect()
}

/// Benchmark: sort 64K pairs (a power of two).
fn bench_sort_64k(c: &mut Criterion) {
    let input = entries(1 << 16, 4096);

    c.bench_function("bitonic_sort_64k", |b| {
        b.iter_batched_ref(
            || input.clone(),
            |data| {
                sort_pairs(data);
                black_box(data[0]);
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: sort 50K pairs, padded to 64K.
fn bench_sort_50k_padded(c: &mut Criterion) {
    let input = entries(50_000, 4096);

    c.bench_function("bitonic_sort_50k_padded", |b| {
        b.iter_batched_ref(
            || input.clone(),
            |data| {
                sort_pairs(data);
                black_box(data[0]);
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: sort plus offset table over 125K cells.
fn bench_offsets_50k(c: &mut Criterion) {
    let input = entries(50_000, 125_000);
    let mut offsets = vec![0u32; 125_001];

    c.bench_function("sort_and_offsets_50k", |b| {
        b.iter_batched_ref(
            || input.clone(),
            |data| {
                sort_and_compute_offsets(data, &mut offsets).unwrap();
                black_box(offsets[125_000]);
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_sort_64k,
    bench_sort_50k_padded,
    bench_offsets_50k
);
criterion_main!(benches);
