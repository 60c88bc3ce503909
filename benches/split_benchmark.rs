//! Benchmark of stratified splitting
//!
//! Run with: cargo bench --bench split_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;

use dengai::pipeline::{stratified_indices, three_way_split, SplitConfig, STRATIFY_COLUMN};

fn generate_city_dataframe(n_rows: usize, n_cities: usize) -> DataFrame {
    let city: Vec<String> = (0..n_rows).map(|i| format!("city_{}", i % n_cities)).collect();
    let cases: Vec<i64> = (0..n_rows).map(|i| (i % 50) as i64).collect();

    df! {
        "city" => city,
        "total_cases" => cases,
    }
    .expect("Failed to create DataFrame")
}

fn benchmark_stratified_indices(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratified_indices");

    for n_rows in [1_000, 10_000, 100_000] {
        let labels: Vec<usize> = (0..n_rows).map(|i| i % 2).collect();
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &labels, |b, labels| {
            b.iter(|| stratified_indices(black_box(labels), black_box(0.2), black_box(123)));
        });
    }

    group.finish();
}

fn benchmark_three_way_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("three_way_split");
    let config = SplitConfig::default();

    for n_cities in [2, 20, 200] {
        let df = generate_city_dataframe(50_000, n_cities);
        group.bench_with_input(BenchmarkId::new("cities", n_cities), &df, |b, df| {
            b.iter(|| three_way_split(black_box(df), STRATIFY_COLUMN, black_box(&config)));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_stratified_indices, benchmark_three_way_split);
criterion_main!(benches);
