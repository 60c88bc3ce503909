//! Benchmark of the correlation matrix on complete vs gapped weather data
//!
//! Complete columns take the dense matrix-product path; any null sends the
//! whole matrix down the pairwise path.
//!
//! Run with: cargo bench --bench correlation_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use dengai::pipeline::correlation_matrix;

const NO_EXCLUSIONS: &[&str] = &[];

/// Weather-like columns; every fourth one tracks an earlier column so the
/// matrix has collinear pairs. `gap_rate` is the share of nulls per column.
fn generate_weather_dataframe(n_rows: usize, n_features: usize, gap_rate: f64, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut raw: Vec<Vec<f64>> = Vec::with_capacity(n_features);

    for i in 0..n_features {
        let values: Vec<f64> = if i % 4 == 3 {
            raw[i - 3]
                .iter()
                .map(|v| v + rng.gen::<f64>() * 2.0 - 1.0)
                .collect()
        } else {
            (0..n_rows).map(|_| 290.0 + rng.gen::<f64>() * 15.0).collect()
        };
        raw.push(values);
    }

    let columns: Vec<Column> = raw
        .into_iter()
        .enumerate()
        .map(|(i, values)| {
            let values: Vec<Option<f64>> = values
                .into_iter()
                .map(|v| if rng.gen::<f64>() < gap_rate { None } else { Some(v) })
                .collect();
            Column::new(format!("station_{}", i).into(), values)
        })
        .collect();

    DataFrame::new(columns).expect("Failed to create DataFrame")
}

fn benchmark_correlation_by_columns(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_by_columns");
    group.sample_size(20);

    let n_rows = 1_456; // Both cities' training weeks
    for n_cols in [10, 20, 40, 80] {
        let complete = generate_weather_dataframe(n_rows, n_cols, 0.0, 42);
        let gapped = generate_weather_dataframe(n_rows, n_cols, 0.02, 42);

        group.throughput(Throughput::Elements(((n_cols * (n_cols - 1)) / 2) as u64));

        group.bench_with_input(BenchmarkId::new("dense", n_cols), &complete, |b, df| {
            b.iter(|| correlation_matrix(black_box(df), black_box(NO_EXCLUSIONS)));
        });
        group.bench_with_input(BenchmarkId::new("pairwise", n_cols), &gapped, |b, df| {
            b.iter(|| correlation_matrix(black_box(df), black_box(NO_EXCLUSIONS)));
        });
    }

    group.finish();
}

fn benchmark_correlation_by_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_by_rows");
    group.sample_size(20);

    let n_cols = 20;
    for n_rows in [1_000, 10_000, 100_000] {
        let complete = generate_weather_dataframe(n_rows, n_cols, 0.0, 42);
        let gapped = generate_weather_dataframe(n_rows, n_cols, 0.02, 42);

        group.throughput(Throughput::Elements(n_rows as u64));

        group.bench_with_input(BenchmarkId::new("dense", n_rows), &complete, |b, df| {
            b.iter(|| correlation_matrix(black_box(df), black_box(NO_EXCLUSIONS)));
        });
        group.bench_with_input(BenchmarkId::new("pairwise", n_rows), &gapped, |b, df| {
            b.iter(|| correlation_matrix(black_box(df), black_box(NO_EXCLUSIONS)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_correlation_by_columns,
    benchmark_correlation_by_rows
);
criterion_main!(benches);
