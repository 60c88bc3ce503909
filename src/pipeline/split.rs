//! Stratified train/validation/test partitioning

use std::collections::HashMap;

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::error::PipelineError;

/// Location column every split is stratified on.
pub const STRATIFY_COLUMN: &str = "city";

/// Split fractions and seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    /// Share of all rows held out for testing.
    pub test_fraction: f64,
    /// Share of the non-test rows used for validation.
    pub validation_fraction: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            validation_fraction: 0.25,
            seed: 123,
        }
    }
}

/// Row indices of a two-way split, each list in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Row indices of a three-way split into the original table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreeWaySplit {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
    pub test: Vec<usize>,
}

/// Read the grouping column as text labels, nulls included as their own group.
fn group_labels(df: &DataFrame, stratify_column: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(stratify_column)
        .map_err(|_| PipelineError::MissingColumn {
            column: stratify_column.to_string(),
            table: "table being split".to_string(),
        })?
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be used for stratification", stratify_column))?;

    Ok(column.str()?.iter().map(|v| v.map(str::to_string)).collect())
}

/// Partition row positions `0..labels.len()` into train and test so each
/// group keeps its share of the table.
///
/// `ceil(test_fraction * n)` rows go to test. Each group receives the floor
/// of its proportional share; leftover test slots go to the groups with the
/// largest fractional remainder (first-seen group wins ties) without ever
/// exceeding a group's size. Rows are drawn within groups by a generator
/// seeded with `seed`, so the same labels and seed give the same split.
pub fn stratified_indices<K>(labels: &[K], test_fraction: f64, seed: u64) -> Result<SplitIndices, PipelineError>
where
    K: Eq + std::hash::Hash,
{
    let n = labels.len();
    if n == 0 {
        return Err(PipelineError::InvalidSplit("cannot split an empty table".into()));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::InvalidSplit(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    // Groups in order of first appearance.
    let mut group_of: HashMap<&K, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row, label) in labels.iter().enumerate() {
        let g = *group_of.entry(label).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(row);
    }

    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);

    let shares: Vec<f64> = groups
        .iter()
        .map(|rows| rows.len() as f64 * n_test as f64 / n as f64)
        .collect();
    let mut allocation: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();

    let mut remaining = n_test - allocation.iter().sum::<usize>();
    let mut by_remainder: Vec<usize> = (0..groups.len()).collect();
    by_remainder.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal)
    });
    while remaining > 0 {
        let mut placed = false;
        for &g in &by_remainder {
            if remaining == 0 {
                break;
            }
            if allocation[g] < groups[g].len() {
                allocation[g] += 1;
                remaining -= 1;
                placed = true;
            }
        }
        if !placed {
            break;
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);

    for (rows, &take) in groups.iter_mut().zip(&allocation) {
        rows.shuffle(&mut rng);
        test.extend_from_slice(&rows[..take]);
        train.extend_from_slice(&rows[take..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok(SplitIndices { train, test })
}

/// Stratified two-way split of `df` on `stratify_column`.
pub fn stratified_split(
    df: &DataFrame,
    stratify_column: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices> {
    let labels = group_labels(df, stratify_column)?;
    Ok(stratified_indices(&labels, test_fraction, seed)?)
}

/// Hold out a test set, then carve a validation set out of the remainder with
/// the same grouping column and seed.
///
/// With the default fractions this lands near 60/20/20. Returned indices
/// point into `df`.
pub fn three_way_split(df: &DataFrame, stratify_column: &str, config: &SplitConfig) -> Result<ThreeWaySplit> {
    let labels = group_labels(df, stratify_column)?;
    let first = stratified_indices(&labels, config.test_fraction, config.seed)?;

    let rest_labels: Vec<&Option<String>> = first.train.iter().map(|&i| &labels[i]).collect();
    let second = stratified_indices(&rest_labels, config.validation_fraction, config.seed)?;

    Ok(ThreeWaySplit {
        train: second.train.iter().map(|&i| first.train[i]).collect(),
        validation: second.test.iter().map(|&i| first.train[i]).collect(),
        test: first.test,
    })
}

/// Rows of `df` at `indices`, in the given order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("".into(), idx);
    Ok(df.take(&idx)?)
}
