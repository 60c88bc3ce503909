//! Correlation diagnostics between numeric columns

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::utils::create_spinner;

/// Represents a correlated pair of features
#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Symmetric Pearson correlation matrix over the numeric columns of a frame.
///
/// Cells are `None` where a correlation is undefined (a constant column, or
/// fewer than two rows observed in both columns).
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    /// Pairs from the upper triangle with `|r| > threshold`, strongest first.
    pub fn correlated_pairs(&self, threshold: f64) -> Vec<CorrelatedPair> {
        let n = self.columns.len();
        let mut pairs = Vec::new();

        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(corr) = self.values[i][j] {
                    if corr.abs() > threshold {
                        pairs.push(CorrelatedPair {
                            feature1: self.columns[i].clone(),
                            feature2: self.columns[j].clone(),
                            correlation: corr,
                        });
                    }
                }
            }
        }

        pairs.sort_by(|a, b| {
            b.correlation
                .abs()
                .partial_cmp(&a.correlation.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        pairs
    }
}

/// Compute the correlation matrix of every numeric column not in `exclude`.
///
/// Nulls are handled pairwise: a row counts for a pair only when both values
/// are present. When no column has nulls the matrix is computed in one
/// product of the standardized data, which gives the same numbers.
pub fn correlation_matrix(df: &DataFrame, exclude: &[&str]) -> Result<CorrelationMatrix> {
    let float_columns = numeric_columns_as_f64(df, exclude);
    let n = float_columns.len();

    let spinner = create_spinner(&format!("Computing correlation matrix ({} columns)", n));

    let complete = float_columns.iter().all(|(_, values)| values.iter().all(Option::is_some));
    let values = if complete && df.height() > 1 {
        dense_correlations(&float_columns)
    } else {
        pairwise_correlations(&float_columns)
    };

    spinner.finish_and_clear();

    Ok(CorrelationMatrix {
        columns: float_columns.into_iter().map(|(name, _)| name).collect(),
        values,
    })
}

/// Find highly correlated pairs among the numeric columns of `df`.
pub fn find_correlated_pairs(
    df: &DataFrame,
    threshold: f64,
    exclude: &[&str],
) -> Result<Vec<CorrelatedPair>> {
    Ok(correlation_matrix(df, exclude)?.correlated_pairs(threshold))
}

fn numeric_columns_as_f64(df: &DataFrame, exclude: &[&str]) -> Vec<(String, Vec<Option<f64>>)> {
    df.get_columns()
        .iter()
        .filter(|col| col.dtype().is_primitive_numeric() && !exclude.contains(&col.name().as_str()))
        .filter_map(|col| {
            let cast = col.cast(&DataType::Float64).ok()?;
            let values: Vec<Option<f64>> = cast.f64().ok()?.iter().collect();
            Some((col.name().to_string(), values))
        })
        .collect()
}

fn pairwise_correlations(columns: &[(String, Vec<Option<f64>>)]) -> Vec<Vec<Option<f64>>> {
    let n = columns.len();
    let pairs: Vec<(usize, usize)> = (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect();

    let computed: Vec<((usize, usize), Option<f64>)> = pairs
        .par_iter()
        .map(|&(i, j)| ((i, j), pearson(&columns[i].1, &columns[j].1)))
        .collect();

    let mut values = vec![vec![None; n]; n];
    for (i, column) in columns.iter().enumerate() {
        // A column with any spread correlates perfectly with itself.
        values[i][i] = pearson(&column.1, &column.1);
    }
    for ((i, j), corr) in computed {
        values[i][j] = corr;
        values[j][i] = corr;
    }
    values
}

/// Single-pass Welford Pearson correlation over rows observed in both.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let mut n = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (x, y) in xs.iter().zip(ys) {
        if let (Some(x), Some(y)) = (x, y) {
            n += 1.0;
            let dx = x - mean_x;
            let dy = y - mean_y;
            mean_x += dx / n;
            mean_y += dy / n;
            var_x += dx * (x - mean_x);
            var_y += dy * (y - mean_y);
            cov_xy += dx * (y - mean_y);
        }
    }

    if n < 2.0 || var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }

    let r = cov_xy / (var_x.sqrt() * var_y.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

/// R = Zᵀ Z for standardized, null-free columns.
fn dense_correlations(columns: &[(String, Vec<Option<f64>>)]) -> Vec<Vec<Option<f64>>> {
    let n_cols = columns.len();
    let n_rows = columns.first().map_or(0, |(_, v)| v.len());

    let standardized: Vec<Option<Vec<f64>>> = columns
        .par_iter()
        .map(|(_, values)| {
            let xs: Vec<f64> = values.iter().map(|v| v.unwrap_or(0.0)).collect();
            let mean = xs.iter().sum::<f64>() / n_rows as f64;
            let ss: f64 = xs.iter().map(|x| (x - mean) * (x - mean)).sum();
            if ss <= 0.0 {
                return None;
            }
            let scale = ss.sqrt();
            Some(xs.iter().map(|x| (x - mean) / scale).collect())
        })
        .collect();

    let mut z = Mat::<f64>::zeros(n_rows, n_cols);
    for (col_idx, col) in standardized.iter().enumerate() {
        if let Some(col) = col {
            for (row_idx, &val) in col.iter().enumerate() {
                z[(row_idx, col_idx)] = val;
            }
        }
    }

    let product = z.transpose() * &z;

    (0..n_cols)
        .map(|i| {
            (0..n_cols)
                .map(|j| match (&standardized[i], &standardized[j]) {
                    (Some(_), Some(_)) => Some(product[(i, j)].clamp(-1.0, 1.0)),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

/// Determine which features to drop from correlated pairs
/// Strategy: for each pair, drop the feature that appears more frequently in
/// correlations. Columns in `protected` are never dropped.
pub fn select_features_to_drop(pairs: &[CorrelatedPair], protected: &[&str]) -> Vec<String> {
    let mut frequency: HashMap<&str, usize> = HashMap::new();
    for pair in pairs {
        *frequency.entry(pair.feature1.as_str()).or_insert(0) += 1;
        *frequency.entry(pair.feature2.as_str()).or_insert(0) += 1;
    }

    let mut to_drop = Vec::new();
    let mut resolved: HashSet<&str> = HashSet::new();

    for pair in pairs {
        let (a, b) = (pair.feature1.as_str(), pair.feature2.as_str());
        if resolved.contains(a) || resolved.contains(b) {
            continue;
        }

        let victim = match (protected.contains(&a), protected.contains(&b)) {
            (true, true) => continue,
            (true, false) => b,
            (false, true) => a,
            (false, false) => {
                if frequency[a] >= frequency[b] {
                    a
                } else {
                    b
                }
            }
        };

        to_drop.push(victim.to_string());
        resolved.insert(victim);
    }

    to_drop
}
