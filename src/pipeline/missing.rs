//! Missing value analysis and mean imputation

use std::collections::BTreeMap;

use anyhow::Result;
use polars::prelude::*;

use super::error::PipelineError;

/// Analyze missing values in the dataset.
///
/// Returns `(column, null_count / row_count)` for every column, sorted by
/// ratio descending.
pub fn analyze_missing_values(df: &DataFrame) -> Result<Vec<(String, f64)>> {
    // Handle empty DataFrame
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;
    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|column| (column.name().to_string(), column.null_count() as f64 / rows))
        .collect();

    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(missing_ratios)
}

/// Columns with at least one missing value, in analysis order.
pub fn columns_with_missing(missing_ratios: &[(String, f64)]) -> Vec<String> {
    missing_ratios
        .iter()
        .filter(|(_, ratio)| *ratio > 0.0)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Where the imputation means come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImputeStrategy {
    /// Each table is filled with its own column means. The held-out table
    /// never sees training statistics, so the two can disagree.
    #[default]
    PerTable,
    /// Means are computed once on the training table and applied to both.
    TrainingStatistics,
}

/// How many cells were filled per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImputationReport {
    pub filled: Vec<(String, usize)>,
}

impl ImputationReport {
    pub fn total_filled(&self) -> usize {
        self.filled.iter().map(|(_, n)| n).sum()
    }
}

/// Per-column means used to fill missing values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMeans {
    means: BTreeMap<String, f64>,
}

impl ColumnMeans {
    /// Compute the mean of every listed column over its observed values.
    ///
    /// Fails when a listed column is missing, is not numeric, or has rows but
    /// no observed value.
    pub fn fit(df: &DataFrame, columns: &[String]) -> Result<Self> {
        let mut means = BTreeMap::new();

        for name in columns {
            let column = numeric_column(df, name)?;
            if column.len() == 0 {
                continue;
            }
            let mean = column
                .cast(&DataType::Float64)?
                .f64()?
                .mean()
                .ok_or_else(|| PipelineError::NoObservedValues(name.clone()))?;
            means.insert(name.clone(), mean);
        }

        Ok(Self { means })
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.means.get(column).copied()
    }

    /// Fill nulls in the listed columns with the stored means.
    ///
    /// Columns without nulls keep their dtype; filled columns become Float64.
    pub fn apply(&self, mut df: DataFrame, columns: &[String]) -> Result<(DataFrame, ImputationReport)> {
        let mut report = ImputationReport::default();

        for name in columns {
            let column = numeric_column(&df, name)?;
            let nulls = column.null_count();
            if nulls == 0 {
                continue;
            }

            let mean = self
                .get(name)
                .ok_or_else(|| PipelineError::NoObservedValues(name.clone()))?;

            let filled: Vec<f64> = column
                .cast(&DataType::Float64)?
                .f64()?
                .iter()
                .map(|v| v.unwrap_or(mean))
                .collect();

            df.with_column(Column::new(name.as_str().into(), filled))?;
            report.filled.push((name.clone(), nulls));
        }

        Ok((df, report))
    }
}

fn numeric_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    let column = df.column(name).map_err(|_| PipelineError::MissingColumn {
        column: name.to_string(),
        table: "table being imputed".to_string(),
    })?;

    if !column.dtype().is_primitive_numeric() {
        return Err(PipelineError::SchemaMismatch(format!(
            "column '{}' is classified numerical but has dtype {}",
            name,
            column.dtype()
        ))
        .into());
    }

    Ok(column)
}

/// Fill every listed column with that table's own column means.
pub fn impute_with_means(df: DataFrame, columns: &[String]) -> Result<(DataFrame, ImputationReport)> {
    let means = ColumnMeans::fit(&df, columns)?;
    means.apply(df, columns)
}

/// Impute a training and a held-out table according to `strategy`.
pub fn impute_tables(
    training: DataFrame,
    held_out: DataFrame,
    columns: &[String],
    strategy: ImputeStrategy,
) -> Result<((DataFrame, ImputationReport), (DataFrame, ImputationReport))> {
    match strategy {
        ImputeStrategy::PerTable => Ok((
            impute_with_means(training, columns)?,
            impute_with_means(held_out, columns)?,
        )),
        ImputeStrategy::TrainingStatistics => {
            let means = ColumnMeans::fit(&training, columns)?;
            Ok((means.apply(training, columns)?, means.apply(held_out, columns)?))
        }
    }
}
