//! Dropping collinear features from the training and held-out tables

use anyhow::Result;
use polars::prelude::*;

use super::error::PipelineError;

/// Features flagged as redundant from the correlation matrix of the full
/// training table (|r| > 0.9 against a kept feature).
pub const DEFAULT_DROP_FEATURES: [&str; 6] = [
    "quarter",
    "month",
    "reanalysis_sat_precip_amt_mm",
    "reanalysis_specific_humidity_g_per_kg",
    "reanalysis_avg_temp_k",
    "reanalysis_tdtr_k",
];

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    /// Names removed from the tables.
    pub dropped: Vec<String>,
    /// Requested names that neither table had.
    pub absent: Vec<String>,
}

/// Drop `names` from both tables by name and check the schemas still agree.
///
/// Names a table does not have are skipped. Afterwards both tables must
/// expose the same column set, otherwise the held-out rows could not be
/// scored by a model trained on the other table.
pub fn prune_features(
    training: DataFrame,
    held_out: DataFrame,
    names: &[String],
) -> Result<(DataFrame, DataFrame, PruneOutcome)> {
    let has = |df: &DataFrame, name: &str| df.column(name).is_ok();

    let mut outcome = PruneOutcome::default();
    for name in names {
        if has(&training, name) || has(&held_out, name) {
            outcome.dropped.push(name.clone());
        } else {
            outcome.absent.push(name.clone());
        }
    }

    let training = training.drop_many(outcome.dropped.iter().filter(|n| has(&training, n)).cloned());
    let held_out = held_out.drop_many(outcome.dropped.iter().filter(|n| has(&held_out, n)).cloned());

    ensure_same_columns(&training, &held_out)?;

    Ok((training, held_out, outcome))
}

/// Error unless both frames have the same set of column names.
pub fn ensure_same_columns(a: &DataFrame, b: &DataFrame) -> Result<(), PipelineError> {
    let mut names_a: Vec<String> = a.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut names_b: Vec<String> = b.get_column_names().iter().map(|s| s.to_string()).collect();
    names_a.sort();
    names_b.sort();

    if names_a == names_b {
        return Ok(());
    }

    let only_a: Vec<&String> = names_a.iter().filter(|n| !names_b.contains(n)).collect();
    let only_b: Vec<&String> = names_b.iter().filter(|n| !names_a.contains(n)).collect();
    Err(PipelineError::SchemaMismatch(format!(
        "columns only in training: {:?}; columns only in held-out: {:?}",
        only_a, only_b
    )))
}
