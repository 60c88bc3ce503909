//! Writing predictions into the submission template

use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::error::PipelineError;
use super::join::join_on_key;

const PREDICTION_COLUMN: &str = "__prediction";

/// Round to the nearest integer, halves to even.
///
/// NaN and infinite predictions are rejected rather than cast.
pub fn round_predictions(predictions: &[f64]) -> Result<Vec<i64>> {
    if let Some(row) = predictions.iter().position(|p| !p.is_finite()) {
        return Err(PipelineError::Model(format!(
            "prediction for row {} is {}",
            row, predictions[row]
        ))
        .into());
    }

    Ok(predictions
        .iter()
        .map(|p| p.round_ties_even() as i64)
        .collect())
}

/// Reorder predictions made for the rows of `scored` into the row order of
/// `template`, matching rows on `keys`.
///
/// Every template row needs exactly one scored row.
pub fn align_predictions(
    template: &DataFrame,
    scored: &DataFrame,
    predictions: &[f64],
    keys: &[&str],
) -> Result<Vec<f64>> {
    if scored.height() != predictions.len() {
        return Err(PipelineError::LengthMismatch {
            expected: scored.height(),
            actual: predictions.len(),
        }
        .into());
    }

    let mut keyed = scored
        .select(keys.iter().copied())
        .context("Scored table lacks the key columns")?;
    keyed.with_column(Column::new(PREDICTION_COLUMN.into(), predictions))?;

    let template_keys = template
        .select(keys.iter().copied())
        .context("Submission template lacks the key columns")?;
    let aligned = join_on_key(template_keys, keyed, keys)?;

    if aligned.height() != template.height() {
        return Err(PipelineError::SchemaMismatch(format!(
            "{} scored rows matched {} template rows; keys must be unique",
            aligned.height(),
            template.height()
        ))
        .into());
    }

    let values: Vec<Option<f64>> = aligned.column(PREDICTION_COLUMN)?.f64()?.iter().collect();
    let unmatched = values.iter().filter(|v| v.is_none()).count();
    if unmatched > 0 {
        return Err(PipelineError::SchemaMismatch(format!(
            "{} template rows have no matching scored row",
            unmatched
        ))
        .into());
    }

    Ok(values.into_iter().flatten().collect())
}

/// Overwrite `target` in the template with rounded predictions.
///
/// The template keeps its own row order and every other column; predictions
/// must be aligned with it row for row.
pub fn fill_template(template: &mut DataFrame, predictions: &[f64], target: &str) -> Result<()> {
    if template.height() != predictions.len() {
        return Err(PipelineError::LengthMismatch {
            expected: template.height(),
            actual: predictions.len(),
        }
        .into());
    }
    if template.column(target).is_err() {
        return Err(PipelineError::MissingColumn {
            column: target.to_string(),
            table: "submission template".to_string(),
        }
        .into());
    }

    let rounded = round_predictions(predictions)?;
    template.replace(target, Series::new(target.into(), rounded))?;
    Ok(())
}

/// Fill the template and write it as CSV, header included, no index column.
pub fn write_predictions(
    template: &mut DataFrame,
    predictions: &[f64],
    target: &str,
    path: &Path,
) -> Result<()> {
    fill_template(template, predictions, target)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(template)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

    Ok(())
}
