//! Regression model seam and the gradient-boosting binding
//!
//! Frames are turned into a column-major [`DesignMatrix`] before they reach a
//! model. Categorical columns are integer-coded by a [`CategoryEncoder`]
//! fitted on the training rows, and their positions are looked up by name on
//! every build, so dropping a column upstream can never leave a stale index.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::str::FromStr;

use anyhow::{Context, Result};
use perpetual::booster::config::ImportanceMethod;
use perpetual::objective::Objective;
use perpetual::{Matrix, PerpetualBooster};
use polars::prelude::*;
use serde::Serialize;

use super::error::PipelineError;

/// Column the model learns to predict.
pub const TARGET_COLUMN: &str = "total_cases";

/// Loss optimized by the booster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Loss {
    /// Absolute error; the booster fits the conditional median.
    #[default]
    Mae,
    Squared,
}

impl FromStr for Loss {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mae" | "absolute" => Ok(Loss::Mae),
            "squared" | "mse" | "rmse" => Ok(Loss::Squared),
            other => Err(format!(
                "unknown loss '{}', expected one of: mae, squared",
                other
            )),
        }
    }
}

/// Booster hyperparameters. The defaults are the competition run's fixed
/// values. Perpetual's tree growth is deterministic, so the run's seed lives
/// in [`SplitConfig`](super::SplitConfig) where the randomness is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    /// Upper bound on boosting rounds.
    pub iterations: usize,
    pub learning_rate: f64,
    pub loss: Loss,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 4000,
            learning_rate: 0.3,
            loss: Loss::Mae,
        }
    }
}

impl TrainingConfig {
    /// Perpetual's step size is `10^-budget`, so the learning rate maps to
    /// `budget = -log10(learning_rate)`.
    pub fn budget(&self) -> f32 {
        (-self.learning_rate.log10()).max(0.1) as f32
    }
}

/// Integer codes for the values of each categorical column.
///
/// Codes are assigned in sorted value order so the same training rows always
/// give the same codes. Values not seen at fit time encode as missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryEncoder {
    codes: BTreeMap<String, BTreeMap<String, usize>>,
}

impl CategoryEncoder {
    pub fn fit(df: &DataFrame, categorical: &[String]) -> Result<Self> {
        let mut codes = BTreeMap::new();

        for name in categorical {
            let values = text_values(df, name)?;
            let distinct: BTreeSet<String> = values.into_iter().flatten().collect();
            let mapping = distinct
                .into_iter()
                .enumerate()
                .map(|(code, value)| (value, code))
                .collect();
            codes.insert(name.clone(), mapping);
        }

        Ok(Self { codes })
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.codes.contains_key(column)
    }

    /// Number of distinct training values of `column`.
    pub fn cardinality(&self, column: &str) -> Option<usize> {
        self.codes.get(column).map(BTreeMap::len)
    }

    pub fn encode(&self, column: &str, value: &str) -> Option<usize> {
        self.codes.get(column)?.get(value).copied()
    }

    /// Build the model input from every column of `df` except `label`.
    pub fn design_matrix(&self, df: &DataFrame, label: &str) -> Result<DesignMatrix> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|name| name != label)
            .collect();

        let rows = df.height();
        let mut data = Vec::with_capacity(rows * columns.len());
        let mut categorical = Vec::new();

        for (position, name) in columns.iter().enumerate() {
            if self.is_categorical(name) {
                categorical.push(position);
                for value in text_values(df, name)? {
                    let code = value.and_then(|v| self.encode(name, &v));
                    data.push(code.map_or(f64::NAN, |c| c as f64));
                }
            } else {
                let values = df
                    .column(name)?
                    .cast(&DataType::Float64)
                    .with_context(|| format!("Column '{}' is not numeric", name))?;
                data.extend(values.f64()?.iter().map(|v| v.unwrap_or(f64::NAN)));
            }
        }

        Ok(DesignMatrix {
            columns,
            categorical,
            rows,
            data,
        })
    }
}

fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::MissingColumn {
            column: name.to_string(),
            table: "model input".to_string(),
        })?
        .cast(&DataType::String)?;
    Ok(column.str()?.iter().map(|v| v.map(str::to_string)).collect())
}

/// Numeric model input, stored column by column.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    columns: Vec<String>,
    categorical: Vec<usize>,
    rows: usize,
    data: Vec<f64>,
}

impl DesignMatrix {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Positions of the categorical columns in [`Self::columns`].
    pub fn categorical_indices(&self) -> &[usize] {
        &self.categorical
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.columns.len()
    }

    /// Column-major values, missing as NaN.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let i = self.columns.iter().position(|c| c == name)?;
        Some(&self.data[i * self.rows..(i + 1) * self.rows])
    }

    /// Error unless `other` has the same feature columns in the same order.
    pub fn ensure_same_columns(&self, other: &DesignMatrix) -> Result<(), PipelineError> {
        if self.columns == other.columns {
            Ok(())
        } else {
            Err(PipelineError::SchemaMismatch(format!(
                "model was fitted on {:?} but got {:?}",
                self.columns, other.columns
            )))
        }
    }
}

/// Values of the label column; every row must have one.
pub fn labels(df: &DataFrame, label: &str) -> Result<Vec<f64>> {
    let column = df
        .column(label)
        .map_err(|_| PipelineError::MissingColumn {
            column: label.to_string(),
            table: "model input".to_string(),
        })?
        .cast(&DataType::Float64)?;

    let values: Vec<Option<f64>> = column.f64()?.iter().collect();
    let count = values.iter().filter(|v| v.is_none()).count();
    if count > 0 {
        return Err(PipelineError::MissingLabels {
            column: label.to_string(),
            count,
        }
        .into());
    }

    Ok(values.into_iter().flatten().collect())
}

/// A regression model behind a fit/predict contract.
pub trait Regressor {
    /// Fit on `train`.
    ///
    /// `validation` is only passed through for models that can monitor it.
    /// It does not stop training early; [`fit_and_validate`] scores it after
    /// the fit.
    fn fit(
        &mut self,
        train: &DesignMatrix,
        train_labels: &[f64],
        validation: &DesignMatrix,
        validation_labels: &[f64],
    ) -> Result<()>;

    /// One prediction per row of `features`.
    fn predict(&self, features: &DesignMatrix) -> Result<Vec<f64>>;

    /// Importance of each fitted column, in column order. `None` when the
    /// model has no such measure.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }
}

/// Share of the model's split gain attributed to one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Mean absolute error of row-aligned sequences.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(PipelineError::LengthMismatch {
            expected: actual.len(),
            actual: predicted.len(),
        }
        .into());
    }
    if actual.is_empty() {
        anyhow::bail!("Cannot compute MAE over zero rows");
    }

    let total: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).abs()).sum();
    Ok(total / actual.len() as f64)
}

/// Fit `model`, then score it on the validation rows.
///
/// Returns the validation MAE.
pub fn fit_and_validate<R: Regressor>(
    model: &mut R,
    train: &DesignMatrix,
    train_labels: &[f64],
    validation: &DesignMatrix,
    validation_labels: &[f64],
) -> Result<f64> {
    train.ensure_same_columns(validation)?;
    model.fit(train, train_labels, validation, validation_labels)?;
    let predicted = model.predict(validation)?;
    mean_absolute_error(validation_labels, &predicted)
}

/// [`Regressor`] backed by perpetual's gradient-boosted trees.
pub struct PerpetualRegressor {
    config: TrainingConfig,
    booster: Option<PerpetualBooster>,
    columns: Vec<String>,
}

impl PerpetualRegressor {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            booster: None,
            columns: Vec::new(),
        }
    }

    fn configured_booster(&self, categorical: &[usize]) -> PerpetualBooster {
        let objective = match self.config.loss {
            Loss::Mae => Objective::QuantileLoss { quantile: Some(0.5) },
            Loss::Squared => Objective::SquaredLoss,
        };

        let categorical: HashSet<usize> = categorical.iter().copied().collect();
        PerpetualBooster::default()
            .set_objective(objective)
            .set_budget(self.config.budget())
            .set_iteration_limit(Some(self.config.iterations))
            .set_categorical_features(if categorical.is_empty() {
                None
            } else {
                Some(categorical)
            })
    }
}

impl Regressor for PerpetualRegressor {
    fn fit(
        &mut self,
        train: &DesignMatrix,
        train_labels: &[f64],
        validation: &DesignMatrix,
        validation_labels: &[f64],
    ) -> Result<()> {
        for (rows, labels) in [(train.rows(), train_labels), (validation.rows(), validation_labels)] {
            if rows != labels.len() {
                return Err(PipelineError::LengthMismatch {
                    expected: rows,
                    actual: labels.len(),
                }
                .into());
            }
        }

        let matrix = Matrix::new(train.data(), train.rows(), train.cols());
        let mut booster = self.configured_booster(train.categorical_indices());
        booster
            .fit(&matrix, train_labels, None, None)
            .map_err(|e| PipelineError::Model(e.to_string()))?;

        self.columns = train.columns().to_vec();
        self.booster = Some(booster);
        Ok(())
    }

    fn predict(&self, features: &DesignMatrix) -> Result<Vec<f64>> {
        let booster = self
            .booster
            .as_ref()
            .ok_or_else(|| PipelineError::Model("predict called before fit".into()))?;

        if features.columns() != self.columns.as_slice() {
            return Err(PipelineError::SchemaMismatch(format!(
                "model was fitted on {:?} but got {:?}",
                self.columns,
                features.columns()
            ))
            .into());
        }

        let matrix = Matrix::new(features.data(), features.rows(), features.cols());
        Ok(booster.predict(&matrix, true))
    }

    /// Average split gain per column, normalized to sum to one. Columns the
    /// trees never split on get zero.
    fn feature_importances(&self) -> Option<Vec<f64>> {
        let booster = self.booster.as_ref()?;
        let gains = booster.calculate_feature_importance(ImportanceMethod::Gain, true);
        let importances = (0..self.columns.len())
            .map(|i| {
                gains
                    .get(&i)
                    .map(|&g| f64::from(g))
                    .filter(|g| g.is_finite())
                    .unwrap_or(0.0)
            })
            .collect();
        Some(importances)
    }
}

/// A fitted regressor together with the encoder its inputs were built with.
pub struct FittedModel<R> {
    model: R,
    encoder: CategoryEncoder,
    label: String,
    columns: Vec<String>,
    /// Rows the model was fitted on.
    pub train_rows: usize,
    pub validation_rows: usize,
    pub validation_mae: f64,
}

impl<R: Regressor> FittedModel<R> {
    /// Fit the category codes on `train`, then fit `model` and score it on
    /// `validation`.
    pub fn train(
        mut model: R,
        train: &DataFrame,
        validation: &DataFrame,
        categorical: &[String],
        label: &str,
    ) -> Result<Self> {
        let encoder = CategoryEncoder::fit(train, categorical)?;
        let train_matrix = encoder.design_matrix(train, label)?;
        let validation_matrix = encoder.design_matrix(validation, label)?;
        let train_labels = labels(train, label)?;
        let validation_labels = labels(validation, label)?;

        let validation_mae = fit_and_validate(
            &mut model,
            &train_matrix,
            &train_labels,
            &validation_matrix,
            &validation_labels,
        )?;

        Ok(Self {
            model,
            encoder,
            label: label.to_string(),
            columns: train_matrix.columns().to_vec(),
            train_rows: train_matrix.rows(),
            validation_rows: validation_matrix.rows(),
            validation_mae,
        })
    }

    /// Predict every row of `df`. A label column, if present, is ignored.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let matrix = self.encoder.design_matrix(df, &self.label)?;
        self.model.predict(&matrix)
    }

    /// MAE of the predictions for `df` against its label column.
    pub fn score(&self, df: &DataFrame) -> Result<f64> {
        let actual = labels(df, &self.label)?;
        let predicted = self.predict(df)?;
        mean_absolute_error(&actual, &predicted)
    }

    /// Feature columns in the order the model was fitted on.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Importance of every fitted column by name, in fitted column order.
    /// Empty when the model reports none.
    pub fn feature_importances(&self) -> Result<Vec<FeatureImportance>> {
        let Some(values) = self.model.feature_importances() else {
            return Ok(Vec::new());
        };
        if values.len() != self.columns.len() {
            return Err(PipelineError::LengthMismatch {
                expected: self.columns.len(),
                actual: values.len(),
            }
            .into());
        }

        Ok(self
            .columns
            .iter()
            .zip(values)
            .map(|(feature, importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect())
    }
}
