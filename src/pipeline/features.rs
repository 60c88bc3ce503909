//! Calendar feature derivation and categorical/numerical classification

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use super::error::PipelineError;

/// Column holding the first day of each observation week.
pub const DATE_COLUMN: &str = "week_start_date";

/// Composite calendar label, e.g. `4-29`.
pub const MONTH_DAY_COLUMN: &str = "month-day";

/// Columns treated as discrete labels by the model.
pub const DEFAULT_CATEGORICAL: [&str; 2] = ["city", MONTH_DAY_COLUMN];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse `date_column` and replace it with `quarter`, `month`, `day` and
/// `month-day`.
///
/// Null dates give null calendar fields. A value that does not parse as
/// `YYYY-MM-DD` is an error rather than a silent null.
pub fn derive_calendar_features(mut df: DataFrame, date_column: &str) -> Result<DataFrame> {
    let dates = df
        .column(date_column)
        .map_err(|_| PipelineError::MissingColumn {
            column: date_column.to_string(),
            table: "feature table".to_string(),
        })?
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", date_column))?;

    let height = df.height();
    let mut quarter: Vec<Option<i32>> = Vec::with_capacity(height);
    let mut month: Vec<Option<i32>> = Vec::with_capacity(height);
    let mut day: Vec<Option<i32>> = Vec::with_capacity(height);
    let mut month_day: Vec<Option<String>> = Vec::with_capacity(height);

    for value in dates.str()?.iter() {
        let parsed = value
            .map(|v| {
                NaiveDate::parse_from_str(v.trim(), DATE_FORMAT).map_err(|_| {
                    PipelineError::InvalidDate {
                        column: date_column.to_string(),
                        value: v.to_string(),
                    }
                })
            })
            .transpose()?;

        match parsed {
            Some(date) => {
                let m = date.month() as i32;
                let d = date.day() as i32;
                quarter.push(Some((m - 1) / 3 + 1));
                month.push(Some(m));
                day.push(Some(d));
                month_day.push(Some(format!("{}-{}", m, d)));
            }
            None => {
                quarter.push(None);
                month.push(None);
                day.push(None);
                month_day.push(None);
            }
        }
    }

    df.with_column(Column::new("quarter".into(), quarter))?;
    df.with_column(Column::new("month".into(), month))?;
    df.with_column(Column::new("day".into(), day))?;
    df.with_column(Column::new(MONTH_DAY_COLUMN.into(), month_day))?;

    Ok(df.drop(date_column)?)
}

/// How the model should treat a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Categorical,
    Numerical,
}

/// Name-based partition of a frame's columns.
///
/// Built from a frame's current column list; every column lands in exactly
/// one class. Positional indices are never stored: ask for them against the
/// frame you are about to index so a dropped column cannot shift them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    categorical: Vec<String>,
    numerical: Vec<String>,
}

impl FeatureSchema {
    pub fn classify(df: &DataFrame, categorical_names: &[&str]) -> Self {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let (categorical, numerical): (Vec<String>, Vec<String>) = columns
            .iter()
            .cloned()
            .partition(|name| categorical_names.contains(&name.as_str()));

        Self {
            columns,
            categorical,
            numerical,
        }
    }

    pub fn categorical(&self) -> &[String] {
        &self.categorical
    }

    pub fn numerical(&self) -> &[String] {
        &self.numerical
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn kind_of(&self, name: &str) -> Option<FeatureKind> {
        if self.categorical.iter().any(|c| c == name) {
            Some(FeatureKind::Categorical)
        } else if self.numerical.iter().any(|c| c == name) {
            Some(FeatureKind::Numerical)
        } else {
            None
        }
    }

    /// True when `df` has exactly the columns this schema was built from, in
    /// the same order.
    pub fn matches(&self, df: &DataFrame) -> bool {
        let names = df.get_column_names();
        names.len() == self.columns.len()
            && names.iter().zip(&self.columns).all(|(a, b)| a.as_str() == b)
    }

    /// Positions of the categorical columns in `df`'s current column order.
    pub fn categorical_indices_in(&self, df: &DataFrame) -> Vec<usize> {
        indices_of(df, &self.categorical)
    }

    /// Positions of the numerical columns in `df`'s current column order.
    pub fn numerical_indices_in(&self, df: &DataFrame) -> Vec<usize> {
        indices_of(df, &self.numerical)
    }
}

fn indices_of(df: &DataFrame, names: &[String]) -> Vec<usize> {
    df.get_column_names()
        .iter()
        .enumerate()
        .filter(|(_, name)| names.iter().any(|n| n == name.as_str()))
        .map(|(i, _)| i)
        .collect()
}
