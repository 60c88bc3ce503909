//! Error types for the forecasting pipeline.
//!
//! Stages return `anyhow::Result` like the rest of the crate; the variants
//! here mark the failures a caller may want to tell apart (and that tests
//! downcast to).

use thiserror::Error;

/// Errors raised by pipeline stages.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// An expected table was not found in the input directory.
    #[error("table '{name}' not found; available tables: {available:?}")]
    MissingTable {
        name: String,
        available: Vec<String>,
    },

    /// A column required by a stage is absent from the frame.
    #[error("column '{column}' not found in {table}")]
    MissingColumn { column: String, table: String },

    /// A date value could not be parsed with the expected format.
    #[error("invalid date '{value}' in column '{column}' (expected YYYY-MM-DD)")]
    InvalidDate { column: String, value: String },

    /// Two tables that must share a schema do not.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A numerical column has no observed value to compute a mean from.
    #[error("column '{0}' has no observed values to impute from")]
    NoObservedValues(String),

    /// Split parameters cannot produce a partition.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// Two sequences that must be row-aligned have different lengths.
    #[error("length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The label column has rows without a value.
    #[error("label column '{column}' has {count} missing values")]
    MissingLabels { column: String, count: usize },

    /// The model failed to train or produced unusable predictions.
    #[error("model error: {0}")]
    Model(String),
}
