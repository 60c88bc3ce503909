//! Command-line argument definitions using clap

use std::path::PathBuf;

use clap::Parser;

use crate::pipeline::{
    ImputeStrategy, Loss, SplitConfig, TrainingConfig, DEFAULT_DROP_FEATURES,
};

/// DengAI - forecast weekly dengue cases from weather features with gradient boosting
#[derive(Parser, Debug)]
#[command(name = "dengai")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the competition tables (CSV or Parquet)
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Output file for the filled submission template
    #[arg(short, long, default_value = "prediction.csv")]
    pub output: PathBuf,

    /// Directory for the JSON correlation matrices and run report
    #[arg(long, default_value = ".")]
    pub report_dir: PathBuf,

    /// Upper bound on boosting rounds
    #[arg(long, default_value = "4000")]
    pub iterations: usize,

    /// Learning rate (0.0 to 1.0, exclusive of 0)
    #[arg(long, default_value = "0.3", value_parser = validate_learning_rate)]
    pub learning_rate: f64,

    /// Loss optimized by the booster: "mae" (default) or "squared"
    #[arg(long, default_value = "mae", value_parser = parse_loss)]
    pub loss: Loss,

    /// Seed for the stratified splits
    #[arg(long, default_value = "123")]
    pub seed: u64,

    /// Share of rows held out as the test set (and as validation for the submission model)
    #[arg(long, default_value = "0.2", value_parser = validate_fraction)]
    pub test_size: f64,

    /// Share of the remaining rows used for validation in the evaluation split
    #[arg(long, default_value = "0.25", value_parser = validate_fraction)]
    pub validation_size: f64,

    /// Features dropped as collinear (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = DEFAULT_DROP_FEATURES.map(String::from)
    )]
    pub drop_features: Vec<String>,

    /// Absolute correlation above which pairs are reported (diagnostics only)
    #[arg(long, default_value = "0.9", value_parser = validate_fraction)]
    pub correlation_threshold: f64,

    /// Fill the submission table with training means instead of its own means
    #[arg(long, default_value = "false")]
    pub impute_from_training: bool,

    /// Skip the hold-out evaluation model and train only the submission model
    #[arg(long, default_value = "false")]
    pub skip_evaluation: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

impl Cli {
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig {
            iterations: self.iterations,
            learning_rate: self.learning_rate,
            loss: self.loss,
        }
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            test_fraction: self.test_size,
            validation_fraction: self.validation_size,
            seed: self.seed,
        }
    }

    pub fn impute_strategy(&self) -> ImputeStrategy {
        if self.impute_from_training {
            ImputeStrategy::TrainingStatistics
        } else {
            ImputeStrategy::PerTable
        }
    }
}

fn parse_loss(s: &str) -> Result<Loss, String> {
    s.parse()
}

/// Validator for learning_rate parameter
fn validate_learning_rate(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(format!("learning_rate must be in (0.0, 1.0], got {}", value))
    }
}

/// Validator for fractions that must leave something on both sides
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("value must be strictly between 0.0 and 1.0, got {}", value))
    }
}
