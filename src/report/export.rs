//! JSON artifacts: correlation matrices and the run report

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use super::RunSummary;
use crate::pipeline::{CorrelatedPair, CorrelationMatrix};

pub const CORRELATION_BEFORE_FILE: &str = "correlation_before_removal.json";
pub const CORRELATION_AFTER_FILE: &str = "correlation_after_removal.json";
pub const RUN_REPORT_FILE: &str = "run_report.json";

/// A correlation matrix with the pairs that crossed the threshold.
#[derive(Serialize)]
pub struct CorrelationExport<'a> {
    pub timestamp: String,
    pub stage: &'a str,
    pub threshold: f64,
    pub matrix: &'a CorrelationMatrix,
    pub correlated_pairs: &'a [CorrelatedPair],
}

#[derive(Serialize)]
struct RunReport<'a> {
    timestamp: String,
    version: &'static str,
    data_dir: String,
    output_file: String,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report file: {}", path.display()))
}

/// Write one correlation matrix to `dir/file_name`.
pub fn export_correlation(
    dir: &Path,
    file_name: &str,
    stage: &str,
    threshold: f64,
    matrix: &CorrelationMatrix,
) -> Result<PathBuf> {
    let pairs = matrix.correlated_pairs(threshold);
    let export = CorrelationExport {
        timestamp: Utc::now().to_rfc3339(),
        stage,
        threshold,
        matrix,
        correlated_pairs: &pairs,
    };

    let path = dir.join(file_name);
    write_json(&export, &path)?;
    Ok(path)
}

/// Write the run summary as `dir/run_report.json`.
pub fn export_run_report(
    dir: &Path,
    summary: &RunSummary,
    data_dir: &Path,
    output_file: &Path,
) -> Result<PathBuf> {
    let report = RunReport {
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
        data_dir: data_dir.display().to_string(),
        output_file: output_file.display().to_string(),
        summary,
    };

    let path = dir.join(RUN_REPORT_FILE);
    write_json(&report, &path)?;
    Ok(path)
}
