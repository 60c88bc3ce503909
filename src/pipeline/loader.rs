//! Dataset loading: single CSV/Parquet files and whole input directories

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::error::PipelineError;
use crate::utils::create_progress_bar;

/// File stems of the four tables the competition ships.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub training_features: String,
    pub training_labels: String,
    pub test_features: String,
    pub submission_format: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            training_features: "DengAI_Predicting_Disease_Spread_-_Training_Data_Features".into(),
            training_labels: "DengAI_Predicting_Disease_Spread_-_Training_Data_Labels".into(),
            test_features: "DengAI_Predicting_Disease_Spread_-_Test_Data_Features".into(),
            submission_format: "DengAI_Predicting_Disease_Spread_-_Submission_Format".into(),
        }
    }
}

/// Tables read from an input directory, keyed by normalized file name.
#[derive(Debug, Default)]
pub struct DatasetCatalog {
    tables: BTreeMap<String, DataFrame>,
}

impl DatasetCatalog {
    pub fn insert(&mut self, name: impl Into<String>, df: DataFrame) {
        self.tables.insert(name.into(), df);
    }

    pub fn get(&self, name: &str) -> Option<&DataFrame> {
        self.tables.get(name)
    }

    /// Names of the tables still held, sorted.
    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Remove a table from the catalog and hand it to the caller.
    pub fn take(&mut self, name: &str) -> Result<DataFrame, PipelineError> {
        self.tables
            .remove(name)
            .ok_or_else(|| PipelineError::MissingTable {
                name: name.to_string(),
                available: self.names(),
            })
    }
}

/// The four competition tables, pulled out of a catalog.
#[derive(Debug)]
pub struct CompetitionTables {
    pub training_features: DataFrame,
    pub training_labels: DataFrame,
    pub test_features: DataFrame,
    pub submission_format: DataFrame,
}

impl CompetitionTables {
    /// Extract (and remove) the four named tables. Tables left behind stay in
    /// the catalog untouched.
    pub fn extract(catalog: &mut DatasetCatalog, names: &TableNames) -> Result<Self> {
        Ok(Self {
            training_features: catalog.take(&names.training_features)?,
            training_labels: catalog.take(&names.training_labels)?,
            test_features: catalog.take(&names.test_features)?,
            submission_format: catalog.take(&names.submission_format)?,
        })
    }
}

/// Whether a path has an extension the loader can read.
pub fn is_tabular(path: &Path) -> bool {
    matches!(extension_of(path).as_str(), "csv" | "parquet")
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a dataset from a file (CSV or Parquet based on extension)
///
/// `infer_schema_length` only applies to CSV; 0 scans the whole file.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = extension_of(path);

    let lf = match extension.as_str() {
        "csv" => {
            let schema_length = if infer_schema_length == 0 {
                None
            } else {
                Some(infer_schema_length)
            };
            LazyCsvReader::new(path)
                .with_infer_schema_length(schema_length)
                .finish()
                .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        }
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    lf.collect()
        .with_context(|| format!("Failed to read {}", path.display()))
}

/// Read every tabular file in `dir` into a catalog keyed by file stem.
///
/// Files with other extensions are skipped. Two files sharing a stem (say
/// `x.csv` and `x.parquet`) is an error since the key would be ambiguous.
pub fn load_directory(dir: &Path, infer_schema_length: usize) -> Result<DatasetCatalog> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_tabular(p))
        .collect();
    paths.sort();

    let pb = create_progress_bar(paths.len() as u64, "   Loading tables");
    let mut catalog = DatasetCatalog::default();

    for path in &paths {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow::anyhow!("Non UTF-8 file name: {}", path.display()))?
            .to_string();

        if catalog.get(&stem).is_some() {
            anyhow::bail!(
                "Two tables normalize to the same name '{}' in {}",
                stem,
                dir.display()
            );
        }

        let df = load_dataset(path, infer_schema_length)?;
        catalog.insert(stem, df);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(catalog)
}

/// Shape and estimated memory of a loaded table: `(rows, cols, memory_mb)`.
pub fn dataset_stats(df: &DataFrame) -> (usize, usize, f64) {
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    (rows, cols, memory_mb)
}
