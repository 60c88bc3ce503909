//! Run summary report generation

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::FeatureImportance;

/// Importances listed under the summary table.
const TOP_IMPORTANCES: usize = 10;

/// Scores of one fitted model.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ModelScores {
    pub train_rows: usize,
    pub validation_rows: usize,
    pub validation_mae: f64,
    /// Only the evaluation model has a hold-out test set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_mae: Option<f64>,
}

/// Summary of one forecasting run
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub training_rows: usize,
    pub submission_rows: usize,
    pub initial_features: usize,
    pub final_features: usize,
    pub dropped_features: Vec<String>,
    pub suggested_drops: Vec<String>,
    pub imputed_training_cells: usize,
    pub imputed_submission_cells: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<ModelScores>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<ModelScores>,
    /// Evaluation model importances, in fitted column order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub feature_importances: Vec<FeatureImportance>,
    /// Step name and wall time in seconds.
    pub timings: Vec<(String, f64)>,
}

impl RunSummary {
    pub fn new(training_rows: usize, submission_rows: usize) -> Self {
        Self {
            training_rows,
            submission_rows,
            ..Default::default()
        }
    }

    pub fn set_features(&mut self, initial: usize, dropped: Vec<String>) {
        self.initial_features = initial;
        self.final_features = initial.saturating_sub(dropped.len());
        self.dropped_features = dropped;
    }

    pub fn record_time(&mut self, step: &str, elapsed: Duration) {
        self.timings.push((step.to_string(), elapsed.as_secs_f64()));
    }

    /// Importances from highest to lowest, ties by name.
    pub fn ranked_importances(&self) -> Vec<&FeatureImportance> {
        let mut ranked: Vec<&FeatureImportance> = self.feature_importances.iter().collect();
        ranked.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        ranked
    }

    pub fn total_time(&self) -> f64 {
        self.timings.iter().map(|(_, secs)| secs).sum()
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Training rows"), Cell::new(self.training_rows)]);
        table.add_row(vec![Cell::new("📨 Submission rows"), Cell::new(self.submission_rows)]);
        table.add_row(vec![
            Cell::new("🔗 Features (before → after pruning)"),
            Cell::new(format!("{} → {}", self.initial_features, self.final_features)),
        ]);
        table.add_row(vec![
            Cell::new("🩹 Imputed cells (train / submit)"),
            Cell::new(format!(
                "{} / {}",
                self.imputed_training_cells, self.imputed_submission_cells
            ))
            .fg(if self.imputed_training_cells + self.imputed_submission_cells > 0 {
                Color::Yellow
            } else {
                Color::White
            }),
        ]);

        if let Some(scores) = &self.evaluation {
            table.add_row(vec![
                Cell::new("🧪 Evaluation split (train/val/test)"),
                Cell::new(format!(
                    "{} / {} / {}",
                    scores.train_rows,
                    scores.validation_rows,
                    scores.test_rows.unwrap_or(0)
                )),
            ]);
            table.add_row(vec![
                Cell::new("📉 Evaluation validation MAE"),
                Cell::new(format!("{:.3}", scores.validation_mae)),
            ]);
            if let Some(mae) = scores.test_mae {
                table.add_row(vec![
                    Cell::new("🎯 Hold-out test MAE"),
                    Cell::new(format!("{:.3}", mae))
                        .fg(Color::Green)
                        .add_attribute(Attribute::Bold),
                ]);
            }
        }

        if let Some(scores) = &self.submission {
            table.add_row(vec![
                Cell::new("📦 Submission split (train/val)"),
                Cell::new(format!("{} / {}", scores.train_rows, scores.validation_rows)),
            ]);
            table.add_row(vec![
                Cell::new("📉 Submission validation MAE"),
                Cell::new(format!("{:.3}", scores.validation_mae))
                    .fg(Color::Green)
                    .add_attribute(Attribute::Bold),
            ]);
        }

        table.add_row(vec![
            Cell::new("⏱  Total time"),
            Cell::new(format!("{:.2}s", self.total_time())),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.feature_importances.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("Feature importance").cyan(),
                style("(evaluation model, share of gain)").dim()
            );
            let mut importance_table = Table::new();
            importance_table.load_preset(UTF8_FULL_CONDENSED);
            importance_table.set_header(vec![
                Cell::new("Feature").add_attribute(Attribute::Bold),
                Cell::new("Importance").add_attribute(Attribute::Bold),
            ]);
            for item in self.ranked_importances().into_iter().take(TOP_IMPORTANCES) {
                importance_table.add_row(vec![
                    Cell::new(&item.feature),
                    Cell::new(format!("{:.4}", item.importance)),
                ]);
            }
            for line in importance_table.to_string().lines() {
                println!("      {}", line);
            }
            if self.feature_importances.len() > TOP_IMPORTANCES {
                println!(
                    "      {}",
                    style(format!(
                        "... and {} more in the run report",
                        self.feature_importances.len() - TOP_IMPORTANCES
                    ))
                    .dim()
                );
            }
        }

        if !self.dropped_features.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("Pruned features").yellow(),
                style(format!("({})", self.dropped_features.len())).dim()
            );
            for feature in &self.dropped_features {
                println!("        {} {}", style("•").dim(), feature);
            }
        }
    }
}
