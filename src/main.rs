//! DengAI: weekly dengue case forecasting
//!
//! Loads the competition tables, engineers calendar features, prunes
//! collinear columns, imputes gaps, trains gradient-boosted trees and writes
//! the filled submission template.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use dengai::cli::Cli;
use dengai::pipeline::{
    align_predictions, analyze_missing_values, columns_with_missing, correlation_matrix,
    dataset_stats, derive_calendar_features, impute_tables, join_on_key, load_directory,
    prune_features, select_features_to_drop, stratified_split, take_rows, three_way_split,
    write_predictions, CompetitionTables, FeatureSchema, FittedModel, PerpetualRegressor,
    TableNames, DATE_COLUMN, DEFAULT_CATEGORICAL, KEY_COLUMNS, STRATIFY_COLUMN, TARGET_COLUMN,
};
use dengai::report::{
    export_correlation, export_run_report, ModelScores, RunSummary, CORRELATION_AFTER_FILE,
    CORRELATION_BEFORE_FILE,
};
use dengai::utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config,
    print_count, print_info, print_list, print_step_header, print_step_time, print_success,
    print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let training_config = cli.training_config();
    let split_config = cli.split_config();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&cli.data_dir, &cli.output, &training_config, &split_config);

    std::fs::create_dir_all(&cli.report_dir).with_context(|| {
        format!("Failed to create report directory: {}", cli.report_dir.display())
    })?;

    // Step 1: Load tables
    print_step_header(1, "Loading Tables");
    let step_start = Instant::now();
    println!();
    let mut catalog = load_directory(&cli.data_dir, cli.infer_schema_length)?;
    print_success(&format!("Read {} table(s) from {}", catalog.len(), cli.data_dir.display()));

    let tables = CompetitionTables::extract(&mut catalog, &TableNames::default())?;
    if !catalog.is_empty() {
        print_info(&format!("Ignoring {} other table(s)", catalog.len()));
    }
    for (name, df) in [
        ("Training features", &tables.training_features),
        ("Training labels", &tables.training_labels),
        ("Test features", &tables.test_features),
        ("Submission format", &tables.submission_format),
    ] {
        let (rows, cols, memory_mb) = dataset_stats(df);
        println!(
            "      {}: {} rows × {} columns ({:.2} MB)",
            name, rows, cols, memory_mb
        );
    }
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    let mut timings = vec![("load", elapsed)];

    // Step 2: Join features with labels and the submission template
    print_step_header(2, "Joining Tables");
    let step_start = Instant::now();
    let CompetitionTables {
        training_features,
        training_labels,
        test_features,
        submission_format,
    } = tables;
    let mut template = submission_format.clone();

    let training = join_on_key(training_features, training_labels, &KEY_COLUMNS)?;
    let submission = join_on_key(test_features, submission_format, &KEY_COLUMNS)?;
    print_success(&format!(
        "Joined on ({}): {} training rows, {} submission rows",
        KEY_COLUMNS.join(", "),
        training.height(),
        submission.height()
    ));
    let mut summary = RunSummary::new(training.height(), submission.height());
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    timings.push(("join", elapsed));

    // Step 3: Calendar features
    print_step_header(3, "Feature Engineering");
    let step_start = Instant::now();
    let training = derive_calendar_features(training, DATE_COLUMN)?;
    let submission = derive_calendar_features(submission, DATE_COLUMN)?;
    let schema = FeatureSchema::classify(&training, &DEFAULT_CATEGORICAL);
    print_success(&format!(
        "Derived quarter, month, day and month-day from {}",
        DATE_COLUMN
    ));
    print_count("categorical feature(s)", schema.categorical().len(), None);
    print_count("numerical feature(s)", schema.numerical().len(), None);
    let initial_features = schema.columns().len();
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    timings.push(("features", elapsed));

    // Step 4: Correlation diagnostics and pruning
    print_step_header(4, "Correlation Pruning");
    let step_start = Instant::now();
    let before = correlation_matrix(&training, &[TARGET_COLUMN])?;
    let pairs = before.correlated_pairs(cli.correlation_threshold);
    let path = export_correlation(
        &cli.report_dir,
        CORRELATION_BEFORE_FILE,
        "before_removal",
        cli.correlation_threshold,
        &before,
    )?;
    print_success(&format!("Correlation matrix saved to {}", path.display()));

    if pairs.is_empty() {
        print_info("No highly correlated feature pairs found");
    } else {
        print_count(
            "correlated pair(s)",
            pairs.len(),
            Some(&format!("(>{:.2})", cli.correlation_threshold)),
        );
        for pair in pairs.iter().take(5) {
            println!(
                "        {} {} ↔ {} ({:.3})",
                style("•").dim(),
                pair.feature1,
                pair.feature2,
                pair.correlation
            );
        }
    }
    summary.suggested_drops = select_features_to_drop(&pairs, &[TARGET_COLUMN]);
    if !summary.suggested_drops.is_empty() {
        print_info("Frequency heuristic would drop:");
        print_list(&summary.suggested_drops);
    }

    let (training, submission, outcome) = prune_features(training, submission, &cli.drop_features)?;
    if !outcome.absent.is_empty() {
        print_warning(&format!(
            "Not present in either table: {}",
            outcome.absent.join(", ")
        ));
    }
    print_count("feature(s) to prune", outcome.dropped.len(), None);
    print_list(&outcome.dropped);

    let after = correlation_matrix(&training, &[TARGET_COLUMN])?;
    export_correlation(
        &cli.report_dir,
        CORRELATION_AFTER_FILE,
        "after_removal",
        cli.correlation_threshold,
        &after,
    )?;
    summary.set_features(initial_features, outcome.dropped);
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    timings.push(("prune", elapsed));

    // Step 5: Missing values
    print_step_header(5, "Missing Value Imputation");
    let step_start = Instant::now();
    let spinner = create_spinner("Analyzing missing values...");
    let training_missing = columns_with_missing(&analyze_missing_values(&training)?);
    let submission_missing = columns_with_missing(&analyze_missing_values(&submission)?);
    finish_with_success(&spinner, "Missing value analysis complete");
    print_count("training column(s) with gaps", training_missing.len(), None);
    print_count("submission column(s) with gaps", submission_missing.len(), None);

    // Columns changed above, so classify again.
    let schema = FeatureSchema::classify(&training, &DEFAULT_CATEGORICAL);
    let strategy = cli.impute_strategy();
    let ((training, training_report), (submission, submission_report)) =
        impute_tables(training, submission, schema.numerical(), strategy)?;
    summary.imputed_training_cells = training_report.total_filled();
    summary.imputed_submission_cells = submission_report.total_filled();
    print_success(&format!(
        "Filled {} training and {} submission cells ({:?} means)",
        summary.imputed_training_cells, summary.imputed_submission_cells, strategy
    ));
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    timings.push(("impute", elapsed));

    // Step 6: Hold-out evaluation
    print_step_header(6, "Hold-out Evaluation");
    let step_start = Instant::now();
    if cli.skip_evaluation {
        print_info("Skipped (--skip-evaluation)");
    } else {
        let split = three_way_split(&training, STRATIFY_COLUMN, &split_config)?;
        let train = take_rows(&training, &split.train)?;
        let validation = take_rows(&training, &split.validation)?;
        let test = take_rows(&training, &split.test)?;
        print_info(&format!(
            "Split {} / {} / {} rows (train / validation / test)",
            train.height(),
            validation.height(),
            test.height()
        ));

        let spinner = create_spinner("Training evaluation model...");
        let model = FittedModel::train(
            PerpetualRegressor::new(training_config),
            &train,
            &validation,
            schema.categorical(),
            TARGET_COLUMN,
        )?;
        let test_mae = model.score(&test)?;
        finish_with_success(&spinner, "Evaluation model trained");
        println!(
            "      Validation MAE: {}   Test MAE: {}",
            style(format!("{:.3}", model.validation_mae)).yellow(),
            style(format!("{:.3}", test_mae)).green().bold()
        );

        summary.feature_importances = model.feature_importances()?;
        if let Some(top) = summary.ranked_importances().first() {
            print_info(&format!(
                "Most important feature: {} ({:.3})",
                top.feature, top.importance
            ));
        }

        summary.evaluation = Some(ModelScores {
            train_rows: model.train_rows,
            validation_rows: model.validation_rows,
            validation_mae: model.validation_mae,
            test_rows: Some(test.height()),
            test_mae: Some(test_mae),
        });
    }
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    timings.push(("evaluate", elapsed));

    // Step 7: Submission model
    print_step_header(7, "Submission Model");
    let step_start = Instant::now();
    let split = stratified_split(
        &training,
        STRATIFY_COLUMN,
        split_config.test_fraction,
        split_config.seed,
    )?;
    let train = take_rows(&training, &split.train)?;
    let validation = take_rows(&training, &split.test)?;

    let spinner = create_spinner("Training submission model...");
    let model = FittedModel::train(
        PerpetualRegressor::new(training_config),
        &train,
        &validation,
        schema.categorical(),
        TARGET_COLUMN,
    )?;
    finish_with_success(&spinner, "Submission model trained");
    println!(
        "      Validation MAE: {}",
        style(format!("{:.3}", model.validation_mae)).green().bold()
    );
    summary.submission = Some(ModelScores {
        train_rows: model.train_rows,
        validation_rows: model.validation_rows,
        validation_mae: model.validation_mae,
        test_rows: None,
        test_mae: None,
    });

    let predictions = model.predict(&submission)?;
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    timings.push(("train", elapsed));

    // Step 8: Write predictions
    print_step_header(8, "Writing Predictions");
    let step_start = Instant::now();
    let aligned = align_predictions(&template, &submission, &predictions, &KEY_COLUMNS)?;
    write_predictions(&mut template, &aligned, TARGET_COLUMN, &cli.output)?;
    print_success(&format!(
        "Wrote {} predictions to {}",
        aligned.len(),
        cli.output.display()
    ));
    let elapsed = step_start.elapsed();
    print_step_time(elapsed);
    timings.push(("write", elapsed));

    for (step, elapsed) in timings {
        summary.record_time(step, elapsed);
    }
    summary.display();

    let report_path = export_run_report(&cli.report_dir, &summary, &cli.data_dir, &cli.output)?;
    print_info(&format!("Run report saved to {}", report_path.display()));

    print_completion();

    Ok(())
}
