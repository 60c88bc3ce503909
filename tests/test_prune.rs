//! Tests for dropping collinear features from both tables

use dengai::pipeline::{
    derive_calendar_features, ensure_same_columns, prune_features, PipelineError, DATE_COLUMN,
    DEFAULT_DROP_FEATURES,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_default_list_leaves_identical_schemas() {
    let training =
        derive_calendar_features(common::create_competition_features(&[("sj", 12), ("iq", 12)]), DATE_COLUMN)
            .unwrap();
    let held_out =
        derive_calendar_features(common::create_competition_features(&[("sj", 5), ("iq", 5)]), DATE_COLUMN)
            .unwrap();

    let (training, held_out, outcome) =
        prune_features(training, held_out, &names(&DEFAULT_DROP_FEATURES)).unwrap();

    assert_eq!(outcome.dropped.len(), DEFAULT_DROP_FEATURES.len());
    assert!(outcome.absent.is_empty());
    for name in DEFAULT_DROP_FEATURES {
        assert!(training.column(name).is_err(), "{} should be gone", name);
        assert!(held_out.column(name).is_err(), "{} should be gone", name);
    }
    assert_eq!(training.get_column_names(), held_out.get_column_names());
}

#[test]
fn test_absent_names_are_reported_not_fatal() {
    let training = common::create_feature_dataframe();
    let held_out = common::create_feature_dataframe();

    let (training, _, outcome) = prune_features(
        training,
        held_out,
        &names(&["ndvi_ne", "not_a_feature"]),
    )
    .unwrap();

    assert_eq!(outcome.dropped, vec!["ndvi_ne".to_string()]);
    assert_eq!(outcome.absent, vec!["not_a_feature".to_string()]);
    assert_eq!(training.width(), 7);
}

#[test]
fn test_schema_mismatch_after_pruning() {
    let training = common::create_feature_dataframe();
    let held_out = common::create_feature_dataframe().drop("reanalysis_air_temp_k").unwrap();

    let err = prune_features(training, held_out, &names(&["ndvi_ne"])).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::SchemaMismatch(msg)) if msg.contains("reanalysis_air_temp_k")
    ));
}

#[test]
fn test_dropping_the_differing_column_reconciles_schemas() {
    let training = common::create_feature_dataframe();
    let held_out = common::create_feature_dataframe().drop("ndvi_ne").unwrap();

    let (training, held_out, outcome) =
        prune_features(training, held_out, &names(&["ndvi_ne"])).unwrap();

    assert_eq!(outcome.dropped, vec!["ndvi_ne".to_string()]);
    assert!(ensure_same_columns(&training, &held_out).is_ok());
}

#[test]
fn test_ensure_same_columns_ignores_order() {
    let a = df! { "x" => [1i64], "y" => [2i64] }.unwrap();
    let b = df! { "y" => [2i64], "x" => [1i64] }.unwrap();

    assert!(ensure_same_columns(&a, &b).is_ok());
}
