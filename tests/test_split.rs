//! Tests for stratified splitting

use std::collections::{HashMap, HashSet};

use dengai::pipeline::{
    stratified_indices, stratified_split, take_rows, three_way_split, PipelineError, SplitConfig,
    STRATIFY_COLUMN,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn city_counts(df: &DataFrame) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for city in df.column("city").unwrap().str().unwrap().into_no_null_iter() {
        *counts.entry(city.to_string()).or_insert(0) += 1;
    }
    counts
}

#[test]
fn test_split_is_a_partition() {
    let df = common::create_competition_features(&[("sj", 70), ("iq", 30)]);

    let split = stratified_split(&df, STRATIFY_COLUMN, 0.2, 123).unwrap();

    assert_eq!(split.train.len() + split.test.len(), df.height());
    let train: HashSet<usize> = split.train.iter().copied().collect();
    let test: HashSet<usize> = split.test.iter().copied().collect();
    assert!(train.is_disjoint(&test));
    assert_eq!(train.len() + test.len(), df.height(), "No row appears twice");
}

#[test]
fn test_split_keeps_location_proportions() {
    let df = common::create_competition_features(&[("sj", 70), ("iq", 30)]);

    let split = stratified_split(&df, STRATIFY_COLUMN, 0.2, 123).unwrap();
    let test = take_rows(&df, &split.test).unwrap();
    let counts = city_counts(&test);

    assert_eq!(test.height(), 20);
    assert_eq!(counts["sj"], 14);
    assert_eq!(counts["iq"], 6);
}

#[test]
fn test_same_seed_same_partition() {
    let df = common::create_competition_features(&[("sj", 40), ("iq", 25)]);

    let a = stratified_split(&df, STRATIFY_COLUMN, 0.2, 123).unwrap();
    let b = stratified_split(&df, STRATIFY_COLUMN, 0.2, 123).unwrap();
    let c = stratified_split(&df, STRATIFY_COLUMN, 0.2, 7).unwrap();

    assert_eq!(a, b);
    assert_ne!(a.test, c.test, "A different seed should draw different rows");
}

#[test]
fn test_indices_are_in_row_order() {
    let df = common::create_competition_features(&[("sj", 20), ("iq", 20)]);
    let split = stratified_split(&df, STRATIFY_COLUMN, 0.3, 123).unwrap();

    assert!(split.train.windows(2).all(|w| w[0] < w[1]));
    assert!(split.test.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_minimal_groups_half_split() {
    let labels = ["A", "B", "A"];

    let split = stratified_indices(&labels, 0.5, 123).unwrap();

    assert_eq!(split.test.len(), 2);
    assert_eq!(split.train.len(), 1);

    let a_rows = [0usize, 2];
    let placed_a = split.test.iter().chain(&split.train).filter(|i| a_rows.contains(i)).count();
    assert_eq!(placed_a, 2);

    let b_in_test = split.test.contains(&1);
    let b_in_train = split.train.contains(&1);
    assert!(b_in_test ^ b_in_train, "B lands in exactly one subset");
    assert!(b_in_test, "B has the larger fractional share of the leftover slot");
}

#[test]
fn test_single_row_group_does_not_crash() {
    let labels = ["sj", "sj", "sj", "sj", "iq"];

    let split = stratified_indices(&labels, 0.2, 123).unwrap();

    assert_eq!(split.test.len(), 1);
    assert_eq!(split.train.len(), 4);
}

#[test]
fn test_invalid_fraction() {
    let labels = ["A", "B"];

    for fraction in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
        let err = stratified_indices(&labels, fraction, 123).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidSplit(_)), "fraction {}", fraction);
    }
}

#[test]
fn test_empty_table() {
    let labels: [&str; 0] = [];
    assert!(matches!(
        stratified_indices(&labels, 0.2, 123),
        Err(PipelineError::InvalidSplit(_))
    ));
}

#[test]
fn test_missing_stratify_column() {
    let df = common::create_label_dataframe().drop("city").unwrap();
    let err = stratified_split(&df, STRATIFY_COLUMN, 0.2, 123).unwrap_err();

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingColumn { .. })
    ));
}

#[test]
fn test_three_way_split_sizes() {
    let df = common::create_competition_features(&[("sj", 60), ("iq", 40)]);

    let split = three_way_split(&df, STRATIFY_COLUMN, &SplitConfig::default()).unwrap();

    assert_eq!(split.test.len(), 20);
    assert_eq!(split.validation.len(), 20);
    assert_eq!(split.train.len(), 60);

    let mut all: Vec<usize> = split
        .train
        .iter()
        .chain(&split.validation)
        .chain(&split.test)
        .copied()
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..df.height()).collect::<Vec<_>>(), "Union is the whole table");

    let validation = take_rows(&df, &split.validation).unwrap();
    let counts = city_counts(&validation);
    assert_eq!(counts["sj"], 12);
    assert_eq!(counts["iq"], 8);
}

#[test]
fn test_three_way_split_is_reproducible() {
    let df = common::create_competition_features(&[("sj", 33), ("iq", 17)]);
    let config = SplitConfig::default();

    let a = three_way_split(&df, STRATIFY_COLUMN, &config).unwrap();
    let b = three_way_split(&df, STRATIFY_COLUMN, &config).unwrap();

    assert_eq!(a, b);
}

#[test]
fn test_take_rows_keeps_given_order() {
    let df = common::create_label_dataframe();
    let rows = take_rows(&df, &[5, 0]).unwrap();

    let weeks: Vec<i64> = rows.column("weekofyear").unwrap().i64().unwrap().into_no_null_iter().collect();
    assert_eq!(weeks, vec![19, 26]);
}
