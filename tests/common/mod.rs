//! Shared test utilities and fixture generators

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use dengai::pipeline::{DesignMatrix, Regressor, TableNames};

/// Small feature table in the competition layout.
///
/// Two cities, four weeks each. `ndvi_ne` has one gap, and
/// `reanalysis_sat_precip_amt_mm` duplicates `precipitation_amt_mm`.
pub fn create_feature_dataframe() -> DataFrame {
    df! {
        "city" => ["sj", "sj", "sj", "sj", "iq", "iq", "iq", "iq"],
        "year" => [1990i64, 1990, 1990, 1990, 2000, 2000, 2000, 2000],
        "weekofyear" => [18i64, 19, 20, 21, 26, 27, 28, 29],
        "week_start_date" => [
            "1990-04-30", "1990-05-07", "1990-05-14", "1990-05-21",
            "2000-07-01", "2000-07-08", "2000-07-15", "2000-07-22",
        ],
        "ndvi_ne" => [Some(0.12f64), Some(0.17), None, Some(0.13), Some(0.19), Some(0.22), Some(0.18), Some(0.20)],
        "precipitation_amt_mm" => [12.42f64, 22.82, 34.54, 15.36, 25.41, 60.61, 55.52, 5.60],
        "reanalysis_sat_precip_amt_mm" => [12.42f64, 22.82, 34.54, 15.36, 25.41, 60.61, 55.52, 5.60],
        "reanalysis_air_temp_k" => [297.57f64, 298.21, 298.78, 298.99, 296.74, 296.63, 296.42, 297.13],
    }.unwrap()
}

/// Labels matching [`create_feature_dataframe`], in a different row order.
pub fn create_label_dataframe() -> DataFrame {
    df! {
        "city" => ["iq", "iq", "iq", "iq", "sj", "sj", "sj", "sj"],
        "year" => [2000i64, 2000, 2000, 2000, 1990, 1990, 1990, 1990],
        "weekofyear" => [26i64, 27, 28, 29, 18, 19, 20, 21],
        "total_cases" => [0i64, 0, 0, 1, 4, 5, 4, 3],
    }.unwrap()
}

/// Synthetic competition features: `weeks` rows per city, keys unique.
///
/// Columns mimic the real feature set, including the collinear pairs the
/// default pruning list targets, with a few gaps.
pub fn create_competition_features(cities: &[(&str, usize)]) -> DataFrame {
    let start = NaiveDate::from_ymd_opt(1990, 4, 30).unwrap();

    let mut city = Vec::new();
    let mut year = Vec::new();
    let mut weekofyear = Vec::new();
    let mut week_start_date = Vec::new();
    let mut ndvi_ne = Vec::new();
    let mut precipitation = Vec::new();
    let mut sat_precip = Vec::new();
    let mut air_temp = Vec::new();
    let mut avg_temp = Vec::new();
    let mut tdtr = Vec::new();
    let mut humidity = Vec::new();
    let mut station_max = Vec::new();

    for (c, &(name, weeks)) in cities.iter().enumerate() {
        for i in 0..weeks {
            let date = start + Duration::weeks(i as i64);
            let offset = c as f64;
            city.push(name.to_string());
            year.push(1990 + (i / 52) as i64);
            weekofyear.push((i % 52) as i64 + 1);
            week_start_date.push(date.format("%Y-%m-%d").to_string());
            ndvi_ne.push(if i % 7 == 3 {
                None
            } else {
                Some(0.1 + 0.01 * (i % 10) as f64 + offset * 0.05)
            });
            let precip = ((i * 13) % 40) as f64;
            precipitation.push(precip);
            sat_precip.push(precip);
            let air = 297.0 + (i % 12) as f64 * 0.25 - offset;
            air_temp.push(air);
            avg_temp.push(air + 0.3);
            tdtr.push(2.0 + (i % 5) as f64 + offset * 6.0);
            humidity.push(if i % 11 == 5 {
                None
            } else {
                Some(15.0 + (i % 9) as f64 * 0.5)
            });
            station_max.push(30.0 + (i % 6) as f64);
        }
    }

    df! {
        "city" => city,
        "year" => year,
        "weekofyear" => weekofyear,
        "week_start_date" => week_start_date,
        "ndvi_ne" => ndvi_ne,
        "precipitation_amt_mm" => precipitation,
        "reanalysis_air_temp_k" => air_temp,
        "reanalysis_avg_temp_k" => avg_temp,
        "reanalysis_sat_precip_amt_mm" => sat_precip,
        "reanalysis_specific_humidity_g_per_kg" => humidity,
        "reanalysis_tdtr_k" => tdtr,
        "station_max_temp_c" => station_max,
    }
    .unwrap()
}

/// Key columns of `features` plus a `total_cases` column.
///
/// With `cases == None` the column is all zeros, as in the submission
/// template.
pub fn create_case_table(features: &DataFrame, cases: Option<fn(usize) -> i64>) -> DataFrame {
    let mut table = features.select(["city", "year", "weekofyear"]).unwrap();
    let total: Vec<i64> = (0..features.height())
        .map(|i| cases.map_or(0, |f| f(i)))
        .collect();
    table
        .with_column(Column::new("total_cases".into(), total))
        .unwrap();
    table
}

/// Case counts that follow the weather columns closely enough to learn.
pub fn synthetic_cases(i: usize) -> i64 {
    ((i * 7) % 30) as i64 + (i % 12) as i64
}

/// Write `df` to `dir/name` as CSV.
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// A temp directory holding the four competition tables as CSV.
pub fn create_competition_dir(train_weeks: usize, test_weeks: usize) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let names = TableNames::default();

    let mut train = create_competition_features(&[("sj", train_weeks), ("iq", train_weeks)]);
    let mut labels = create_case_table(&train, Some(synthetic_cases));
    let mut test = create_competition_features(&[("sj", test_weeks), ("iq", test_weeks)]);
    let mut template = create_case_table(&test, None);

    write_csv(temp_dir.path(), &format!("{}.csv", names.training_features), &mut train);
    write_csv(temp_dir.path(), &format!("{}.csv", names.training_labels), &mut labels);
    write_csv(temp_dir.path(), &format!("{}.csv", names.test_features), &mut test);
    write_csv(temp_dir.path(), &format!("{}.csv", names.submission_format), &mut template);

    temp_dir
}

/// Predicts the training mean for every row.
#[derive(Debug, Default)]
pub struct MeanRegressor {
    pub mean: Option<f64>,
    pub fitted_columns: Vec<String>,
    pub validation_rows: usize,
}

impl Regressor for MeanRegressor {
    fn fit(
        &mut self,
        train: &DesignMatrix,
        train_labels: &[f64],
        validation: &DesignMatrix,
        _validation_labels: &[f64],
    ) -> anyhow::Result<()> {
        anyhow::ensure!(!train_labels.is_empty(), "no training rows");
        self.mean = Some(train_labels.iter().sum::<f64>() / train_labels.len() as f64);
        self.fitted_columns = train.columns().to_vec();
        self.validation_rows = validation.rows();
        Ok(())
    }

    fn predict(&self, features: &DesignMatrix) -> anyhow::Result<Vec<f64>> {
        let mean = self.mean.ok_or_else(|| anyhow::anyhow!("not fitted"))?;
        Ok(vec![mean; features.rows()])
    }
}
