//! DengAI: weekly dengue case forecasting
//!
//! A library for turning the DengAI competition tables into a submission:
//! joining, calendar features, collinearity pruning, mean imputation,
//! stratified splitting and gradient-boosted regression.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod utils;
