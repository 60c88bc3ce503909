//! Joining feature tables with label and submission tables

use anyhow::{Context, Result};
use polars::prelude::*;

use super::error::PipelineError;

/// Composite key identifying one location-week.
pub const KEY_COLUMNS: [&str; 3] = ["city", "year", "weekofyear"];

/// Left join `right` onto `left` on `keys`.
///
/// Left row order is kept. Rows without a match keep nulls in the columns
/// coming from `right`. Key columns appear once in the output.
pub fn join_on_key(left: DataFrame, right: DataFrame, keys: &[&str]) -> Result<DataFrame> {
    for (df, table) in [(&left, "left table"), (&right, "right table")] {
        for key in keys {
            if df.column(key).is_err() {
                return Err(PipelineError::MissingColumn {
                    column: key.to_string(),
                    table: table.to_string(),
                }
                .into());
            }
        }
    }

    let on: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();

    left.lazy()
        .join_builder()
        .with(right.lazy())
        .on(on)
        .how(JoinType::Left)
        .maintain_order(MaintainOrderJoin::Left)
        .finish()
        .collect()
        .with_context(|| format!("Failed to join on {:?}", keys))
}
