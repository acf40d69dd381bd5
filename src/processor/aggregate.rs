//! Monthly roll-up of accepted hourly records.

use crate::constants::columns::{DAY_TOTAL, KEY, MONTH};
use crate::error::Result;
use crate::schema::require_columns;
use polars::prelude::*;
use tracing::debug;

/// Sum `daytot` per (key, month)
///
/// Only groups present in the input produce a row. Output is sorted by key
/// and month so it does not depend on input order.
pub fn aggregate_monthly(hourly: &DataFrame) -> Result<DataFrame> {
    require_columns(hourly, "accepted hourly records", &[KEY, MONTH, DAY_TOTAL])?;

    let monthly = hourly
        .clone()
        .lazy()
        .group_by([col(KEY), col(MONTH)])
        .agg([col(DAY_TOTAL).cast(DataType::Float64).sum()])
        .sort_by_exprs([col(KEY), col(MONTH)], SortMultipleOptions::default())
        .collect()?;

    debug!(
        "Aggregated {} hourly rows into {} entity-months",
        hourly.height(),
        monthly.height()
    );
    Ok(monthly)
}
