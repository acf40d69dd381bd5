//! Hourly record ingest
//!
//! Reads the long-form monthly CEM files (one row per unit, pollutant, day
//! and hour), writes the legacy fixed layout, pivots hours into columns and
//! loads the monthly inventory in either of its two layouts.

use crate::constants::columns::{
    DATE, DAY_TOTAL, HOUR, HOURLY_ID_COLUMNS, LONG_FORM_COLUMNS, MONTH, MONTH_TOTAL,
    ORIS_BOILER_ID, ORIS_FACILITY_CODE, POLLUTANT, VALUE, hour_column,
};
use crate::constants::{HOURS_PER_DAY, MONTH_NAMES, month_number};
use crate::error::{CemError, Result};
use crate::schema::{column_names, has_columns, read_text_table, require_columns};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Layout of the `date` field in every input
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Text values of a column, trimmed, nulls kept
fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .as_materialized_series()
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()))
        .collect())
}

/// Read one month of long-form hourly readings
///
/// `hour` must be an integer 0-23 and `value` numeric or empty; anything else
/// is a [`CemError::MalformedRecord`] and fails the month.
pub fn read_month(path: &Path) -> Result<DataFrame> {
    let source = path.display().to_string();
    let raw = read_text_table(path)?;
    require_columns(&raw, &source, LONG_FORM_COLUMNS)?;

    let typed = raw
        .lazy()
        .with_columns([
            col(HOUR).strict_cast(DataType::Int32),
            col(VALUE).strict_cast(DataType::Float64),
        ])
        .collect()
        .map_err(|e| CemError::malformed(&source, e.to_string()))?;

    let hours = typed.column(HOUR)?.as_materialized_series().i32()?;
    for (row, hour) in hours.into_iter().enumerate() {
        match hour {
            Some(h) if (0..HOURS_PER_DAY as i32).contains(&h) => {}
            Some(h) => {
                return Err(CemError::malformed(
                    &source,
                    format!("row {} has hour {} outside 0-23", row, h),
                ));
            }
            None => {
                return Err(CemError::malformed(
                    &source,
                    format!("row {} has no hour", row),
                ));
            }
        }
    }

    debug!("Read {} hourly readings from {}", typed.height(), source);
    Ok(typed)
}

/// Collapse 24 hour-rows per unit-day into `hrval0`..`hrval23` plus `daytot`
///
/// Hours with no reading are 0. Output is sorted by the identifying columns
/// and date.
pub fn pivot_to_wide(long: &DataFrame) -> Result<DataFrame> {
    require_columns(long, "long-form hourly records", LONG_FORM_COLUMNS)?;

    let group: Vec<Expr> = HOURLY_ID_COLUMNS
        .iter()
        .chain(std::iter::once(&DATE))
        .map(|c| col(*c))
        .collect();

    let mut aggs: Vec<Expr> = (0..HOURS_PER_DAY)
        .map(|hour| {
            col(VALUE)
                .filter(col(HOUR).eq(lit(hour as i32)))
                .sum()
                .alias(hour_column(hour))
        })
        .collect();
    aggs.push(col(VALUE).sum().alias(DAY_TOTAL));

    let wide = long
        .clone()
        .lazy()
        .group_by(group.clone())
        .agg(aggs)
        .sort_by_exprs(group, SortMultipleOptions::default())
        .collect()?;

    debug!(
        "Pivoted {} hourly readings into {} unit-days",
        long.height(),
        wide.height()
    );
    Ok(wide)
}

/// Write long-form readings in the legacy fixed-width layout
///
/// Each line: ORIS code (6, right), boiler id (6, left), YYMMDD, hour (2),
/// pollutant (5, left), value (14, 3 decimals). Returns lines written.
pub fn write_legacy(path: &Path, long: &DataFrame) -> Result<usize> {
    require_columns(long, "long-form hourly records", LONG_FORM_COLUMNS)?;
    let source = path.display().to_string();

    let sorted = long
        .clone()
        .lazy()
        .sort_by_exprs(
            [
                col(ORIS_FACILITY_CODE),
                col(ORIS_BOILER_ID),
                col(DATE),
                col(HOUR),
                col(POLLUTANT),
            ],
            SortMultipleOptions::default(),
        )
        .collect()?;

    let oris = text_column(&sorted, ORIS_FACILITY_CODE)?;
    let boilers = text_column(&sorted, ORIS_BOILER_ID)?;
    let dates = text_column(&sorted, DATE)?;
    let polls = text_column(&sorted, POLLUTANT)?;
    let hours = sorted.column(HOUR)?.cast(&DataType::Int32)?;
    let hours = hours.as_materialized_series().i32()?;
    let values = sorted.column(VALUE)?.cast(&DataType::Float64)?;
    let values = values.as_materialized_series().f64()?;

    let mut writer = BufWriter::new(File::create(path)?);
    for row in 0..sorted.height() {
        let date = dates[row].as_deref().unwrap_or_default();
        let yymmdd = date
            .get(2..8)
            .filter(|_| date.len() == 8)
            .ok_or_else(|| CemError::malformed(&source, format!("row {} has date '{}'", row, date)))?;

        writeln!(
            writer,
            "{:>6}{:<6}{}{:02}{:<5}{:>14.3}",
            oris[row].as_deref().unwrap_or_default(),
            boilers[row].as_deref().unwrap_or_default(),
            yymmdd,
            hours.get(row).unwrap_or_default(),
            polls[row].as_deref().unwrap_or_default(),
            values.get(row).unwrap_or_default(),
        )?;
    }
    writer.flush()?;

    debug!("Wrote {} legacy lines to {}", sorted.height(), source);
    Ok(sorted.height())
}

/// Add a `month` column ("1".."12") parsed from each row's `date`
pub fn derive_month(hourly: &DataFrame) -> Result<DataFrame> {
    require_columns(hourly, "hourly records", &[DATE])?;

    let mut months = Vec::with_capacity(hourly.height());
    for (row, date) in text_column(hourly, DATE)?.iter().enumerate() {
        let date = date
            .as_deref()
            .ok_or_else(|| CemError::malformed("hourly records", format!("row {} has no date", row)))?;
        let parsed = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| {
            CemError::malformed("hourly records", format!("row {} date '{}': {}", row, date, e))
        })?;
        months.push(parsed.month().to_string());
    }

    let mut with_month = hourly.clone();
    with_month.with_column(Column::new(MONTH.into(), months))?;
    Ok(with_month)
}

/// Parse a month given as a number ("3", "03") or short name ("mar")
pub fn parse_month(value: &str) -> Option<u32> {
    let value = value.trim();
    match value.parse::<u32>() {
        Ok(month) if (1..=12).contains(&month) => Some(month),
        Ok(_) => None,
        Err(_) => month_number(value),
    }
}

/// Read the inventory file; see [`normalize_inventory`]
pub fn read_inventory(path: &Path) -> Result<DataFrame> {
    let raw = read_text_table(path)?;
    normalize_inventory(&raw, &path.display().to_string())
}

/// Bring an inventory table to the long layout with `month` and `montot`
///
/// Accepts either a long table already carrying `month` and `montot`, or an
/// FF10-style table with `jan_value`..`dec_value` which is melted into one
/// row per month. Months are normalised to "1".."12"; totals are cast to
/// floats, empty totals stay missing.
pub fn normalize_inventory(raw: &DataFrame, source: &str) -> Result<DataFrame> {
    let monthly_columns: Vec<String> = MONTH_NAMES
        .iter()
        .map(|name| format!("{}_value", name))
        .collect();

    let long = if has_columns(raw, &[MONTH, MONTH_TOTAL]) {
        raw.clone()
    } else if has_columns(raw, &monthly_columns) {
        let id_columns: Vec<Expr> = column_names(raw)
            .iter()
            .filter(|c| !monthly_columns.contains(c))
            .map(|c| col(c.as_str()))
            .collect();

        let frames: Vec<LazyFrame> = monthly_columns
            .iter()
            .enumerate()
            .map(|(idx, value_column)| {
                let mut exprs = id_columns.clone();
                exprs.push(lit((idx + 1).to_string()).alias(MONTH));
                exprs.push(col(value_column.as_str()).alias(MONTH_TOTAL));
                raw.clone().lazy().select(exprs)
            })
            .collect();

        debug!("Melting {} monthly inventory columns from {}", frames.len(), source);
        concat(frames, UnionArgs::default())?.collect()?
    } else {
        return Err(CemError::MissingColumn {
            table: source.to_string(),
            column: MONTH_TOTAL.to_string(),
        });
    };

    let mut months = Vec::with_capacity(long.height());
    for (row, month) in text_column(&long, MONTH)?.iter().enumerate() {
        let month = month
            .as_deref()
            .and_then(parse_month)
            .ok_or_else(|| CemError::malformed(source, format!("row {} has month {:?}", row, month)))?;
        months.push(month.to_string());
    }

    let mut typed = long
        .lazy()
        .with_column(col(MONTH_TOTAL).strict_cast(DataType::Float64))
        .collect()
        .map_err(|e| CemError::malformed(source, e.to_string()))?;
    typed.with_column(Column::new(MONTH.into(), months))?;

    debug!("Loaded {} inventory entity-months from {}", typed.height(), source);
    Ok(typed)
}
