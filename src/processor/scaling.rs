//! Scale factors and hourly redistribution
//!
//! The inventory's monthly total for each entity is divided by the summed
//! hourly totals for that entity-month; the ratio is then applied to every
//! hourly value and the daily total, so the month's corrected daily totals
//! add up to the inventory figure while the hourly shape is unchanged.

use crate::constants::columns::{DAY_TOTAL, KEY, MONTH, MONTH_TOTAL, SCALAR, value_columns};
use crate::error::Result;
use crate::schema::{column_names, require_columns};
use polars::prelude::*;
use tracing::debug;

const ROW_INDEX: &str = "__row";

/// Outcome of dividing an inventory total by an aggregated hourly total
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleFactor {
    /// Both totals present and the hourly total non-zero
    Ratio(f64),
    /// Hourly total is zero; scaled to zero rather than infinity or NaN
    ZeroDenominator,
    /// Either total absent; no inventory data means no reported emissions
    Missing,
}

impl ScaleFactor {
    pub fn resolve(montot: Option<f64>, daytot: Option<f64>) -> Self {
        match (montot, daytot) {
            // A literal "NaN" in the inventory file casts to NaN
            (Some(m), Some(_)) if m.is_nan() => ScaleFactor::Missing,
            (Some(_), Some(d)) if d == 0.0 => ScaleFactor::ZeroDenominator,
            (Some(m), Some(d)) => ScaleFactor::Ratio(m / d),
            _ => ScaleFactor::Missing,
        }
    }

    /// Multiplier applied to the entity-month's hourly values
    pub fn value(&self) -> f64 {
        match self {
            ScaleFactor::Ratio(r) => *r,
            ScaleFactor::ZeroDenominator | ScaleFactor::Missing => 0.0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        !matches!(self, ScaleFactor::Ratio(_))
    }
}

/// Scale factors per entity-month
#[derive(Debug, Clone)]
pub struct ScaleTable {
    /// `key`, `month`, `montot`, `daytot`, `scalar`
    pub factors: DataFrame,
    /// Hourly entity-months with a computed ratio
    pub scaled: usize,
    /// Hourly entity-months multiplied by zero: no usable inventory total or
    /// a zero hourly total
    pub zeroed: usize,
    /// Inventory entity-months with no hourly records; they change no output
    pub inventory_only: usize,
}

/// Collapse the inventory to one total per (key, month)
///
/// Rows with an empty total are ignored; an entity-month with no non-empty
/// total has no inventory row at all.
fn inventory_totals(inventory: &DataFrame) -> Result<LazyFrame> {
    require_columns(inventory, "inventory", &[KEY, MONTH, MONTH_TOTAL])?;
    Ok(inventory
        .clone()
        .lazy()
        .select([
            col(KEY),
            col(MONTH),
            col(MONTH_TOTAL).cast(DataType::Float64),
        ])
        .filter(col(MONTH_TOTAL).is_not_null())
        .group_by([col(KEY), col(MONTH)])
        .agg([col(MONTH_TOTAL).sum()]))
}

/// Left-join inventory totals against monthly hourly totals and resolve a
/// scale factor for each inventory entity-month
pub fn compute_scale_factors(monthly: &DataFrame, inventory: &DataFrame) -> Result<ScaleTable> {
    require_columns(monthly, "monthly aggregates", &[KEY, MONTH, DAY_TOTAL])?;

    let joined = inventory_totals(inventory)?
        .join(
            monthly
                .clone()
                .lazy()
                .select([col(KEY), col(MONTH), col(DAY_TOTAL).cast(DataType::Float64)]),
            [col(KEY), col(MONTH)],
            [col(KEY), col(MONTH)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(KEY), col(MONTH)], SortMultipleOptions::default())
        .collect()?;

    let montots = joined.column(MONTH_TOTAL)?.as_materialized_series().f64()?;
    let daytots = joined.column(DAY_TOTAL)?.as_materialized_series().f64()?;

    let mut scalars = Vec::with_capacity(joined.height());
    let mut scaled = 0usize;
    let mut inventory_only = 0usize;

    for (montot, daytot) in montots.into_iter().zip(daytots.into_iter()) {
        let factor = ScaleFactor::resolve(montot, daytot);
        if daytot.is_none() {
            inventory_only += 1;
        } else if !factor.is_fallback() {
            scaled += 1;
        }
        scalars.push(factor.value());
    }

    // Inventory totals are unique per (key, month), so each ratio belongs to
    // exactly one monthly group; every other monthly group is scaled to zero
    let zeroed = monthly.height().saturating_sub(scaled);

    let mut factors = joined;
    factors.with_column(Column::new(SCALAR.into(), scalars))?;

    debug!(
        "Scale factors: {} entity-months scaled, {} zeroed, {} inventory-only",
        scaled, zeroed, inventory_only
    );

    Ok(ScaleTable {
        factors,
        scaled,
        zeroed,
        inventory_only,
    })
}

/// Multiply `daytot` and every `hrval` column by the entity-month's scalar
///
/// Rows without a matching scalar are multiplied by zero. The result has the
/// input's columns, row count and row order.
pub fn redistribute(hourly: &DataFrame, factors: &DataFrame) -> Result<DataFrame> {
    let values = value_columns();
    require_columns(hourly, "hourly records", &[KEY, MONTH])?;
    require_columns(hourly, "hourly records", &values)?;
    require_columns(factors, "scale factors", &[KEY, MONTH, SCALAR])?;

    let output_columns: Vec<Expr> = column_names(hourly)
        .iter()
        .map(|c| col(c.as_str()))
        .collect();

    let scaled_values: Vec<Expr> = values
        .iter()
        .map(|c| {
            (col(c.as_str()).cast(DataType::Float64).fill_null(lit(0.0)) * col(SCALAR))
                .alias(c.as_str())
        })
        .collect();

    let corrected = hourly
        .clone()
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .join(
            factors
                .clone()
                .lazy()
                .select([col(KEY), col(MONTH), col(SCALAR)]),
            [col(KEY), col(MONTH)],
            [col(KEY), col(MONTH)],
            JoinArgs::new(JoinType::Left),
        )
        .with_column(col(SCALAR).fill_null(lit(0.0)))
        .with_columns(scaled_values)
        .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
        .select(output_columns)
        .collect()?;

    debug!("Redistributed scale factors over {} hourly rows", corrected.height());
    Ok(corrected)
}
