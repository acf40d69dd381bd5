//! Tests for the reconciliation pipeline
//!
//! Shared fixtures build wide hourly tables, lookups and inventories in
//! memory; the file-based tests write the same shapes to a temp directory.

pub mod aggregate_tests;
pub mod merge_tests;

use crate::constants::HOURS_PER_DAY;
use crate::constants::columns::{
    DATE, DAY_TOTAL, FACILITY_ID, KEY, MONTH, MONTH_TOTAL, ORIS_BOILER_ID, ORIS_FACILITY_CODE,
    POLLUTANT, PROCESS_ID, REGION_CODE, SCC, UNIT_ID, hour_column,
};
use crate::models::LookupTables;
use crate::processor::ingest::derive_month;
use polars::prelude::*;

/// One unit-day of wide hourly readings
#[derive(Debug, Clone)]
pub struct Day {
    pub oris: String,
    pub boiler: String,
    pub facility: String,
    pub unit: String,
    pub process: String,
    pub poll: String,
    pub date: String,
    pub hours: Vec<f64>,
}

impl Day {
    pub fn new(oris: &str, boiler: &str, poll: &str, date: &str, hours: Vec<f64>) -> Self {
        assert_eq!(hours.len(), HOURS_PER_DAY);
        Self {
            oris: oris.to_string(),
            boiler: boiler.to_string(),
            facility: format!("F{}", oris.trim()),
            unit: format!("U{}-{}", oris.trim(), boiler.trim()),
            process: "P1".to_string(),
            poll: poll.to_string(),
            date: date.to_string(),
            hours,
        }
    }

    /// A day whose total is spread evenly over 24 hours
    pub fn uniform(oris: &str, boiler: &str, poll: &str, date: &str, total: f64) -> Self {
        Self::new(
            oris,
            boiler,
            poll,
            date,
            vec![total / HOURS_PER_DAY as f64; HOURS_PER_DAY],
        )
    }

    /// A day with `value` at hour `peak` and 1.0 everywhere else
    pub fn peaked(oris: &str, boiler: &str, poll: &str, date: &str, peak: usize, value: f64) -> Self {
        let mut hours = vec![1.0; HOURS_PER_DAY];
        hours[peak] = value;
        Self::new(oris, boiler, poll, date, hours)
    }

    pub fn with_facility(mut self, facility: &str) -> Self {
        self.facility = facility.to_string();
        self
    }

    pub fn with_unit(mut self, unit: &str, process: &str) -> Self {
        self.unit = unit.to_string();
        self.process = process.to_string();
        self
    }

    pub fn total(&self) -> f64 {
        self.hours.iter().sum()
    }
}

fn text(days: &[Day], field: fn(&Day) -> &String) -> Vec<String> {
    days.iter().map(|d| field(d).clone()).collect()
}

/// Wide hourly table without a month column
pub fn wide_frame(days: &[Day]) -> DataFrame {
    let mut columns = vec![
        Column::new(ORIS_FACILITY_CODE.into(), text(days, |d| &d.oris)),
        Column::new(ORIS_BOILER_ID.into(), text(days, |d| &d.boiler)),
        Column::new(FACILITY_ID.into(), text(days, |d| &d.facility)),
        Column::new(UNIT_ID.into(), text(days, |d| &d.unit)),
        Column::new(PROCESS_ID.into(), text(days, |d| &d.process)),
        Column::new(POLLUTANT.into(), text(days, |d| &d.poll)),
        Column::new(DATE.into(), text(days, |d| &d.date)),
    ];
    for hour in 0..HOURS_PER_DAY {
        let values: Vec<f64> = days.iter().map(|d| d.hours[hour]).collect();
        columns.push(Column::new(hour_column(hour).into(), values));
    }
    let totals: Vec<f64> = days.iter().map(Day::total).collect();
    columns.push(Column::new(DAY_TOTAL.into(), totals));

    DataFrame::new(columns).unwrap()
}

/// Wide hourly table with its derived month column
pub fn hourly_frame(days: &[Day]) -> DataFrame {
    derive_month(&wide_frame(days)).unwrap()
}

/// Lookups resolving every facility and unit present in `days`
pub fn lookups_for(days: &[Day]) -> LookupTables {
    let facilities = text(days, |d| &d.facility);
    let regions: Vec<String> = facilities.iter().map(|f| format!("R-{}", f)).collect();
    let units = text(days, |d| &d.unit);
    let processes = text(days, |d| &d.process);
    let sccs: Vec<String> = units.iter().map(|u| format!("SCC-{}", u)).collect();

    LookupTables {
        regions: DataFrame::new(vec![
            Column::new(FACILITY_ID.into(), facilities),
            Column::new(REGION_CODE.into(), regions),
        ])
        .unwrap(),
        sccs: DataFrame::new(vec![
            Column::new(UNIT_ID.into(), units),
            Column::new(PROCESS_ID.into(), processes),
            Column::new(SCC.into(), sccs),
        ])
        .unwrap(),
    }
}

/// Long-layout inventory rows: (oris, boiler, poll, month, montot)
pub fn inventory_frame(rows: &[(&str, &str, &str, &str, Option<f64>)]) -> DataFrame {
    DataFrame::new(vec![
        Column::new(
            ORIS_FACILITY_CODE.into(),
            rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        ),
        Column::new(
            ORIS_BOILER_ID.into(),
            rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        ),
        Column::new(POLLUTANT.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
        Column::new(MONTH.into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        Column::new(
            MONTH_TOTAL.into(),
            rows.iter().map(|r| r.4).collect::<Vec<_>>(),
        ),
    ])
    .unwrap()
}

pub fn f64_values(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

pub fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::String)
        .unwrap()
        .as_materialized_series()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect()
}

/// Sum of `column` over rows whose key and month match
pub fn group_sum(df: &DataFrame, key: &str, month: &str, column: &str) -> f64 {
    let keys = str_values(df, KEY);
    let months = str_values(df, MONTH);
    let values = f64_values(df, column);
    keys.iter()
        .zip(months.iter())
        .zip(values.iter())
        .filter(|((k, m), _)| k.as_deref() == Some(key) && m.as_deref() == Some(month))
        .map(|(_, v)| *v)
        .sum()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() <= 1e-9 * expected.abs().max(1.0),
        "expected {}, got {}",
        expected,
        actual
    );
}
