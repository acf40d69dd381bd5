//! Monthly aggregation tests

use super::{Day, assert_close, f64_values, hourly_frame, str_values};
use crate::constants::columns::{DAY_TOTAL, DEFAULT_KEY_FIELDS, KEY, MONTH};
use crate::error::CemError;
use crate::processor::aggregate::aggregate_monthly;
use crate::processor::keys::build_key;
use polars::prelude::*;

fn keyed(days: &[Day]) -> DataFrame {
    build_key(&hourly_frame(days), "hourly", DEFAULT_KEY_FIELDS, true).unwrap()
}

#[test]
fn test_three_days_sum_to_month_total() {
    let monthly = aggregate_monthly(&keyed(&[
        Day::uniform("3", "1", "NOX", "20210105", 10.0),
        Day::uniform("3", "1", "NOX", "20210106", 20.0),
        Day::uniform("3", "1", "NOX", "20210107", 30.0),
    ]))
    .unwrap();

    assert_eq!(monthly.height(), 1);
    assert_eq!(str_values(&monthly, KEY)[0].as_deref(), Some("3_1_NOX"));
    assert_eq!(str_values(&monthly, MONTH)[0].as_deref(), Some("1"));
    assert_close(f64_values(&monthly, DAY_TOTAL)[0], 60.0);
}

#[test]
fn test_one_row_per_entity_month_without_imputation() {
    let monthly = aggregate_monthly(&keyed(&[
        Day::uniform("3", "1", "NOX", "20210105", 10.0),
        Day::uniform("3", "1", "NOX", "20210301", 5.0),
        Day::uniform("3", "1", "SO2", "20210105", 7.0),
    ]))
    .unwrap();

    // January and March for NOX, January for SO2; no February row
    assert_eq!(monthly.height(), 3);
    let months = str_values(&monthly, MONTH);
    assert!(!months.contains(&Some("2".to_string())));
}

#[test]
fn test_independent_of_input_order() {
    let days = vec![
        Day::uniform("3", "1", "NOX", "20210105", 10.0),
        Day::uniform("7", "2", "SO2", "20210210", 3.0),
        Day::uniform("3", "1", "NOX", "20210106", 20.0),
        Day::uniform("7", "2", "SO2", "20210105", 4.0),
    ];
    let mut reversed = days.clone();
    reversed.reverse();

    let forward = aggregate_monthly(&keyed(&days)).unwrap();
    let backward = aggregate_monthly(&keyed(&reversed)).unwrap();

    assert!(forward.equals(&backward));
}

#[test]
fn test_requires_key_and_month() {
    let unkeyed = hourly_frame(&[Day::uniform("3", "1", "NOX", "20210105", 10.0)]);
    assert!(matches!(
        aggregate_monthly(&unkeyed),
        Err(CemError::MissingColumn { .. })
    ));
}
