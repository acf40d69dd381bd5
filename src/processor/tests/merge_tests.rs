//! Metadata merge tests

use super::{Day, hourly_frame, lookups_for, str_values};
use crate::constants::columns::{DEFAULT_KEY_FIELDS, FACILITY_ID, REGION_CODE, SCC};
use crate::models::{LookupTables, RejectReason};
use crate::processor::keys::build_key;
use crate::processor::merge::merge_metadata;
use crate::schema::column_names;
use polars::prelude::*;

fn keyed(days: &[Day]) -> DataFrame {
    build_key(&hourly_frame(days), "hourly", DEFAULT_KEY_FIELDS, true).unwrap()
}

#[test]
fn test_all_resolved_rows_are_accepted() {
    let days = vec![
        Day::uniform("3", "1", "NOX", "20210105", 24.0),
        Day::uniform("3", "1", "NOX", "20210106", 48.0),
        Day::uniform("7", "A", "SO2", "20210105", 12.0),
    ];
    let outcome = merge_metadata(&keyed(&days), &lookups_for(&days)).unwrap();

    assert_eq!(outcome.accepted.height(), 3);
    assert_eq!(outcome.rejected.height(), 0);
    assert_eq!(outcome.dropped_no_data, 0);

    let regions = str_values(&outcome.accepted, REGION_CODE);
    assert_eq!(regions[0].as_deref(), Some("R-F3"));
    assert_eq!(regions[2].as_deref(), Some("R-F7"));
    assert!(str_values(&outcome.accepted, SCC).iter().all(Option::is_some));
}

#[test]
fn test_unresolved_rows_are_rejected_with_input_layout() {
    let known = Day::uniform("3", "1", "NOX", "20210105", 24.0);
    let no_region = Day::uniform("5", "1", "NOX", "20210105", 24.0).with_facility("F-UNKNOWN");
    let no_scc = Day::uniform("6", "1", "NOX", "20210105", 24.0).with_unit("U-UNKNOWN", "P9");

    let lookups = lookups_for(&[known.clone(), Day::uniform("6", "1", "NOX", "20210105", 1.0)]);
    let hourly = keyed(&[known, no_region, no_scc]);

    let outcome = merge_metadata(&hourly, &lookups).unwrap();

    assert_eq!(outcome.accepted.height(), 1);
    assert_eq!(outcome.rejected.height(), 2);
    assert_eq!(outcome.rejected_for(RejectReason::UnresolvedRegion), 1);
    assert_eq!(outcome.rejected_for(RejectReason::UnresolvedScc), 1);

    // Audit rows keep the input columns so they can be reprocessed
    assert_eq!(column_names(&outcome.rejected), column_names(&hourly));

    let facilities = str_values(&outcome.rejected, FACILITY_ID);
    assert!(facilities.contains(&Some("F-UNKNOWN".to_string())));
}

#[test]
fn test_accepted_and_rejected_partition_by_lookup_nulls() {
    let days = vec![
        Day::uniform("3", "1", "NOX", "20210105", 24.0),
        Day::uniform("4", "1", "NOX", "20210105", 24.0).with_facility("F-NONE"),
        Day::uniform("5", "1", "NOX", "20210105", 24.0).with_unit("U-NONE", "P1"),
    ];
    let lookups = lookups_for(&days[..1]);
    let outcome = merge_metadata(&keyed(&days), &lookups).unwrap();

    for value in str_values(&outcome.accepted, REGION_CODE) {
        assert!(value.is_some());
    }
    for value in str_values(&outcome.accepted, SCC) {
        assert!(value.is_some());
    }
    assert_eq!(outcome.accepted.height() + outcome.rejected.height(), days.len());
}

#[test]
fn test_days_without_positive_total_are_dropped_not_rejected() {
    let good = Day::uniform("3", "1", "NOX", "20210105", 24.0);
    let zero = Day::uniform("3", "1", "NOX", "20210106", 0.0);
    // Unknown facility and no data: must not show up in the audit file
    let zero_unknown = Day::uniform("9", "9", "NOX", "20210106", 0.0).with_facility("F-NONE");
    let negative = Day::uniform("3", "1", "NOX", "20210107", -24.0);

    let lookups = lookups_for(&[good.clone()]);
    let outcome = merge_metadata(&keyed(&[good, zero, zero_unknown, negative]), &lookups).unwrap();

    assert_eq!(outcome.dropped_no_data, 3);
    assert_eq!(outcome.accepted.height(), 1);
    assert_eq!(outcome.rejected.height(), 0);
}

#[test]
fn test_missing_day_total_is_dropped() {
    let days = vec![
        Day::uniform("3", "1", "NOX", "20210105", 24.0),
        Day::uniform("3", "1", "NOX", "20210106", 24.0),
    ];
    let mut hourly = keyed(&days);
    hourly
        .with_column(Column::new("daytot".into(), [Some(24.0), None]))
        .unwrap();

    let outcome = merge_metadata(&hourly, &lookups_for(&days)).unwrap();
    assert_eq!(outcome.dropped_no_data, 1);
    assert_eq!(outcome.accepted.height(), 1);
}

#[test]
fn test_duplicate_lookup_rows_do_not_multiply_records() {
    let days = vec![Day::uniform("3", "1", "NOX", "20210105", 24.0)];
    let base = lookups_for(&days);
    let lookups = LookupTables {
        regions: base.regions.vstack(&base.regions).unwrap(),
        sccs: base.sccs.vstack(&base.sccs).unwrap(),
    };

    let outcome = merge_metadata(&keyed(&days), &lookups).unwrap();
    assert_eq!(outcome.accepted.height(), 1);
}

#[test]
fn test_row_order_is_preserved() {
    let days = vec![
        Day::uniform("9", "1", "NOX", "20210105", 24.0),
        Day::uniform("1", "1", "NOX", "20210105", 24.0),
        Day::uniform("5", "1", "NOX", "20210105", 24.0),
    ];
    let outcome = merge_metadata(&keyed(&days), &lookups_for(&days)).unwrap();

    assert_eq!(
        str_values(&outcome.accepted, FACILITY_ID),
        vec![
            Some("F9".to_string()),
            Some("F1".to_string()),
            Some("F5".to_string())
        ]
    );
}
