//! Metadata merge stage
//!
//! Attaches region codes (by facility) and source classification codes (by
//! unit and process) to the keyed hourly table, drops days with no positive
//! total, and splits what is left into accepted and rejected rows.

use crate::constants::columns::{
    DAY_TOTAL, FACILITY_ID, PROCESS_ID, REGION_CODE, SCC, UNIT_ID,
};
use crate::error::Result;
use crate::models::{LookupTables, RejectReason};
use crate::schema::{column_names, require_columns};
use polars::prelude::*;
use tracing::{debug, info};

const ROW_INDEX: &str = "__row";

/// Result of merging lookups into the hourly table
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Rows with both lookups resolved, lookup columns attached
    pub accepted: DataFrame,
    /// Rows with at least one lookup unresolved, in the input column layout
    pub rejected: DataFrame,
    /// Rows dropped for a missing or non-positive daily total
    pub dropped_no_data: usize,
    pub unresolved_region: usize,
    pub unresolved_scc: usize,
}

impl MergeOutcome {
    pub fn rejected_for(&self, reason: RejectReason) -> usize {
        match reason {
            RejectReason::UnresolvedRegion => self.unresolved_region,
            RejectReason::UnresolvedScc => self.unresolved_scc,
        }
    }
}

/// One region code per facility, first non-null wins
fn region_lookup(regions: &DataFrame) -> Result<LazyFrame> {
    require_columns(regions, "region lookup", &[FACILITY_ID, REGION_CODE])?;
    Ok(regions
        .clone()
        .lazy()
        .select([
            col(FACILITY_ID).cast(DataType::String),
            col(REGION_CODE).cast(DataType::String),
        ])
        .group_by([col(FACILITY_ID)])
        .agg([col(REGION_CODE).drop_nulls().first()]))
}

/// One classification code per (unit, process), first non-null wins
fn scc_lookup(sccs: &DataFrame) -> Result<LazyFrame> {
    require_columns(sccs, "classification lookup", &[UNIT_ID, PROCESS_ID, SCC])?;
    Ok(sccs
        .clone()
        .lazy()
        .select([
            col(UNIT_ID).cast(DataType::String),
            col(PROCESS_ID).cast(DataType::String),
            col(SCC).cast(DataType::String),
        ])
        .group_by([col(UNIT_ID), col(PROCESS_ID)])
        .agg([col(SCC).drop_nulls().first()]))
}

/// Merge the lookups into `hourly` and partition the result
///
/// Days whose total is missing or not positive carry no emissions and are
/// dropped before partitioning, so they never reach the audit file.
pub fn merge_metadata(hourly: &DataFrame, lookups: &LookupTables) -> Result<MergeOutcome> {
    require_columns(
        hourly,
        "hourly records",
        &[FACILITY_ID, UNIT_ID, PROCESS_ID, DAY_TOTAL],
    )?;
    let input_columns = column_names(hourly);

    let with_data = hourly
        .clone()
        .lazy()
        .filter(
            col(DAY_TOTAL)
                .cast(DataType::Float64)
                .fill_null(lit(0.0))
                .gt(lit(0.0)),
        )
        .collect()?;
    let dropped_no_data = hourly.height() - with_data.height();

    let joined = with_data
        .lazy()
        .with_row_index(ROW_INDEX, None)
        .with_columns([
            col(FACILITY_ID).cast(DataType::String),
            col(UNIT_ID).cast(DataType::String),
            col(PROCESS_ID).cast(DataType::String),
        ])
        .join(
            region_lookup(&lookups.regions)?,
            [col(FACILITY_ID)],
            [col(FACILITY_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .join(
            scc_lookup(&lookups.sccs)?,
            [col(UNIT_ID), col(PROCESS_ID)],
            [col(UNIT_ID), col(PROCESS_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(ROW_INDEX)], SortMultipleOptions::default())
        .collect()?;

    let unresolved_region = joined.column(REGION_CODE)?.null_count();

    let accepted_columns: Vec<Expr> = input_columns
        .iter()
        .map(|c| col(c.as_str()))
        .chain([col(REGION_CODE), col(SCC)])
        .collect();

    let accepted = joined
        .clone()
        .lazy()
        .filter(
            col(REGION_CODE)
                .is_not_null()
                .and(col(SCC).is_not_null()),
        )
        .select(accepted_columns)
        .collect()?;

    let rejected = joined
        .lazy()
        .filter(col(REGION_CODE).is_null().or(col(SCC).is_null()))
        .select(
            input_columns
                .iter()
                .map(|c| col(c.as_str()))
                .collect::<Vec<_>>(),
        )
        .collect()?;

    let unresolved_scc = rejected.height() - unresolved_region;

    if rejected.height() > 0 {
        info!(
            "Rejected {} hourly rows ({} {}, {} {})",
            rejected.height(),
            unresolved_region,
            RejectReason::UnresolvedRegion,
            unresolved_scc,
            RejectReason::UnresolvedScc
        );
    }
    debug!(
        "Merge: {} in, {} dropped (no data), {} accepted, {} rejected",
        hourly.height(),
        dropped_no_data,
        accepted.height(),
        rejected.height()
    );

    Ok(MergeOutcome {
        accepted,
        rejected,
        dropped_no_data,
        unresolved_region,
        unresolved_scc,
    })
}
