//! Core data structures shared across the reconciliation pipeline.
//!
//! Hourly, inventory and lookup tables are Polars data frames; this module
//! holds the plain types that travel alongside them.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One month's hourly input file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthFile {
    pub month: u32,
    pub path: PathBuf,
}

/// Why a record was routed to the audit file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// Facility id has no region code
    UnresolvedRegion,
    /// (unit, process) has no source classification code
    UnresolvedScc,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnresolvedRegion => write!(f, "unresolved region code"),
            RejectReason::UnresolvedScc => write!(f, "unresolved classification code"),
        }
    }
}

/// Facility and (unit, process) lookups, immutable for the run
#[derive(Debug, Clone)]
pub struct LookupTables {
    /// `facility_id`, `region_cd`
    pub regions: DataFrame,
    /// `unit_id`, `process_id`, `scc`
    pub sccs: DataFrame,
}

/// Processing statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub months_processed: usize,
    pub hourly_rows: usize,
    pub dropped_no_data: usize,
    pub rejected_region: usize,
    pub rejected_scc: usize,
    pub accepted_rows: usize,
    pub entity_months_scaled: usize,
    pub entity_months_zeroed: usize,
    /// Inventory entity-months with no hourly records
    pub entity_months_inventory_only: usize,
    /// Inventory rows skipped for an empty key field
    pub inventory_rows_skipped: usize,
    pub output_rows: usize,
    pub output_path: PathBuf,
    pub audit_path: PathBuf,
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    /// Total rows routed to the audit file
    pub fn rejected_rows(&self) -> usize {
        // A row missing both lookups is counted under region only.
        self.rejected_region + self.rejected_scc
    }
}
