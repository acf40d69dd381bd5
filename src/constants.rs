//! Application constants for the CEM reconciliation tool.
//!
//! Column names, the month-name table and file naming patterns shared by the
//! ingest, merge and scaling stages.

// =============================================================================
// Calendar
// =============================================================================

/// Three-letter month names in calendar order, used in input file names
/// and in the FF10-style inventory columns (`jan_value` .. `dec_value`).
pub const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Hours in a day; one `hrval` column per hour.
pub const HOURS_PER_DAY: usize = 24;

/// Look up the short name for a 1-based month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    if (1..=12).contains(&month) {
        Some(MONTH_NAMES[(month - 1) as usize])
    } else {
        None
    }
}

/// Look up the 1-based month number for a short name (case-insensitive).
pub fn month_number(name: &str) -> Option<u32> {
    let name = name.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

// =============================================================================
// Column names
// =============================================================================

pub mod columns {
    pub const ORIS_FACILITY_CODE: &str = "oris_facility_code";
    pub const ORIS_BOILER_ID: &str = "oris_boiler_id";
    pub const FACILITY_ID: &str = "facility_id";
    pub const UNIT_ID: &str = "unit_id";
    pub const PROCESS_ID: &str = "process_id";
    pub const POLLUTANT: &str = "poll";
    pub const DATE: &str = "date";
    pub const HOUR: &str = "hour";
    pub const VALUE: &str = "value";
    pub const DAY_TOTAL: &str = "daytot";
    pub const MONTH: &str = "month";
    pub const KEY: &str = "key";
    pub const REGION_CODE: &str = "region_cd";
    pub const SCC: &str = "scc";
    pub const MONTH_TOTAL: &str = "montot";
    pub const SCALAR: &str = "scalar";

    /// Identifying columns carried by every hourly record, in output order.
    pub const HOURLY_ID_COLUMNS: &[&str] = &[
        ORIS_FACILITY_CODE,
        ORIS_BOILER_ID,
        FACILITY_ID,
        UNIT_ID,
        PROCESS_ID,
        POLLUTANT,
    ];

    /// Columns of the long-form hourly input files.
    pub const LONG_FORM_COLUMNS: &[&str] = &[
        ORIS_FACILITY_CODE,
        ORIS_BOILER_ID,
        FACILITY_ID,
        UNIT_ID,
        PROCESS_ID,
        POLLUTANT,
        DATE,
        HOUR,
        VALUE,
    ];

    /// Default entity key: unit plus pollutant.
    pub const DEFAULT_KEY_FIELDS: &[&str] = &[ORIS_FACILITY_CODE, ORIS_BOILER_ID, POLLUTANT];

    /// Column holding the value for hour `hour` (0-based).
    pub fn hour_column(hour: usize) -> String {
        format!("hrval{}", hour)
    }

    /// All 24 hourly value columns in order.
    pub fn hour_columns() -> Vec<String> {
        (0..super::HOURS_PER_DAY).map(hour_column).collect()
    }

    /// Every column the redistributor scales: the daily total plus each hour.
    pub fn value_columns() -> Vec<String> {
        std::iter::once(DAY_TOTAL.to_string())
            .chain(hour_columns())
            .collect()
    }
}

// =============================================================================
// File naming
// =============================================================================

/// Separator placed between key fields.
pub const KEY_SEPARATOR: &str = "_";

/// Default name of the audit file listing records with unresolved metadata.
pub const DEFAULT_AUDIT_FILE: &str = "nullfips.csv";

/// Input file for one month of long-form hourly readings.
pub fn hourly_input_file_name(year: i32, month: u32) -> Option<String> {
    month_name(month).map(|name| format!("campd-{}-{}-hourly.csv", year, name))
}

/// Legacy fixed-layout file written for one month.
pub fn legacy_file_name(year: i32, month: u32) -> String {
    format!("HOUR_UNIT_{}_{:02}.txt", year, month)
}

/// Corrected hourly output file (extension chosen by output format).
pub fn output_file_stem(year: i32) -> String {
    format!("cem_hourly_{}", year)
}

/// Pattern recognising hourly input files when discovering months.
pub const HOURLY_INPUT_PATTERN: &str = r"^campd-(\d{4})-([a-z]{3})-hourly\.csv$";
