//! Configuration management and validation.
//!
//! Provides the run configuration: which year and months to reconcile, where
//! the hourly files, lookup tables and inventory live, how entity keys are
//! built and how the corrected output is written.

use crate::constants::{DEFAULT_AUDIT_FILE, columns};
use crate::error::{CemError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Output file format for the corrected hourly table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(CemError::Configuration {
                message: format!("Unknown output format '{}' (expected csv or parquet)", other),
            }),
        }
    }
}

/// Supported compression algorithms for parquet output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "snappy" => Ok(CompressionAlgorithm::Snappy),
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            "none" | "uncompressed" => Ok(CompressionAlgorithm::Uncompressed),
            other => Err(CemError::Configuration {
                message: format!("Unknown compression '{}'", other),
            }),
        }
    }
}

/// Global configuration for a reconciliation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CemConfig {
    /// Inventory year
    pub year: i32,

    /// Months to process (1-based); empty means discover from the input directory
    pub months: Vec<u32>,

    /// Directory holding `campd-{year}-{mon}-hourly.csv` files
    pub input_path: PathBuf,

    /// Directory receiving the corrected output, audit file and legacy files
    pub output_path: PathBuf,

    /// Facility to region-code lookup
    pub region_lookup: PathBuf,

    /// (unit, process) to source-classification-code lookup
    pub scc_lookup: PathBuf,

    /// Monthly inventory totals
    pub inventory: PathBuf,

    /// Ordered fields concatenated into the entity key
    pub key_fields: Vec<String>,

    /// Fail when two distinct field tuples build the same key
    pub validate_keys: bool,

    /// Write each month in the legacy fixed layout as it is read
    pub write_legacy: bool,

    /// File name of the rejected-record audit file
    pub audit_file: String,

    /// Output format for the corrected table
    pub output_format: OutputFormat,

    /// Compression used for parquet output
    pub compression: CompressionAlgorithm,

    /// Maximum months read concurrently
    pub max_concurrent_months: usize,
}

impl Default for CemConfig {
    fn default() -> Self {
        Self {
            year: 2020,
            months: Vec::new(),
            input_path: PathBuf::from("."),
            output_path: PathBuf::from("output"),
            region_lookup: PathBuf::from("facility_fips.csv"),
            scc_lookup: PathBuf::from("unit_scc.csv"),
            inventory: PathBuf::from("inventory.csv"),
            key_fields: columns::DEFAULT_KEY_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            validate_keys: true,
            write_legacy: false,
            audit_file: DEFAULT_AUDIT_FILE.to_string(),
            output_format: OutputFormat::Csv,
            compression: CompressionAlgorithm::Snappy,
            max_concurrent_months: num_cpus::get().clamp(1, 12),
        }
    }
}

impl CemConfig {
    /// Create configuration for a given year
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    /// Restrict processing to specific months
    pub fn with_months(mut self, months: Vec<u32>) -> Self {
        self.months = months;
        self
    }

    /// Set the input and output directories
    pub fn with_paths(mut self, input_path: PathBuf, output_path: PathBuf) -> Self {
        self.input_path = input_path;
        self.output_path = output_path;
        self
    }

    /// Set the lookup tables and inventory file
    pub fn with_lookups(mut self, region: PathBuf, scc: PathBuf, inventory: PathBuf) -> Self {
        self.region_lookup = region;
        self.scc_lookup = scc;
        self.inventory = inventory;
        self
    }

    /// Use a custom ordered set of key fields
    pub fn with_key_fields(mut self, fields: Vec<String>) -> Self {
        self.key_fields = fields;
        self
    }

    /// Skip key collision validation
    pub fn without_key_validation(mut self) -> Self {
        self.validate_keys = false;
        self
    }

    /// Enable legacy file output
    pub fn with_legacy_output(mut self) -> Self {
        self.write_legacy = true;
        self
    }

    /// Set output format
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set parquet compression
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Set maximum concurrent months
    pub fn with_max_concurrent_months(mut self, max_months: usize) -> Self {
        self.max_concurrent_months = max_months;
        self
    }

    /// Path of the audit file inside the output directory
    pub fn audit_path(&self) -> PathBuf {
        self.output_path.join(&self.audit_file)
    }

    /// Check the configuration before any file is touched
    pub fn validate(&self) -> Result<()> {
        if self.key_fields.is_empty() {
            return Err(CemError::Configuration {
                message: "At least one key field is required".to_string(),
            });
        }

        if let Some(bad) = self.months.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(CemError::Configuration {
                message: format!("Month {} is outside 1-12", bad),
            });
        }

        if self.max_concurrent_months == 0 {
            return Err(CemError::Configuration {
                message: "max_concurrent_months must be at least 1".to_string(),
            });
        }

        if self.audit_file.trim().is_empty() {
            return Err(CemError::Configuration {
                message: "Audit file name cannot be empty".to_string(),
            });
        }

        debug!(
            "Configuration valid: year {}, {} months requested, key fields {:?}",
            self.year,
            self.months.len(),
            self.key_fields
        );
        Ok(())
    }
}
