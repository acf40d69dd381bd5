//! Command-line interface components.

use crate::config::{CemConfig, CompressionAlgorithm, OutputFormat};
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cemscale")]
#[command(about = "Scale hourly CEM unit emissions to monthly inventory totals")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Inventory year
    #[arg(short, long)]
    pub year: i32,

    /// Months to process, comma separated (1-12); default is every month found
    #[arg(short, long, value_delimiter = ',')]
    pub months: Vec<u32>,

    /// Directory holding campd-{year}-{mon}-hourly.csv files
    #[arg(short, long, default_value = ".")]
    pub input_path: PathBuf,

    /// Output directory for corrected, audit and legacy files
    #[arg(short, long, default_value = "output")]
    pub output_path: PathBuf,

    /// Facility to region code lookup (facility_id, region_cd)
    #[arg(long)]
    pub fips: PathBuf,

    /// Unit/process to classification code lookup (unit_id, process_id, scc)
    #[arg(long)]
    pub sccs: PathBuf,

    /// Monthly inventory totals (long or FF10 monthly layout)
    #[arg(long)]
    pub inventory: PathBuf,

    /// Ordered fields forming the entity key
    #[arg(long, value_delimiter = ',', default_value = "oris_facility_code,oris_boiler_id,poll")]
    pub key_fields: Vec<String>,

    /// Do not check for key collisions between distinct entities
    #[arg(long)]
    pub skip_key_validation: bool,

    /// Also write each month in the legacy fixed-width layout
    #[arg(long)]
    pub write_legacy: bool,

    /// Output format (csv, parquet)
    #[arg(long, default_value = "csv")]
    pub format: String,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, default_value = "snappy")]
    pub compression: String,

    /// Maximum months read concurrently
    #[arg(long)]
    pub max_concurrent_months: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Log level implied by the flags
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Build a validated run configuration
    pub fn to_config(&self) -> Result<CemConfig> {
        let mut config = CemConfig::default()
            .with_year(self.year)
            .with_months(self.months.clone())
            .with_paths(self.input_path.clone(), self.output_path.clone())
            .with_lookups(self.fips.clone(), self.sccs.clone(), self.inventory.clone())
            .with_key_fields(
                self.key_fields
                    .iter()
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect(),
            )
            .with_output_format(OutputFormat::parse(&self.format)?)
            .with_compression(CompressionAlgorithm::parse(&self.compression)?);

        if self.skip_key_validation {
            config = config.without_key_validation();
        }
        if self.write_legacy {
            config = config.with_legacy_output();
        }
        if let Some(max_months) = self.max_concurrent_months {
            config = config.with_max_concurrent_months(max_months);
        }

        config.validate()?;
        Ok(config)
    }
}
