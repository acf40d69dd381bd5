//! Output writing for corrected hourly tables and the audit file.

use crate::config::{CompressionAlgorithm, OutputFormat};
use crate::constants::output_file_stem;
use crate::error::Result;

use polars::prelude::{CsvWriter, DataFrame, ParquetWriter as PolarsParquetWriter, SerWriter};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes pipeline outputs into the output directory
#[derive(Debug)]
pub struct OutputWriter {
    output_dir: PathBuf,
    format: OutputFormat,
    compression: CompressionAlgorithm,
}

impl OutputWriter {
    pub fn new(output_dir: PathBuf, format: OutputFormat, compression: CompressionAlgorithm) -> Self {
        Self {
            output_dir,
            format,
            compression,
        }
    }

    /// Path the corrected table for `year` is written to
    pub fn corrected_path(&self, year: i32) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", output_file_stem(year), self.format.extension()))
    }

    /// Write the corrected hourly table in the configured format
    pub fn write_corrected(&self, df: &mut DataFrame, year: i32) -> Result<PathBuf> {
        let path = self.corrected_path(year);
        match self.format {
            OutputFormat::Csv => write_csv(df, &path)?,
            OutputFormat::Parquet => self.write_parquet(df, &path)?,
        }
        debug!("Wrote {} corrected rows to {}", df.height(), path.display());
        Ok(path)
    }

    /// Write rejected rows as CSV so they can be fixed and reprocessed
    pub fn write_audit(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        write_csv(df, path)?;
        debug!("Wrote {} rejected rows to {}", df.height(), path.display());
        Ok(())
    }

    fn write_parquet(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        PolarsParquetWriter::new(file)
            .with_compression(self.compression.to_polars_compression())
            .finish(df)?;
        Ok(())
    }
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}
