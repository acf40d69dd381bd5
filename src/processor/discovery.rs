//! Input discovery for monthly hourly files
//!
//! Hourly readings arrive as one file per month:
//! ```text
//! input/
//!   campd-2021-jan-hourly.csv
//!   campd-2021-feb-hourly.csv
//!   ...
//! ```

use crate::constants::{HOURLY_INPUT_PATTERN, hourly_input_file_name, month_number};
use crate::error::{CemError, Result};
use crate::models::MonthFile;
use regex::Regex;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, warn};

/// Locates monthly hourly files in the input directory
#[derive(Debug)]
pub struct MonthDiscovery {
    input_path: PathBuf,
}

impl MonthDiscovery {
    pub fn new(input_path: PathBuf) -> Self {
        Self { input_path }
    }

    /// Resolve the files for `months`, or discover every month present for
    /// `year` when `months` is empty. Returned in calendar order.
    pub async fn resolve(&self, year: i32, months: &[u32]) -> Result<Vec<MonthFile>> {
        if !self.input_path.exists() {
            return Err(CemError::InputNotFound {
                path: self.input_path.clone(),
            });
        }

        if months.is_empty() {
            return self.discover(year).await;
        }

        let mut sorted = months.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut files = Vec::with_capacity(sorted.len());
        for month in sorted {
            let name = hourly_input_file_name(year, month).ok_or_else(|| CemError::Configuration {
                message: format!("Month {} is outside 1-12", month),
            })?;
            let path = self.input_path.join(name);
            if !fs::try_exists(&path).await? {
                return Err(CemError::InputNotFound { path });
            }
            files.push(MonthFile { month, path });
        }

        Ok(files)
    }

    /// Scan the input directory for every month file of `year`
    pub async fn discover(&self, year: i32) -> Result<Vec<MonthFile>> {
        let pattern = Regex::new(HOURLY_INPUT_PATTERN).map_err(|e| CemError::Configuration {
            message: format!("Invalid input pattern: {}", e),
        })?;

        debug!("Searching for hourly files in: {}", self.input_path.display());

        let mut files = Vec::new();
        let mut dir = fs::read_dir(&self.input_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };

            let Some(captures) = pattern.captures(file_name) else {
                continue;
            };

            let file_year: i32 = captures[1].parse().unwrap_or_default();
            if file_year != year {
                continue;
            }

            if let Some(month) = month_number(&captures[2]) {
                files.push(MonthFile {
                    month,
                    path: entry.path(),
                });
            }
        }

        files.sort_by_key(|f| f.month);
        if files.is_empty() {
            warn!(
                "No hourly files for {} in {}",
                year,
                self.input_path.display()
            );
        }
        debug!("Found {} monthly files for {}", files.len(), year);
        Ok(files)
    }
}
