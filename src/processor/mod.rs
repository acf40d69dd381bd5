//! Reconciliation pipeline.
//!
//! Reads the requested months of hourly CEM readings, keys and enriches them,
//! scales each entity-month to the inventory total and writes the corrected
//! table alongside the audit file of rejected rows.

pub mod aggregate;
pub mod discovery;
pub mod ingest;
pub mod keys;
pub mod merge;
pub mod scaling;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{
    aggregate::aggregate_monthly,
    discovery::MonthDiscovery,
    ingest::{derive_month, pivot_to_wide, read_inventory, read_month, write_legacy},
    keys::{KeyRegistry, build_key_with, drop_incomplete_keys},
    merge::merge_metadata,
    scaling::{compute_scale_factors, redistribute},
    writer::OutputWriter,
};

use crate::config::CemConfig;
use crate::constants::{legacy_file_name, month_name};
use crate::error::{CemError, Result};
use crate::models::{LookupTables, MonthFile, ProcessingStats};
use crate::schema::read_text_table;

use colored::*;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tokio::fs;
use tokio::task;
use tracing::{debug, info, warn};

/// Outputs of the in-memory reconciliation stages
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Accepted hourly rows with scaled values
    pub corrected: DataFrame,
    /// Rows routed to the audit file
    pub rejected: DataFrame,
    /// Scale factor per inventory entity-month
    pub factors: DataFrame,
    pub dropped_no_data: usize,
    pub unresolved_region: usize,
    pub unresolved_scc: usize,
    pub accepted_rows: usize,
    pub entity_months_scaled: usize,
    pub entity_months_zeroed: usize,
    pub entity_months_inventory_only: usize,
    pub inventory_rows_skipped: usize,
}

/// Key, merge, aggregate, scale and redistribute a wide hourly table that
/// already carries its `month` column
pub fn reconcile<S: AsRef<str>>(
    hourly: &DataFrame,
    lookups: &LookupTables,
    inventory: &DataFrame,
    key_fields: &[S],
    validate_keys: bool,
) -> Result<Reconciliation> {
    // Shared by both tables so cross-table collisions surface
    let mut registry = validate_keys.then(KeyRegistry::default);

    let keyed = build_key_with(hourly, "hourly records", key_fields, registry.as_mut())?;
    let merged = merge_metadata(&keyed, lookups)?;

    let monthly = aggregate_monthly(&merged.accepted)?;
    let (inventory, inventory_rows_skipped) =
        drop_incomplete_keys(inventory, "inventory", key_fields)?;
    if inventory_rows_skipped > 0 {
        warn!(
            "Skipped {} inventory rows with an empty key field",
            inventory_rows_skipped
        );
    }
    let keyed_inventory = build_key_with(&inventory, "inventory", key_fields, registry.as_mut())?;
    let scale = compute_scale_factors(&monthly, &keyed_inventory)?;

    let corrected = redistribute(&merged.accepted, &scale.factors)?;

    Ok(Reconciliation {
        accepted_rows: merged.accepted.height(),
        corrected,
        rejected: merged.rejected,
        factors: scale.factors,
        dropped_no_data: merged.dropped_no_data,
        unresolved_region: merged.unresolved_region,
        unresolved_scc: merged.unresolved_scc,
        entity_months_scaled: scale.scaled,
        entity_months_zeroed: scale.zeroed,
        entity_months_inventory_only: scale.inventory_only,
        inventory_rows_skipped,
    })
}

/// Read, optionally write in legacy layout, pivot and tag one month
fn process_month_file(month_file: &MonthFile, year: i32, legacy_dir: Option<&Path>) -> Result<DataFrame> {
    info!(
        "Processing {}",
        month_name(month_file.month).unwrap_or("unknown month")
    );

    let long = read_month(&month_file.path)?;
    if let Some(dir) = legacy_dir {
        write_legacy(&dir.join(legacy_file_name(year, month_file.month)), &long)?;
    }
    derive_month(&pivot_to_wide(&long)?)
}

/// Main processor for a reconciliation run
#[derive(Debug)]
pub struct ReconciliationProcessor {
    config: CemConfig,
    discovery: MonthDiscovery,
    writer: OutputWriter,
}

impl ReconciliationProcessor {
    /// Create a new processor; the configuration is validated up front
    pub fn new(config: CemConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            discovery: MonthDiscovery::new(config.input_path.clone()),
            writer: OutputWriter::new(
                config.output_path.clone(),
                config.output_format,
                config.compression,
            ),
            config,
        })
    }

    pub fn config(&self) -> &CemConfig {
        &self.config
    }

    /// Main processing entry point
    pub async fn process(&self) -> Result<ProcessingStats> {
        let start_time = Instant::now();
        let year = self.config.year;

        println!("{}", "Starting CEM reconciliation".bright_green().bold());
        println!("  {} {}", "Year:".bright_cyan(), year);
        println!(
            "  {} {}",
            "Input:".bright_cyan(),
            self.config.input_path.display()
        );
        println!(
            "  {} {}",
            "Output:".bright_cyan(),
            self.config.output_path.display()
        );

        // Step 1: Locate monthly files
        println!("\n{}", "Discovering monthly files...".bright_yellow());
        let month_files = self.discovery.resolve(year, &self.config.months).await?;
        println!(
            "  {} {} monthly files",
            "Found".bright_green(),
            month_files.len().to_string().bright_white().bold()
        );

        if month_files.is_empty() {
            return Ok(ProcessingStats {
                output_path: self.writer.corrected_path(year),
                audit_path: self.config.audit_path(),
                processing_time_ms: start_time.elapsed().as_millis(),
                ..Default::default()
            });
        }

        fs::create_dir_all(&self.config.output_path).await?;

        // Step 2: Lookups and inventory
        println!("\n{}", "Loading lookups and inventory...".bright_yellow());
        let (lookups, inventory) = self.load_reference_tables().await?;

        // Step 3: Hourly files, pivoted and stacked in calendar order
        println!("\n{}", "Reading hourly files...".bright_yellow());
        let hourly = self.load_months(&month_files).await?;
        let hourly_rows = hourly.height();

        // Step 4: Reconcile against the inventory
        println!("\n{}", "Reconciling with inventory...".bright_yellow());
        let key_fields = self.config.key_fields.clone();
        let validate_keys = self.config.validate_keys;
        let mut result = task::spawn_blocking(move || {
            reconcile(&hourly, &lookups, &inventory, &key_fields, validate_keys)
        })
        .await
        .map_err(|e| CemError::TaskFailed(e.to_string()))??;

        // Step 5: Outputs
        let audit_path = self.config.audit_path();
        self.writer.write_audit(&mut result.rejected, &audit_path)?;
        let output_path = self.writer.write_corrected(&mut result.corrected, year)?;

        let stats = ProcessingStats {
            months_processed: month_files.len(),
            hourly_rows,
            dropped_no_data: result.dropped_no_data,
            rejected_region: result.unresolved_region,
            rejected_scc: result.unresolved_scc,
            accepted_rows: result.accepted_rows,
            entity_months_scaled: result.entity_months_scaled,
            entity_months_zeroed: result.entity_months_zeroed,
            entity_months_inventory_only: result.entity_months_inventory_only,
            inventory_rows_skipped: result.inventory_rows_skipped,
            output_rows: result.corrected.height(),
            output_path,
            audit_path,
            processing_time_ms: start_time.elapsed().as_millis(),
        };

        print_summary(&stats);
        Ok(stats)
    }

    /// Read the region and classification lookups and the inventory
    async fn load_reference_tables(&self) -> Result<(LookupTables, DataFrame)> {
        let region_path = self.config.region_lookup.clone();
        let scc_path = self.config.scc_lookup.clone();
        let inventory_path = self.config.inventory.clone();

        task::spawn_blocking(move || {
            let regions = read_text_table(&region_path)?;
            let sccs = read_text_table(&scc_path)?;
            let inventory = read_inventory(&inventory_path)?;
            debug!(
                "Loaded {} region rows, {} classification rows, {} inventory rows",
                regions.height(),
                sccs.height(),
                inventory.height()
            );
            Ok::<_, CemError>((LookupTables { regions, sccs }, inventory))
        })
        .await
        .map_err(|e| CemError::TaskFailed(e.to_string()))?
    }

    /// Read and pivot every month, in calendar order; the first failure aborts
    async fn load_months(&self, files: &[MonthFile]) -> Result<DataFrame> {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let year = self.config.year;
        let legacy_dir = self
            .config
            .write_legacy
            .then(|| self.config.output_path.clone());

        let frames: Vec<DataFrame> = stream::iter(files.iter().cloned())
            .map(|month_file| {
                let pb = pb.clone();
                let legacy_dir = legacy_dir.clone();
                async move {
                    let label = month_name(month_file.month).unwrap_or("unknown").to_string();
                    pb.set_message(format!("Processing: {}", label));

                    let result = task::spawn_blocking(move || {
                        process_month_file(&month_file, year, legacy_dir.as_deref())
                    })
                    .await
                    .map_err(|e| CemError::MonthFailed {
                        month: label.clone(),
                        reason: e.to_string(),
                    })?;
                    pb.inc(1);
                    result
                }
            })
            .buffered(self.config.max_concurrent_months)
            .try_collect()
            .await?;

        pb.finish_and_clear();

        let frames: Vec<LazyFrame> = frames.into_iter().map(|df| df.lazy()).collect();
        let hourly = concat(frames, UnionArgs::default())?.collect()?;
        debug!("Stacked {} unit-days across {} months", hourly.height(), files.len());
        Ok(hourly)
    }
}

fn print_summary(stats: &ProcessingStats) {
    println!("\n{}", "Reconciliation Summary".bright_green().bold());
    println!(
        "  {} {}ms",
        "Time elapsed:".bright_cyan(),
        stats.processing_time_ms.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Months processed:".bright_cyan(),
        stats.months_processed.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Unit-days read:".bright_cyan(),
        stats.hourly_rows.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Dropped (no data):".bright_cyan(),
        stats.dropped_no_data.to_string().bright_white()
    );
    if stats.rejected_rows() > 0 {
        println!(
            "  {} {} ({} region, {} classification) -> {}",
            "Rejected:".bright_red(),
            stats.rejected_rows().to_string().bright_red().bold(),
            stats.rejected_region,
            stats.rejected_scc,
            stats.audit_path.display()
        );
    }
    println!(
        "  {} {} scaled, {} zeroed",
        "Entity-months:".bright_cyan(),
        stats.entity_months_scaled.to_string().bright_white(),
        stats.entity_months_zeroed.to_string().bright_white()
    );
    if stats.entity_months_inventory_only > 0 {
        println!(
            "  {} {} entity-months without hourly records",
            "Inventory only:".bright_cyan(),
            stats.entity_months_inventory_only.to_string().bright_white()
        );
    }
    if stats.inventory_rows_skipped > 0 {
        println!(
            "  {} {} inventory rows with an empty key field",
            "Skipped:".bright_yellow(),
            stats.inventory_rows_skipped.to_string().bright_white()
        );
    }
    println!(
        "  {} {} -> {}",
        "Output rows:".bright_cyan(),
        stats.output_rows.to_string().bright_white().bold(),
        stats.output_path.display()
    );
}
