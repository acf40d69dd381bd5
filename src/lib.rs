//! CEM Scale Library
//!
//! Reconciles hourly Continuous Emissions Monitoring (CEM) readings from
//! generating units with the monthly totals of an emissions inventory.
//!
//! This library provides tools for:
//! - Reading monthly long-form hourly files and pivoting them to one row per unit-day
//! - Writing the legacy fixed-width hourly layout
//! - Building composite entity keys shared by both datasets
//! - Attaching region and source classification codes, with an audit file for misses
//! - Scaling every hour of an entity-month so the month matches the inventory

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod processor;
pub mod schema;

pub use config::{CemConfig, CompressionAlgorithm, OutputFormat};
pub use error::{CemError, Result};
pub use models::{LookupTables, ProcessingStats, RejectReason};
pub use processor::scaling::ScaleFactor;
pub use processor::{Reconciliation, ReconciliationProcessor, reconcile};
