//! Error handling for CEM reconciliation.
//!
//! Unresolved metadata and zero or missing totals are not errors: they are
//! routed to the audit file or resolved to a zero scale factor. Everything
//! here aborts the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CemError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Malformed record in {source_name}: {reason}")]
    MalformedRecord { source_name: String, reason: String },

    #[error("Missing column '{column}' in {table}")]
    MissingColumn { table: String, column: String },

    #[error("Key collision on '{key}': {first:?} and {second:?} build the same key")]
    KeyCollision {
        key: String,
        first: Vec<String>,
        second: Vec<String>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing failed for {month}: {reason}")]
    MonthFailed { month: String, reason: String },

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl CemError {
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CemError>;
