//! Loading and column validation for the tabular inputs.
//!
//! Every input is read with all columns as text so identifiers keep their
//! exact spelling (leading zeros, mixed alphanumerics); numeric columns are
//! cast strictly by the stage that needs them.

use crate::error::{CemError, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

/// Read a headed CSV file with every column typed as text
pub fn read_text_table(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(CemError::InputNotFound {
            path: path.to_path_buf(),
        });
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Ensure `df` carries every column in `required`
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, table: &str, required: &[S]) -> Result<()> {
    for column in required {
        let column = column.as_ref();
        if df.get_column_index(column).is_none() {
            return Err(CemError::MissingColumn {
                table: table.to_string(),
                column: column.to_string(),
            });
        }
    }
    Ok(())
}

/// Whether `df` carries every column in `candidates`
pub fn has_columns<S: AsRef<str>>(df: &DataFrame, candidates: &[S]) -> bool {
    candidates
        .iter()
        .all(|c| df.get_column_index(c.as_ref()).is_some())
}

/// Column names of `df` in order, as owned strings
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}
