//! Composite entity keys
//!
//! Hourly readings and inventory totals are keyed differently at source; both
//! are aligned on a single `key` column formed by joining a caller-chosen,
//! ordered list of identifying fields with `_` after trimming each value.

use crate::constants::{KEY_SEPARATOR, columns::KEY};
use crate::error::{CemError, Result};
use crate::schema::require_columns;
use polars::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Trim each field value and join them into a key string
pub fn compose_key<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| v.as_ref().trim())
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Key strings seen so far and the trimmed field tuple each came from
///
/// Shared across tables so that a key built from one tuple in the hourly
/// records and a different tuple in the inventory is caught before the join.
#[derive(Debug, Default)]
pub struct KeyRegistry {
    tuples: HashMap<String, Vec<String>>,
}

impl KeyRegistry {
    /// Record `tuple` under `key`, failing if the key already belongs to a
    /// different tuple
    pub fn register(&mut self, key: &str, tuple: &[&str]) -> Result<()> {
        match self.tuples.get(key) {
            Some(first) if first.iter().map(String::as_str).ne(tuple.iter().copied()) => {
                Err(CemError::KeyCollision {
                    key: key.to_string(),
                    first: first.clone(),
                    second: tuple.iter().map(|s| s.to_string()).collect(),
                })
            }
            Some(_) => Ok(()),
            None => {
                self.tuples
                    .insert(key.to_string(), tuple.iter().map(|s| s.to_string()).collect());
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }
}

/// Return a copy of `df` with each key field trimmed and a `key` column added
///
/// Re-applying to an already keyed frame yields the same keys. When
/// `validate` is set, two rows whose trimmed field tuples differ but whose
/// key strings match (e.g. `("1_2", "3")` vs `("1", "2_3")`) fail with
/// [`CemError::KeyCollision`].
pub fn build_key<S: AsRef<str>>(
    df: &DataFrame,
    table: &str,
    fields: &[S],
    validate: bool,
) -> Result<DataFrame> {
    let mut registry = validate.then(KeyRegistry::default);
    build_key_with(df, table, fields, registry.as_mut())
}

/// [`build_key`] checking collisions against `registry`, which may already
/// hold keys from another table
pub fn build_key_with<S: AsRef<str>>(
    df: &DataFrame,
    table: &str,
    fields: &[S],
    mut registry: Option<&mut KeyRegistry>,
) -> Result<DataFrame> {
    if fields.is_empty() {
        return Err(CemError::Configuration {
            message: "At least one key field is required".to_string(),
        });
    }
    require_columns(df, table, fields)?;

    let height = df.height();
    let mut trimmed_columns: Vec<Vec<String>> = Vec::with_capacity(fields.len());

    for field in fields {
        let field = field.as_ref();
        let column = df.column(field)?.cast(&DataType::String)?;
        let values = column.as_materialized_series().str()?;

        let mut trimmed = Vec::with_capacity(height);
        for (row, value) in values.into_iter().enumerate() {
            let value = value.ok_or_else(|| {
                CemError::malformed(table, format!("row {} has no value for key field '{}'", row, field))
            })?;
            trimmed.push(value.trim().to_string());
        }
        trimmed_columns.push(trimmed);
    }

    let mut keys = Vec::with_capacity(height);
    for row in 0..height {
        let tuple: Vec<&str> = trimmed_columns.iter().map(|c| c[row].as_str()).collect();
        let key = compose_key(&tuple);
        if let Some(registry) = registry.as_deref_mut() {
            registry.register(&key, &tuple)?;
        }
        keys.push(key);
    }

    let mut keyed = df.clone();
    for (field, values) in fields.iter().zip(trimmed_columns) {
        keyed.with_column(Column::new(field.as_ref().into(), values))?;
    }
    keyed.with_column(Column::new(KEY.into(), keys))?;

    debug!(
        "Built {} keys for {} from {} fields",
        height,
        table,
        fields.len()
    );
    Ok(keyed)
}

/// Drop rows with an empty value in any key field
///
/// Such rows can never match a keyed record. Returns the remaining rows and
/// how many were dropped.
pub fn drop_incomplete_keys<S: AsRef<str>>(
    df: &DataFrame,
    table: &str,
    fields: &[S],
) -> Result<(DataFrame, usize)> {
    require_columns(df, table, fields)?;

    let Some(complete) = fields
        .iter()
        .map(|f| col(f.as_ref()).is_not_null())
        .reduce(|acc, e| acc.and(e))
    else {
        return Ok((df.clone(), 0));
    };

    let kept = df.clone().lazy().filter(complete).collect()?;
    let dropped = df.height() - kept.height();
    if dropped > 0 {
        debug!("Dropped {} rows of {} with an empty key field", dropped, table);
    }
    Ok((kept, dropped))
}
