//! Shared utilities for the movie pipeline.
//!
//! Column extraction helpers used by every stage, plus small string
//! helpers for parsing and matching.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Column Access Utilities
// =============================================================================

/// Check whether a DataFrame has a column with the given name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Read a column as `f64` values. Non-finite values read as `None`.
///
/// Returns `Ok(None)` when the column is absent.
pub fn column_f64(df: &DataFrame, name: &str) -> PolarsResult<Option<Vec<Option<f64>>>> {
    if !has_column(df, name) {
        return Ok(None);
    }
    let series = df.column(name)?.as_materialized_series().cast(&DataType::Float64)?;
    let values = series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(Some(values))
}

/// Read a column as owned strings.
///
/// Returns `Ok(None)` when the column is absent.
pub fn column_strings(df: &DataFrame, name: &str) -> PolarsResult<Option<Vec<Option<String>>>> {
    if !has_column(df, name) {
        return Ok(None);
    }
    let series = df.column(name)?.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(Some(values))
}

/// Percentage of non-null cells in the frame (100.0 for an empty frame).
pub fn data_quality_score(df: &DataFrame) -> f64 {
    let total = df.height() * df.width();
    if total == 0 {
        return 100.0;
    }
    let nulls: usize = df.get_columns().iter().map(|c| c.null_count()).sum();
    (total - nulls) as f64 / total as f64 * 100.0
}

// =============================================================================
// String Utilities
// =============================================================================

/// Parse a trimmed string as a finite `f64`.
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(parse_finite_f64(" 42.5 "), Some(42.5));
/// assert_eq!(parse_finite_f64("nan"), None);
/// ```
pub fn parse_finite_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Split a joined multi-value cell into its non-empty names.
pub fn split_joined(value: &str, delimiter: char) -> Vec<String> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
