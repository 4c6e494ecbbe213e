//! Conversion between raw record mappings and DataFrames.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use polars::prelude::*;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::error::{PipelineError, Result};

/// One raw movie record: field name to scalar, null, or nested value.
pub type RawRecord = Map<String, Value>;

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Int,
    Float,
    Bool,
    Text,
}

fn infer_kind(values: &[Option<&Value>]) -> ColumnKind {
    let present: Vec<&Value> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        ColumnKind::Text
    } else if present.iter().all(|v| v.as_i64().is_some()) {
        ColumnKind::Int
    } else if present.iter().all(|v| v.is_number()) {
        ColumnKind::Float
    } else if present.iter().all(|v| v.is_boolean()) {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

/// Text form of a value. Nested values become their JSON encoding.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
        other => Some(other.to_string()),
    }
}

/// Build a DataFrame from raw records.
///
/// Columns are the union of record keys in first-seen order. A column whose
/// values are all integers becomes Int64, all numbers Float64, all booleans
/// Boolean; anything else (including nested lists and mappings, stored as
/// JSON text) becomes String.
pub fn records_to_frame(records: &[RawRecord]) -> Result<DataFrame> {
    let mut seen = HashSet::new();
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if seen.insert(key.as_str()) {
                names.push(key.as_str());
            }
        }
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|r| r.get(name).filter(|v| !v.is_null()))
            .collect();

        let series = match infer_kind(&values) {
            ColumnKind::Int => {
                let ints: Vec<Option<i64>> =
                    values.iter().map(|v| v.and_then(Value::as_i64)).collect();
                Series::new(name.into(), ints)
            }
            ColumnKind::Float => {
                let floats: Vec<Option<f64>> =
                    values.iter().map(|v| v.and_then(Value::as_f64)).collect();
                Series::new(name.into(), floats)
            }
            ColumnKind::Bool => {
                let bools: Vec<Option<bool>> =
                    values.iter().map(|v| v.and_then(Value::as_bool)).collect();
                Series::new(name.into(), bools)
            }
            ColumnKind::Text => {
                let texts: Vec<Option<String>> =
                    values.iter().map(|v| v.and_then(value_text)).collect();
                Series::new(name.into(), texts)
            }
        };
        columns.push(series.into_column());
    }

    if columns.is_empty() {
        return Ok(DataFrame::empty());
    }
    Ok(DataFrame::new(columns)?)
}

/// Convert one cell to JSON. Dates render as `YYYY-MM-DD`, non-finite
/// floats as null.
pub fn any_value_to_json(value: &AnyValue) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        AnyValue::Int8(v) => Value::from(*v),
        AnyValue::Int16(v) => Value::from(*v),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt8(v) => Value::from(*v),
        AnyValue::UInt16(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => float_json(f64::from(*v)),
        AnyValue::Float64(v) => float_json(*v),
        AnyValue::Date(days) => NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

fn float_json(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

/// Convert a DataFrame back into record mappings, one per row.
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<RawRecord>> {
    let columns = df.get_columns();
    let mut records = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let mut record = Map::new();
        for column in columns {
            let value = column.get(row)?;
            record.insert(column.name().to_string(), any_value_to_json(&value));
        }
        records.push(record);
    }

    Ok(records)
}

/// Load records from a JSON file holding an array of objects, or an object
/// with a `results` array.
pub fn load_json_records(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("results") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(PipelineError::SourceUnavailable {
                    source_name: path.display().to_string(),
                    reason: "expected a JSON array of records or a 'results' array".to_string(),
                });
            }
        },
        _ => {
            return Err(PipelineError::SourceUnavailable {
                source_name: path.display().to_string(),
                reason: "expected a JSON array of records".to_string(),
            });
        }
    };

    let total = items.len();
    let records: Vec<RawRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    if records.len() < total {
        warn!(
            "Skipped {} non-object entries in {}",
            total - records.len(),
            path.display()
        );
    }

    Ok(records)
}
