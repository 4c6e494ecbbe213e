//! Field parsing for embedded sub-documents.
//!
//! Raw movie records carry lists of `{id, name}` entries (genres, production
//! companies, ...) and a nested credits block as encoded text. This module
//! flattens them:
//!
//! - [`SubDocument`] - the decoded shape of one cell
//! - [`FieldParser`] - column-wise flattening of sub-document columns
//! - [`CreditsExtractor`] - cast, crew and director columns from credits
//!
//! Decode failures never surface as errors; a cell that cannot be decoded
//! becomes missing and is counted.

pub mod credits;
pub mod literal;

pub use credits::{CREDIT_COLUMNS, CreditsExtractor, CreditsOutcome};
pub use literal::{LiteralError, decode_literal};

use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::utils::{has_column, split_joined};

/// Cell values that mean "nothing here" before any decoding.
const EMPTY_MARKERS: [&str; 5] = ["", "null", "None", "nan", "NaN"];

/// Replacement for a delimiter found inside a name.
const DELIMITER_SUBSTITUTE: char = '/';

/// The decoded shape of a sub-document cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubDocument {
    /// Null, empty, undecodable, or an unexpected shape.
    Missing,
    /// A single mapping reduced to its `name`.
    Name(String),
    /// A list of mappings reduced to their names, in order.
    NameList(Vec<String>),
}

impl SubDocument {
    /// Decode a raw cell, reporting malformed encodings as errors.
    ///
    /// Text that does not start with `[` or `{` is taken as an already
    /// flattened value and split on `delimiter`.
    pub fn decode(raw: Option<&str>, delimiter: char) -> std::result::Result<Self, LiteralError> {
        let Some(text) = raw.map(str::trim) else {
            return Ok(SubDocument::Missing);
        };
        if EMPTY_MARKERS.contains(&text) {
            return Ok(SubDocument::Missing);
        }

        if text.starts_with('[') || text.starts_with('{') {
            let value = decode_literal(text)?;
            return Ok(Self::from_value(&value, delimiter));
        }

        let names = split_joined(text, delimiter);
        Ok(Self::from_names(names))
    }

    /// Decode a raw cell; malformed encodings become [`SubDocument::Missing`].
    pub fn parse(raw: Option<&str>, delimiter: char) -> Self {
        Self::decode(raw, delimiter).unwrap_or(SubDocument::Missing)
    }

    /// Reduce a decoded value to its names.
    pub fn from_value(value: &Value, delimiter: char) -> Self {
        match value {
            Value::Object(map) => entry_name(map, delimiter)
                .map(SubDocument::Name)
                .unwrap_or(SubDocument::Missing),
            Value::Array(items) => Self::from_names(
                items
                    .iter()
                    .filter_map(|item| item.as_object())
                    .filter_map(|map| entry_name(map, delimiter))
                    .collect(),
            ),
            _ => SubDocument::Missing,
        }
    }

    fn from_names(names: Vec<String>) -> Self {
        if names.is_empty() {
            SubDocument::Missing
        } else {
            SubDocument::NameList(names)
        }
    }

    /// The extracted names, in order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            SubDocument::Missing => Vec::new(),
            SubDocument::Name(name) => vec![name.as_str()],
            SubDocument::NameList(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Flatten into a cell value: the name, the joined names, or null.
    pub fn into_cell(self, delimiter: char) -> Option<String> {
        match self {
            SubDocument::Missing => None,
            SubDocument::Name(name) => Some(name),
            SubDocument::NameList(names) => Some(names.join(&delimiter.to_string())),
        }
    }
}

/// The non-empty `name` of a mapping entry, with the delimiter replaced.
pub(crate) fn entry_name(map: &Map<String, Value>, delimiter: char) -> Option<String> {
    let name = map.get("name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }
    Some(name.replace(delimiter, &DELIMITER_SUBSTITUTE.to_string()))
}

/// Join the names of the mapping entries in a list, or `None` if there are none.
pub(crate) fn join_names<'a, I>(entries: I, delimiter: char) -> Option<String>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
{
    let names: Vec<String> = entries
        .into_iter()
        .filter_map(|map| entry_name(map, delimiter))
        .collect();
    SubDocument::from_names(names).into_cell(delimiter)
}

/// Per-column decode counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnParseStats {
    pub column: String,
    /// Cells reduced to at least one name.
    pub decoded: usize,
    /// Cells that were null, empty, or held no names.
    pub missing: usize,
    /// Cells whose encoding could not be decoded.
    pub undecodable: usize,
}

/// Flattens sub-document columns into name / joined-name cells.
#[derive(Debug, Clone, Copy)]
pub struct FieldParser {
    delimiter: char,
}

impl Default for FieldParser {
    fn default() -> Self {
        Self { delimiter: '|' }
    }
}

impl FieldParser {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Flatten a single column, returning the new String series and its counts.
    pub fn parse_series(&self, series: &Series) -> PolarsResult<(Series, ColumnParseStats)> {
        let name = series.name().clone();
        let text = series.cast(&DataType::String)?;
        let mut stats = ColumnParseStats {
            column: name.to_string(),
            ..Default::default()
        };

        let values: Vec<Option<String>> = text
            .str()?
            .into_iter()
            .map(|raw| {
                let parsed = SubDocument::decode(raw, self.delimiter).unwrap_or_else(|err| {
                    debug!("Undecodable value in '{}': {}", stats.column, err);
                    stats.undecodable += 1;
                    SubDocument::Missing
                });
                let cell = parsed.into_cell(self.delimiter);
                if cell.is_some() {
                    stats.decoded += 1;
                } else {
                    stats.missing += 1;
                }
                cell
            })
            .collect();

        stats.missing -= stats.undecodable;
        Ok((Series::new(name, values), stats))
    }

    /// Flatten each listed column that is present; absent columns are skipped.
    pub fn parse_columns(
        &self,
        df: &DataFrame,
        columns: &[String],
    ) -> Result<(DataFrame, Vec<ColumnParseStats>)> {
        let mut df = df.clone();
        let mut all_stats = Vec::new();

        for col_name in columns {
            if !has_column(&df, col_name) {
                debug!("Skipped missing sub-document column: {}", col_name);
                continue;
            }

            let series = df.column(col_name)?.as_materialized_series().clone();
            let (parsed, stats) = self.parse_series(&series)?;
            df.with_column(parsed)?;

            info!(
                "Processed sub-document column: {} ({} decoded, {} missing, {} undecodable)",
                col_name, stats.decoded, stats.missing, stats.undecodable
            );
            all_stats.push(stats);
        }

        Ok((df, all_stats))
    }
}

// =============================================================================
// Tests
// =============================================================================
