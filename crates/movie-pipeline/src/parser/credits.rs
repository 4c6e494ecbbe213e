//! Cast, crew and director extraction from the nested credits block.

use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{EMPTY_MARKERS, decode_literal, join_names};
use crate::error::Result;
use crate::utils::has_column;

/// Columns added by [`CreditsExtractor::extract`].
pub const CREDIT_COLUMNS: [&str; 5] = ["cast", "crew", "directors", "cast_size", "crew_size"];

/// What the extractor did with the credits column.
///
/// An absent column and unparseable cells are reported differently:
/// `Skipped` means no work was done at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CreditsOutcome {
    /// The credits column was not present; no derived columns were added.
    Skipped,
    /// Derived columns were added for every row.
    Extracted {
        rows: usize,
        /// Null or empty credits cells.
        empty_cells: usize,
        /// Cells whose encoding could not be decoded.
        undecodable_cells: usize,
    },
}

/// Derived credit fields for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreditsBreakdown {
    pub cast: Option<String>,
    pub crew: Option<String>,
    pub directors: Option<String>,
    pub cast_size: Option<u32>,
    pub crew_size: Option<u32>,
}

/// Result of decoding one credits cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellCredits {
    Empty,
    Undecodable,
    Decoded(CreditsBreakdown),
}

impl CellCredits {
    fn into_breakdown(self) -> CreditsBreakdown {
        match self {
            CellCredits::Decoded(breakdown) => breakdown,
            CellCredits::Empty | CellCredits::Undecodable => CreditsBreakdown::default(),
        }
    }
}

/// Derives `cast`, `crew`, `directors`, `cast_size` and `crew_size` from
/// the credits column, then drops it.
#[derive(Debug, Clone)]
pub struct CreditsExtractor {
    column: String,
    director_job: String,
    delimiter: char,
}

impl Default for CreditsExtractor {
    fn default() -> Self {
        Self::new("credits", "Director", '|')
    }
}

impl CreditsExtractor {
    pub fn new(
        column: impl Into<String>,
        director_job: impl Into<String>,
        delimiter: char,
    ) -> Self {
        Self {
            column: column.into(),
            director_job: director_job.into(),
            delimiter,
        }
    }

    /// Decode one credits cell.
    pub fn extract_cell(&self, raw: Option<&str>) -> CellCredits {
        let Some(text) = raw.map(str::trim) else {
            return CellCredits::Empty;
        };
        if EMPTY_MARKERS.contains(&text) {
            return CellCredits::Empty;
        }

        let value = match decode_literal(text) {
            Ok(value) => value,
            Err(err) => {
                debug!("Undecodable credits value: {}", err);
                return CellCredits::Undecodable;
            }
        };
        let Value::Object(credits) = value else {
            return CellCredits::Undecodable;
        };

        let (cast, cast_size) = self.people(&credits, "cast", |_| true);
        let (crew, crew_size) = self.people(&credits, "crew", |_| true);
        let (directors, _) = self.people(&credits, "crew", |entry| {
            entry.get("job").and_then(Value::as_str) == Some(self.director_job.as_str())
        });

        CellCredits::Decoded(CreditsBreakdown {
            cast,
            crew,
            directors,
            cast_size,
            crew_size,
        })
    }

    /// Joined names of the entries under `key` passing `keep`, and the
    /// total entry count. An absent key counts as an empty list; a key
    /// holding anything but a list yields neither.
    fn people<F>(
        &self,
        credits: &Map<String, Value>,
        key: &str,
        keep: F,
    ) -> (Option<String>, Option<u32>)
    where
        F: Fn(&Map<String, Value>) -> bool,
    {
        match credits.get(key) {
            None | Some(Value::Null) => (None, Some(0)),
            Some(Value::Array(entries)) => {
                let names = join_names(
                    entries
                        .iter()
                        .filter_map(Value::as_object)
                        .filter(|entry| keep(*entry)),
                    self.delimiter,
                );
                (names, u32::try_from(entries.len()).ok())
            }
            Some(_) => (None, None),
        }
    }

    /// Add the derived credit columns and drop the credits column.
    ///
    /// When the credits column is absent the frame is returned unchanged.
    pub fn extract(&self, df: &DataFrame) -> Result<(DataFrame, CreditsOutcome)> {
        if !has_column(df, &self.column) {
            info!(
                "Credits column '{}' not found, skipping credit extraction",
                self.column
            );
            return Ok((df.clone(), CreditsOutcome::Skipped));
        }

        let raw = df
            .column(&self.column)?
            .as_materialized_series()
            .cast(&DataType::String)?;

        let mut empty_cells = 0;
        let mut undecodable_cells = 0;
        let mut cast = Vec::with_capacity(df.height());
        let mut crew = Vec::with_capacity(df.height());
        let mut directors = Vec::with_capacity(df.height());
        let mut cast_size = Vec::with_capacity(df.height());
        let mut crew_size = Vec::with_capacity(df.height());

        for cell in raw.str()?.into_iter() {
            let extracted = self.extract_cell(cell);
            match extracted {
                CellCredits::Empty => empty_cells += 1,
                CellCredits::Undecodable => undecodable_cells += 1,
                CellCredits::Decoded(_) => {}
            }
            let breakdown = extracted.into_breakdown();
            cast.push(breakdown.cast);
            crew.push(breakdown.crew);
            directors.push(breakdown.directors);
            cast_size.push(breakdown.cast_size);
            crew_size.push(breakdown.crew_size);
        }

        let [cast_col, crew_col, directors_col, cast_size_col, crew_size_col] = CREDIT_COLUMNS;
        let mut df = df.drop(&self.column)?;
        df.with_column(Series::new(cast_col.into(), cast))?;
        df.with_column(Series::new(crew_col.into(), crew))?;
        df.with_column(Series::new(directors_col.into(), directors))?;
        df.with_column(Series::new(cast_size_col.into(), cast_size))?;
        df.with_column(Series::new(crew_size_col.into(), crew_size))?;

        let rows = df.height();
        info!(
            "Extracted credits for {} rows ({} empty, {} undecodable)",
            rows, empty_cells, undecodable_cells
        );

        Ok((
            df,
            CreditsOutcome::Extracted {
                rows,
                empty_cells,
                undecodable_cells,
            },
        ))
    }
}
