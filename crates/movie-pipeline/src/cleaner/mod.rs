//! Sanitization of movie records.
//!
//! This module provides the [`Sanitizer`], which applies, in order:
//! 1. Column pruning (fixed denylist)
//! 2. Type coercion (numeric columns, release date)
//! 3. Numeric sanitization (zero as missing, rescale to millions, vote guard)
//! 4. Text sanitization (placeholders, trimming)
//! 5. Deduplication on the key columns
//! 6. Quality pruning of sparse columns
//!
//! Every step borrows its input and returns a new frame. Running the
//! whole sequence on its own output changes nothing.

mod converters;
mod sanitizers;

use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::parser::CREDIT_COLUMNS;
use crate::utils::{column_strings, has_column};

/// Raw monetary columns and the names they carry once rescaled to millions.
pub const MONETARY_COLUMNS: [(&str, &str); 2] =
    [("budget", "budget_musd"), ("revenue", "revenue_musd")];

const MONETARY_DIVISOR: f64 = 1_000_000.0;

/// What a sanitization pass changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SanitizeReport {
    /// Denylisted columns that were present and removed.
    pub dropped_columns: Vec<String>,
    /// Per column, how many values were coerced to missing.
    pub coerced_to_missing: BTreeMap<String, usize>,
    /// `vote_average` values nulled because `vote_count` was zero.
    pub votes_nulled: usize,
    /// Text values mapped to missing.
    pub text_values_nulled: usize,
    pub duplicates_removed: usize,
    /// Columns removed for exceeding the missing-value threshold.
    pub pruned_columns: Vec<String>,
}

/// Applies the fixed sanitization sequence to a movie frame.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    config: PipelineConfig,
}

impl Sanitizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Run all six steps in order.
    pub fn sanitize(&self, df: &DataFrame) -> Result<(DataFrame, SanitizeReport)> {
        self.check_key_columns(df)?;

        let (df, dropped_columns) = self.drop_columns(df);
        let (df, coerced_to_missing) = self.coerce_types(&df)?;
        let (df, votes_nulled) = self.clean_numeric_fields(&df)?;
        let (df, text_values_nulled) = self.clean_text_fields(&df)?;
        let (df, duplicates_removed) = self.drop_duplicate_rows(&df)?;
        let (df, pruned_columns) = self.drop_sparse_columns(&df);

        Ok((
            df,
            SanitizeReport {
                dropped_columns,
                coerced_to_missing,
                votes_nulled,
                text_values_nulled,
                duplicates_removed,
                pruned_columns,
            },
        ))
    }

    /// Fail if a deduplication key column is absent.
    pub fn check_key_columns(&self, df: &DataFrame) -> Result<()> {
        match self
            .config
            .dedupe_key_columns
            .iter()
            .find(|key| !has_column(df, key))
        {
            Some(key) => Err(PipelineError::MissingKeyColumn(key.clone())),
            None => Ok(()),
        }
    }

    /// Step 1: drop the denylisted columns that are present.
    pub fn drop_columns(&self, df: &DataFrame) -> (DataFrame, Vec<String>) {
        let present: Vec<String> = self
            .config
            .drop_columns
            .iter()
            .filter(|c| has_column(df, c))
            .cloned()
            .collect();

        if present.is_empty() {
            return (df.clone(), present);
        }

        let cols_ref: Vec<PlSmallStr> = present.iter().map(|s| s.as_str().into()).collect();
        info!("Dropped columns: {:?}", present);
        (df.drop_many(cols_ref), present)
    }

    /// Step 2: coerce numeric columns to Float64 and the date column to Date.
    pub fn coerce_types(&self, df: &DataFrame) -> Result<(DataFrame, BTreeMap<String, usize>)> {
        let mut df = df.clone();
        let mut coerced = BTreeMap::new();

        for col_name in &self.config.numeric_columns {
            if !has_column(&df, col_name) {
                continue;
            }
            let series = df.column(col_name)?.as_materialized_series().clone();
            let (converted, lost) = converters::coerce_numeric(&series)?;
            df.with_column(converted)?;
            if lost > 0 {
                debug!("Coerced {} unparseable values to missing in '{}'", lost, col_name);
                coerced.insert(col_name.clone(), lost);
            }
        }

        if let Some(date_col) = &self.config.date_column
            && has_column(&df, date_col)
        {
            let series = df.column(date_col)?.as_materialized_series().clone();
            let (converted, lost) = converters::coerce_date(&series)?;
            df.with_column(converted)?;
            if lost > 0 {
                debug!("Coerced {} unparseable dates to missing in '{}'", lost, date_col);
                coerced.insert(date_col.clone(), lost);
            }
        }

        Ok((df, coerced))
    }

    /// Step 3: zero as missing, rescale monetary columns to millions and
    /// rename them, and drop ratings backed by zero votes.
    pub fn clean_numeric_fields(&self, df: &DataFrame) -> Result<(DataFrame, usize)> {
        let mut df = df.clone();

        for col_name in &self.config.zero_as_missing_columns {
            if !has_column(&df, col_name) {
                continue;
            }
            let series = df
                .column(col_name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            df.with_column(sanitizers::null_zeros(&series)?)?;
        }

        for (source, target) in MONETARY_COLUMNS {
            if !has_column(&df, source) {
                continue;
            }
            if has_column(&df, target) {
                debug!("Skipped rescaling '{}': '{}' already exists", source, target);
                continue;
            }
            let series = df
                .column(source)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            df.with_column(sanitizers::rescale(&series, MONETARY_DIVISOR)?)?;
            df.rename(source, target.into())?;
            debug!("Rescaled '{}' to millions as '{}'", source, target);
        }

        let mut votes_nulled = 0;
        if has_column(&df, "vote_average") && has_column(&df, "vote_count") {
            let (guarded, nulled) = sanitizers::null_where_zero_count(
                df.column("vote_average")?.as_materialized_series(),
                df.column("vote_count")?.as_materialized_series(),
            )?;
            df.with_column(guarded)?;
            votes_nulled = nulled;
        }

        Ok((df, votes_nulled))
    }

    /// Step 4: placeholder normalization and trimming of text columns.
    pub fn clean_text_fields(&self, df: &DataFrame) -> Result<(DataFrame, usize)> {
        let mut df = df.clone();
        let mut total = 0;

        for col_name in &self.config.text_columns {
            if !has_column(&df, col_name) {
                continue;
            }
            let series = df.column(col_name)?.as_materialized_series().clone();
            let (cleaned, nulled) =
                sanitizers::clean_text(&series, &self.config.text_placeholders)?;
            df.with_column(cleaned)?;
            total += nulled;
        }

        Ok((df, total))
    }

    /// Step 5: keep the first row of each key combination.
    pub fn drop_duplicate_rows(&self, df: &DataFrame) -> Result<(DataFrame, usize)> {
        let mut key_columns = Vec::with_capacity(self.config.dedupe_key_columns.len());
        for key in &self.config.dedupe_key_columns {
            let values = column_strings(df, key)?
                .ok_or_else(|| PipelineError::MissingKeyColumn(key.clone()))?;
            key_columns.push(values);
        }

        let mut seen: HashSet<Vec<Option<String>>> = HashSet::with_capacity(df.height());
        let keep: Vec<bool> = (0..df.height())
            .map(|row| {
                let key: Vec<Option<String>> =
                    key_columns.iter().map(|col| col[row].clone()).collect();
                seen.insert(key)
            })
            .collect();

        let removed = keep.iter().filter(|k| !**k).count();
        if removed == 0 {
            return Ok((df.clone(), 0));
        }

        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        let deduped = df.filter(&mask)?;
        info!("Removed {} duplicate rows", removed);
        Ok((deduped, removed))
    }

    /// Step 6: drop columns whose missing count exceeds the threshold.
    ///
    /// Key columns, the raw credits column and the columns derived from it
    /// are never pruned, so a re-run over normalized output keeps them.
    pub fn drop_sparse_columns(&self, df: &DataFrame) -> (DataFrame, Vec<String>) {
        let threshold = self.config.nan_column_drop_threshold;
        let sparse: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > threshold)
            .map(|col| col.name().to_string())
            .filter(|name| !self.is_protected(name))
            .collect();

        if sparse.is_empty() {
            return (df.clone(), sparse);
        }

        info!(
            "Dropped {} columns with more than {} missing values: {:?}",
            sparse.len(),
            threshold,
            sparse
        );
        let cols_ref: Vec<PlSmallStr> = sparse.iter().map(|s| s.as_str().into()).collect();
        (df.drop_many(cols_ref), sparse)
    }

    fn is_protected(&self, column: &str) -> bool {
        self.config.dedupe_key_columns.iter().any(|key| key == column)
            || column == self.config.credits_column
            || CREDIT_COLUMNS.contains(&column)
    }
}

// =============================================================================
// Tests
// =============================================================================
