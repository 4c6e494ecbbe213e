//! The normalization stage: field parsing, sanitization and credits
//! extraction in their fixed order.

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::cleaner::{SanitizeReport, Sanitizer};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::parser::{ColumnParseStats, CreditsExtractor, CreditsOutcome, FieldParser};

/// A normalized frame and what each step did to it.
#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    pub frame: DataFrame,
    pub sanitize: SanitizeReport,
    pub parse_stats: Vec<ColumnParseStats>,
    pub credits: CreditsOutcome,
}

/// Counts carried into the pipeline summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationCounts {
    pub undecodable_values: usize,
    pub coerced_to_missing: usize,
    pub votes_nulled: usize,
    pub text_values_nulled: usize,
}

impl NormalizationOutcome {
    pub fn counts(&self) -> NormalizationCounts {
        NormalizationCounts {
            undecodable_values: self.parse_stats.iter().map(|s| s.undecodable).sum(),
            coerced_to_missing: self.sanitize.coerced_to_missing.values().sum(),
            votes_nulled: self.sanitize.votes_nulled,
            text_values_nulled: self.sanitize.text_values_nulled,
        }
    }
}

/// Runs parse, sanitize and credits extraction over a raw frame.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: PipelineConfig,
    sanitizer: Sanitizer,
    parser: FieldParser,
    credits: CreditsExtractor,
}

impl Normalizer {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            config: config.clone(),
            sanitizer: Sanitizer::new(config),
            parser: FieldParser::new(config.list_delimiter),
            credits: CreditsExtractor::new(
                config.credits_column.clone(),
                config.director_job.clone(),
                config.list_delimiter,
            ),
        }
    }

    /// Normalize a raw frame.
    ///
    /// Key columns are checked before any row is touched. Re-running on the
    /// output returns an identical frame.
    pub fn normalize(&self, raw: &DataFrame) -> Result<NormalizationOutcome> {
        self.sanitizer.check_key_columns(raw)?;

        let (df, dropped_columns) = self.sanitizer.drop_columns(raw);
        let (df, parse_stats) = self
            .parser
            .parse_columns(&df, &self.config.sub_document_columns)
            .context("Failed to parse sub-document columns")?;
        let (df, coerced_to_missing) = self.sanitizer.coerce_types(&df)?;
        let (df, votes_nulled) = self.sanitizer.clean_numeric_fields(&df)?;
        let (df, text_values_nulled) = self.sanitizer.clean_text_fields(&df)?;
        let (df, duplicates_removed) = self.sanitizer.drop_duplicate_rows(&df)?;
        let (df, pruned_columns) = self.sanitizer.drop_sparse_columns(&df);
        let (df, credits) = self
            .credits
            .extract(&df)
            .context("Failed to extract credits")?;
        let frame = reorder_columns(&df, &self.config.column_order)?;

        info!(
            "Normalized {} raw rows into {} rows x {} columns",
            raw.height(),
            frame.height(),
            frame.width()
        );

        Ok(NormalizationOutcome {
            frame,
            sanitize: SanitizeReport {
                dropped_columns,
                coerced_to_missing,
                votes_nulled,
                text_values_nulled,
                duplicates_removed,
                pruned_columns,
            },
            parse_stats,
            credits,
        })
    }
}

/// Listed columns first, in listed order; the rest keep their relative order.
pub fn reorder_columns(df: &DataFrame, order: &[String]) -> Result<DataFrame> {
    let existing: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|c| c.to_string())
        .collect();

    let mut columns: Vec<String> = order
        .iter()
        .filter(|c| existing.contains(c))
        .cloned()
        .collect();
    columns.extend(existing.iter().filter(|c| !order.contains(c)).cloned());

    if columns == existing {
        return Ok(df.clone());
    }
    debug!("Reordered columns: {:?}", columns);
    Ok(df.select(columns)?)
}
