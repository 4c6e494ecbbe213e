use polars::prelude::DataFrame;
use serde::Serialize;

use crate::analysis::AnalysisReport;
use crate::metrics::{KpiStats, RankingSummary};
use crate::parser::CreditsOutcome;

/// Everything a full pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Output of the normalization stage.
    pub normalized: DataFrame,
    /// Normalized frame plus `profit` and `roi`.
    pub kpi: DataFrame,
    pub rankings: RankingSummary,
    pub report: AnalysisReport,
    pub summary: PipelineSummary,
}

// ============================================================================
// Run Summary
// ============================================================================

/// Serializable account of what a run did.
///
/// # Example
///
/// ```rust,ignore
/// let summary = result.summary;
/// println!("Normalized {} rows in {}ms", summary.rows_after, summary.duration_ms);
/// println!("Data quality: {:.1}%", summary.data_quality_score);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    /// Denylisted columns removed before parsing.
    pub dropped_columns: Vec<String>,
    /// Columns removed for exceeding the missing-value threshold.
    pub pruned_columns: Vec<String>,
    pub duplicates_removed: usize,

    /// Sub-document cells that could not be decoded.
    pub undecodable_values: usize,
    /// Numeric and date values that could not be parsed.
    pub coerced_to_missing: usize,

    pub credits: CreditsOutcome,

    /// Percentage of non-null cells in the normalized frame.
    pub data_quality_score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpi: Option<KpiStats>,

    pub ranking_failures: usize,
    pub report_sections: usize,
    pub report_errors: usize,

    /// Validation findings that did not stop the run.
    pub warnings: Vec<String>,
}

impl Default for PipelineSummary {
    fn default() -> Self {
        Self {
            duration_ms: 0,
            rows_before: 0,
            rows_after: 0,
            columns_before: 0,
            columns_after: 0,
            dropped_columns: Vec::new(),
            pruned_columns: Vec::new(),
            duplicates_removed: 0,
            undecodable_values: 0,
            coerced_to_missing: 0,
            credits: CreditsOutcome::Skipped,
            data_quality_score: 100.0,
            kpi: None,
            ranking_failures: 0,
            report_sections: 0,
            report_errors: 0,
            warnings: Vec::new(),
        }
    }
}

impl PipelineSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Rows removed by normalization.
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    pub fn rows_removed_percentage(&self) -> f64 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed() as f64 / self.rows_before as f64) * 100.0
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
