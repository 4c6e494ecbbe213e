use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::analysis::AnalysisReport;
use crate::error::Result;
use crate::io::{load_csv_with_fallbacks, write_csv};
use crate::metrics::RankingSummary;
use crate::types::{PipelineResult, PipelineSummary};

/// Raw records as extracted, one row per record.
pub const RAW_FILE: &str = "rawextracted_tmdb_movies.csv";
/// Output of the normalization stage.
pub const CLEANED_FILE: &str = "cleaned_tmdb_movies.csv";
/// Normalized frame plus `profit` and `roi`.
pub const KPI_FILE: &str = "movies_with_kpi.csv";
pub const REPORT_FILE: &str = "analysis_report.json";

// ============================================================================
// Execution Report
// ============================================================================

/// Everything a run produced that is worth keeping, in one serializable value.
///
/// Printed to stdout with `--json` and written to [`REPORT_FILE`].
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    /// Local time the report was built, `YYYY-MM-DD HH:MM:SS`.
    pub generated_at: String,
    /// Where the raw records came from (a path or `tmdb`).
    pub input: String,
    /// Directory the intermediate files were written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    pub summary: PipelineSummary,
    pub rankings: RankingSummary,
    pub analysis: AnalysisReport,
}

impl ExecutionReport {
    /// Build a report from a finished run.
    pub fn build(input: &str, output_dir: Option<&Path>, result: &PipelineResult) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input: input.to_string(),
            output_dir: output_dir.map(|p| p.display().to_string()),
            summary: result.summary.clone(),
            rankings: result.rankings.clone(),
            analysis: result.report.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Report Writer
// ============================================================================

/// Persists intermediate frames and the execution report under one directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
        }
    }
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn exists(&self, file_name: &str) -> bool {
        self.path(file_name).is_file()
    }

    /// Write a frame as CSV under the output directory.
    pub fn write_frame(&self, df: &DataFrame, file_name: &str) -> Result<PathBuf> {
        let path = self.path(file_name);
        write_csv(df, &path)?;
        info!("Saved {} rows to {}", df.height(), path.display());
        Ok(path)
    }

    /// Reload a frame written by an earlier run.
    pub fn read_frame(&self, file_name: &str) -> Result<DataFrame> {
        let path = self.path(file_name);
        let df = load_csv_with_fallbacks(&path)?;
        info!("Loaded {} rows from {}", df.height(), path.display());
        Ok(df)
    }

    /// Write any serializable value as pretty-printed JSON.
    pub fn write_json<T: Serialize>(&self, value: &T, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self.path(file_name);
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;

        info!("Report saved: {}", path.display());
        Ok(path)
    }

    /// Write the execution report to [`REPORT_FILE`].
    pub fn write_report(&self, report: &ExecutionReport) -> Result<PathBuf> {
        self.write_json(report, REPORT_FILE)
    }
}

// ============================================================================
// Tests
// ============================================================================
