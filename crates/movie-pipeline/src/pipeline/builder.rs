//! The `Pipeline` struct and its builder.

use std::sync::Arc;
use std::time::Instant;

use polars::prelude::*;
use tracing::{error, info, warn};

use crate::analysis::{AnalysisReport, MovieAnalyzer};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::io::{RawRecord, records_to_frame};
use crate::metrics::MetricEngine;
use crate::pipeline::normalizer::{NormalizationOutcome, Normalizer};
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate,
};
use crate::types::{PipelineResult, PipelineSummary};
use crate::utils::data_quality_score;

/// The movie pipeline: normalization, KPI computation and analysis.
///
/// Use [`Pipeline::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use movie_pipeline::{Pipeline, PipelineConfig};
///
/// let result = Pipeline::builder()
///     .config(PipelineConfig::default())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(&raw)?;
///
/// // Or run a single stage
/// let pipeline = Pipeline::builder().build()?;
/// let normalized = pipeline.normalize(&raw)?.frame;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    normalizer: Normalizer,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Normalization stage: parse, sanitize and extract credits.
    pub fn normalize(&self, raw: &DataFrame) -> Result<NormalizationOutcome> {
        self.normalizer.normalize(raw)
    }

    /// KPI stage: add `profit` and `roi` to a normalized frame.
    pub fn compute_kpis(&self, normalized: &DataFrame) -> Result<MetricEngine> {
        MetricEngine::new(normalized, self.config.roi_eligibility_budget_floor_musd)
    }

    /// Analysis stage: the full report over a KPI frame.
    pub fn analyze(&self, kpi: &DataFrame) -> Result<AnalysisReport> {
        let analyzer = MovieAnalyzer::new(kpi, self.config.list_delimiter)?;
        Ok(analyzer.full_report(&self.config.analysis))
    }

    /// Run every stage over raw records.
    pub fn process_records(&self, records: &[RawRecord]) -> Result<PipelineResult> {
        if records.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        self.process(&records_to_frame(records)?)
    }

    /// Run every stage over a raw frame.
    pub fn process(&self, raw: &DataFrame) -> Result<PipelineResult> {
        self.finish_run(self.process_internal(raw))
    }

    /// Run the KPI and analysis stages over a frame normalized by an earlier
    /// run, such as a reloaded `cleaned_tmdb_movies.csv`.
    ///
    /// `raw` only supplies the "before" shape of the summary; it is not
    /// normalized again.
    pub fn resume(&self, raw: &DataFrame, normalized: DataFrame) -> Result<PipelineResult> {
        self.finish_run(self.resume_internal(raw, normalized))
    }

    fn finish_run(&self, outcome: Result<PipelineResult>) -> Result<PipelineResult> {
        match outcome {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    fn start_run(&self, raw: &DataFrame) -> Result<PipelineSummary> {
        info!("Starting movie pipeline...");
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Initializing,
            0.0,
            "Starting movie pipeline...",
        ));

        if raw.width() == 0 {
            return Err(PipelineError::EmptyInput);
        }

        let mut summary = PipelineSummary::new();
        summary.rows_before = raw.height();
        summary.columns_before = raw.width();
        Ok(summary)
    }

    fn process_internal(&self, raw: &DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let mut summary = self.start_run(raw)?;

        // Step 1: Normalization
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Normalizing,
            0.0,
            "Normalizing raw records...",
        ));
        info!("Step 1: Normalizing raw records...");

        let outcome = self.normalize(raw)?;
        let counts = outcome.counts();
        summary.dropped_columns = outcome.sanitize.dropped_columns.clone();
        summary.pruned_columns = outcome.sanitize.pruned_columns.clone();
        summary.duplicates_removed = outcome.sanitize.duplicates_removed;
        summary.undecodable_values = counts.undecodable_values;
        summary.coerced_to_missing = counts.coerced_to_missing;
        summary.credits = outcome.credits.clone();

        let normalized = outcome.frame;
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Normalizing,
            1.0,
            format!(
                "Normalized {} rows into {} rows",
                raw.height(),
                normalized.height()
            ),
        ));

        self.analyze_normalized(normalized, summary, start_time)
    }

    fn resume_internal(&self, raw: &DataFrame, normalized: DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let mut summary = self.start_run(raw)?;

        info!(
            "Step 1: Reusing normalized frame ({} rows x {} columns)",
            normalized.height(),
            normalized.width()
        );
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Normalizing,
            1.0,
            "Reused existing normalized frame",
        ));
        summary.add_warning("Normalization skipped: reused an existing normalized frame");

        self.analyze_normalized(normalized, summary, start_time)
    }

    fn analyze_normalized(
        &self,
        normalized: DataFrame,
        mut summary: PipelineSummary,
        start_time: Instant,
    ) -> Result<PipelineResult> {
        for warning in validation_warnings(&normalized) {
            warn!("{}", warning);
            summary.add_warning(warning);
        }

        // Step 2: KPIs
        self.report_progress(ProgressUpdate::new(
            PipelineStage::ComputingMetrics,
            0.0,
            "Computing profit and ROI...",
        ));
        info!("Step 2: Computing KPIs...");

        let engine = self.compute_kpis(&normalized)?;
        let rankings = engine.summarize();
        summary.kpi = Some(engine.stats()?);
        summary.ranking_failures = rankings.failures();

        self.report_progress(ProgressUpdate::new(
            PipelineStage::ComputingMetrics,
            1.0,
            format!("{} movies are ROI-eligible", engine.roi_eligible().height()),
        ));

        // Step 3: Analysis
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Analyzing,
            0.0,
            "Building analysis report...",
        ));
        info!("Step 3: Building analysis report...");

        let kpi = engine.into_frame();
        let report = self.analyze(&kpi)?;
        summary.report_sections = report.len();
        summary.report_errors = report.errors();

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Analyzing,
            1.0,
            format!("Built {} report sections", report.len()),
        ));

        // Finalize summary
        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        summary.rows_after = normalized.height();
        summary.columns_after = normalized.width();
        summary.data_quality_score = data_quality_score(&normalized);

        if summary.rows_removed_percentage() > 30.0 {
            summary.add_warning(format!(
                "High data loss: {:.1}% of rows were removed",
                summary.rows_removed_percentage()
            ));
        }

        Ok(PipelineResult {
            normalized,
            kpi,
            rankings,
            report,
            summary,
        })
    }
}

/// Post-normalization findings that do not stop a run.
pub fn validation_warnings(df: &DataFrame) -> Vec<String> {
    let mut warnings = Vec::new();

    if df.height() == 0 {
        warnings.push("Normalized frame has no rows".to_string());
        return warnings;
    }
    if let Ok(ids) = df.column("id")
        && ids.null_count() > 0
    {
        warnings.push(format!("{} rows have a missing id", ids.null_count()));
    }
    if let Ok(titles) = df.column("title")
        && titles.null_count() == df.height()
    {
        warnings.push("Column 'title' is entirely missing".to_string());
    }

    warnings
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// ```rust,ignore
    /// let pipeline = Pipeline::builder()
    ///     .on_progress(|update| {
    ///         println!("[{:.0}%] {:?}: {}", update.progress * 100.0, update.stage, update.message);
    ///     })
    ///     .build()?;
    /// ```
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            normalizer: Normalizer::new(&config),
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::CreditsOutcome;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn records() -> Vec<RawRecord> {
        json!([
            {"id": 1, "title": "Big", "budget": 100000000, "revenue": 900000000, "vote_count": 10, "vote_average": 7.0},
            {"id": 2, "title": "Small", "budget": 5000000, "revenue": 50000000, "vote_count": 0, "vote_average": 9.0}
        ])
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
    }

    #[test]
    fn test_pipeline_builder_default() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(pipeline.progress_reporter.is_none());
        assert_eq!(pipeline.config().nan_column_drop_threshold, 10);
    }

    #[test]
    fn test_pipeline_builder_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.roi_eligibility_budget_floor_musd = -1.0;
        assert!(Pipeline::builder().config(config).build().is_err());
    }

    #[test]
    fn test_pipeline_builder_with_progress_callback() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let pipeline = Pipeline::builder()
            .on_progress(move |_update| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .unwrap();

        pipeline.report_progress(ProgressUpdate::new(PipelineStage::Normalizing, 0.5, "Test"));

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_process_reports_stages_in_order() {
        let stages = Arc::new(Mutex::new(Vec::new()));
        let stages_clone = stages.clone();

        let result = Pipeline::builder()
            .on_progress(move |update| {
                stages_clone.lock().unwrap().push(update.stage);
            })
            .build()
            .unwrap()
            .process_records(&records())
            .unwrap();

        let mut seen = stages.lock().unwrap().clone();
        seen.dedup();
        assert_eq!(
            seen,
            vec![
                PipelineStage::Initializing,
                PipelineStage::Normalizing,
                PipelineStage::ComputingMetrics,
                PipelineStage::Analyzing,
                PipelineStage::Complete,
            ]
        );
        assert_eq!(result.kpi.height(), 2);
        assert_eq!(result.summary.kpi.as_ref().unwrap().roi_eligible, 1);
        assert_eq!(result.summary.report_sections, result.report.len());
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let pipeline = Pipeline::builder().build().unwrap();
        assert!(matches!(
            pipeline.process_records(&[]),
            Err(PipelineError::EmptyInput)
        ));
    }

    #[test]
    fn test_failure_is_reported() {
        let failed = Arc::new(AtomicUsize::new(0));
        let failed_clone = failed.clone();
        let pipeline = Pipeline::builder()
            .on_progress(move |update| {
                if update.stage == PipelineStage::Failed {
                    failed_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build()
            .unwrap();

        let df = df!["title" => ["No id"]].unwrap();
        let err = pipeline.process(&df).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(failed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resume_matches_full_run() {
        let pipeline = Pipeline::builder().build().unwrap();
        let raw = records_to_frame(&records()).unwrap();
        let full = pipeline.process(&raw).unwrap();

        let resumed = pipeline.resume(&raw, full.normalized.clone()).unwrap();
        assert!(resumed.kpi.equals_missing(&full.kpi));
        assert_eq!(resumed.rankings, full.rankings);
        assert_eq!(resumed.summary.rows_before, 2);
        assert_eq!(resumed.summary.credits, CreditsOutcome::Skipped);
        assert!(
            resumed
                .summary
                .warnings
                .iter()
                .any(|w| w.starts_with("Normalization skipped"))
        );
    }

    #[test]
    fn test_validation_warnings() {
        let df = df![
            "id" => [Some(1.0), None],
            "title" => [None::<&str>, None],
        ]
        .unwrap();
        let warnings = validation_warnings(&df);
        assert_eq!(
            warnings,
            vec![
                "1 rows have a missing id".to_string(),
                "Column 'title' is entirely missing".to_string(),
            ]
        );

        let empty = df!["id" => Vec::<f64>::new()].unwrap();
        assert_eq!(validation_warnings(&empty), vec!["Normalized frame has no rows".to_string()]);
    }
}
