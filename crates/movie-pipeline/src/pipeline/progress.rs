//! Progress reporting for the movie pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use movie_pipeline::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(raw)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Validating configuration and input shape
    Initializing,
    /// Parsing, coercing, sanitizing and extracting credits
    Normalizing,
    /// Deriving profit and ROI
    ComputingMetrics,
    /// Rankings and the analysis report
    Analyzing,
    /// Run finished successfully
    Complete,
    /// Run stopped with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Normalizing => "Normalizing Records",
            Self::ComputingMetrics => "Computing Metrics",
            Self::Analyzing => "Analyzing",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the overall run taken by this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::Normalizing => 0.55,
            Self::ComputingMetrics => 0.15,
            Self::Analyzing => 0.25,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Normalizing => 0.05,
            Self::ComputingMetrics => 0.60,
            Self::Analyzing => 0.75,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: PipelineStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within the current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: PipelineStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates during a run.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(PipelineStage::Normalizing, 0.5, "Parsing...");
        assert_eq!(update.stage, PipelineStage::Normalizing);
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.325).abs() < 1e-6);
        assert_eq!(update.message, "Parsing...");
    }

    #[test]
    fn test_stage_weights_sum() {
        let stages = [
            PipelineStage::Initializing,
            PipelineStage::Normalizing,
            PipelineStage::ComputingMetrics,
            PipelineStage::Analyzing,
        ];
        let total: f32 = stages.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 0.01, "Weights should sum to ~1.0");

        // Each stage starts where the previous one ends.
        for pair in stages.windows(2) {
            let end = pair[0].base_progress() + pair[0].weight();
            assert!((end - pair[1].base_progress()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_closure_progress_reporter() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(ProgressUpdate::new(PipelineStage::Analyzing, 0.5, "Test"));
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stage_json_values() {
        let expectations = [
            (PipelineStage::Initializing, "\"initializing\""),
            (PipelineStage::Normalizing, "\"normalizing\""),
            (PipelineStage::ComputingMetrics, "\"computing_metrics\""),
            (PipelineStage::Analyzing, "\"analyzing\""),
            (PipelineStage::Complete, "\"complete\""),
            (PipelineStage::Failed, "\"failed\""),
        ];

        for (stage, expected) in expectations {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, expected, "{:?} should serialize to {}", stage, expected);
        }
    }
}
