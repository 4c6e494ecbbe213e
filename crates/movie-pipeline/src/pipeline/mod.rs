//! Pipeline module.
//!
//! Sequences normalization, KPI computation and analysis, and reports
//! progress along the way.

mod builder;
pub mod normalizer;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder, validation_warnings};
pub use normalizer::{NormalizationCounts, NormalizationOutcome, Normalizer, reorder_columns};
pub use progress::{ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate};
