//! Movie Pipeline Library
//!
//! Normalization, KPI computation and analytics for movie catalog records,
//! built with Rust and Polars.
//!
//! # Overview
//!
//! Raw catalog records (JSON objects from TMDB, or rows of a persisted CSV)
//! go through three stages:
//!
//! - **Normalization**: sub-document fields are decoded into delimiter-joined
//!   names, types are coerced, monetary columns are rescaled to millions,
//!   text placeholders become missing, duplicates and sparse columns are
//!   dropped, and cast/crew/director lists are extracted from the credits
//! - **Metrics**: `profit` and `roi` are derived and ten named rankings are
//!   evaluated, each independently
//! - **Analysis**: franchise vs standalone comparisons, franchise and director
//!   leaderboards and filtered movie listings, assembled into an ordered report
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use movie_pipeline::io::load_json_records;
//! use movie_pipeline::{Pipeline, PipelineConfig};
//!
//! let records = load_json_records("movies.json")?;
//!
//! let result = Pipeline::builder()
//!     .config(PipelineConfig::default())
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process_records(&records)?;
//!
//! for (key, description) in result.rankings.descriptions() {
//!     println!("{}: {}", key, description);
//! }
//! println!("{}", serde_json::to_string_pretty(&result.report)?);
//! ```
//!
//! # Configuration
//!
//! Every column list, placeholder set and threshold lives in
//! [`PipelineConfig`]:
//!
//! ```rust,ignore
//! use movie_pipeline::PipelineConfig;
//!
//! let config = PipelineConfig::builder()
//!     .nan_column_drop_threshold(25)
//!     .roi_eligibility_budget_floor_musd(5.0)
//!     .list_delimiter(';')
//!     .build()?;
//! ```
//!
//! # Record Sources
//!
//! [`source::JsonFileSource`] reads records from disk. With the `tmdb`
//! feature (on by default), [`source::TmdbSource`] fetches them from the
//! TMDB API.

pub mod analysis;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod io;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod reporting;
pub mod source;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{
    Aggregate, AnalysisReport, GroupValue, MovieAnalyzer, MovieCategory, SectionContent, SumMean,
};
pub use cleaner::{SanitizeReport, Sanitizer};
pub use config::{AnalysisQueries, ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, ResultExt};
pub use io::RawRecord;
pub use metrics::{MetricEngine, Ranking, RankingOutcome, RankingSummary};
pub use parser::{CreditsExtractor, CreditsOutcome, FieldParser, SubDocument};
pub use pipeline::{
    ClosureProgressReporter, NormalizationOutcome, Normalizer, Pipeline, PipelineBuilder,
    PipelineStage, ProgressReporter, ProgressUpdate,
};
pub use reporting::{ExecutionReport, ReportWriter};
pub use source::RecordSource;
pub use types::{PipelineResult, PipelineSummary};
