//! Custom error types for the movie pipeline.
//!
//! Only configuration problems surface as errors: a missing key column,
//! an absent required input column, an invalid parameter. Per-value decode
//! failures and unavailable rankings are data, not errors, and never reach
//! this type.
//!
//! Errors are serializable so the CLI can embed them in JSON reports.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the movie pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A column the stage cannot run without is absent.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A declared deduplication key column is absent.
    #[error("Column '{0}' required for duplicate removal not found in dataset")]
    MissingKeyColumn(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The input held no records at all.
    #[error("Input data is empty")]
    EmptyInput,

    /// A record source could not produce any records.
    #[error("Record source '{source_name}' unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (catalog source, only with "tmdb" feature).
    #[cfg(feature = "tmdb")]
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl From<ConfigValidationError> for PipelineError {
    fn from(err: ConfigValidationError) -> Self {
        PipelineError::InvalidConfig(err.to_string())
    }
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::MissingKeyColumn(_) => "MISSING_KEY_COLUMN",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::EmptyInput => "EMPTY_INPUT",
            Self::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "tmdb")]
            Self::Http(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error was caused by configuration rather than by the
    /// environment (file system, network, dataframe engine).
    pub fn is_config_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::MissingKeyColumn(_) | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_config_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(PipelineError::EmptyInput.error_code(), "EMPTY_INPUT");
        assert_eq!(
            PipelineError::MissingKeyColumn("id".to_string()).error_code(),
            "MISSING_KEY_COLUMN"
        );
    }

    #[test]
    fn test_is_config_error() {
        assert!(PipelineError::ColumnNotFound("budget_musd".to_string()).is_config_error());
        assert!(PipelineError::MissingKeyColumn("title".to_string()).is_config_error());
        assert!(!PipelineError::EmptyInput.is_config_error());
        assert!(
            PipelineError::InvalidConfig("bad".to_string())
                .with_context("Loading config")
                .is_config_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::ColumnNotFound("revenue_musd".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("revenue_musd"));
    }

    #[test]
    fn test_with_context() {
        let error =
            PipelineError::MissingKeyColumn("id".to_string()).with_context("During normalization");
        assert!(error.to_string().contains("During normalization"));
        assert_eq!(error.error_code(), "MISSING_KEY_COLUMN");
    }

    #[test]
    fn test_from_config_validation_error() {
        let error: PipelineError = ConfigValidationError::InvalidTopN(0).into();
        assert_eq!(error.error_code(), "INVALID_CONFIG");
        assert!(error.to_string().contains("top_n"));
    }
}
