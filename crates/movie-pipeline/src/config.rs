//! Configuration types for the movie pipeline.
//!
//! Every column list, placeholder set and threshold the stages use lives
//! here so callers can override them; the defaults describe the TMDB movie
//! schema.

use serde::{Deserialize, Serialize};

/// Parameters of the filtered queries in the analysis report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisQueries {
    /// Genre matched (case-insensitive substring) by the top-N genre query.
    /// Default: "Science Fiction"
    pub genre: String,

    /// Cast member matched alongside `genre`.
    /// Default: "Harrison Ford"
    pub genre_actor: String,

    /// Maximum rows returned by the top-N genre query.
    /// Default: 5
    pub top_n: usize,

    /// Cast member matched by the cast/director query.
    /// Default: "Uma Thurman"
    pub actor: String,

    /// Director matched by the cast/director query.
    /// Default: "Quentin Tarantino"
    pub director: String,
}

impl Default for AnalysisQueries {
    fn default() -> Self {
        Self {
            genre: "Science Fiction".to_string(),
            genre_actor: "Harrison Ford".to_string(),
            top_n: 5,
            actor: "Uma Thurman".to_string(),
            director: "Quentin Tarantino".to_string(),
        }
    }
}

/// Configuration for the movie pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API. Partial JSON documents deserialize with the
/// remaining fields at their defaults.
///
/// # Example
///
/// ```rust,ignore
/// use movie_pipeline::config::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .nan_column_drop_threshold(25)
///     .roi_eligibility_budget_floor_musd(5.0)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Columns removed before any parsing.
    /// Default: adult, imdb_id, original_title, video, homepage
    pub drop_columns: Vec<String>,

    /// Columns holding encoded sub-documents, routed through the field parser.
    /// Default: genres, spoken_languages, production_companies,
    /// production_countries, belongs_to_collection
    pub sub_document_columns: Vec<String>,

    /// Columns coerced to Float64; unparseable values become null.
    /// Default: budget, id, popularity, revenue, runtime, vote_average, vote_count
    pub numeric_columns: Vec<String>,

    /// Numeric columns where a literal zero means "unknown".
    /// Default: budget, revenue, runtime
    pub zero_as_missing_columns: Vec<String>,

    /// Column coerced to a calendar date. None disables date coercion.
    /// Default: "release_date"
    pub date_column: Option<String>,

    /// Free-text columns that get placeholder normalization and trimming.
    /// Default: overview, tagline
    pub text_columns: Vec<String>,

    /// Exact (case-sensitive) strings treated as missing text.
    /// Default: "No Data", "No overview available.", "None", "", "nan", "N/A"
    pub text_placeholders: Vec<String>,

    /// Identity columns for duplicate removal.
    /// Default: id, title
    pub dedupe_key_columns: Vec<String>,

    /// Columns with more missing values than this are dropped.
    /// Default: 10
    pub nan_column_drop_threshold: usize,

    /// Minimum `budget_musd` for a movie to enter ROI rankings.
    /// Default: 10.0
    pub roi_eligibility_budget_floor_musd: f64,

    /// Delimiter joining multi-valued names. Names containing it have it
    /// replaced with '/'.
    /// Default: '|'
    pub list_delimiter: char,

    /// Crew job that marks a director.
    /// Default: "Director"
    pub director_job: String,

    /// Column holding the nested credits sub-document.
    /// Default: "credits"
    pub credits_column: String,

    /// Canonical leading column order of the normalized output; columns not
    /// listed follow in their existing order.
    pub column_order: Vec<String>,

    /// Parameters of the filtered analysis queries.
    pub analysis: AnalysisQueries,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            drop_columns: strings(&["adult", "imdb_id", "original_title", "video", "homepage"]),
            sub_document_columns: strings(&[
                "genres",
                "spoken_languages",
                "production_companies",
                "production_countries",
                "belongs_to_collection",
            ]),
            numeric_columns: strings(&[
                "budget",
                "id",
                "popularity",
                "revenue",
                "runtime",
                "vote_average",
                "vote_count",
            ]),
            zero_as_missing_columns: strings(&["budget", "revenue", "runtime"]),
            date_column: Some("release_date".to_string()),
            text_columns: strings(&["overview", "tagline"]),
            text_placeholders: strings(&[
                "No Data",
                "No overview available.",
                "None",
                "",
                "nan",
                "N/A",
            ]),
            dedupe_key_columns: strings(&["id", "title"]),
            nan_column_drop_threshold: 10,
            roi_eligibility_budget_floor_musd: 10.0,
            list_delimiter: '|',
            director_job: "Director".to_string(),
            credits_column: "credits".to_string(),
            column_order: strings(&[
                "id",
                "title",
                "tagline",
                "release_date",
                "genres",
                "belongs_to_collection",
                "original_language",
                "budget_musd",
                "revenue_musd",
                "production_companies",
                "production_countries",
                "vote_count",
                "vote_average",
                "popularity",
                "runtime",
                "overview",
                "spoken_languages",
                "poster_path",
                "cast",
                "cast_size",
                "crew_size",
            ]),
            analysis: AnalysisQueries::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load a (possibly partial) configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<std::path::Path>) -> crate::error::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let floor = self.roi_eligibility_budget_floor_musd;
        if !floor.is_finite() || floor < 0.0 {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "roi_eligibility_budget_floor_musd".to_string(),
                value: floor,
            });
        }

        if self.dedupe_key_columns.is_empty() {
            return Err(ConfigValidationError::EmptyKeyColumns);
        }

        if let Some(key) = self
            .dedupe_key_columns
            .iter()
            .find(|key| self.drop_columns.contains(key))
        {
            return Err(ConfigValidationError::DroppedKeyColumn(key.clone()));
        }

        let delimiter = self.list_delimiter;
        if delimiter.is_alphanumeric() || delimiter.is_whitespace() {
            return Err(ConfigValidationError::InvalidDelimiter(delimiter));
        }

        if self.analysis.top_n == 0 {
            return Err(ConfigValidationError::InvalidTopN(self.analysis.top_n));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be finite and non-negative)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("At least one deduplication key column is required")]
    EmptyKeyColumns,

    #[error("Key column '{0}' is also listed in drop_columns")]
    DroppedKeyColumn(String),

    #[error("Invalid list delimiter {0:?} (must not be alphanumeric or whitespace)")]
    InvalidDelimiter(char),

    #[error("Invalid top_n: {0} (must be at least 1)")]
    InvalidTopN(usize),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    drop_columns: Option<Vec<String>>,
    sub_document_columns: Option<Vec<String>>,
    numeric_columns: Option<Vec<String>>,
    zero_as_missing_columns: Option<Vec<String>>,
    date_column: Option<Option<String>>,
    text_columns: Option<Vec<String>>,
    text_placeholders: Option<Vec<String>>,
    dedupe_key_columns: Option<Vec<String>>,
    nan_column_drop_threshold: Option<usize>,
    roi_eligibility_budget_floor_musd: Option<f64>,
    list_delimiter: Option<char>,
    director_job: Option<String>,
    credits_column: Option<String>,
    column_order: Option<Vec<String>>,
    analysis: Option<AnalysisQueries>,
}

fn owned<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl PipelineConfigBuilder {
    /// Set the columns removed before parsing.
    pub fn drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = Some(owned(columns));
        self
    }

    /// Set the columns routed through the field parser.
    pub fn sub_document_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_document_columns = Some(owned(columns));
        self
    }

    /// Set the columns coerced to numeric.
    pub fn numeric_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.numeric_columns = Some(owned(columns));
        self
    }

    /// Set the numeric columns where zero means missing.
    pub fn zero_as_missing_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zero_as_missing_columns = Some(owned(columns));
        self
    }

    /// Set the date column, or `None` to disable date coercion.
    pub fn date_column(mut self, column: Option<&str>) -> Self {
        self.date_column = Some(column.map(str::to_string));
        self
    }

    /// Set the free-text columns.
    pub fn text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns = Some(owned(columns));
        self
    }

    /// Set the placeholder strings treated as missing text.
    pub fn text_placeholders<I, S>(mut self, placeholders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_placeholders = Some(owned(placeholders));
        self
    }

    /// Set the deduplication key columns.
    pub fn dedupe_key_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dedupe_key_columns = Some(owned(columns));
        self
    }

    /// Set the missing-value count above which a column is dropped.
    pub fn nan_column_drop_threshold(mut self, threshold: usize) -> Self {
        self.nan_column_drop_threshold = Some(threshold);
        self
    }

    /// Set the minimum budget (millions) for ROI rankings.
    pub fn roi_eligibility_budget_floor_musd(mut self, floor: f64) -> Self {
        self.roi_eligibility_budget_floor_musd = Some(floor);
        self
    }

    /// Set the multi-value delimiter.
    pub fn list_delimiter(mut self, delimiter: char) -> Self {
        self.list_delimiter = Some(delimiter);
        self
    }

    /// Set the crew job that marks a director.
    pub fn director_job(mut self, job: impl Into<String>) -> Self {
        self.director_job = Some(job.into());
        self
    }

    /// Set the column holding the credits sub-document.
    pub fn credits_column(mut self, column: impl Into<String>) -> Self {
        self.credits_column = Some(column.into());
        self
    }

    /// Set the canonical leading column order.
    pub fn column_order<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_order = Some(owned(columns));
        self
    }

    /// Set the filtered analysis query parameters.
    pub fn analysis(mut self, queries: AnalysisQueries) -> Self {
        self.analysis = Some(queries);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            drop_columns: self.drop_columns.unwrap_or(defaults.drop_columns),
            sub_document_columns: self
                .sub_document_columns
                .unwrap_or(defaults.sub_document_columns),
            numeric_columns: self.numeric_columns.unwrap_or(defaults.numeric_columns),
            zero_as_missing_columns: self
                .zero_as_missing_columns
                .unwrap_or(defaults.zero_as_missing_columns),
            date_column: self.date_column.unwrap_or(defaults.date_column),
            text_columns: self.text_columns.unwrap_or(defaults.text_columns),
            text_placeholders: self.text_placeholders.unwrap_or(defaults.text_placeholders),
            dedupe_key_columns: self.dedupe_key_columns.unwrap_or(defaults.dedupe_key_columns),
            nan_column_drop_threshold: self
                .nan_column_drop_threshold
                .unwrap_or(defaults.nan_column_drop_threshold),
            roi_eligibility_budget_floor_musd: self
                .roi_eligibility_budget_floor_musd
                .unwrap_or(defaults.roi_eligibility_budget_floor_musd),
            list_delimiter: self.list_delimiter.unwrap_or(defaults.list_delimiter),
            director_job: self.director_job.unwrap_or(defaults.director_job),
            credits_column: self.credits_column.unwrap_or(defaults.credits_column),
            column_order: self.column_order.unwrap_or(defaults.column_order),
            analysis: self.analysis.unwrap_or(defaults.analysis),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.nan_column_drop_threshold, 10);
        assert_eq!(config.roi_eligibility_budget_floor_musd, 10.0);
        assert_eq!(config.list_delimiter, '|');
        assert_eq!(config.dedupe_key_columns, vec!["id", "title"]);
        assert_eq!(config.date_column.as_deref(), Some("release_date"));
        assert!(config.text_placeholders.contains(&String::new()));
        assert_eq!(config.analysis.top_n, 5);
    }

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config.nan_column_drop_threshold, 10);
        assert_eq!(config.director_job, "Director");
    }

    #[test]
    fn test_builder_custom_values() {
        let config = PipelineConfig::builder()
            .nan_column_drop_threshold(3)
            .roi_eligibility_budget_floor_musd(5.0)
            .drop_columns(["video"])
            .list_delimiter(';')
            .date_column(None)
            .build()
            .unwrap();

        assert_eq!(config.nan_column_drop_threshold, 3);
        assert_eq!(config.roi_eligibility_budget_floor_musd, 5.0);
        assert_eq!(config.drop_columns, vec!["video"]);
        assert_eq!(config.list_delimiter, ';');
        assert!(config.date_column.is_none());
    }

    #[test]
    fn test_validation_invalid_floor() {
        let result = PipelineConfig::builder()
            .roi_eligibility_budget_floor_musd(-1.0)
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidThreshold { .. }
        ));

        let result = PipelineConfig::builder()
            .roi_eligibility_budget_floor_musd(f64::NAN)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_key_columns() {
        let result = PipelineConfig::builder()
            .dedupe_key_columns(Vec::<String>::new())
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyKeyColumns
        ));

        let result = PipelineConfig::builder()
            .drop_columns(["title"])
            .build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DroppedKeyColumn(ref c) if c == "title"
        ));
    }

    #[test]
    fn test_validation_delimiter_and_top_n() {
        assert!(PipelineConfig::builder().list_delimiter(' ').build().is_err());
        assert!(PipelineConfig::builder().list_delimiter('a').build().is_err());

        let queries = AnalysisQueries {
            top_n: 0,
            ..AnalysisQueries::default()
        };
        assert!(matches!(
            PipelineConfig::builder().analysis(queries).build().unwrap_err(),
            ConfigValidationError::InvalidTopN(0)
        ));
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.drop_columns, deserialized.drop_columns);
        assert_eq!(config.list_delimiter, deserialized.list_delimiter);
        assert_eq!(config.analysis, deserialized.analysis);
    }

    #[test]
    fn test_partial_config_from_json() {
        let json = r#"{
            "nan_column_drop_threshold": 4,
            "text_columns": ["overview"],
            "analysis": { "genre": "Animation" }
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).expect("partial config");

        assert_eq!(config.nan_column_drop_threshold, 4);
        assert_eq!(config.text_columns, vec!["overview"]);
        assert_eq!(config.analysis.genre, "Animation");
        assert_eq!(config.analysis.actor, "Uma Thurman");
        assert_eq!(config.dedupe_key_columns, vec!["id", "title"]);
    }
}
