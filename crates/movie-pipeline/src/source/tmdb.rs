//! TMDB catalog source.
//!
//! Fetches `/3/movie/{id}` with credits appended, one id at a time, with a
//! fixed delay between requests and a bounded number of attempts per id.

use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::RecordSource;
use crate::error::{PipelineError, Result};
use crate::io::RawRecord;

/// Default TMDB movie endpoint.
const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/movie";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default attempts per movie id.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between requests in milliseconds.
const DEFAULT_DELAY_MS: u64 = 500;

/// Shortest API key accepted after trimming.
const MIN_API_KEY_LEN: usize = 10;

const SOURCE_NAME: &str = "tmdb";

/// Configuration for [`TmdbSource`].
#[derive(Debug, Clone)]
pub struct TmdbConfig {
    /// Base URL for the movie endpoint (useful for proxies or test servers).
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts per movie id before it is reported as failed.
    pub max_attempts: u32,
    /// Pause between consecutive requests.
    pub delay: Duration,
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            language: "en-US".to_string(),
        }
    }
}

/// Records fetched plus the ids that could not be fetched.
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub records: Vec<RawRecord>,
    pub failed_ids: Vec<u64>,
}

/// Fetches movie records from the TMDB API.
///
/// # Example
///
/// ```rust,ignore
/// use movie_pipeline::source::{DEFAULT_MOVIE_IDS, RecordSource, TmdbSource};
///
/// let source = TmdbSource::new(&api_key, &DEFAULT_MOVIE_IDS)?;
/// let records = source.fetch()?;
/// ```
pub struct TmdbSource {
    api_key: String,
    movie_ids: Vec<u64>,
    config: TmdbConfig,
    client: Client,
}

impl TmdbSource {
    /// Create a source with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the API key is shorter
    /// than 10 characters or no id is positive, and an HTTP error if the
    /// client cannot be built.
    pub fn new(api_key: &str, movie_ids: &[u64]) -> Result<Self> {
        Self::with_config(api_key, movie_ids, TmdbConfig::default())
    }

    pub fn with_config(api_key: &str, movie_ids: &[u64], config: TmdbConfig) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.len() < MIN_API_KEY_LEN {
            return Err(PipelineError::InvalidConfig(
                "API key appears to be invalid (too short)".to_string(),
            ));
        }

        let movie_ids: Vec<u64> = movie_ids.iter().copied().filter(|id| *id > 0).collect();
        if movie_ids.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "At least one positive movie ID is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!("TMDB source configured with {} movies", movie_ids.len());

        Ok(Self {
            api_key: api_key.to_string(),
            movie_ids,
            config,
            client,
        })
    }

    pub fn movie_ids(&self) -> &[u64] {
        &self.movie_ids
    }

    /// Endpoint for one movie, without query parameters.
    pub fn movie_url(&self, id: u64) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), id)
    }

    fn request(&self, id: u64) -> std::result::Result<RawRecord, RequestError> {
        let response = self
            .client
            .get(self.movie_url(id))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.config.language.as_str()),
                ("append_to_response", "credits"),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestError::Status(status));
        }

        match response.json::<Value>()? {
            Value::Object(record) => Ok(record),
            _ => Err(RequestError::NotAnObject),
        }
    }

    /// Fetch one movie, retrying transport errors and retryable statuses.
    fn fetch_one(&self, id: u64) -> std::result::Result<RawRecord, RequestError> {
        let mut attempt = 1;
        loop {
            match self.request(id) {
                Ok(record) => return Ok(record),
                Err(err) if attempt < self.config.max_attempts && err.is_retryable() => {
                    debug!("Attempt {} for movie {} failed: {}", attempt, id, err);
                    attempt += 1;
                    thread::sleep(self.config.delay);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fetch every configured id, collecting the ones that fail.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::SourceUnavailable`] if no id could be fetched.
    pub fn fetch_all(&self) -> Result<FetchOutcome> {
        let mut outcome = FetchOutcome::default();

        for (i, &id) in self.movie_ids.iter().enumerate() {
            if i > 0 {
                thread::sleep(self.config.delay);
            }
            match self.fetch_one(id) {
                Ok(record) => outcome.records.push(record),
                Err(err) => {
                    warn!("Failed to fetch movie with ID {}: {}", id, err);
                    outcome.failed_ids.push(id);
                }
            }
        }

        if outcome.records.is_empty() {
            return Err(PipelineError::SourceUnavailable {
                source_name: SOURCE_NAME.to_string(),
                reason: format!("all {} requests failed", self.movie_ids.len()),
            });
        }

        info!(
            "Extraction completed. Success rate: {:.1}% ({} of {})",
            outcome.records.len() as f64 / self.movie_ids.len() as f64 * 100.0,
            outcome.records.len(),
            self.movie_ids.len()
        );
        Ok(outcome)
    }
}

/// Why a single movie request failed.
#[derive(Error, Debug)]
enum RequestError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("status code {0}")]
    Status(StatusCode),
    #[error("response is not a JSON object")]
    NotAnObject,
}

impl RequestError {
    fn is_retryable(&self) -> bool {
        match self {
            RequestError::Transport(e) => e.is_timeout() || e.is_connect(),
            RequestError::Status(status) => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            RequestError::NotAnObject => false,
        }
    }
}

impl RecordSource for TmdbSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn fetch(&self) -> Result<Vec<RawRecord>> {
        let outcome = self.fetch_all()?;
        if !outcome.failed_ids.is_empty() {
            warn!("Could not fetch movie IDs: {:?}", outcome.failed_ids);
        }
        Ok(outcome.records)
    }
}
