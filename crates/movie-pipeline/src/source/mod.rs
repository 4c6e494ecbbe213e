//! Record sources: where raw movie records come from.
//!
//! A [`RecordSource`] produces raw record mappings; everything downstream
//! works on the frame built from them.

#[cfg(feature = "tmdb")]
mod tmdb;

#[cfg(feature = "tmdb")]
pub use tmdb::{FetchOutcome, TmdbConfig, TmdbSource};

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::io::{RawRecord, load_json_records};

/// Movie ids fetched when none are configured.
pub const DEFAULT_MOVIE_IDS: [u64; 18] = [
    299534, 19995, 140607, 299536, 597, 135397, 420818, 24428, 168259, 99861, 284054, 12445,
    181808, 330457, 351286, 109445, 321612, 260513,
];

/// Anything that can produce raw movie records.
pub trait RecordSource {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    fn fetch(&self) -> Result<Vec<RawRecord>>;
}

/// Records stored as a JSON array (or `{"results": [...]}`) on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    name: String,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl RecordSource for JsonFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> Result<Vec<RawRecord>> {
        let records = load_json_records(&self.path)?;
        info!("Loaded {} records from {}", records.len(), self.name);
        Ok(records)
    }
}

/// Parse a comma-separated id list such as `USER_MOVIE_IDS`.
///
/// Tokens that are not positive integers are skipped with a warning; a list
/// with no valid id is a configuration error.
pub fn parse_movie_ids(text: &str) -> Result<Vec<u64>> {
    let ids: Vec<u64> = text
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<u64>() {
            Ok(id) if id > 0 => Some(id),
            _ => {
                warn!("Skipping invalid movie ID: {} (must be a positive integer)", token);
                None
            }
        })
        .collect();

    if ids.is_empty() {
        return Err(PipelineError::InvalidConfig(
            "No valid movie IDs provided".to_string(),
        ));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_movie_ids() {
        assert_eq!(
            parse_movie_ids("597, 19995,,0,abc,-4, 24428").unwrap(),
            vec![597, 19995, 24428]
        );
        assert!(matches!(
            parse_movie_ids("0, nope"),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_default_ids_are_positive_and_unique() {
        let mut ids = DEFAULT_MOVIE_IDS.to_vec();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), DEFAULT_MOVIE_IDS.len());
        assert!(ids.iter().all(|id| *id > 0));
    }

    #[test]
    fn test_json_file_source() {
        let dir = std::env::temp_dir()
            .join(format!("movie-pipeline-source-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("movies.json");
        fs::write(&path, r#"{"results": [{"id": 1, "title": "A"}, 3]}"#).unwrap();

        let source = JsonFileSource::new(&path);
        let records = source.fetch().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], "A");
        assert!(source.name().ends_with("movies.json"));

        fs::remove_dir_all(&dir).ok();
    }
}
