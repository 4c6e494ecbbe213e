//! CSV loading and writing.

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::debug;

use crate::error::{Result, ResultExt};

/// Load a CSV file, retrying with looser settings when parsing fails.
///
/// 1. Standard loading with quote handling, schema inferred from 100 rows
/// 2. Without explicit quote handling
/// 3. Schema inferred from the whole file
pub fn load_csv_with_fallbacks(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading without quotes failed: {}", e);
        }
    }

    CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .context(format!("Failed to load CSV {}", path.display()))
}

/// Write a frame as CSV, creating the parent directory if needed.
pub fn write_csv(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)
        .context(format!("Failed to write CSV {}", path.display()))?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("movie-pipeline-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_write_then_load() {
        let path = temp_path("roundtrip.csv");
        let df = df![
            "title" => ["Heat", "Alien"],
            "genres" => [Some(r#"[{"name": "Crime"}]"#), None],
            "budget_musd" => [Some(60.0), None],
        ]
        .unwrap();

        write_csv(&df, &path).unwrap();
        let loaded = load_csv_with_fallbacks(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.shape(), (2, 3));
        let genres = loaded.column("genres").unwrap().as_materialized_series().clone();
        assert_eq!(genres.str().unwrap().get(0), Some(r#"[{"name": "Crime"}]"#));
        assert_eq!(loaded.column("budget_musd").unwrap().null_count(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_csv_with_fallbacks(temp_path("does-not-exist.csv")).is_err());
    }
}
