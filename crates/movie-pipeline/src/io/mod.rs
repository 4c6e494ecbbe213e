//! Record and file I/O at the edges of the pipeline.
//!
//! - [`records_to_frame`] / [`frame_to_records`] convert between raw record
//!   mappings and DataFrames
//! - [`load_csv_with_fallbacks`] / [`write_csv`] persist intermediate frames

mod delimited;
mod records;

pub use delimited::{load_csv_with_fallbacks, write_csv};
pub use records::{
    RawRecord, any_value_to_json, frame_to_records, load_json_records, records_to_frame,
};

use std::path::Path;

use polars::prelude::DataFrame;

use crate::error::{PipelineError, Result};

/// Load a frame from a `.csv` or `.json` file, chosen by extension.
pub fn load_frame(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") => load_csv_with_fallbacks(path),
        Some("json") => records_to_frame(&load_json_records(path)?),
        _ => Err(PipelineError::InvalidConfig(format!(
            "Unsupported input format: {} (expected .csv or .json)",
            path.display()
        ))),
    }
}
