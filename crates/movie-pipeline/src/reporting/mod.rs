//! Output files and the execution report.
//!
//! A run leaves four files in its output directory:
//!
//! - [`RAW_FILE`]: raw records as extracted
//! - [`CLEANED_FILE`]: the normalized frame
//! - [`KPI_FILE`]: the normalized frame with `profit` and `roi`
//! - [`REPORT_FILE`]: the [`ExecutionReport`] as JSON
//!
//! # Example
//!
//! ```rust,ignore
//! use movie_pipeline::reporting::{ExecutionReport, KPI_FILE, ReportWriter};
//!
//! let writer = ReportWriter::new("outputs");
//! writer.write_frame(&result.kpi, KPI_FILE)?;
//!
//! let report = ExecutionReport::build("movies.json", Some(writer.output_dir()), &result);
//! writer.write_report(&report)?;
//! ```

mod generator;

pub use generator::{
    CLEANED_FILE, ExecutionReport, KPI_FILE, RAW_FILE, REPORT_FILE, ReportWriter,
};
