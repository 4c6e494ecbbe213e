//! CLI entry point for the movie pipeline.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use dotenv::dotenv;
use movie_pipeline::io::load_frame;
use movie_pipeline::reporting::{CLEANED_FILE, KPI_FILE, RAW_FILE};
use movie_pipeline::{
    CreditsOutcome, ExecutionReport, Pipeline, PipelineConfig, PipelineResult, ReportWriter,
    SectionContent,
};
use polars::prelude::DataFrame;
use std::env;
use std::path::Path;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    author = "Movie Pipeline Team",
    version,
    about = "Movie catalog normalization, KPI and analysis pipeline",
    long_about = "Normalizes raw movie records, derives profit and ROI, ranks movies \
                  and builds an analysis report.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  TMDB_API_KEY      API key for TMDB (required with --fetch)\n  \
                  USER_MOVIE_IDS    Comma-separated TMDB movie IDs to fetch\n  \
                  SKIP_EXISTING     Reuse intermediate files (true/1/yes)\n\n\
                  EXAMPLES:\n  \
                  # Process a saved record dump\n  \
                  movie-pipeline -i movies.json\n\n  \
                  # Fetch from TMDB and write results to data/\n  \
                  movie-pipeline --fetch -o data/\n\n  \
                  # Re-run analysis only, reusing cleaned and KPI files\n  \
                  movie-pipeline -i movies.json --skip-existing\n\n  \
                  # Machine-readable output\n  \
                  movie-pipeline -i movies.csv --json | jq .rankings"
)]
struct Args {
    /// Path to a CSV or JSON file of raw movie records
    #[arg(short, long, conflicts_with = "fetch")]
    input: Option<String>,

    /// Fetch raw records from the TMDB API instead of reading a file
    #[arg(long)]
    fetch: bool,

    /// Output directory for intermediate files and the report
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// JSON file with pipeline configuration overrides
    #[arg(short, long)]
    config: Option<String>,

    /// Reuse raw, cleaned and KPI files left by an earlier run
    #[arg(long)]
    skip_existing: bool,

    /// Minimum budget (millions) for a movie to enter ROI rankings
    #[arg(long)]
    roi_budget_floor: Option<f64>,

    /// Drop columns with more missing values than this
    #[arg(long)]
    nan_threshold: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the execution report.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config = load_config(&args)?;
    let pipeline = build_pipeline(&args, config)?;
    let writer = ReportWriter::new(&args.output);
    let skip_existing = args.skip_existing || env_flag("SKIP_EXISTING");

    info!("{}", "=".repeat(80));
    info!("Starting movie pipeline...");
    info!("{}", "=".repeat(80));

    let (raw, input) = load_raw(&args, &writer, skip_existing)?;
    let result = run_stages(&pipeline, &writer, &raw, skip_existing)
        .map_err(|e| anyhow!("Pipeline failed: {}", e))?;

    let report = ExecutionReport::build(&input, Some(writer.output_dir()), &result);
    writer.write_report(&report)?;

    if args.json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    print_human_readable_summary(&report, &raw);
    Ok(())
}

/// Defaults, then the `--config` file, then flag overrides.
fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config file {}", path))?,
        None => PipelineConfig::default(),
    };

    if let Some(floor) = args.roi_budget_floor {
        config.roi_eligibility_budget_floor_musd = floor;
    }
    if let Some(threshold) = args.nan_threshold {
        config.nan_column_drop_threshold = threshold;
    }

    Ok(config)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Load a frame left by an earlier run, or `None` if it is absent, empty or
/// unreadable.
fn reuse_existing(writer: &ReportWriter, file_name: &str) -> Option<DataFrame> {
    if !writer.exists(file_name) {
        return None;
    }
    match writer.read_frame(file_name) {
        Ok(df) if df.height() > 0 => Some(df),
        Ok(_) => {
            warn!("Existing {} is empty. Recomputing.", file_name);
            None
        }
        Err(e) => {
            warn!("Failed to load existing {}: {}. Recomputing.", file_name, e);
            None
        }
    }
}

/// The raw frame and a description of where it came from.
fn load_raw(
    args: &Args,
    writer: &ReportWriter,
    skip_existing: bool,
) -> Result<(DataFrame, String)> {
    if skip_existing && let Some(raw) = reuse_existing(writer, RAW_FILE) {
        return Ok((raw, writer.path(RAW_FILE).display().to_string()));
    }

    let (raw, input) = match &args.input {
        Some(path) => {
            if !Path::new(path).exists() {
                bail!("Input file not found: {}", path);
            }
            info!("Loading dataset from: {}", path);
            (load_frame(path)?, path.clone())
        }
        None if args.fetch => (fetch_raw()?, "tmdb".to_string()),
        None => bail!("No input given: pass --input <FILE> or --fetch"),
    };
    info!("Dataset loaded successfully: {:?}", raw.shape());

    writer.write_frame(&raw, RAW_FILE)?;
    Ok((raw, input))
}

#[cfg(feature = "tmdb")]
fn fetch_raw() -> Result<DataFrame> {
    use movie_pipeline::io::records_to_frame;
    use movie_pipeline::source::{DEFAULT_MOVIE_IDS, RecordSource, TmdbSource, parse_movie_ids};

    let api_key = env::var("TMDB_API_KEY")
        .or_else(|_| env::var("USER_API_KEY"))
        .map_err(|_| anyhow!("TMDB_API_KEY is not set (required with --fetch)"))?;

    let movie_ids = match env::var("USER_MOVIE_IDS") {
        Ok(text) => parse_movie_ids(&text).unwrap_or_else(|e| {
            warn!("Invalid USER_MOVIE_IDS ({}), using defaults", e);
            DEFAULT_MOVIE_IDS.to_vec()
        }),
        Err(_) => DEFAULT_MOVIE_IDS.to_vec(),
    };

    let source = TmdbSource::new(&api_key, &movie_ids)?;
    info!("Fetching {} movies from {}", movie_ids.len(), source.name());
    let records = source.fetch()?;
    Ok(records_to_frame(&records)?)
}

#[cfg(not(feature = "tmdb"))]
fn fetch_raw() -> Result<DataFrame> {
    bail!("TMDB support not compiled in. Compile with --features tmdb to use --fetch.")
}

/// Run the stages, reusing the newest intermediate file when allowed and
/// writing every file that was recomputed.
fn run_stages(
    pipeline: &Pipeline,
    writer: &ReportWriter,
    raw: &DataFrame,
    skip_existing: bool,
) -> Result<PipelineResult> {
    if skip_existing {
        if let Some(kpi) = reuse_existing(writer, KPI_FILE) {
            return Ok(pipeline.resume(raw, kpi)?);
        }
        if let Some(cleaned) = reuse_existing(writer, CLEANED_FILE) {
            let result = pipeline.resume(raw, cleaned)?;
            writer.write_frame(&result.kpi, KPI_FILE)?;
            return Ok(result);
        }
    }

    let result = pipeline.process(raw)?;
    writer.write_frame(&result.normalized, CLEANED_FILE)?;
    writer.write_frame(&result.kpi, KPI_FILE)?;
    Ok(result)
}

/// Print a human-readable summary of the run.
///
/// This is the default output when `--json` is not given.
fn print_human_readable_summary(report: &ExecutionReport, raw: &DataFrame) {
    let summary = &report.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("MOVIE PIPELINE - EXECUTION SUMMARY");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input,
        raw.height(),
        raw.width()
    );
    if let Some(ref output_dir) = report.output_dir {
        println!("Output: {}", output_dir);
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} removed, {} duplicates)",
        summary.rows_before,
        summary.rows_after,
        summary.rows_removed(),
        summary.duplicates_removed
    );
    println!(
        "  Columns: {} -> {}",
        summary.columns_before, summary.columns_after
    );
    if !summary.dropped_columns.is_empty() {
        println!("  Dropped: {}", summary.dropped_columns.join(", "));
    }
    if !summary.pruned_columns.is_empty() {
        println!("  Pruned (too sparse): {}", summary.pruned_columns.join(", "));
    }
    match &summary.credits {
        CreditsOutcome::Skipped => println!("  Credits: skipped (no credits column)"),
        CreditsOutcome::Extracted {
            rows,
            empty_cells,
            undecodable_cells,
        } => println!(
            "  Credits: {} rows ({} empty, {} undecodable)",
            rows, empty_cells, undecodable_cells
        ),
    }
    println!("  Data Quality: {:.1}%", summary.data_quality_score);
    if let Some(ref kpi) = summary.kpi {
        println!(
            "  KPIs: {} with profit, {} with ROI, {} ROI-eligible",
            kpi.movies_with_profit, kpi.movies_with_roi, kpi.roi_eligible
        );
    }
    println!();

    println!("Rankings:");
    for (_, description) in report.rankings.descriptions() {
        println!("  - {}", description);
    }
    println!();

    println!("Analysis Report:");
    for section in report.analysis.sections() {
        match &section.content {
            SectionContent::Error(message) => {
                println!("  ! {}: {}", section.title, message)
            }
            content => println!("  - {} ({} entries)", section.title, content.len()),
        }
    }
    println!();

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
