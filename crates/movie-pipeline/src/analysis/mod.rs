//! Grouped statistics, franchise and director rollups, filtered listings,
//! and the combined analysis report.
//!
//! [`MovieAnalyzer`] works on a categorized copy of a KPI frame. Grouped
//! queries fail only with [`PipelineError::ColumnNotFound`]; inside
//! [`MovieAnalyzer::full_report`] such a failure becomes an error section
//! and the remaining sections still run.

mod grouping;
mod queries;
mod report;

pub use grouping::{Aggregate, GroupValue, SumMean};
pub use queries::{
    DIRECTOR_LISTING_COLUMNS, GENRE_LISTING_COLUMNS, filter_by_cast_and_director,
    top_by_genre_and_cast,
};
pub use report::{AnalysisReport, ReportSection, SectionContent};

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalysisQueries;
use crate::error::{PipelineError, Result};
use crate::io::frame_to_records;
use crate::utils::{column_strings, has_column};
use grouping::{GroupOrder, aggregate_by, explode_names, sum_and_mean_by};

/// Column holding the derived category.
pub const CATEGORY_COLUMN: &str = "movie_category";

const COLLECTION_COLUMN: &str = "belongs_to_collection";
const DIRECTORS_COLUMN: &str = "directors";
/// Group key column added by the franchise and director rollups.
const GROUP_KEY: &str = "__group";

/// Franchise membership of a movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MovieCategory {
    Franchise,
    Standalone,
}

impl MovieCategory {
    /// Report order of the category groups.
    pub const ALL: [MovieCategory; 2] = [MovieCategory::Franchise, MovieCategory::Standalone];

    pub fn label(self) -> &'static str {
        match self {
            MovieCategory::Franchise => "Franchise",
            MovieCategory::Standalone => "Standalone",
        }
    }

    fn rank(label: &str) -> usize {
        Self::ALL
            .iter()
            .position(|c| c.label() == label)
            .unwrap_or(Self::ALL.len())
    }
}

/// Category of each row: `Franchise` iff `belongs_to_collection` holds a
/// non-empty name. An absent column makes every movie standalone.
pub fn movie_categories(df: &DataFrame) -> Vec<MovieCategory> {
    let collections = column_strings(df, COLLECTION_COLUMN).ok().flatten();
    (0..df.height())
        .map(|row| {
            let in_collection = collections
                .as_ref()
                .and_then(|c| c[row].as_deref())
                .is_some_and(|name| !name.trim().is_empty());
            if in_collection {
                MovieCategory::Franchise
            } else {
                MovieCategory::Standalone
            }
        })
        .collect()
}

/// Copy of `df` with a `movie_category` column.
pub fn categorize(df: &DataFrame) -> Result<DataFrame> {
    let labels: Vec<&str> = movie_categories(df).into_iter().map(MovieCategory::label).collect();
    let mut out = df.clone();
    out.with_column(Series::new(CATEGORY_COLUMN.into(), labels))?;
    Ok(out)
}

/// Answers grouped and filtered queries over a KPI frame.
#[derive(Debug, Clone)]
pub struct MovieAnalyzer {
    frame: DataFrame,
    delimiter: char,
}

impl MovieAnalyzer {
    /// Categorize a copy of `kpi`. `delimiter` splits multi-valued cells.
    pub fn new(kpi: &DataFrame, delimiter: char) -> Result<Self> {
        let frame = categorize(kpi)?;
        let categories = movie_categories(kpi);
        let franchise = categories
            .iter()
            .filter(|c| **c == MovieCategory::Franchise)
            .count();
        info!(
            "Categorized {} movies ({} franchise, {} standalone)",
            categories.len(),
            franchise,
            categories.len() - franchise
        );
        Ok(Self { frame, delimiter })
    }

    /// The categorized frame.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    /// Fail with [`PipelineError::ColumnNotFound`] if `column` is absent.
    fn require(&self, column: &str) -> Result<()> {
        if has_column(&self.frame, column) {
            Ok(())
        } else {
            Err(PipelineError::ColumnNotFound(column.to_string()))
        }
    }

    fn require_metric(&self, aggregate: Aggregate, metric: &str) -> Result<()> {
        if aggregate.reads_metric() {
            self.require(metric)?;
        }
        Ok(())
    }

    fn category_frame(&self) -> LazyFrame {
        self.frame.clone().lazy()
    }

    /// Trimmed collection names under [`GROUP_KEY`]; blank names are no group.
    fn franchise_frame(&self) -> Result<LazyFrame> {
        self.require(COLLECTION_COLUMN)?;
        let name = col(COLLECTION_COLUMN)
            .cast(DataType::String)
            .str()
            .strip_chars(lit(NULL));
        Ok(self
            .frame
            .clone()
            .lazy()
            .with_column(name.alias(GROUP_KEY))
            .filter(col(GROUP_KEY).neq(lit(""))))
    }

    /// One row per record and distinct director name, under [`GROUP_KEY`].
    fn director_frame(&self) -> Result<LazyFrame> {
        self.require(DIRECTORS_COLUMN)?;
        Ok(explode_names(
            &self.frame,
            DIRECTORS_COLUMN,
            GROUP_KEY,
            self.delimiter,
        ))
    }

    // -------------------------------------------------------------------------
    // Category statistics
    // -------------------------------------------------------------------------

    /// `aggregate` of `metric` per category, Franchise first.
    pub fn by_category(&self, aggregate: Aggregate, metric: &str) -> Result<Vec<GroupValue>> {
        self.require_metric(aggregate, metric)?;
        let mut out = aggregate_by(
            self.category_frame(),
            CATEGORY_COLUMN,
            aggregate,
            metric,
            GroupOrder::FirstSeen,
        )?;
        out.sort_by_key(|g| MovieCategory::rank(&g.group));
        Ok(out)
    }

    pub fn mean_by_category(&self, metric: &str) -> Result<Vec<GroupValue>> {
        self.by_category(Aggregate::Mean, metric)
    }

    pub fn median_by_category(&self, metric: &str) -> Result<Vec<GroupValue>> {
        self.by_category(Aggregate::Median, metric)
    }

    pub fn sum_and_mean_by_category(&self, metric: &str) -> Result<Vec<SumMean>> {
        self.require(metric)?;
        let mut out = sum_and_mean_by(
            self.category_frame(),
            CATEGORY_COLUMN,
            metric,
            GroupOrder::FirstSeen,
        )?;
        out.sort_by_key(|g| MovieCategory::rank(&g.group));
        Ok(out)
    }

    // -------------------------------------------------------------------------
    // Franchise rollups
    // -------------------------------------------------------------------------

    /// `aggregate` of `metric` per franchise, highest first.
    pub fn top_franchise_by(&self, aggregate: Aggregate, metric: &str) -> Result<Vec<GroupValue>> {
        self.require_metric(aggregate, metric)?;
        aggregate_by(
            self.franchise_frame()?,
            GROUP_KEY,
            aggregate,
            metric,
            GroupOrder::Descending,
        )
    }

    /// Movies per franchise, highest first.
    pub fn franchise_movie_counts(&self) -> Result<Vec<GroupValue>> {
        self.top_franchise_by(Aggregate::Count, COLLECTION_COLUMN)
    }

    /// Sum and mean of `metric` per franchise, by sum descending.
    pub fn franchise_sum_and_mean(&self, metric: &str) -> Result<Vec<SumMean>> {
        self.require(metric)?;
        sum_and_mean_by(
            self.franchise_frame()?,
            GROUP_KEY,
            metric,
            GroupOrder::Descending,
        )
    }

    // -------------------------------------------------------------------------
    // Director rollups
    // -------------------------------------------------------------------------

    /// `aggregate` of `metric` per director, highest first. A record with
    /// several directors counts toward each of them.
    pub fn by_director(&self, aggregate: Aggregate, metric: &str) -> Result<Vec<GroupValue>> {
        self.require_metric(aggregate, metric)?;
        aggregate_by(
            self.director_frame()?,
            GROUP_KEY,
            aggregate,
            metric,
            GroupOrder::Descending,
        )
    }

    /// Movies per director, highest first.
    pub fn director_movie_counts(&self) -> Result<Vec<GroupValue>> {
        self.by_director(Aggregate::Count, DIRECTORS_COLUMN)
    }

    // -------------------------------------------------------------------------
    // Listings
    // -------------------------------------------------------------------------

    pub fn top_by_genre_and_cast(&self, genre: &str, actor: &str, n: usize) -> Result<DataFrame> {
        top_by_genre_and_cast(&self.frame, genre, actor, n)
    }

    pub fn filter_by_cast_and_director(&self, actor: &str, director: &str) -> Result<DataFrame> {
        filter_by_cast_and_director(&self.frame, actor, director)
    }

    // -------------------------------------------------------------------------
    // Report
    // -------------------------------------------------------------------------

    /// Assemble every query into one ordered report.
    ///
    /// Empty listings are left out; grouped sections are always present.
    pub fn full_report(&self, queries: &AnalysisQueries) -> AnalysisReport {
        let mut report = AnalysisReport::new();

        push_listing(
            &mut report,
            format!("Best {} Movies", queries.genre),
            self.top_by_genre_and_cast(&queries.genre, &queries.genre_actor, queries.top_n),
            || {
                format!(
                    "No {} movies found starring '{}'",
                    queries.genre, queries.genre_actor
                )
            },
        );
        push_listing(
            &mut report,
            "Movies Starring Actor by Director".to_string(),
            self.filter_by_cast_and_director(&queries.actor, &queries.director),
            || {
                format!(
                    "No movies found starring '{}' directed by '{}'",
                    queries.actor, queries.director
                )
            },
        );

        push_section(
            &mut report,
            "Mean Revenue",
            self.mean_by_category("revenue_musd").map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Budget Stats",
            self.sum_and_mean_by_category("budget_musd").map(SectionContent::SumMean),
        );
        push_section(
            &mut report,
            "Median ROI",
            self.median_by_category("roi").map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Mean Popularity",
            self.mean_by_category("popularity").map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Mean Rating",
            self.mean_by_category("vote_average").map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Top Franchise by Movie Count",
            self.franchise_movie_counts().map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Top Franchise by Budget",
            self.franchise_sum_and_mean("budget_musd").map(SectionContent::SumMean),
        );
        push_section(
            &mut report,
            "Top Franchise by Revenue",
            self.franchise_sum_and_mean("revenue_musd").map(SectionContent::SumMean),
        );
        push_section(
            &mut report,
            "Top Franchise by Rating",
            self.top_franchise_by(Aggregate::Mean, "vote_average").map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Top Director by Number of Movies",
            self.director_movie_counts().map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Top Director by Revenue",
            self.by_director(Aggregate::Sum, "revenue_musd").map(SectionContent::Groups),
        );
        push_section(
            &mut report,
            "Top Director by Rating",
            self.by_director(Aggregate::Mean, "vote_average").map(SectionContent::Groups),
        );

        info!(
            "Analysis report complete: {} sections ({} failed)",
            report.len(),
            report.errors()
        );
        report
    }
}

fn push_section(report: &mut AnalysisReport, title: &str, content: Result<SectionContent>) {
    let content = content.unwrap_or_else(|err| {
        warn!("Report section '{}' failed: {}", title, err);
        SectionContent::Error(err.to_string())
    });
    report.push(title, content);
}

fn push_listing<F>(
    report: &mut AnalysisReport,
    title: String,
    listing: Result<DataFrame>,
    empty_message: F,
) where
    F: FnOnce() -> String,
{
    match listing.and_then(|df| frame_to_records(&df)) {
        Ok(rows) if rows.is_empty() => warn!("{}", empty_message()),
        Ok(rows) => report.push(title, SectionContent::Movies(rows)),
        Err(err) => {
            warn!("Report section '{}' failed: {}", title, err);
            report.push(title, SectionContent::Error(err.to_string()));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
