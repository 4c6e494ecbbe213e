//! KPI computation and ranking over normalized movie frames.
//!
//! [`MetricEngine`] adds `profit` and `roi` to a normalized frame, derives
//! the ROI-eligible subset, and answers extremal-record queries. Lookups
//! never fail on missing data; they return [`Extremal::Unavailable`] or
//! [`Extremal::NotApplicable`] instead.

mod rankings;

pub use rankings::{Ranking, RankingOutcome, RankingSummary, UNKNOWN_TITLE};

use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::utils::{column_f64, column_strings, has_column};

/// Which end of a column to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Max,
    Min,
}

/// The record holding an extremal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtremalRecord {
    /// Row index within the frame that was searched.
    pub row: usize,
    pub value: f64,
    pub title: Option<String>,
}

impl ExtremalRecord {
    /// The title, or [`UNKNOWN_TITLE`] when missing.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }
}

/// Outcome of an extremal lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Extremal {
    Found(ExtremalRecord),
    /// The column is absent or has no values.
    Unavailable { column: String },
    /// The ROI-eligible subset is empty or has no ROI values.
    NotApplicable,
}

/// Aggregate KPI counts for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiStats {
    pub movies_with_profit: usize,
    pub movies_with_roi: usize,
    pub roi_eligible: usize,
    pub mean_roi: Option<f64>,
}

fn require_column(df: &DataFrame, name: &str) -> Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(PipelineError::ColumnNotFound(name.to_string()))
    }
}

fn monetary_values(df: &DataFrame) -> Result<(Vec<Option<f64>>, Vec<Option<f64>>)> {
    let budget = column_f64(df, "budget_musd")?
        .ok_or_else(|| PipelineError::ColumnNotFound("budget_musd".to_string()))?;
    let revenue = column_f64(df, "revenue_musd")?
        .ok_or_else(|| PipelineError::ColumnNotFound("revenue_musd".to_string()))?;
    Ok((budget, revenue))
}

/// `revenue_musd - budget_musd`, present iff both operands are present.
pub fn compute_profit(df: &DataFrame) -> Result<Series> {
    let (budget, revenue) = monetary_values(df)?;
    let profit: Vec<Option<f64>> = budget
        .iter()
        .zip(&revenue)
        .map(|(b, r)| Some((*r)? - (*b)?))
        .collect();
    Ok(Series::new("profit".into(), profit))
}

/// `revenue_musd / budget_musd`, present iff both are present and the
/// budget is non-zero.
pub fn compute_roi(df: &DataFrame) -> Result<Series> {
    let (budget, revenue) = monetary_values(df)?;
    let roi: Vec<Option<f64>> = budget
        .iter()
        .zip(&revenue)
        .map(|(b, r)| match (b, r) {
            (Some(b), Some(r)) if *b != 0.0 => Some(r / b),
            _ => None,
        })
        .collect();
    Ok(Series::new("roi".into(), roi))
}

/// Rows whose `budget_musd` is at least `floor`.
pub fn roi_eligible(df: &DataFrame, floor: f64) -> Result<DataFrame> {
    let budget = column_f64(df, "budget_musd")?
        .ok_or_else(|| PipelineError::ColumnNotFound("budget_musd".to_string()))?;
    let keep: Vec<bool> = budget.iter().map(|b| b.is_some_and(|b| b >= floor)).collect();
    let mask = BooleanChunked::from_slice("eligible".into(), &keep);
    Ok(df.filter(&mask)?)
}

/// Find the record with the extremal value of `column`.
///
/// Missing values are skipped; ties keep the first occurrence.
pub fn extremal_record(df: &DataFrame, column: &str, direction: Direction) -> Result<Extremal> {
    let Some(values) = column_f64(df, column)? else {
        return Ok(Extremal::Unavailable {
            column: column.to_string(),
        });
    };

    let mut best: Option<(usize, f64)> = None;
    for (row, value) in values.iter().enumerate() {
        let Some(value) = *value else { continue };
        let better = match (best, direction) {
            (None, _) => true,
            (Some((_, current)), Direction::Max) => value > current,
            (Some((_, current)), Direction::Min) => value < current,
        };
        if better {
            best = Some((row, value));
        }
    }

    let Some((row, value)) = best else {
        return Ok(Extremal::Unavailable {
            column: column.to_string(),
        });
    };

    let title = column_strings(df, "title")?
        .and_then(|titles| titles.into_iter().nth(row).flatten())
        .filter(|t| !t.trim().is_empty());

    Ok(Extremal::Found(ExtremalRecord { row, value, title }))
}

/// Adds KPI columns to a normalized frame and answers ranking queries.
#[derive(Debug, Clone)]
pub struct MetricEngine {
    frame: DataFrame,
    eligible: DataFrame,
    budget_floor: f64,
}

impl MetricEngine {
    /// Compute `profit` and `roi` on a copy of `normalized`.
    ///
    /// Fails with [`PipelineError::ColumnNotFound`] if `budget_musd` or
    /// `revenue_musd` is absent.
    pub fn new(normalized: &DataFrame, budget_floor: f64) -> Result<Self> {
        require_column(normalized, "budget_musd")?;
        require_column(normalized, "revenue_musd")?;

        let mut frame = normalized.clone();
        frame.with_column(compute_profit(normalized)?)?;
        frame.with_column(compute_roi(normalized)?)?;
        let eligible = roi_eligible(&frame, budget_floor)?;

        info!(
            "Computed KPIs for {} movies ({} ROI-eligible with budget >= {}M)",
            frame.height(),
            eligible.height(),
            budget_floor
        );

        Ok(Self {
            frame,
            eligible,
            budget_floor,
        })
    }

    /// The KPI frame.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// The ROI-eligible subset of the KPI frame.
    pub fn roi_eligible(&self) -> &DataFrame {
        &self.eligible
    }

    pub fn budget_floor(&self) -> f64 {
        self.budget_floor
    }

    /// Extremal lookup over the whole KPI frame.
    pub fn extremal_record(&self, column: &str, direction: Direction) -> Result<Extremal> {
        extremal_record(&self.frame, column, direction)
    }

    /// Extremal `roi` lookup restricted to the ROI-eligible subset.
    pub fn roi_eligible_extremal(&self, direction: Direction) -> Result<Extremal> {
        if self.eligible.height() == 0 {
            return Ok(Extremal::NotApplicable);
        }
        Ok(match extremal_record(&self.eligible, "roi", direction)? {
            Extremal::Unavailable { .. } => Extremal::NotApplicable,
            other => other,
        })
    }

    /// Evaluate one named ranking.
    pub fn ranking(&self, ranking: Ranking) -> Result<RankingOutcome> {
        let extremal = if ranking.uses_roi_subset() {
            self.roi_eligible_extremal(ranking.direction())?
        } else {
            self.extremal_record(ranking.column(), ranking.direction())?
        };

        Ok(match extremal {
            Extremal::Found(record) => RankingOutcome::Found {
                title: record.display_title().to_string(),
                value: record.value,
                description: ranking.describe(record.display_title(), record.value),
            },
            Extremal::Unavailable { column } => RankingOutcome::Unavailable {
                description: format!(
                    "No data available for {} (column '{}' is absent or has no values).",
                    ranking.label(),
                    column
                ),
            },
            Extremal::NotApplicable => RankingOutcome::NotApplicable {
                description: format!(
                    "No movie qualifies for ROI ranking (budget < ${}M for all movies).",
                    self.budget_floor
                ),
            },
        })
    }

    /// Evaluate every named ranking. A failing ranking is recorded as
    /// [`RankingOutcome::Failed`] and the rest still run.
    pub fn summarize(&self) -> RankingSummary {
        let entries = Ranking::ALL
            .iter()
            .map(|&ranking| {
                let outcome = self.ranking(ranking).unwrap_or_else(|err| {
                    warn!("Ranking '{}' failed: {}", ranking.key(), err);
                    RankingOutcome::Failed {
                        error: format!("Could not compute {}: {}", ranking.label(), err),
                    }
                });
                (ranking, outcome)
            })
            .collect();
        RankingSummary::new(entries)
    }

    /// Counts of derived KPI values.
    pub fn stats(&self) -> Result<KpiStats> {
        let profit = self.frame.column("profit")?;
        let roi = self.frame.column("roi")?;
        let roi_values = column_f64(&self.frame, "roi")?.unwrap_or_default();
        let present: Vec<f64> = roi_values.into_iter().flatten().collect();
        let mean_roi = if present.is_empty() {
            None
        } else {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        };

        Ok(KpiStats {
            movies_with_profit: profit.len() - profit.null_count(),
            movies_with_roi: roi.len() - roi.null_count(),
            roi_eligible: self.eligible.height(),
            mean_roi,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kpi_frame() -> DataFrame {
        df![
            "title" => [Some("Big Hit"), Some("Flop"), None, Some("Indie"), Some("Unknown Budget")],
            "budget_musd" => [Some(100.0), Some(50.0), Some(10.0), Some(9.999), None],
            "revenue_musd" => [Some(900.0), Some(10.0), Some(40.0), Some(200.0), Some(70.0)],
            "vote_count" => [Some(1000.0), Some(50.0), Some(1000.0), Some(10.0), None],
            "vote_average" => [Some(7.5), Some(4.0), Some(8.1), None, Some(8.1)],
        ]
        .unwrap()
    }

    fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        column_f64(df, name).unwrap().unwrap()
    }

    #[test]
    fn test_profit_and_roi_guards() {
        let df = df![
            "budget_musd" => [Some(10.0), None, Some(0.0), Some(4.0)],
            "revenue_musd" => [Some(20.0), Some(5.0), Some(3.0), None],
        ]
        .unwrap();

        let profit: Vec<Option<f64>> = compute_profit(&df)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        let roi: Vec<Option<f64>> = compute_roi(&df)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(profit, vec![Some(10.0), None, Some(3.0), None]);
        assert_eq!(roi, vec![Some(2.0), None, None, None]);
    }

    #[test]
    fn test_roi_present_only_with_nonzero_budget() {
        let df = df![
            "budget_musd" => [Some(1.0), Some(0.0), None, Some(2.0), None],
            "revenue_musd" => [Some(1.0), Some(1.0), Some(1.0), None, None],
        ]
        .unwrap();
        let engine = MetricEngine::new(&df, 10.0).unwrap();

        let budget = f64_values(engine.frame(), "budget_musd");
        let revenue = f64_values(engine.frame(), "revenue_musd");
        let profit = f64_values(engine.frame(), "profit");
        let roi = f64_values(engine.frame(), "roi");

        for row in 0..df.height() {
            assert_eq!(
                roi[row].is_some(),
                budget[row].is_some_and(|b| b != 0.0) && revenue[row].is_some()
            );
            assert_eq!(
                profit[row].is_some(),
                budget[row].is_some() && revenue[row].is_some()
            );
        }
    }

    #[test]
    fn test_missing_monetary_column_is_config_error() {
        let df = df!["budget_musd" => [1.0]].unwrap();
        let err = MetricEngine::new(&df, 10.0).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound(ref c) if c == "revenue_musd"));
    }

    #[test]
    fn test_roi_eligibility_boundary() {
        let engine = MetricEngine::new(&kpi_frame(), 10.0).unwrap();
        let eligible = f64_values(engine.roi_eligible(), "budget_musd");
        assert_eq!(eligible, vec![Some(100.0), Some(50.0), Some(10.0)]);
    }

    #[test]
    fn test_extremal_ties_keep_first() {
        let engine = MetricEngine::new(&kpi_frame(), 10.0).unwrap();
        let Extremal::Found(record) = engine
            .extremal_record("vote_count", Direction::Max)
            .unwrap()
        else {
            panic!("expected a record");
        };
        assert_eq!(record.row, 0);
        assert_eq!(record.title.as_deref(), Some("Big Hit"));

        let Extremal::Found(record) = engine
            .extremal_record("vote_average", Direction::Max)
            .unwrap()
        else {
            panic!("expected a record");
        };
        assert_eq!(record.row, 2);
        assert_eq!(record.display_title(), UNKNOWN_TITLE);
    }

    #[test]
    fn test_extremal_unavailable() {
        let engine = MetricEngine::new(&kpi_frame(), 10.0).unwrap();
        assert_eq!(
            engine.extremal_record("popularity", Direction::Max).unwrap(),
            Extremal::Unavailable {
                column: "popularity".to_string()
            }
        );

        let df = df![
            "title" => ["A"],
            "budget_musd" => [None::<f64>],
            "revenue_musd" => [None::<f64>],
        ]
        .unwrap();
        let engine = MetricEngine::new(&df, 10.0).unwrap();
        assert!(matches!(
            engine.extremal_record("revenue_musd", Direction::Max).unwrap(),
            Extremal::Unavailable { .. }
        ));
        assert_eq!(
            engine.roi_eligible_extremal(Direction::Max).unwrap(),
            Extremal::NotApplicable
        );
    }

    #[test]
    fn test_roi_rankings_use_eligible_subset() {
        let engine = MetricEngine::new(&kpi_frame(), 10.0).unwrap();

        // "Indie" has the best ROI overall but a budget under the floor.
        let Extremal::Found(best) = engine.roi_eligible_extremal(Direction::Max).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(best.title.as_deref(), Some("Big Hit"));
        assert_eq!(best.value, 9.0);

        let Extremal::Found(worst) = engine.roi_eligible_extremal(Direction::Min).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(worst.title.as_deref(), Some("Flop"));
    }

    #[test]
    fn test_summarize_covers_every_ranking() {
        let engine = MetricEngine::new(&kpi_frame(), 10.0).unwrap();
        let summary = engine.summarize();

        assert_eq!(summary.iter().count(), Ranking::ALL.len());
        assert_eq!(summary.failures(), 0);
        assert_eq!(
            summary.get(Ranking::HighestRevenue).unwrap().description(),
            "The highest revenue movie is 'Big Hit' with $900.00 million."
        );
        assert_eq!(
            summary.get(Ranking::LowestProfit).unwrap().description(),
            "The least profitable movie is 'Flop' with a profit of $-40.00 million."
        );
        assert!(matches!(
            summary.get(Ranking::MostPopular),
            Some(RankingOutcome::Unavailable { .. })
        ));
    }

    #[test]
    fn test_failing_ranking_does_not_stop_the_others() {
        let mut df = kpi_frame();
        let popularity: Vec<Series> = (0..df.height())
            .map(|i| Series::new("".into(), [i as f64]))
            .collect();
        df.with_column(Series::new("popularity".into(), popularity))
            .unwrap();

        let summary = MetricEngine::new(&df, 10.0).unwrap().summarize();

        assert_eq!(summary.iter().count(), Ranking::ALL.len());
        assert_eq!(summary.failures(), 1);
        match summary.get(Ranking::MostPopular) {
            Some(RankingOutcome::Failed { error }) => {
                assert!(error.starts_with("Could not compute"), "{}", error)
            }
            other => panic!("expected a failed ranking, got {:?}", other),
        }
        assert!(summary.get(Ranking::HighestRevenue).unwrap().is_found());
        assert!(summary.get(Ranking::LowestRoi).unwrap().is_found());
        assert!(summary.get(Ranking::MostVoted).unwrap().is_found());
    }

    #[test]
    fn test_not_applicable_roi_ranking() {
        let df = df![
            "title" => ["Small"],
            "budget_musd" => [2.0],
            "revenue_musd" => [8.0],
        ]
        .unwrap();
        let engine = MetricEngine::new(&df, 10.0).unwrap();
        let outcome = engine.ranking(Ranking::HighestRoi).unwrap();

        assert_eq!(
            outcome,
            RankingOutcome::NotApplicable {
                description: "No movie qualifies for ROI ranking (budget < $10M for all movies)."
                    .to_string()
            }
        );
    }

    #[test]
    fn test_stats() {
        let engine = MetricEngine::new(&kpi_frame(), 10.0).unwrap();
        let stats = engine.stats().unwrap();
        assert_eq!(stats.movies_with_profit, 4);
        assert_eq!(stats.movies_with_roi, 4);
        assert_eq!(stats.roi_eligible, 3);
        assert!(stats.mean_roi.is_some());
    }
}
