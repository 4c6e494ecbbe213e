//! Named ranking queries and their outcomes.

use serde::Serialize;
use serde::ser::SerializeMap;

use super::Direction;

/// Placeholder used when the winning record has no title.
pub const UNKNOWN_TITLE: &str = "<Unknown Title>";

/// The named ranking queries over the KPI frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    HighestRevenue,
    HighestBudget,
    HighestProfit,
    LowestProfit,
    HighestRoi,
    LowestRoi,
    MostVoted,
    HighestRated,
    LowestRated,
    MostPopular,
}

impl Ranking {
    /// Every ranking, in report order.
    pub const ALL: [Ranking; 10] = [
        Ranking::HighestRevenue,
        Ranking::HighestBudget,
        Ranking::HighestProfit,
        Ranking::LowestProfit,
        Ranking::HighestRoi,
        Ranking::LowestRoi,
        Ranking::MostVoted,
        Ranking::HighestRated,
        Ranking::LowestRated,
        Ranking::MostPopular,
    ];

    /// Stable key used in summaries and reports.
    pub fn key(self) -> &'static str {
        match self {
            Ranking::HighestRevenue => "highest_revenue",
            Ranking::HighestBudget => "highest_budget",
            Ranking::HighestProfit => "highest_profit",
            Ranking::LowestProfit => "lowest_profit",
            Ranking::HighestRoi => "highest_roi",
            Ranking::LowestRoi => "lowest_roi",
            Ranking::MostVoted => "most_voted",
            Ranking::HighestRated => "highest_rated",
            Ranking::LowestRated => "lowest_rated",
            Ranking::MostPopular => "most_popular",
        }
    }

    /// Human-readable name of the query.
    pub fn label(self) -> &'static str {
        match self {
            Ranking::HighestRevenue => "highest revenue movie",
            Ranking::HighestBudget => "highest budget movie",
            Ranking::HighestProfit => "most profitable movie",
            Ranking::LowestProfit => "least profitable movie",
            Ranking::HighestRoi => "highest ROI movie",
            Ranking::LowestRoi => "lowest ROI movie",
            Ranking::MostVoted => "most voted movie",
            Ranking::HighestRated => "highest rated movie",
            Ranking::LowestRated => "lowest rated movie",
            Ranking::MostPopular => "most popular movie",
        }
    }

    /// Column the ranking reads.
    pub fn column(self) -> &'static str {
        match self {
            Ranking::HighestRevenue => "revenue_musd",
            Ranking::HighestBudget => "budget_musd",
            Ranking::HighestProfit | Ranking::LowestProfit => "profit",
            Ranking::HighestRoi | Ranking::LowestRoi => "roi",
            Ranking::MostVoted => "vote_count",
            Ranking::HighestRated | Ranking::LowestRated => "vote_average",
            Ranking::MostPopular => "popularity",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Ranking::LowestProfit | Ranking::LowestRoi | Ranking::LowestRated => Direction::Min,
            _ => Direction::Max,
        }
    }

    /// ROI rankings only consider the ROI-eligible subset.
    pub fn uses_roi_subset(self) -> bool {
        matches!(self, Ranking::HighestRoi | Ranking::LowestRoi)
    }

    fn precision(self) -> usize {
        match self {
            Ranking::MostVoted => 0,
            _ => 2,
        }
    }

    /// One-line description of a winning record.
    pub fn describe(self, title: &str, value: f64) -> String {
        let v = format!("{:.*}", self.precision(), value);
        match self {
            Ranking::HighestRevenue => {
                format!("The highest revenue movie is '{title}' with ${v} million.")
            }
            Ranking::HighestBudget => {
                format!("The highest budget movie is '{title}' with ${v} million.")
            }
            Ranking::HighestProfit => {
                format!("The most profitable movie is '{title}' with a profit of ${v} million.")
            }
            Ranking::LowestProfit => {
                format!("The least profitable movie is '{title}' with a profit of ${v} million.")
            }
            Ranking::HighestRoi => {
                format!("The highest ROI movie is '{title}' with an ROI of {v}x.")
            }
            Ranking::LowestRoi => format!("The lowest ROI movie is '{title}' with an ROI of {v}x."),
            Ranking::MostVoted => format!("The most voted movie is '{title}' with {v} votes."),
            Ranking::HighestRated => {
                format!("The highest rated movie is '{title}' with a rating of {v}.")
            }
            Ranking::LowestRated => {
                format!("The lowest rated movie is '{title}' with a rating of {v}.")
            }
            Ranking::MostPopular => {
                format!("The most popular movie is '{title}' with a popularity score of {v}.")
            }
        }
    }
}

/// Result of one named ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankingOutcome {
    Found {
        title: String,
        value: f64,
        description: String,
    },
    /// The ranked column is absent or has no values.
    Unavailable { description: String },
    /// No record qualifies for an ROI ranking.
    NotApplicable { description: String },
    /// The ranking failed; the others are unaffected.
    Failed { error: String },
}

impl RankingOutcome {
    pub fn description(&self) -> &str {
        match self {
            RankingOutcome::Found { description, .. }
            | RankingOutcome::Unavailable { description }
            | RankingOutcome::NotApplicable { description } => description,
            RankingOutcome::Failed { error } => error,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RankingOutcome::Found { .. })
    }
}

/// All ranking outcomes, in [`Ranking::ALL`] order.
///
/// Serializes as a map from ranking key to outcome.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankingSummary {
    entries: Vec<(Ranking, RankingOutcome)>,
}

impl RankingSummary {
    pub(crate) fn new(entries: Vec<(Ranking, RankingOutcome)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, ranking: Ranking) -> Option<&RankingOutcome> {
        self.entries
            .iter()
            .find(|(r, _)| *r == ranking)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Ranking, RankingOutcome)> {
        self.entries.iter()
    }

    /// Key to description pairs, in order.
    pub fn descriptions(&self) -> Vec<(&'static str, &str)> {
        self.entries
            .iter()
            .map(|(r, outcome)| (r.key(), outcome.description()))
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, RankingOutcome::Failed { .. }))
            .count()
    }
}

impl Serialize for RankingSummary {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (ranking, outcome) in &self.entries {
            map.serialize_entry(ranking.key(), outcome)?;
        }
        map.end()
    }
}
