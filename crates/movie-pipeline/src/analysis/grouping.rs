//! Group-by primitives shared by the category, franchise and director
//! rollups.
//!
//! Every rollup is a stable lazy group-by: groups come out in first-seen key
//! order, and a descending sort keeps that order among equal values.

use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::utils::{column_f64, column_strings};

const MOVIES: &str = "movies";
const PRESENT: &str = "present";
const VALUE: &str = "value";
const SUM: &str = "sum";
const MEAN: &str = "mean";

/// Aggregate applied to each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    /// Number of records in the group; the metric column is not read.
    Count,
    Sum,
    Mean,
    Median,
}

impl Aggregate {
    /// Aggregation expression over `metric`.
    pub fn expr(self, metric: &str) -> Expr {
        let values = col(metric).cast(DataType::Float64);
        match self {
            Aggregate::Count => len().cast(DataType::Float64),
            Aggregate::Sum => values.sum(),
            Aggregate::Mean => values.mean(),
            Aggregate::Median => values.median(),
        }
    }

    pub fn reads_metric(self) -> bool {
        self != Aggregate::Count
    }
}

/// One aggregated group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub group: String,
    /// Records contributing to the group.
    pub movies: usize,
    pub value: f64,
}

/// Sum and mean of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumMean {
    pub group: String,
    pub movies: usize,
    pub sum: f64,
    pub mean: f64,
}

/// Order of the groups in a rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupOrder {
    FirstSeen,
    Descending,
}

fn descending(lf: LazyFrame, column: &str, order: GroupOrder) -> LazyFrame {
    match order {
        GroupOrder::FirstSeen => lf,
        GroupOrder::Descending => lf.sort(
            [column],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true)
                .with_maintain_order(true),
        ),
    }
}

/// `aggregate` of `metric` per value of `key`.
///
/// `grouped` must already hold one row per (record, group) pair; rows with a
/// missing `key` belong to no group. Groups with no values to aggregate are
/// left out.
pub(crate) fn aggregate_by(
    grouped: LazyFrame,
    key: &str,
    aggregate: Aggregate,
    metric: &str,
    order: GroupOrder,
) -> Result<Vec<GroupValue>> {
    let mut aggs = vec![len().alias(MOVIES), aggregate.expr(metric).alias(VALUE)];
    let mut lf = grouped.filter(col(key).is_not_null());
    if aggregate.reads_metric() {
        aggs.push(col(metric).count().alias(PRESENT));
        lf = lf
            .group_by_stable([col(key)])
            .agg(aggs)
            .filter(col(PRESENT).gt(lit(0)));
    } else {
        lf = lf.group_by_stable([col(key)]).agg(aggs);
    }

    let out = descending(lf, VALUE, order).collect()?;
    group_values(&out, key)
}

/// Sum and mean of `metric` per value of `key`; descending order sorts by sum.
pub(crate) fn sum_and_mean_by(
    grouped: LazyFrame,
    key: &str,
    metric: &str,
    order: GroupOrder,
) -> Result<Vec<SumMean>> {
    let lf = grouped
        .filter(col(key).is_not_null())
        .group_by_stable([col(key)])
        .agg([
            len().alias(MOVIES),
            Aggregate::Sum.expr(metric).alias(SUM),
            Aggregate::Mean.expr(metric).alias(MEAN),
            col(metric).count().alias(PRESENT),
        ])
        .filter(col(PRESENT).gt(lit(0)));

    let out = descending(lf, SUM, order).collect()?;
    let keys = column_strings(&out, key)?.unwrap_or_default();
    let movies = column_f64(&out, MOVIES)?.unwrap_or_default();
    let sums = column_f64(&out, SUM)?.unwrap_or_default();
    let means = column_f64(&out, MEAN)?.unwrap_or_default();

    Ok(keys
        .into_iter()
        .zip(movies)
        .zip(sums.into_iter().zip(means))
        .filter_map(|((group, movies), (sum, mean))| {
            Some(SumMean {
                group: group?,
                movies: movies? as usize,
                sum: sum?,
                mean: mean?,
            })
        })
        .collect())
}

fn group_values(out: &DataFrame, key: &str) -> Result<Vec<GroupValue>> {
    let keys = column_strings(out, key)?.unwrap_or_default();
    let movies = column_f64(out, MOVIES)?.unwrap_or_default();
    let values = column_f64(out, VALUE)?.unwrap_or_default();

    Ok(keys
        .into_iter()
        .zip(movies)
        .zip(values)
        .filter_map(|((group, movies), value)| {
            Some(GroupValue {
                group: group?,
                movies: movies? as usize,
                value: value?,
            })
        })
        .collect())
}

/// One row per distinct non-empty name in the delimiter-joined `column`,
/// with the names under `key`. A record naming the same person twice still
/// contributes one row for them.
pub(crate) fn explode_names(
    df: &DataFrame,
    column: &str,
    key: &str,
    delimiter: char,
) -> LazyFrame {
    const ROW: &str = "__row";
    let name = col(key).str().strip_chars(lit(NULL));

    df.clone()
        .lazy()
        .with_row_index(ROW, None)
        .with_column(
            col(column)
                .cast(DataType::String)
                .str()
                .split(lit(delimiter.to_string()))
                .alias(key),
        )
        .explode(cols([key]))
        .with_column(name.alias(key))
        .filter(col(key).neq(lit("")))
        .unique_stable(Some(cols([ROW, key])), UniqueKeepStrategy::First)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        df![
            "names" => [Some("X|Y"), Some("Y"), None, Some("Z| X |Z")],
            "metric" => [Some(10.0), None, Some(5.0), Some(1.0)],
        ]
        .unwrap()
    }

    fn pairs(values: &[GroupValue]) -> Vec<(&str, usize, f64)> {
        values
            .iter()
            .map(|g| (g.group.as_str(), g.movies, g.value))
            .collect()
    }

    #[test]
    fn test_exploded_rows_contribute_to_each_group() {
        let grouped = explode_names(&frame(), "names", "name", '|');

        let counts = aggregate_by(
            grouped.clone(),
            "name",
            Aggregate::Count,
            "metric",
            GroupOrder::FirstSeen,
        )
        .unwrap();
        assert_eq!(
            pairs(&counts),
            vec![("X", 2, 2.0), ("Y", 2, 2.0), ("Z", 1, 1.0)]
        );

        let sums = aggregate_by(
            grouped,
            "name",
            Aggregate::Sum,
            "metric",
            GroupOrder::FirstSeen,
        )
        .unwrap();
        assert_eq!(
            pairs(&sums),
            vec![("X", 2, 11.0), ("Y", 2, 10.0), ("Z", 1, 1.0)]
        );
    }

    #[test]
    fn test_aggregates() {
        let df = df![
            "key" => ["a", "a", "a", "a", "b"],
            "metric" => [4.0, 1.0, 3.0, 2.0, 9.0],
        ]
        .unwrap();
        let run = |aggregate| {
            let out = aggregate_by(
                df.clone().lazy(),
                "key",
                aggregate,
                "metric",
                GroupOrder::FirstSeen,
            )
            .unwrap();
            out.iter().map(|g| (g.group.clone(), g.value)).collect::<Vec<_>>()
        };
        let expected = |a: f64, b: f64| vec![("a".to_string(), a), ("b".to_string(), b)];

        assert_eq!(run(Aggregate::Sum), expected(10.0, 9.0));
        assert_eq!(run(Aggregate::Mean), expected(2.5, 9.0));
        assert_eq!(run(Aggregate::Median), expected(2.5, 9.0));
        assert_eq!(run(Aggregate::Count), expected(4.0, 1.0));
    }

    #[test]
    fn test_groups_without_values_are_absent() {
        let df = df![
            "key" => [Some("A"), Some("B"), None],
            "metric" => [Some(1.0), None, Some(3.0)],
        ]
        .unwrap();

        let means = aggregate_by(
            df.clone().lazy(),
            "key",
            Aggregate::Mean,
            "metric",
            GroupOrder::FirstSeen,
        )
        .unwrap();
        assert_eq!(pairs(&means), vec![("A", 1, 1.0)]);

        let stats = sum_and_mean_by(df.lazy(), "key", "metric", GroupOrder::FirstSeen).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].group, "A");
    }

    #[test]
    fn test_descending_order_is_stable() {
        let df = df![
            "key" => ["first", "top", "second"],
            "metric" => [2.0, 5.0, 2.0],
        ]
        .unwrap();
        let out = aggregate_by(
            df.lazy(),
            "key",
            Aggregate::Sum,
            "metric",
            GroupOrder::Descending,
        )
        .unwrap();
        let order: Vec<&str> = out.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(order, vec!["top", "first", "second"]);
    }
}
