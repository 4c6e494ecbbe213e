//! Filtered movie listings.
//!
//! Matching is a case-insensitive substring test. A missing or absent
//! field never matches and never errors; an empty listing is a valid result.

use polars::prelude::*;

use crate::error::Result;
use crate::utils::has_column;

/// Columns returned by [`top_by_genre_and_cast`].
pub const GENRE_LISTING_COLUMNS: [&str; 4] = ["title", "genres", "vote_count", "vote_average"];

/// Columns returned by [`filter_by_cast_and_director`].
pub const DIRECTOR_LISTING_COLUMNS: [&str; 3] = ["title", "directors", "release_date"];

/// Case-insensitive substring test on `field`. Missing cells never match.
fn contains_ignore_case(field: &str, needle: &str) -> Expr {
    col(field)
        .cast(DataType::String)
        .str()
        .to_lowercase()
        .str()
        .contains_literal(lit(needle.to_lowercase()))
}

/// Rows matching every `(field, needle)` filter, by `sort_by` descending
/// with missing values last, at most `limit`, restricted to the listing
/// columns that exist.
fn listing(
    df: &DataFrame,
    filters: &[(&str, &str)],
    sort_by: &str,
    limit: Option<usize>,
    columns: &[&str],
) -> Result<DataFrame> {
    let present: Vec<Expr> = columns
        .iter()
        .copied()
        .filter(|c| has_column(df, c))
        .map(col)
        .collect();

    let mut lf = df.clone().lazy();
    if filters.iter().any(|(field, _)| !has_column(df, field)) {
        lf = lf.limit(0);
    }
    for (field, needle) in filters {
        if has_column(df, field) {
            lf = lf.filter(contains_ignore_case(field, needle));
        }
    }
    if has_column(df, sort_by) {
        lf = lf.sort(
            [sort_by],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_nulls_last(true)
                .with_maintain_order(true),
        );
    }
    if let Some(n) = limit {
        lf = lf.limit(IdxSize::try_from(n).unwrap_or(IdxSize::MAX));
    }

    Ok(lf.select(present).collect()?)
}

/// Movies in `genre` featuring `actor`, by vote count descending, at most `n`.
pub fn top_by_genre_and_cast(
    df: &DataFrame,
    genre: &str,
    actor: &str,
    n: usize,
) -> Result<DataFrame> {
    listing(
        df,
        &[("genres", genre), ("cast", actor)],
        "vote_count",
        Some(n),
        &GENRE_LISTING_COLUMNS,
    )
}

/// Movies featuring `actor` and directed by `director`, by runtime descending.
pub fn filter_by_cast_and_director(
    df: &DataFrame,
    actor: &str,
    director: &str,
) -> Result<DataFrame> {
    listing(
        df,
        &[("cast", actor), ("directors", director)],
        "runtime",
        None,
        &DIRECTOR_LISTING_COLUMNS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_strings;

    fn movies() -> DataFrame {
        df![
            "title" => ["Blade Runner", "Star Wars", "Witness", "Empire", "Kill Bill", "Pulp Fiction"],
            "genres" => [Some("Science Fiction|Drama"), Some("Adventure|science fiction"), Some("Drama"), Some("Science Fiction"), Some("Action"), None],
            "cast" => [Some("Harrison Ford|Rutger Hauer"), Some("Mark Hamill|Harrison Ford"), Some("Harrison Ford"), None, Some("Uma Thurman"), Some("John Travolta|Uma Thurman")],
            "directors" => [Some("Ridley Scott"), Some("George Lucas"), Some("Peter Weir"), Some("Irvin Kershner"), Some("Quentin Tarantino"), Some("Quentin Tarantino")],
            "vote_count" => [Some(900.0), Some(1500.0), Some(300.0), Some(2000.0), Some(700.0), None],
            "vote_average" => [7.9, 8.2, 7.4, 8.4, 7.7, 8.5],
            "runtime" => [Some(117.0), Some(121.0), Some(112.0), Some(124.0), Some(111.0), Some(154.0)],
        ]
        .unwrap()
    }

    fn titles(df: &DataFrame) -> Vec<String> {
        column_strings(df, "title")
            .unwrap()
            .unwrap()
            .into_iter()
            .flatten()
            .collect()
    }

    #[test]
    fn test_genre_and_cast_sorted_by_votes() {
        let out = top_by_genre_and_cast(&movies(), "science fiction", "harrison ford", 5).unwrap();
        assert_eq!(titles(&out), vec!["Star Wars", "Blade Runner"]);
        let names: Vec<&str> = out.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, GENRE_LISTING_COLUMNS.to_vec());
    }

    #[test]
    fn test_genre_query_respects_limit() {
        let out = top_by_genre_and_cast(&movies(), "Science Fiction", "Harrison Ford", 1).unwrap();
        assert_eq!(titles(&out), vec!["Star Wars"]);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let out = top_by_genre_and_cast(&movies(), "Western", "Harrison Ford", 5).unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn test_cast_and_director_sorted_by_runtime() {
        let out =
            filter_by_cast_and_director(&movies(), "Uma Thurman", "Quentin Tarantino").unwrap();
        assert_eq!(titles(&out), vec!["Pulp Fiction", "Kill Bill"]);
        // release_date is absent from this frame and is left out.
        assert_eq!(out.width(), 2);
    }

    #[test]
    fn test_absent_field_never_matches() {
        let df = df!["title" => ["A"], "cast" => ["Uma Thurman"]].unwrap();
        let out = filter_by_cast_and_director(&df, "Uma Thurman", "Quentin Tarantino").unwrap();
        assert_eq!(out.height(), 0);
    }

    #[test]
    fn test_missing_sort_values_go_last() {
        let df = df![
            "title" => ["A", "B", "C"],
            "genres" => ["Drama", "Drama", "Drama"],
            "cast" => ["X", "X", "X"],
            "vote_count" => [None, Some(5.0), Some(10.0)],
        ]
        .unwrap();
        let out = top_by_genre_and_cast(&df, "drama", "x", 10).unwrap();
        assert_eq!(titles(&out), vec!["C", "B", "A"]);
    }
}
