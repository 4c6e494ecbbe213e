//! Type coercion for numeric and date columns.
//!
//! Values that cannot be converted become null; each function also returns
//! how many non-null inputs were lost that way.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::utils::{is_numeric_dtype, parse_finite_f64};

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

fn non_null(series: &Series) -> usize {
    series.len() - series.null_count()
}

/// Coerce a series to Float64. Unparseable and non-finite values become null.
pub(crate) fn coerce_numeric(series: &Series) -> PolarsResult<(Series, usize)> {
    let values: Vec<Option<f64>> = if is_numeric_dtype(series.dtype())
        || matches!(series.dtype(), DataType::Boolean)
    {
        let cast = series.cast(&DataType::Float64)?;
        cast.f64()?
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect()
    } else {
        let text = series.cast(&DataType::String)?;
        text.str()?
            .into_iter()
            .map(|v| v.and_then(parse_finite_f64))
            .collect()
    };

    let result = Series::new(series.name().clone(), values);
    let lost = non_null(series) - non_null(&result);
    Ok((result, lost))
}

/// Parse a calendar date. Timestamps are truncated to their date part.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            s.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}

/// Coerce a series to the Date type. Unparseable values become null.
pub(crate) fn coerce_date(series: &Series) -> PolarsResult<(Series, usize)> {
    match series.dtype() {
        DataType::Date => Ok((series.clone(), 0)),
        DataType::Datetime(_, _) => Ok((series.cast(&DataType::Date)?, 0)),
        _ => {
            let text = series.cast(&DataType::String)?;
            let days: Vec<Option<i32>> = text
                .str()?
                .into_iter()
                .map(|v| {
                    v.and_then(parse_date)
                        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                })
                .collect();

            let result = Series::new(series.name().clone(), days).cast(&DataType::Date)?;
            let lost = non_null(series) - non_null(&result);
            Ok((result, lost))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_numeric_from_strings() {
        let series = Series::new(
            "budget".into(),
            &[Some("100"), Some(" 2.5 "), Some("abc"), None, Some("nan")],
        );
        let (result, lost) = coerce_numeric(&series).unwrap();

        assert_eq!(result.dtype(), &DataType::Float64);
        let values: Vec<Option<f64>> = result.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(100.0), Some(2.5), None, None, None]);
        assert_eq!(lost, 2);
    }

    #[test]
    fn test_coerce_numeric_from_integers() {
        let series = Series::new("vote_count".into(), &[Some(10i64), None, Some(0)]);
        let (result, lost) = coerce_numeric(&series).unwrap();
        let values: Vec<Option<f64>> = result.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(10.0), None, Some(0.0)]);
        assert_eq!(lost, 0);
    }

    #[test]
    fn test_coerce_numeric_is_idempotent() {
        let series = Series::new("x".into(), &[Some(1.5), None]);
        let (once, _) = coerce_numeric(&series).unwrap();
        let (twice, lost) = coerce_numeric(&once).unwrap();
        assert!(once.equals_missing(&twice));
        assert_eq!(lost, 0);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2019, 4, 24);
        assert_eq!(parse_date("2019-04-24"), expected);
        assert_eq!(parse_date("2019/04/24"), expected);
        assert_eq!(parse_date("2019-04-24T00:00:00"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_coerce_date() {
        let series = Series::new("release_date".into(), &[Some("1970-01-02"), Some("bad"), None]);
        let (result, lost) = coerce_date(&series).unwrap();

        assert_eq!(result.dtype(), &DataType::Date);
        assert_eq!(lost, 1);
        let days = result.to_physical_repr();
        let days: Vec<Option<i32>> = days.i32().unwrap().into_iter().collect();
        assert_eq!(days, vec![Some(1), None, None]);

        let (again, lost) = coerce_date(&result).unwrap();
        assert!(again.equals_missing(&result));
        assert_eq!(lost, 0);
    }
}
