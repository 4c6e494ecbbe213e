//! Value-level sanitization for numeric and text columns.

use polars::prelude::*;

/// Replace literal zeros with null in a Float64 series.
pub(crate) fn null_zeros(series: &Series) -> PolarsResult<Series> {
    let values: Vec<Option<f64>> = series
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| *x != 0.0))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Divide every value of a Float64 series by `divisor`.
pub(crate) fn rescale(series: &Series, divisor: f64) -> PolarsResult<Series> {
    let values: Vec<Option<f64>> = series
        .f64()?
        .into_iter()
        .map(|v| v.map(|x| x / divisor))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Null out `values` wherever the paired `counts` value is zero.
///
/// Returns the new series and how many values were nulled.
pub(crate) fn null_where_zero_count(
    values: &Series,
    counts: &Series,
) -> PolarsResult<(Series, usize)> {
    let counts = counts.cast(&DataType::Float64)?;
    let values_f64 = values.cast(&DataType::Float64)?;
    let mut nulled = 0;

    let result: Vec<Option<f64>> = values_f64
        .f64()?
        .into_iter()
        .zip(counts.f64()?.into_iter())
        .map(|(value, count)| match (value, count) {
            (Some(_), Some(c)) if c == 0.0 => {
                nulled += 1;
                None
            }
            (value, _) => value,
        })
        .collect();

    Ok((Series::new(values.name().clone(), result), nulled))
}

/// Map placeholders to null and trim the rest; values emptied by trimming
/// become null too.
///
/// Placeholders are matched exactly (case-sensitive) on the raw value and
/// on the trimmed value. Returns the new series and how many values were
/// nulled.
pub(crate) fn clean_text(
    series: &Series,
    placeholders: &[String],
) -> PolarsResult<(Series, usize)> {
    let is_placeholder = |s: &str| placeholders.iter().any(|p| p == s);
    let text = series.cast(&DataType::String)?;
    let mut nulled = 0;

    let values: Vec<Option<String>> = text
        .str()?
        .into_iter()
        .map(|v| {
            let raw = v?;
            let trimmed = raw.trim();
            if is_placeholder(raw) || is_placeholder(trimmed) || trimmed.is_empty() {
                nulled += 1;
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect();

    Ok((Series::new(series.name().clone(), values), nulled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders() -> Vec<String> {
        ["No Data", "No overview available.", "None", "", "nan", "N/A"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_null_zeros_and_rescale() {
        let series = Series::new("budget".into(), &[Some(0.0), Some(5_000_000.0), None]);
        let zeroed = null_zeros(&series).unwrap();
        let scaled = rescale(&zeroed, 1_000_000.0).unwrap();

        let values: Vec<Option<f64>> = scaled.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![None, Some(5.0), None]);
    }

    #[test]
    fn test_null_where_zero_count() {
        let avg = Series::new("vote_average".into(), &[Some(8.5), Some(7.0), None]);
        let count = Series::new("vote_count".into(), &[Some(0.0), Some(12.0), Some(0.0)]);
        let (result, nulled) = null_where_zero_count(&avg, &count).unwrap();

        let values: Vec<Option<f64>> = result.f64().unwrap().into_iter().collect();
        assert_eq!(values, vec![None, Some(7.0), None]);
        assert_eq!(nulled, 1);
    }

    #[test]
    fn test_clean_text() {
        let series = Series::new(
            "overview".into(),
            &[
                Some("  A heist goes wrong.  "),
                Some("No overview available."),
                Some("   "),
                Some(" N/A "),
                Some("none"),
                None,
            ],
        );
        let (result, nulled) = clean_text(&series, &placeholders()).unwrap();
        let values: Vec<Option<&str>> = result.str().unwrap().into_iter().collect();

        assert_eq!(
            values,
            vec![Some("A heist goes wrong."), None, None, None, Some("none"), None]
        );
        assert_eq!(nulled, 3);
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        let series = Series::new("tagline".into(), &[Some(" x "), Some("nan")]);
        let (once, _) = clean_text(&series, &placeholders()).unwrap();
        let (twice, nulled) = clean_text(&once, &placeholders()).unwrap();
        assert!(once.equals_missing(&twice));
        assert_eq!(nulled, 0);
    }
}
