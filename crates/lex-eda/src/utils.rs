//! Shared utilities for the EDA session.
//!
//! Helpers used across the imputation and chart modules.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Value Extraction Utilities
// =============================================================================

/// Read a series as nullable floats.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Read a series as nullable strings (booleans and dates use their display form).
pub fn categorical_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always Float64.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let values: Vec<f64> = numeric_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

/// Fill null values in a Series with a string label.
///
/// The result is always String.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let values: Vec<String> = categorical_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

// =============================================================================
// Category Utilities
// =============================================================================

/// Marker appended to shortened labels.
pub const ELLIPSIS: &str = "...";

/// Shorten a display label to `max_len` characters plus an ellipsis marker.
///
/// # Example
///
/// ```rust,ignore
/// use lex_eda::utils::shorten_label;
///
/// assert_eq!(shorten_label("Oslo", 15), "Oslo");
/// assert_eq!(shorten_label("Transportation Services", 15), "Transportation ...");
/// ```
pub fn shorten_label(label: &str, max_len: usize) -> String {
    if label.chars().count() <= max_len {
        label.to_string()
    } else {
        let mut short: String = label.chars().take(max_len).collect();
        short.push_str(ELLIPSIS);
        short
    }
}

/// Count non-null values, most frequent first.
///
/// Counting follows first appearance and the sort is stable, so equal counts
/// keep the order in which their values first occur.
pub fn value_counts(values: &[Option<String>]) -> Vec<(String, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in values.iter().flatten() {
        match index.get(value.as_str()) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value.as_str(), counts.len());
                counts.push((value.clone(), 1));
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// The `limit` most frequent non-null values with their counts.
pub fn top_categories(values: &[Option<String>], limit: usize) -> Vec<(String, usize)> {
    let mut counts = value_counts(values);
    counts.truncate(limit);
    counts
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(is_numeric_dtype(&DataType::UInt8));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
        assert!(!is_numeric_dtype(&DataType::Date));
    }

    #[test]
    fn test_fill_numeric_nulls() {
        let series = Series::new("test".into(), &[Some(1i64), None, Some(3)]);
        let filled = fill_numeric_nulls(&series, 0.0).unwrap();

        assert_eq!(filled.dtype(), &DataType::Float64);
        assert_eq!(filled.null_count(), 0);
        assert_eq!(filled.get(1).unwrap().try_extract::<f64>().unwrap(), 0.0);
        assert_eq!(filled.get(2).unwrap().try_extract::<f64>().unwrap(), 3.0);
    }

    #[test]
    fn test_fill_string_nulls() {
        let series = Series::new("test".into(), &[Some("a"), None, Some("b")]);
        let filled = fill_string_nulls(&series, "None").unwrap();
        let values = categorical_values(&filled).unwrap();

        assert_eq!(
            values,
            vec![
                Some("a".to_string()),
                Some("None".to_string()),
                Some("b".to_string())
            ]
        );
    }

    #[test]
    fn test_fill_string_nulls_boolean_column() {
        let series = Series::new("flag".into(), &[Some(true), None]);
        let filled = fill_string_nulls(&series, "None").unwrap();
        assert_eq!(filled.dtype(), &DataType::String);
        assert_eq!(
            categorical_values(&filled).unwrap(),
            vec![Some("true".to_string()), Some("None".to_string())]
        );
    }

    #[test]
    fn test_shorten_label() {
        assert_eq!(shorten_label("short", 15), "short");
        assert_eq!(shorten_label("exactly fifteen", 15), "exactly fifteen");
        assert_eq!(
            shorten_label("Transportation Services", 15),
            "Transportation ..."
        );
        // Counts characters, not bytes
        assert_eq!(shorten_label("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_value_counts_orders_by_frequency() {
        let values: Vec<Option<String>> = ["b", "a", "b", "c", "b", "a"]
            .iter()
            .map(|s| Some(s.to_string()))
            .collect();
        let counts = value_counts(&values);
        assert_eq!(
            counts,
            vec![
                ("b".to_string(), 3),
                ("a".to_string(), 2),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_value_counts_ties_keep_first_appearance() {
        let values = vec![
            Some("z".to_string()),
            None,
            Some("y".to_string()),
            Some("x".to_string()),
        ];
        let counts = value_counts(&values);
        let names: Vec<&str> = counts.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(names, vec!["z", "y", "x"]);
    }

    #[test]
    fn test_top_categories_limit() {
        let values: Vec<Option<String>> = (0..15).map(|i| Some(format!("c{}", i))).collect();
        assert_eq!(top_categories(&values, 10).len(), 10);
    }
}
