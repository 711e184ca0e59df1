//! Statistical imputation methods.
//!
//! Provides the constant and mean fills the imputation engine applies.

use crate::error::Result;
use crate::utils::{fill_numeric_nulls, fill_string_nulls};
use polars::prelude::*;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls of a numeric column with `0`.
    pub fn apply_zero_fill(df: &mut DataFrame, col_name: &str) -> Result<()> {
        let filled = {
            let series = df.column(col_name)?.as_materialized_series();
            fill_numeric_nulls(series, 0.0)?
        };
        df.replace(col_name, filled)?;
        Ok(())
    }

    /// Fill nulls of a numeric column with the mean of its non-null values.
    ///
    /// Returns the mean used, or `None` when the column has no values to
    /// average (the column is then left as-is).
    pub fn apply_numeric_mean(df: &mut DataFrame, col_name: &str) -> Result<Option<f64>> {
        let filled = {
            let series = df.column(col_name)?.as_materialized_series();
            match series.mean() {
                Some(mean) => Some((mean, fill_numeric_nulls(series, mean)?)),
                None => None,
            }
        };

        match filled {
            Some((mean, series)) => {
                df.replace(col_name, series)?;
                Ok(Some(mean))
            }
            None => Ok(None),
        }
    }

    /// Fill nulls of a column with a constant label.
    pub fn apply_constant_imputation(df: &mut DataFrame, col_name: &str, value: &str) -> Result<()> {
        let filled = {
            let series = df.column(col_name)?.as_materialized_series();
            fill_string_nulls(series, value)?
        };
        df.replace(col_name, filled)?;
        Ok(())
    }
}
