//! Core data types shared across the loader, imputation, chart and store modules.

use crate::error::{EdaError, Result};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Table & Schema
// ============================================================================

/// Declared kind of a table column.
///
/// Decided once when a table is built and carried with it, so the cleaning and
/// charting branches never re-inspect physical dtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Integer or floating point values.
    Numeric,
    /// Everything else: text, booleans, dates. Treated as categories.
    Categorical,
}

impl ColumnKind {
    /// Kind for a polars dtype.
    pub fn from_dtype(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

/// In-memory dataset: a polars frame plus the kind of every column.
#[derive(Debug, Clone)]
pub struct Table {
    frame: DataFrame,
    schema: Vec<ColumnSchema>,
}

impl Table {
    /// Wrap a frame, deriving each column's kind from its dtype.
    pub fn new(frame: DataFrame) -> Self {
        let schema = frame
            .get_columns()
            .iter()
            .map(|col| ColumnSchema {
                name: col.name().to_string(),
                kind: ColumnKind::from_dtype(col.dtype()),
            })
            .collect();
        Self { frame, schema }
    }

    /// Build a table with an explicit schema.
    ///
    /// The schema must list exactly the frame's columns, in order.
    pub(crate) fn from_parts(frame: DataFrame, schema: Vec<ColumnSchema>) -> Self {
        debug_assert_eq!(frame.width(), schema.len());
        Self { frame, schema }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn schema(&self) -> &[ColumnSchema] {
        &self.schema
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.frame.width()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.schema.iter().map(|c| c.name.as_str()).collect()
    }

    /// Declared kind of a column.
    pub fn kind(&self, name: &str) -> Result<ColumnKind> {
        self.schema
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.kind)
            .ok_or_else(|| EdaError::ColumnNotFound(name.to_string()))
    }

    /// Materialized series for a column.
    pub fn series(&self, name: &str) -> Result<&Series> {
        self.frame
            .column(name)
            .map(|col| col.as_materialized_series())
            .map_err(|_| EdaError::ColumnNotFound(name.to_string()))
    }

    /// Missing-value statistics for a column.
    pub fn column_stats(&self, name: &str) -> Result<ColumnStats> {
        let kind = self.kind(name)?;
        let series = self.series(name)?;
        Ok(ColumnStats::from_series(series, kind))
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> DataFrame {
        self.frame.head(Some(n))
    }
}

/// Derived, ephemeral missing-value statistics of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub total_rows: usize,
    pub missing_count: usize,
    /// `missing_count / total_rows`, defined as 0 for empty columns.
    pub missing_fraction: f64,
    /// Mean of the non-null values; numeric columns only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
}

impl ColumnStats {
    pub fn from_series(series: &Series, kind: ColumnKind) -> Self {
        let total_rows = series.len();
        let missing_count = series.null_count();
        let missing_fraction = if total_rows == 0 {
            0.0
        } else {
            missing_count as f64 / total_rows as f64
        };
        let mean = if kind.is_numeric() { series.mean() } else { None };

        Self {
            total_rows,
            missing_count,
            missing_fraction,
            mean,
        }
    }
}

// ============================================================================
// Imputation Report
// ============================================================================

/// What the imputation engine did to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ImputationAction {
    /// Nothing to fill.
    NoMissing,
    /// Numeric nulls replaced with 0.
    FilledZero,
    /// Categorical nulls replaced with a constant label.
    FilledConstant { value: String },
    /// Numeric nulls replaced with the column mean.
    FilledMean { mean: f64 },
    /// Categorical column kept with its nulls.
    LeftUnchanged,
    /// Column removed from the table.
    Dropped,
}

impl fmt::Display for ImputationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputationAction::NoMissing => write!(f, "no missing values"),
            ImputationAction::FilledZero => write!(f, "filled with 0"),
            ImputationAction::FilledConstant { value } => write!(f, "filled with '{}'", value),
            ImputationAction::FilledMean { mean } => write!(f, "filled with mean {:.4}", mean),
            ImputationAction::LeftUnchanged => write!(f, "left unchanged"),
            ImputationAction::Dropped => write!(f, "dropped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnImputation {
    pub column: String,
    pub kind: ColumnKind,
    pub stats: ColumnStats,
    #[serde(flatten)]
    pub action: ImputationAction,
}

/// Per-column outcome of one imputation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationReport {
    pub rows: usize,
    pub columns_before: usize,
    pub columns_after: usize,
    pub columns: Vec<ColumnImputation>,
}

impl ImputationReport {
    /// Names of the columns the pass dropped.
    pub fn dropped_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.action == ImputationAction::Dropped)
            .map(|c| c.column.as_str())
            .collect()
    }

    /// Action taken for a column, if it was part of the pass.
    pub fn action_for(&self, column: &str) -> Option<&ImputationAction> {
        self.columns
            .iter()
            .find(|c| c.column == column)
            .map(|c| &c.action)
    }
}

// ============================================================================
// Chart Specs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Histogram,
    Bar,
    Pie,
    Scatter,
    Box,
    GroupedBar,
}

impl ChartKind {
    /// Title prefix used when naming charts of this kind.
    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Line => "Line Plot",
            ChartKind::Histogram => "Histogram",
            ChartKind::Bar => "Bar Chart",
            ChartKind::Pie => "Pie Chart",
            ChartKind::Scatter => "Scatter Plot",
            ChartKind::Box => "Box Plot",
            ChartKind::GroupedBar => "Grouped Bar Chart",
        }
    }
}

/// Optional aggregation applied before charting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregation {
    /// Keep only rows whose categorical value is among the `limit` most frequent.
    TopCategories { limit: usize },
}

/// Description of one chart request.
///
/// `primary` is the x axis (or the single charted column); `secondary` is the
/// y axis for scatter and box plots and the color grouping for grouped bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub primary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
    pub title: String,
}

impl ChartSpec {
    /// Top-category limit, if this spec restricts categories.
    pub fn top_limit(&self) -> Option<usize> {
        match self.aggregation {
            Some(Aggregation::TopCategories { limit }) => Some(limit),
            None => None,
        }
    }
}

// ============================================================================
// Stored Plots
// ============================================================================

/// One rendered chart as persisted in the plot store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPlot {
    pub name: String,
    pub image: Vec<u8>,
}

impl StoredPlot {
    pub fn new(name: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }
}
