//! Type-driven chart selection.
//!
//! The kinds of the selected columns decide which charts are produced:
//!
//! | selection                 | charts                    |
//! |---------------------------|---------------------------|
//! | 1 numeric                 | line, histogram           |
//! | 1 categorical             | bar, pie (top categories) |
//! | 2 numeric                 | scatter                   |
//! | numeric + categorical     | box plot                  |
//! | 2 categorical             | grouped bar               |

use crate::config::EdaConfig;
use crate::error::Result;
use crate::types::{Aggregation, ChartKind, ChartSpec, ColumnKind, Table};
use tracing::debug;

/// Maps a column selection to chart specs.
#[derive(Debug, Clone)]
pub struct ChartSelector {
    top_categories: usize,
}

impl Default for ChartSelector {
    fn default() -> Self {
        Self::new(&EdaConfig::default())
    }
}

impl ChartSelector {
    pub fn new(config: &EdaConfig) -> Self {
        Self {
            top_categories: config.top_categories,
        }
    }

    /// Specs for the selected columns, in display order.
    ///
    /// Fails with `ColumnNotFound` for names missing from the table. Any
    /// selection other than one or two columns yields no charts.
    pub fn select(&self, table: &Table, columns: &[&str]) -> Result<Vec<ChartSpec>> {
        let kinds = columns
            .iter()
            .map(|name| table.kind(name))
            .collect::<Result<Vec<_>>>()?;

        let specs = match (columns, kinds.as_slice()) {
            ([col], [ColumnKind::Numeric]) => vec![
                self.single(ChartKind::Line, col, None),
                self.single(ChartKind::Histogram, col, None),
            ],
            ([col], [ColumnKind::Categorical]) => vec![
                self.single(ChartKind::Bar, col, Some(self.top())),
                self.single(ChartKind::Pie, col, Some(self.top())),
            ],
            ([x, y], [ColumnKind::Numeric, ColumnKind::Numeric]) => vec![ChartSpec {
                kind: ChartKind::Scatter,
                primary: x.to_string(),
                secondary: Some(y.to_string()),
                aggregation: None,
                title: format!("{}: {} vs {}", ChartKind::Scatter.label(), x, y),
            }],
            ([num, cat], [ColumnKind::Numeric, ColumnKind::Categorical])
            | ([cat, num], [ColumnKind::Categorical, ColumnKind::Numeric]) => {
                vec![ChartSpec {
                    kind: ChartKind::Box,
                    primary: cat.to_string(),
                    secondary: Some(num.to_string()),
                    aggregation: Some(self.top()),
                    title: format!("{}: {} by {}", ChartKind::Box.label(), num, cat),
                }]
            }
            ([first, second], [ColumnKind::Categorical, ColumnKind::Categorical]) => {
                vec![ChartSpec {
                    kind: ChartKind::GroupedBar,
                    primary: first.to_string(),
                    secondary: Some(second.to_string()),
                    aggregation: Some(self.top()),
                    title: format!("{}: {} vs {}", ChartKind::GroupedBar.label(), first, second),
                }]
            }
            _ => Vec::new(),
        };

        debug!(
            "Selected {} charts for columns {:?}",
            specs.len(),
            columns
        );
        Ok(specs)
    }

    fn top(&self) -> Aggregation {
        Aggregation::TopCategories {
            limit: self.top_categories,
        }
    }

    fn single(&self, kind: ChartKind, column: &str, aggregation: Option<Aggregation>) -> ChartSpec {
        ChartSpec {
            kind,
            primary: column.to_string(),
            secondary: None,
            aggregation,
            title: format!("{}: {}", kind.label(), column),
        }
    }
}
