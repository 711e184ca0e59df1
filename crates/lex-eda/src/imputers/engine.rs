//! Threshold-driven missing-value policy.
//!
//! Every column is handled on its own, by its missing fraction:
//!
//! | missing fraction        | numeric          | categorical        |
//! |-------------------------|------------------|--------------------|
//! | `< low` (5%)            | fill with `0`    | fill with `"None"` |
//! | `low ..< drop` (5–40%)  | fill with mean   | keep nulls         |
//! | `>= drop` (40%)         | drop column      | drop column        |

use crate::config::EdaConfig;
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::types::{
    ColumnImputation, ColumnKind, ColumnSchema, ColumnStats, ImputationAction, ImputationReport,
    Table,
};
use tracing::{debug, info};

/// Label written into categorical cells filled by the low-missing rule.
pub const MISSING_LABEL: &str = "None";

/// Applies the per-column missing-value policy to a table.
#[derive(Debug, Clone)]
pub struct ImputationEngine {
    low_missing_threshold: f64,
    drop_column_threshold: f64,
}

impl Default for ImputationEngine {
    fn default() -> Self {
        Self::new(&EdaConfig::default())
    }
}

impl ImputationEngine {
    pub fn new(config: &EdaConfig) -> Self {
        Self {
            low_missing_threshold: config.low_missing_threshold,
            drop_column_threshold: config.drop_column_threshold,
        }
    }

    /// Decide what to do with one column. Pure.
    pub fn decide(&self, kind: ColumnKind, stats: &ColumnStats) -> ImputationAction {
        let fraction = stats.missing_fraction;

        if fraction < self.low_missing_threshold {
            if stats.missing_count == 0 {
                return ImputationAction::NoMissing;
            }
            match kind {
                ColumnKind::Numeric => ImputationAction::FilledZero,
                ColumnKind::Categorical => ImputationAction::FilledConstant {
                    value: MISSING_LABEL.to_string(),
                },
            }
        } else if fraction < self.drop_column_threshold {
            if stats.missing_count == 0 {
                return ImputationAction::NoMissing;
            }
            match (kind, stats.mean) {
                (ColumnKind::Numeric, Some(mean)) => ImputationAction::FilledMean { mean },
                _ => ImputationAction::LeftUnchanged,
            }
        } else {
            ImputationAction::Dropped
        }
    }

    /// Return a cleaned copy of `table` and a report of what was done.
    ///
    /// Row count never changes; only columns are filled or dropped.
    pub fn impute(&self, table: &Table) -> Result<(Table, ImputationReport)> {
        let mut df = table.frame().clone();
        let mut kept_schema: Vec<ColumnSchema> = Vec::with_capacity(table.width());
        let mut columns = Vec::with_capacity(table.width());

        info!(
            "Imputing missing values across {} columns ({} rows)",
            table.width(),
            table.height()
        );

        for column in table.schema() {
            let name = column.name.as_str();
            let stats = table.column_stats(name)?;
            let action = self.decide(column.kind, &stats);

            match &action {
                ImputationAction::FilledZero => {
                    StatisticalImputer::apply_zero_fill(&mut df, name)?;
                }
                ImputationAction::FilledConstant { value } => {
                    StatisticalImputer::apply_constant_imputation(&mut df, name, value)?;
                }
                ImputationAction::FilledMean { .. } => {
                    StatisticalImputer::apply_numeric_mean(&mut df, name)?;
                }
                ImputationAction::Dropped => {
                    df = df.drop(name)?;
                }
                ImputationAction::NoMissing | ImputationAction::LeftUnchanged => {}
            }

            debug!(
                "Column '{}' ({}, {:.1}% missing): {}",
                name,
                column.kind,
                stats.missing_fraction * 100.0,
                action
            );

            if action != ImputationAction::Dropped {
                kept_schema.push(column.clone());
            }
            columns.push(ColumnImputation {
                column: column.name.clone(),
                kind: column.kind,
                stats,
                action,
            });
        }

        let report = ImputationReport {
            rows: table.height(),
            columns_before: table.width(),
            columns_after: kept_schema.len(),
            columns,
        };

        let dropped = report.dropped_columns();
        if !dropped.is_empty() {
            info!("Dropped {} columns: {:?}", dropped.len(), dropped);
        }

        Ok((Table::from_parts(df, kept_schema), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{categorical_values, numeric_values};
    use polars::prelude::*;

    /// 20 rows with `missing` leading nulls.
    fn numeric_column(missing: usize) -> Series {
        let values: Vec<Option<f64>> = (0..20)
            .map(|i| if i < missing { None } else { Some(i as f64) })
            .collect();
        Series::new("n".into(), values)
    }

    fn text_column(missing: usize) -> Series {
        let values: Vec<Option<&str>> = (0..20)
            .map(|i| if i < missing { None } else { Some("x") })
            .collect();
        Series::new("t".into(), values)
    }

    fn stats(missing: usize, total: usize, mean: Option<f64>) -> ColumnStats {
        ColumnStats {
            total_rows: total,
            missing_count: missing,
            missing_fraction: if total == 0 { 0.0 } else { missing as f64 / total as f64 },
            mean,
        }
    }

    #[test]
    fn test_decide_thresholds() {
        let engine = ImputationEngine::default();

        assert_eq!(
            engine.decide(ColumnKind::Numeric, &stats(0, 100, Some(1.0))),
            ImputationAction::NoMissing
        );
        assert_eq!(
            engine.decide(ColumnKind::Numeric, &stats(4, 100, Some(1.0))),
            ImputationAction::FilledZero
        );
        assert_eq!(
            engine.decide(ColumnKind::Categorical, &stats(4, 100, None)),
            ImputationAction::FilledConstant {
                value: "None".to_string()
            }
        );
        // Exactly 5% falls into the mean band
        assert_eq!(
            engine.decide(ColumnKind::Numeric, &stats(5, 100, Some(2.5))),
            ImputationAction::FilledMean { mean: 2.5 }
        );
        assert_eq!(
            engine.decide(ColumnKind::Categorical, &stats(39, 100, None)),
            ImputationAction::LeftUnchanged
        );
        // Exactly 40% is dropped
        assert_eq!(
            engine.decide(ColumnKind::Numeric, &stats(40, 100, Some(1.0))),
            ImputationAction::Dropped
        );
        assert_eq!(
            engine.decide(ColumnKind::Categorical, &stats(100, 100, None)),
            ImputationAction::Dropped
        );
    }

    #[test]
    fn test_decide_zero_rows() {
        let engine = ImputationEngine::default();
        assert_eq!(
            engine.decide(ColumnKind::Numeric, &stats(0, 0, None)),
            ImputationAction::NoMissing
        );
    }

    #[test]
    fn test_impute_low_missing_fills_constants() {
        // 1 of 40 missing = 2.5%
        let n: Vec<Option<f64>> = (0..40).map(|i| if i == 0 { None } else { Some(1.0) }).collect();
        let t: Vec<Option<&str>> = (0..40).map(|i| if i == 3 { None } else { Some("a") }).collect();
        let df = DataFrame::new(vec![
            Series::new("n".into(), n).into(),
            Series::new("t".into(), t).into(),
        ])
        .unwrap();

        let (cleaned, report) = ImputationEngine::default()
            .impute(&Table::new(df))
            .unwrap();

        let n = numeric_values(cleaned.series("n").unwrap()).unwrap();
        assert_eq!(n[0], Some(0.0));
        assert!(n.iter().all(Option::is_some));

        let t = categorical_values(cleaned.series("t").unwrap()).unwrap();
        assert_eq!(t[3].as_deref(), Some("None"));
        assert_eq!(report.action_for("n"), Some(&ImputationAction::FilledZero));
    }

    #[test]
    fn test_impute_mid_missing_numeric_uses_mean() {
        // 4 of 20 missing = 20%; mean of 4..=19 is 11.5
        let df = DataFrame::new(vec![numeric_column(4).into()]).unwrap();

        let (cleaned, report) = ImputationEngine::default()
            .impute(&Table::new(df))
            .unwrap();

        let n = numeric_values(cleaned.series("n").unwrap()).unwrap();
        for value in &n[0..4] {
            assert!((value.unwrap() - 11.5).abs() < 1e-9);
        }
        assert!(matches!(
            report.action_for("n"),
            Some(ImputationAction::FilledMean { mean }) if (*mean - 11.5).abs() < 1e-9
        ));
    }

    #[test]
    fn test_impute_mid_missing_categorical_keeps_nulls() {
        let df = DataFrame::new(vec![text_column(4).into()]).unwrap();

        let (cleaned, _) = ImputationEngine::default()
            .impute(&Table::new(df))
            .unwrap();

        assert_eq!(cleaned.series("t").unwrap().null_count(), 4);
    }

    #[test]
    fn test_impute_high_missing_drops_column() {
        let df = DataFrame::new(vec![numeric_column(8).into(), text_column(12).into()]).unwrap();

        let (cleaned, report) = ImputationEngine::default()
            .impute(&Table::new(df))
            .unwrap();

        assert_eq!(cleaned.width(), 0);
        assert_eq!(report.dropped_columns(), vec!["n", "t"]);
        assert_eq!(report.columns_after, 0);
    }

    #[test]
    fn test_impute_keeps_kinds_and_row_count() {
        let df = DataFrame::new(vec![numeric_column(4).into(), text_column(0).into()]).unwrap();
        let table = Table::new(df);

        let (cleaned, _) = ImputationEngine::default().impute(&table).unwrap();

        assert_eq!(cleaned.height(), table.height());
        assert_eq!(cleaned.kind("n").unwrap(), ColumnKind::Numeric);
        assert_eq!(cleaned.kind("t").unwrap(), ColumnKind::Categorical);
    }

    #[test]
    fn test_impute_is_idempotent() {
        let df = DataFrame::new(vec![
            numeric_column(4).into(),
            text_column(3).into(),
        ])
        .unwrap();
        let engine = ImputationEngine::default();

        let (once, _) = engine.impute(&Table::new(df)).unwrap();
        let (twice, report) = engine.impute(&once).unwrap();

        assert!(once.frame().equals_missing(twice.frame()));
        assert!(report.dropped_columns().is_empty());
    }

    #[test]
    fn test_impute_empty_table() {
        let df = DataFrame::new(vec![
            Series::new_empty("n".into(), &DataType::Float64).into(),
            Series::new_empty("t".into(), &DataType::String).into(),
        ])
        .unwrap();

        let (cleaned, report) = ImputationEngine::default()
            .impute(&Table::new(df))
            .unwrap();

        assert_eq!(cleaned.width(), 2);
        assert_eq!(cleaned.height(), 0);
        assert!(report
            .columns
            .iter()
            .all(|c| c.action == ImputationAction::NoMissing));
    }
}
