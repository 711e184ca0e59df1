//! Resolving chart specs into plottable values.

use crate::config::EdaConfig;
use crate::error::{EdaError, Result};
use crate::types::{ChartKind, ChartSpec, Table};
use crate::utils::{categorical_values, numeric_values, shorten_label, top_categories};
use rand::Rng;
use rand::seq::index;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

// ============================================================================
// Chart Data
// ============================================================================

/// One histogram bin, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// A category and how often it occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    /// Display label, shortened.
    pub label: String,
    /// Untruncated value.
    pub value: String,
    pub count: usize,
}

/// Numeric values of one box plot group.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub values: Vec<f64>,
}

/// Five-number summary with Tukey whiskers.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest value within 1.5 IQR below `q1`.
    pub lower_whisker: f64,
    /// Largest value within 1.5 IQR above `q3`.
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxGroup {
    /// Summary statistics, `None` for an empty group.
    pub fn summary(&self) -> Option<BoxSummary> {
        let mut sorted: Vec<f64> = self.values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = quantile(&sorted, 0.25);
        let median = quantile(&sorted, 0.5);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let (low_fence, high_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let inside = || sorted.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence);
        let lower_whisker = inside().next().unwrap_or(q1);
        let upper_whisker = inside().last().unwrap_or(q3);
        let outliers = sorted
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .collect();

        Some(BoxSummary {
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Count of one (primary, secondary) label pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossTabCell {
    pub primary: String,
    pub secondary: String,
    pub count: usize,
}

/// Values extracted for one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// `(row index, value)`; `None` marks a gap.
    Line {
        points: Vec<(usize, Option<f64>)>,
        smoothed: bool,
    },
    Histogram { bins: Vec<HistogramBin> },
    /// Shared by bar and pie charts.
    Categories { counts: Vec<CategoryCount> },
    Scatter { points: Vec<(f64, f64)> },
    Box { groups: Vec<BoxGroup> },
    GroupedBar { cells: Vec<CrossTabCell> },
}

impl ChartData {
    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            // Non-finite values are drawn as gaps
            ChartData::Line { points, .. } => points
                .iter()
                .all(|(_, v)| !v.is_some_and(f64::is_finite)),
            ChartData::Histogram { bins } => bins.iter().all(|b| b.count == 0),
            ChartData::Categories { counts } => counts.is_empty(),
            ChartData::Scatter { points } => points.is_empty(),
            ChartData::Box { groups } => groups.iter().all(|g| g.values.is_empty()),
            ChartData::GroupedBar { cells } => cells.is_empty(),
        }
    }

    /// Total of all counts for count-based charts.
    pub fn total_count(&self) -> Option<usize> {
        match self {
            ChartData::Histogram { bins } => Some(bins.iter().map(|b| b.count).sum()),
            ChartData::Categories { counts } => Some(counts.iter().map(|c| c.count).sum()),
            ChartData::GroupedBar { cells } => Some(cells.iter().map(|c| c.count).sum()),
            _ => None,
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Extracts chart data from a table according to a spec.
#[derive(Debug, Clone)]
pub struct ChartResolver {
    max_label_len: usize,
    line_sample_size: usize,
    smoothing_min_points: usize,
    smoothing_window: usize,
    histogram_bins: usize,
}

impl Default for ChartResolver {
    fn default() -> Self {
        Self::new(&EdaConfig::default())
    }
}

impl ChartResolver {
    pub fn new(config: &EdaConfig) -> Self {
        Self {
            max_label_len: config.max_label_len,
            line_sample_size: config.line_sample_size,
            smoothing_min_points: config.smoothing_min_points,
            smoothing_window: config.smoothing_window,
            histogram_bins: config.histogram_bins,
        }
    }

    /// Resolve `spec` against `table`. `rng` drives line-plot sampling.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        spec: &ChartSpec,
        table: &Table,
        rng: &mut R,
    ) -> Result<ChartData> {
        let data = match spec.kind {
            ChartKind::Line => {
                let values = numeric_values(table.series(&spec.primary)?)?;
                self.line(values, rng)
            }
            ChartKind::Histogram => {
                let values = numeric_values(table.series(&spec.primary)?)?;
                self.histogram(&values)
            }
            ChartKind::Bar | ChartKind::Pie => {
                let values = categorical_values(table.series(&spec.primary)?)?;
                self.categories(&values, self.limit(spec))
            }
            ChartKind::Scatter => {
                let x = numeric_values(table.series(&spec.primary)?)?;
                let y = numeric_values(table.series(secondary(spec)?)?)?;
                scatter(&x, &y)
            }
            ChartKind::Box => {
                let categories = categorical_values(table.series(&spec.primary)?)?;
                let values = numeric_values(table.series(secondary(spec)?)?)?;
                self.box_groups(&categories, &values, self.limit(spec))
            }
            ChartKind::GroupedBar => {
                let first = categorical_values(table.series(&spec.primary)?)?;
                let second = categorical_values(table.series(secondary(spec)?)?)?;
                self.cross_tab(&first, &second, self.limit(spec))
            }
        };

        debug!("Resolved '{}' ({:?})", spec.title, spec.kind);
        Ok(data)
    }

    fn limit(&self, spec: &ChartSpec) -> usize {
        spec.top_limit().unwrap_or(usize::MAX)
    }

    /// Sample long series down and smooth dense ones.
    fn line<R: Rng + ?Sized>(&self, values: Vec<Option<f64>>, rng: &mut R) -> ChartData {
        let mut points: Vec<(usize, Option<f64>)> = if values.len() > self.line_sample_size {
            let mut rows = index::sample(rng, values.len(), self.line_sample_size).into_vec();
            rows.sort_unstable();
            rows.into_iter().map(|i| (i, values[i])).collect()
        } else {
            values.into_iter().enumerate().collect()
        };

        let smoothed = points.len() > self.smoothing_min_points;
        if smoothed {
            points = trailing_mean(&points, self.smoothing_window);
        }

        ChartData::Line { points, smoothed }
    }

    /// Equal-width bins over `[min, max]` of the present values.
    fn histogram(&self, values: &[Option<f64>]) -> ChartData {
        let present: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        let Some((min, max)) = bounds(&present) else {
            return ChartData::Histogram { bins: Vec::new() };
        };

        let (start, end) = if max > min {
            (min, max)
        } else {
            (min - 0.5, min + 0.5)
        };
        let bins = self.histogram_bins;
        let width = (end - start) / bins as f64;

        let mut counts = vec![0usize; bins];
        for v in &present {
            let slot = (((v - start) / width).floor() as usize).min(bins - 1);
            counts[slot] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                start: start + i as f64 * width,
                end: start + (i + 1) as f64 * width,
                count,
            })
            .collect();
        ChartData::Histogram { bins }
    }

    fn categories(&self, values: &[Option<String>], limit: usize) -> ChartData {
        let counts = top_categories(values, limit)
            .into_iter()
            .map(|(value, count)| CategoryCount {
                label: shorten_label(&value, self.max_label_len),
                value,
                count,
            })
            .collect();
        ChartData::Categories { counts }
    }

    /// Group numeric values by the shortened label of their top category.
    fn box_groups(
        &self,
        categories: &[Option<String>],
        values: &[Option<f64>],
        limit: usize,
    ) -> ChartData {
        let top = top_set(categories, limit);
        let mut order: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<BoxGroup> = Vec::new();

        for (category, value) in categories.iter().zip(values) {
            let (Some(category), Some(value)) = (category, value) else {
                continue;
            };
            if !top.contains(category.as_str()) {
                continue;
            }
            let label = shorten_label(category, self.max_label_len);
            let slot = *order.entry(label.clone()).or_insert_with(|| {
                groups.push(BoxGroup {
                    label,
                    values: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].values.push(*value);
        }

        ChartData::Box { groups }
    }

    /// Count label pairs where both values are in their column's top set.
    fn cross_tab(&self, first: &[Option<String>], second: &[Option<String>], limit: usize) -> ChartData {
        let top_first = top_set(first, limit);
        let top_second = top_set(second, limit);
        let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();

        for (a, b) in first.iter().zip(second) {
            let (Some(a), Some(b)) = (a, b) else {
                continue;
            };
            if top_first.contains(a.as_str()) && top_second.contains(b.as_str()) {
                let key = (
                    shorten_label(a, self.max_label_len),
                    shorten_label(b, self.max_label_len),
                );
                *counts.entry(key).or_insert(0) += 1;
            }
        }

        let cells = counts
            .into_iter()
            .map(|((primary, secondary), count)| CrossTabCell {
                primary,
                secondary,
                count,
            })
            .collect();
        ChartData::GroupedBar { cells }
    }
}

fn secondary(spec: &ChartSpec) -> Result<&str> {
    spec.secondary
        .as_deref()
        .ok_or_else(|| EdaError::render(&spec.title, "chart needs a second column"))
}

fn scatter(x: &[Option<f64>], y: &[Option<f64>]) -> ChartData {
    let points = x
        .iter()
        .zip(y)
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some((*x, *y)),
            _ => None,
        })
        .collect();
    ChartData::Scatter { points }
}

fn top_set(values: &[Option<String>], limit: usize) -> HashSet<String> {
    top_categories(values, limit)
        .into_iter()
        .map(|(value, _)| value)
        .collect()
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().copied().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Trailing mean over `window` points; windows that are short or contain a
/// gap produce a gap.
fn trailing_mean(points: &[(usize, Option<f64>)], window: usize) -> Vec<(usize, Option<f64>)> {
    points
        .iter()
        .enumerate()
        .map(|(i, (row, _))| {
            if i + 1 < window {
                return (*row, None);
            }
            let slice = &points[i + 1 - window..=i];
            let sum: Option<f64> = slice.iter().map(|(_, v)| *v).sum();
            (*row, sum.map(|s| s / window as f64))
        })
        .collect()
}
