//! PNG rendering with plotters.
//!
//! Charts are drawn into an in-memory RGB buffer and encoded with `image`.
//! Text uses a bundled DejaVu Sans face registered with plotters on first use,
//! so no system fonts are needed.

use super::data::{BoxGroup, CategoryCount, ChartData, CrossTabCell, HistogramBin};
use super::palette::generate_palette;
use crate::config::EdaConfig;
use crate::error::{EdaError, Result};
use crate::types::{ChartKind, ChartSpec};
use image::{ImageFormat, RgbImage};
use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::io::Cursor;
use tracing::debug;

/// First eight bytes of every PNG file.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

const FONT: &str = "sans-serif";
const TITLE_SIZE: u32 = 24;
const LABEL_SIZE: u32 = 14;

static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Registers the bundled face under [`FONT`]; `false` if it could not be parsed.
static FONT_REGISTERED: Lazy<bool> =
    Lazy::new(|| plotters::style::register_font(FONT, FontStyle::Normal, FONT_DATA).is_ok());

type DrawResult<DB> = std::result::Result<(), DrawingAreaErrorKind<<DB as DrawingBackend>::ErrorType>>;

/// Draws chart data to PNG bytes.
#[derive(Debug, Clone)]
pub struct PlotRenderer {
    width: u32,
    height: u32,
}

impl Default for PlotRenderer {
    fn default() -> Self {
        Self::new(&EdaConfig::default())
    }
}

impl PlotRenderer {
    pub fn new(config: &EdaConfig) -> Self {
        Self {
            width: config.image_width,
            height: config.image_height,
        }
    }

    /// Image size in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render one chart. Empty data is a render error.
    pub fn render(&self, spec: &ChartSpec, data: &ChartData) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Err(EdaError::render(&spec.title, "no values to plot"));
        }
        if !*FONT_REGISTERED {
            return Err(EdaError::render(&spec.title, "bundled font could not be loaded"));
        }

        let mut buffer = vec![0u8; self.width as usize * self.height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();
            draw_chart(&root, spec, data).map_err(|e| EdaError::render(&spec.title, e))?;
            root.present()
                .map_err(|e| EdaError::render(&spec.title, e))?;
        }

        let png = encode_png(self.width, self.height, buffer)
            .map_err(|e| EdaError::render(&spec.title, e))?;
        debug!("Rendered '{}' ({} bytes)", spec.title, png.len());
        Ok(png)
    }
}

fn encode_png(width: u32, height: u32, buffer: Vec<u8>) -> std::result::Result<Vec<u8>, String> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| "pixel buffer does not match image size".to_string())?;
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(bytes.into_inner())
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    data: &ChartData,
) -> DrawResult<DB> {
    root.fill(&WHITE)?;

    let x_desc = spec.primary.as_str();
    let y_desc = spec.secondary.as_deref().unwrap_or("count");

    match data {
        ChartData::Line { points, .. } => draw_line(root, &spec.title, x_desc, points),
        ChartData::Histogram { bins } => draw_histogram(root, &spec.title, x_desc, bins),
        ChartData::Categories { counts } if spec.kind == ChartKind::Pie => {
            draw_pie(root, &spec.title, counts)
        }
        ChartData::Categories { counts } => draw_bars(root, &spec.title, x_desc, counts),
        ChartData::Scatter { points } => draw_scatter(root, &spec.title, x_desc, y_desc, points),
        ChartData::Box { groups } => draw_box(root, &spec.title, x_desc, y_desc, groups),
        ChartData::GroupedBar { cells } => draw_grouped_bars(root, &spec.title, x_desc, cells),
    }
}

// ============================================================================
// Axes
// ============================================================================

/// Axis range with a 5% margin; a single value gets a unit margin.
fn padded_range(min: f64, max: f64) -> std::ops::Range<f64> {
    if max > min {
        let pad = (max - min) * 0.05;
        (min - pad)..(max + pad)
    } else {
        (min - 1.0)..(max + 1.0)
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

fn count_axis(max: usize) -> std::ops::Range<f64> {
    0.0..(max.max(1) as f64 * 1.1)
}

/// Label for a tick at an integer slot, empty between slots.
fn slot_label(labels: &[String], x: f64) -> String {
    let slot = x.round();
    if (x - slot).abs() > 1e-6 || slot < 0.0 {
        return String::new();
    }
    labels.get(slot as usize).cloned().unwrap_or_default()
}

fn slot_axis(n: usize) -> std::ops::Range<f64> {
    -0.5..(n as f64 - 0.5)
}

// ============================================================================
// Chart Kinds
// ============================================================================

fn draw_line<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    column: &str,
    points: &[(usize, Option<f64>)],
) -> DrawResult<DB> {
    let (y_min, y_max) = bounds(points.iter().filter_map(|(_, v)| *v)).unwrap_or((0.0, 1.0));
    let x_max = points.last().map(|(i, _)| *i).unwrap_or(0) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(padded_range(0.0, x_max), padded_range(y_min, y_max))?;

    chart
        .configure_mesh()
        .x_desc("row")
        .y_desc(column)
        .label_style((FONT, LABEL_SIZE))
        .draw()?;

    let color = generate_palette(1)[0];
    // Gaps split the line into separate segments
    let mut segment: Vec<(f64, f64)> = Vec::new();
    for (row, value) in points {
        match value {
            Some(v) if v.is_finite() => segment.push((*row as f64, *v)),
            _ => {
                if !segment.is_empty() {
                    chart.draw_series(LineSeries::new(
                        std::mem::take(&mut segment),
                        color.stroke_width(2),
                    ))?;
                }
            }
        }
    }
    if !segment.is_empty() {
        chart.draw_series(LineSeries::new(segment, color.stroke_width(2)))?;
    }
    Ok(())
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    bins: &[HistogramBin],
) -> DrawResult<DB> {
    let start = bins.first().map(|b| b.start).unwrap_or(0.0);
    let end = bins.last().map(|b| b.end).unwrap_or(1.0);
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(start..end, count_axis(max_count))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(x_desc)
        .y_desc("count")
        .label_style((FONT, LABEL_SIZE))
        .draw()?;

    let color = generate_palette(1)[0];
    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new(
            [(bin.start, 0.0), (bin.end, bin.count as f64)],
            color.mix(0.8).filled(),
        )
    }))?;
    chart.draw_series(bins.iter().map(|bin| {
        Rectangle::new([(bin.start, 0.0), (bin.end, bin.count as f64)], WHITE.stroke_width(1))
    }))?;
    Ok(())
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    counts: &[CategoryCount],
) -> DrawResult<DB> {
    let labels: Vec<String> = counts.iter().map(|c| c.label.clone()).collect();
    let max_count = counts.iter().map(|c| c.count).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(slot_axis(counts.len()), count_axis(max_count))?;

    let formatter = |x: &f64| slot_label(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&formatter)
        .x_desc(x_desc)
        .y_desc("count")
        .label_style((FONT, LABEL_SIZE))
        .draw()?;

    let colors = generate_palette(counts.len());
    chart.draw_series(counts.iter().enumerate().map(|(i, c)| {
        let x = i as f64;
        Rectangle::new([(x - 0.4, 0.0), (x + 0.4, c.count as f64)], colors[i].filled())
    }))?;
    Ok(())
}

fn draw_pie<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    counts: &[CategoryCount],
) -> DrawResult<DB> {
    let area = root.titled(title, (FONT, TITLE_SIZE))?;
    let (width, height) = area.dim_in_pixel();
    let center = (width as f64 * 0.4, height as f64 / 2.0);
    let radius = width.min(height) as f64 * 0.4;
    let total: usize = counts.iter().map(|c| c.count).sum();
    let colors = generate_palette(counts.len());

    // Slices start at twelve o'clock and run clockwise
    let mut angle = -PI / 2.0;
    for (count, color) in counts.iter().zip(&colors) {
        let sweep = 2.0 * PI * count.count as f64 / total.max(1) as f64;
        let steps = ((sweep.to_degrees()).ceil() as usize).max(2);
        let mut slice = vec![(center.0 as i32, center.1 as i32)];
        for step in 0..=steps {
            let a = angle + sweep * step as f64 / steps as f64;
            slice.push((
                (center.0 + radius * a.cos()) as i32,
                (center.1 + radius * a.sin()) as i32,
            ));
        }
        area.draw(&Polygon::new(slice, color.filled()))?;
        angle += sweep;
    }

    // Legend
    let legend_x = (center.0 + radius + 30.0) as i32;
    for (i, (count, color)) in counts.iter().zip(&colors).enumerate() {
        let y = 40 + i as i32 * 24;
        area.draw(&Rectangle::new(
            [(legend_x, y), (legend_x + 14, y + 14)],
            color.filled(),
        ))?;
        let share = 100.0 * count.count as f64 / total.max(1) as f64;
        area.draw(&Text::new(
            format!("{} ({:.1}%)", count.label, share),
            (legend_x + 22, y),
            (FONT, LABEL_SIZE),
        ))?;
    }
    Ok(())
}

fn draw_scatter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64)],
) -> DrawResult<DB> {
    let (x_min, x_max) = bounds(points.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = bounds(points.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(padded_range(x_min, x_max), padded_range(y_min, y_max))?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .label_style((FONT, LABEL_SIZE))
        .draw()?;

    let color = generate_palette(1)[0];
    chart.draw_series(
        points
            .iter()
            .map(|(x, y)| Circle::new((*x, *y), 3, color.mix(0.7).filled())),
    )?;
    Ok(())
}

fn draw_box<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    groups: &[BoxGroup],
) -> DrawResult<DB> {
    let summaries: Vec<_> = groups
        .iter()
        .filter_map(|g| g.summary().map(|s| (g.label.clone(), s)))
        .collect();
    let labels: Vec<String> = summaries.iter().map(|(label, _)| label.clone()).collect();
    let (y_min, y_max) = bounds(summaries.iter().flat_map(|(_, s)| {
        [s.lower_whisker, s.upper_whisker]
            .into_iter()
            .chain(s.outliers.iter().copied())
    }))
    .unwrap_or((0.0, 1.0));

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(slot_axis(summaries.len()), padded_range(y_min, y_max))?;

    let formatter = |x: &f64| slot_label(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&formatter)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .label_style((FONT, LABEL_SIZE))
        .draw()?;

    let colors = generate_palette(summaries.len());
    for (i, (_, s)) in summaries.iter().enumerate() {
        let x = i as f64;
        let color = colors[i];
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.3, s.q1), (x + 0.3, s.q3)],
            color.mix(0.5).filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.3, s.q1), (x + 0.3, s.q3)],
            color.stroke_width(2),
        )))?;
        chart.draw_series([
            PathElement::new(vec![(x - 0.3, s.median), (x + 0.3, s.median)], BLACK.stroke_width(2)),
            PathElement::new(vec![(x, s.q3), (x, s.upper_whisker)], color.stroke_width(1)),
            PathElement::new(vec![(x, s.q1), (x, s.lower_whisker)], color.stroke_width(1)),
            PathElement::new(
                vec![(x - 0.15, s.upper_whisker), (x + 0.15, s.upper_whisker)],
                color.stroke_width(1),
            ),
            PathElement::new(
                vec![(x - 0.15, s.lower_whisker), (x + 0.15, s.lower_whisker)],
                color.stroke_width(1),
            ),
        ])?;
        chart.draw_series(
            s.outliers
                .iter()
                .map(|v| Circle::new((x, *v), 3, color.stroke_width(1))),
        )?;
    }
    Ok(())
}

fn draw_grouped_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    title: &str,
    x_desc: &str,
    cells: &[CrossTabCell],
) -> DrawResult<DB> {
    let mut primaries: Vec<String> = cells.iter().map(|c| c.primary.clone()).collect();
    primaries.dedup();
    let secondaries: Vec<String> = cells
        .iter()
        .map(|c| c.secondary.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let max_count = cells.iter().map(|c| c.count).max().unwrap_or(0);

    let mut chart = ChartBuilder::on(root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(slot_axis(primaries.len()), count_axis(max_count))?;

    let formatter = |x: &f64| slot_label(&primaries, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(primaries.len())
        .x_label_formatter(&formatter)
        .x_desc(x_desc)
        .y_desc("count")
        .label_style((FONT, LABEL_SIZE))
        .draw()?;

    let colors = generate_palette(secondaries.len());
    let bar_width = 0.8 / secondaries.len().max(1) as f64;
    for (j, (secondary, color)) in secondaries.iter().zip(colors).enumerate() {
        let bars = cells
            .iter()
            .filter(|c| &c.secondary == secondary)
            .filter_map(|c| {
                let i = primaries.iter().position(|p| p == &c.primary)?;
                let left = i as f64 - 0.4 + j as f64 * bar_width;
                Some(Rectangle::new(
                    [(left, 0.0), (left + bar_width, c.count as f64)],
                    color.filled(),
                ))
            });
        chart
            .draw_series(bars)?
            .label(secondary.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_SIZE))
        .draw()?;
    Ok(())
}
