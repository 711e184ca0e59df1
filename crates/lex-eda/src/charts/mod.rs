//! Chart selection, data resolution and rendering.
//!
//! A chart goes through three steps:
//!
//! 1. [`ChartSelector`] turns the selected columns into [`ChartSpec`]s
//! 2. [`ChartResolver`] extracts the values a spec needs into [`ChartData`]
//! 3. [`PlotRenderer`] draws the data and encodes it as PNG
//!
//! [`ChartSpec`]: crate::types::ChartSpec

mod data;
mod palette;
mod render;
mod selector;

pub use data::{
    BoxGroup, BoxSummary, CategoryCount, ChartData, ChartResolver, CrossTabCell, HistogramBin,
};
pub use palette::generate_palette;
pub use render::{PNG_SIGNATURE, PlotRenderer};
pub use selector::ChartSelector;
