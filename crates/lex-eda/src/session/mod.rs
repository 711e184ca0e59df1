//! EDA session: load, clean, chart and store.
//!
//! A session owns the plot store and the cleaned table of the current upload.

mod builder;
pub mod progress;

pub use builder::{ChartOutcome, RenderedChart, Session, SessionBuilder};
pub use progress::{ClosureProgressReporter, ProgressReporter, ProgressUpdate, SessionStage};
