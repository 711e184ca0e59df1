//! Automated Exploratory Data Analysis Library
//!
//! Load a tabular file, clean its missing values and draw charts chosen from
//! the kinds of the columns a user selects. Every rendered chart is appended to
//! a local SQLite plot store that can be exported as a single file.
//!
//! # Overview
//!
//! - **Loading**: CSV, Excel (`.xlsx`/`.xls`) and SQLite (`.db`/`.sqlite`) uploads
//! - **Cleaning**: per-column missing-value handling driven by the missing fraction
//! - **Chart Selection**: line, histogram, bar, pie, scatter, box and grouped bar
//!   charts picked from one or two column kinds
//! - **Rendering**: PNG bytes drawn with plotters
//! - **Plot Store**: append-only `plots (name TEXT, image BLOB)` table
//! - **Progress Reporting**: stage updates through a callback
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_eda::{EdaConfig, Session, UploadedFile};
//!
//! let config = EdaConfig::builder()
//!     .store_path("plots.db")
//!     .sample_seed(7)
//!     .build()?;
//!
//! let mut session = Session::builder()
//!     .config(config)
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?;
//!
//! let report = session.load(UploadedFile::from_path("sales.csv")?, None)?;
//! println!("Dropped: {:?}", report.dropped_columns());
//!
//! for outcome in session.visualize(&["price", "region"])? {
//!     match outcome.result {
//!         Ok(chart) => println!("{} ({} bytes)", chart.title, chart.png.len()),
//!         Err(e) => println!("{} failed: {}", outcome.spec.title, e),
//!     }
//! }
//!
//! let artifact = session.export()?;
//! std::fs::write(&artifact.file_name, &artifact.bytes)?;
//! ```
//!
//! # Database Uploads
//!
//! A database upload lists its tables before anything is loaded:
//!
//! ```rust,ignore
//! use lex_eda::{DataLoader, LoadedSource, UploadedFile};
//!
//! match DataLoader::open(UploadedFile::from_path("shop.sqlite")?)? {
//!     LoadedSource::Database(source) => {
//!         println!("Tables: {:?}", source.tables());
//!         let table = source.load_table("orders")?;
//!     }
//!     LoadedSource::Ready(table) => println!("{} rows", table.height()),
//! }
//! ```

pub mod charts;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod session;
pub mod store;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use charts::{ChartData, ChartResolver, ChartSelector, PNG_SIGNATURE, PlotRenderer};
pub use config::{ConfigValidationError, EdaConfig, EdaConfigBuilder};
pub use error::{EdaError, Result, ResultExt};
pub use imputers::{ImputationEngine, MISSING_LABEL, StatisticalImputer};
pub use loader::{DataLoader, DatabaseSource, FileFormat, LoadedSource, UploadedFile};
pub use session::{
    ChartOutcome, ClosureProgressReporter, ProgressReporter, ProgressUpdate, RenderedChart,
    Session, SessionBuilder, SessionStage,
};
pub use store::{EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME, ExportArtifact, PlotStore};
pub use types::{
    Aggregation, ChartKind, ChartSpec, ColumnImputation, ColumnKind, ColumnSchema, ColumnStats,
    ImputationAction, ImputationReport, StoredPlot, Table,
};
