//! Data loading for uploaded files.
//!
//! An upload is a file name plus its raw bytes. The extension decides how the
//! bytes are parsed:
//!
//! - `.csv` is read with polars, first row as header
//! - `.xlsx` / `.xls` read the first worksheet with calamine
//! - `.db` / `.sqlite` are materialized to a temporary file and opened with
//!   SQLite; the caller then picks one of the enumerated tables
//!
//! Anything else is rejected with [`EdaError::UnsupportedFormat`].

mod csv;
mod database;
mod spreadsheet;

pub use csv::MISSING_MARKERS;
pub use database::DatabaseSource;

use crate::error::{EdaError, Result};
use crate::types::Table;
use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::info;

// ============================================================================
// Uploads & Formats
// ============================================================================

/// Recognized upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Spreadsheet,
    Database,
}

impl FileFormat {
    /// Extensions accepted by the loader, without the dot.
    pub const EXTENSIONS: [&'static str; 5] = ["csv", "xlsx", "xls", "db", "sqlite"];

    /// Format for a file name, matched on its extension (case-insensitive).
    pub fn from_file_name(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" | "xls" => Ok(FileFormat::Spreadsheet),
            "db" | "sqlite" => Ok(FileFormat::Database),
            _ => Err(EdaError::UnsupportedFormat(name.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Spreadsheet => write!(f, "spreadsheet"),
            FileFormat::Database => write!(f, "database"),
        }
    }
}

/// An uploaded file: its declared name and raw content.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    name: String,
    content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Read a file from disk as if it had been uploaded.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { name, content })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn format(&self) -> Result<FileFormat> {
        FileFormat::from_file_name(&self.name)
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Result of opening an upload.
#[derive(Debug)]
pub enum LoadedSource {
    /// Flat files parse straight into a table.
    Ready(Table),
    /// Database uploads need a table selection first.
    Database(DatabaseSource),
}

/// Reads uploads into tables.
pub struct DataLoader;

impl DataLoader {
    /// Parse an upload, stopping before table selection for databases.
    pub fn open(upload: UploadedFile) -> Result<LoadedSource> {
        let format = upload.format()?;
        info!(
            "Loading {} upload '{}' ({} bytes)",
            format,
            upload.name,
            upload.content.len()
        );

        match format {
            FileFormat::Csv => Ok(LoadedSource::Ready(Table::new(csv::read_csv(
                upload.content,
            )?))),
            FileFormat::Spreadsheet => Ok(LoadedSource::Ready(Table::new(
                spreadsheet::read_first_sheet(upload.content)?,
            ))),
            FileFormat::Database => {
                let suffix = Path::new(&upload.name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e))
                    .unwrap_or_default();
                Ok(LoadedSource::Database(DatabaseSource::materialize(
                    &upload.content,
                    &suffix,
                )?))
            }
        }
    }

    /// Parse an upload into a table in one step.
    ///
    /// `table` selects the database table and is ignored for flat files.
    pub fn load(upload: UploadedFile, table: Option<&str>) -> Result<Table> {
        match Self::open(upload)? {
            LoadedSource::Ready(loaded) => Ok(loaded),
            LoadedSource::Database(source) => match table {
                Some(name) => source.load_table(name),
                None => Err(EdaError::TableNotSelected {
                    available: source.tables().to_vec(),
                }),
            },
        }
    }
}

// ============================================================================
// Cell-to-Series Conversion
// ============================================================================

/// One cell read from a spreadsheet or database row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

/// Build a series from loosely typed cells.
///
/// All-integer columns become Int64, integer/float mixes Float64, anything
/// containing text becomes String. Null-only columns are Float64.
pub(crate) fn series_from_cells(name: &str, cells: Vec<CellValue>) -> Series {
    let mut has_float = false;
    let mut has_text = false;
    for cell in &cells {
        match cell {
            CellValue::Float(_) => has_float = true,
            CellValue::Text(_) => has_text = true,
            CellValue::Null | CellValue::Int(_) => {}
        }
    }
    let has_int = cells.iter().any(|c| matches!(c, CellValue::Int(_)));

    if has_text {
        let values: Vec<Option<String>> = cells
            .into_iter()
            .map(|cell| match cell {
                CellValue::Null => None,
                CellValue::Int(v) => Some(v.to_string()),
                CellValue::Float(v) => Some(v.to_string()),
                CellValue::Text(s) => Some(s),
            })
            .collect();
        Series::new(name.into(), values)
    } else if has_int && !has_float {
        let values: Vec<Option<i64>> = cells
            .into_iter()
            .map(|cell| match cell {
                CellValue::Int(v) => Some(v),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else {
        let values: Vec<Option<f64>> = cells
            .into_iter()
            .map(|cell| match cell {
                CellValue::Int(v) => Some(v as f64),
                CellValue::Float(v) => Some(v),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    }
}

/// Assemble a frame from column names and column-major cells.
pub(crate) fn frame_from_cells(names: &[String], columns: Vec<Vec<CellValue>>) -> Result<DataFrame> {
    let columns: Vec<Column> = names
        .iter()
        .zip(columns)
        .map(|(name, cells)| series_from_cells(name, cells).into())
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Make header names non-empty and unique.
///
/// Blank headers become `Unnamed: {index}`; repeats get a `.{n}` suffix.
pub(crate) fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = if name.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let header = if *count == 0 {
                base
            } else {
                format!("{}.{}", base, count)
            };
            *count += 1;
            header
        })
        .collect()
}
