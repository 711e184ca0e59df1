//! Custom error types for the EDA session.
//!
//! This module provides the error hierarchy using `thiserror` for loading,
//! cleaning, chart rendering and plot storage.
//!
//! Errors are serializable so a front end can display them with a stable
//! machine-readable code next to the human-readable message.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the EDA session.
#[derive(Error, Debug)]
pub enum EdaError {
    /// The uploaded file extension is not one of csv, xlsx, xls, db, sqlite.
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    /// The embedded database contains no tables.
    #[error("No tables found in the database")]
    NoTables,

    /// The selected table is not among the enumerated database tables.
    #[error("Table '{0}' is not present in the database")]
    UnknownTable(String),

    /// A database upload was loaded without choosing one of its tables.
    #[error("Select a table to load: {}", available.join(", "))]
    TableNotSelected { available: Vec<String> },

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// A single chart failed to render.
    #[error("Failed to render '{title}': {reason}")]
    Render { title: String, reason: String },

    /// Spreadsheet container could not be read.
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No table has been ingested into the session yet.
    #[error("No data loaded")]
    NoDataLoaded,

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// SQLite error wrapper (database uploads and the plot store).
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EdaError>,
    },
}

impl EdaError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EdaError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a render error for the chart with the given title.
    pub fn render(title: impl Into<String>, reason: impl ToString) -> Self {
        EdaError::Render {
            title: title.into(),
            reason: reason.to_string(),
        }
    }

    /// Get error code for front end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::NoTables => "NO_TABLES",
            Self::UnknownTable(_) => "UNKNOWN_TABLE",
            Self::TableNotSelected { .. } => "TABLE_NOT_SELECTED",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::Render { .. } => "RENDER_FAILED",
            Self::Spreadsheet(_) => "SPREADSHEET_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoDataLoaded => "NO_DATA_LOADED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error ends processing of the current upload.
    ///
    /// Render failures are isolated to one chart; everything raised while
    /// loading or selecting a table is terminal for that upload.
    pub fn is_terminal_for_upload(&self) -> bool {
        match self {
            Self::Render { .. } => false,
            Self::WithContext { source, .. } => source.is_terminal_for_upload(),
            _ => true,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for EdaError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("EdaError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for EDA operations.
pub type Result<T> = std::result::Result<T, EdaError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EdaError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| EdaError::Database(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(EdaError::NoTables.error_code(), "NO_TABLES");
        assert_eq!(
            EdaError::UnsupportedFormat(".txt".to_string()).error_code(),
            "UNSUPPORTED_FORMAT"
        );
        assert_eq!(EdaError::render("Histogram: x", "empty").error_code(), "RENDER_FAILED");
    }

    #[test]
    fn test_render_errors_are_not_terminal() {
        assert!(!EdaError::render("Pie Chart: city", "no data").is_terminal_for_upload());
        assert!(EdaError::NoTables.is_terminal_for_upload());
        assert!(EdaError::UnknownTable("t".to_string()).is_terminal_for_upload());
    }

    #[test]
    fn test_error_serialization() {
        let error = EdaError::ColumnNotFound("Age".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Age"));
    }

    #[test]
    fn test_with_context() {
        let error = EdaError::render("Line Plot: x", "empty series").with_context("Chart 1 of 2");
        assert!(error.to_string().contains("Chart 1 of 2"));
        assert_eq!(error.error_code(), "RENDER_FAILED");
        assert!(!error.is_terminal_for_upload());
    }
}
