//! SQLite uploads (`.db`, `.sqlite`).
//!
//! The uploaded bytes are written to a named temporary file and opened
//! read-only. The file lives exactly as long as the [`DatabaseSource`].

use super::{CellValue, frame_from_cells};
use crate::error::{EdaError, Result, ResultExt};
use crate::types::Table;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// An opened database upload awaiting table selection.
#[derive(Debug)]
pub struct DatabaseSource {
    // Declared before `file` so the connection closes before the file is removed.
    conn: Connection,
    file: NamedTempFile,
    tables: Vec<String>,
}

impl DatabaseSource {
    /// Write the upload to a temporary file and enumerate its tables.
    pub(crate) fn materialize(bytes: &[u8], suffix: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("lex-eda-upload-")
            .suffix(suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let conn = Connection::open_with_flags(file.path(), OpenFlags::SQLITE_OPEN_READ_ONLY)
            .context("Failed to open database upload")?;
        let tables = list_tables(&conn)?;

        if tables.is_empty() {
            return Err(EdaError::NoTables);
        }

        info!("Database upload contains {} tables", tables.len());
        debug!("Tables: {:?} at {}", tables, file.path().display());

        Ok(Self { conn, file, tables })
    }

    /// Table names in catalog order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Location of the temporary copy.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Load every row of one enumerated table.
    pub fn load_table(&self, name: &str) -> Result<Table> {
        if !self.tables.iter().any(|t| t == name) {
            return Err(EdaError::UnknownTable(name.to_string()));
        }

        let sql = format!("SELECT * FROM {}", quote_identifier(name));
        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, column) in columns.iter_mut().enumerate() {
                column.push(cell_value(row.get_ref(i)?));
            }
        }

        let table = Table::new(frame_from_cells(&names, columns)?);
        info!(
            "Loaded table '{}' ({} rows x {} columns)",
            name,
            table.height(),
            table.width()
        );
        Ok(table)
    }
}

fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .context("Failed to read database catalog")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Quote a table name as an SQL identifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn cell_value(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Integer(v) => CellValue::Int(v),
        ValueRef::Real(v) => CellValue::Float(v),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            CellValue::Text(String::from_utf8_lossy(t).into_owned())
        }
    }
}
