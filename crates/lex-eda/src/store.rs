//! Append-only SQLite store of rendered charts.
//!
//! The store is a single file holding one relation:
//!
//! ```sql
//! CREATE TABLE plots (name TEXT, image BLOB)
//! ```
//!
//! Rows are only ever inserted. The whole file can be exported as a
//! downloadable artifact.

use crate::error::{Result, ResultExt};
use crate::types::StoredPlot;
use rusqlite::{Connection, params};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the exported store.
pub const EXPORT_FILE_NAME: &str = "plots.db";

/// Content type of the exported store.
pub const EXPORT_CONTENT_TYPE: &str = "application/octet-stream";

/// The exported store file, ready to hand to a downloader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Handle on the plot store. The connection closes when the handle drops.
#[derive(Debug)]
pub struct PlotStore {
    conn: Connection,
    path: PathBuf,
}

impl PlotStore {
    /// Open the store at `path`, creating the file and table if missing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)
            .context(format!("Failed to open plot store at {}", path.display()))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS plots (name TEXT, image BLOB)",
            [],
        )?;

        info!("Opened plot store at {}", path.display());
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert one rendered chart.
    pub fn append(&self, plot: &StoredPlot) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO plots (name, image) VALUES (?1, ?2)",
                params![plot.name, plot.image],
            )
            .context(format!("Failed to store '{}'", plot.name))?;
        debug!("Stored '{}' ({} bytes)", plot.name, plot.image.len());
        Ok(())
    }

    /// Number of stored charts.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM plots", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All stored charts in insertion order.
    pub fn entries(&self) -> Result<Vec<StoredPlot>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, image FROM plots ORDER BY rowid")?;
        let plots = stmt
            .query_map([], |row| {
                Ok(StoredPlot {
                    name: row.get(0)?,
                    image: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(plots)
    }

    /// Copy of the store file as a download artifact.
    pub fn export(&self) -> Result<ExportArtifact> {
        let bytes = std::fs::read(&self.path)?;
        info!("Exported plot store ({} bytes)", bytes.len());
        Ok(ExportArtifact {
            file_name: EXPORT_FILE_NAME.to_string(),
            content_type: EXPORT_CONTENT_TYPE.to_string(),
            bytes,
        })
    }

    /// Write the exported store to `dest`, returning the artifact written.
    pub fn export_to(&self, dest: impl AsRef<Path>) -> Result<ExportArtifact> {
        let artifact = self.export()?;
        std::fs::write(dest.as_ref(), &artifact.bytes)?;
        info!("Wrote plot store export to {}", dest.as_ref().display());
        Ok(artifact)
    }
}
