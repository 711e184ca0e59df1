//! Excel uploads (`.xlsx`, `.xls`). Only the first worksheet is read.

use super::{CellValue, frame_from_cells, unique_headers};
use crate::error::{EdaError, Result};
use calamine::{Data, Reader, open_workbook_auto_from_rs};
use polars::prelude::DataFrame;
use std::io::Cursor;
use tracing::debug;

/// Read the first worksheet; its first row is the header.
pub(crate) fn read_first_sheet(bytes: Vec<u8>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| EdaError::Spreadsheet(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| EdaError::Spreadsheet("workbook has no worksheets".to_string()))?;

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| EdaError::Spreadsheet(format!("sheet '{}': {}", first, e)))?;

    debug!(
        "Reading worksheet '{}' (first of {} sheets)",
        first,
        sheet_names.len()
    );

    let rows: Vec<&[Data]> = range.rows().collect();
    columns_from_rows(&rows)
}

/// Build a frame from worksheet rows, header first.
///
/// Short rows are padded with nulls; cells beyond the header width are ignored.
pub(crate) fn columns_from_rows(rows: &[&[Data]]) -> Result<DataFrame> {
    let Some((header, body)) = rows.split_first() else {
        return Ok(DataFrame::empty());
    };

    let names = unique_headers(header.iter().map(header_text).collect());
    let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(body.len()); names.len()];

    for row in body {
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(row.get(i).map(cell_value).unwrap_or(CellValue::Null));
        }
    }

    frame_from_cells(&names, columns)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{:.0}", f),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => format!("{}", dt),
    }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Null,
        Data::Int(v) => CellValue::Int(*v),
        Data::Float(v) => CellValue::Float(*v),
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => CellValue::Text(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
