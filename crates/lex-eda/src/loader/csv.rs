//! CSV uploads.

use crate::error::{Result, ResultExt};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions, NullValues};
use polars::prelude::*;
use std::io::Cursor;

/// Cell contents read as missing, matching the pandas defaults.
pub const MISSING_MARKERS: [&str; 14] = [
    "", "NA", "N/A", "NULL", "NaN", "nan", "null", "n/a", "None", "#N/A", "<NA>", "-NaN", "-nan",
    "#NA",
];

/// Parse CSV bytes with a header row.
///
/// Types are inferred from every row, so a value late in the file widens its
/// column instead of failing the parse.
pub(crate) fn read_csv(bytes: Vec<u8>) -> Result<DataFrame> {
    let null_values = NullValues::AllColumns(
        MISSING_MARKERS
            .iter()
            .map(|marker| PlSmallStr::from_static(marker))
            .collect(),
    );

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .context("Failed to parse CSV upload")
}
