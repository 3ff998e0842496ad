//! Spreadsheet container decoding.
//!
//! Any format calamine understands (`xlsx`, `xlsm`, `xls`, `ods`) is read
//! from an owned byte buffer; the format is sniffed, not taken from a file
//! extension.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use mettool_core::EngineError;

use crate::table::{Cell, Table};

/// Failures while reading a workbook.
#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("not a readable spreadsheet: {0}")]
    Open(#[source] calamine::Error),

    #[error("sheet {0:?} not found")]
    MissingSheet(String),

    #[error("failed to read sheet {sheet:?}: {source}")]
    Read {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("sheet {0:?} has no columns")]
    NoColumns(String),
}

impl From<WorkbookError> for EngineError {
    fn from(err: WorkbookError) -> Self {
        match err {
            WorkbookError::MissingSheet(name) => Self::SheetNotFound(name),
            other => Self::Parse(other.to_string()),
        }
    }
}

/// Sheet names in workbook order.
pub fn sheet_names(bytes: Vec<u8>) -> Result<Vec<String>, WorkbookError> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(WorkbookError::Open)?;
    Ok(workbook.sheet_names())
}

/// Read `sheet` into a table; the first row is the header.
pub fn read_sheet(bytes: Vec<u8>, sheet: &str) -> Result<Table, WorkbookError> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(WorkbookError::Open)?;
    if !workbook.sheet_names().iter().any(|s| s == sheet) {
        return Err(WorkbookError::MissingSheet(sheet.to_string()));
    }
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|source| WorkbookError::Read {
            sheet: sheet.to_string(),
            source,
        })?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Err(WorkbookError::NoColumns(sheet.to_string()));
    };
    let header: Vec<Cell> = header.iter().map(decode).collect();
    if header.is_empty() {
        return Err(WorkbookError::NoColumns(sheet.to_string()));
    }
    let body: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(decode).collect()).collect();
    Ok(Table::from_rows(&header, body))
}

fn decode(data: &Data) -> Cell {
    match data {
        Data::Int(v) => {
            #[allow(clippy::cast_precision_loss)]
            let v = *v as f64;
            Cell::Number(v)
        }
        Data::Float(v) => Cell::Number(*v),
        Data::Bool(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let text = Cell::Text(s.clone());
            text.to_datetime().map_or(text, Cell::Date)
        }
        Data::DateTime(dt) => excel_serial(dt.as_f64()).map_or(Cell::Empty, Cell::Date),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Convert an Excel serial day number (1900 system) to a timestamp.
/// Serials outside the range chrono can represent yield `None`.
fn excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    #[allow(clippy::cast_possible_truncation)]
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
