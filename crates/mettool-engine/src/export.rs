//! Spreadsheet encoding of analysis results.

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::debug;

use mettool_core::{EngineError, ExportBuffer};

use crate::selection::Frame;
use crate::table::format_datetime;

/// Encoding failure, reported to the front end as a compute error.
#[derive(Debug, thiserror::Error)]
#[error("failed to encode export: {0}")]
pub struct ExportFailure(#[from] XlsxError);

impl From<ExportFailure> for EngineError {
    fn from(err: ExportFailure) -> Self {
        Self::Compute(err.to_string())
    }
}

/// Encode `frame` as a one-sheet `.xlsx` workbook: a bold header row, the
/// date column first as `YYYY-MM-DD` text, then the value columns. Missing
/// values are left blank.
pub fn encode_frame(sheet: &str, frame: &Frame) -> Result<ExportBuffer, ExportFailure> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let ws = workbook.add_worksheet();
    ws.set_name(sheet)?;

    ws.write_string_with_format(0, 0, &frame.date_column, &bold)?;
    for (col, (name, _)) in (1u16..).zip(&frame.columns) {
        ws.write_string_with_format(0, col, name, &bold)?;
    }

    for (row, date) in (1u32..).zip(&frame.dates) {
        ws.write_string(row, 0, format_datetime(*date))?;
    }
    for (col, (_, values)) in (1u16..).zip(&frame.columns) {
        for (row, value) in (1u32..).zip(values) {
            if let Some(v) = value {
                ws.write_number(row, col, *v)?;
            }
        }
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(sheet, rows = frame.len(), bytes = bytes.len(), "export encoded");
    Ok(ExportBuffer::from(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook;
    use chrono::NaiveDate;

    #[test]
    fn encoded_sheet_reads_back() {
        let day = |d| {
            NaiveDate::from_ymd_opt(2023, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let frame = Frame {
            date_column: "Date".into(),
            dates: vec![day(1), day(2)],
            columns: vec![("A".into(), vec![Some(1.5), None])],
        };
        let buffer = encode_frame("CUSUM", &frame).unwrap();
        assert!(!buffer.is_empty());

        let bytes = buffer.into_inner();
        assert_eq!(workbook::sheet_names(bytes.clone()).unwrap(), vec!["CUSUM"]);
        let table = workbook::read_sheet(bytes, "CUSUM").unwrap();
        assert_eq!(table.names(), vec!["Date", "A"]);
        assert_eq!(table.height(), 2);
        let a = &table.column("A").unwrap().cells;
        assert_eq!(a[0].to_number(), Some(1.5));
        assert_eq!(a[1].to_number(), None);
    }

    #[test]
    fn invalid_sheet_name_is_reported() {
        let err = encode_frame("bad/name", &Frame::default()).unwrap_err();
        assert!(matches!(EngineError::from(err), EngineError::Compute(_)));
    }
}
