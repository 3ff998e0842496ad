//! In-memory spreadsheets built with the same encoder the engine exports with.

use chrono::{Duration, NaiveDate};
use rust_xlsxwriter::{Workbook, XlsxError};

/// One cell of a fixture row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    Empty,
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<Option<f64>> for Value {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Self::Empty, Self::Number)
    }
}

/// A named sheet: a header row followed by data rows.
#[derive(Debug, Clone)]
pub struct SheetBuilder {
    name: String,
    header: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str, header: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            header: header.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        }
    }

    #[must_use]
    pub fn row(mut self, cells: Vec<Value>) -> Self {
        self.rows.push(cells);
        self
    }

    /// A row whose first cell is `date` and the rest are numbers or blanks.
    #[must_use]
    pub fn dated(self, date: &str, values: &[Option<f64>]) -> Self {
        let cells = std::iter::once(Value::from(date))
            .chain(values.iter().copied().map(Value::from))
            .collect();
        self.row(cells)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `days` consecutive `YYYY-MM-DD` dates from `start`.
#[must_use]
pub fn daily(start: NaiveDate, days: u32) -> Vec<String> {
    (0..i64::from(days))
        .map(|d| (start + Duration::days(d)).format("%Y-%m-%d").to_string())
        .collect()
}

/// Encode `sheets` as one `.xlsx` workbook.
pub fn encode(sheets: &[SheetBuilder]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(&sheet.name)?;
        for (col, name) in (0u16..).zip(&sheet.header) {
            ws.write_string(0, col, name)?;
        }
        for (row, cells) in (1u32..).zip(&sheet.rows) {
            for (col, cell) in (0u16..).zip(cells) {
                match cell {
                    Value::Text(t) => {
                        ws.write_string(row, col, t)?;
                    }
                    Value::Number(v) => {
                        ws.write_number(row, col, *v)?;
                    }
                    Value::Empty => {}
                }
            }
        }
    }
    workbook.save_to_buffer()
}

/// Sixty days of three process measurements from 2023-01-01, plus a column
/// that is mostly zeros and a second, unrelated sheet.
pub fn process_workbook() -> Result<Vec<u8>, XlsxError> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    let mut process = SheetBuilder::new("Process", &["Date", "Temp", "Pressure", "Flow", "Spare"]);
    for (i, date) in (0u32..).zip(daily(start, 60)) {
        let x = f64::from(i);
        let spare = if i % 10 == 0 { Some(1.0) } else { Some(0.0) };
        process = process.dated(
            &date,
            &[
                Some(20.0 + 0.1 * x + f64::from(i % 4)),
                Some(100.0 - 0.2 * x + f64::from(i % 3)),
                (i % 7 != 3).then_some(5.0 + f64::from(i % 5)),
                spare,
            ],
        );
    }
    let notes = SheetBuilder::new("Notes", &["Author", "Comment"])
        .row(vec!["qa".into(), "calibrated".into()]);
    encode(&[process, notes])
}
