//! Error taxonomy.
//!
//! `ValidationError` never leaves the front end, `EngineError` is what a
//! request to the engine can resolve to, `ExportError` covers the export sink.

use std::path::PathBuf;

use crate::protocol::{AnalysisKind, RequestKind};

/// A local precondition failed; nothing was sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A period bound is unparseable or the range is inverted.
    #[error("invalid period {start:?} to {end:?}: {reason}")]
    InvalidRange {
        start: String,
        end: String,
        reason: &'static str,
    },

    /// Start or end date is empty.
    #[error("start and end dates are required")]
    MissingDateRange,

    /// No value column selected.
    #[error("select at least one column")]
    NoValueColumns,

    /// CUSUM accepts one or two columns.
    #[error("select one or two columns for CUSUM (got {0})")]
    CusumColumnCount(usize),

    /// Confidence is not a number.
    #[error("confidence must be a number, got {0:?}")]
    InvalidConfidence(String),

    /// The control chart needs at least one period.
    #[error("add at least one period")]
    NoPeriods,

    /// No value column selected for the control chart.
    #[error("select a column for the control chart")]
    NoControlColumn,

    /// No date column selected.
    #[error("select a date column")]
    NoDateColumn,

    /// A selected column is not offered by the loaded schema.
    #[error("column {0:?} is not available")]
    UnknownColumn(String),

    /// The action needs a loaded dataset.
    #[error("no dataset loaded")]
    NotLoaded,

    /// The action needs a selected file.
    #[error("select a file first")]
    NoFile,

    /// The action needs a selected sheet.
    #[error("select a sheet first")]
    NoSheet,

    /// The chosen sheet is not in the listed sheets.
    #[error("sheet {0:?} is not in the workbook")]
    UnknownSheet(String),

    /// A request of this kind is already in flight.
    #[error("{0} is already running")]
    Busy(&'static str),
}

/// Removing a period failed: nothing selected, or the index is out of range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe_missing(.index, .len))]
pub struct PeriodNotFound {
    /// Requested index, `None` when nothing was selected.
    pub index: Option<usize>,
    /// Number of periods at the time of the request.
    pub len: usize,
}

fn describe_missing(index: &Option<usize>, len: &usize) -> String {
    match index {
        Some(i) => format!("no period at index {i} ({len} periods)"),
        None => "no period selected".to_string(),
    }
}

fn kind_label(kind: &AnalysisKind) -> &'static str {
    kind.label()
}

/// A request to the engine failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The bytes are not a readable spreadsheet container.
    #[error("could not read workbook: {0}")]
    Parse(String),

    /// The workbook has no sheet with this name.
    #[error("sheet {0:?} not found")]
    SheetNotFound(String),

    /// The engine failed to initialise; every request fails with this.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// Engine-supplied free text, shown verbatim.
    #[error("{0}")]
    Compute(String),

    /// The engine answered with a response of another kind.
    #[error("engine answered {got:?} to a {expected:?} request")]
    Mismatch {
        expected: RequestKind,
        got: RequestKind,
    },
}

/// Export failures.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// No successful result of this kind is held.
    #[error("no data to export for {}", kind_label(.0))]
    NoData(AnalysisKind),

    /// The sink could not write the artifact.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
