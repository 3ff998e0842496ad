//! Session state owned by the dashboard controller.

use std::path::PathBuf;

use mettool_core::constants::DEFAULT_CONFIDENCE;
use mettool_core::{ExportSlots, PeriodStore};

/// Current value of every input control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selections {
    pub file: Option<PathBuf>,
    pub sheet: Option<String>,
    pub date_column: Option<String>,
    pub correlation_columns: Vec<String>,
    pub cusum_columns: Vec<String>,
    pub control_column: Option<String>,
    pub start: String,
    pub end: String,
    /// Raw text; parsed when a control chart is requested.
    pub confidence: String,
    pub show_limits: bool,
    pub show_average: bool,
    pub selected_period: Option<usize>,
}

impl Default for Selections {
    fn default() -> Self {
        Self {
            file: None,
            sheet: None,
            date_column: None,
            correlation_columns: Vec::new(),
            cusum_columns: Vec::new(),
            control_column: None,
            start: String::new(),
            end: String::new(),
            confidence: format!("{DEFAULT_CONFIDENCE}"),
            show_limits: true,
            show_average: true,
            selected_period: None,
        }
    }
}

/// Everything the controller mutates between reset points.
#[derive(Debug, Default)]
pub struct Session {
    pub selections: Selections,
    pub periods: PeriodStore,
    pub exports: ExportSlots,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset after a clear: selections and exports go, periods stay.
    pub fn reset_keeping_periods(&mut self) {
        self.selections = Selections::default();
        self.exports.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mettool_core::{AnalysisKind, ExportBuffer};

    #[test]
    fn defaults() {
        let s = Selections::default();
        assert_eq!(s.confidence, "95");
        assert!(s.show_limits && s.show_average);
        assert!(s.file.is_none());
    }

    #[test]
    fn reset_keeps_periods() {
        let mut session = Session::new();
        session.periods.add("2023-01-01", "2023-01-31").unwrap();
        session.selections.start = "2023-01-01".into();
        session
            .exports
            .replace(AnalysisKind::Cusum, ExportBuffer::from(vec![1]));
        session.reset_keeping_periods();
        assert_eq!(session.periods.len(), 1);
        assert!(session.selections.start.is_empty());
        assert!(!session.exports.has(AnalysisKind::Cusum));
    }
}
