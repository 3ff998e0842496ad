//! Request/response protocol between the dashboard and the engine.
//!
//! Both sides are closed enums so that a new analysis kind has to be handled
//! everywhere a request or a response is matched.

use serde::{Deserialize, Serialize};

use crate::export::ExportBuffer;
use crate::periods::WirePeriod;

/// The three analyses that produce a chart and an export buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Correlation,
    Cusum,
    ControlChart,
}

impl AnalysisKind {
    /// All kinds, in tab order.
    pub const ALL: [Self; 3] = [Self::Correlation, Self::Cusum, Self::ControlChart];

    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Correlation => "Correlation",
            Self::Cusum => "CUSUM",
            Self::ControlChart => "Control chart",
        }
    }

    /// Fixed filename of the exported spreadsheet.
    #[must_use]
    pub fn export_filename(self) -> &'static str {
        match self {
            Self::Correlation => "correlation.xlsx",
            Self::Cusum => "cusum.xlsx",
            Self::ControlChart => "control_chart.xlsx",
        }
    }

    /// Sheet name used inside the exported workbook.
    #[must_use]
    pub fn export_sheet(self) -> &'static str {
        match self {
            Self::Correlation => "Correlation",
            Self::Cusum => "CUSUM",
            Self::ControlChart => "Control",
        }
    }

    /// Dense index for per-kind tables.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Correlation => 0,
            Self::Cusum => 1,
            Self::ControlChart => 2,
        }
    }
}

/// Tag of a request (and of the response answering it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    ListSheets,
    LoadSheet,
    Clear,
    Analysis(AnalysisKind),
}

/// Parameters of a correlation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationParams {
    #[serde(rename = "dateCol")]
    pub date_column: String,
    #[serde(rename = "cols")]
    pub value_columns: Vec<String>,
    pub start: String,
    pub end: String,
}

/// Parameters of a CUSUM request; one or two value columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CusumParams {
    #[serde(rename = "dateCol")]
    pub date_column: String,
    #[serde(rename = "cols")]
    pub value_columns: Vec<String>,
    pub start: String,
    pub end: String,
}

/// Parameters of a control-chart request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlChartParams {
    #[serde(rename = "dateCol")]
    pub date_column: String,
    #[serde(rename = "col")]
    pub value_column: String,
    #[serde(rename = "conf")]
    pub confidence: f64,
    pub periods: Vec<WirePeriod>,
    #[serde(rename = "showLim")]
    pub show_limits: bool,
    #[serde(rename = "showAvg")]
    pub show_average: bool,
}

/// A request to the engine. Workbook bytes are owned by the request and
/// move to the engine with it.
#[derive(Debug)]
pub enum Request {
    ListSheets { workbook: Vec<u8> },
    LoadSheet { workbook: Vec<u8>, sheet: String },
    Clear,
    Correlation(CorrelationParams),
    Cusum(CusumParams),
    ControlChart(ControlChartParams),
}

impl Request {
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::ListSheets { .. } => RequestKind::ListSheets,
            Self::LoadSheet { .. } => RequestKind::LoadSheet,
            Self::Clear => RequestKind::Clear,
            Self::Correlation(_) => RequestKind::Analysis(AnalysisKind::Correlation),
            Self::Cusum(_) => RequestKind::Analysis(AnalysisKind::Cusum),
            Self::ControlChart(_) => RequestKind::Analysis(AnalysisKind::ControlChart),
        }
    }
}

/// Result of an analysis: JSON chart data plus the spreadsheet export.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub chart_json: String,
    pub export: ExportBuffer,
}

/// A successful engine answer, tagged like the request that produced it.
#[derive(Debug)]
pub enum Response {
    Sheets(Vec<String>),
    Columns(Vec<String>),
    Cleared,
    Correlation(AnalysisOutput),
    Cusum(AnalysisOutput),
    ControlChart(AnalysisOutput),
}

impl Response {
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Sheets(_) => RequestKind::ListSheets,
            Self::Columns(_) => RequestKind::LoadSheet,
            Self::Cleared => RequestKind::Clear,
            Self::Correlation(_) => RequestKind::Analysis(AnalysisKind::Correlation),
            Self::Cusum(_) => RequestKind::Analysis(AnalysisKind::Cusum),
            Self::ControlChart(_) => RequestKind::Analysis(AnalysisKind::ControlChart),
        }
    }

    /// Split an analysis response into its kind and output.
    #[must_use]
    pub fn into_analysis(self) -> Option<(AnalysisKind, AnalysisOutput)> {
        match self {
            Self::Correlation(out) => Some((AnalysisKind::Correlation, out)),
            Self::Cusum(out) => Some((AnalysisKind::Cusum, out)),
            Self::ControlChart(out) => Some((AnalysisKind::ControlChart, out)),
            Self::Sheets(_) | Self::Columns(_) | Self::Cleared => None,
        }
    }
}
