//! Chart payloads as encoded by the engine.
//!
//! The engine serialises these to JSON; the adapters parse them back. Missing
//! numbers travel as `null`.

use serde::{Deserialize, Serialize};

/// Correlation matrix: `z[row][col]`, rows labelled by `y`, columns by `x`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationPayload {
    pub z: Vec<Vec<Option<f64>>>,
    pub x: Vec<String>,
    pub y: Vec<String>,
}

/// CUSUM series sharing one date axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CusumPayload {
    #[serde(rename = "dateCol")]
    pub dates: Vec<String>,
    #[serde(rename = "dateColName")]
    pub date_column: String,
    pub traces: Vec<CusumTrace>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CusumTrace {
    pub name: String,
    pub data: Vec<Option<f64>>,
}

/// How a control-chart trace is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    Markers,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dash {
    Solid,
    Dash,
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
    pub dash: Dash,
    pub width: u32,
}

/// One trace of a control chart. The payload is a JSON array of these.
///
/// A trace with no points is a placeholder kept so that traces stay aligned
/// with the period that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlTrace {
    #[serde(default)]
    pub x: Vec<String>,
    #[serde(default)]
    pub y: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mode: TraceMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        rename = "dateColName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub date_column: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(
        rename = "showlegend",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub show_legend: Option<bool>,
}

impl ControlTrace {
    /// Empty line trace standing in for a limit or average that has no value.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            name: None,
            mode: TraceMode::Lines,
            color: None,
            date_column: None,
            line: None,
            show_legend: None,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.x.is_empty() && self.y.is_empty()
    }
}
