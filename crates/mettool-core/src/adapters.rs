//! Result-to-chart adapters.
//!
//! Pure transforms from an engine payload to the declarative shape a chart
//! renderer needs. An empty payload becomes `ChartView::NoData` instead of an
//! error so the front end can show a "no data" state.

use crate::charts::{ControlTrace, CorrelationPayload, CusumPayload, Dash, TraceMode};

/// Error raised when a payload cannot be adapted.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("malformed {chart} payload: {source}")]
    Json {
        chart: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{chart} payload is ragged: {detail}")]
    Ragged { chart: &'static str, detail: String },
}

/// Either something to draw, or an explicit "no data".
#[derive(Debug, Clone, PartialEq)]
pub enum ChartView<T> {
    NoData,
    Ready(T),
}

impl<T> ChartView<T> {
    #[must_use]
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }

    #[must_use]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::NoData => None,
        }
    }
}

/// Correlation heatmap. `cells[row][col]` is within `[-1, 1]` or missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Heatmap {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl Heatmap {
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

/// Scale a series is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
    pub axis: Axis,
}

impl Series {
    /// Min and max of the present values.
    #[must_use]
    pub fn range(&self) -> Option<(f64, f64)> {
        finite_range(self.values.iter().copied().flatten())
    }
}

/// Line chart over a shared date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub date_label: String,
    pub dates: Vec<String>,
    pub series: Vec<Series>,
}

/// What a control-chart trace stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceRole {
    Observed,
    Limit,
    Average,
    Line,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSeries {
    pub name: String,
    pub role: TraceRole,
    pub color: Option<String>,
    pub show_legend: bool,
    pub points: Vec<(String, Option<f64>)>,
}

/// Annotated control chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlChart {
    pub title: String,
    pub column: String,
    pub confidence: f64,
    pub date_label: Option<String>,
    pub traces: Vec<ControlSeries>,
}

impl ControlChart {
    /// Min and max over every plotted value.
    #[must_use]
    pub fn value_range(&self) -> Option<(f64, f64)> {
        finite_range(
            self.traces
                .iter()
                .flat_map(|t| t.points.iter().filter_map(|(_, v)| *v)),
        )
    }
}

fn finite_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Render confidence without a trailing `.0`.
#[must_use]
pub fn format_confidence(confidence: f64) -> String {
    if confidence.fract() == 0.0 {
        format!("{confidence:.0}")
    } else {
        format!("{confidence}")
    }
}

/// Adapt a correlation payload.
pub fn correlation_view(json: &str) -> Result<ChartView<Heatmap>, AdapterError> {
    let payload: CorrelationPayload =
        serde_json::from_str(json).map_err(|source| AdapterError::Json {
            chart: "correlation",
            source,
        })?;
    if payload.z.is_empty() || payload.x.is_empty() {
        return Ok(ChartView::NoData);
    }
    if payload.z.len() != payload.y.len() {
        return Err(AdapterError::Ragged {
            chart: "correlation",
            detail: format!("{} rows for {} row labels", payload.z.len(), payload.y.len()),
        });
    }
    for (i, row) in payload.z.iter().enumerate() {
        if row.len() != payload.x.len() {
            return Err(AdapterError::Ragged {
                chart: "correlation",
                detail: format!("row {i} has {} cells, expected {}", row.len(), payload.x.len()),
            });
        }
    }
    let cells = payload
        .z
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|c| c.filter(|v| v.is_finite()).map(|v| v.clamp(-1.0, 1.0)))
                .collect()
        })
        .collect();
    Ok(ChartView::Ready(Heatmap {
        row_labels: payload.y,
        column_labels: payload.x,
        cells,
    }))
}

/// Adapt a CUSUM payload. A second series goes on the secondary axis.
pub fn cusum_view(json: &str) -> Result<ChartView<LineChart>, AdapterError> {
    let payload: CusumPayload = serde_json::from_str(json).map_err(|source| AdapterError::Json {
        chart: "CUSUM",
        source,
    })?;
    match payload.traces.first() {
        None => return Ok(ChartView::NoData),
        Some(first) if first.data.is_empty() => return Ok(ChartView::NoData),
        Some(_) => {}
    }
    if let Some(t) = payload
        .traces
        .iter()
        .find(|t| t.data.len() != payload.dates.len())
    {
        return Err(AdapterError::Ragged {
            chart: "CUSUM",
            detail: format!(
                "series {:?} has {} points for {} dates",
                t.name,
                t.data.len(),
                payload.dates.len()
            ),
        });
    }
    let series = payload
        .traces
        .into_iter()
        .enumerate()
        .map(|(i, t)| Series {
            name: t.name,
            values: t.data,
            axis: if i == 0 { Axis::Primary } else { Axis::Secondary },
        })
        .collect();
    Ok(ChartView::Ready(LineChart {
        date_label: payload.date_column,
        dates: payload.dates,
        series,
    }))
}

/// Adapt a control-chart payload, labelling it with the analysed column and
/// the confidence used for the limits.
pub fn control_chart_view(
    json: &str,
    column: &str,
    confidence: f64,
) -> Result<ChartView<ControlChart>, AdapterError> {
    let traces: Vec<ControlTrace> =
        serde_json::from_str(json).map_err(|source| AdapterError::Json {
            chart: "control chart",
            source,
        })?;
    if traces.is_empty() || traces.iter().all(ControlTrace::is_placeholder) {
        return Ok(ChartView::NoData);
    }
    let date_label = traces.iter().find_map(|t| t.date_column.clone());
    let mut series = Vec::with_capacity(traces.len());
    for trace in traces {
        if trace.x.len() != trace.y.len() {
            return Err(AdapterError::Ragged {
                chart: "control chart",
                detail: format!(
                    "trace {:?} has {} dates for {} values",
                    trace.name.as_deref().unwrap_or(""),
                    trace.x.len(),
                    trace.y.len()
                ),
            });
        }
        let role = match (trace.mode, trace.line.as_ref().map(|l| l.dash)) {
            (TraceMode::Markers, _) => TraceRole::Observed,
            (TraceMode::Lines, Some(Dash::Dash)) => TraceRole::Limit,
            (TraceMode::Lines, Some(Dash::Dot)) => TraceRole::Average,
            (TraceMode::Lines, _) => TraceRole::Line,
        };
        let color = trace
            .color
            .or_else(|| trace.line.map(|l| l.color));
        series.push(ControlSeries {
            name: trace.name.unwrap_or_default(),
            role,
            color,
            show_legend: trace.show_legend.unwrap_or(true),
            points: trace.x.into_iter().zip(trace.y).collect(),
        });
    }
    Ok(ChartView::Ready(ControlChart {
        title: format!(
            "{column} control chart ({}% confidence)",
            format_confidence(confidence)
        ),
        column: column.to_string(),
        confidence,
        date_label,
        traces: series,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_matrix_is_adapted() {
        let json = r#"{"z":[[1.0,-0.5],[-0.5,1.0]],"x":["A","B"],"y":["A","B"]}"#;
        let view = correlation_view(json).unwrap();
        let heat = view.ready().unwrap();
        assert_eq!(heat.column_labels, vec!["A", "B"]);
        assert_eq!(heat.get(0, 1), Some(-0.5));
    }

    #[test]
    fn correlation_nulls_and_rounding_noise() {
        let json = r#"{"z":[[1.0000000002,null]],"x":["A","B"],"y":["A"]}"#;
        let view = correlation_view(json).unwrap();
        let heat = view.ready().unwrap();
        assert_eq!(heat.get(0, 0), Some(1.0));
        assert_eq!(heat.get(0, 1), None);
    }

    #[test]
    fn empty_correlation_is_no_data() {
        let json = r#"{"z":[],"x":[],"y":[]}"#;
        assert!(correlation_view(json).unwrap().is_no_data());
    }

    #[test]
    fn ragged_correlation_is_rejected() {
        let json = r#"{"z":[[1.0]],"x":["A","B"],"y":["A"]}"#;
        assert!(matches!(
            correlation_view(json),
            Err(AdapterError::Ragged { .. })
        ));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            correlation_view("not json"),
            Err(AdapterError::Json { .. })
        ));
    }

    #[test]
    fn cusum_second_series_uses_secondary_axis() {
        let json = r#"{"dateCol":["2023-01-01","2023-01-02"],"dateColName":"Date",
            "traces":[{"name":"CUSUM A","data":[1.0,2.0]},{"name":"CUSUM B","data":[100.0,null]}]}"#;
        let view = cusum_view(json).unwrap();
        let chart = view.ready().unwrap();
        assert_eq!(chart.series[0].axis, Axis::Primary);
        assert_eq!(chart.series[1].axis, Axis::Secondary);
        assert_eq!(chart.series[1].range(), Some((100.0, 100.0)));
    }

    #[test]
    fn cusum_without_points_is_no_data() {
        let json = r#"{"dateCol":[],"dateColName":"Date","traces":[{"name":"CUSUM A","data":[]}]}"#;
        assert!(cusum_view(json).unwrap().is_no_data());
        let json = r#"{"dateCol":[],"dateColName":"Date","traces":[]}"#;
        assert!(cusum_view(json).unwrap().is_no_data());
    }

    #[test]
    fn empty_control_chart_is_no_data() {
        assert!(control_chart_view("[]", "A", 95.0).unwrap().is_no_data());
        let json = r#"[{"x":[],"y":[],"mode":"lines"},{"x":[],"y":[],"mode":"lines"}]"#;
        assert!(control_chart_view(json, "A", 95.0).unwrap().is_no_data());
    }

    #[test]
    fn control_chart_roles_and_title() {
        let json = r##"[
            {"x":["2023-01-01","2023-01-02"],"y":[1.0,2.0],"name":"01/01/2023 – 31/01/2023","mode":"markers","color":"#1f77b4","dateColName":"Date"},
            {"x":["2023-01-01","2023-01-31"],"y":[3.0,3.0],"name":"UCL","mode":"lines","line":{"color":"#888888","dash":"dash","width":2},"showlegend":false},
            {"x":["2023-01-01","2023-01-31"],"y":[1.5,1.5],"name":"Avg","mode":"lines","line":{"color":"#888888","dash":"dot","width":3},"showlegend":false},
            {"x":[],"y":[],"mode":"lines"}
        ]"##;
        let view = control_chart_view(json, "A", 95.0).unwrap();
        let chart = view.ready().unwrap();
        assert_eq!(chart.title, "A control chart (95% confidence)");
        assert_eq!(chart.date_label.as_deref(), Some("Date"));
        let roles: Vec<_> = chart.traces.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                TraceRole::Observed,
                TraceRole::Limit,
                TraceRole::Average,
                TraceRole::Line
            ]
        );
        assert_eq!(chart.traces[1].color.as_deref(), Some("#888888"));
        assert!(!chart.traces[1].show_legend);
        assert_eq!(chart.value_range(), Some((1.0, 3.0)));
    }

    #[test]
    fn confidence_formatting() {
        assert_eq!(format_confidence(95.0), "95");
        assert_eq!(format_confidence(99.5), "99.5");
    }
}
