//! The three analyses: correlation matrix, CUSUM and control chart.
//!
//! Each one selects a date window from the original table, filters it,
//! builds the chart payload and encodes the export workbook.

use tracing::debug;

use mettool_core::charts::{
    ControlTrace, CorrelationPayload, CusumPayload, CusumTrace, Dash, LineStyle, TraceMode,
};
use mettool_core::protocol::{ControlChartParams, CorrelationParams, CusumParams};
use mettool_core::{AnalysisKind, AnalysisOutput, EngineError};

use crate::export::encode_frame;
use crate::selection::{parse_bound, FilterOptions, Frame};
use crate::stats;
use crate::table::{format_datetime, Table};

/// Marker colours, cycled by period index.
pub const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f0f",
    "#bcbd22", "#17becf",
];

const GUIDE_COLOR: &str = "#888888";

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, EngineError> {
    serde_json::to_string(value).map_err(|e| EngineError::Compute(e.to_string()))
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

pub fn correlation(
    table: &Table,
    params: &CorrelationParams,
    filter: FilterOptions,
) -> Result<AnalysisOutput, EngineError> {
    let mut frame = Frame::select(
        table,
        &params.date_column,
        &params.start,
        &params.end,
        &params.value_columns,
    )?;
    frame.filter(filter);

    let labels: Vec<String> = frame.columns.iter().map(|(n, _)| n.clone()).collect();
    let columns: Vec<&[Option<f64>]> = frame.columns.iter().map(|(_, v)| v.as_slice()).collect();
    let z = stats::correlation_matrix(&columns)
        .into_iter()
        .map(|row| row.into_iter().map(finite).collect())
        .collect();
    let payload = CorrelationPayload {
        z,
        x: labels.clone(),
        y: labels,
    };
    debug!(columns = payload.x.len(), rows = frame.len(), "correlation computed");

    Ok(AnalysisOutput {
        chart_json: to_json(&payload)?,
        export: encode_frame(AnalysisKind::Correlation.export_sheet(), &frame)?,
    })
}

pub fn cusum(
    table: &Table,
    params: &CusumParams,
    filter: FilterOptions,
) -> Result<AnalysisOutput, EngineError> {
    let mut frame = Frame::select(
        table,
        &params.date_column,
        &params.start,
        &params.end,
        &params.value_columns,
    )?;
    frame.filter(filter);
    frame.sort_by_date();

    let traces = frame
        .columns
        .iter()
        .map(|(name, values)| CusumTrace {
            name: format!("CUSUM {name}"),
            data: stats::cusum(values).into_iter().map(finite).collect(),
        })
        .collect();
    let payload = CusumPayload {
        dates: frame.dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect(),
        date_column: frame.date_column.clone(),
        traces,
    };
    debug!(series = payload.traces.len(), rows = frame.len(), "cusum computed");

    Ok(AnalysisOutput {
        chart_json: to_json(&payload)?,
        export: encode_frame(AnalysisKind::Cusum.export_sheet(), &frame)?,
    })
}

fn guide(name: String, start: &str, end: &str, value: f64, dash: Dash, width: u32) -> ControlTrace {
    ControlTrace {
        x: vec![start.to_string(), end.to_string()],
        y: vec![Some(value), Some(value)],
        name: Some(name),
        mode: TraceMode::Lines,
        color: None,
        date_column: None,
        line: Some(LineStyle {
            color: GUIDE_COLOR.to_string(),
            dash,
            width,
        }),
        show_legend: Some(false),
    }
}

pub fn control_chart(
    table: &Table,
    params: &ControlChartParams,
    filter: FilterOptions,
) -> Result<AnalysisOutput, EngineError> {
    let columns = [params.value_column.clone()];
    let mut traces = Vec::new();
    let mut combined = Frame::default();

    for (i, period) in params.periods.iter().enumerate() {
        let (s, e) = (period.start.as_str(), period.end.as_str());
        let mut frame = Frame::select(table, &params.date_column, s, e, &columns)?;
        frame.filter(filter);
        frame.sort_by_date();
        let values = frame.values(&params.value_column).unwrap_or_default();

        traces.push(ControlTrace {
            x: frame.dates.iter().map(|d| format_datetime(*d)).collect(),
            y: values.iter().copied().map(finite).collect(),
            name: Some(format!("{s} – {e}")),
            mode: TraceMode::Markers,
            color: Some(PALETTE[i % PALETTE.len()].to_string()),
            date_column: Some(params.date_column.clone()),
            line: None,
            show_legend: None,
        });

        let x0 = parse_bound(s)?.format("%Y-%m-%d").to_string();
        let x1 = parse_bound(e)?.format("%Y-%m-%d").to_string();

        if params.show_limits {
            match stats::control_limits(values, params.confidence)? {
                Some((upper, lower)) if upper.is_finite() && lower.is_finite() => {
                    traces.push(guide(format!("UCL ({s}-{e})"), &x0, &x1, upper, Dash::Dash, 2));
                    traces.push(guide(format!("LCL ({s}-{e})"), &x0, &x1, lower, Dash::Dash, 2));
                }
                _ => {
                    traces.push(ControlTrace::placeholder());
                    traces.push(ControlTrace::placeholder());
                }
            }
        }

        if params.show_average {
            match stats::mean(values) {
                Some(avg) => {
                    traces.push(guide(format!("Avg ({s}-{e})"), &x0, &x1, avg, Dash::Dot, 3));
                }
                None => traces.push(ControlTrace::placeholder()),
            }
        }

        combined.append(frame);
    }

    if combined.columns.is_empty() {
        combined.date_column.clone_from(&params.date_column);
        combined.columns.push((params.value_column.clone(), Vec::new()));
    }
    debug!(
        periods = params.periods.len(),
        traces = traces.len(),
        "control chart computed"
    );

    Ok(AnalysisOutput {
        chart_json: to_json(&traces)?,
        export: encode_frame(AnalysisKind::ControlChart.export_sheet(), &combined)?,
    })
}
