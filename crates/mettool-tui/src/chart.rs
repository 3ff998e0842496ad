//! Line and control chart widgets.
//!
//! Adapter output is first flattened into a [`Plot`] (pure, testable), then
//! drawn with ratatui's `Chart`. The x axis is the position in the sorted
//! list of distinct dates.

use std::collections::BTreeSet;

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph};
use ratatui::Frame;

use mettool_core::adapters::{Axis as SeriesAxis, ControlChart, LineChart, TraceRole};

use crate::styles::{parse_hex, ColorTheme};

const SERIES_COLORS: [Color; 4] = [Color::Cyan, Color::Magenta, Color::Yellow, Color::Green];

#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    /// `None` keeps the series out of the legend.
    pub name: Option<String>,
    pub color: Color,
    /// Joined line when true, markers otherwise.
    pub line: bool,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    pub series: Vec<PlotSeries>,
    pub x_labels: Vec<String>,
    pub x_max: f64,
    pub y_bounds: [f64; 2],
}

/// Map `v` from the `from` range onto the `to` range. A degenerate source
/// range lands in the middle of the target.
#[must_use]
pub fn rescale(v: f64, from: (f64, f64), to: (f64, f64)) -> f64 {
    let span = from.1 - from.0;
    if span.abs() < f64::EPSILON {
        return (to.0 + to.1) / 2.0;
    }
    to.0 + (v - from.0) / span * (to.1 - to.0)
}

fn padded(range: Option<(f64, f64)>) -> [f64; 2] {
    match range {
        None => [0.0, 1.0],
        Some((lo, hi)) if (hi - lo).abs() < f64::EPSILON => [lo - 1.0, hi + 1.0],
        Some((lo, hi)) => {
            let pad = (hi - lo) * 0.05;
            [lo - pad, hi + pad]
        }
    }
}

fn axis_labels(dates: &[String]) -> Vec<String> {
    match dates {
        [] => Vec::new(),
        [only] => vec![only.clone()],
        [first, .., last] if dates.len() == 2 => vec![first.clone(), last.clone()],
        [first, .., last] => vec![first.clone(), dates[dates.len() / 2].clone(), last.clone()],
    }
}

fn fmt_range((lo, hi): (f64, f64)) -> String {
    format!("{lo:.2}..{hi:.2}")
}

/// CUSUM lines. Secondary-axis series are rescaled onto the primary range
/// and carry their true range in the legend.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cusum_plot(chart: &LineChart) -> Plot {
    let primary = chart
        .series
        .iter()
        .filter(|s| s.axis == SeriesAxis::Primary)
        .filter_map(|s| s.range())
        .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)));

    let series = chart
        .series
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let own = s.range();
            let (name, project): (String, Box<dyn Fn(f64) -> f64>) = match (s.axis, own, primary) {
                (SeriesAxis::Secondary, Some(own), Some(target)) => (
                    format!("{} (right {})", s.name, fmt_range(own)),
                    Box::new(move |v: f64| rescale(v, own, target)),
                ),
                _ => (s.name.clone(), Box::new(|v: f64| v)),
            };
            PlotSeries {
                name: Some(name),
                color: SERIES_COLORS[i % SERIES_COLORS.len()],
                line: true,
                points: s
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(x, v)| v.map(|v| (x as f64, project(v))))
                    .collect(),
            }
        })
        .collect();

    let y = primary.or_else(|| chart.series.iter().find_map(|s| s.range()));
    Plot {
        series,
        x_labels: axis_labels(&chart.dates),
        x_max: chart.dates.len().saturating_sub(1).max(1) as f64,
        y_bounds: padded(y),
    }
}

fn role_color(role: TraceRole, index: usize) -> Color {
    match role {
        TraceRole::Limit | TraceRole::Average => Color::Gray,
        TraceRole::Observed | TraceRole::Line => SERIES_COLORS[index % SERIES_COLORS.len()],
    }
}

/// Control chart traces over the union of their dates. Placeholder traces
/// (no points) are skipped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn control_plot(chart: &ControlChart) -> Plot {
    let dates: Vec<String> = chart
        .traces
        .iter()
        .flat_map(|t| t.points.iter().map(|(d, _)| d.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let position = |d: &String| dates.binary_search(d).unwrap_or(0) as f64;

    let series = chart
        .traces
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.points.is_empty())
        .map(|(i, t)| PlotSeries {
            name: t.show_legend.then(|| t.name.clone()),
            color: t
                .color
                .as_deref()
                .and_then(parse_hex)
                .unwrap_or_else(|| role_color(t.role, i)),
            line: t.role != TraceRole::Observed,
            points: t
                .points
                .iter()
                .filter_map(|(d, v)| v.map(|v| (position(d), v)))
                .collect(),
        })
        .collect();

    Plot {
        series,
        x_labels: axis_labels(&dates),
        x_max: dates.len().saturating_sub(1).max(1) as f64,
        y_bounds: padded(chart.value_range()),
    }
}

/// Draw `plot` inside a bordered block titled `title`.
pub fn render_plot(frame: &mut Frame, area: Rect, title: &str, plot: &Plot, theme: &ColorTheme) {
    let datasets: Vec<Dataset> = plot
        .series
        .iter()
        .map(|s| {
            let ds = Dataset::default()
                .marker(if s.line { Marker::Braille } else { Marker::Dot })
                .graph_type(if s.line {
                    GraphType::Line
                } else {
                    GraphType::Scatter
                })
                .style(Style::default().fg(s.color))
                .data(&s.points);
            match &s.name {
                Some(name) => ds.name(name.clone()),
                None => ds,
            }
        })
        .collect();

    let [lo, hi] = plot.y_bounds;
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::styled(format!(" {title} "), theme.header_style())),
        )
        .x_axis(
            Axis::default()
                .style(theme.muted_style())
                .bounds([0.0, plot.x_max])
                .labels(plot.x_labels.clone()),
        )
        .y_axis(
            Axis::default()
                .style(theme.muted_style())
                .bounds(plot.y_bounds)
                .labels(vec![format!("{lo:.2}"), format!("{hi:.2}")]),
        );
    frame.render_widget(chart, area);
}

/// Placeholder for a tab without a drawable result.
pub fn render_no_data(frame: &mut Frame, area: Rect, title: &str, theme: &ColorTheme) {
    let body = Paragraph::new("No data")
        .style(theme.muted_style())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(format!(" {title} ")));
    frame.render_widget(body, area);
}
