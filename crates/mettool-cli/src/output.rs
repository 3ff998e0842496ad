//! Console formatting and the directory export sink.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mettool_core::adapters::{Axis, ChartView, ControlChart, Heatmap, LineChart, TraceRole};
use mettool_core::ExportError;
use mettool_orchestration::{Chart, ExportSink};

/// Writes export artifacts into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExportSink for DirectorySink {
    fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        let path = self.dir.join(filename);
        let io = |source| ExportError::Io {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(io)?;
        std::fs::write(&path, bytes).map_err(io)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(path)
    }
}

/// Format a duration for display.
#[must_use]
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{secs:.2}s")
    } else {
        format!("{}m{}s", d.as_secs() / 60, d.as_secs() % 60)
    }
}

fn number(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

/// Plain-text summary of a rendered chart, one line per entry.
#[must_use]
pub fn describe_chart(chart: &Chart) -> Vec<String> {
    match chart {
        Chart::Correlation(view) => describe(view, describe_heatmap),
        Chart::Cusum(view) => describe(view, describe_lines),
        Chart::ControlChart(view) => describe(view, describe_control),
    }
}

fn describe<T>(view: &ChartView<T>, f: fn(&T) -> Vec<String>) -> Vec<String> {
    match view {
        ChartView::NoData => vec!["no data".to_string()],
        ChartView::Ready(inner) => f(inner),
    }
}

fn describe_heatmap(map: &Heatmap) -> Vec<String> {
    let width = map
        .column_labels
        .iter()
        .chain(&map.row_labels)
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(6);
    let mut lines = Vec::with_capacity(map.row_labels.len() + 1);
    let mut header = format!("{:width$}", "");
    for label in &map.column_labels {
        let _ = write!(header, " {label:>width$}");
    }
    lines.push(header);
    for (r, label) in map.row_labels.iter().enumerate() {
        let mut line = format!("{label:width$}");
        for c in 0..map.column_labels.len() {
            let _ = write!(line, " {:>width$}", number(map.get(r, c)));
        }
        lines.push(line);
    }
    lines
}

fn describe_lines(chart: &LineChart) -> Vec<String> {
    let span = match (chart.dates.first(), chart.dates.last()) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "no dates".to_string(),
    };
    let mut lines = vec![format!("{} points, {span}", chart.dates.len())];
    for series in &chart.series {
        let axis = match series.axis {
            Axis::Primary => "left",
            Axis::Secondary => "right",
        };
        let last = series.values.iter().rev().find_map(|v| *v);
        let (lo, hi) = series.range().unzip();
        lines.push(format!(
            "{} ({axis} axis): min {} max {} last {}",
            series.name,
            number(lo),
            number(hi),
            number(last)
        ));
    }
    lines
}

fn describe_control(chart: &ControlChart) -> Vec<String> {
    let mut lines = vec![chart.title.clone()];
    let observed = chart
        .traces
        .iter()
        .filter(|t| t.role == TraceRole::Observed && !t.points.is_empty());
    for trace in observed {
        lines.push(format!("{}: {} points", trace.name, trace.points.len()));
    }
    for trace in chart.traces.iter().filter(|t| t.role != TraceRole::Observed) {
        if let Some((_, value)) = trace.points.first() {
            lines.push(format!("  {} {}", trace.name, number(*value)));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use mettool_core::adapters::{ControlSeries, Series};
    use mettool_core::AnalysisKind;

    #[test]
    fn directory_sink_writes_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let path = sink
            .deliver(AnalysisKind::Cusum.export_filename(), b"first")
            .unwrap();
        assert_eq!(path, dir.path().join("out").join("cusum.xlsx"));
        sink.deliver("cusum.xlsx", b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn directory_sink_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let sink = DirectorySink::new(&blocker);
        let err = sink.deliver("correlation.xlsx", b"x").unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
    }

    #[test]
    fn no_data_is_described() {
        let lines = describe_chart(&Chart::Cusum(ChartView::NoData));
        assert_eq!(lines, vec!["no data"]);
    }

    #[test]
    fn heatmap_shows_missing_cells() {
        let map = Heatmap {
            row_labels: vec!["A".into(), "B".into()],
            column_labels: vec!["A".into(), "B".into()],
            cells: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
        };
        let lines = describe_chart(&Chart::Correlation(ChartView::Ready(map)));
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("1.000"));
        assert!(lines[1].contains('-'));
    }

    #[test]
    fn line_chart_names_axes() {
        let chart = LineChart {
            date_label: "Date".into(),
            dates: vec!["2023-01-01".into(), "2023-01-02".into()],
            series: vec![
                Series {
                    name: "A".into(),
                    values: vec![Some(1.0), Some(3.0)],
                    axis: Axis::Primary,
                },
                Series {
                    name: "B".into(),
                    values: vec![Some(-2.0), None],
                    axis: Axis::Secondary,
                },
            ],
        };
        let lines = describe_chart(&Chart::Cusum(ChartView::Ready(chart)));
        assert_eq!(lines[0], "2 points, 2023-01-01 to 2023-01-02");
        assert!(lines[1].starts_with("A (left axis)"));
        assert!(lines[2].contains("last -2.000"));
    }

    #[test]
    fn control_chart_lists_limits() {
        let chart = ControlChart {
            title: "A control chart (95% confidence)".into(),
            column: "A".into(),
            confidence: 95.0,
            date_label: Some("Date".into()),
            traces: vec![
                ControlSeries {
                    name: "Period 1".into(),
                    role: TraceRole::Observed,
                    color: None,
                    show_legend: true,
                    points: vec![("2023-01-01".into(), Some(3.0))],
                },
                ControlSeries {
                    name: "UCL".into(),
                    role: TraceRole::Limit,
                    color: Some("#888888".into()),
                    show_legend: false,
                    points: vec![("2023-01-01".into(), Some(4.96))],
                },
            ],
        };
        let lines = describe_chart(&Chart::ControlChart(ChartView::Ready(chart)));
        assert_eq!(lines[0], "A control chart (95% confidence)");
        assert_eq!(lines[1], "Period 1: 1 points");
        assert_eq!(lines[2], "  UCL 4.960");
    }
}
