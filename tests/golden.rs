//! Golden file integration tests.
//!
//! Reads tests/testdata/stats_golden.json and checks the statistics both
//! directly and through the native engine on a generated workbook.

use serde::Deserialize;

use mettool_core::adapters::{
    control_chart_view, correlation_view, cusum_view, ChartView, TraceRole,
};
use mettool_core::protocol::{ControlChartParams, CorrelationParams, CusumParams};
use mettool_core::{EngineRuntime, PeriodStore};
use mettool_engine::{stats, FilterOptions, NativeEngine};
use mettool_tests::fixtures::{encode, SheetBuilder};

const TOLERANCE: f64 = 1e-9;
// Student t quantiles come from an iterative inverse CDF.
const LIMIT_TOLERANCE: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Golden data structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GoldenData {
    #[allow(dead_code)]
    description: String,
    pearson: Vec<PearsonCase>,
    cusum: Vec<CusumCase>,
    control_limits: Vec<LimitCase>,
}

#[derive(Deserialize)]
struct PearsonCase {
    name: String,
    a: Vec<Option<f64>>,
    b: Vec<Option<f64>>,
    r: Option<f64>,
}

#[derive(Deserialize)]
struct CusumCase {
    name: String,
    values: Vec<Option<f64>>,
    expected: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct LimitCase {
    name: String,
    values: Vec<Option<f64>>,
    confidence: f64,
    upper: Option<f64>,
    lower: Option<f64>,
}

fn load_golden_data() -> GoldenData {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/testdata/stats_golden.json");
    let data = std::fs::read_to_string(path).expect("failed to read golden file");
    serde_json::from_str(&data).expect("failed to parse golden JSON")
}

fn assert_close(name: &str, got: Option<f64>, want: Option<f64>, tolerance: f64) {
    match (got, want) {
        (Some(g), Some(w)) => assert!(
            (g - w).abs() < tolerance,
            "{name}: got {g}, want {w}"
        ),
        (None, None) => {}
        _ => panic!("{name}: got {got:?}, want {want:?}"),
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[test]
fn golden_pearson() {
    for case in load_golden_data().pearson {
        let got = stats::pearson(&case.a, &case.b);
        assert_close(&case.name, got, case.r, TOLERANCE);
        let swapped = stats::pearson(&case.b, &case.a);
        assert_close(&case.name, swapped, case.r, TOLERANCE);
    }
}

#[test]
fn golden_cusum() {
    for case in load_golden_data().cusum {
        let got = stats::cusum(&case.values);
        assert_eq!(got.len(), case.expected.len(), "{}", case.name);
        for (g, w) in got.into_iter().zip(case.expected) {
            assert_close(&case.name, g, w, TOLERANCE);
        }
    }
}

#[test]
fn golden_control_limits() {
    for case in load_golden_data().control_limits {
        let limits = stats::control_limits(&case.values, case.confidence).unwrap();
        assert_close(&case.name, limits.map(|l| l.0), case.upper, LIMIT_TOLERANCE);
        assert_close(&case.name, limits.map(|l| l.1), case.lower, LIMIT_TOLERANCE);
    }
}

// ---------------------------------------------------------------------------
// Through the engine
// ---------------------------------------------------------------------------

/// The first Pearson and limit cases as a dated sheet, rows out of order.
fn golden_engine() -> NativeEngine {
    let data = load_golden_data();
    let pearson = &data.pearson[0];
    let limits = &data.control_limits[0];
    let mut sheet = SheetBuilder::new("Golden", &["Date", "A", "B", "C"]);
    for i in [3usize, 0, 4, 1, 2] {
        let date = format!("2023-01-{:02}", i + 1);
        sheet = sheet.dated(&date, &[pearson.a[i], pearson.b[i], limits.values[i]]);
    }
    let bytes = encode(&[sheet]).unwrap();
    let mut engine = NativeEngine::initialize(FilterOptions::default()).unwrap();
    let columns = engine.load_sheet(bytes, "Golden").unwrap();
    assert_eq!(columns, vec!["Date", "A", "B", "C"]);
    engine
}

#[test]
fn golden_engine_correlation() {
    let want = load_golden_data().pearson[0].r;
    let mut engine = golden_engine();
    let output = engine
        .correlation(&CorrelationParams {
            date_column: "Date".into(),
            value_columns: vec!["A".into(), "B".into()],
            start: "2023-01-01".into(),
            end: "2023-01-31".into(),
        })
        .unwrap();
    let ChartView::Ready(map) = correlation_view(&output.chart_json).unwrap() else {
        panic!("expected a heatmap");
    };
    assert_eq!(map.column_labels, vec!["A", "B"]);
    assert_close("A/B", map.get(0, 1), want, TOLERANCE);
    assert_close("B/A", map.get(1, 0), want, TOLERANCE);
    assert_close("A/A", map.get(0, 0), Some(1.0), TOLERANCE);
    assert!(!output.export.as_bytes().is_empty());
}

#[test]
fn golden_engine_cusum_is_date_ordered() {
    let mut engine = golden_engine();
    let output = engine
        .cusum(&CusumParams {
            date_column: "Date".into(),
            value_columns: vec!["C".into()],
            start: "01/01/2023".into(),
            end: "05/01/2023".into(),
        })
        .unwrap();
    let ChartView::Ready(chart) = cusum_view(&output.chart_json).unwrap() else {
        panic!("expected a line chart");
    };
    assert_eq!(chart.dates.first().map(String::as_str), Some("2023-01-01"));
    assert_eq!(chart.dates.len(), 5);
    // C is 10, 12, 11, 13, 9 by date with mean 11.
    let want = [-1.0, 0.0, 0.0, 2.0, 0.0];
    for (got, want) in chart.series[0].values.iter().zip(want) {
        assert_close("CUSUM C", *got, Some(want), TOLERANCE);
    }
}

#[test]
fn golden_engine_control_limits() {
    let data = load_golden_data();
    let case = &data.control_limits[0];
    let mut periods = PeriodStore::default();
    periods.add("2023-01-01", "2023-01-05").unwrap();
    let mut engine = golden_engine();
    let output = engine
        .control_chart(&ControlChartParams {
            date_column: "Date".into(),
            value_column: "C".into(),
            confidence: case.confidence,
            periods: periods.to_wire(),
            show_limits: true,
            show_average: true,
        })
        .unwrap();
    let ChartView::Ready(chart) = control_chart_view(&output.chart_json, "C", case.confidence)
        .unwrap()
    else {
        panic!("expected a control chart");
    };
    let limit = |prefix: &str| {
        chart
            .traces
            .iter()
            .find(|t| t.role == TraceRole::Limit && t.name.starts_with(prefix))
            .and_then(|t| t.points.first())
            .and_then(|(_, v)| *v)
    };
    assert_close("UCL", limit("UCL"), case.upper, LIMIT_TOLERANCE);
    assert_close("LCL", limit("LCL"), case.lower, LIMIT_TOLERANCE);
}
