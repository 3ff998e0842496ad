//! Collaborator interfaces of the dashboard controller.

use std::fmt;
use std::path::PathBuf;

use parking_lot::Mutex;

use mettool_core::adapters::{ChartView, ControlChart, Heatmap, LineChart};
use mettool_core::{AnalysisKind, ExportError};

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Surfaces notifications to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Adapted chart for one analysis kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Correlation(ChartView<Heatmap>),
    Cusum(ChartView<LineChart>),
    ControlChart(ChartView<ControlChart>),
}

impl Chart {
    #[must_use]
    pub fn kind(&self) -> AnalysisKind {
        match self {
            Self::Correlation(_) => AnalysisKind::Correlation,
            Self::Cusum(_) => AnalysisKind::Cusum,
            Self::ControlChart(_) => AnalysisKind::ControlChart,
        }
    }

    #[must_use]
    pub fn is_no_data(&self) -> bool {
        match self {
            Self::Correlation(v) => v.is_no_data(),
            Self::Cusum(v) => v.is_no_data(),
            Self::ControlChart(v) => v.is_no_data(),
        }
    }
}

/// Draws adapted charts.
pub trait ChartRenderer: Send + Sync {
    /// Replace the chart of `chart.kind()`.
    fn render(&self, chart: Chart);

    /// Remove every rendered chart.
    fn clear_charts(&self);
}

/// Delivers an export artifact to the user.
pub trait ExportSink: Send + Sync {
    /// Save `bytes` under `filename`; returns where the artifact went.
    fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Notifier that records everything it is given.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications so far, oldest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }

    /// Messages of the error notifications so far.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.seen
            .lock()
            .iter()
            .filter(|n| n.is_error())
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

/// Renderer that keeps the latest chart per kind.
#[derive(Debug, Default)]
pub struct ChartBoard {
    charts: Mutex<[Option<Chart>; 3]>,
}

impl ChartBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, kind: AnalysisKind) -> Option<Chart> {
        self.charts.lock()[kind.index()].clone()
    }
}

impl ChartRenderer for ChartBoard {
    fn render(&self, chart: Chart) {
        let idx = chart.kind().index();
        self.charts.lock()[idx] = Some(chart);
    }

    fn clear_charts(&self) {
        *self.charts.lock() = Default::default();
    }
}
