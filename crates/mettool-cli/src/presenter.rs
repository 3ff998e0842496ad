//! Console implementations of the controller's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};

use mettool_orchestration::{Chart, ChartRenderer, Notification, Notifier, Severity};

use crate::output::describe_chart;
use crate::ui;

/// Prints notifications; errors always go to stderr, successes are
/// suppressed in quiet mode.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Error => ui::print_error(&notification.message),
            Severity::Success if !self.quiet => ui::print_success(&notification.message),
            Severity::Success => {}
        }
    }
}

/// Prints a text summary of each chart as it arrives.
#[derive(Debug, Default)]
pub struct SummaryRenderer {
    quiet: bool,
    rendered: AtomicUsize,
}

impl SummaryRenderer {
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            rendered: AtomicUsize::new(0),
        }
    }

    /// Number of charts rendered since the last clear.
    #[must_use]
    pub fn rendered(&self) -> usize {
        self.rendered.load(Ordering::Relaxed)
    }
}

impl ChartRenderer for SummaryRenderer {
    fn render(&self, chart: Chart) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
        if self.quiet {
            return;
        }
        ui::print_header(chart.kind().label());
        for line in describe_chart(&chart) {
            ui::print_detail(&line);
        }
    }

    fn clear_charts(&self) {
        self.rendered.store(0, Ordering::Relaxed);
    }
}
