//! Controller collaborators that post to the TUI channel.

use std::sync::Arc;

use crossbeam_channel::Sender;

use mettool_orchestration::{Chart, ChartRenderer, ExportSink, Notification, Notifier, Surfaces};

use crate::messages::TuiMessage;

/// Forwards notifications to the TUI.
pub struct TuiNotifier {
    tx: Sender<TuiMessage>,
}

impl TuiNotifier {
    #[must_use]
    pub fn new(tx: Sender<TuiMessage>) -> Self {
        Self { tx }
    }
}

impl Notifier for TuiNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.try_send(TuiMessage::Notify(notification));
    }
}

/// Forwards adapted charts to the TUI.
pub struct TuiChartRenderer {
    tx: Sender<TuiMessage>,
}

impl TuiChartRenderer {
    #[must_use]
    pub fn new(tx: Sender<TuiMessage>) -> Self {
        Self { tx }
    }
}

impl ChartRenderer for TuiChartRenderer {
    fn render(&self, chart: Chart) {
        let _ = self.tx.try_send(TuiMessage::Chart(chart));
    }

    fn clear_charts(&self) {
        let _ = self.tx.try_send(TuiMessage::ChartsReset);
    }
}

/// Controller surfaces wired to `tx`, exporting through `sink`.
pub fn surfaces(tx: &Sender<TuiMessage>, sink: Arc<dyn ExportSink>) -> Surfaces {
    Surfaces {
        notifier: Arc::new(TuiNotifier::new(tx.clone())),
        renderer: Arc::new(TuiChartRenderer::new(tx.clone())),
        sink,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use mettool_core::ChartView;

    #[test]
    fn notifier_and_renderer_post_messages() {
        let (tx, rx) = unbounded();
        TuiNotifier::new(tx.clone()).notify(Notification::success("Data loaded"));
        let renderer = TuiChartRenderer::new(tx);
        renderer.render(Chart::Correlation(ChartView::NoData));
        renderer.clear_charts();

        assert!(matches!(rx.try_recv(), Ok(TuiMessage::Notify(n)) if n.message == "Data loaded"));
        assert!(matches!(rx.try_recv(), Ok(TuiMessage::Chart(_))));
        assert!(matches!(rx.try_recv(), Ok(TuiMessage::ChartsReset)));
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = unbounded();
        drop(rx);
        TuiNotifier::new(tx).notify(Notification::error("late"));
    }
}
