//! TUI message types (Elm Messages).

use mettool_orchestration::{Chart, Notification};

/// Messages that drive the TUI update cycle.
#[derive(Debug, Clone)]
pub enum TuiMessage {
    /// A controller notification, shown as a toast and logged.
    Notify(Notification),
    /// A chart to show on its tab.
    Chart(Chart),
    /// Every chart was removed.
    ChartsReset,
    /// Line for the activity log.
    Log(String),
    Tick,
    Resize { width: u16, height: u16 },
    KeyPress(crate::keymap::KeyAction),
    Quit,
}
