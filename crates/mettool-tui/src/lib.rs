//! # mettool-tui
//!
//! Interactive terminal dashboard (Elm architecture over ratatui). The
//! dashboard controller reports through bridge collaborators that post
//! [`TuiMessage`]s; the model drains them on every tick.

pub mod bridge;
pub mod chart;
pub mod command;
pub mod footer;
pub mod header;
pub mod heatmap;
pub mod keymap;
pub mod logs;
pub mod messages;
pub mod model;
pub mod styles;
pub mod toasts;

pub use bridge::{surfaces, TuiChartRenderer, TuiNotifier};
pub use logs::LogScrollState;
pub use messages::TuiMessage;
pub use model::TuiApp;
