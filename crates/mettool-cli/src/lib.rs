//! # mettool-cli
//!
//! Console front-end pieces: notification and chart presenters, the
//! directory export sink, the request spinner and shell completion.

pub mod completion;
pub mod output;
pub mod presenter;
pub mod progress;
pub mod ui;

pub use output::DirectorySink;
pub use presenter::{ConsoleNotifier, SummaryRenderer};
pub use progress::RequestSpinner;
