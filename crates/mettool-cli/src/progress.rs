//! Spinner shown while a batch request is in flight.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK: Duration = Duration::from_millis(120);

/// A spinner on stderr, hidden in quiet mode or when stderr is not a terminal.
pub struct RequestSpinner {
    bar: ProgressBar,
}

impl RequestSpinner {
    #[must_use]
    pub fn start(message: &str, quiet: bool) -> Self {
        if quiet || !console::Term::stderr().is_term() {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(TICK);
        Self { bar }
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.bar.is_hidden()
    }

    pub fn finish(self) {
        self.bar.finish_and_clear();
    }
}
