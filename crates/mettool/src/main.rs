//! mettool: statistical process control dashboard for spreadsheets.

use std::io::IsTerminal;

use mettool_lib::{app, config, errors, version};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &config::AppConfig) {
    // The TUI owns the terminal; logging there would tear the screen.
    if config.tui && std::io::stderr().is_terminal() {
        return;
    }
    let level = if config.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn main() {
    let config = config::AppConfig::parse();
    init_tracing(&config);
    tracing::debug!(version = %version::full_version(), "starting");

    if let Err(err) = app::run(&config) {
        if !errors::already_reported(&err) {
            mettool_cli::ui::print_error(&format!("{err:#}"));
        }
        std::process::exit(errors::exit_code(&err));
    }
}
