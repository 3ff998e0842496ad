//! Application entry point and dispatch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use mettool_cli::output::format_duration;
use mettool_cli::{ui, ConsoleNotifier, DirectorySink, RequestSpinner, SummaryRenderer};
use mettool_core::{AnalysisKind, RequestKind};
use mettool_engine::{FilterOptions, NativeEngine};
use mettool_orchestration::{request_label, ControllerError, DashboardController, Surfaces};
use mettool_tui::{TuiApp, TuiMessage};

use crate::config::{AppConfig, ConfigError};

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    // Handle shell completion
    if let Some(shell) = config.completion {
        let mut cmd = <AppConfig as clap::CommandFactory>::command();
        mettool_cli::completion::generate_completion(&mut cmd, shell, &mut std::io::stdout());
        return Ok(());
    }

    if config.tui {
        return run_tui(config);
    }

    run_batch(config)
}

fn export_dir(config: &AppConfig) -> PathBuf {
    config
        .export_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."))
}

fn engine_factory() -> mettool_core::engine::RuntimeFactory {
    NativeEngine::factory(FilterOptions::default())
}

/// Wait for in-flight requests behind a spinner; the first failure wins.
fn settle(
    controller: &mut DashboardController,
    message: &str,
    quiet: bool,
) -> Result<(), ControllerError> {
    let spinner = RequestSpinner::start(message, quiet);
    let done = controller.settle();
    spinner.finish();
    for completion in done {
        completion.result?;
    }
    Ok(())
}

/// Push every selection given on the command line into the controller.
/// Column choices are only accepted once a dataset is loaded.
fn apply_selections(
    controller: &mut DashboardController,
    config: &AppConfig,
) -> Result<(), ControllerError> {
    controller.set_range(
        config.start.as_deref().unwrap_or_default(),
        config.end.as_deref().unwrap_or_default(),
    );
    controller.set_confidence(&config.confidence);
    controller.set_show_limits(!config.no_limits);
    controller.set_show_average(!config.no_average);
    for (start, end) in &config.periods {
        controller.add_period(start, end)?;
    }
    if !controller.dataset().is_loaded() {
        return Ok(());
    }
    if let Some(date) = &config.date_column {
        controller.set_date_column(date)?;
    }

    let columns = if config.columns.is_empty() {
        controller.value_choices()
    } else {
        config.columns.clone()
    };
    // CUSUM takes at most two columns; without an explicit list use the first two.
    let cusum = if config.columns.is_empty() {
        columns.iter().take(2).cloned().collect()
    } else {
        columns.clone()
    };
    controller.set_columns(AnalysisKind::Correlation, columns.clone())?;
    controller.set_columns(AnalysisKind::Cusum, cusum)?;
    if let Some(first) = columns.into_iter().next() {
        controller.set_columns(AnalysisKind::ControlChart, vec![first])?;
    }
    Ok(())
}

fn run_batch(config: &AppConfig) -> Result<()> {
    let file = config.file.clone().ok_or(ConfigError::MissingFile)?;
    let surfaces = Surfaces {
        notifier: Arc::new(ConsoleNotifier::new(config.quiet)),
        renderer: Arc::new(SummaryRenderer::new(config.quiet)),
        sink: Arc::new(DirectorySink::new(export_dir(config))),
    };
    let mut controller =
        DashboardController::spawn(engine_factory(), surfaces, config.controller_config()?);
    let outcome = drive_batch(&mut controller, config, file);
    controller.shutdown();
    outcome.map_err(Into::into)
}

fn drive_batch(
    controller: &mut DashboardController,
    config: &AppConfig,
    file: PathBuf,
) -> Result<(), ControllerError> {
    let quiet = config.quiet;
    controller.select_file(file)?;
    settle(controller, "Reading workbook", quiet)?;
    if let Some(sheet) = &config.sheet {
        controller.select_sheet(sheet)?;
    }
    controller.load()?;
    settle(controller, "Loading sheet", quiet)?;
    apply_selections(controller, config)?;

    let analyses = config.analyses();
    let explicit = analyses.len() == 1;
    let mut first_error = None;
    for kind in analyses {
        if kind == AnalysisKind::ControlChart && !explicit && controller.periods().is_empty() {
            if !quiet {
                ui::print_detail("Control chart skipped: no --period given");
            }
            continue;
        }
        let started = Instant::now();
        let outcome = controller
            .run(kind)
            .and_then(|()| settle(controller, request_label(RequestKind::Analysis(kind)), quiet));
        match outcome {
            Ok(()) => {
                if !quiet {
                    ui::print_detail(&format!("computed in {}", format_duration(started.elapsed())));
                }
                if config.export_dir.is_some() {
                    if let Err(e) = controller.export(kind) {
                        first_error.get_or_insert(e);
                    }
                }
            }
            Err(e) => {
                info!(?kind, error = %e, "analysis failed");
                first_error.get_or_insert(e);
            }
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn run_tui(config: &AppConfig) -> Result<()> {
    let (tx, rx) = crossbeam_channel::unbounded::<TuiMessage>();
    let sink = Arc::new(DirectorySink::new(export_dir(config)));
    let surfaces = mettool_tui::surfaces(&tx, sink);
    let mut controller =
        DashboardController::spawn(engine_factory(), surfaces, config.controller_config()?);

    // Failures here are already queued as toasts; the dashboard opens anyway.
    let _ = preload(&mut controller, config);

    let mut app = TuiApp::new(controller, rx);
    app.run()?;
    Ok(())
}

/// Open the configured workbook before the terminal is taken over.
fn preload(controller: &mut DashboardController, config: &AppConfig) -> Result<(), ControllerError> {
    if let Some(file) = &config.file {
        controller.select_file(file.clone())?;
        controller.settle();
        if let Some(sheet) = &config.sheet {
            controller.select_sheet(sheet)?;
            controller.load()?;
            controller.settle();
        }
    }
    apply_selections(controller, config)
}
