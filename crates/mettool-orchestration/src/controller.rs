//! Dashboard controller.
//!
//! Owns the session state and the per-request-kind state machine
//! (`Idle -> Requested -> Idle`). User actions validate locally and dispatch
//! through the engine proxy; replies come back as events on a channel and
//! are applied by [`DashboardController::pump`] or
//! [`DashboardController::settle`] on the caller's thread.
//!
//! Every dispatch carries a ticket. A reply is applied only if its ticket is
//! still the one in flight for its kind, so replies that outlive a clear or a
//! timeout are dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use mettool_core::adapters::{
    control_chart_view, correlation_view, cusum_view, format_confidence, AdapterError,
};
use mettool_core::engine::RuntimeFactory;
use mettool_core::{
    AnalysisKind, ColumnSchema, EngineError, ExportError, Period, PeriodNotFound, Request,
    RequestKind, Response, ValidationError,
};

use crate::interfaces::{Chart, ChartRenderer, ExportSink, Notification, Notifier};
use crate::proxy::{EngineProxy, EngineStatus, Readiness};
use crate::session::{Selections, Session};
use crate::validation;

/// Anything that can end a user action or a request.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    PeriodNotFound(#[from] PeriodNotFound),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{what} timed out after {}", elapsed(.after))]
    Timeout { what: &'static str, after: Duration },
}

fn elapsed(d: &Duration) -> String {
    if d.as_secs() == 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Name of a request kind in messages.
#[must_use]
pub fn request_label(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::ListSheets => "Sheet listing",
        RequestKind::LoadSheet => "Load",
        RequestKind::Clear => "Clear",
        RequestKind::Analysis(kind) => kind.label(),
    }
}

/// Controller options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Empty the period list whenever a new dataset is loaded.
    pub reset_periods_on_load: bool,
}

/// The collaborators the controller talks to.
#[derive(Clone)]
pub struct Surfaces {
    pub notifier: Arc<dyn Notifier>,
    pub renderer: Arc<dyn ChartRenderer>,
    pub sink: Arc<dyn ExportSink>,
}

/// Global dataset lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetState {
    Empty,
    SheetsListed {
        sheets: Vec<String>,
    },
    Loaded {
        sheets: Vec<String>,
        schema: ColumnSchema,
    },
}

impl DatasetState {
    #[must_use]
    pub fn sheets(&self) -> &[String] {
        match self {
            Self::Empty => &[],
            Self::SheetsListed { sheets } | Self::Loaded { sheets, .. } => sheets,
        }
    }

    #[must_use]
    pub fn schema(&self) -> Option<&ColumnSchema> {
        match self {
            Self::Loaded { schema, .. } => Some(schema),
            Self::Empty | Self::SheetsListed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// State of one request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Requested { ticket: u64, since: Instant },
}

/// How a dispatched request ended.
#[derive(Debug)]
pub struct Completion {
    pub kind: RequestKind,
    pub result: Result<(), ControllerError>,
}

enum ControllerEvent {
    Reply {
        ticket: u64,
        kind: RequestKind,
        outcome: Result<Response, EngineError>,
    },
    Status(EngineStatus),
}

/// Labels a control chart with what was requested.
struct ControlContext {
    column: String,
    confidence: f64,
}

pub struct DashboardController {
    proxy: EngineProxy,
    events_tx: Sender<ControllerEvent>,
    events: Receiver<ControllerEvent>,
    surfaces: Surfaces,
    config: ControllerConfig,
    session: Session,
    dataset: DatasetState,
    requests: HashMap<RequestKind, RequestState>,
    next_ticket: u64,
    control_context: Option<ControlContext>,
    /// File whose sheet listing is in flight; becomes the selection on success.
    listing: Option<(u64, PathBuf)>,
    engine_failed: bool,
}

impl DashboardController {
    /// Start the engine worker with `factory` and build a controller on it.
    pub fn spawn(factory: RuntimeFactory, surfaces: Surfaces, config: ControllerConfig) -> Self {
        let (events_tx, events) = unbounded();
        let status_tx = events_tx.clone();
        let proxy = EngineProxy::spawn_with_status(factory, move |status| {
            let _ = status_tx.send(ControllerEvent::Status(status));
        });
        Self {
            proxy,
            events_tx,
            events,
            surfaces,
            config,
            session: Session::new(),
            dataset: DatasetState::Empty,
            requests: HashMap::new(),
            next_ticket: 0,
            control_context: None,
            listing: None,
            engine_failed: false,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn selections(&self) -> &Selections {
        &self.session.selections
    }

    #[must_use]
    pub fn periods(&self) -> &[Period] {
        self.session.periods.list()
    }

    #[must_use]
    pub fn dataset(&self) -> &DatasetState {
        &self.dataset
    }

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.proxy.readiness()
    }

    #[must_use]
    pub fn config(&self) -> ControllerConfig {
        self.config
    }

    #[must_use]
    pub fn request_state(&self, kind: RequestKind) -> RequestState {
        self.requests
            .get(&kind)
            .copied()
            .unwrap_or(RequestState::Idle)
    }

    #[must_use]
    pub fn is_busy(&self, kind: RequestKind) -> bool {
        matches!(self.request_state(kind), RequestState::Requested { .. })
    }

    /// Whether the action for `kind` may be triggered.
    #[must_use]
    pub fn is_enabled(&self, kind: AnalysisKind) -> bool {
        self.dataset.is_loaded() && !self.is_busy(RequestKind::Analysis(kind))
    }

    #[must_use]
    pub fn has_export(&self, kind: AnalysisKind) -> bool {
        self.session.exports.has(kind)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.requests
            .values()
            .any(|s| matches!(s, RequestState::Requested { .. }))
    }

    /// Choices offered by the date selector: every column.
    #[must_use]
    pub fn date_choices(&self) -> Vec<String> {
        self.dataset
            .schema()
            .map(|s| s.all().to_vec())
            .unwrap_or_default()
    }

    /// Choices offered by every value selector: all but the date column.
    #[must_use]
    pub fn value_choices(&self) -> Vec<String> {
        self.dataset
            .schema()
            .map(|s| s.value_columns().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    // --- Notifications ---

    fn notify_success(&self, message: impl Into<String>) {
        self.surfaces.notifier.notify(Notification::success(message));
    }

    /// Surface `err` and hand it back for the caller to return.
    fn fail(&self, err: impl Into<ControllerError>) -> ControllerError {
        let err = err.into();
        self.surfaces
            .notifier
            .notify(Notification::error(err.to_string()));
        err
    }

    /// Surface a request failure; engine unavailability is reported once.
    fn report(&mut self, err: &ControllerError) {
        if let ControllerError::Engine(EngineError::Unavailable(_)) = err {
            if self.engine_failed {
                return;
            }
            self.engine_failed = true;
        }
        self.surfaces
            .notifier
            .notify(Notification::error(err.to_string()));
    }

    // --- Dispatch ---

    fn ensure_idle(&self, kind: RequestKind) -> Result<(), ControllerError> {
        if self.is_busy(kind) {
            return Err(self.fail(ValidationError::Busy(request_label(kind))));
        }
        Ok(())
    }

    fn dispatch(&mut self, request: Request) -> u64 {
        let kind = request.kind();
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.requests.insert(
            kind,
            RequestState::Requested {
                ticket,
                since: Instant::now(),
            },
        );
        debug!(?kind, ticket, "dispatching");
        let tx = self.events_tx.clone();
        self.proxy.submit(request, move |outcome| {
            let _ = tx.send(ControllerEvent::Reply {
                ticket,
                kind,
                outcome,
            });
        });
        ticket
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, ControllerError> {
        std::fs::read(path).map_err(|source| {
            self.fail(ControllerError::Io {
                path: path.to_path_buf(),
                source,
            })
        })
    }

    // --- Actions ---

    /// Read `path` and ask the engine for its sheet names. The selection
    /// switches to `path` only once the listing succeeds.
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> Result<(), ControllerError> {
        let path = path.into();
        self.ensure_idle(RequestKind::ListSheets)?;
        let bytes = self.read_file(&path)?;
        info!(path = %path.display(), bytes = bytes.len(), "file selected");
        let ticket = self.dispatch(Request::ListSheets { workbook: bytes });
        self.listing = Some((ticket, path));
        Ok(())
    }

    pub fn select_sheet(&mut self, sheet: &str) -> Result<(), ControllerError> {
        if !self.dataset.sheets().iter().any(|s| s == sheet) {
            return Err(self.fail(ValidationError::UnknownSheet(sheet.to_string())));
        }
        self.session.selections.sheet = Some(sheet.to_string());
        Ok(())
    }

    /// Load the selected sheet of the selected file.
    pub fn load(&mut self) -> Result<(), ControllerError> {
        self.ensure_idle(RequestKind::LoadSheet)?;
        let Some(path) = self.session.selections.file.clone() else {
            return Err(self.fail(ValidationError::NoFile));
        };
        let Some(sheet) = self.session.selections.sheet.clone() else {
            return Err(self.fail(ValidationError::NoSheet));
        };
        if !self.dataset.sheets().contains(&sheet) {
            return Err(self.fail(ValidationError::UnknownSheet(sheet)));
        }
        let bytes = self.read_file(&path)?;
        self.dispatch(Request::LoadSheet {
            workbook: bytes,
            sheet,
        });
        Ok(())
    }

    fn require_schema(&self) -> Result<&ColumnSchema, ControllerError> {
        self.dataset
            .schema()
            .ok_or_else(|| self.fail(ValidationError::NotLoaded))
    }

    pub fn set_date_column(&mut self, column: &str) -> Result<(), ControllerError> {
        if !self.require_schema()?.contains(column) {
            return Err(self.fail(ValidationError::UnknownColumn(column.to_string())));
        }
        self.session.selections.date_column = Some(column.to_string());
        Ok(())
    }

    /// Set the value columns of one analysis. The control chart takes exactly one.
    pub fn set_columns(
        &mut self,
        kind: AnalysisKind,
        columns: Vec<String>,
    ) -> Result<(), ControllerError> {
        let schema = self.require_schema()?;
        if let Some(bad) = columns.iter().find(|c| !schema.is_value_column(c)) {
            return Err(self.fail(ValidationError::UnknownColumn(bad.clone())));
        }
        if kind == AnalysisKind::ControlChart && columns.len() != 1 {
            return Err(self.fail(ValidationError::NoControlColumn));
        }
        let sel = &mut self.session.selections;
        match kind {
            AnalysisKind::Correlation => sel.correlation_columns = columns,
            AnalysisKind::Cusum => sel.cusum_columns = columns,
            AnalysisKind::ControlChart => sel.control_column = columns.into_iter().next(),
        }
        Ok(())
    }

    pub fn set_range(&mut self, start: &str, end: &str) {
        self.session.selections.start = start.trim().to_string();
        self.session.selections.end = end.trim().to_string();
    }

    pub fn set_confidence(&mut self, text: &str) {
        self.session.selections.confidence = text.trim().to_string();
    }

    pub fn set_show_limits(&mut self, show: bool) {
        self.session.selections.show_limits = show;
    }

    pub fn set_show_average(&mut self, show: bool) {
        self.session.selections.show_average = show;
    }

    pub fn add_period(&mut self, start: &str, end: &str) -> Result<(), ControllerError> {
        match self.session.periods.add(start, end) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn select_period(&mut self, index: usize) -> Result<(), ControllerError> {
        let len = self.session.periods.len();
        if index >= len {
            return Err(self.fail(PeriodNotFound {
                index: Some(index),
                len,
            }));
        }
        self.session.selections.selected_period = Some(index);
        Ok(())
    }

    /// Remove the selected period; the selection is cleared afterwards.
    pub fn remove_selected_period(&mut self) -> Result<Period, ControllerError> {
        let len = self.session.periods.len();
        let Some(index) = self.session.selections.selected_period else {
            return Err(self.fail(PeriodNotFound { index: None, len }));
        };
        match self.session.periods.remove(index) {
            Ok(period) => {
                self.session.selections.selected_period = None;
                debug!(%period, index, "period removed");
                Ok(period)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn build_request(&self, kind: AnalysisKind) -> Result<Request, ValidationError> {
        let schema = self.dataset.schema().ok_or(ValidationError::NotLoaded)?;
        let sel = &self.session.selections;
        Ok(match kind {
            AnalysisKind::Correlation => {
                Request::Correlation(validation::correlation_params(sel, schema)?)
            }
            AnalysisKind::Cusum => Request::Cusum(validation::cusum_params(sel, schema)?),
            AnalysisKind::ControlChart => Request::ControlChart(
                validation::control_chart_params(sel, schema, &self.session.periods)?,
            ),
        })
    }

    /// Validate and dispatch one analysis.
    pub fn run(&mut self, kind: AnalysisKind) -> Result<(), ControllerError> {
        if !self.dataset.is_loaded() {
            return Err(self.fail(ValidationError::NotLoaded));
        }
        self.ensure_idle(RequestKind::Analysis(kind))?;
        let request = match self.build_request(kind) {
            Ok(request) => request,
            Err(e) => return Err(self.fail(e)),
        };
        if let Request::ControlChart(params) = &request {
            self.control_context = Some(ControlContext {
                column: params.value_column.clone(),
                confidence: params.confidence,
            });
        }
        self.dispatch(request);
        Ok(())
    }

    /// Hand the held buffer of `kind` to the export sink.
    pub fn export(&mut self, kind: AnalysisKind) -> Result<PathBuf, ControllerError> {
        let Some(buffer) = self.session.exports.get(kind) else {
            return Err(self.fail(ExportError::NoData(kind)));
        };
        let filename = kind.export_filename();
        match self.surfaces.sink.deliver(filename, buffer.as_bytes()) {
            Ok(path) => {
                info!(path = %path.display(), bytes = buffer.len(), "exported");
                self.notify_success(format!("Exported {filename}"));
                Ok(path)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Drop the dataset. The engine is told without waiting; local state is
    /// reset immediately and in-flight replies will be discarded. Periods
    /// are kept.
    pub fn clear(&mut self) {
        self.release_engine_dataset();
        for state in self.requests.values_mut() {
            *state = RequestState::Idle;
        }
        self.session.reset_keeping_periods();
        self.control_context = None;
        self.listing = None;
        self.dataset = DatasetState::Empty;
        self.surfaces.renderer.clear_charts();
        info!("session cleared");
        self.notify_success("Data cleared");
    }

    fn release_engine_dataset(&self) {
        self.proxy.submit(Request::Clear, |outcome| match outcome {
            Ok(_) => debug!("engine dataset released"),
            Err(e) => warn!(error = %e, "engine clear failed"),
        });
    }

    /// A load that timed out may still replace the engine's dataset, so the
    /// engine is told to drop it and the controller falls back to the sheet
    /// list. The user loads again to continue.
    fn abandon_load(&mut self) {
        self.release_engine_dataset();
        self.session.exports.clear();
        self.control_context = None;
        self.surfaces.renderer.clear_charts();
        let sheets = self.dataset.sheets().to_vec();
        self.dataset = if sheets.is_empty() {
            DatasetState::Empty
        } else {
            DatasetState::SheetsListed { sheets }
        };
        info!("dataset dropped after load timeout");
    }

    // --- Event processing ---

    /// Apply every event that has already arrived, then check timeouts.
    pub fn pump(&mut self) -> Vec<Completion> {
        let mut done = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            done.extend(self.handle(event));
        }
        done.extend(self.tick(Instant::now()));
        done
    }

    /// Block until nothing is in flight.
    pub fn settle(&mut self) -> Vec<Completion> {
        let mut done = self.pump();
        while self.has_pending() {
            let event = match self.next_deadline() {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match self.events.recv_timeout(wait) {
                        Ok(event) => Some(event),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.events.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };
            if let Some(event) = event {
                done.extend(self.handle(event));
            }
            done.extend(self.tick(Instant::now()));
        }
        done
    }

    fn next_deadline(&self) -> Option<Instant> {
        let timeout = self.config.timeout?;
        self.requests
            .values()
            .filter_map(|s| match s {
                RequestState::Requested { since, .. } => Some(*since + timeout),
                RequestState::Idle => None,
            })
            .min()
    }

    /// Expire requests older than the configured timeout.
    pub fn tick(&mut self, now: Instant) -> Vec<Completion> {
        let Some(timeout) = self.config.timeout else {
            return Vec::new();
        };
        let expired: Vec<RequestKind> = self
            .requests
            .iter()
            .filter_map(|(kind, state)| match state {
                RequestState::Requested { since, .. }
                    if now.saturating_duration_since(*since) >= timeout =>
                {
                    Some(*kind)
                }
                _ => None,
            })
            .collect();
        let mut done = Vec::with_capacity(expired.len());
        for kind in expired {
            self.requests.insert(kind, RequestState::Idle);
            warn!(?kind, ?timeout, "request timed out");
            match kind {
                RequestKind::LoadSheet => self.abandon_load(),
                RequestKind::ListSheets => self.listing = None,
                RequestKind::Clear | RequestKind::Analysis(_) => {}
            }
            let err = ControllerError::Timeout {
                what: request_label(kind),
                after: timeout,
            };
            self.report(&err);
            done.push(Completion {
                kind,
                result: Err(err),
            });
        }
        done
    }

    fn handle(&mut self, event: ControllerEvent) -> Option<Completion> {
        match event {
            ControllerEvent::Status(EngineStatus::Ready) => {
                info!("engine ready");
                None
            }
            ControllerEvent::Status(EngineStatus::Failed(err)) => {
                self.report(&ControllerError::Engine(err));
                None
            }
            ControllerEvent::Reply {
                ticket,
                kind,
                outcome,
            } => self.handle_reply(ticket, kind, outcome),
        }
    }

    fn handle_reply(
        &mut self,
        ticket: u64,
        kind: RequestKind,
        outcome: Result<Response, EngineError>,
    ) -> Option<Completion> {
        match self.request_state(kind) {
            RequestState::Requested { ticket: current, .. } if current == ticket => {}
            _ => {
                warn!(?kind, ticket, "stale reply dropped");
                return None;
            }
        }
        self.requests.insert(kind, RequestState::Idle);
        let listed_file = match kind {
            RequestKind::ListSheets => self
                .listing
                .take()
                .filter(|(listed, _)| *listed == ticket)
                .map(|(_, path)| path),
            _ => None,
        };

        let result = match outcome {
            Ok(resp) if resp.kind() != kind => Err(ControllerError::Engine(EngineError::Mismatch {
                expected: kind,
                got: resp.kind(),
            })),
            Ok(resp) => self.apply(resp, listed_file),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = &result {
            self.report(e);
        }
        Some(Completion { kind, result })
    }

    fn apply(&mut self, response: Response, file: Option<PathBuf>) -> Result<(), ControllerError> {
        match response {
            Response::Sheets(sheets) => {
                self.session.selections.file = file;
                self.session.selections.sheet = sheets.first().cloned();
                debug!(?sheets, "sheets listed");
                self.dataset = DatasetState::SheetsListed { sheets };
                self.notify_success("Sheets loaded");
            }
            Response::Columns(columns) => self.apply_load(columns),
            Response::Cleared => {}
            analysis => {
                if let Some((kind, output)) = analysis.into_analysis() {
                    let chart = self.adapt(kind, &output.chart_json)?;
                    self.session.exports.replace(kind, output.export);
                    self.surfaces.renderer.render(chart);
                    self.notify_success(format!("{} computed", kind.label()));
                }
            }
        }
        Ok(())
    }

    fn apply_load(&mut self, columns: Vec<String>) {
        let schema = ColumnSchema::new(columns);
        let sel = &mut self.session.selections;
        sel.date_column = schema.default_date_column().map(String::from);
        sel.correlation_columns.clear();
        sel.cusum_columns.clear();
        sel.control_column = schema.value_columns().first().map(|c| (*c).to_string());
        self.session.exports.clear();
        self.control_context = None;
        if self.config.reset_periods_on_load {
            self.session.periods.clear();
            self.session.selections.selected_period = None;
        }
        self.surfaces.renderer.clear_charts();
        info!(columns = schema.all().len(), "dataset loaded");
        let sheets = self.dataset.sheets().to_vec();
        self.dataset = DatasetState::Loaded { sheets, schema };
        self.notify_success("Data loaded");
    }

    fn adapt(&mut self, kind: AnalysisKind, json: &str) -> Result<Chart, AdapterError> {
        Ok(match kind {
            AnalysisKind::Correlation => Chart::Correlation(correlation_view(json)?),
            AnalysisKind::Cusum => Chart::Cusum(cusum_view(json)?),
            AnalysisKind::ControlChart => {
                let ctx = self.control_context.take();
                let (column, confidence) = ctx
                    .map(|c| (c.column, c.confidence))
                    .unwrap_or_default();
                debug!(%column, confidence = %format_confidence(confidence), "control chart adapted");
                Chart::ControlChart(control_chart_view(json, &column, confidence)?)
            }
        })
    }

    /// Stop the engine worker after it has drained its queue.
    pub fn shutdown(self) {
        self.proxy.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crossbeam_channel::{unbounded, Receiver};
    use parking_lot::Mutex;

    use mettool_core::protocol::{ControlChartParams, CorrelationParams, CusumParams};
    use mettool_core::{AnalysisOutput, EngineRuntime, WirePeriod};

    use crate::interfaces::{ChartBoard, CollectingNotifier};

    #[derive(Default)]
    struct Log {
        kinds: Mutex<Vec<RequestKind>>,
        control: Mutex<Option<ControlChartParams>>,
    }

    /// Canned engine; `gate` holds correlation requests and `load_gate`
    /// sheet loads until signalled.
    struct Fake {
        log: Arc<Log>,
        gate: Option<Receiver<()>>,
        load_gate: Option<Receiver<()>>,
    }

    impl EngineRuntime for Fake {
        fn list_sheets(&mut self, workbook: Vec<u8>) -> Result<Vec<String>, EngineError> {
            self.log.kinds.lock().push(RequestKind::ListSheets);
            if workbook.starts_with(b"bad") {
                return Err(EngineError::Parse("not a workbook".into()));
            }
            Ok(vec!["Input".into(), "Other".into()])
        }

        fn load_sheet(&mut self, _: Vec<u8>, sheet: &str) -> Result<Vec<String>, EngineError> {
            self.log.kinds.lock().push(RequestKind::LoadSheet);
            if let Some(gate) = &self.load_gate {
                let _ = gate.recv();
            }
            if sheet == "Other" {
                return Err(EngineError::SheetNotFound(sheet.into()));
            }
            Ok(vec!["Date".into(), "A".into(), "B".into()])
        }

        fn clear(&mut self) {
            self.log.kinds.lock().push(RequestKind::Clear);
        }

        fn correlation(&mut self, _: &CorrelationParams) -> Result<AnalysisOutput, EngineError> {
            self.log
                .kinds
                .lock()
                .push(RequestKind::Analysis(AnalysisKind::Correlation));
            if let Some(gate) = &self.gate {
                let _ = gate.recv();
            }
            Ok(AnalysisOutput {
                chart_json: r#"{"z":[[1.0,0.5],[0.5,1.0]],"x":["A","B"],"y":["A","B"]}"#.into(),
                export: vec![1, 2, 3].into(),
            })
        }

        fn cusum(&mut self, _: &CusumParams) -> Result<AnalysisOutput, EngineError> {
            self.log
                .kinds
                .lock()
                .push(RequestKind::Analysis(AnalysisKind::Cusum));
            Err(EngineError::Compute("Start > End".into()))
        }

        fn control_chart(
            &mut self,
            params: &ControlChartParams,
        ) -> Result<AnalysisOutput, EngineError> {
            self.log
                .kinds
                .lock()
                .push(RequestKind::Analysis(AnalysisKind::ControlChart));
            *self.log.control.lock() = Some(params.clone());
            Ok(AnalysisOutput {
                chart_json: "[]".into(),
                export: vec![9].into(),
            })
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ExportSink for MemorySink {
        fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
            self.saved.lock().push((filename.to_string(), bytes.to_vec()));
            Ok(PathBuf::from(filename))
        }
    }

    struct Harness {
        controller: DashboardController,
        notifier: Arc<CollectingNotifier>,
        board: Arc<ChartBoard>,
        sink: Arc<MemorySink>,
        log: Arc<Log>,
        file: tempfile::NamedTempFile,
    }

    fn harness_with(config: ControllerConfig, gate: Option<Receiver<()>>) -> Harness {
        harness_gated(config, gate, None)
    }

    fn harness_gated(
        config: ControllerConfig,
        gate: Option<Receiver<()>>,
        load_gate: Option<Receiver<()>>,
    ) -> Harness {
        let log = Arc::new(Log::default());
        let engine_log = Arc::clone(&log);
        let factory: RuntimeFactory = Box::new(move || {
            Ok(Box::new(Fake {
                log: engine_log,
                gate,
                load_gate,
            }) as Box<dyn EngineRuntime>)
        });
        let notifier = Arc::new(CollectingNotifier::new());
        let board = Arc::new(ChartBoard::new());
        let sink = Arc::new(MemorySink::default());
        let surfaces = Surfaces {
            notifier: notifier.clone(),
            renderer: board.clone(),
            sink: sink.clone(),
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"workbook").unwrap();
        Harness {
            controller: DashboardController::spawn(factory, surfaces, config),
            notifier,
            board,
            sink,
            log,
            file,
        }
    }

    fn harness() -> Harness {
        harness_with(ControllerConfig::default(), None)
    }

    fn loaded(h: &mut Harness) {
        h.controller.select_file(h.file.path()).unwrap();
        h.controller.settle();
        h.controller.load().unwrap();
        let done = h.controller.settle();
        assert!(done.iter().all(|c| c.result.is_ok()));
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn file_selection_lists_sheets() {
        let mut h = harness();
        h.controller.select_file(h.file.path()).unwrap();
        assert!(h.controller.is_busy(RequestKind::ListSheets));
        let done = h.controller.settle();
        assert_eq!(done.len(), 1);
        assert_eq!(h.controller.dataset().sheets(), &["Input", "Other"]);
        assert_eq!(h.controller.selections().sheet.as_deref(), Some("Input"));
        assert!(!h.controller.is_enabled(AnalysisKind::Correlation));
    }

    #[test]
    fn unreadable_workbook_leaves_state_empty() {
        let mut h = harness();
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(b"bad bytes").unwrap();
        h.controller.select_file(bad.path()).unwrap();
        let done = h.controller.settle();
        assert!(matches!(
            done[0].result,
            Err(ControllerError::Engine(EngineError::Parse(_)))
        ));
        assert_eq!(*h.controller.dataset(), DatasetState::Empty);
        assert!(h.controller.selections().file.is_none());
        assert_eq!(h.notifier.errors().len(), 1);
    }

    #[test]
    fn failed_listing_keeps_the_previous_file() {
        let mut h = harness();
        loaded(&mut h);
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        bad.write_all(b"bad bytes").unwrap();
        h.controller.select_file(bad.path()).unwrap();
        assert!(h.controller.settle()[0].result.is_err());
        assert_eq!(h.controller.selections().file.as_deref(), Some(h.file.path()));
        assert_eq!(h.controller.selections().sheet.as_deref(), Some("Input"));

        h.controller.load().unwrap();
        let done = h.controller.settle();
        assert!(done[0].result.is_ok());
        assert!(h.controller.dataset().is_loaded());
    }

    #[test]
    fn missing_file_is_reported_without_a_request() {
        let mut h = harness();
        let err = h.controller.select_file("/no/such/file.xlsx").unwrap_err();
        assert!(matches!(err, ControllerError::Io { .. }));
        assert!(!h.controller.has_pending());
    }

    #[test]
    fn load_populates_selectors() {
        let mut h = harness();
        loaded(&mut h);
        assert!(h.controller.dataset().is_loaded());
        assert_eq!(h.controller.selections().date_column.as_deref(), Some("Date"));
        assert_eq!(h.controller.date_choices(), names(&["Date", "A", "B"]));
        assert_eq!(h.controller.value_choices(), names(&["A", "B"]));
        assert_eq!(h.controller.selections().control_column.as_deref(), Some("A"));
        for kind in AnalysisKind::ALL {
            assert!(h.controller.is_enabled(kind));
        }
        let messages: Vec<_> = h
            .notifier
            .notifications()
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(messages, vec!["Sheets loaded", "Data loaded"]);
    }

    #[test]
    fn failed_load_keeps_prior_state() {
        let mut h = harness();
        loaded(&mut h);
        h.controller.select_sheet("Other").unwrap();
        h.controller.load().unwrap();
        let done = h.controller.settle();
        assert!(done[0].result.is_err());
        assert!(h.controller.dataset().is_loaded());
        assert!(!h.controller.is_busy(RequestKind::LoadSheet));
    }

    #[test]
    fn load_needs_a_file_and_a_listed_sheet() {
        let mut h = harness();
        assert!(matches!(
            h.controller.load(),
            Err(ControllerError::Validation(ValidationError::NoFile))
        ));
        assert!(h.controller.select_sheet("Input").is_err());
    }

    #[test]
    fn correlation_result_is_rendered_and_exportable() {
        let mut h = harness();
        loaded(&mut h);
        h.controller
            .set_columns(AnalysisKind::Correlation, names(&["A", "B"]))
            .unwrap();
        h.controller.set_range("2023-01-01", "2023-12-31");
        h.controller.run(AnalysisKind::Correlation).unwrap();
        assert!(!h.controller.is_enabled(AnalysisKind::Correlation));
        let done = h.controller.settle();
        assert!(done[0].result.is_ok());
        assert!(h.controller.is_enabled(AnalysisKind::Correlation));

        let chart = h.board.get(AnalysisKind::Correlation).unwrap();
        assert!(!chart.is_no_data());

        let path = h.controller.export(AnalysisKind::Correlation).unwrap();
        h.controller.export(AnalysisKind::Correlation).unwrap();
        assert_eq!(path, PathBuf::from("correlation.xlsx"));
        let saved = h.sink.saved.lock();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].1, vec![1, 2, 3]);
        assert_eq!(saved[0], saved[1]);
    }

    #[test]
    fn export_without_result_reports_no_data() {
        let mut h = harness();
        loaded(&mut h);
        let err = h.controller.export(AnalysisKind::Cusum).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Export(ExportError::NoData(AnalysisKind::Cusum))
        ));
        assert!(h.sink.saved.lock().is_empty());
        assert_eq!(h.notifier.errors(), vec!["no data to export for CUSUM"]);
    }

    #[test]
    fn cusum_with_three_columns_never_reaches_the_engine() {
        let mut h = harness();
        loaded(&mut h);
        h.controller
            .set_columns(AnalysisKind::Cusum, names(&["A", "B", "A"]))
            .unwrap();
        h.controller.set_range("2023-01-01", "2023-12-31");
        let err = h.controller.run(AnalysisKind::Cusum).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Validation(ValidationError::CusumColumnCount(3))
        ));
        assert!(!h.controller.has_pending());
        h.controller.settle();
        assert!(!h
            .log
            .kinds
            .lock()
            .contains(&RequestKind::Analysis(AnalysisKind::Cusum)));
    }

    #[test]
    fn compute_errors_are_verbatim_and_release_the_action() {
        let mut h = harness();
        loaded(&mut h);
        h.controller
            .set_columns(AnalysisKind::Cusum, names(&["A"]))
            .unwrap();
        h.controller.set_range("2023-12-31", "2023-01-01");
        h.controller.run(AnalysisKind::Cusum).unwrap();
        let done = h.controller.settle();
        assert_eq!(done[0].result.as_ref().unwrap_err().to_string(), "Start > End");
        assert!(h.controller.is_enabled(AnalysisKind::Cusum));
        assert_eq!(h.notifier.errors(), vec!["Start > End"]);
    }

    #[test]
    fn control_chart_request_carries_wire_periods() {
        let mut h = harness();
        loaded(&mut h);
        h.controller.add_period("2023-01-01", "2023-03-31").unwrap();
        h.controller.add_period("2023-06-01", "2023-08-31").unwrap();
        h.controller.set_confidence("95");
        h.controller.run(AnalysisKind::ControlChart).unwrap();
        h.controller.settle();

        let params = h.log.control.lock().clone().unwrap();
        assert_eq!(params.value_column, "A");
        assert_eq!(
            params.periods,
            vec![
                WirePeriod {
                    start: "01/01/2023".into(),
                    end: "31/03/2023".into()
                },
                WirePeriod {
                    start: "01/06/2023".into(),
                    end: "31/08/2023".into()
                },
            ]
        );
        let chart = h.board.get(AnalysisKind::ControlChart).unwrap();
        assert!(chart.is_no_data());
        assert!(h.controller.has_export(AnalysisKind::ControlChart));
    }

    #[test]
    fn second_request_of_a_kind_is_refused_while_busy() {
        let (open, gate) = unbounded();
        let mut h = harness_with(ControllerConfig::default(), Some(gate));
        loaded(&mut h);
        h.controller
            .set_columns(AnalysisKind::Correlation, names(&["A"]))
            .unwrap();
        h.controller.set_range("2023-01-01", "2023-12-31");
        h.controller.run(AnalysisKind::Correlation).unwrap();
        assert!(matches!(
            h.controller.run(AnalysisKind::Correlation),
            Err(ControllerError::Validation(ValidationError::Busy(_)))
        ));
        open.send(()).unwrap();
        let done = h.controller.settle();
        assert_eq!(done.len(), 1);
    }

    #[test]
    fn clear_resets_immediately_and_drops_late_replies() {
        let (open, gate) = unbounded();
        let mut h = harness_with(ControllerConfig::default(), Some(gate));
        loaded(&mut h);
        h.controller.add_period("2023-01-01", "2023-01-31").unwrap();
        h.controller
            .set_columns(AnalysisKind::Correlation, names(&["A"]))
            .unwrap();
        h.controller.set_range("2023-01-01", "2023-12-31");
        h.controller.run(AnalysisKind::Correlation).unwrap();

        h.controller.clear();
        assert_eq!(*h.controller.dataset(), DatasetState::Empty);
        assert!(!h.controller.has_pending());
        assert_eq!(h.controller.periods().len(), 1);
        assert!(h.controller.selections().correlation_columns.is_empty());

        open.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(h.controller.pump().is_empty());
        assert!(h.board.get(AnalysisKind::Correlation).is_none());
        assert!(!h.controller.has_export(AnalysisKind::Correlation));
    }

    #[test]
    fn timeout_releases_the_action() {
        let (open, gate) = unbounded();
        let config = ControllerConfig {
            timeout: Some(Duration::from_millis(30)),
            reset_periods_on_load: false,
        };
        let mut h = harness_with(config, Some(gate));
        loaded(&mut h);
        h.controller
            .set_columns(AnalysisKind::Correlation, names(&["A"]))
            .unwrap();
        h.controller.set_range("2023-01-01", "2023-12-31");
        h.controller.run(AnalysisKind::Correlation).unwrap();
        let done = h.controller.settle();
        assert!(matches!(
            done[0].result,
            Err(ControllerError::Timeout { .. })
        ));
        assert!(h.controller.is_enabled(AnalysisKind::Correlation));

        open.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(h.controller.pump().is_empty());
        assert!(!h.controller.has_export(AnalysisKind::Correlation));
    }

    #[test]
    fn load_timeout_drops_the_dataset_on_both_sides() {
        let (open, gate) = unbounded();
        // The first load goes straight through.
        open.send(()).unwrap();
        let config = ControllerConfig {
            timeout: Some(Duration::from_millis(30)),
            reset_periods_on_load: false,
        };
        let mut h = harness_gated(config, None, Some(gate));
        loaded(&mut h);

        h.controller.load().unwrap();
        let done = h.controller.settle();
        assert_eq!(
            done[0].result.as_ref().unwrap_err().to_string(),
            "Load timed out after 30ms"
        );
        assert!(!h.controller.dataset().is_loaded());
        assert_eq!(h.controller.dataset().sheets(), &["Input", "Other"]);
        assert!(h.controller.value_choices().is_empty());
        for kind in AnalysisKind::ALL {
            assert!(!h.controller.is_enabled(kind));
        }

        // Release the late load and the retry below.
        open.send(()).unwrap();
        open.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert!(h.controller.pump().is_empty());
        assert!(!h.controller.dataset().is_loaded());

        h.controller.load().unwrap();
        assert!(h.controller.settle()[0].result.is_ok());
        assert!(h.controller.dataset().is_loaded());
        let kinds = h.log.kinds.lock().clone();
        assert_eq!(
            kinds[kinds.len() - 3..],
            [RequestKind::LoadSheet, RequestKind::Clear, RequestKind::LoadSheet]
        );
    }

    #[test]
    fn engine_panic_resolves_the_request() {
        struct Crashing;

        impl EngineRuntime for Crashing {
            fn list_sheets(&mut self, _: Vec<u8>) -> Result<Vec<String>, EngineError> {
                panic!("corrupt state");
            }

            fn load_sheet(&mut self, _: Vec<u8>, _: &str) -> Result<Vec<String>, EngineError> {
                Ok(Vec::new())
            }

            fn clear(&mut self) {}

            fn correlation(&mut self, _: &CorrelationParams) -> Result<AnalysisOutput, EngineError> {
                Err(EngineError::Compute("unused".into()))
            }

            fn cusum(&mut self, _: &CusumParams) -> Result<AnalysisOutput, EngineError> {
                Err(EngineError::Compute("unused".into()))
            }

            fn control_chart(
                &mut self,
                _: &ControlChartParams,
            ) -> Result<AnalysisOutput, EngineError> {
                Err(EngineError::Compute("unused".into()))
            }
        }

        let notifier = Arc::new(CollectingNotifier::new());
        let surfaces = Surfaces {
            notifier: notifier.clone(),
            renderer: Arc::new(ChartBoard::new()),
            sink: Arc::new(MemorySink::default()),
        };
        let factory: RuntimeFactory = Box::new(|| Ok(Box::new(Crashing) as Box<dyn EngineRuntime>));
        let mut controller =
            DashboardController::spawn(factory, surfaces, ControllerConfig::default());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"workbook").unwrap();

        controller.select_file(file.path()).unwrap();
        let done = controller.settle();
        assert_eq!(done.len(), 1);
        assert!(matches!(
            done[0].result,
            Err(ControllerError::Engine(EngineError::Unavailable(_)))
        ));
        assert!(!controller.has_pending());
        assert!(controller.selections().file.is_none());
        assert_eq!(notifier.errors().len(), 1);
    }

    #[test]
    fn timeout_messages_keep_millisecond_precision() {
        let short = ControllerError::Timeout {
            what: "Load",
            after: Duration::from_millis(50),
        };
        assert_eq!(short.to_string(), "Load timed out after 50ms");
        let long = ControllerError::Timeout {
            what: "CUSUM",
            after: Duration::from_millis(2500),
        };
        assert_eq!(long.to_string(), "CUSUM timed out after 2.5s");
    }

    #[test]
    fn engine_unavailable_is_reported_once() {
        let notifier = Arc::new(CollectingNotifier::new());
        let surfaces = Surfaces {
            notifier: notifier.clone(),
            renderer: Arc::new(ChartBoard::new()),
            sink: Arc::new(MemorySink::default()),
        };
        let factory: RuntimeFactory =
            Box::new(|| Err(EngineError::Unavailable("runtime missing".into())));
        let mut controller =
            DashboardController::spawn(factory, surfaces, ControllerConfig::default());
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"workbook").unwrap();

        let mut failures = 0;
        for _ in 0..3 {
            controller.select_file(file.path()).unwrap();
            for c in controller.settle() {
                assert!(matches!(
                    c.result,
                    Err(ControllerError::Engine(EngineError::Unavailable(_)))
                ));
                failures += 1;
            }
        }
        assert_eq!(failures, 3);
        assert_eq!(notifier.errors().len(), 1);
    }

    #[test]
    fn periods_survive_reload_unless_configured() {
        let mut h = harness();
        loaded(&mut h);
        h.controller.add_period("2023-01-01", "2023-01-31").unwrap();
        h.controller.load().unwrap();
        h.controller.settle();
        assert_eq!(h.controller.periods().len(), 1);

        let config = ControllerConfig {
            timeout: None,
            reset_periods_on_load: true,
        };
        let mut h = harness_with(config, None);
        loaded(&mut h);
        h.controller.add_period("2023-01-01", "2023-01-31").unwrap();
        h.controller.load().unwrap();
        h.controller.settle();
        assert!(h.controller.periods().is_empty());
    }

    #[test]
    fn period_selection_and_removal() {
        let mut h = harness();
        h.controller.add_period("2023-01-01", "2023-01-31").unwrap();
        h.controller.add_period("2023-02-01", "2023-02-28").unwrap();
        assert!(h.controller.add_period("2023-03-01", "2023-02-01").is_err());
        assert_eq!(h.controller.periods().len(), 2);

        assert!(matches!(
            h.controller.remove_selected_period(),
            Err(ControllerError::PeriodNotFound(PeriodNotFound { index: None, .. }))
        ));
        assert!(h.controller.select_period(5).is_err());
        h.controller.select_period(0).unwrap();
        let removed = h.controller.remove_selected_period().unwrap();
        assert_eq!(removed.to_wire().start, "01/01/2023");
        assert_eq!(h.controller.periods().len(), 1);
        assert_eq!(h.controller.selections().selected_period, None);
    }

    #[test]
    fn analyses_need_a_loaded_dataset() {
        let mut h = harness();
        assert!(matches!(
            h.controller.run(AnalysisKind::Correlation),
            Err(ControllerError::Validation(ValidationError::NotLoaded))
        ));
        assert!(h.controller.set_date_column("Date").is_err());
    }

    #[test]
    fn value_selectors_reject_the_date_column() {
        let mut h = harness();
        loaded(&mut h);
        assert!(h
            .controller
            .set_columns(AnalysisKind::Correlation, names(&["Date"]))
            .is_err());
        assert!(h
            .controller
            .set_columns(AnalysisKind::ControlChart, names(&["A", "B"]))
            .is_err());
        h.controller
            .set_columns(AnalysisKind::ControlChart, names(&["B"]))
            .unwrap();
        assert_eq!(h.controller.selections().control_column.as_deref(), Some("B"));
    }
}
