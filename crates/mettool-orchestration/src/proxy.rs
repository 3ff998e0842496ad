//! Engine proxy: one background worker owning the engine runtime.
//!
//! Requests are queued on a channel from the moment the proxy exists, so
//! calls made before the runtime is initialised wait rather than fail. If
//! initialisation fails every queued and later call resolves to
//! `EngineError::Unavailable`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{
    bounded, unbounded, Receiver, RecvTimeoutError, SendError, Sender, TryRecvError,
};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use mettool_core::engine::{execute, RuntimeFactory};
use mettool_core::protocol::{ControlChartParams, CorrelationParams, CusumParams};
use mettool_core::{AnalysisOutput, EngineError, EngineRuntime, Request, Response};

/// Engine lifecycle as seen from the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Starting,
    Ready,
    Failed(String),
}

/// One-time report of how initialisation went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Ready,
    Failed(EngineError),
}

/// Continuation invoked with the outcome of one request.
pub type Reply = Box<dyn FnOnce(Result<Response, EngineError>) + Send + 'static>;

struct Envelope {
    request: Request,
    reply: Reply,
}

const WORKER_GONE: &str = "engine worker stopped";
const WORKER_PANICKED: &str = "engine crashed while handling a request";

/// Handle to a result that will arrive later.
#[derive(Debug)]
pub struct Pending<T> {
    rx: Receiver<Result<T, EngineError>>,
}

impl<T> Pending<T> {
    /// Block until the result arrives.
    pub fn wait(self) -> Result<T, EngineError> {
        self.rx
            .recv()
            .unwrap_or_else(|_| Err(EngineError::Unavailable(WORKER_GONE.into())))
    }

    /// Block for at most `timeout`; `None` if nothing arrived in time.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T, EngineError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(Err(EngineError::Unavailable(WORKER_GONE.into())))
            }
        }
    }

    /// Take the result if it has already arrived; `None` while still pending.
    pub fn try_take(&self) -> Option<Result<T, EngineError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(EngineError::Unavailable(WORKER_GONE.into())))
            }
        }
    }
}

/// Serialises access to the single engine runtime.
pub struct EngineProxy {
    tx: Option<Sender<Envelope>>,
    readiness: Arc<RwLock<Readiness>>,
    worker: Option<JoinHandle<()>>,
}

impl EngineProxy {
    /// Start the worker; `factory` runs on it.
    pub fn spawn(factory: RuntimeFactory) -> Self {
        Self::spawn_with_status(factory, |_| {})
    }

    /// Start the worker and report readiness through `on_status`, exactly once.
    pub fn spawn_with_status<S>(factory: RuntimeFactory, on_status: S) -> Self
    where
        S: FnOnce(EngineStatus) + Send + 'static,
    {
        let (tx, rx) = unbounded::<Envelope>();
        let readiness = Arc::new(RwLock::new(Readiness::Starting));
        let shared = Arc::clone(&readiness);
        let worker = std::thread::Builder::new()
            .name("mettool-engine".into())
            .spawn(move || run_worker(factory, &rx, &shared, on_status))
            .map_err(|e| error!(error = %e, "failed to spawn engine worker"))
            .ok();
        if worker.is_none() {
            *readiness.write() = Readiness::Failed("could not start engine worker".into());
        }
        Self {
            tx: Some(tx),
            readiness,
            worker,
        }
    }

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.readiness.read().clone()
    }

    /// Queue `request`; `reply` runs exactly once with its outcome, on the
    /// worker thread or, if the engine has already failed, right here.
    pub fn submit<F>(&self, request: Request, reply: F)
    where
        F: FnOnce(Result<Response, EngineError>) + Send + 'static,
    {
        if let Readiness::Failed(reason) = self.readiness() {
            reply(Err(EngineError::Unavailable(reason)));
            return;
        }
        debug!(kind = ?request.kind(), "request queued");
        let envelope = Envelope {
            request,
            reply: Box::new(reply),
        };
        match &self.tx {
            Some(tx) => {
                if let Err(SendError(envelope)) = tx.send(envelope) {
                    (envelope.reply)(Err(EngineError::Unavailable(WORKER_GONE.into())));
                }
            }
            None => (envelope.reply)(Err(EngineError::Unavailable(WORKER_GONE.into()))),
        }
    }

    /// Queue `request` and get a handle on the typed answer. A response of
    /// another kind resolves to `EngineError::Mismatch`.
    fn typed<T, X>(&self, request: Request, extract: X) -> Pending<T>
    where
        T: Send + 'static,
        X: FnOnce(Response) -> Result<T, Response> + Send + 'static,
    {
        let expected = request.kind();
        let (tx, rx) = bounded(1);
        self.submit(request, move |outcome| {
            let typed = outcome.and_then(|resp| {
                extract(resp).map_err(|other| EngineError::Mismatch {
                    expected,
                    got: other.kind(),
                })
            });
            // The caller may have dropped the handle.
            let _ = tx.send(typed);
        });
        Pending { rx }
    }

    /// Untyped call returning the raw response.
    pub fn call(&self, request: Request) -> Pending<Response> {
        self.typed(request, Ok)
    }

    pub fn list_sheets(&self, workbook: Vec<u8>) -> Pending<Vec<String>> {
        self.typed(Request::ListSheets { workbook }, |resp| match resp {
            Response::Sheets(names) => Ok(names),
            other => Err(other),
        })
    }

    pub fn load_sheet(&self, workbook: Vec<u8>, sheet: impl Into<String>) -> Pending<Vec<String>> {
        let request = Request::LoadSheet {
            workbook,
            sheet: sheet.into(),
        };
        self.typed(request, |resp| match resp {
            Response::Columns(cols) => Ok(cols),
            other => Err(other),
        })
    }

    pub fn clear(&self) -> Pending<()> {
        self.typed(Request::Clear, |resp| match resp {
            Response::Cleared => Ok(()),
            other => Err(other),
        })
    }

    pub fn correlation(&self, params: CorrelationParams) -> Pending<AnalysisOutput> {
        self.typed(Request::Correlation(params), |resp| match resp {
            Response::Correlation(out) => Ok(out),
            other => Err(other),
        })
    }

    pub fn cusum(&self, params: CusumParams) -> Pending<AnalysisOutput> {
        self.typed(Request::Cusum(params), |resp| match resp {
            Response::Cusum(out) => Ok(out),
            other => Err(other),
        })
    }

    pub fn control_chart(&self, params: ControlChartParams) -> Pending<AnalysisOutput> {
        self.typed(Request::ControlChart(params), |resp| match resp {
            Response::ControlChart(out) => Ok(out),
            other => Err(other),
        })
    }

    /// Stop accepting requests, let the worker drain the queue and join it.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("engine worker panicked");
            }
        }
    }
}

impl Drop for EngineProxy {
    fn drop(&mut self) {
        self.stop();
    }
}

fn unavailable_reason(err: &EngineError) -> String {
    match err {
        EngineError::Unavailable(reason) => reason.clone(),
        other => other.to_string(),
    }
}

fn run_worker<S>(
    factory: RuntimeFactory,
    rx: &Receiver<Envelope>,
    readiness: &RwLock<Readiness>,
    on_status: S,
) where
    S: FnOnce(EngineStatus),
{
    let mut runtime: Box<dyn EngineRuntime> = match factory() {
        Ok(runtime) => runtime,
        Err(err) => {
            let reason = unavailable_reason(&err);
            error!(%reason, "engine initialisation failed");
            *readiness.write() = Readiness::Failed(reason.clone());
            on_status(EngineStatus::Failed(err));
            refuse_all(rx, &reason);
            return;
        }
    };

    *readiness.write() = Readiness::Ready;
    info!("engine ready");
    on_status(EngineStatus::Ready);

    for Envelope { request, reply } in rx {
        let kind = request.kind();
        // A panicking runtime is not reused; its state may be half-written.
        let Ok(outcome) = catch_unwind(AssertUnwindSafe(|| execute(runtime.as_mut(), request)))
        else {
            error!(?kind, "engine panicked");
            *readiness.write() = Readiness::Failed(WORKER_PANICKED.into());
            reply(Err(EngineError::Unavailable(WORKER_PANICKED.into())));
            refuse_all(rx, WORKER_PANICKED);
            return;
        };
        match &outcome {
            Ok(_) => debug!(?kind, "request completed"),
            Err(e) => debug!(?kind, error = %e, "request failed"),
        }
        reply(outcome);
    }
    debug!("engine worker stopped");
}

/// Answer every queued and later request with `Unavailable` until shutdown.
fn refuse_all(rx: &Receiver<Envelope>, reason: &str) {
    for envelope in rx {
        (envelope.reply)(Err(EngineError::Unavailable(reason.to_string())));
    }
}
