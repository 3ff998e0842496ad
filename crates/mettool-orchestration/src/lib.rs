//! # mettool-orchestration
//!
//! Everything between the front ends and the statistics engine: the engine
//! proxy that owns the worker thread, the dashboard controller with its
//! per-request state machine, local validation, and the collaborator
//! traits front ends implement to show notifications, charts and exports.

pub mod controller;
pub mod interfaces;
pub mod proxy;
pub mod session;
pub mod validation;

pub use controller::{
    request_label, Completion, ControllerConfig, ControllerError, DashboardController,
    DatasetState, RequestState, Surfaces,
};
pub use interfaces::{
    Chart, ChartBoard, ChartRenderer, CollectingNotifier, ExportSink, Notification, Notifier,
    Severity,
};
pub use proxy::{EngineProxy, EngineStatus, Pending, Readiness};
pub use session::{Selections, Session};
