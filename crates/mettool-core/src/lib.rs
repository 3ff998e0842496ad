//! # mettool-core
//!
//! Shared domain for the mettool dashboard: the control-chart period model,
//! the column schema, the request/response protocol spoken with the
//! statistics engine, chart payloads and the adapters that turn them into
//! renderable views.

pub mod adapters;
pub mod charts;
pub mod columns;
pub mod constants;
pub mod engine;
pub mod error;
pub mod export;
pub mod periods;
pub mod protocol;

// Re-exports
pub use adapters::{ChartView, ControlChart, Heatmap, LineChart};
pub use columns::ColumnSchema;
pub use constants::{exit_codes, DATE_COLUMN, NOTIFICATION_TTL};
pub use engine::EngineRuntime;
pub use error::{EngineError, ExportError, PeriodNotFound, ValidationError};
pub use export::{ExportBuffer, ExportSlots};
pub use periods::{Period, PeriodStore, WirePeriod};
pub use protocol::{AnalysisKind, AnalysisOutput, Request, RequestKind, Response};
