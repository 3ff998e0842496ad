//! The engine runtime contract.
//!
//! `EngineRuntime` is implemented by whatever performs the statistics. It is
//! driven from a single worker thread, one request at a time.

use crate::error::EngineError;
use crate::protocol::{
    AnalysisOutput, ControlChartParams, CorrelationParams, CusumParams, Request, Response,
};

/// Executes engine requests. Implementations own the loaded dataset.
pub trait EngineRuntime: Send {
    /// Sheet names of a spreadsheet container, in workbook order.
    fn list_sheets(&mut self, workbook: Vec<u8>) -> Result<Vec<String>, EngineError>;

    /// Load one sheet as the current dataset and return its column names.
    fn load_sheet(&mut self, workbook: Vec<u8>, sheet: &str) -> Result<Vec<String>, EngineError>;

    /// Drop the current dataset. Idempotent.
    fn clear(&mut self);

    fn correlation(&mut self, params: &CorrelationParams) -> Result<AnalysisOutput, EngineError>;

    fn cusum(&mut self, params: &CusumParams) -> Result<AnalysisOutput, EngineError>;

    fn control_chart(
        &mut self,
        params: &ControlChartParams,
    ) -> Result<AnalysisOutput, EngineError>;
}

/// Deferred engine construction, run on the thread that will drive it.
pub type RuntimeFactory =
    Box<dyn FnOnce() -> Result<Box<dyn EngineRuntime>, EngineError> + Send + 'static>;

/// Run one request against `runtime`; the response is tagged like the request.
pub fn execute(runtime: &mut dyn EngineRuntime, request: Request) -> Result<Response, EngineError> {
    match request {
        Request::ListSheets { workbook } => runtime.list_sheets(workbook).map(Response::Sheets),
        Request::LoadSheet { workbook, sheet } => {
            runtime.load_sheet(workbook, &sheet).map(Response::Columns)
        }
        Request::Clear => {
            runtime.clear();
            Ok(Response::Cleared)
        }
        Request::Correlation(params) => runtime.correlation(&params).map(Response::Correlation),
        Request::Cusum(params) => runtime.cusum(&params).map(Response::Cusum),
        Request::ControlChart(params) => {
            runtime.control_chart(&params).map(Response::ControlChart)
        }
    }
}
