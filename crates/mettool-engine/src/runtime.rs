//! `NativeEngine`: the in-process `EngineRuntime`.

use tracing::{debug, info};

use mettool_core::constants::JUNK_COLUMN_THRESHOLD;
use mettool_core::engine::RuntimeFactory;
use mettool_core::protocol::{ControlChartParams, CorrelationParams, CusumParams};
use mettool_core::{AnalysisOutput, EngineError, EngineRuntime, DATE_COLUMN};

use crate::analyses;
use crate::selection::FilterOptions;
use crate::table::Table;
use crate::workbook;

/// The loaded sheet. Analyses select from `original`, junk columns included.
#[derive(Debug)]
struct Dataset {
    sheet: String,
    original: Table,
}

/// Native statistics engine. Holds at most one dataset.
#[derive(Debug, Default)]
pub struct NativeEngine {
    dataset: Option<Dataset>,
    filter: FilterOptions,
}

impl NativeEngine {
    /// Create an engine, rejecting unusable filter options.
    pub fn initialize(filter: FilterOptions) -> Result<Self, EngineError> {
        filter.validate().map_err(EngineError::Unavailable)?;
        info!(?filter, "native engine initialised");
        Ok(Self {
            dataset: None,
            filter,
        })
    }

    /// A factory that initialises the engine where it is called.
    #[must_use]
    pub fn factory(filter: FilterOptions) -> RuntimeFactory {
        Box::new(move || {
            Self::initialize(filter).map(|engine| Box::new(engine) as Box<dyn EngineRuntime>)
        })
    }

    /// Name of the loaded sheet, if any.
    #[must_use]
    pub fn sheet(&self) -> Option<&str> {
        self.dataset.as_ref().map(|d| d.sheet.as_str())
    }

    fn table(&self) -> Result<&Table, EngineError> {
        self.dataset
            .as_ref()
            .map(|d| &d.original)
            .ok_or_else(|| EngineError::Compute("No dataset loaded".into()))
    }
}

impl EngineRuntime for NativeEngine {
    fn list_sheets(&mut self, workbook: Vec<u8>) -> Result<Vec<String>, EngineError> {
        let names = workbook::sheet_names(workbook)?;
        debug!(sheets = names.len(), "sheets listed");
        Ok(names)
    }

    fn load_sheet(&mut self, workbook: Vec<u8>, sheet: &str) -> Result<Vec<String>, EngineError> {
        let table = workbook::read_sheet(workbook, sheet)?;
        info!(
            rows = table.height(),
            cols = table.width(),
            sheet,
            "sheet loaded"
        );
        let kept = table.kept_columns(JUNK_COLUMN_THRESHOLD, DATE_COLUMN);
        if kept.is_empty() {
            return Err(EngineError::Parse(format!(
                "sheet {sheet:?} has no usable columns"
            )));
        }
        debug!(?kept, "columns kept");
        self.dataset = Some(Dataset {
            sheet: sheet.to_string(),
            original: table,
        });
        Ok(kept)
    }

    fn clear(&mut self) {
        if self.dataset.take().is_some() {
            info!("dataset cleared");
        }
    }

    fn correlation(&mut self, params: &CorrelationParams) -> Result<AnalysisOutput, EngineError> {
        analyses::correlation(self.table()?, params, self.filter)
    }

    fn cusum(&mut self, params: &CusumParams) -> Result<AnalysisOutput, EngineError> {
        analyses::cusum(self.table()?, params, self.filter)
    }

    fn control_chart(
        &mut self,
        params: &ControlChartParams,
    ) -> Result<AnalysisOutput, EngineError> {
        analyses::control_chart(self.table()?, params, self.filter)
    }
}
