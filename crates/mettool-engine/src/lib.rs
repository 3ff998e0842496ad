//! # mettool-engine
//!
//! Native implementation of the statistics engine: spreadsheet decoding with
//! calamine, date-window selection and filtering, correlation / CUSUM /
//! Student-t control limits, and `.xlsx` export encoding.

pub mod analyses;
pub mod export;
pub mod runtime;
pub mod selection;
pub mod stats;
pub mod table;
pub mod workbook;

pub use runtime::NativeEngine;
pub use selection::{FilterOptions, OutlierRule};
