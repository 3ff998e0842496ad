//! Local preconditions checked before a request leaves the front end.

use mettool_core::protocol::{ControlChartParams, CorrelationParams, CusumParams};
use mettool_core::{ColumnSchema, PeriodStore, ValidationError};

use crate::session::Selections;

fn require_date_range(sel: &Selections) -> Result<(String, String), ValidationError> {
    let (start, end) = (sel.start.trim(), sel.end.trim());
    if start.is_empty() || end.is_empty() {
        return Err(ValidationError::MissingDateRange);
    }
    Ok((start.to_string(), end.to_string()))
}

fn require_date_column(sel: &Selections, schema: &ColumnSchema) -> Result<String, ValidationError> {
    let column = sel
        .date_column
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(ValidationError::NoDateColumn)?;
    if !schema.contains(column) {
        return Err(ValidationError::UnknownColumn(column.to_string()));
    }
    Ok(column.to_string())
}

fn require_value_columns(columns: &[String], schema: &ColumnSchema) -> Result<(), ValidationError> {
    match columns.iter().find(|c| !schema.is_value_column(c)) {
        Some(bad) => Err(ValidationError::UnknownColumn(bad.clone())),
        None => Ok(()),
    }
}

/// Parse the confidence text as a number.
pub fn parse_confidence(text: &str) -> Result<f64, ValidationError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValidationError::InvalidConfidence(text.to_string()))
}

pub fn correlation_params(
    sel: &Selections,
    schema: &ColumnSchema,
) -> Result<CorrelationParams, ValidationError> {
    let (start, end) = require_date_range(sel)?;
    if sel.correlation_columns.is_empty() {
        return Err(ValidationError::NoValueColumns);
    }
    let date_column = require_date_column(sel, schema)?;
    require_value_columns(&sel.correlation_columns, schema)?;
    Ok(CorrelationParams {
        date_column,
        value_columns: sel.correlation_columns.clone(),
        start,
        end,
    })
}

/// CUSUM takes one or two columns; the count is checked first.
pub fn cusum_params(
    sel: &Selections,
    schema: &ColumnSchema,
) -> Result<CusumParams, ValidationError> {
    let count = sel.cusum_columns.len();
    if count == 0 {
        return Err(ValidationError::NoValueColumns);
    }
    if count > 2 {
        return Err(ValidationError::CusumColumnCount(count));
    }
    let (start, end) = require_date_range(sel)?;
    let date_column = require_date_column(sel, schema)?;
    require_value_columns(&sel.cusum_columns, schema)?;
    Ok(CusumParams {
        date_column,
        value_columns: sel.cusum_columns.clone(),
        start,
        end,
    })
}

pub fn control_chart_params(
    sel: &Selections,
    schema: &ColumnSchema,
    periods: &PeriodStore,
) -> Result<ControlChartParams, ValidationError> {
    let confidence = parse_confidence(&sel.confidence)?;
    if periods.is_empty() {
        return Err(ValidationError::NoPeriods);
    }
    let value_column = sel
        .control_column
        .clone()
        .filter(|c| !c.is_empty())
        .ok_or(ValidationError::NoControlColumn)?;
    let date_column = require_date_column(sel, schema)?;
    require_value_columns(std::slice::from_ref(&value_column), schema)?;
    Ok(ControlChartParams {
        date_column,
        value_column,
        confidence,
        periods: periods.to_wire(),
        show_limits: sel.show_limits,
        show_average: sel.show_average,
    })
}
