//! Control-chart periods.
//!
//! A `Period` is an inclusive date range. The `PeriodStore` keeps periods in
//! creation order: no sorting, no merging, overlaps allowed. Periods are
//! entered as `YYYY-MM-DD` and transmitted to the engine as `DD/MM/YYYY`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::{INPUT_DATE_FORMAT, WIRE_DATE_FORMAT};
use crate::error::{PeriodNotFound, ValidationError};

/// An inclusive date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    /// Build a period from dates, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidRange {
                start: start.format(INPUT_DATE_FORMAT).to_string(),
                end: end.format(INPUT_DATE_FORMAT).to_string(),
                reason: "start is after end",
            });
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds.
    pub fn parse(start_text: &str, end_text: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidRange {
            start: start_text.to_string(),
            end: end_text.to_string(),
            reason,
        };
        let start = NaiveDate::parse_from_str(start_text.trim(), INPUT_DATE_FORMAT)
            .map_err(|_| invalid("start is not a YYYY-MM-DD date"))?;
        let end = NaiveDate::parse_from_str(end_text.trim(), INPUT_DATE_FORMAT)
            .map_err(|_| invalid("end is not a YYYY-MM-DD date"))?;
        if start > end {
            return Err(invalid("start is after end"));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the range (bounds inclusive).
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The record sent to the engine.
    #[must_use]
    pub fn to_wire(&self) -> WirePeriod {
        WirePeriod {
            start: self.start.format(WIRE_DATE_FORMAT).to_string(),
            end: self.end.format(WIRE_DATE_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} – {}",
            self.start.format(WIRE_DATE_FORMAT),
            self.end.format(WIRE_DATE_FORMAT)
        )
    }
}

/// Period as transmitted to the engine, both bounds `DD/MM/YYYY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePeriod {
    pub start: String,
    pub end: String,
}

impl WirePeriod {
    /// Decode the wire form back into a `Period`.
    pub fn to_period(&self) -> Result<Period, ValidationError> {
        let invalid = |reason| ValidationError::InvalidRange {
            start: self.start.clone(),
            end: self.end.clone(),
            reason,
        };
        let start = NaiveDate::parse_from_str(self.start.trim(), WIRE_DATE_FORMAT)
            .map_err(|_| invalid("start is not a DD/MM/YYYY date"))?;
        let end = NaiveDate::parse_from_str(self.end.trim(), WIRE_DATE_FORMAT)
            .map_err(|_| invalid("end is not a DD/MM/YYYY date"))?;
        Period::new(start, end)
    }
}

/// Ordered, user-edited list of periods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodStore {
    periods: Vec<Period>,
}

impl PeriodStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and append a period. On error the store is unchanged.
    pub fn add(&mut self, start_text: &str, end_text: &str) -> Result<(), ValidationError> {
        let period = Period::parse(start_text, end_text)?;
        tracing::debug!(%period, "period added");
        self.periods.push(period);
        Ok(())
    }

    /// Append an already validated period.
    pub fn push(&mut self, period: Period) {
        self.periods.push(period);
    }

    /// Remove the period at `index`, shifting later ones down.
    pub fn remove(&mut self, index: usize) -> Result<Period, PeriodNotFound> {
        if index >= self.periods.len() {
            return Err(PeriodNotFound {
                index: Some(index),
                len: self.periods.len(),
            });
        }
        Ok(self.periods.remove(index))
    }

    /// Snapshot in creation order.
    #[must_use]
    pub fn list(&self) -> &[Period] {
        &self.periods
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn clear(&mut self) {
        self.periods.clear();
    }

    /// Wire records in store order.
    #[must_use]
    pub fn to_wire(&self) -> Vec<WirePeriod> {
        self.periods.iter().map(Period::to_wire).collect()
    }
}
