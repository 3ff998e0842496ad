//! Date-window selection and value filtering.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use mettool_core::EngineError;

use crate::stats;
use crate::table::Table;

/// Outlier rule applied to each value column after zero replacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutlierRule {
    /// Drop values whose absolute z-score exceeds the threshold.
    ZScore(f64),
    /// Drop values outside `[q1 - k·iqr, q3 + k·iqr]`.
    Iqr(f64),
}

/// How selected values are cleaned before any statistic is computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterOptions {
    pub replace_zero: bool,
    pub outliers: Option<OutlierRule>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            replace_zero: true,
            outliers: None,
        }
    }
}

impl FilterOptions {
    /// Reject thresholds that cannot select anything sensible.
    pub fn validate(&self) -> Result<(), String> {
        match self.outliers {
            Some(OutlierRule::ZScore(k) | OutlierRule::Iqr(k)) if !(k.is_finite() && k > 0.0) => {
                Err(format!("outlier threshold must be positive, got {k}"))
            }
            _ => Ok(()),
        }
    }
}

/// Parse a window bound. Text containing `/` is read day-first.
pub fn parse_bound(text: &str) -> Result<NaiveDate, EngineError> {
    let text = text.trim();
    let parsed = if text.contains('/') {
        NaiveDate::parse_from_str(text, "%d/%m/%Y")
    } else {
        NaiveDate::parse_from_str(text, "%Y-%m-%d").or_else(|_| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
    };
    parsed.map_err(|_| EngineError::Compute(format!("Invalid date: {text}")))
}

/// Rows of a date window: dates plus the selected value columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub date_column: String,
    pub dates: Vec<NaiveDateTime>,
    pub columns: Vec<(String, Vec<Option<f64>>)>,
}

impl Frame {
    /// Select rows whose date falls in `[start, end]` (calendar days,
    /// inclusive). Rows with an unreadable date are skipped. The date column
    /// is never a value column.
    pub fn select(
        table: &Table,
        date_column: &str,
        start: &str,
        end: &str,
        value_columns: &[String],
    ) -> Result<Self, EngineError> {
        let start = parse_bound(start)?;
        let end = parse_bound(end)?;
        if start > end {
            return Err(EngineError::Compute("Start > End".into()));
        }
        let dates = table
            .column(date_column)
            .ok_or_else(|| EngineError::Compute(format!("\"{date_column}\" not found")))?;

        let mut sources = Vec::new();
        for name in value_columns.iter().filter(|c| *c != date_column) {
            let column = table
                .column(name)
                .ok_or_else(|| EngineError::Compute(format!("\"{name}\" not found")))?;
            sources.push(column);
        }

        let rows: Vec<(usize, NaiveDateTime)> = dates
            .cells
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.to_datetime().map(|dt| (i, dt)))
            .filter(|(_, dt)| (start..=end).contains(&dt.date()))
            .collect();

        let columns = sources
            .iter()
            .map(|col| {
                let values = rows.iter().map(|(i, _)| col.cells[*i].to_number()).collect();
                (col.name.clone(), values)
            })
            .collect();

        info!(rows = rows.len(), "rows selected");
        Ok(Self {
            date_column: date_column.to_string(),
            dates: rows.into_iter().map(|(_, dt)| dt).collect(),
            columns,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn values(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Apply zero replacement and outlier removal to every value column.
    pub fn filter(&mut self, options: FilterOptions) {
        for (_, values) in &mut self.columns {
            if options.replace_zero {
                for v in values.iter_mut() {
                    if *v == Some(0.0) {
                        *v = None;
                    }
                }
            }
            if let Some(rule) = options.outliers {
                remove_outliers(values, rule);
            }
        }
    }

    /// Stable sort of all rows by date.
    pub fn sort_by_date(&mut self) {
        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);
        self.dates = order.iter().map(|&i| self.dates[i]).collect();
        for (_, values) in &mut self.columns {
            *values = order.iter().map(|&i| values[i]).collect();
        }
    }

    /// Append the rows of `other`; columns are matched by name.
    pub fn append(&mut self, other: Frame) {
        if self.columns.is_empty() && self.dates.is_empty() {
            *self = other;
            return;
        }
        let added = other.len();
        self.dates.extend(other.dates);
        for (name, values) in &mut self.columns {
            match other.columns.iter().find(|(n, _)| n == name) {
                Some((_, extra)) => values.extend_from_slice(extra),
                None => values.extend(std::iter::repeat(None).take(added)),
            }
        }
    }
}

fn remove_outliers(values: &mut [Option<f64>], rule: OutlierRule) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return;
    }
    match rule {
        OutlierRule::ZScore(threshold) => {
            let Some(mean) = stats::mean(values) else {
                return;
            };
            let sd = stats::std_dev(&present, 0);
            if !(sd.is_finite() && sd > 0.0) {
                return;
            }
            for v in values.iter_mut() {
                if matches!(v, Some(x) if ((*x - mean) / sd).abs() > threshold) {
                    *v = None;
                }
            }
        }
        OutlierRule::Iqr(k) => {
            let mut sorted = present;
            sorted.sort_by(f64::total_cmp);
            let q1 = stats::quantile(&sorted, 0.25);
            let q3 = stats::quantile(&sorted, 0.75);
            let iqr = q3 - q1;
            let (lo, hi) = (q1 - k * iqr, q3 + k * iqr);
            for v in values.iter_mut() {
                if matches!(v, Some(x) if *x < lo || *x > hi) {
                    *v = None;
                }
            }
        }
    }
}
