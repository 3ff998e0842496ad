//! Column schema returned by a load.
//!
//! The front end never sees rows, only the ordered column names. One of them
//! is the date column (compared case-insensitively with "date"); the others
//! are value columns.

use crate::constants::DATE_COLUMN;

/// Ordered column names of the loaded dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<String>,
}

impl ColumnSchema {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Every column, in load order. This is what date selectors offer.
    #[must_use]
    pub fn all(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether `name` is the date column by name.
    #[must_use]
    pub fn is_date_name(name: &str) -> bool {
        name.eq_ignore_ascii_case("date")
    }

    /// Columns offered by value selectors: everything except the date column.
    #[must_use]
    pub fn value_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| !Self::is_date_name(c))
            .collect()
    }

    /// Default for the date selector: the literal `Date` when present,
    /// otherwise the first column.
    #[must_use]
    pub fn default_date_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.as_str() == DATE_COLUMN)
            .or_else(|| self.columns.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Whether `name` may be picked in a value selector.
    #[must_use]
    pub fn is_value_column(&self, name: &str) -> bool {
        !Self::is_date_name(name) && self.contains(name)
    }
}
