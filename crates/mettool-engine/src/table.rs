//! In-memory column table: the dataset handle held by the engine.

use chrono::{NaiveDate, NaiveDateTime};

/// One spreadsheet cell after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl Cell {
    /// Numeric coercion: numbers pass, numeric text is parsed, anything
    /// else is missing.
    #[must_use]
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) if v.is_finite() => Some(*v),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Self::Number(_) | Self::Empty | Self::Date(_) => None,
        }
    }

    /// Date coercion: date cells pass, ISO and day-first text is parsed,
    /// anything else is missing.
    #[must_use]
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(dt) => Some(*dt),
            Self::Text(s) => parse_datetime_text(s),
            Self::Number(_) | Self::Empty => None,
        }
    }

    /// Header text for this cell; `None` when the header is blank.
    #[must_use]
    pub fn header_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.clone()),
            Self::Number(v) => Some(format_number(*v)),
            Self::Date(dt) => Some(format_datetime(*dt)),
        }
    }
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// `YYYY-MM-DD`, with the time appended only when it is not midnight.
#[must_use]
pub fn format_datetime(dt: NaiveDateTime) -> String {
    if dt.time() == chrono::NaiveTime::MIN {
        dt.format("%Y-%m-%d").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    /// Fraction of empty cells.
    fn missing_fraction(&self) -> f64 {
        if self.cells.is_empty() {
            return 0.0;
        }
        let missing = self.cells.iter().filter(|c| **c == Cell::Empty).count();
        ratio(missing, self.cells.len())
    }

    /// Fraction of zero cells; counted only when every present cell is numeric.
    fn zero_fraction(&self) -> f64 {
        let numeric = self
            .cells
            .iter()
            .all(|c| matches!(c, Cell::Number(_) | Cell::Empty));
        if !numeric || self.cells.is_empty() {
            return 0.0;
        }
        let zeros = self
            .cells
            .iter()
            .filter(|c| matches!(c, Cell::Number(v) if *v == 0.0))
            .count();
        ratio(zeros, self.cells.len())
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}

/// Rectangular table; every column has `height` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    height: usize,
}

impl Table {
    /// Build from a header row and data rows. Short rows are padded with
    /// empty cells; blank headers become `Unnamed: <i>` and duplicates get a
    /// `.N` suffix.
    #[must_use]
    pub fn from_rows(header: &[Cell], rows: Vec<Vec<Cell>>) -> Self {
        let width = header.len();
        let mut names: Vec<String> = Vec::with_capacity(width);
        for (i, cell) in header.iter().enumerate() {
            let base = cell
                .header_text()
                .unwrap_or_else(|| format!("Unnamed: {i}"));
            let mut name = base.clone();
            let mut n = 1;
            while names.contains(&name) {
                name = format!("{base}.{n}");
                n += 1;
            }
            names.push(name);
        }

        let height = rows.len();
        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column {
                name,
                cells: Vec::with_capacity(height),
            })
            .collect();
        for row in rows {
            let mut row = row.into_iter();
            for column in &mut columns {
                column.cells.push(row.next().unwrap_or(Cell::Empty));
            }
        }
        Self { columns, height }
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the columns that survive junk removal: a column goes when
    /// its missing plus zero fraction reaches `threshold`. `keep` is never
    /// dropped.
    #[must_use]
    pub fn kept_columns(&self, threshold: f64, keep: &str) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.name == keep || c.missing_fraction() + c.zero_fraction() < threshold)
            .map(|c| c.name.clone())
            .collect()
    }
}
