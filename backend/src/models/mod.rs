//! Domain models for the dashboard pipeline.
//!
//! - [`CellValue`] - one spreadsheet cell (text, number or missing)
//! - [`ObservationTable`] - one sheet of model output
//! - [`Workbook`] - every sheet decoded from one upload
//! - [`Series`] - chart-ready output of the transform engine
//! - [`ChartShape`] - how a presentation layer should draw a series

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Column Names
// =============================================================================

/// Category code column (e.g. `ELCCO2`, `RESHOUSE`).
pub const COMMODITY: &str = "Commodity";
/// Model period column (a year).
pub const PERIOD: &str = "Period";
/// Value column.
pub const VALUE: &str = "Pv";
/// Time-slice discriminator (e.g. `ANNUAL`).
pub const TIMESLICE: &str = "Timeslice";
/// Scenario discriminator.
pub const SCENARIO: &str = "Scenario";

// =============================================================================
// Cells
// =============================================================================

/// A single cell of an observation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Missing,
}

impl CellValue {
    /// Build a cell from raw text: empty becomes missing, numbers become numbers.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Text content, if this is a text cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric content. Text is accepted when it parses as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            CellValue::Missing => None,
        }
    }

    /// Integer year, if the cell holds a whole number.
    pub fn as_period(&self) -> Option<i32> {
        let n = self.as_f64()?;
        if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
            return None;
        }
        Some(n as i32)
    }

    /// Cell rendered as a key string (used for category codes and scenarios).
    pub fn to_key(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Missing => None,
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

/// One row: column name to cell.
pub type Row = BTreeMap<String, CellValue>;

static MISSING: CellValue = CellValue::Missing;

/// A named table of observations, one per uploaded sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ObservationTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from a header and string records, as read from delimited text.
    ///
    /// Short records are padded with missing cells; extra fields are ignored.
    pub fn from_records<S: AsRef<str>>(
        name: impl Into<String>,
        headers: Vec<String>,
        records: &[Vec<S>],
    ) -> Self {
        let mut table = Self::new(name, headers);
        for record in records {
            let row = table
                .columns
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let cell = record
                        .get(i)
                        .map(|raw| CellValue::from_text(raw.as_ref()))
                        .unwrap_or(CellValue::Missing);
                    (column.clone(), cell)
                })
                .collect();
            table.rows.push(row);
        }
        table
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Cell at `row`/`column`, missing when either is out of range.
    pub fn get(&self, row: usize, column: &str) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&MISSING)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// How the upload was encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFormat {
    Csv { encoding: String, delimiter: char },
    Xlsx,
    Xlsb,
    Xls,
    Ods,
}

/// Every sheet decoded from one upload, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub format: SourceFormat,
    pub tables: Vec<ObservationTable>,
}

impl Workbook {
    pub fn sheet_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&ObservationTable> {
        self.tables.iter().find(|t| t.name == name)
    }
}

// =============================================================================
// Series
// =============================================================================

/// Drawing hint attached to a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartShape {
    Line,
    StackedBar,
    Bar,
    Scatter,
    Pie,
}

/// One aggregated observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: i32,
    pub value: f64,
}

/// A chart-ready series: one derived key, ordered by period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Derived grouping key (e.g. `ELC`).
    pub key: String,
    /// Display label resolved from the label lookup.
    pub label: String,
    /// Scenario the series belongs to, when the table had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    pub shape: ChartShape,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn periods(&self) -> Vec<i32> {
        self.points.iter().map(|p| p.period).collect()
    }

    /// Value at `period`, if present.
    pub fn value_at(&self, period: i32) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.period == period)
            .map(|p| p.value)
    }

    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }
}
