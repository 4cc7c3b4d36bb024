//! Category rule definition
//!
//! A rule says how one output sheet becomes chart series: which rows to keep,
//! how to derive a grouping key from the category code, how to aggregate, and
//! how the result should be drawn.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::models::{CellValue, ChartShape, COMMODITY, PERIOD, VALUE};

/// Keep only rows whose `column` equals `equals`.
///
/// Tables without the column are left unfiltered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub equals: String,
}

impl RowFilter {
    pub fn new(column: &str, equals: &str) -> Self {
        Self {
            column: column.to_string(),
            equals: equals.to_string(),
        }
    }

    pub fn matches(&self, cell: &CellValue) -> bool {
        cell.to_key().as_deref() == Some(self.equals.as_str())
    }
}

/// Keep only periods evenly divisible by `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodFilter {
    #[serde(default = "default_interval")]
    pub interval: i32,
}

fn default_interval() -> i32 {
    5
}

impl Default for PeriodFilter {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

impl PeriodFilter {
    pub fn keeps(&self, period: i32) -> bool {
        self.interval > 0 && period.rem_euclid(self.interval) == 0
    }
}

/// How a grouping key is derived from a category code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyDerivation {
    /// First `n` characters (`ELCCO2` → `ELC`).
    FirstN { n: usize },

    /// Last `n` characters, after removing the first matching suffix
    /// (`RESHOUSE` with suffix `HOUSE` → `RES`).
    LastN {
        n: usize,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        strip_suffixes: Vec<String>,
    },

    /// First capture group of a regex (whole match if the pattern has no group).
    /// Codes that do not match are dropped.
    Capture {
        pattern: String,
        #[serde(skip)]
        compiled: OnceCell<Regex>,
    },

    /// One series for the whole sheet, keyed by the category name.
    Total,
}

impl KeyDerivation {
    pub fn first_n(n: usize) -> Self {
        KeyDerivation::FirstN { n }
    }

    pub fn last_n(n: usize) -> Self {
        KeyDerivation::LastN {
            n,
            strip_suffixes: Vec::new(),
        }
    }

    pub fn last_n_stripping(n: usize, suffixes: &[&str]) -> Self {
        KeyDerivation::LastN {
            n,
            strip_suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn capture(pattern: &str) -> Self {
        KeyDerivation::Capture {
            pattern: pattern.to_string(),
            compiled: OnceCell::new(),
        }
    }

    /// Whether the category code column is read at all.
    pub fn needs_code(&self) -> bool {
        !matches!(self, KeyDerivation::Total)
    }

    /// Derive the key for `code`. `None` drops the row.
    pub fn derive(&self, code: &str, category: &str) -> Option<String> {
        let key = match self {
            KeyDerivation::FirstN { n } => code.chars().take(*n).collect(),
            KeyDerivation::LastN { n, strip_suffixes } => {
                let stem = strip_suffixes
                    .iter()
                    .find(|suffix| !suffix.is_empty() && code.ends_with(suffix.as_str()))
                    .map(|suffix| &code[..code.len() - suffix.len()])
                    .unwrap_or(code);
                let count = stem.chars().count();
                stem.chars().skip(count.saturating_sub(*n)).collect()
            }
            KeyDerivation::Capture { pattern, compiled } => {
                let regex = compiled.get_or_try_init(|| Regex::new(pattern)).ok()?;
                let caps = regex.captures(code)?;
                caps.get(1).or_else(|| caps.get(0))?.as_str().to_string()
            }
            KeyDerivation::Total => category.to_string(),
        };

        if key.is_empty() {
            None
        } else {
            Some(key)
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            KeyDerivation::FirstN { n } | KeyDerivation::LastN { n, .. } if *n == 0 => {
                Err("key length must be at least 1".to_string())
            }
            KeyDerivation::Capture { pattern, compiled } => compiled
                .get_or_try_init(|| Regex::new(pattern))
                .map(|_| ())
                .map_err(|e| format!("invalid pattern: {}", e)),
            _ => Ok(()),
        }
    }
}

/// How values sharing a (key, period) are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Sum,
    Mean,
}

/// Drawing hint and axis text for a category's chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub shape: ChartShape,
    pub title: String,
    #[serde(default = "default_x_axis")]
    pub x_axis: String,
    #[serde(default)]
    pub y_axis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend_title: Option<String>,
}

fn default_x_axis() -> String {
    "Year".to_string()
}

impl ChartSpec {
    pub fn new(shape: ChartShape, title: &str) -> Self {
        Self {
            shape,
            title: title.to_string(),
            x_axis: default_x_axis(),
            y_axis: String::new(),
            legend_title: None,
        }
    }
}

/// Complete rule for one category (sheet name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_filter: Option<RowFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_filter: Option<PeriodFilter>,

    pub key: KeyDerivation,

    #[serde(default)]
    pub aggregation: Aggregation,

    #[serde(default = "default_value_column")]
    pub value_column: String,

    pub chart: ChartSpec,
}

fn default_value_column() -> String {
    VALUE.to_string()
}

impl CategoryRule {
    /// Create a rule with no filters, summing `Pv`, titled after the category.
    pub fn new(category: &str, key: KeyDerivation, shape: ChartShape) -> Self {
        Self {
            category: category.to_string(),
            row_filter: None,
            period_filter: None,
            key,
            aggregation: Aggregation::Sum,
            value_column: default_value_column(),
            chart: ChartSpec::new(shape, category),
        }
    }

    pub fn with_row_filter(mut self, filter: RowFilter) -> Self {
        self.row_filter = Some(filter);
        self
    }

    pub fn with_period_filter(mut self, filter: PeriodFilter) -> Self {
        self.period_filter = Some(filter);
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_chart(mut self, chart: ChartSpec) -> Self {
        self.chart = chart;
        self
    }

    /// Columns that must exist for this rule to run.
    ///
    /// The row filter's column is not listed: a table without it is simply
    /// left unfiltered.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns = Vec::with_capacity(3);
        if self.key.needs_code() {
            columns.push(COMMODITY);
        }
        columns.push(PERIOD);
        columns.push(self.value_column.as_str());
        columns
    }

    /// Check the rule is usable; compiles any regex.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |message: String| RegistryError::InvalidRule {
            category: self.category.clone(),
            message,
        };

        if self.category.trim().is_empty() {
            return Err(invalid("category name is empty".to_string()));
        }
        if let Some(filter) = &self.period_filter {
            if filter.interval < 1 {
                return Err(invalid(format!(
                    "period interval must be positive, got {}",
                    filter.interval
                )));
            }
        }
        self.key.validate().map_err(invalid)
    }
}
