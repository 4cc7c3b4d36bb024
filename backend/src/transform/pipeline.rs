//! High-level pipeline: upload bytes to dashboard charts.
//!
//! Combines decoding, the per-sheet transform engine and report building.
//! Each sheet is transformed independently; one bad sheet never aborts the
//! rest of the upload.
//!
//! # Example
//!
//! ```rust,ignore
//! use timesdash::transform::{run_dashboard, TransformOptions};
//! use timesdash::rules::RuleRegistry;
//!
//! let bytes = std::fs::read("results.xlsx")?;
//! let report = run_dashboard(
//!     &bytes,
//!     Some("results.xlsx"),
//!     RuleRegistry::builtin(),
//!     &TransformOptions::default(),
//! );
//! println!("{} ({} charts)", report.message, report.charts.len());
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::engine::{Engine, TransformOptions, UnitScale};
use crate::api::logs::{
    log_error, log_error_indent, log_info, log_info_indent, log_success, log_success_indent,
    log_warning, log_warning_indent,
};
use crate::api::types::{error_report, DashboardReport, ReportStatus, SourceInfo};
use crate::error::{PipelineResult, TransformError};
use crate::models::{ObservationTable, Series, Workbook};
use crate::parser::{parse_bytes_auto, DEFAULT_SHEET_NAME};
use crate::rules::{ChartSpec, RuleRegistry};

/// Prefix of every user-visible failure message.
pub const ERROR_PREFIX: &str = "An error occurred while processing the data";

/// One chart: a category's series plus how to draw them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub category: String,
    pub spec: ChartSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_scale: Option<UnitScale>,
    pub series: Vec<Series>,
}

/// What happened to one sheet of an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetOutcome {
    /// Transformed into a chart.
    Charted(Chart),
    /// No rule for this sheet; left alone.
    Skipped { reason: String },
    /// A rule exists but the sheet could not be charted.
    Failed { error: TransformError },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetResult {
    pub sheet: String,
    pub outcome: SheetOutcome,
}

/// Per-sheet outcomes of one upload, in workbook order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    pub sheets: Vec<SheetResult>,
}

impl BatchResult {
    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.sheets.iter().filter_map(|s| match &s.outcome {
            SheetOutcome::Charted(chart) => Some(chart),
            _ => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &TransformError)> {
        self.sheets.iter().filter_map(|s| match &s.outcome {
            SheetOutcome::Failed { error } => Some((s.sheet.as_str(), error)),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().filter_map(|s| match &s.outcome {
            SheetOutcome::Skipped { .. } => Some(s.sheet.as_str()),
            _ => None,
        })
    }

    pub fn chart_count(&self) -> usize {
        self.charts().count()
    }

    pub fn into_charts(self) -> Vec<Chart> {
        self.sheets
            .into_iter()
            .filter_map(|s| match s.outcome {
                SheetOutcome::Charted(chart) => Some(chart),
                _ => None,
            })
            .collect()
    }
}

/// A decoded and transformed upload.
#[derive(Debug, Clone)]
pub struct Processed {
    pub source: SourceInfo,
    pub batch: BatchResult,
}

/// Transform one table, treating its name as the category.
pub fn transform_table(
    table: &ObservationTable,
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> SheetOutcome {
    let category = table.name.trim();
    let rule = match registry.get(category) {
        Some(rule) => rule,
        None => {
            return SheetOutcome::Skipped {
                reason: TransformError::UnknownCategory(category.to_string()).to_string(),
            }
        }
    };

    match Engine::new(registry).transform(table, category, options) {
        Ok(series) => SheetOutcome::Charted(Chart {
            category: rule.category.clone(),
            spec: rule.chart.clone(),
            unit_scale: options.unit_scale,
            series,
        }),
        Err(TransformError::UnknownCategory(c)) => SheetOutcome::Skipped {
            reason: TransformError::UnknownCategory(c).to_string(),
        },
        Err(error) => SheetOutcome::Failed { error },
    }
}

/// Transform every table, logging progress.
pub fn transform_tables(
    tables: &[ObservationTable],
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> BatchResult {
    let mut sheets = Vec::with_capacity(tables.len());

    for table in tables {
        log_info(format!("Sheet '{}'", table.name));
        let outcome = transform_table(table, registry, options);

        match &outcome {
            SheetOutcome::Charted(chart) => {
                log_success_indent(format!("{} series", chart.series.len()), 1)
            }
            SheetOutcome::Skipped { reason } => {
                log_warning_indent(format!("Skipped: {}", reason), 1)
            }
            SheetOutcome::Failed { error } => log_error_indent(error.to_string(), 1),
        }

        sheets.push(SheetResult {
            sheet: table.name.clone(),
            outcome,
        });
    }

    BatchResult { sheets }
}

/// Transform every sheet of a workbook.
pub fn transform_workbook(
    workbook: &Workbook,
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> BatchResult {
    transform_tables(&workbook.tables, registry, options)
}

/// Decode an upload and transform all of its sheets.
pub fn process_bytes(
    bytes: &[u8],
    file_name: Option<&str>,
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> PipelineResult<Processed> {
    log_info(format!(
        "Reading {}...",
        file_name.unwrap_or(DEFAULT_SHEET_NAME)
    ));
    let workbook = parse_bytes_auto(bytes, file_name)?;
    log_success(format!(
        "Decoded {} sheet(s): {}",
        workbook.tables.len(),
        workbook.sheet_names().join(", ")
    ));
    for table in &workbook.tables {
        log_info_indent(
            format!("{}: {} rows, columns: {}", table.name, table.len(), table.columns.join(", ")),
            1,
        );
    }

    let batch = transform_workbook(&workbook, registry, options);
    let source = SourceInfo::from_workbook(file_name, &workbook);

    Ok(Processed { source, batch })
}

/// Decode, transform and report. Never fails: any error becomes a report
/// with an empty chart set and a readable message.
pub fn run_dashboard(
    bytes: &[u8],
    file_name: Option<&str>,
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> DashboardReport {
    match process_bytes(bytes, file_name, registry, options) {
        Ok(processed) => {
            let report = DashboardReport::from_batch(processed.source, processed.batch);
            match report.status {
                ReportStatus::Ready => log_success(report.message.clone()),
                ReportStatus::Partial | ReportStatus::Empty => log_warning(report.message.clone()),
                ReportStatus::Error => log_error(report.message.clone()),
            }
            report
        }
        Err(e) => {
            log_error(e.to_string());
            error_report(&failure_message(&e))
        }
    }
}

/// Path-based [`run_dashboard`]; a file that cannot be read is reported the same way.
pub fn transform_file(
    path: impl AsRef<Path>,
    registry: &RuleRegistry,
    options: &TransformOptions,
) -> DashboardReport {
    let path = path.as_ref();
    let file_name = path.file_name().and_then(|n| n.to_str());

    match std::fs::read(path) {
        Ok(bytes) => run_dashboard(&bytes, file_name, registry, options),
        Err(e) => {
            log_error(format!("{}: {}", path.display(), e));
            error_report(&failure_message(&e))
        }
    }
}

/// `"An error occurred while processing the data: <detail>"`
pub fn failure_message(detail: &impl std::fmt::Display) -> String {
    format!("{}: {}", ERROR_PREFIX, detail)
}
