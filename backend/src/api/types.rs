//! Report types for a presentation layer.
//!
//! A [`DashboardReport`] is everything a dashboard needs after an upload:
//! the charts, a status line, and what happened to each sheet. Serialized
//! camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TransformError;
use crate::models::{SourceFormat, Workbook};
use crate::transform::pipeline::{failure_message, BatchResult, Chart, SheetOutcome};

pub const MESSAGE_SUCCESS: &str = "Data uploaded successfully.";
pub const MESSAGE_NO_DATA: &str = "No data available.";

/// Overall outcome of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// Every sheet with a rule was charted
    Ready,
    /// Some charts, some failed sheets
    Partial,
    /// Nothing to chart
    Empty,
    /// Nothing charted because of an error
    Error,
}

/// Where the data came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub file_name: Option<String>,
    pub format: SourceFormat,
    pub sheets: Vec<String>,
}

impl SourceInfo {
    pub fn from_workbook(file_name: Option<&str>, workbook: &Workbook) -> Self {
        Self {
            file_name: file_name.map(String::from),
            format: workbook.format.clone(),
            sheets: workbook.sheet_names().into_iter().map(String::from).collect(),
        }
    }
}

/// Per-sheet line of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetStatus {
    pub sheet: String,
    /// "charted", "skipped" or "failed"
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub series_count: usize,
}

/// Response handed to the presentation layer after an upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub report_id: String,
    pub generated_at: DateTime<Utc>,
    pub status: ReportStatus,
    /// Human-readable status line
    pub message: String,
    pub source: Option<SourceInfo>,
    pub charts: Vec<Chart>,
    pub sheets: Vec<SheetStatus>,
}

impl DashboardReport {
    fn new(status: ReportStatus, message: String) -> Self {
        Self {
            report_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            status,
            message,
            source: None,
            charts: Vec::new(),
            sheets: Vec::new(),
        }
    }

    /// Build the report for a transformed upload.
    pub fn from_batch(source: SourceInfo, batch: BatchResult) -> Self {
        let sheets: Vec<SheetStatus> = batch.sheets.iter().map(sheet_status).collect();

        let has_charts = batch.chart_count() > 0;
        // EmptyResult means the sheet had nothing to chart, not that it broke
        let first_error = batch
            .failures()
            .map(|(_, e)| e)
            .find(|e| !matches!(e, TransformError::EmptyResult(_)))
            .cloned();

        let (status, message) = match (has_charts, first_error) {
            (true, None) => (ReportStatus::Ready, MESSAGE_SUCCESS.to_string()),
            (true, Some(_)) => (ReportStatus::Partial, MESSAGE_SUCCESS.to_string()),
            (false, Some(e)) => (ReportStatus::Error, failure_message(&e)),
            (false, None) => (ReportStatus::Empty, MESSAGE_NO_DATA.to_string()),
        };

        let mut report = Self::new(status, message);
        report.source = Some(source);
        report.charts = batch.into_charts();
        report.sheets = sheets;
        report
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ReportStatus::Ready | ReportStatus::Partial)
    }
}

fn sheet_status(result: &crate::transform::pipeline::SheetResult) -> SheetStatus {
    let (status, detail, series_count) = match &result.outcome {
        SheetOutcome::Charted(chart) => ("charted", None, chart.series.len()),
        SheetOutcome::Skipped { reason } => ("skipped", Some(reason.clone()), 0),
        SheetOutcome::Failed { error } => ("failed", Some(error.to_string()), 0),
    };
    SheetStatus {
        sheet: result.sheet.clone(),
        status: status.to_string(),
        detail,
        series_count,
    }
}

/// Create an error report: no charts, message as given.
pub fn error_report(message: &str) -> DashboardReport {
    DashboardReport::new(ReportStatus::Error, message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartShape, Series, SeriesPoint};
    use crate::rules::ChartSpec;
    use crate::transform::pipeline::SheetResult;

    fn source() -> SourceInfo {
        SourceInfo {
            file_name: Some("results.xlsx".into()),
            format: SourceFormat::Xlsx,
            sheets: vec!["emission".into(), "eleccap".into()],
        }
    }

    fn charted(sheet: &str) -> SheetResult {
        SheetResult {
            sheet: sheet.into(),
            outcome: SheetOutcome::Charted(Chart {
                category: sheet.into(),
                spec: ChartSpec::new(ChartShape::Line, "Emissions"),
                unit_scale: None,
                series: vec![Series {
                    key: "ELC".into(),
                    label: "Electricity".into(),
                    scenario: None,
                    shape: ChartShape::Line,
                    points: vec![SeriesPoint { period: 2020, value: 8.0 }],
                }],
            }),
        }
    }

    fn failed(sheet: &str, error: TransformError) -> SheetResult {
        SheetResult {
            sheet: sheet.into(),
            outcome: SheetOutcome::Failed { error },
        }
    }

    #[test]
    fn test_ready_report() {
        let batch = BatchResult {
            sheets: vec![charted("emission")],
        };
        let report = DashboardReport::from_batch(source(), batch);

        assert_eq!(report.status, ReportStatus::Ready);
        assert_eq!(report.message, "Data uploaded successfully.");
        assert_eq!(report.sheets[0].status, "charted");
        assert_eq!(report.sheets[0].series_count, 1);
        assert!(report.is_success());
    }

    #[test]
    fn test_partial_report() {
        let batch = BatchResult {
            sheets: vec![
                charted("emission"),
                failed(
                    "eleccap",
                    TransformError::MissingColumn {
                        table: "eleccap".into(),
                        column: "Pv".into(),
                    },
                ),
            ],
        };
        let report = DashboardReport::from_batch(source(), batch);

        assert_eq!(report.status, ReportStatus::Partial);
        assert_eq!(report.charts.len(), 1);
        assert_eq!(report.sheets[1].status, "failed");
        assert!(report.sheets[1].detail.as_deref().unwrap().contains("Pv"));
    }

    #[test]
    fn test_error_report_when_nothing_charted() {
        let batch = BatchResult {
            sheets: vec![failed(
                "eleccap",
                TransformError::MissingColumn {
                    table: "eleccap".into(),
                    column: "Period".into(),
                },
            )],
        };
        let report = DashboardReport::from_batch(source(), batch);

        assert_eq!(report.status, ReportStatus::Error);
        assert!(report
            .message
            .starts_with("An error occurred while processing the data: "));
        assert!(report.charts.is_empty());
    }

    #[test]
    fn test_empty_result_reads_as_no_data() {
        let batch = BatchResult {
            sheets: vec![failed("eleccap", TransformError::EmptyResult("eleccap".into()))],
        };
        let report = DashboardReport::from_batch(source(), batch);

        assert_eq!(report.status, ReportStatus::Empty);
        assert_eq!(report.message, "No data available.");
    }

    #[test]
    fn test_error_report_json() {
        let report = error_report("An error occurred while processing the data: boom");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "error");
        assert_eq!(json["charts"], serde_json::json!([]));
        assert!(json["reportId"].is_string());
        assert!(json["generatedAt"].is_string());
        assert!(json["source"].is_null());
    }
}
