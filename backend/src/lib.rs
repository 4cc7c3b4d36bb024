//! # Timesdash - TIMES model output to dashboard charts
//!
//! Timesdash reads the result workbook of a TIMES energy-system model run and
//! turns each known output sheet (emissions, carbon price, electricity
//! capacity and generation, sector energy mixes) into chart-ready series.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLSX / CSV  │────▶│   Parser    │────▶│  Transform  │────▶│   Report    │
//! │  (upload)   │     │ (per sheet) │     │ (rule/sheet)│     │  (charts)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                               ▲
//!                                         ┌─────┴─────┐
//!                                         │   Rules   │
//!                                         │ + labels  │
//!                                         └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use timesdash::{run_dashboard, RuleRegistry, TransformOptions};
//!
//! let bytes = std::fs::read("results.xlsx").unwrap();
//! let report = run_dashboard(&bytes, Some("results.xlsx"), RuleRegistry::builtin(), &TransformOptions::default());
//! println!("{}: {} charts", report.message, report.charts.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, tables, workbooks and series
//! - [`parser`] - Spreadsheet and CSV decoding with auto-detection
//! - [`rules`] - Category rules, labels and the rule registry
//! - [`transform`] - Engine, scenario grouping and pipeline
//! - [`validation`] - Rule configuration schema validation
//! - [`api`] - Report types and log stream

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Rules
pub mod rules;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Presentation-facing API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    DecodeError, DecodeResult, PipelineError, PipelineResult, RegistryError, RegistryResult,
    TransformError, TransformResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CellValue, ChartShape, ObservationTable, Series, SeriesPoint, SourceFormat, Workbook,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, detect_format, parse_bytes_auto,
    parse_csv_str, parse_file_auto, parse_spreadsheet, FileKind,
};

// =============================================================================
// Re-exports - Rules
// =============================================================================

pub use rules::{
    Aggregation, CategoryRule, ChartSpec, KeyDerivation, LabelTable, PeriodFilter, RowFilter,
    RuleRegistry, RulesConfig,
};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{
    group_series, list_scenarios, process_bytes, run_dashboard, transform, transform_file,
    transform_workbook, BatchResult, Chart, Engine, SheetOutcome, TransformOptions, UnitScale,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, validate, validate_rules_config};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_report, DashboardReport, ReportStatus, SheetStatus, SourceInfo};
