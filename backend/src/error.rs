//! Error types for the dashboard pipeline.
//!
//! - [`DecodeError`] - the uploaded payload could not be turned into tables
//! - [`TransformError`] - one sheet could not be turned into series
//! - [`RegistryError`] - the rule/label configuration is unusable
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors while decoding an uploaded file into observation tables.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The payload has no bytes at all.
    #[error("Uploaded file is empty")]
    Empty,

    /// Neither a spreadsheet nor readable delimited text.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Text could not be decoded.
    #[error("Failed to decode text: {0}")]
    Encoding(String),

    /// Malformed delimited text.
    #[error("Invalid CSV: {0}")]
    Csv(String),

    /// The spreadsheet container could not be read.
    #[error("Invalid spreadsheet: {0}")]
    Spreadsheet(String),

    /// No header row found.
    #[error("No headers found")]
    NoHeaders,
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors from the category transform engine.
///
/// These are per-sheet: a batch keeps going when one sheet fails.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// A column the selected rule depends on is absent.
    #[error("Sheet '{table}' is missing column '{column}'")]
    MissingColumn { table: String, column: String },

    /// No rule is registered for the category.
    #[error("No rule registered for category '{0}'")]
    UnknownCategory(String),

    /// Nothing was left to chart after filtering.
    #[error("No rows left to chart for category '{0}'")]
    EmptyResult(String),

    /// A value cell held text that is not a number.
    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors while building the rule registry or label lookup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The same code fragment was given two labels.
    #[error("Label code '{code}' defined twice ('{first}' and '{second}')")]
    DuplicateLabel {
        code: String,
        first: String,
        second: String,
    },

    /// Two rules claim the same category.
    #[error("Category '{0}' has more than one rule")]
    DuplicateCategory(String),

    /// A rule is internally inconsistent.
    #[error("Invalid rule for category '{category}': {message}")]
    InvalidRule { category: String, message: String },

    /// The configuration does not match the schema.
    #[error("Configuration failed validation: {}", .0.join("; "))]
    Schema(Vec<String>),

    /// IO error.
    #[error("Registry IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Registry JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level orchestration errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upload could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Configuration error.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Unrecognised option value.
    #[error("Invalid option: {0}")]
    InvalidOption(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let decode_err = DecodeError::Empty;
        let pipeline_err: PipelineError = decode_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let registry_err = RegistryError::DuplicateCategory("emission".into());
        let pipeline_err: PipelineError = registry_err.into();
        assert!(pipeline_err.to_string().contains("emission"));
    }

    #[test]
    fn test_duplicate_label_format() {
        let err = RegistryError::DuplicateLabel {
            code: "ELC".into(),
            first: "Electricity".into(),
            second: "Electric Cars".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ELC"));
        assert!(msg.contains("Electric Cars"));
    }

    #[test]
    fn test_schema_error_joins_messages() {
        let err = RegistryError::Schema(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Configuration failed validation: a; b");
    }
}
