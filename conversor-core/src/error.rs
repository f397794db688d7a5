//! Conversion errors
//!
//! `ConvertError` is what the catalog and engine return. `ErrorReport` is
//! its structured, serializable form for callers that hand errors to a
//! user or another program.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
    pub const INVALID_CONFIGURATION: &str = "INVALID_CONFIGURATION";
    pub const INTERNAL: &str = "INTERNAL";
}

/// Everything the catalog and the conversion engine can fail with.
///
/// All variants are raised synchronously by the call that detects them.
/// Nothing here is transient, so nothing is ever retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// Category absent from the catalog
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Unit absent from the given category
    #[error("Unknown unit '{unit}' in category '{category}'")]
    UnknownUnit { category: String, unit: String },

    /// Input is not a finite number
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Malformed catalog data
    #[error("Invalid catalog configuration: {0}")]
    InvalidConfiguration(String),
}

impl ConvertError {
    pub fn unknown_unit(category: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::UnknownUnit { category: category.into(), unit: unit.into() }
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfiguration(details.into())
    }

    /// True for a missing category or unit
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownCategory(_) | Self::UnknownUnit { .. })
    }

    /// Machine-readable code, one of [`codes`]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCategory(_) | Self::UnknownUnit { .. } => codes::NOT_FOUND,
            Self::InvalidValue(_) => codes::INVALID_VALUE,
            Self::InvalidConfiguration(_) => codes::INVALID_CONFIGURATION,
        }
    }
}

/// Severity level of an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The call failed; the caller can correct its input and try again
    Error,
    /// The catalog itself is unusable for the affected category
    Fatal,
}

/// Structured error for presentation layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Suggestion for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,

    pub severity: Severity,
}

impl ErrorReport {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            severity: Severity::Error,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: set severity
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorReport {}

impl From<&ConvertError> for ErrorReport {
    fn from(err: &ConvertError) -> Self {
        let report = Self::new(err.code(), err.to_string());
        match err {
            ConvertError::UnknownCategory(_) => report
                .with_suggestion("Use list_categories to see the available categories"),
            ConvertError::UnknownUnit { category, .. } => report
                .with_suggestion(format!("Use list_units(\"{}\") to see the available units", category)),
            ConvertError::InvalidValue(_) => report
                .with_suggestion("Enter a finite decimal number such as 12.5"),
            ConvertError::InvalidConfiguration(_) => report
                .with_suggestion("Fix the catalog file and restart")
                .with_severity(Severity::Fatal),
        }
    }
}

impl From<ConvertError> for ErrorReport {
    fn from(err: ConvertError) -> Self {
        Self::from(&err)
    }
}
