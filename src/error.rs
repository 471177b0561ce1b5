//! Error taxonomy.
//!
//! Fatal errors (`ParseError`, `FileSystemError`) abort a run with
//! `success = false`. `AnalyzerError` is recoverable and always ends up as a
//! diagnostic. `RegistrationError` only happens while the registry is being
//! built, never during a parse.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The document could not be structured at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("document looks binary (NUL byte at offset {offset})")]
    Binary { offset: usize },
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

impl ParseError {
    /// Machine-readable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::TooLarge { .. } => "E_DOCUMENT_TOO_LARGE",
            ParseError::Binary { .. } => "E_DOCUMENT_BINARY",
            ParseError::InvalidUtf8(_) => "E_DOCUMENT_ENCODING",
        }
    }
}

/// The document could not be read.
#[derive(Error, Debug)]
#[error("cannot read {}: {source}", path.display())]
pub struct FileSystemError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A single analyzer failed. Always recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyzerError {
    #[error("{analyzer} failed: {message}")]
    Failed { analyzer: String, message: String },
    #[error("{analyzer} panicked: {message}")]
    Panicked { analyzer: String, message: String },
    #[error("{analyzer} timed out after {timeout_ms}ms")]
    TimedOut { analyzer: String, timeout_ms: u64 },
    #[error("{analyzer} was cancelled")]
    Cancelled { analyzer: String },
}

impl AnalyzerError {
    pub fn failed(analyzer: impl Into<String>, message: impl Into<String>) -> Self {
        AnalyzerError::Failed {
            analyzer: analyzer.into(),
            message: message.into(),
        }
    }

    /// Name of the analyzer that produced this error.
    pub fn analyzer(&self) -> &str {
        match self {
            AnalyzerError::Failed { analyzer, .. }
            | AnalyzerError::Panicked { analyzer, .. }
            | AnalyzerError::TimedOut { analyzer, .. }
            | AnalyzerError::Cancelled { analyzer } => analyzer,
        }
    }

    /// Machine-readable diagnostic code.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzerError::Failed { .. } => "W_ANALYZER_FAILED",
            AnalyzerError::Panicked { .. } => "W_ANALYZER_PANICKED",
            AnalyzerError::TimedOut { .. } => "W_ANALYZER_TIMEOUT",
            AnalyzerError::Cancelled { .. } => "W_ANALYZER_CANCELLED",
        }
    }
}

/// A malformed analyzer was offered to the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("analyzer name must not be empty")]
    EmptyName,
    #[error("invalid analyzer name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("an analyzer named {name:?} is already registered")]
    DuplicateName { name: String },
    #[error("analyzer {name:?} does not provide the {capability:?} capability")]
    MissingCapability { name: String, capability: String },
    #[error("analyzer {name:?} provides language context but {existing:?} already does")]
    DuplicateContextProvider { name: String, existing: String },
    #[error("analyzer {name:?} rejected its own configuration: {reason}")]
    Rejected { name: String, reason: String },
}

/// Internal pipeline misuse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("invalid pipeline transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyzer_error_accessors() {
        let err = AnalyzerError::TimedOut {
            analyzer: "TestingDetector".to_string(),
            timeout_ms: 50,
        };
        assert_eq!(err.analyzer(), "TestingDetector");
        assert_eq!(err.code(), "W_ANALYZER_TIMEOUT");
        assert_eq!(err.to_string(), "TestingDetector timed out after 50ms");
    }

    #[test]
    fn test_parse_error_codes() {
        let err = ParseError::TooLarge { size: 10, limit: 5 };
        assert_eq!(err.code(), "E_DOCUMENT_TOO_LARGE");
        assert!(err.to_string().contains("limit is 5"));
    }
}
