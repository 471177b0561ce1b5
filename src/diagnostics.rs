//! Diagnostics surfaced to the caller.
//!
//! Every analyzer failure and every anomaly found while parsing or
//! aggregating becomes exactly one `Diagnostic`. The collector classifies them
//! into errors, warnings and informational notes and mirrors each one as a
//! structured tracing event.

use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, ParseError};

/// Severity levels for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Whether diagnostics of this severity land in `ParseResult::errors`.
    pub fn is_error(&self) -> bool {
        matches!(self, Severity::Error | Severity::Critical)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// What a diagnostic is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "parse")]
    Parse,
    #[serde(rename = "analyzer")]
    Analyzer,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "conflict")]
    Conflict,
    #[serde(rename = "low_confidence")]
    LowConfidence,
    #[serde(rename = "aggregation")]
    Aggregation,
    #[serde(rename = "cancellation")]
    Cancellation,
}

impl DiagnosticCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCategory::Input => "input",
            DiagnosticCategory::Parse => "parse",
            DiagnosticCategory::Analyzer => "analyzer",
            DiagnosticCategory::Timeout => "timeout",
            DiagnosticCategory::Conflict => "conflict",
            DiagnosticCategory::LowConfidence => "low_confidence",
            DiagnosticCategory::Aggregation => "aggregation",
            DiagnosticCategory::Cancellation => "cancellation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(DiagnosticCategory::Input),
            "parse" => Some(DiagnosticCategory::Parse),
            "analyzer" => Some(DiagnosticCategory::Analyzer),
            "timeout" => Some(DiagnosticCategory::Timeout),
            "conflict" => Some(DiagnosticCategory::Conflict),
            "low_confidence" => Some(DiagnosticCategory::LowConfidence),
            "aggregation" => Some(DiagnosticCategory::Aggregation),
            "cancellation" => Some(DiagnosticCategory::Cancellation),
            _ => None,
        }
    }
}

impl std::fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ranked, non-authoritative alternative attached to a diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    pub reason: String,
    pub score: f64,
}

/// A warning or error surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub category: DiagnosticCategory,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Suggestion>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        category: DiagnosticCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            code: code.into(),
            message: message.into(),
            analyzer: None,
            line: None,
            remediation: Vec::new(),
            alternatives: Vec::new(),
        }
    }

    pub fn warning(
        category: DiagnosticCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, category, code, message)
    }

    pub fn info(
        category: DiagnosticCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, category, code, message)
    }

    pub fn with_analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_remediation(mut self, hint: impl Into<String>) -> Self {
        self.remediation.push(hint.into());
        self
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Suggestion>) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// Build the diagnostic for a fatal parse error.
    pub fn from_parse_error(err: &ParseError) -> Self {
        let diag = Diagnostic::new(
            Severity::Critical,
            DiagnosticCategory::Parse,
            err.code(),
            format!("document could not be parsed: {}", err),
        );
        match err {
            ParseError::TooLarge { .. } => {
                diag.with_remediation("raise max_document_bytes in the configuration")
            }
            ParseError::Binary { .. } | ParseError::InvalidUtf8(_) => {
                diag.with_remediation("make sure the input is a UTF-8 Markdown document")
            }
        }
    }

    /// Build the diagnostic for an isolated analyzer failure.
    ///
    /// Analyzer failures are recoverable, so they are warnings.
    pub fn from_analyzer_error(err: &AnalyzerError) -> Self {
        let category = match err {
            AnalyzerError::TimedOut { .. } => DiagnosticCategory::Timeout,
            AnalyzerError::Cancelled { .. } => DiagnosticCategory::Cancellation,
            _ => DiagnosticCategory::Analyzer,
        };
        let diag = Diagnostic::warning(category, err.code(), err.to_string())
            .with_analyzer(err.analyzer());
        match err {
            AnalyzerError::TimedOut { .. } => diag
                .with_remediation("raise analyzer_timeout_ms in the configuration")
                .with_remediation(format!(
                    "disable {} via disabled_analyzers if it is not needed",
                    err.analyzer()
                )),
            AnalyzerError::Panicked { .. } => diag.with_remediation(format!(
                "{} hit an internal error; its findings were dropped",
                err.analyzer()
            )),
            AnalyzerError::Failed { .. } => {
                diag.with_remediation("results for this category are empty; review them manually")
            }
            AnalyzerError::Cancelled { .. } => diag,
        }
    }

    /// Emit this diagnostic as a structured log event.
    pub fn emit(&self) {
        let analyzer = self.analyzer.as_deref().unwrap_or("-");
        match self.severity {
            Severity::Critical | Severity::Error => tracing::error!(
                code = %self.code,
                category = %self.category,
                analyzer,
                "{}",
                self.message
            ),
            Severity::Warning => tracing::warn!(
                code = %self.code,
                category = %self.category,
                analyzer,
                "{}",
                self.message
            ),
            Severity::Info => tracing::debug!(
                code = %self.code,
                category = %self.category,
                analyzer,
                "{}",
                self.message
            ),
        }
    }
}

/// Accumulates diagnostics for one run.
#[derive(Debug, Default)]
pub struct DiagnosticsCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic and log it.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for d in diagnostics {
            self.push(d);
        }
    }

    pub fn record_analyzer_failure(&mut self, err: &AnalyzerError) {
        self.push(Diagnostic::from_analyzer_error(err));
    }

    pub fn record_parse_error(&mut self, err: &ParseError) {
        self.push(Diagnostic::from_parse_error(err));
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Check if any error-or-worse diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Split into (errors, warnings, info), preserving insertion order.
    pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>, Vec<Diagnostic>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut info = Vec::new();
        for d in self.diagnostics {
            match d.severity {
                Severity::Critical | Severity::Error => errors.push(d),
                Severity::Warning => warnings.push(d),
                Severity::Info => info.push(d),
            }
        }
        (errors, warnings, info)
    }
}
