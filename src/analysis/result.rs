//! One analyzer's output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::context::LanguageContext;
use crate::error::AnalyzerError;
use crate::score;

use super::{
    Command, EnvVar, Finding, FrameworkFinding, LanguageSummary, MetadataField, Package,
};

/// Category of `ProjectInfo` a payload contributes to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Languages,
    Commands,
    Dependencies,
    Testing,
    Metadata,
    Custom(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Languages => "languages",
            Category::Commands => "commands",
            Category::Dependencies => "dependencies",
            Category::Testing => "testing",
            Category::Metadata => "metadata",
            Category::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed payload, one variant per analyzer kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisPayload {
    Languages {
        contexts: Vec<LanguageContext>,
        summaries: Vec<LanguageSummary>,
        primary: Option<String>,
        frameworks: Vec<FrameworkFinding>,
        /// Code-block tags that matched no known language.
        unmatched: Vec<String>,
    },
    Commands {
        commands: Vec<Command>,
    },
    Dependencies {
        package_files: Vec<Finding>,
        packages: Vec<Package>,
        frameworks: Vec<FrameworkFinding>,
    },
    Testing {
        frameworks: Vec<Finding>,
        tools: Vec<Finding>,
        config_files: Vec<Finding>,
    },
    Metadata {
        name: Option<MetadataField>,
        description: Option<MetadataField>,
        license: Option<MetadataField>,
        repository: Option<MetadataField>,
        environment: Vec<EnvVar>,
        structure: Vec<Finding>,
    },
    Custom {
        category: String,
        findings: Vec<Finding>,
    },
}

impl AnalysisPayload {
    pub fn category(&self) -> Category {
        match self {
            AnalysisPayload::Languages { .. } => Category::Languages,
            AnalysisPayload::Commands { .. } => Category::Commands,
            AnalysisPayload::Dependencies { .. } => Category::Dependencies,
            AnalysisPayload::Testing { .. } => Category::Testing,
            AnalysisPayload::Metadata { .. } => Category::Metadata,
            AnalysisPayload::Custom { category, .. } => Category::Custom(category.clone()),
        }
    }

    /// Whether the payload carries no findings at all.
    pub fn is_empty(&self) -> bool {
        match self {
            AnalysisPayload::Languages {
                contexts,
                summaries,
                frameworks,
                unmatched,
                ..
            } => contexts.is_empty() && summaries.is_empty() && frameworks.is_empty() && unmatched.is_empty(),
            AnalysisPayload::Commands { commands } => commands.is_empty(),
            AnalysisPayload::Dependencies {
                package_files,
                packages,
                frameworks,
            } => package_files.is_empty() && packages.is_empty() && frameworks.is_empty(),
            AnalysisPayload::Testing {
                frameworks,
                tools,
                config_files,
            } => frameworks.is_empty() && tools.is_empty() && config_files.is_empty(),
            AnalysisPayload::Metadata {
                name,
                description,
                license,
                repository,
                environment,
                structure,
            } => {
                name.is_none()
                    && description.is_none()
                    && license.is_none()
                    && repository.is_none()
                    && environment.is_empty()
                    && structure.is_empty()
            }
            AnalysisPayload::Custom { findings, .. } => findings.is_empty(),
        }
    }
}

/// Output of a single analyzer run.
///
/// A successful result has a payload and a confidence; a failed one carries
/// only the typed error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    analyzer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<AnalysisPayload>,
    confidence: f64,
    sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<AnalyzerError>,
}

impl AnalysisResult {
    pub fn success(
        analyzer: impl Into<String>,
        payload: AnalysisPayload,
        confidence: f64,
        sources: Vec<String>,
    ) -> Self {
        Self {
            analyzer: analyzer.into(),
            payload: Some(payload),
            confidence: score::clamp_unit(confidence),
            sources,
            error: None,
        }
    }

    pub fn failure(error: AnalyzerError) -> Self {
        Self {
            analyzer: error.analyzer().to_string(),
            payload: None,
            confidence: 0.0,
            sources: Vec::new(),
            error: Some(error),
        }
    }

    pub fn analyzer(&self) -> &str {
        &self.analyzer
    }

    pub fn payload(&self) -> Option<&AnalysisPayload> {
        self.payload.as_ref()
    }

    pub fn into_payload(self) -> Option<AnalysisPayload> {
        self.payload
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn error(&self) -> Option<&AnalyzerError> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.payload.is_some()
    }

    pub fn category(&self) -> Option<Category> {
        self.payload.as_ref().map(|p| p.category())
    }

    /// Re-label a result with the name it was registered under.
    pub(crate) fn renamed(mut self, analyzer: &str) -> Self {
        if self.analyzer != analyzer {
            self.analyzer = analyzer.to_string();
        }
        self
    }
}

/// Count findings per category for logging.
pub fn payload_sizes(results: &[AnalysisResult]) -> BTreeMap<String, usize> {
    let mut sizes = BTreeMap::new();
    for r in results {
        if let Some(payload) = r.payload() {
            *sizes.entry(payload.category().to_string()).or_insert(0) += r.sources().len();
        }
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_clamps_confidence() {
        let result = AnalysisResult::success(
            "CommandExtractor",
            AnalysisPayload::Commands { commands: vec![] },
            1.7,
            vec![],
        );
        assert_eq!(result.confidence(), 1.0);
        assert!(result.is_success());
        assert_eq!(result.category(), Some(Category::Commands));
    }

    #[test]
    fn test_failure_has_no_payload() {
        let result = AnalysisResult::failure(AnalyzerError::failed("MetadataExtractor", "boom"));
        assert!(!result.is_success());
        assert!(result.payload().is_none());
        assert_eq!(result.analyzer(), "MetadataExtractor");
        assert_eq!(result.confidence(), 0.0);
    }

    #[test]
    fn test_language_summaries_count_as_findings() {
        let payload = AnalysisPayload::Languages {
            contexts: vec![],
            summaries: vec![LanguageSummary {
                name: "Go".to_string(),
                confidence: 0.9,
                evidence: vec!["code_tag".to_string()],
                contexts: 1,
                first_line: 3,
            }],
            primary: Some("Go".to_string()),
            frameworks: vec![],
            unmatched: vec![],
        };
        assert!(!payload.is_empty());
    }

    #[test]
    fn test_custom_category_name() {
        let payload = AnalysisPayload::Custom {
            category: "containers".to_string(),
            findings: vec![],
        };
        assert_eq!(payload.category().as_str(), "containers");
        assert!(payload.is_empty());
    }
}
