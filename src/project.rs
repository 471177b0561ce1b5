//! The aggregated project record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{Command, CommandCategory, EnvVar, Finding, MetadataField};
use crate::diagnostics::Suggestion;

/// Everything known about a project after aggregation.
///
/// Built once, at the end of the aggregation stage. All lists are sorted so
/// identical input serialises identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectInfo {
    pub metadata: ProjectMetadata,
    pub languages: Vec<LanguageInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_language: Option<String>,
    pub frameworks: Vec<FrameworkInfo>,
    pub dependencies: DependencyInfo,
    pub commands: CommandSet,
    pub testing: TestingInfo,
    pub confidence: ConfidenceScores,
    /// Conflicts that were not auto-resolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_review: Vec<ReviewItem>,
    /// Findings of custom categories, keyed by category.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, Vec<Finding>>,
}

impl ProjectInfo {
    /// Zero-confidence record for input nothing could be learned from.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn primary_frameworks(&self) -> impl Iterator<Item = &FrameworkInfo> {
        self.frameworks.iter().filter(|f| f.primary)
    }

    /// Whether the record carries no findings at all.
    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
            && self.frameworks.is_empty()
            && self.dependencies.packages.is_empty()
            && self.dependencies.package_files.is_empty()
            && self.commands.is_empty()
            && self.testing.frameworks.is_empty()
            && self.testing.tools.is_empty()
            && self.testing.config_files.is_empty()
            && self.metadata.is_empty()
            && self.custom.values().all(|v| v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<MetadataField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<MetadataField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<MetadataField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<MetadataField>,
    #[serde(default)]
    pub environment: Vec<EnvVar>,
    #[serde(default)]
    pub structure: Vec<Finding>,
}

impl ProjectMetadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.license.is_none()
            && self.repository.is_none()
            && self.environment.is_empty()
            && self.structure.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub first_line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub confidence: f64,
    pub evidence: Vec<String>,
    /// Sole or winning member of its exclusivity group.
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DependencyInfo {
    pub package_files: Vec<Finding>,
    pub packages: Vec<DependencyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub manager: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Other declared versions kept because the evidence was too close to call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_versions: Vec<String>,
    #[serde(default)]
    pub dev: bool,
    pub confidence: f64,
    pub evidence: Vec<String>,
    #[serde(default)]
    pub needs_review: bool,
}

/// Commands grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommandSet {
    pub build: Vec<Command>,
    pub test: Vec<Command>,
    pub run: Vec<Command>,
    pub install: Vec<Command>,
    pub deploy: Vec<Command>,
    pub other: Vec<Command>,
}

impl CommandSet {
    pub fn get(&self, category: CommandCategory) -> &[Command] {
        match category {
            CommandCategory::Build => &self.build,
            CommandCategory::Test => &self.test,
            CommandCategory::Run => &self.run,
            CommandCategory::Install => &self.install,
            CommandCategory::Deploy => &self.deploy,
            CommandCategory::Other => &self.other,
        }
    }

    pub fn push(&mut self, command: Command) {
        let bucket = match command.category {
            CommandCategory::Build => &mut self.build,
            CommandCategory::Test => &mut self.test,
            CommandCategory::Run => &mut self.run,
            CommandCategory::Install => &mut self.install,
            CommandCategory::Deploy => &mut self.deploy,
            CommandCategory::Other => &mut self.other,
        };
        bucket.push(command);
    }

    /// All commands in category precedence order.
    pub fn all(&self) -> impl Iterator<Item = &Command> {
        CommandCategory::PRECEDENCE
            .iter()
            .flat_map(move |c| self.get(*c).iter())
    }

    pub fn len(&self) -> usize {
        self.all().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TestingInfo {
    pub frameworks: Vec<Finding>,
    pub tools: Vec<Finding>,
    pub config_files: Vec<Finding>,
}

/// Per-category and overall confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfidenceScores {
    pub overall: f64,
    pub languages: f64,
    pub commands: f64,
    pub dependencies: f64,
    pub testing: f64,
    pub metadata: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, f64>,
}

/// What an unresolved conflict is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewKind {
    IncompatibleFrameworks,
    VersionConflict,
}

/// A conflict left for a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub kind: ReviewKind,
    pub subject: String,
    pub reason: String,
    pub candidates: Vec<Suggestion>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::CommandSource;

    fn command(text: &str, category: CommandCategory) -> Command {
        Command {
            text: text.to_string(),
            language: None,
            confidence: 0.9,
            category,
            line: 1,
            source: CommandSource::CodeBlock,
        }
    }

    #[test]
    fn test_command_set_routing() {
        let mut set = CommandSet::default();
        set.push(command("npm test", CommandCategory::Test));
        set.push(command("npm run build", CommandCategory::Build));
        set.push(command("git status", CommandCategory::Other));
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(CommandCategory::Test)[0].text, "npm test");
        let order: Vec<&str> = set.all().map(|c| c.text.as_str()).collect();
        assert_eq!(order, vec!["npm run build", "npm test", "git status"]);
    }

    #[test]
    fn test_empty_project() {
        let info = ProjectInfo::empty();
        assert!(info.is_empty());
        assert_eq!(info.confidence.overall, 0.0);
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("manual_review"));
    }
}
