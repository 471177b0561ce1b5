//! Typed findings produced by analyzers.

use serde::{Deserialize, Serialize};

use crate::score;

/// A named finding with confidence and evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub name: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Finding {
    pub fn new(name: impl Into<String>, confidence: f64, evidence: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            confidence: score::clamp_unit(confidence),
            evidence: vec![evidence.into()],
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Fold another sighting of the same finding into this one.
    ///
    /// Keeps the higher confidence and the earliest line; evidence is merged.
    pub fn absorb(&mut self, other: Finding) {
        self.confidence = self.confidence.max(other.confidence);
        self.line = match (self.line, other.line) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        merge_evidence(&mut self.evidence, other.evidence);
    }
}

/// A framework or library family detected in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkFinding {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Exclusivity group: at most one member of a group can be the primary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

/// Extracted command category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    Build,
    Test,
    Deploy,
    Install,
    Run,
    Other,
}

impl CommandCategory {
    /// All categories in precedence order.
    pub const PRECEDENCE: [CommandCategory; 6] = [
        CommandCategory::Build,
        CommandCategory::Test,
        CommandCategory::Deploy,
        CommandCategory::Install,
        CommandCategory::Run,
        CommandCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCategory::Build => "build",
            CommandCategory::Test => "test",
            CommandCategory::Deploy => "deploy",
            CommandCategory::Install => "install",
            CommandCategory::Run => "run",
            CommandCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "build" => Some(CommandCategory::Build),
            "test" => Some(CommandCategory::Test),
            "deploy" => Some(CommandCategory::Deploy),
            "install" => Some(CommandCategory::Install),
            "run" => Some(CommandCategory::Run),
            "other" => Some(CommandCategory::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a command was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandSource {
    CodeBlock,
    InlineCode,
}

/// A shell-like command extracted from the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub text: String,
    /// Resolved language; `None` when neither context nor the command itself
    /// says anything about it.
    pub language: Option<String>,
    pub confidence: f64,
    pub category: CommandCategory,
    pub line: usize,
    pub source: CommandSource,
}

impl Command {
    /// Key used to detect the same command written twice.
    pub fn dedup_key(&self) -> String {
        self.text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// A declared dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Package ecosystem: npm, pip, cargo, go, gem, composer, nuget.
    pub manager: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub dev: bool,
    pub confidence: f64,
    pub evidence: Vec<String>,
}

impl Package {
    pub fn key(&self) -> (String, String) {
        (self.manager.clone(), self.name.to_lowercase())
    }
}

/// Aggregated view of one language across the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSummary {
    pub name: String,
    pub confidence: f64,
    pub evidence: Vec<String>,
    /// Number of contexts backing this language.
    pub contexts: usize,
    pub first_line: usize,
}

/// A single extracted metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataField {
    pub value: String,
    pub confidence: f64,
    pub evidence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl MetadataField {
    pub fn new(value: impl Into<String>, confidence: f64, evidence: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            confidence: score::clamp_unit(confidence),
            evidence: evidence.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// An environment variable the project reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub confidence: f64,
    pub line: usize,
    pub source: String,
}

/// Merge evidence lists, keeping them sorted and unique.
pub fn merge_evidence(into: &mut Vec<String>, from: Vec<String>) {
    into.extend(from);
    into.sort();
    into.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_absorb_keeps_best() {
        let mut a = Finding::new("Jest", 0.6, "mention L4").at_line(4);
        let b = Finding::new("Jest", 0.85, "command `npx jest` L9").at_line(9);
        a.absorb(b);
        assert_eq!(a.confidence, 0.85);
        assert_eq!(a.line, Some(4));
        assert_eq!(a.evidence.len(), 2);
    }

    #[test]
    fn test_category_precedence_order() {
        let sorted = {
            let mut v = CommandCategory::PRECEDENCE.to_vec();
            v.sort();
            v
        };
        assert_eq!(sorted, CommandCategory::PRECEDENCE.to_vec());
        assert_eq!(CommandCategory::parse("deploy"), Some(CommandCategory::Deploy));
    }

    #[test]
    fn test_command_dedup_key_normalises_whitespace() {
        let cmd = Command {
            text: "npm   install  ".to_string(),
            language: None,
            confidence: 0.5,
            category: CommandCategory::Install,
            line: 1,
            source: CommandSource::CodeBlock,
        };
        assert_eq!(cmd.dedup_key(), "npm install");
    }
}
