//! Configuration schema for readme-lens.
//!
//! Every field is optional; accessors supply the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyzers::LanguageDetector;
use crate::document::DEFAULT_MAX_BYTES;

/// Default configuration written by `readme-lens init`.
pub const DEFAULT_CONFIG: &str = include_str!("../templates/readme-lens.yaml");

/// File names looked up in the working directory, in order.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["readme-lens.yaml", ".readme-lens.yaml"];

pub mod defaults {
    pub const ANALYZER_TIMEOUT_MS: u64 = 5000;
    pub const MAX_CONCURRENCY: usize = 4;
    pub const CONFLICT_MARGIN: f64 = 0.15;
    pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;
    pub const INFERENCE_PENALTY: f64 = 0.8;
    pub const PATTERN_CONFIDENCE: f64 = 0.7;
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub version: String,
    /// Documents larger than this are rejected
    #[serde(default)]
    pub max_document_bytes: Option<usize>,
    /// Per-analyzer timeout in milliseconds (default: 5000)
    #[serde(default)]
    pub analyzer_timeout_ms: Option<u64>,
    /// Run independent analyzers concurrently (default: true)
    #[serde(default)]
    pub parallel: Option<bool>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    /// Confidence gap needed to pick one of two incompatible findings
    #[serde(default)]
    pub conflict_margin: Option<f64>,
    /// Findings below this get alternative suggestions
    #[serde(default)]
    pub low_confidence_threshold: Option<f64>,
    /// Multiplier for a command whose language comes from its own text only
    #[serde(default)]
    pub inference_penalty: Option<f64>,
    #[serde(default)]
    pub category_weights: Option<CategoryWeights>,
    /// Built-in analyzers to leave out of the registry
    #[serde(default)]
    pub disabled_analyzers: Vec<String>,
    #[serde(default)]
    pub custom_analyzers: Vec<PatternAnalyzerConfig>,
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load the configuration from `explicit`, or the first file found by
    /// discovery. Returns defaults when nothing is found.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            let config = Self::parse_file(path)
                .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e))?;
            return Ok((config, Some(path.to_path_buf())));
        }
        match discover() {
            Some(path) => {
                let config = Self::parse_file(&path)
                    .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", path.display(), e))?;
                Ok((config, Some(path)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    pub fn max_document_bytes(&self) -> usize {
        self.max_document_bytes.unwrap_or(DEFAULT_MAX_BYTES)
    }

    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_millis(self.analyzer_timeout_ms.unwrap_or(defaults::ANALYZER_TIMEOUT_MS))
    }

    /// Returns whether analyzers run concurrently (defaults to true).
    pub fn is_parallel(&self) -> bool {
        self.parallel.unwrap_or(true)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or(defaults::MAX_CONCURRENCY)
    }

    pub fn conflict_margin(&self) -> f64 {
        self.conflict_margin.unwrap_or(defaults::CONFLICT_MARGIN)
    }

    pub fn low_confidence_threshold(&self) -> f64 {
        self.low_confidence_threshold
            .unwrap_or(defaults::LOW_CONFIDENCE_THRESHOLD)
    }

    pub fn inference_penalty(&self) -> f64 {
        self.inference_penalty.unwrap_or(defaults::INFERENCE_PENALTY)
    }

    pub fn category_weights(&self) -> CategoryWeights {
        self.category_weights.clone().unwrap_or_default()
    }

    pub fn is_disabled(&self, analyzer: &str) -> bool {
        self.disabled_analyzers.iter().any(|d| d == analyzer)
    }
}

/// Per-category weights for the overall confidence.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CategoryWeights {
    #[serde(default)]
    pub languages: Option<f64>,
    #[serde(default)]
    pub commands: Option<f64>,
    #[serde(default)]
    pub dependencies: Option<f64>,
    #[serde(default)]
    pub testing: Option<f64>,
    #[serde(default)]
    pub metadata: Option<f64>,
    /// Weight of each custom category (default: 0, not part of the overall)
    #[serde(default)]
    pub custom: Option<f64>,
}

impl CategoryWeights {
    pub fn languages(&self) -> f64 {
        self.languages.unwrap_or(0.25)
    }

    pub fn commands(&self) -> f64 {
        self.commands.unwrap_or(0.25)
    }

    pub fn dependencies(&self) -> f64 {
        self.dependencies.unwrap_or(0.2)
    }

    pub fn testing(&self) -> f64 {
        self.testing.unwrap_or(0.15)
    }

    pub fn metadata(&self) -> f64 {
        self.metadata.unwrap_or(0.15)
    }

    pub fn custom(&self) -> f64 {
        self.custom.unwrap_or(0.0)
    }

    pub fn builtin(&self) -> [(&'static str, f64); 5] {
        [
            ("languages", self.languages()),
            ("commands", self.commands()),
            ("dependencies", self.dependencies()),
            ("testing", self.testing()),
            ("metadata", self.metadata()),
        ]
    }
}

/// Where a pattern analyzer looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PatternScope {
    Code,
    Prose,
    #[default]
    All,
}

impl std::fmt::Display for PatternScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternScope::Code => write!(f, "code"),
            PatternScope::Prose => write!(f, "prose"),
            PatternScope::All => write!(f, "all"),
        }
    }
}

/// A declarative analyzer: regexes that each report a labelled finding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatternAnalyzerConfig {
    pub name: String,
    /// Category the findings are aggregated under
    pub category: String,
    #[serde(default)]
    pub scope: PatternScope,
    #[serde(default)]
    pub patterns: Vec<PatternRule>,
}

/// A regex reporting `label` when it matches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PatternRule {
    pub pattern: String,
    pub label: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl PatternRule {
    pub fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(defaults::PATTERN_CONFIDENCE)
    }
}

/// First configuration file found in the working directory, then in the
/// per-user config directory.
pub fn discover() -> Option<PathBuf> {
    for name in DEFAULT_CONFIG_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }
    directories::ProjectDirs::from("", "", "readme-lens")
        .map(|dirs| dirs.config_dir().join("config.yaml"))
        .filter(|path| path.exists())
}

fn check_unit(name: &str, value: Option<f64>) -> anyhow::Result<()> {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            anyhow::bail!("{} must be within [0, 1], got {}", name, v);
        }
    }
    Ok(())
}

/// Validate a configuration for correctness.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    check_unit("conflict_margin", config.conflict_margin)?;
    check_unit("low_confidence_threshold", config.low_confidence_threshold)?;
    check_unit("inference_penalty", config.inference_penalty)?;

    if config.analyzer_timeout_ms == Some(0) {
        anyhow::bail!("analyzer_timeout_ms must be greater than zero");
    }
    if config.max_concurrency == Some(0) {
        anyhow::bail!("max_concurrency must be greater than zero");
    }
    if config.max_document_bytes == Some(0) {
        anyhow::bail!("max_document_bytes must be greater than zero");
    }

    let weights = config.category_weights();
    for (name, w) in weights.builtin() {
        if w < 0.0 || !w.is_finite() {
            anyhow::bail!("category weight {:?} must be a non-negative number, got {}", name, w);
        }
    }
    if weights.custom() < 0.0 || !weights.custom().is_finite() {
        anyhow::bail!("custom category weight must be a non-negative number");
    }
    if weights.builtin().iter().map(|(_, w)| w).sum::<f64>() <= 0.0 {
        anyhow::bail!("category weights must not all be zero");
    }

    if config.is_disabled(LanguageDetector::NAME) {
        anyhow::bail!("{} provides context to other analyzers and cannot be disabled", LanguageDetector::NAME);
    }

    for custom in &config.custom_analyzers {
        if custom.category.trim().is_empty() {
            anyhow::bail!("custom analyzer {:?} has an empty category", custom.name);
        }
        if custom.patterns.is_empty() {
            anyhow::bail!("custom analyzer {:?} has no patterns", custom.name);
        }
        for rule in &custom.patterns {
            regex::Regex::new(&rule.pattern).map_err(|e| {
                anyhow::anyhow!("invalid pattern {:?} in {:?}: {}", rule.pattern, custom.name, e)
            })?;
            check_unit(&format!("confidence of {:?}", rule.label), rule.confidence)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses_and_validates() {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        validate(&config).unwrap();
        assert_eq!(config.conflict_margin(), 0.15);
        assert_eq!(config.custom_analyzers.len(), 1);
        assert_eq!(config.custom_analyzers[0].scope, PatternScope::All);
    }

    #[test]
    fn test_accessor_defaults() {
        let config = Config::default();
        assert_eq!(config.max_document_bytes(), DEFAULT_MAX_BYTES);
        assert_eq!(config.analyzer_timeout(), Duration::from_millis(5000));
        assert!(config.is_parallel());
        assert_eq!(config.max_concurrency(), 4);
        assert_eq!(config.inference_penalty(), 0.8);
        let weights = config.category_weights();
        assert_eq!(weights.languages(), 0.25);
        assert_eq!(weights.custom(), 0.0);
        validate(&config).unwrap();
    }

    #[test]
    fn test_validate_rejects() {
        let cases = [
            "conflict_margin: 1.5",
            "analyzer_timeout_ms: 0",
            "max_concurrency: 0",
            "category_weights: { languages: 0, commands: 0, dependencies: 0, testing: 0, metadata: 0 }",
            "category_weights: { testing: -1 }",
            "disabled_analyzers: [LanguageDetector]",
            "custom_analyzers:\n  - name: broken\n    category: x\n    patterns:\n      - { pattern: \"(\", label: X }",
            "custom_analyzers:\n  - name: empty\n    category: x\n    patterns: []",
        ];
        for yaml in cases {
            let config: Config = serde_yaml::from_str(yaml).unwrap();
            assert!(validate(&config).is_err(), "accepted {:?}", yaml);
        }
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readme-lens.yaml");
        fs::write(&path, "parallel: false\ndisabled_analyzers: [TestingDetector]\n").unwrap();
        let (config, found) = Config::load(Some(&path)).unwrap();
        assert_eq!(found.as_deref(), Some(path.as_path()));
        assert!(!config.is_parallel());
        assert!(config.is_disabled("TestingDetector"));
        assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}
