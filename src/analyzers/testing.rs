//! Testing framework, tool and config detection.

use std::collections::BTreeMap;

use crate::analysis::{AnalysisPayload, AnalysisResult, Analyzer, Finding};
use crate::context::ContextIndex;
use crate::document::{Block, DocumentTree};
use crate::score;

use super::catalog::{self, TestingKind, TESTING, TESTING_MENTIONS};
use super::dependencies::DependencyExtractor;
use super::shell;

const MENTION: f64 = 0.6;
/// Added to a mention that sits under a testing heading.
const SECTION_BONUS: f64 = 0.1;
const COMMAND: f64 = 0.85;
const INLINE_FACTOR: f64 = 0.8;
const CONFIG_FILE: f64 = 0.8;
/// What a config file lends to the tool it configures.
const CONFIG_IMPLIES: f64 = 0.75;

/// Sightings of catalog entries, keyed by their index in `TESTING`.
#[derive(Default)]
struct Sightings {
    tools: BTreeMap<usize, Finding>,
    config_files: BTreeMap<String, Finding>,
}

impl Sightings {
    fn tool(&mut self, idx: usize, confidence: f64, evidence: String, line: usize) {
        let finding = Finding::new(TESTING[idx].name, confidence, evidence).at_line(line);
        match self.tools.get_mut(&idx) {
            Some(existing) => existing.absorb(finding),
            None => {
                self.tools.insert(idx, finding);
            }
        }
    }

    fn config_file(&mut self, file: &str, line: usize) {
        let base = file.rsplit('/').next().unwrap_or(file);
        let lower = base.to_lowercase();
        let Some(idx) = TESTING
            .iter()
            .position(|t| t.config_files.contains(&lower.as_str()))
        else {
            return;
        };
        let finding = Finding::new(base, CONFIG_FILE, format!("`{}` L{}", file, line)).at_line(line);
        match self.config_files.get_mut(&lower) {
            Some(existing) => existing.absorb(finding),
            None => {
                self.config_files.insert(lower, finding);
            }
        }
        self.tool(idx, CONFIG_IMPLIES, format!("config `{}` L{}", base, line), line);
    }
}

/// Detects testing frameworks, coverage and end-to-end tools, and their
/// config files.
#[derive(Debug, Default)]
pub struct TestingDetector;

impl TestingDetector {
    pub const NAME: &'static str = "TestingDetector";

    pub fn new() -> Self {
        Self
    }

    fn in_testing_section(tree: &DocumentTree, block: &Block) -> bool {
        let own = block.is_heading().then_some(block.text.as_str());
        own.into_iter()
            .chain(tree.heading_chain(block))
            .any(|h| h.to_lowercase().contains("test"))
    }

    /// Whether the phrase's tokens appear consecutively in the command.
    /// Path-qualified executables (`vendor/bin/phpunit`) and option values
    /// (`--cov=app`) still match.
    fn phrase_matches(command: &str, phrase: &str) -> bool {
        let tokens = shell::tokens(command);
        let wanted: Vec<&str> = phrase.split_whitespace().collect();
        if wanted.is_empty() || tokens.len() < wanted.len() {
            return false;
        }
        tokens.windows(wanted.len()).any(|window| {
            window.iter().zip(&wanted).all(|(got, want)| {
                *got == *want
                    || got.ends_with(&format!("/{}", want))
                    || (want.starts_with('-') && got.starts_with(&format!("{}=", want)))
            })
        })
    }

    fn scan_commands(sightings: &mut Sightings, command: &str, line: usize, confidence: f64) {
        for (idx, spec) in TESTING.iter().enumerate() {
            if spec.commands.iter().any(|p| Self::phrase_matches(command, p)) {
                sightings.tool(idx, confidence, format!("`{}` L{}", command, line), line);
            }
        }
    }

    fn scan_files(sightings: &mut Sightings, text: &str, line: usize) {
        for cap in catalog::FILE_NAME.captures_iter(text) {
            sightings.config_file(&cap[1], line);
        }
    }

    fn collect(tree: &DocumentTree) -> Sightings {
        let mut sightings = Sightings::default();

        for block in tree.blocks() {
            if block.is_code() {
                if shell::may_hold_commands(block) {
                    for cmd in shell::block_commands(block) {
                        Self::scan_commands(&mut sightings, &cmd.text, cmd.line, COMMAND);
                    }
                }
                for (line, text) in block.code_lines() {
                    Self::scan_files(&mut sightings, text, line);
                }
                continue;
            }

            let line = block.lines.start;
            let bonus = if Self::in_testing_section(tree, block) {
                SECTION_BONUS
            } else {
                0.0
            };
            for (re, idx) in TESTING_MENTIONS.iter() {
                if let Some(m) = re.find(&block.text) {
                    sightings.tool(*idx, MENTION + bonus, format!("mentions {} L{}", m.as_str(), line), line);
                }
            }
            for code in &block.inline_code {
                Self::scan_commands(&mut sightings, code, line, COMMAND * INLINE_FACTOR);
            }
            Self::scan_files(&mut sightings, &block.text, line);
        }

        for pkg in DependencyExtractor::packages(tree) {
            let name = pkg.name.to_lowercase();
            if let Some(idx) = TESTING.iter().position(|t| t.packages.contains(&name.as_str())) {
                let line = pkg.evidence.first().map(String::as_str).and_then(evidence_line).unwrap_or(0);
                sightings.tool(idx, pkg.confidence, format!("package `{}` ({})", pkg.name, pkg.manager), line);
            }
        }
        sightings
    }
}

/// Line number from an evidence string ending in `L<n>`.
fn evidence_line(evidence: &str) -> Option<usize> {
    evidence.rsplit_once('L').and_then(|(_, n)| n.trim().parse().ok())
}

impl Analyzer for TestingDetector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, tree: &DocumentTree, _text: &str, _context: &ContextIndex) -> AnalysisResult {
        let sightings = Self::collect(tree);

        let mut frameworks = Vec::new();
        let mut tools = Vec::new();
        for (idx, mut finding) in sightings.tools {
            // Independent pieces of evidence reinforce each other.
            finding.confidence = score::boosted(finding.confidence, finding.evidence.len() - 1);
            match TESTING[idx].kind {
                TestingKind::Framework | TestingKind::Runner => frameworks.push(finding),
                TestingKind::Coverage | TestingKind::EndToEnd => tools.push(finding),
            }
        }
        let config_files: Vec<Finding> = sightings.config_files.into_values().collect();

        let mut sources: Vec<String> = frameworks
            .iter()
            .chain(&tools)
            .chain(&config_files)
            .flat_map(|f| f.evidence.iter().cloned())
            .collect();
        sources.sort();
        sources.dedup();

        let confidences: Vec<f64> = frameworks
            .iter()
            .chain(&tools)
            .chain(&config_files)
            .map(|f| f.confidence)
            .collect();

        tracing::debug!(
            frameworks = frameworks.len(),
            tools = tools.len(),
            config_files = config_files.len(),
            "testing detected"
        );

        AnalysisResult::success(
            Self::NAME,
            AnalysisPayload::Testing {
                frameworks,
                tools,
                config_files,
            },
            score::combine(&confidences),
            sources,
        )
    }
}
