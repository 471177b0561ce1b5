//! Aggregation of analyzer results into one `ProjectInfo`.
//!
//! The aggregator is the only place findings from different analyzers meet.
//! It deduplicates by canonical name, resolves conflicts, scores every
//! category and attaches non-authoritative suggestions to diagnostics.

mod conflicts;
mod suggestions;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{
    merge_evidence, AnalysisPayload, AnalysisResult, Category, Command, EnvVar, Finding,
    FrameworkFinding, LanguageSummary, MetadataField, Package,
};
use crate::config::{CategoryWeights, Config};
use crate::diagnostics::{Diagnostic, DiagnosticCategory, Suggestion};
use crate::project::{
    ConfidenceScores, DependencyInfo, LanguageInfo, ProjectInfo, ProjectMetadata, TestingInfo,
};
use crate::score;

pub use conflicts::{merge_frameworks, resolve_exclusive, resolve_versions};
pub use suggestions::{for_unmatched_tag, frameworks_for_languages, similarity, testing_for_languages};

/// Tunables the aggregator reads from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    pub conflict_margin: f64,
    pub low_confidence_threshold: f64,
    pub weights: CategoryWeights,
}

impl AggregateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            conflict_margin: config.conflict_margin(),
            low_confidence_threshold: config.low_confidence_threshold(),
            weights: config.category_weights(),
        }
    }
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Output of one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub project: ProjectInfo,
    pub diagnostics: Vec<Diagnostic>,
}

/// Findings gathered from every successful result, keyed for deduplication.
#[derive(Default)]
struct Accumulator {
    languages: BTreeMap<String, LanguageInfo>,
    unmatched: BTreeSet<String>,
    frameworks: Vec<FrameworkFinding>,
    commands: BTreeMap<String, Command>,
    package_files: BTreeMap<String, Finding>,
    packages: Vec<Package>,
    test_frameworks: BTreeMap<String, Finding>,
    test_tools: BTreeMap<String, Finding>,
    test_configs: BTreeMap<String, Finding>,
    metadata: ProjectMetadata,
    environment: BTreeMap<String, EnvVar>,
    structure: BTreeMap<String, Finding>,
    custom: BTreeMap<String, BTreeMap<String, Finding>>,
    /// `(confidence, evidence sources)` per contributing result.
    contributions: BTreeMap<Category, Vec<(f64, usize)>>,
}

fn absorb_all(into: &mut BTreeMap<String, Finding>, findings: Vec<Finding>) {
    for finding in findings {
        match into.entry(finding.name.to_lowercase()) {
            Entry::Occupied(mut e) => e.get_mut().absorb(finding),
            Entry::Vacant(e) => {
                e.insert(finding);
            }
        }
    }
}

fn keep_best(slot: &mut Option<MetadataField>, candidate: Option<MetadataField>) {
    let Some(candidate) = candidate else {
        return;
    };
    match slot {
        Some(existing) if existing.confidence >= candidate.confidence => {}
        _ => *slot = Some(candidate),
    }
}

fn sorted(findings: BTreeMap<String, Finding>) -> Vec<Finding> {
    let mut out: Vec<Finding> = findings.into_values().collect();
    out.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    out
}

impl Accumulator {
    fn add(&mut self, result: &AnalysisResult) {
        let Some(payload) = result.payload() else {
            return;
        };
        if payload.is_empty() {
            return;
        }
        self.contributions
            .entry(payload.category())
            .or_default()
            .push((result.confidence(), result.sources().len()));

        match payload.clone() {
            AnalysisPayload::Languages {
                summaries,
                frameworks,
                unmatched,
                ..
            } => {
                self.add_languages(summaries);
                self.frameworks.extend(frameworks);
                self.unmatched.extend(unmatched);
            }
            AnalysisPayload::Commands { commands } => self.add_commands(commands),
            AnalysisPayload::Dependencies {
                package_files,
                packages,
                frameworks,
            } => {
                absorb_all(&mut self.package_files, package_files);
                self.packages.extend(packages);
                self.frameworks.extend(frameworks);
            }
            AnalysisPayload::Testing {
                frameworks,
                tools,
                config_files,
            } => {
                absorb_all(&mut self.test_frameworks, frameworks);
                absorb_all(&mut self.test_tools, tools);
                absorb_all(&mut self.test_configs, config_files);
            }
            AnalysisPayload::Metadata {
                name,
                description,
                license,
                repository,
                environment,
                structure,
            } => {
                keep_best(&mut self.metadata.name, name);
                keep_best(&mut self.metadata.description, description);
                keep_best(&mut self.metadata.license, license);
                keep_best(&mut self.metadata.repository, repository);
                self.add_environment(environment);
                absorb_all(&mut self.structure, structure);
            }
            AnalysisPayload::Custom { category, findings } => {
                absorb_all(self.custom.entry(category).or_default(), findings);
            }
        }
    }

    fn add_languages(&mut self, summaries: Vec<LanguageSummary>) {
        for s in summaries {
            match self.languages.entry(s.name.to_lowercase()) {
                Entry::Occupied(mut e) => {
                    let lang = e.get_mut();
                    lang.confidence = lang.confidence.max(s.confidence);
                    lang.first_line = lang.first_line.min(s.first_line);
                    merge_evidence(&mut lang.evidence, s.evidence);
                }
                Entry::Vacant(e) => {
                    e.insert(LanguageInfo {
                        name: s.name,
                        confidence: score::clamp_unit(s.confidence),
                        evidence: s.evidence,
                        first_line: s.first_line,
                    });
                }
            }
        }
    }

    /// The same command written twice keeps the more confident sighting,
    /// then the earlier one.
    fn add_commands(&mut self, commands: Vec<Command>) {
        for cmd in commands {
            match self.commands.entry(cmd.dedup_key()) {
                Entry::Occupied(mut e) => {
                    let existing = e.get();
                    let better = cmd.confidence > existing.confidence
                        || (cmd.confidence == existing.confidence && cmd.line < existing.line);
                    if better {
                        e.insert(cmd);
                    }
                }
                Entry::Vacant(e) => {
                    e.insert(cmd);
                }
            }
        }
    }

    fn add_environment(&mut self, vars: Vec<EnvVar>) {
        for var in vars {
            match self.environment.entry(var.name.clone()) {
                Entry::Occupied(mut e) => {
                    let existing = e.get_mut();
                    let line = existing.line.min(var.line);
                    if var.confidence > existing.confidence {
                        *existing = var;
                    }
                    existing.line = line;
                }
                Entry::Vacant(e) => {
                    e.insert(var);
                }
            }
        }
    }

    fn confidence_of(&self, category: &Category) -> f64 {
        self.contributions
            .get(category)
            .map(|c| score::category_confidence(c))
            .unwrap_or(0.0)
    }
}

/// Merges analyzer results into one project record.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    options: AggregateOptions,
}

impl Aggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Aggregate every result. Failed results contribute nothing; their
    /// diagnostics were recorded when they failed.
    pub fn aggregate(&self, results: &[AnalysisResult]) -> Aggregation {
        let mut diagnostics = Vec::new();
        let nothing = results
            .iter()
            .filter(|r| r.is_success())
            .all(|r| r.payload().map_or(true, |p| p.is_empty()));
        if nothing {
            diagnostics.push(
                Diagnostic::warning(
                    DiagnosticCategory::Aggregation,
                    "W_AGGREGATE_EMPTY",
                    "no analyzer produced any findings; the project record is empty",
                )
                .with_remediation("check that the document describes a software project"),
            );
            return Aggregation {
                project: ProjectInfo::empty(),
                diagnostics,
            };
        }

        let mut acc = Accumulator::default();
        for result in results.iter().filter(|r| r.is_success()) {
            acc.add(result);
        }
        let margin = self.options.conflict_margin;

        let mut languages: Vec<LanguageInfo> = std::mem::take(&mut acc.languages).into_values().collect();
        languages.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.evidence.len().cmp(&a.evidence.len()))
                .then(a.first_line.cmp(&b.first_line))
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut frameworks = merge_frameworks(std::mem::take(&mut acc.frameworks));
        let (mut manual_review, framework_diags) = resolve_exclusive(&mut frameworks, margin);
        diagnostics.extend(framework_diags);

        let (packages, version_review, version_diags) = resolve_versions(std::mem::take(&mut acc.packages), margin);
        manual_review.extend(version_review);
        diagnostics.extend(version_diags);

        let mut commands: Vec<Command> = std::mem::take(&mut acc.commands).into_values().collect();
        commands.sort_by(|a, b| (a.line, &a.text).cmp(&(b.line, &b.text)));

        for tag in &acc.unmatched {
            diagnostics.push(
                Diagnostic::info(
                    DiagnosticCategory::LowConfidence,
                    "I_UNMATCHED_TAG",
                    format!("code block tag `{}` matched no known language", tag),
                )
                .with_alternatives(for_unmatched_tag(tag)),
            );
        }

        let confidence = self.score(&acc);

        let mut metadata = std::mem::take(&mut acc.metadata);
        metadata.environment = std::mem::take(&mut acc.environment).into_values().collect();
        metadata.environment.sort_by(|a, b| a.name.cmp(&b.name));
        metadata.structure = sorted(std::mem::take(&mut acc.structure));

        let mut project = ProjectInfo {
            metadata,
            primary_language: languages.first().map(|l| l.name.clone()),
            languages,
            frameworks,
            dependencies: DependencyInfo {
                package_files: sorted(std::mem::take(&mut acc.package_files)),
                packages,
            },
            commands: Default::default(),
            testing: TestingInfo {
                frameworks: sorted(std::mem::take(&mut acc.test_frameworks)),
                tools: sorted(std::mem::take(&mut acc.test_tools)),
                config_files: sorted(std::mem::take(&mut acc.test_configs)),
            },
            confidence,
            manual_review,
            custom: std::mem::take(&mut acc.custom)
                .into_iter()
                .map(|(category, findings)| (category, sorted(findings)))
                .collect(),
        };
        for cmd in commands {
            project.commands.push(cmd);
        }

        diagnostics.extend(self.low_confidence(&project, &acc.unmatched));
        round_all(&mut project);

        tracing::debug!(
            languages = project.languages.len(),
            frameworks = project.frameworks.len(),
            commands = project.commands.len(),
            packages = project.dependencies.packages.len(),
            review = project.manual_review.len(),
            overall = project.confidence.overall,
            "aggregation complete"
        );
        Aggregation { project, diagnostics }
    }

    fn score(&self, acc: &Accumulator) -> ConfidenceScores {
        let weights = &self.options.weights;
        let mut scores = ConfidenceScores {
            overall: 0.0,
            languages: acc.confidence_of(&Category::Languages),
            commands: acc.confidence_of(&Category::Commands),
            dependencies: acc.confidence_of(&Category::Dependencies),
            testing: acc.confidence_of(&Category::Testing),
            metadata: acc.confidence_of(&Category::Metadata),
            custom: BTreeMap::new(),
        };
        for category in acc.custom.keys() {
            let conf = acc.confidence_of(&Category::Custom(category.clone()));
            scores.custom.insert(category.clone(), conf);
        }

        let mut weighted: Vec<(f64, f64)> = weights
            .builtin()
            .iter()
            .map(|(name, w)| (builtin_score(&scores, name), *w))
            .collect();
        weighted.extend(scores.custom.values().map(|c| (*c, weights.custom())));
        scores.overall = score::weighted_mean(&weighted);
        scores
    }

    /// One info diagnostic per built-in category under the threshold, with
    /// ranked alternatives where the evidence suggests some.
    fn low_confidence(&self, project: &ProjectInfo, unmatched: &BTreeSet<String>) -> Vec<Diagnostic> {
        let threshold = self.options.low_confidence_threshold;
        let mut out = Vec::new();
        for (name, _) in self.options.weights.builtin() {
            let conf = builtin_score(&project.confidence, name);
            if conf >= threshold {
                continue;
            }
            let alternatives: Vec<Suggestion> = match name {
                "languages" => suggestions::ranked(unmatched.iter().flat_map(|t| for_unmatched_tag(t)).collect()),
                "dependencies" => frameworks_for_languages(&project.languages, &project.frameworks),
                "testing" => testing_for_languages(&project.languages, &project.testing),
                _ => Vec::new(),
            };
            let mut diag = Diagnostic::info(
                DiagnosticCategory::LowConfidence,
                "I_LOW_CONFIDENCE",
                format!(
                    "{} confidence {:.2} is below the threshold {:.2}",
                    name, conf, threshold
                ),
            );
            if !alternatives.is_empty() {
                diag = diag
                    .with_alternatives(alternatives)
                    .with_remediation("alternatives are suggestions only; confirm before using them");
            }
            out.push(diag);
        }
        out
    }
}

fn builtin_score(scores: &ConfidenceScores, name: &str) -> f64 {
    match name {
        "languages" => scores.languages,
        "commands" => scores.commands,
        "dependencies" => scores.dependencies,
        "testing" => scores.testing,
        "metadata" => scores.metadata,
        _ => 0.0,
    }
}

fn round_findings(findings: &mut [Finding]) {
    for f in findings {
        f.confidence = score::round(f.confidence);
    }
}

fn round_field(field: &mut Option<MetadataField>) {
    if let Some(f) = field {
        f.confidence = score::round(f.confidence);
    }
}

/// Round every confidence in the record to four decimals.
fn round_all(project: &mut ProjectInfo) {
    for l in &mut project.languages {
        l.confidence = score::round(l.confidence);
    }
    for f in &mut project.frameworks {
        f.confidence = score::round(f.confidence);
    }
    round_findings(&mut project.dependencies.package_files);
    for p in &mut project.dependencies.packages {
        p.confidence = score::round(p.confidence);
    }
    let commands = &mut project.commands;
    for bucket in [
        &mut commands.build,
        &mut commands.test,
        &mut commands.run,
        &mut commands.install,
        &mut commands.deploy,
        &mut commands.other,
    ] {
        for c in bucket.iter_mut() {
            c.confidence = score::round(c.confidence);
        }
    }
    round_findings(&mut project.testing.frameworks);
    round_findings(&mut project.testing.tools);
    round_findings(&mut project.testing.config_files);

    let meta = &mut project.metadata;
    round_field(&mut meta.name);
    round_field(&mut meta.description);
    round_field(&mut meta.license);
    round_field(&mut meta.repository);
    for e in &mut meta.environment {
        e.confidence = score::round(e.confidence);
    }
    round_findings(&mut meta.structure);

    for findings in project.custom.values_mut() {
        round_findings(findings);
    }

    let c = &mut project.confidence;
    for v in [
        &mut c.overall,
        &mut c.languages,
        &mut c.commands,
        &mut c.dependencies,
        &mut c.testing,
        &mut c.metadata,
    ] {
        *v = score::round(*v);
    }
    for v in c.custom.values_mut() {
        *v = score::round(*v);
    }
    for item in &mut project.manual_review {
        for s in &mut item.candidates {
            s.score = score::round(s.score);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{CommandCategory, CommandSource};
    use crate::error::AnalyzerError;
    use crate::diagnostics::Severity;

    fn languages(summaries: Vec<LanguageSummary>, frameworks: Vec<FrameworkFinding>, unmatched: Vec<&str>) -> AnalysisResult {
        let conf = score::combine(&summaries.iter().map(|s| s.confidence).collect::<Vec<_>>());
        let sources = summaries.iter().flat_map(|s| s.evidence.clone()).collect();
        AnalysisResult::success(
            "LanguageDetector",
            AnalysisPayload::Languages {
                contexts: vec![],
                primary: summaries.first().map(|s| s.name.clone()),
                summaries,
                frameworks,
                unmatched: unmatched.into_iter().map(str::to_string).collect(),
            },
            conf,
            sources,
        )
    }

    fn summary(name: &str, confidence: f64, first_line: usize) -> LanguageSummary {
        LanguageSummary {
            name: name.to_string(),
            confidence,
            evidence: vec![format!("tag L{}", first_line)],
            contexts: 1,
            first_line,
        }
    }

    fn react(confidence: f64, evidence: &str) -> FrameworkFinding {
        FrameworkFinding {
            name: "React".to_string(),
            language: Some("JavaScript".to_string()),
            group: Some("frontend-ui".to_string()),
            confidence,
            evidence: vec![evidence.to_string()],
        }
    }

    fn command(text: &str, confidence: f64, line: usize) -> Command {
        Command {
            text: text.to_string(),
            language: Some("JavaScript".to_string()),
            confidence,
            category: CommandCategory::Install,
            line,
            source: CommandSource::CodeBlock,
        }
    }

    fn commands(list: Vec<Command>) -> AnalysisResult {
        let conf = score::combine(&list.iter().map(|c| c.confidence).collect::<Vec<_>>());
        let sources = list.iter().map(|c| format!("L{}", c.line)).collect();
        AnalysisResult::success("CommandExtractor", AnalysisPayload::Commands { commands: list }, conf, sources)
    }

    #[test]
    fn test_empty_input_is_zero_confidence_with_warning() {
        let aggregation = Aggregator::default().aggregate(&[]);
        assert!(aggregation.project.is_empty());
        assert_eq!(aggregation.project.confidence.overall, 0.0);
        assert_eq!(aggregation.diagnostics.len(), 1);
        assert_eq!(aggregation.diagnostics[0].severity, Severity::Warning);
        assert_eq!(aggregation.diagnostics[0].code, "W_AGGREGATE_EMPTY");

        let failed = AnalysisResult::failure(AnalyzerError::failed("LanguageDetector", "boom"));
        let aggregation = Aggregator::default().aggregate(&[failed]);
        assert!(aggregation.project.is_empty());
    }

    #[test]
    fn test_react_detected_twice_is_merged() {
        let deps = AnalysisResult::success(
            "DependencyExtractor",
            AnalysisPayload::Dependencies {
                package_files: vec![],
                packages: vec![],
                frameworks: vec![react(0.9, "package `react` (npm)")],
            },
            0.9,
            vec!["package.json".to_string()],
        );
        let aggregation = Aggregator::default().aggregate(&[
            languages(vec![summary("JavaScript", 0.9, 3)], vec![react(0.6, "mention L1")], vec![]),
            deps,
        ]);
        let react: Vec<_> = aggregation
            .project
            .frameworks
            .iter()
            .filter(|f| f.name == "React")
            .collect();
        assert_eq!(react.len(), 1);
        assert_eq!(react[0].confidence, 0.9);
        assert_eq!(react[0].evidence.len(), 2);
        assert!(react[0].primary);
    }

    #[test]
    fn test_commands_deduplicated_and_ordered() {
        let aggregation = Aggregator::default().aggregate(&[
            languages(vec![summary("JavaScript", 0.9, 1)], vec![], vec![]),
            commands(vec![command("npm  install", 0.7, 9), command("npm run dev", 0.8, 12)]),
            commands(vec![command("npm install", 0.855, 4)]),
        ]);
        let install = &aggregation.project.commands.install;
        assert_eq!(install.len(), 2);
        assert_eq!(install[0].text, "npm install");
        assert_eq!(install[0].line, 4);
        assert_eq!(install[0].confidence, 0.855);
        assert_eq!(aggregation.project.primary_language.as_deref(), Some("JavaScript"));
    }

    #[test]
    fn test_scores_and_low_confidence_suggestions() {
        let aggregation = Aggregator::default().aggregate(&[
            languages(vec![summary("Rust", 0.9, 1), summary("Python", 0.5, 20)], vec![], vec!["pyhton"]),
            commands(vec![command("cargo build", 0.9, 5)]),
        ]);
        let project = &aggregation.project;
        assert_eq!(project.primary_language.as_deref(), Some("Rust"));
        assert!(project.confidence.languages > 0.0);
        assert_eq!(project.confidence.testing, 0.0);
        assert!(project.confidence.overall > 0.0 && project.confidence.overall <= 1.0);

        let tag = aggregation
            .diagnostics
            .iter()
            .find(|d| d.code == "I_UNMATCHED_TAG")
            .unwrap();
        assert_eq!(tag.alternatives[0].name, "Python");

        let testing = aggregation
            .diagnostics
            .iter()
            .find(|d| d.code == "I_LOW_CONFIDENCE" && d.message.starts_with("testing"))
            .unwrap();
        assert_eq!(testing.severity, Severity::Info);
        assert!(testing.alternatives.iter().any(|s| s.name == "cargo test"));
        assert!(project.testing.frameworks.is_empty());
    }

    #[test]
    fn test_custom_category_scored_separately() {
        let custom = AnalysisResult::success(
            "containers",
            AnalysisPayload::Custom {
                category: "containers".to_string(),
                findings: vec![Finding::new("Docker", 0.8, "L3").at_line(3)],
            },
            0.8,
            vec!["L3".to_string()],
        );
        let aggregation = Aggregator::default().aggregate(&[
            languages(vec![summary("Go", 0.9, 1)], vec![], vec![]),
            custom,
        ]);
        let project = &aggregation.project;
        assert_eq!(project.custom["containers"][0].name, "Docker");
        assert_eq!(project.confidence.custom["containers"], 0.8);
    }
}
