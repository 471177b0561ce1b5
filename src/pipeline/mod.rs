//! Pipeline orchestration.
//!
//! ```text
//! Initialized ─▶ Parsed ─▶ LanguageDetected ─▶ ContextBuilt ─▶ AnalyzersRun ─▶ Aggregated ─▶ Finalized
//!      │
//!      └─▶ Failed            (any non-terminal state) ─▶ Cancelled
//! ```
//!
//! Only an unparseable document fails a run. Analyzer failures, including
//! the context provider's, are isolated into diagnostics.

mod cancel;
mod executor;
mod state;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::{AggregateOptions, Aggregator};
use crate::analysis::{payload_sizes, AnalysisPayload, AnalysisResult};
use crate::config::Config;
use crate::context::{ContextBuilder, ContextIndex, LanguageContext};
use crate::diagnostics::{Diagnostic, DiagnosticCategory, DiagnosticsCollector, Severity};
use crate::document::DocumentParser;
use crate::error::{AnalyzerError, ParseError};
use crate::project::ProjectInfo;
use crate::registry::AnalyzerRegistry;
use crate::score;

pub use cancel::CancellationToken;
pub use state::{PipelineState, StateMachine};

use executor::{AnalyzerInput, AnalyzerRun, Executor};

/// How one analyzer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerStatus {
    Succeeded,
    Failed,
    Panicked,
    TimedOut,
    Cancelled,
}

impl AnalyzerStatus {
    fn of(result: &AnalysisResult) -> Self {
        match result.error() {
            None => AnalyzerStatus::Succeeded,
            Some(AnalyzerError::Failed { .. }) => AnalyzerStatus::Failed,
            Some(AnalyzerError::Panicked { .. }) => AnalyzerStatus::Panicked,
            Some(AnalyzerError::TimedOut { .. }) => AnalyzerStatus::TimedOut,
            Some(AnalyzerError::Cancelled { .. }) => AnalyzerStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerOutcome {
    pub name: String,
    pub status: AnalyzerStatus,
    pub duration_ms: u64,
    pub confidence: f64,
}

/// Run bookkeeping kept apart from `ProjectInfo` so the record stays
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub state: PipelineState,
    pub analyzers: Vec<AnalyzerOutcome>,
}

/// What a caller always gets back.
///
/// `data` is present iff `success`, and stays present when individual
/// analyzers failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ProjectInfo>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    #[serde(default)]
    pub info: Vec<Diagnostic>,
    pub summary: RunSummary,
}

impl ParseResult {
    /// A failed result for a document that never reached the parser.
    pub fn unreadable(diagnostic: Diagnostic) -> Self {
        let (errors, warnings, info) = match diagnostic.severity {
            Severity::Critical | Severity::Error => (vec![diagnostic], vec![], vec![]),
            Severity::Warning => (vec![], vec![diagnostic], vec![]),
            Severity::Info => (vec![], vec![], vec![diagnostic]),
        };
        Self {
            success: false,
            data: None,
            errors,
            warnings,
            info,
            summary: RunSummary {
                state: PipelineState::Failed,
                analyzers: Vec::new(),
            },
        }
    }

    /// Every diagnostic, most severe first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().chain(&self.warnings).chain(&self.info)
    }
}

/// One configured pipeline, reusable across runs.
pub struct Pipeline {
    registry: Arc<AnalyzerRegistry>,
    parser: DocumentParser,
    aggregator: Aggregator,
    executor: Executor,
}

/// Mutable bookkeeping of a single run.
struct Run {
    machine: StateMachine,
    diagnostics: DiagnosticsCollector,
    outcomes: Vec<AnalyzerOutcome>,
}

impl Run {
    fn new() -> Self {
        Self {
            machine: StateMachine::new(),
            diagnostics: DiagnosticsCollector::new(),
            outcomes: Vec::new(),
        }
    }

    fn advance(&mut self, to: PipelineState) {
        if let Err(err) = self.machine.advance(to) {
            tracing::error!(error = %err, "pipeline stage out of order");
        }
    }

    /// Record an analyzer run; a failure becomes exactly one diagnostic.
    fn record(&mut self, run: &AnalyzerRun) {
        if let Some(err) = run.result.error() {
            self.diagnostics.record_analyzer_failure(err);
        }
        self.outcomes.push(AnalyzerOutcome {
            name: run.result.analyzer().to_string(),
            status: AnalyzerStatus::of(&run.result),
            duration_ms: run.duration.as_millis() as u64,
            confidence: score::round(run.result.confidence()),
        });
    }

    /// Stop at a stage boundary if the caller asked to.
    fn cancelled(&mut self, token: &CancellationToken) -> bool {
        if !token.is_cancelled() {
            return false;
        }
        let stage = self.machine.state();
        self.diagnostics.push(Diagnostic::new(
            Severity::Error,
            DiagnosticCategory::Cancellation,
            "E_PIPELINE_CANCELLED",
            format!("run cancelled after stage {}; partial results were discarded", stage),
        ));
        self.advance(PipelineState::Cancelled);
        true
    }

    fn finish(self, data: Option<ProjectInfo>) -> ParseResult {
        let state = self.machine.state();
        let (errors, warnings, info) = self.diagnostics.into_parts();
        ParseResult {
            success: data.is_some(),
            data,
            errors,
            warnings,
            info,
            summary: RunSummary {
                state,
                analyzers: self.outcomes,
            },
        }
    }
}

impl Pipeline {
    pub fn new(registry: Arc<AnalyzerRegistry>, config: &Config) -> std::io::Result<Self> {
        let concurrency = if config.is_parallel() {
            config.max_concurrency()
        } else {
            1
        };
        Ok(Self {
            registry,
            parser: DocumentParser::new(config.max_document_bytes()),
            aggregator: Aggregator::new(AggregateOptions::from_config(config)),
            executor: Executor::new(config.analyzer_timeout(), concurrency)?,
        })
    }

    pub fn registry(&self) -> &AnalyzerRegistry {
        &self.registry
    }

    /// Run on raw bytes; anything that is not UTF-8 fails the parse stage.
    pub fn run_bytes(&self, bytes: &[u8], cancel: &CancellationToken) -> ParseResult {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.run(text, cancel),
            Err(err) => {
                let mut run = Run::new();
                run.diagnostics.record_parse_error(&ParseError::from(err));
                run.advance(PipelineState::Failed);
                run.finish(None)
            }
        }
    }

    /// Run every stage over one document.
    pub fn run(&self, text: &str, cancel: &CancellationToken) -> ParseResult {
        let mut run = Run::new();
        if run.cancelled(cancel) {
            return run.finish(None);
        }

        let tree = match self.parser.parse(text) {
            Ok(tree) => tree,
            Err(err) => {
                run.diagnostics.record_parse_error(&err);
                run.advance(PipelineState::Failed);
                return run.finish(None);
            }
        };
        for w in tree.warnings() {
            run.diagnostics.push(
                Diagnostic::warning(DiagnosticCategory::Parse, w.code.clone(), w.message.clone())
                    .at_line(w.line),
            );
        }
        run.advance(PipelineState::Parsed);
        if run.cancelled(cancel) {
            return run.finish(None);
        }

        let input = AnalyzerInput {
            tree: Arc::new(tree),
            text: Arc::from(text),
            context: Arc::new(ContextIndex::empty()),
        };
        let mut results: Vec<AnalysisResult> = Vec::new();
        let contexts = self.detect_languages(&mut run, &input, &mut results);
        run.advance(PipelineState::LanguageDetected);
        if run.cancelled(cancel) {
            return run.finish(None);
        }

        let index = ContextBuilder::new(&input.tree).build(contexts);
        let input = input.with_context(index);
        run.advance(PipelineState::ContextBuilt);
        if run.cancelled(cancel) {
            return run.finish(None);
        }

        for analyzer_run in self.executor.run_all(self.registry.dependents(), &input) {
            run.record(&analyzer_run);
            results.push(analyzer_run.result);
        }
        run.advance(PipelineState::AnalyzersRun);
        if run.cancelled(cancel) {
            return run.finish(None);
        }

        tracing::debug!(findings = ?payload_sizes(&results), "aggregating results");
        let aggregation = self.aggregator.aggregate(&results);
        run.diagnostics.extend(aggregation.diagnostics);
        run.advance(PipelineState::Aggregated);

        run.advance(PipelineState::Finalized);
        let project = aggregation.project;
        tracing::info!(
            primary_language = project.primary_language.as_deref().unwrap_or("-"),
            commands = project.commands.len(),
            overall = project.confidence.overall,
            diagnostics = run.diagnostics.len(),
            "document analyzed"
        );
        run.finish(Some(project))
    }

    /// Run the context provider. Any failure leaves an empty context set and
    /// the run continues in degraded mode.
    fn detect_languages(
        &self,
        run: &mut Run,
        input: &AnalyzerInput,
        results: &mut Vec<AnalysisResult>,
    ) -> Vec<LanguageContext> {
        let Some(provider) = self.registry.context_provider() else {
            run.diagnostics.push(Diagnostic::info(
                DiagnosticCategory::Analyzer,
                "I_NO_CONTEXT_PROVIDER",
                "no language context provider is registered; commands fall back to inference",
            ));
            return Vec::new();
        };

        let provider_run = self.executor.run_one(provider, input);
        run.record(&provider_run);
        let contexts = match provider_run.result.payload() {
            Some(AnalysisPayload::Languages { contexts, .. }) => contexts.clone(),
            Some(_) => Vec::new(),
            None => {
                tracing::warn!("continuing without language context");
                Vec::new()
            }
        };
        results.push(provider_run.result);
        contexts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn pipeline() -> Pipeline {
        let config = Config::default();
        let registry = AnalyzerRegistry::with_builtins(&config).unwrap();
        Pipeline::new(Arc::new(registry), &config).unwrap()
    }

    const README: &str = indoc! {"
        # widget

        A small widget service written in Rust for testing pipelines.

        ```rust
        fn main() {}
        ```

        ```bash
        cargo build --release
        cargo test
        ```
    "};

    #[test]
    fn test_full_run_reaches_finalized() {
        let result = pipeline().run(README, &CancellationToken::new());
        assert!(result.success);
        assert_eq!(result.summary.state, PipelineState::Finalized);
        assert_eq!(result.summary.analyzers.len(), 5);
        assert!(result
            .summary
            .analyzers
            .iter()
            .all(|a| a.status == AnalyzerStatus::Succeeded));

        let data = result.data.unwrap();
        assert_eq!(data.primary_language.as_deref(), Some("Rust"));
        assert_eq!(data.commands.build[0].text, "cargo build --release");
        assert_eq!(data.commands.build[0].language.as_deref(), Some("Rust"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = pipeline().run(README, &token);
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.summary.state, PipelineState::Cancelled);
        assert_eq!(result.errors[0].code, "E_PIPELINE_CANCELLED");
    }

    /// Cancels the run from inside the analyzer barrier.
    struct CancelsMidRun(CancellationToken);

    impl crate::analysis::Analyzer for CancelsMidRun {
        fn name(&self) -> &str {
            "CancelsMidRun"
        }

        fn analyze(&self, _: &crate::document::DocumentTree, _: &str, _: &ContextIndex) -> AnalysisResult {
            self.0.cancel();
            AnalysisResult::success(
                "CancelsMidRun",
                AnalysisPayload::Commands { commands: vec![] },
                0.5,
                vec![],
            )
        }
    }

    #[test]
    fn test_cancel_during_analyzers_discards_results() {
        let config = Config::default();
        let token = CancellationToken::new();
        let mut registry = AnalyzerRegistry::with_builtins(&config).unwrap();
        registry.register(CancelsMidRun(token.clone())).unwrap();
        let pipeline = Pipeline::new(Arc::new(registry), &config).unwrap();

        let result = pipeline.run(README, &token);
        assert!(!result.success);
        assert!(result.data.is_none());
        assert_eq!(result.summary.state, PipelineState::Cancelled);
        let cancelled: Vec<_> = result
            .errors
            .iter()
            .filter(|d| d.code == "E_PIPELINE_CANCELLED")
            .collect();
        assert_eq!(cancelled.len(), 1, "errors: {:?}", result.errors);
        assert!(cancelled[0].message.contains("analyzers_run"), "{}", cancelled[0].message);
    }

    #[test]
    fn test_parse_failure_is_fatal() {
        let result = pipeline().run("binary\0data", &CancellationToken::new());
        assert!(!result.success);
        assert_eq!(result.summary.state, PipelineState::Failed);
        assert_eq!(result.errors[0].code, "E_DOCUMENT_BINARY");

        let result = pipeline().run_bytes(&[0xff, 0xfe, 0x00], &CancellationToken::new());
        assert_eq!(result.errors[0].code, "E_DOCUMENT_ENCODING");
    }
}
