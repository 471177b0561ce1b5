//! Isolated analyzer execution.
//!
//! Every analyzer runs on the blocking pool of a private tokio runtime under
//! its own timeout. Panics, timeouts and join failures all come back as a
//! failed `AnalysisResult` for that analyzer alone.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::runtime::{Handle, Runtime};

use crate::analysis::{AnalysisResult, Analyzer};
use crate::context::ContextIndex;
use crate::document::DocumentTree;
use crate::error::AnalyzerError;

/// Immutable inputs shared by every analyzer of one run.
#[derive(Clone)]
pub(crate) struct AnalyzerInput {
    pub tree: Arc<DocumentTree>,
    pub text: Arc<str>,
    pub context: Arc<ContextIndex>,
}

impl AnalyzerInput {
    pub fn with_context(&self, context: ContextIndex) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
            text: Arc::clone(&self.text),
            context: Arc::new(context),
        }
    }
}

/// One analyzer's result and how long it took.
#[derive(Debug, Clone)]
pub(crate) struct AnalyzerRun {
    pub result: AnalysisResult,
    pub duration: Duration,
}

pub(crate) struct Executor {
    runtime: Option<Runtime>,
    timeout: Duration,
    concurrency: usize,
}

impl Executor {
    pub fn new(timeout: Duration, concurrency: usize) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("readme-lens-analyzer")
            .enable_time()
            .build()?;
        Ok(Self {
            runtime: Some(runtime),
            timeout,
            concurrency: concurrency.max(1),
        })
    }

    /// Run a single analyzer.
    pub fn run_one(&self, analyzer: &Arc<dyn Analyzer>, input: &AnalyzerInput) -> AnalyzerRun {
        self.run_all(std::slice::from_ref(analyzer), input)
            .pop()
            .unwrap_or_else(|| shut_down(analyzer.name()))
    }

    /// Run analyzers concurrently, bounded by the configured concurrency,
    /// and wait for all of them. Results come back in input order.
    ///
    /// When called from inside another tokio runtime the wait happens on a
    /// scoped helper thread, since `block_on` cannot nest.
    pub fn run_all(&self, analyzers: &[Arc<dyn Analyzer>], input: &AnalyzerInput) -> Vec<AnalyzerRun> {
        let Some(runtime) = &self.runtime else {
            return analyzers.iter().map(|a| shut_down(a.name())).collect();
        };

        if Handle::try_current().is_err() {
            return self.drive(runtime, analyzers, input);
        }
        std::thread::scope(|scope| {
            scope
                .spawn(|| self.drive(runtime, analyzers, input))
                .join()
                .unwrap_or_else(|_| {
                    analyzers
                        .iter()
                        .map(|a| AnalyzerRun {
                            result: AnalysisResult::failure(AnalyzerError::failed(
                                a.name(),
                                "executor thread panicked",
                            )),
                            duration: Duration::ZERO,
                        })
                        .collect()
                })
        })
    }

    fn drive(&self, runtime: &Runtime, analyzers: &[Arc<dyn Analyzer>], input: &AnalyzerInput) -> Vec<AnalyzerRun> {
        let limit = self.timeout;
        let mut runs: Vec<(usize, AnalyzerRun)> = runtime.block_on(async {
            stream::iter(analyzers.iter().cloned().enumerate())
                .map(|(i, analyzer)| {
                    let input = input.clone();
                    async move { (i, run_isolated(analyzer, input, limit).await) }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await
        });
        runs.sort_by_key(|(i, _)| *i);
        runs.into_iter().map(|(_, run)| run).collect()
    }
}

impl Drop for Executor {
    // A timed-out analyzer may still be running on the blocking pool; do not
    // wait for it.
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            if Handle::try_current().is_ok() {
                std::thread::spawn(move || runtime.shutdown_background());
            } else {
                runtime.shutdown_background();
            }
        }
    }
}

fn shut_down(analyzer: &str) -> AnalyzerRun {
    AnalyzerRun {
        result: AnalysisResult::failure(AnalyzerError::failed(analyzer, "executor is shut down")),
        duration: Duration::ZERO,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

async fn run_isolated(analyzer: Arc<dyn Analyzer>, input: AnalyzerInput, limit: Duration) -> AnalyzerRun {
    let name = analyzer.name().to_string();
    let started = Instant::now();
    let task = tokio::task::spawn_blocking(move || analyzer.analyze(&input.tree, &input.text, &input.context));

    let result = match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result.renamed(&name),
        Ok(Err(err)) if err.is_panic() => AnalysisResult::failure(AnalyzerError::Panicked {
            analyzer: name.clone(),
            message: panic_message(err.into_panic()),
        }),
        Ok(Err(err)) => AnalysisResult::failure(AnalyzerError::failed(&name, err.to_string())),
        Err(_) => AnalysisResult::failure(AnalyzerError::TimedOut {
            analyzer: name.clone(),
            timeout_ms: limit.as_millis() as u64,
        }),
    };

    let duration = started.elapsed();
    tracing::debug!(
        analyzer = %name,
        elapsed_ms = duration.as_millis() as u64,
        success = result.is_success(),
        "analyzer finished"
    );
    AnalyzerRun { result, duration }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisPayload;

    struct Fixed(&'static str);

    impl Analyzer for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn analyze(&self, _: &DocumentTree, _: &str, _: &ContextIndex) -> AnalysisResult {
            AnalysisResult::success("someone-else", AnalysisPayload::Commands { commands: vec![] }, 0.5, vec![])
        }
    }

    struct Panics;

    impl Analyzer for Panics {
        fn name(&self) -> &str {
            "Panics"
        }

        fn analyze(&self, _: &DocumentTree, _: &str, _: &ContextIndex) -> AnalysisResult {
            panic!("analyzer exploded")
        }
    }

    struct Sleeps;

    impl Analyzer for Sleeps {
        fn name(&self) -> &str {
            "Sleeps"
        }

        fn analyze(&self, _: &DocumentTree, _: &str, _: &ContextIndex) -> AnalysisResult {
            std::thread::sleep(Duration::from_millis(500));
            AnalysisResult::success("Sleeps", AnalysisPayload::Commands { commands: vec![] }, 0.5, vec![])
        }
    }

    fn input() -> AnalyzerInput {
        AnalyzerInput {
            tree: Arc::new(DocumentTree::default()),
            text: Arc::from(""),
            context: Arc::new(ContextIndex::empty()),
        }
    }

    #[test]
    fn test_failures_are_isolated_and_ordered() {
        let executor = Executor::new(Duration::from_millis(100), 4).unwrap();
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(Sleeps),
            Arc::new(Fixed("first")),
            Arc::new(Panics),
            Arc::new(Fixed("second")),
        ];
        let runs = executor.run_all(&analyzers, &input());
        let names: Vec<&str> = runs.iter().map(|r| r.result.analyzer()).collect();
        assert_eq!(names, vec!["Sleeps", "first", "Panics", "second"]);

        assert!(matches!(runs[0].result.error(), Some(AnalyzerError::TimedOut { timeout_ms: 100, .. })));
        assert!(runs[1].result.is_success());
        match runs[2].result.error() {
            Some(AnalyzerError::Panicked { message, .. }) => assert_eq!(message, "analyzer exploded"),
            other => panic!("expected panic, got {:?}", other),
        }
        assert!(runs[3].result.is_success());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_all_inside_async_caller() {
        let executor = Executor::new(Duration::from_secs(5), 2).unwrap();
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![Arc::new(Fixed("a")), Arc::new(Panics)];
        let runs = executor.run_all(&analyzers, &input());
        assert!(runs[0].result.is_success());
        assert!(matches!(runs[1].result.error(), Some(AnalyzerError::Panicked { .. })));
        drop(executor);
    }

    #[test]
    fn test_run_one() {
        let executor = Executor::new(Duration::from_secs(5), 1).unwrap();
        let analyzer: Arc<dyn Analyzer> = Arc::new(Fixed("solo"));
        let run = executor.run_one(&analyzer, &input());
        assert_eq!(run.result.analyzer(), "solo");
    }
}
