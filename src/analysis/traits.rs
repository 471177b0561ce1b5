//! Core analyzer trait.

use serde::{Deserialize, Serialize};

use crate::context::ContextIndex;
use crate::document::DocumentTree;

use super::AnalysisResult;

/// What an analyzer declares it can do.
///
/// The registry checks these before accepting an analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Implements `analyze`. Required.
    pub analyze: bool,
    /// Reads the language context index.
    pub uses_context: bool,
    /// Produces the language contexts later analyzers consume.
    /// At most one registered analyzer may provide context.
    pub provides_context: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            analyze: true,
            uses_context: false,
            provides_context: false,
        }
    }
}

impl Capabilities {
    pub fn context_provider() -> Self {
        Self {
            provides_context: true,
            ..Self::default()
        }
    }

    pub fn context_consumer() -> Self {
        Self {
            uses_context: true,
            ..Self::default()
        }
    }
}

/// A single extraction pass over a parsed document.
///
/// Analyzers are stateless with respect to a run: every call receives its own
/// immutable tree, raw text and context snapshot, so independent analyzers can
/// run on separate threads.
///
/// # Failure
///
/// Return `AnalysisResult::failure` for expected failures. Panics are caught
/// by the pipeline and reported the same way.
pub trait Analyzer: Send + Sync {
    /// Unique registry name, e.g. `"CommandExtractor"`.
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }

    /// Check the analyzer's own configuration before it is registered.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn analyze(&self, tree: &DocumentTree, text: &str, context: &ContextIndex) -> AnalysisResult;
}
