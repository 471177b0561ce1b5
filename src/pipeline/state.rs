//! Pipeline stages and the transitions allowed between them.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Where a pipeline run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Initialized,
    Parsed,
    LanguageDetected,
    ContextBuilt,
    AnalyzersRun,
    Aggregated,
    Finalized,
    /// The document could not be read or parsed.
    Failed,
    /// The caller cancelled the run at a stage boundary.
    Cancelled,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Initialized => "initialized",
            PipelineState::Parsed => "parsed",
            PipelineState::LanguageDetected => "language_detected",
            PipelineState::ContextBuilt => "context_built",
            PipelineState::AnalyzersRun => "analyzers_run",
            PipelineState::Aggregated => "aggregated",
            PipelineState::Finalized => "finalized",
            PipelineState::Failed => "failed",
            PipelineState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Finalized | PipelineState::Failed | PipelineState::Cancelled
        )
    }

    /// The stage that follows this one on the happy path.
    fn next(&self) -> Option<PipelineState> {
        match self {
            PipelineState::Initialized => Some(PipelineState::Parsed),
            PipelineState::Parsed => Some(PipelineState::LanguageDetected),
            PipelineState::LanguageDetected => Some(PipelineState::ContextBuilt),
            PipelineState::ContextBuilt => Some(PipelineState::AnalyzersRun),
            PipelineState::AnalyzersRun => Some(PipelineState::Aggregated),
            PipelineState::Aggregated => Some(PipelineState::Finalized),
            _ => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    ///
    /// `Failed` is only reachable before anything was parsed; `Cancelled`
    /// from any non-terminal state.
    pub fn can_advance_to(&self, to: PipelineState) -> bool {
        match to {
            PipelineState::Failed => *self == PipelineState::Initialized,
            PipelineState::Cancelled => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks the state of one run and refuses out-of-order transitions.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: PipelineState,
    history: Vec<PipelineState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Initialized,
            history: vec![PipelineState::Initialized],
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn advance(&mut self, to: PipelineState) -> Result<(), PipelineError> {
        if !self.state.can_advance_to(to) {
            return Err(PipelineError::InvalidTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        tracing::debug!(from = %self.state, to = %to, "pipeline transition");
        self.state = to;
        self.history.push(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut sm = StateMachine::new();
        for to in [
            PipelineState::Parsed,
            PipelineState::LanguageDetected,
            PipelineState::ContextBuilt,
            PipelineState::AnalyzersRun,
            PipelineState::Aggregated,
            PipelineState::Finalized,
        ] {
            sm.advance(to).unwrap();
        }
        assert_eq!(sm.state(), PipelineState::Finalized);
        assert_eq!(sm.history().len(), 7);
        assert!(sm.advance(PipelineState::Cancelled).is_err());
    }

    #[test]
    fn test_rejects_skipped_and_late_failures() {
        let mut sm = StateMachine::new();
        assert_eq!(
            sm.advance(PipelineState::ContextBuilt),
            Err(PipelineError::InvalidTransition {
                from: "initialized".to_string(),
                to: "context_built".to_string()
            })
        );
        sm.advance(PipelineState::Parsed).unwrap();
        assert!(sm.advance(PipelineState::Failed).is_err());
        sm.advance(PipelineState::Cancelled).unwrap();
        assert!(sm.state().is_terminal());
    }
}
