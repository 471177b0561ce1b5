//! Language context spans and the index later analyzers query.
//!
//! The language detector produces `LanguageContext`s; `ContextBuilder` turns
//! them into an immutable `ContextIndex` snapshot that is shared, read-only,
//! with every analyzer that runs after it.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentTree, LineRange};
use crate::score;

/// Kind of evidence a context was derived from, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextSource {
    CodeTag,
    FileReference,
    TextMention,
}

impl ContextSource {
    pub fn base_confidence(&self) -> f64 {
        match self {
            ContextSource::CodeTag => score::tiers::CODE_TAG,
            ContextSource::FileReference => score::tiers::FILE_REFERENCE,
            ContextSource::TextMention => score::tiers::TEXT_MENTION,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContextSource::CodeTag => "code_tag",
            ContextSource::FileReference => "file_reference",
            ContextSource::TextMention => "text_mention",
        }
    }
}

/// A detected-language span with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageContext {
    pub language: String,
    pub confidence: f64,
    pub range: LineRange,
    pub evidence: Vec<String>,
    pub source: ContextSource,
    /// Analyzer that produced this context.
    pub origin: String,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl LanguageContext {
    pub fn new(
        language: impl Into<String>,
        range: LineRange,
        source: ContextSource,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            confidence: source.base_confidence(),
            range,
            evidence: Vec::new(),
            source,
            origin: origin.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = score::clamp_unit(confidence);
        self
    }

    /// Ordering used for point queries: confidence descending, then source
    /// priority, then language name.
    fn query_order(&self, other: &Self) -> Ordering {
        other
            .confidence
            .partial_cmp(&self.confidence)
            .unwrap_or(Ordering::Equal)
            .then(self.source.cmp(&other.source))
            .then_with(|| self.language.cmp(&other.language))
    }
}

/// Immutable set of language contexts supporting point queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextIndex {
    /// Sorted by range start, then end, then language.
    contexts: Vec<LanguageContext>,
}

impl ContextIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build an index from contexts. Pure: confidences are clamped, exact
    /// duplicates (same language and range) collapse into the stronger one.
    pub fn from_contexts(contexts: impl IntoIterator<Item = LanguageContext>) -> Self {
        let mut contexts: Vec<LanguageContext> = contexts
            .into_iter()
            .map(|mut c| {
                c.confidence = score::clamp_unit(c.confidence);
                c
            })
            .collect();

        contexts.sort_by(|a, b| {
            (a.range.start, a.range.end, &a.language)
                .cmp(&(b.range.start, b.range.end, &b.language))
                .then_with(|| a.query_order(b))
        });
        contexts.dedup_by(|later, earlier| {
            if later.language == earlier.language && later.range == earlier.range {
                crate::analysis::merge_evidence(&mut earlier.evidence, later.evidence.clone());
                true
            } else {
                false
            }
        });

        Self { contexts }
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn contexts(&self) -> &[LanguageContext] {
        &self.contexts
    }

    /// Contexts overlapping `line`, best first.
    pub fn at_line(&self, line: usize) -> Vec<&LanguageContext> {
        let mut hits: Vec<&LanguageContext> = self
            .contexts
            .iter()
            .take_while(|c| c.range.start <= line)
            .filter(|c| c.range.contains(line))
            .collect();
        hits.sort_by(|a, b| a.query_order(b));
        hits
    }

    pub fn best_at_line(&self, line: usize) -> Option<&LanguageContext> {
        self.at_line(line).into_iter().next()
    }

    /// Distinct languages in the index, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.contexts.iter().map(|c| c.language.as_str()).collect();
        langs.sort_unstable();
        langs.dedup();
        langs
    }

    /// Language of the strongest context; ties go to more evidence, then to
    /// the earliest position.
    pub fn primary(&self) -> Option<&str> {
        self.contexts
            .iter()
            .min_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(Ordering::Equal)
                    .then(b.evidence.len().cmp(&a.evidence.len()))
                    .then(a.range.start.cmp(&b.range.start))
            })
            .map(|c| c.language.as_str())
    }
}

/// Validates contexts against the document before indexing them.
pub struct ContextBuilder<'a> {
    tree: &'a DocumentTree,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(tree: &'a DocumentTree) -> Self {
        Self { tree }
    }

    /// Build the index. Contexts whose range does not line up with real block
    /// boundaries are dropped.
    pub fn build(&self, contexts: impl IntoIterator<Item = LanguageContext>) -> ContextIndex {
        let aligned = contexts.into_iter().filter(|c| {
            let ok = self.tree.is_block_aligned(&c.range);
            if !ok {
                tracing::debug!(
                    language = %c.language,
                    range = %c.range,
                    "dropping context not aligned to document blocks"
                );
            }
            ok
        });
        let index = ContextIndex::from_contexts(aligned);
        tracing::debug!(contexts = index.len(), languages = ?index.languages(), "context index built");
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(lang: &str, start: usize, end: usize, source: ContextSource) -> LanguageContext {
        LanguageContext::new(lang, LineRange::new(start, end), source, "LanguageDetector")
            .with_evidence(format!("{} L{}", lang, start))
    }

    #[test]
    fn test_point_query_orders_by_confidence() {
        let index = ContextIndex::from_contexts(vec![
            ctx("Python", 1, 20, ContextSource::TextMention),
            ctx("JavaScript", 5, 8, ContextSource::CodeTag),
        ]);
        let hits = index.at_line(6);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].language, "JavaScript");
        assert_eq!(index.best_at_line(12).map(|c| c.language.as_str()), Some("Python"));
        assert!(index.at_line(25).is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let index = ContextIndex::from_contexts(vec![
            ctx("Rust", 3, 5, ContextSource::CodeTag),
            ctx("Rust", 3, 5, ContextSource::CodeTag).with_evidence("other"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.contexts()[0].evidence.len(), 2);
    }

    #[test]
    fn test_primary_tie_breaks() {
        let index = ContextIndex::from_contexts(vec![
            ctx("Go", 10, 12, ContextSource::CodeTag),
            ctx("Rust", 3, 5, ContextSource::CodeTag),
        ]);
        assert_eq!(index.primary(), Some("Rust"));

        let index = ContextIndex::from_contexts(vec![
            ctx("Go", 10, 12, ContextSource::CodeTag).with_evidence("more"),
            ctx("Rust", 3, 5, ContextSource::CodeTag),
        ]);
        assert_eq!(index.primary(), Some("Go"));
        assert_eq!(ContextIndex::empty().primary(), None);
    }

    #[test]
    fn test_confidence_clamped() {
        let mut c = ctx("Go", 1, 1, ContextSource::CodeTag);
        c.confidence = 3.0;
        let index = ContextIndex::from_contexts(vec![c]);
        assert_eq!(index.contexts()[0].confidence, 1.0);
    }
}
