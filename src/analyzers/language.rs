//! Language detection: the analyzer that provides context to all others.

use std::collections::BTreeMap;

use crate::analysis::{
    merge_evidence, AnalysisPayload, AnalysisResult, Analyzer, Capabilities, FrameworkFinding,
    LanguageSummary,
};
use crate::context::{ContextIndex, ContextSource, LanguageContext};
use crate::document::{Block, DocumentTree};
use crate::score;

use super::catalog::{self, TagMatch, FRAMEWORKS, FRAMEWORK_MENTIONS, LANGUAGE_MENTIONS};

/// Base confidence of a framework named in prose.
const FRAMEWORK_MENTION: f64 = 0.6;

/// Maximum blank lines between a prose block and the code block it describes.
const NEAR_CODE_GAP: usize = 1;

/// Detects languages from code-block tags, file references and prose.
#[derive(Debug, Default)]
pub struct LanguageDetector;

impl LanguageDetector {
    pub const NAME: &'static str = "LanguageDetector";

    pub fn new() -> Self {
        Self
    }

    fn context(
        language: &str,
        block_range: crate::document::LineRange,
        source: ContextSource,
        evidence: String,
    ) -> LanguageContext {
        LanguageContext::new(language, block_range, source, Self::NAME).with_evidence(evidence)
    }

    /// File names mentioned in a prose block, with the language they imply.
    fn file_mentions(block: &Block) -> Vec<(String, &'static str)> {
        let mut found = Vec::new();
        let sources = std::iter::once(block.text.as_str()).chain(block.inline_code.iter().map(|s| s.as_str()));
        for text in sources {
            for cap in catalog::FILE_NAME.captures_iter(text) {
                let file = &cap[1];
                if let Some(lang) = catalog::language_for_file(file) {
                    found.push((file.to_string(), lang));
                }
            }
        }
        found.sort();
        found.dedup();
        found
    }

    /// Languages named in free text, first occurrence per language.
    fn text_mentions(text: &str) -> Vec<&'static str> {
        let mut langs: Vec<&'static str> = LANGUAGE_MENTIONS
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, lang)| *lang)
            .collect();
        langs.sort_unstable();
        langs.dedup();
        langs
    }

    /// Collect raw contexts and unmatched tags.
    fn collect(&self, tree: &DocumentTree) -> (Vec<LanguageContext>, Vec<String>) {
        let mut contexts = Vec::new();
        let mut unmatched = Vec::new();
        // Prose blocks whose file mentions were attached to a code block.
        let mut used_for_code = vec![false; tree.len()];

        for block in tree.code_blocks() {
            if let Some(tag) = block.lang_tag() {
                match catalog::resolve_tag(tag) {
                    TagMatch::Language(lang) => contexts.push(Self::context(
                        lang,
                        block.lines,
                        ContextSource::CodeTag,
                        format!("tag `{}` L{}", tag, block.lines.start),
                    )),
                    TagMatch::Unknown => unmatched.push(tag.to_string()),
                    TagMatch::Neutral => {}
                }
            }

            let prev = block
                .index
                .checked_sub(1)
                .and_then(|i| tree.block(i))
                .filter(|p| p.is_prose() && p.lines.gap_to(&block.lines) <= NEAR_CODE_GAP);
            if let Some(prev) = prev {
                let mentions = Self::file_mentions(prev);
                if !mentions.is_empty() {
                    used_for_code[prev.index] = true;
                }
                for (file, lang) in mentions {
                    contexts.push(Self::context(
                        lang,
                        block.lines,
                        ContextSource::FileReference,
                        format!("file `{}` L{}", file, prev.lines.start),
                    ));
                }
            }
        }

        for block in tree.prose_blocks() {
            if block.is_badge_row() {
                continue;
            }
            let range = if block.is_heading() {
                tree.section_range(block.index).unwrap_or(block.lines)
            } else {
                block.lines
            };
            let kind = if block.is_heading() { "heading" } else { "mention" };

            for lang in Self::text_mentions(&block.text) {
                contexts.push(Self::context(
                    lang,
                    range,
                    ContextSource::TextMention,
                    format!("{} `{}` L{}", kind, lang, block.lines.start),
                ));
            }
            if !used_for_code[block.index] {
                for (file, lang) in Self::file_mentions(block) {
                    contexts.push(Self::context(
                        lang,
                        block.lines,
                        ContextSource::TextMention,
                        format!("file `{}` L{}", file, block.lines.start),
                    ));
                }
            }
        }

        unmatched.sort();
        unmatched.dedup();
        (contexts, unmatched)
    }

    /// Apply source priority and corroboration.
    ///
    /// A context fully covered by a higher-priority one is folded into it when
    /// both agree, and dropped when they disagree. Equal-priority
    /// disagreements are all kept.
    fn resolve(&self, raw: Vec<LanguageContext>) -> Vec<LanguageContext> {
        let mut merged: Vec<LanguageContext> = Vec::new();
        for ctx in raw {
            match merged
                .iter_mut()
                .find(|m| m.language == ctx.language && m.range == ctx.range && m.source == ctx.source)
            {
                Some(m) => merge_evidence(&mut m.evidence, ctx.evidence),
                None => merged.push(ctx),
            }
        }
        merged.sort_by(|a, b| {
            (a.source, a.range.start, a.range.end, &a.language)
                .cmp(&(b.source, b.range.start, b.range.end, &b.language))
        });

        let mut kept: Vec<LanguageContext> = Vec::new();
        for ctx in merged {
            let winner = kept
                .iter()
                .position(|k| k.source < ctx.source && k.range.covers(&ctx.range));
            match winner {
                Some(i) if kept[i].language == ctx.language => {
                    merge_evidence(&mut kept[i].evidence, ctx.evidence)
                }
                Some(i) => {
                    tracing::trace!(
                        dropped = %ctx.language,
                        kept = %kept[i].language,
                        range = %ctx.range,
                        "higher-priority context wins"
                    );
                }
                None => kept.push(ctx),
            }
        }

        let mut per_language: BTreeMap<String, usize> = BTreeMap::new();
        for ctx in &kept {
            *per_language.entry(ctx.language.clone()).or_insert(0) += ctx.evidence.len();
        }
        for ctx in &mut kept {
            ctx.evidence.sort();
            let total = per_language.get(&ctx.language).copied().unwrap_or(1);
            ctx.confidence = score::boosted(ctx.source.base_confidence(), total.saturating_sub(1));
        }
        kept
    }

    fn summarize(contexts: &[LanguageContext]) -> Vec<LanguageSummary> {
        let mut by_lang: BTreeMap<&str, LanguageSummary> = BTreeMap::new();
        for ctx in contexts {
            let entry = by_lang.entry(ctx.language.as_str()).or_insert_with(|| LanguageSummary {
                name: ctx.language.clone(),
                confidence: 0.0,
                evidence: Vec::new(),
                contexts: 0,
                first_line: ctx.range.start,
            });
            entry.confidence = entry.confidence.max(ctx.confidence);
            entry.contexts += 1;
            entry.first_line = entry.first_line.min(ctx.range.start);
            merge_evidence(&mut entry.evidence, ctx.evidence.clone());
        }

        let mut summaries: Vec<LanguageSummary> = by_lang.into_values().collect();
        summaries.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.evidence.len().cmp(&a.evidence.len()))
                .then(a.first_line.cmp(&b.first_line))
                .then_with(|| a.name.cmp(&b.name))
        });
        summaries
    }

    fn frameworks(tree: &DocumentTree) -> Vec<FrameworkFinding> {
        let mut found: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for block in tree.prose_blocks() {
            for (re, idx) in FRAMEWORK_MENTIONS.iter() {
                if re.is_match(&block.text) {
                    found
                        .entry(*idx)
                        .or_default()
                        .push(format!("mention L{}", block.lines.start));
                }
            }
        }

        found
            .into_iter()
            .map(|(idx, evidence)| {
                let spec = &FRAMEWORKS[idx];
                FrameworkFinding {
                    name: spec.name.to_string(),
                    language: Some(spec.language.to_string()),
                    group: spec.group.map(str::to_string),
                    confidence: score::boosted(FRAMEWORK_MENTION, evidence.len() - 1),
                    evidence,
                }
            })
            .collect()
    }
}

impl Analyzer for LanguageDetector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::context_provider()
    }

    fn analyze(&self, tree: &DocumentTree, _text: &str, _context: &ContextIndex) -> AnalysisResult {
        let (raw, unmatched) = self.collect(tree);
        let contexts = self.resolve(raw);
        let summaries = Self::summarize(&contexts);
        let primary = summaries.first().map(|s| s.name.clone());
        let frameworks = Self::frameworks(tree);

        let confidence = score::combine(&summaries.iter().map(|s| s.confidence).collect::<Vec<_>>());
        let mut sources: Vec<String> = summaries.iter().flat_map(|s| s.evidence.clone()).collect();
        sources.extend(frameworks.iter().flat_map(|f| f.evidence.clone()));

        tracing::debug!(
            contexts = contexts.len(),
            primary = primary.as_deref().unwrap_or("-"),
            unmatched = unmatched.len(),
            "languages detected"
        );

        AnalysisResult::success(
            Self::NAME,
            AnalysisPayload::Languages {
                contexts,
                summaries,
                primary,
                frameworks,
                unmatched,
            },
            confidence,
            sources,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentParser, LineRange};
    use indoc::indoc;

    fn detect(text: &str) -> (Vec<LanguageContext>, Vec<LanguageSummary>, Option<String>, Vec<FrameworkFinding>, Vec<String>) {
        let tree = DocumentParser::default().parse(text).unwrap();
        let result = LanguageDetector::new().analyze(&tree, text, &ContextIndex::empty());
        match result.into_payload() {
            Some(AnalysisPayload::Languages {
                contexts,
                summaries,
                primary,
                frameworks,
                unmatched,
            }) => (contexts, summaries, primary, frameworks, unmatched),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_code_tags_produce_contexts() {
        let (contexts, summaries, primary, _, unmatched) = detect(indoc! {"
            ```js
            console.log('hi')
            ```

            ```python
            print('hi')
            ```

            ```cobolx
            DISPLAY 'HI'
            ```
        "});
        assert_eq!(contexts.len(), 2);
        assert_eq!(contexts[0].language, "JavaScript");
        assert_eq!(contexts[0].range, LineRange::new(1, 3));
        assert_eq!(contexts[0].source, ContextSource::CodeTag);
        assert_eq!(contexts[0].confidence, score::tiers::CODE_TAG);
        assert_eq!(summaries.len(), 2);
        // Equal confidence and evidence: earliest wins.
        assert_eq!(primary.as_deref(), Some("JavaScript"));
        assert_eq!(unmatched, vec!["cobolx".to_string()]);
    }

    #[test]
    fn test_file_reference_near_untagged_block() {
        let (contexts, _, _, _, _) = detect(indoc! {"
            Save this as `app.py`:

            ```
            print('hello')
            ```
        "});
        let file_ctx = contexts
            .iter()
            .find(|c| c.source == ContextSource::FileReference)
            .expect("file reference context");
        assert_eq!(file_ctx.language, "Python");
        assert_eq!(file_ctx.range, LineRange::new(3, 5));
        assert_eq!(file_ctx.confidence, score::tiers::FILE_REFERENCE);
    }

    #[test]
    fn test_higher_priority_wins_on_disagreement() {
        let (contexts, _, _, _, _) = detect(indoc! {"
            Put this in `main.py`:

            ```ruby
            puts 'hi'
            ```
        "});
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].language, "Ruby");
    }

    #[test]
    fn test_agreeing_reference_corroborates() {
        let (contexts, _, _, _, _) = detect(indoc! {"
            Put this in `main.rs`:

            ```rust
            fn main() {}
            ```
        "});
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].evidence.len(), 2);
        assert!(contexts[0].confidence > score::tiers::CODE_TAG);
    }

    #[test]
    fn test_heading_mention_spans_section() {
        let (contexts, _, _, _, _) = detect(indoc! {"
            ## Python client

            ```bash
            pip install demo
            ```

            ## Other
        "});
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].language, "Python");
        assert_eq!(contexts[0].source, ContextSource::TextMention);
        assert_eq!(contexts[0].range, LineRange::new(1, 5));
    }

    #[test]
    fn test_equal_priority_disagreement_kept() {
        let (contexts, summaries, _, _, _) = detect("Bindings exist for Rust and Python.\n");
        assert_eq!(contexts.len(), 2);
        assert_eq!(summaries.len(), 2);
    }

    #[test]
    fn test_framework_mentions() {
        let (_, _, _, frameworks, _) = detect("A React app.\n\nBuilt with React and Django.\n");
        let react = frameworks.iter().find(|f| f.name == "React").unwrap();
        assert_eq!(react.evidence.len(), 2);
        assert!(react.confidence > FRAMEWORK_MENTION);
        assert_eq!(react.group.as_deref(), Some("frontend-ui"));
        assert!(frameworks.iter().any(|f| f.name == "Django"));
    }

    #[test]
    fn test_empty_document() {
        let (contexts, summaries, primary, frameworks, unmatched) = detect("");
        assert!(contexts.is_empty() && summaries.is_empty() && frameworks.is_empty() && unmatched.is_empty());
        assert_eq!(primary, None);
    }
}
