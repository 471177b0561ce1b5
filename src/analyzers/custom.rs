//! Config-declared pattern analyzers.

use std::collections::BTreeMap;

use regex::Regex;

use crate::analysis::{AnalysisPayload, AnalysisResult, Analyzer, Finding};
use crate::config::{PatternAnalyzerConfig, PatternScope};
use crate::context::ContextIndex;
use crate::document::DocumentTree;
use crate::score;

struct CompiledRule {
    regex: Regex,
    label: String,
    confidence: f64,
}

/// Reports a labelled finding for every pattern that matches the document.
pub struct PatternAnalyzer {
    name: String,
    category: String,
    scope: PatternScope,
    rules: Vec<CompiledRule>,
}

impl PatternAnalyzer {
    pub fn from_config(config: &PatternAnalyzerConfig) -> Result<Self, regex::Error> {
        let rules = config
            .patterns
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    regex: Regex::new(&rule.pattern)?,
                    label: rule.label.clone(),
                    confidence: score::clamp_unit(rule.confidence()),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self {
            name: config.name.clone(),
            category: config.category.clone(),
            scope: config.scope,
            rules,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

impl std::fmt::Debug for PatternAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternAnalyzer")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("scope", &self.scope)
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl Analyzer for PatternAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), String> {
        if self.category.trim().is_empty() {
            return Err("category is empty".to_string());
        }
        if self.rules.is_empty() {
            return Err("no patterns".to_string());
        }
        Ok(())
    }

    fn analyze(&self, tree: &DocumentTree, _text: &str, _context: &ContextIndex) -> AnalysisResult {
        let mut findings: BTreeMap<&str, Finding> = BTreeMap::new();

        for block in tree.blocks() {
            let wanted = match self.scope {
                PatternScope::Code => block.is_code(),
                PatternScope::Prose => block.is_prose(),
                PatternScope::All => true,
            };
            if !wanted {
                continue;
            }
            for rule in &self.rules {
                let Some(m) = rule.regex.find(&block.text) else {
                    continue;
                };
                let line = block.lines.start + block.text[..m.start()].matches('\n').count()
                    + usize::from(block.is_code() && block.fenced);
                let finding = Finding::new(
                    rule.label.as_str(),
                    rule.confidence,
                    format!("`{}` L{}", m.as_str(), line),
                )
                .at_line(line);
                match findings.get_mut(rule.label.as_str()) {
                    Some(existing) => existing.absorb(finding),
                    None => {
                        findings.insert(rule.label.as_str(), finding);
                    }
                }
            }
        }

        let findings: Vec<Finding> = findings
            .into_values()
            .map(|mut f| {
                f.confidence = score::boosted(f.confidence, f.evidence.len() - 1);
                f
            })
            .collect();
        let confidences: Vec<f64> = findings.iter().map(|f| f.confidence).collect();
        let mut sources: Vec<String> = findings.iter().flat_map(|f| f.evidence.iter().cloned()).collect();
        sources.sort();
        sources.dedup();

        AnalysisResult::success(
            &self.name,
            AnalysisPayload::Custom {
                category: self.category.clone(),
                findings,
            },
            score::combine(&confidences),
            sources,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternRule;
    use crate::document::DocumentParser;
    use indoc::indoc;

    fn analyzer(scope: PatternScope) -> PatternAnalyzer {
        PatternAnalyzer::from_config(&PatternAnalyzerConfig {
            name: "container-detector".to_string(),
            category: "containers".to_string(),
            scope,
            patterns: vec![PatternRule {
                pattern: r"(?i)\bdocker(file|-compose)?\b".to_string(),
                label: "Docker".to_string(),
                confidence: Some(0.8),
            }],
        })
        .unwrap()
    }

    fn findings(scope: PatternScope, text: &str) -> Vec<Finding> {
        let tree = DocumentParser::default().parse(text).unwrap();
        match analyzer(scope).analyze(&tree, text, &ContextIndex::empty()).into_payload() {
            Some(AnalysisPayload::Custom { category, findings }) => {
                assert_eq!(category, "containers");
                findings
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    const DOC: &str = indoc! {"
        Ships with a Dockerfile.

        ```bash
        docker compose up
        ```
    "};

    #[test]
    fn test_all_scope_merges_sightings() {
        let found = findings(PatternScope::All, DOC);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].evidence.len(), 2);
        assert_eq!(found[0].line, Some(1));
        assert!(found[0].confidence > 0.8);
    }

    #[test]
    fn test_scopes() {
        assert_eq!(findings(PatternScope::Code, DOC)[0].line, Some(4));
        assert_eq!(findings(PatternScope::Prose, DOC)[0].line, Some(1));
    }

    #[test]
    fn test_invalid_pattern() {
        let config = PatternAnalyzerConfig {
            name: "broken".to_string(),
            category: "x".to_string(),
            scope: PatternScope::All,
            patterns: vec![PatternRule {
                pattern: "(".to_string(),
                label: "X".to_string(),
                confidence: None,
            }],
        };
        assert!(PatternAnalyzer::from_config(&config).is_err());
    }
}
