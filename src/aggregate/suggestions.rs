//! Ranked, non-authoritative alternatives for low-confidence or unmatched
//! evidence. Suggestions are attached to diagnostics only; they never change
//! the project record.

use crate::analyzers::catalog::{self, TESTING};
use crate::diagnostics::Suggestion;
use crate::project::{FrameworkInfo, LanguageInfo, TestingInfo};
use crate::score;

/// Most suggestions attached to one diagnostic.
const MAX_SUGGESTIONS: usize = 5;
/// Below this similarity a language name is not offered for a tag.
const MIN_SIMILARITY: f64 = 0.5;
/// Score of a framework whose name equals an unmatched tag.
const NAMED_FRAMEWORK: f64 = 0.6;
/// Share of a language's confidence lent to its common frameworks.
const LANGUAGE_SHARE: f64 = 0.5;

/// Levenshtein distance over characters.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            row[j + 1] = (prev[j + 1] + 1).min(row[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Case-insensitive similarity in [0,1].
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

pub(crate) fn ranked(mut suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    suggestions.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    suggestions.dedup_by(|a, b| a.name == b.name);
    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Alternatives for a code-block tag that matched no known language.
pub fn for_unmatched_tag(tag: &str) -> Vec<Suggestion> {
    let mut out = Vec::new();
    if let Some(framework) = catalog::framework_by_name(tag) {
        out.push(Suggestion {
            name: framework.name.to_string(),
            reason: format!("tag names the {} framework ({})", framework.name, framework.language),
            score: NAMED_FRAMEWORK,
        });
    }
    for language in catalog::known_languages() {
        let sim = similarity(tag, language);
        if sim >= MIN_SIMILARITY {
            out.push(Suggestion {
                name: language.to_string(),
                reason: format!("tag resembles {}", language),
                score: score::round(sim),
            });
        }
    }
    ranked(out)
}

/// Common frameworks of the detected languages that were not detected.
pub fn frameworks_for_languages(languages: &[LanguageInfo], detected: &[FrameworkInfo]) -> Vec<Suggestion> {
    let mut out = Vec::new();
    for lang in languages {
        for spec in catalog::frameworks_for_language(&lang.name) {
            if detected.iter().any(|f| f.name == spec.name) {
                continue;
            }
            out.push(Suggestion {
                name: spec.name.to_string(),
                reason: format!("common {} framework", lang.name),
                score: score::round(lang.confidence * LANGUAGE_SHARE),
            });
        }
    }
    ranked(out)
}

/// Testing frameworks of the detected languages that were not detected.
pub fn testing_for_languages(languages: &[LanguageInfo], detected: &TestingInfo) -> Vec<Suggestion> {
    let mut out = Vec::new();
    for lang in languages {
        for spec in TESTING.iter().filter(|t| t.language == Some(lang.name.as_str())) {
            let known = detected
                .frameworks
                .iter()
                .chain(&detected.tools)
                .any(|f| f.name == spec.name);
            if known {
                continue;
            }
            out.push(Suggestion {
                name: spec.name.to_string(),
                reason: format!("{} testing tool", lang.name),
                score: score::round(lang.confidence * LANGUAGE_SHARE),
            });
        }
    }
    ranked(out)
}
