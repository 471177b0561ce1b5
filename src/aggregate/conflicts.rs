//! Duplicate merging and conflict resolution.

use std::collections::BTreeMap;

use crate::analysis::{merge_evidence, FrameworkFinding, Package};
use crate::diagnostics::{Diagnostic, DiagnosticCategory, Suggestion};
use crate::project::{DependencyEntry, FrameworkInfo, ReviewItem, ReviewKind};
use crate::score;

/// Whether `top` beats `runner_up` by more than `margin`.
/// The gap is rounded first so float noise cannot decide a tie.
fn clear_winner(top: f64, runner_up: f64, margin: f64) -> bool {
    score::round(top - runner_up) > margin
}

fn candidate(name: &str, confidence: f64) -> Suggestion {
    Suggestion {
        name: name.to_string(),
        reason: format!("confidence {:.2}", confidence),
        score: score::round(confidence),
    }
}

fn by_confidence<T>(items: &mut [T], conf: impl Fn(&T) -> f64, name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        conf(b)
            .partial_cmp(&conf(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| name(a).cmp(name(b)))
    });
}

/// Merge framework sightings by name: the higher confidence wins and
/// evidence is combined.
pub fn merge_frameworks(found: Vec<FrameworkFinding>) -> Vec<FrameworkInfo> {
    let mut merged: BTreeMap<String, FrameworkInfo> = BTreeMap::new();
    for f in found {
        let key = f.name.to_lowercase();
        match merged.get_mut(&key) {
            Some(existing) => {
                if f.confidence > existing.confidence {
                    existing.confidence = f.confidence;
                    existing.name = f.name;
                }
                existing.language = existing.language.take().or(f.language);
                existing.group = existing.group.take().or(f.group);
                merge_evidence(&mut existing.evidence, f.evidence);
            }
            None => {
                merged.insert(
                    key,
                    FrameworkInfo {
                        name: f.name,
                        language: f.language,
                        group: f.group,
                        confidence: score::clamp_unit(f.confidence),
                        evidence: f.evidence,
                        primary: false,
                    },
                );
            }
        }
    }
    let mut out: Vec<FrameworkInfo> = merged.into_values().collect();
    by_confidence(&mut out, |f| f.confidence, |f| f.name.as_str());
    out
}

/// Resolve exclusivity groups in place.
///
/// A lone group member is primary. With several members a warning always
/// names every candidate; the top one becomes primary only when it clears
/// the margin, otherwise the group goes to manual review.
pub fn resolve_exclusive(frameworks: &mut [FrameworkInfo], margin: f64) -> (Vec<ReviewItem>, Vec<Diagnostic>) {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, f) in frameworks.iter().enumerate() {
        if let Some(group) = &f.group {
            groups.entry(group.clone()).or_default().push(i);
        }
    }

    let mut review = Vec::new();
    let mut diagnostics = Vec::new();
    for (group, mut members) in groups {
        if members.len() == 1 {
            frameworks[members[0]].primary = true;
            continue;
        }
        {
            let fw: &[FrameworkInfo] = frameworks;
            members.sort_by(|a, b| {
                fw[*b]
                    .confidence
                    .partial_cmp(&fw[*a].confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| fw[*a].name.cmp(&fw[*b].name))
            });
        }

        let candidates: Vec<Suggestion> = members
            .iter()
            .map(|i| candidate(&frameworks[*i].name, frameworks[*i].confidence))
            .collect();
        let listing = candidates
            .iter()
            .map(|c| format!("{} ({:.2})", c.name, c.score))
            .collect::<Vec<_>>()
            .join(", ");
        let top = members[0];
        let gap = frameworks[top].confidence - frameworks[members[1]].confidence;

        let diag = Diagnostic::warning(
            DiagnosticCategory::Conflict,
            "W_CONFLICT_FRAMEWORKS",
            format!("mutually exclusive {} frameworks detected: {}", group, listing),
        )
        .with_alternatives(candidates.clone());

        if clear_winner(frameworks[top].confidence, frameworks[members[1]].confidence, margin) {
            frameworks[top].primary = true;
            diagnostics.push(diag.with_remediation(format!(
                "{} taken as primary (gap {:.2} exceeds margin {:.2})",
                frameworks[top].name, gap, margin
            )));
        } else {
            let reason = format!("confidence gap {:.2} is within margin {:.2}", gap.max(0.0), margin);
            diagnostics.push(diag.with_remediation(format!("{}; confirm which one the project uses", reason)));
            review.push(ReviewItem {
                kind: ReviewKind::IncompatibleFrameworks,
                subject: group,
                reason,
                candidates,
            });
        }
    }
    (review, diagnostics)
}

/// Merge package sightings and resolve version disagreements.
pub fn resolve_versions(packages: Vec<Package>, margin: f64) -> (Vec<DependencyEntry>, Vec<ReviewItem>, Vec<Diagnostic>) {
    let mut grouped: BTreeMap<(String, String), Vec<Package>> = BTreeMap::new();
    for pkg in packages {
        grouped.entry(pkg.key()).or_default().push(pkg);
    }

    let mut entries = Vec::new();
    let mut review = Vec::new();
    let mut diagnostics = Vec::new();

    for ((manager, _), sightings) in grouped {
        // One merged package per declared version; unversioned sightings
        // only add evidence.
        let mut versions: BTreeMap<String, Package> = BTreeMap::new();
        let mut unversioned: Option<Package> = None;
        for pkg in sightings {
            let slot = match &pkg.version {
                Some(v) => versions.get_mut(v),
                None => unversioned.as_mut(),
            };
            match slot {
                Some(existing) => {
                    if pkg.confidence > existing.confidence {
                        existing.confidence = pkg.confidence;
                        existing.dev = pkg.dev;
                    }
                    merge_evidence(&mut existing.evidence, pkg.evidence);
                }
                None => match pkg.version.clone() {
                    Some(v) => {
                        versions.insert(v, pkg);
                    }
                    None => unversioned = Some(pkg),
                },
            }
        }

        let mut ranked: Vec<Package> = versions.into_values().collect();
        by_confidence(&mut ranked, |p| p.confidence, |p| p.version.as_deref().unwrap_or(""));

        let mut evidence = Vec::new();
        for pkg in ranked.iter().chain(unversioned.iter()) {
            merge_evidence(&mut evidence, pkg.evidence.clone());
        }
        let best = ranked.first().or(unversioned.as_ref());
        let Some(best) = best else {
            continue;
        };
        let confidence = ranked
            .iter()
            .chain(unversioned.iter())
            .map(|p| p.confidence)
            .fold(0.0, f64::max);

        let mut entry = DependencyEntry {
            manager: manager.clone(),
            name: best.name.clone(),
            version: best.version.clone(),
            alternate_versions: Vec::new(),
            dev: best.dev,
            confidence: score::clamp_unit(confidence),
            evidence,
            needs_review: false,
        };

        if ranked.len() > 1 {
            let listing = ranked
                .iter()
                .map(|p| format!("{} ({:.2})", p.version.as_deref().unwrap_or("?"), p.confidence))
                .collect::<Vec<_>>()
                .join(", ");
            let subject = format!("{} ({})", entry.name, manager);
            if clear_winner(ranked[0].confidence, ranked[1].confidence, margin) {
                diagnostics.push(Diagnostic::info(
                    DiagnosticCategory::Conflict,
                    "I_VERSION_RESOLVED",
                    format!("{} declared with several versions: {}; using the best supported one", subject, listing),
                ));
            } else {
                entry.alternate_versions = ranked[1..].iter().filter_map(|p| p.version.clone()).collect();
                entry.needs_review = true;
                let candidates: Vec<Suggestion> = ranked
                    .iter()
                    .filter_map(|p| p.version.as_deref().map(|v| candidate(v, p.confidence)))
                    .collect();
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticCategory::Conflict,
                        "W_CONFLICT_VERSION",
                        format!("{} declared with conflicting versions: {}", subject, listing),
                    )
                    .with_alternatives(candidates.clone())
                    .with_remediation("pin a single version in the document"),
                );
                review.push(ReviewItem {
                    kind: ReviewKind::VersionConflict,
                    subject,
                    reason: format!("versions are within margin {:.2} of each other", margin),
                    candidates,
                });
            }
        }
        entries.push(entry);
    }
    (entries, review, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framework(name: &str, group: Option<&str>, confidence: f64, evidence: &str) -> FrameworkFinding {
        FrameworkFinding {
            name: name.to_string(),
            language: Some("JavaScript".to_string()),
            group: group.map(str::to_string),
            confidence,
            evidence: vec![evidence.to_string()],
        }
    }

    fn package(name: &str, version: Option<&str>, confidence: f64) -> Package {
        Package {
            manager: "npm".to_string(),
            name: name.to_string(),
            version: version.map(str::to_string),
            dev: false,
            confidence,
            evidence: vec![format!("{}@{:?}", name, version)],
        }
    }

    #[test]
    fn test_duplicate_keeps_higher_and_merges_evidence() {
        let merged = merge_frameworks(vec![
            framework("React", Some("frontend-ui"), 0.6, "mention L3"),
            framework("React", Some("frontend-ui"), 0.9, "package `react` (npm)"),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.9);
        assert_eq!(merged[0].evidence.len(), 2);
    }

    #[test]
    fn test_exclusive_group_clear_winner() {
        let mut frameworks = merge_frameworks(vec![
            framework("Next.js", Some("fullstack-web"), 0.9, "a"),
            framework("Nuxt", Some("fullstack-web"), 0.6, "b"),
            framework("Tailwind CSS", None, 0.6, "c"),
        ]);
        let (review, diags) = resolve_exclusive(&mut frameworks, 0.15);
        assert!(review.is_empty());
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Next.js") && diags[0].message.contains("Nuxt"));
        let primary: Vec<&str> = frameworks.iter().filter(|f| f.primary).map(|f| f.name.as_str()).collect();
        assert_eq!(primary, vec!["Next.js"]);
    }

    #[test]
    fn test_exclusive_group_within_margin() {
        let mut frameworks = merge_frameworks(vec![
            framework("Next.js", Some("fullstack-web"), 0.75, "a"),
            framework("Nuxt", Some("fullstack-web"), 0.6, "b"),
        ]);
        let (review, diags) = resolve_exclusive(&mut frameworks, 0.15);
        assert_eq!(review.len(), 1);
        assert_eq!(review[0].candidates.len(), 2);
        assert_eq!(diags[0].severity, crate::diagnostics::Severity::Warning);
        assert!(frameworks.iter().all(|f| !f.primary));
    }

    #[test]
    fn test_exclusive_group_unsorted_input() {
        let info = |name: &str, confidence: f64| FrameworkInfo {
            name: name.to_string(),
            language: Some("Python".to_string()),
            group: Some("python-web".to_string()),
            confidence,
            evidence: vec![format!("mention {}", name)],
            primary: false,
        };
        let mut frameworks = vec![info("Flask", 0.5), info("Django", 0.95), info("FastAPI", 0.6)];
        let (review, diags) = resolve_exclusive(&mut frameworks, 0.15);
        assert!(review.is_empty());
        let names: Vec<&str> = diags[0].alternatives.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Django", "FastAPI", "Flask"]);
        assert!(frameworks[1].primary);
        assert!(!frameworks[0].primary && !frameworks[2].primary);
    }

    #[test]
    fn test_version_conflicts() {
        let (entries, review, _) = resolve_versions(
            vec![package("react", Some("17.0.2"), 0.85), package("react", Some("18.2.0"), 0.9)],
            0.15,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version.as_deref(), Some("18.2.0"));
        assert_eq!(entries[0].alternate_versions, vec!["17.0.2".to_string()]);
        assert!(entries[0].needs_review);
        assert_eq!(review.len(), 1);

        let (entries, review, diags) = resolve_versions(
            vec![
                package("react", Some("17.0.2"), 0.5),
                package("react", Some("18.2.0"), 0.9),
                package("react", None, 0.7),
            ],
            0.15,
        );
        assert_eq!(entries[0].version.as_deref(), Some("18.2.0"));
        assert!(entries[0].alternate_versions.is_empty());
        assert_eq!(entries[0].evidence.len(), 3);
        assert!(review.is_empty());
        assert_eq!(diags[0].severity, crate::diagnostics::Severity::Info);
    }
}
