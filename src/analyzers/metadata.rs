//! Project metadata: name, description, license, repository, environment
//! variables and directory layout.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::{AnalysisPayload, AnalysisResult, Analyzer, EnvVar, Finding, MetadataField};
use crate::context::ContextIndex;
use crate::document::{Block, BlockKind, DocumentTree};
use crate::score;

mod conf {
    pub const H1: f64 = 0.9;
    pub const CLONE_NAME: f64 = 0.7;
    pub const MANIFEST_NAME: f64 = 0.8;
    pub const DESCRIPTION: f64 = 0.8;
    pub const MANIFEST_DESCRIPTION: f64 = 0.7;
    pub const LICENSE_SECTION: f64 = 0.9;
    pub const LICENSE_MANIFEST: f64 = 0.85;
    pub const LICENSE_TEXT: f64 = 0.7;
    pub const CLONE_URL: f64 = 0.9;
    pub const REPO_LINK: f64 = 0.6;
    pub const ENV_EXPORT: f64 = 0.9;
    pub const ENV_DOTENV: f64 = 0.8;
    pub const ENV_ACCESS: f64 = 0.85;
    pub const ENV_PROSE: f64 = 0.7;
    pub const TREE_ENTRY: f64 = 0.8;
    pub const DIR_MENTION: f64 = 0.6;
}

/// Paragraphs shorter than this are not taken as the description.
const MIN_DESCRIPTION_CHARS: usize = 20;

/// Code-block tags whose `NAME=value` lines are environment assignments.
const DOTENV_TAGS: &[&str] = &["env", "dotenv", "ini", "properties", "bash", "sh", "shell", "console", "text", "txt"];

lazy_static! {
    static ref CLONE_URL: Regex = Regex::new(
        r"git\s+clone\s+(?:--?[\w-]+(?:=\S+)?\s+)*((?:https?://|git@|ssh://)\S+)"
    ).unwrap();

    static ref REPO_URL: Regex = Regex::new(
        r"^https?://(?:www\.)?([\w-]+(?:\.[\w-]+)+)/([\w.-]+)/([\w.-]+)$"
    ).unwrap();

    static ref SSH_REMOTE: Regex =
        Regex::new(r"^git@([\w.-]+):([\w.-]+)/([\w.-]+?)(?:\.git)?/?$").unwrap();

    static ref EXPORT: Regex =
        Regex::new(r"^\s*(?:[$>]\s+)?(?:export|set|setx)\s+([A-Z][A-Z0-9_]+)\s*=|^\s*\$env:([A-Z][A-Z0-9_]+)\s*=").unwrap();

    static ref DOTENV: Regex = Regex::new(r"^\s*([A-Z][A-Z0-9_]+)=").unwrap();

    static ref ENV_ACCESS: Regex = Regex::new(concat!(
        r#"process\.env\.([A-Z][A-Z0-9_]+)"#,
        r#"|process\.env\[['"]([A-Z][A-Z0-9_]+)['"]\]"#,
        r#"|os\.environ(?:\.get)?[\[(]['"]([A-Z][A-Z0-9_]+)['"]"#,
        r#"|os\.getenv\(['"]([A-Z][A-Z0-9_]+)['"]"#,
        r#"|os\.Getenv\("([A-Z][A-Z0-9_]+)"\)"#,
        r#"|env::var(?:_os)?\("([A-Z][A-Z0-9_]+)"\)"#,
        r#"|ENV(?:\.fetch\(|\[)['"]([A-Z][A-Z0-9_]+)['"]"#,
        r#"|System\.getenv\("([A-Z][A-Z0-9_]+)"\)"#,
        r#"|Environment\.GetEnvironmentVariable\("([A-Z][A-Z0-9_]+)"\)"#,
    )).unwrap();

    static ref ENV_NAME: Regex = Regex::new(r"^(?:[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+|[A-Z]{3,})$").unwrap();

    static ref CONFIG_HEADING: Regex =
        Regex::new(r"(?i)\b(config|configuration|environment|env|variables|settings)\b").unwrap();

    static ref TREE_ENTRY: Regex =
        Regex::new(r"(?:├──|└──|\|--|`--|\+--)\s*([^\s#]+)").unwrap();

    static ref DIR_MENTION: Regex = Regex::new(r"^[\w.-]+(?:/[\w.-]+)*/$").unwrap();

    /// License patterns with their SPDX identifiers.
    static ref LICENSES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)\bAGPL[- ]?v?3|\bGNU Affero General Public License").unwrap(), "AGPL-3.0"),
        (Regex::new(r"(?i)\bLGPL[- ]?v?3|\bGNU Lesser General Public License,? (?:v|version )?3").unwrap(), "LGPL-3.0"),
        (Regex::new(r"(?i)\bLGPL[- ]?v?2").unwrap(), "LGPL-2.1"),
        (Regex::new(r"(?i)\bGPL[- ]?v?3|\bGNU General Public License,? (?:v|version )?3").unwrap(), "GPL-3.0"),
        (Regex::new(r"(?i)\bGPL[- ]?v?2|\bGNU General Public License,? (?:v|version )?2").unwrap(), "GPL-2.0"),
        (Regex::new(r"(?i)\bApache(?:[- ]License)?,?[- ](?:v|Version )?2(?:\.0)?\b").unwrap(), "Apache-2.0"),
        (Regex::new(r"(?i)\bMPL[- ]?2(?:\.0)?\b|\bMozilla Public License,? (?:v|version )?2").unwrap(), "MPL-2.0"),
        (Regex::new(r"(?i)\bBSD[- ]3[- ]Clause\b").unwrap(), "BSD-3-Clause"),
        (Regex::new(r"(?i)\bBSD[- ]2[- ]Clause\b").unwrap(), "BSD-2-Clause"),
        (Regex::new(r"\bMIT\b").unwrap(), "MIT"),
        (Regex::new(r"\bISC\b").unwrap(), "ISC"),
        (Regex::new(r"(?i)\bUnlicense\b").unwrap(), "Unlicense"),
        (Regex::new(r"(?i)\bCC0\b").unwrap(), "CC0-1.0"),
        (Regex::new(r"(?i)\bBoost Software License\b|\bBSL-1\.0\b").unwrap(), "BSL-1.0"),
    ];
}

/// SPDX expression for a license text, ordered by first appearance.
/// Several licenses join with `OR`.
pub fn normalize_license(text: &str) -> Option<String> {
    let mut found: Vec<(usize, &'static str)> = LICENSES
        .iter()
        .filter_map(|(re, id)| re.find(text).map(|m| (m.start(), *id)))
        .collect();
    if found.is_empty() {
        return None;
    }
    found.sort();
    Some(
        found
            .into_iter()
            .map(|(_, id)| id)
            .collect::<Vec<_>>()
            .join(" OR "),
    )
}

/// `https://host/owner/repo` for a clone URL, SSH remote or repository link.
pub fn normalize_repository(url: &str) -> Option<String> {
    let url = url
        .trim()
        .trim_end_matches(|c| matches!(c, '.' | ',' | ')' | '>'));
    if let Some(caps) = SSH_REMOTE.captures(url) {
        return Some(format!("https://{}/{}/{}", &caps[1], &caps[2], &caps[3]));
    }
    let url = match url.strip_prefix("ssh://git@") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    };
    let url = url.trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    let caps = REPO_URL.captures(url)?;
    Some(format!("https://{}/{}/{}", &caps[1], &caps[2], &caps[3]))
}

/// Fields a manifest snippet declares about the project itself.
#[derive(Debug, Default)]
struct ManifestFields {
    name: Option<String>,
    description: Option<String>,
    license: Option<String>,
    line: usize,
}

impl ManifestFields {
    fn from_block(block: &Block) -> Option<Self> {
        let tag = block.lang_tag().map(|t| t.to_lowercase()).unwrap_or_default();
        let text = block.text.trim();
        let mut fields = ManifestFields {
            line: block.lines.start,
            ..Default::default()
        };
        if tag == "json" || (tag.is_empty() && text.starts_with('{')) {
            let value: serde_json::Value = serde_json::from_str(text).ok()?;
            let get = |key: &str| value.get(key).and_then(|v| v.as_str()).map(str::to_string);
            fields.name = get("name");
            fields.description = get("description");
            fields.license = get("license");
        } else if tag == "toml" {
            let table: toml::Table = text.parse().ok()?;
            let section = table
                .get("package")
                .or_else(|| table.get("project"))
                .or_else(|| table.get("tool").and_then(|t| t.get("poetry")))?;
            let get = |key: &str| section.get(key).and_then(|v| v.as_str()).map(str::to_string);
            fields.name = get("name");
            fields.description = get("description");
            fields.license = get("license").or_else(|| {
                section
                    .get("license")
                    .and_then(|l| l.get("text"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            });
        } else {
            return None;
        }
        if fields.name.is_none() && fields.description.is_none() && fields.license.is_none() {
            return None;
        }
        Some(fields)
    }
}

/// Extracts descriptive project metadata.
#[derive(Debug, Default)]
pub struct MetadataExtractor;

impl MetadataExtractor {
    pub const NAME: &'static str = "MetadataExtractor";

    pub fn new() -> Self {
        Self
    }

    fn manifest(tree: &DocumentTree) -> Option<ManifestFields> {
        tree.code_blocks().find_map(ManifestFields::from_block)
    }

    fn clone_url(tree: &DocumentTree) -> Option<(String, usize)> {
        for block in tree.code_blocks() {
            for (line, text) in block.code_lines() {
                if let Some(url) = CLONE_URL.captures(text).and_then(|c| normalize_repository(&c[1])) {
                    return Some((url, line));
                }
            }
        }
        for block in tree.prose_blocks() {
            for code in &block.inline_code {
                if let Some(url) = CLONE_URL.captures(code).and_then(|c| normalize_repository(&c[1])) {
                    return Some((url, block.lines.start));
                }
            }
        }
        None
    }

    fn name(tree: &DocumentTree, clone: Option<&(String, usize)>, manifest: Option<&ManifestFields>) -> Option<MetadataField> {
        if let Some(h1) = tree
            .headings()
            .find(|h| h.level == Some(1) && !h.text.trim().is_empty())
        {
            return Some(
                MetadataField::new(h1.text.trim(), conf::H1, format!("H1 L{}", h1.lines.start))
                    .at_line(h1.lines.start),
            );
        }
        if let Some((url, line)) = clone {
            if let Some(repo) = url.rsplit('/').next() {
                return Some(
                    MetadataField::new(repo, conf::CLONE_NAME, format!("clone URL L{}", line)).at_line(*line),
                );
            }
        }
        let manifest = manifest?;
        let name = manifest.name.as_ref()?;
        Some(
            MetadataField::new(name.as_str(), conf::MANIFEST_NAME, format!("manifest snippet L{}", manifest.line))
                .at_line(manifest.line),
        )
    }

    fn description(tree: &DocumentTree, manifest: Option<&ManifestFields>) -> Option<MetadataField> {
        let paragraph = tree.blocks().iter().find(|b| {
            b.kind == BlockKind::Paragraph
                && !b.is_badge_row()
                && b.text.split_whitespace().collect::<Vec<_>>().join(" ").chars().count() >= MIN_DESCRIPTION_CHARS
        });
        if let Some(block) = paragraph {
            let text = block.text.split_whitespace().collect::<Vec<_>>().join(" ");
            return Some(
                MetadataField::new(text, conf::DESCRIPTION, format!("first paragraph L{}", block.lines.start))
                    .at_line(block.lines.start),
            );
        }
        let manifest = manifest?;
        let description = manifest.description.as_ref()?;
        Some(
            MetadataField::new(
                description.as_str(),
                conf::MANIFEST_DESCRIPTION,
                format!("manifest snippet L{}", manifest.line),
            )
            .at_line(manifest.line),
        )
    }

    fn in_section(tree: &DocumentTree, block: &Block, needle: &str) -> bool {
        let own = block.is_heading().then_some(block.text.as_str());
        own.into_iter()
            .chain(tree.heading_chain(block))
            .any(|h| h.to_lowercase().contains(needle))
    }

    fn license(tree: &DocumentTree, manifest: Option<&ManifestFields>) -> Option<MetadataField> {
        let mut best: Option<MetadataField> = None;
        for block in tree.prose_blocks() {
            let in_section = Self::in_section(tree, block, "licen");
            if !in_section && !block.text.to_lowercase().contains("licen") {
                continue;
            }
            let Some(id) = normalize_license(&block.text) else {
                continue;
            };
            let confidence = if in_section {
                conf::LICENSE_SECTION
            } else {
                conf::LICENSE_TEXT
            };
            if best.as_ref().map_or(true, |b| confidence > b.confidence) {
                best = Some(
                    MetadataField::new(id, confidence, format!("license text L{}", block.lines.start))
                        .at_line(block.lines.start),
                );
            }
        }
        if let Some(manifest) = manifest {
            if let Some(id) = manifest.license.as_deref().and_then(normalize_license) {
                if best.as_ref().map_or(true, |b| conf::LICENSE_MANIFEST > b.confidence) {
                    best = Some(
                        MetadataField::new(id, conf::LICENSE_MANIFEST, format!("manifest snippet L{}", manifest.line))
                            .at_line(manifest.line),
                    );
                }
            }
        }
        best
    }

    fn repository(tree: &DocumentTree, clone: Option<&(String, usize)>) -> Option<MetadataField> {
        if let Some((url, line)) = clone {
            return Some(MetadataField::new(url.as_str(), conf::CLONE_URL, format!("clone URL L{}", line)).at_line(*line));
        }
        for block in tree.prose_blocks().filter(|b| !b.is_badge_row()) {
            for link in &block.links {
                let Some(url) = normalize_repository(link) else {
                    continue;
                };
                let hosted = ["github.com", "gitlab.com", "bitbucket.org"]
                    .iter()
                    .any(|host| url.starts_with(&format!("https://{}/", host)));
                if hosted {
                    return Some(
                        MetadataField::new(url, conf::REPO_LINK, format!("link L{}", block.lines.start))
                            .at_line(block.lines.start),
                    );
                }
            }
        }
        None
    }

    fn environment(tree: &DocumentTree) -> Vec<EnvVar> {
        let mut vars: BTreeMap<String, EnvVar> = BTreeMap::new();
        let mut record = |name: &str, confidence: f64, line: usize, source: &str| {
            let var = EnvVar {
                name: name.to_string(),
                confidence,
                line,
                source: source.to_string(),
            };
            match vars.get_mut(name) {
                Some(existing) if existing.confidence >= confidence => {
                    existing.line = existing.line.min(line);
                }
                Some(existing) => {
                    let line = existing.line.min(line);
                    *existing = EnvVar { line, ..var };
                }
                None => {
                    vars.insert(name.to_string(), var);
                }
            }
        };

        for block in tree.blocks() {
            if block.is_code() {
                let tag = block.lang_tag().map(|t| t.to_lowercase());
                let dotenv_ok = tag.as_deref().map_or(true, |t| DOTENV_TAGS.contains(&t));
                for (line, text) in block.code_lines() {
                    if let Some(caps) = EXPORT.captures(text) {
                        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
                            record(name.as_str(), conf::ENV_EXPORT, line, "export");
                        }
                    } else if dotenv_ok {
                        if let Some(caps) = DOTENV.captures(text) {
                            record(&caps[1], conf::ENV_DOTENV, line, "assignment");
                        }
                    }
                    for caps in ENV_ACCESS.captures_iter(text) {
                        if let Some(name) = caps.iter().skip(1).flatten().next() {
                            record(name.as_str(), conf::ENV_ACCESS, line, "code");
                        }
                    }
                }
                continue;
            }
            let config_section = std::iter::once(block.text.as_str())
                .filter(|_| block.is_heading())
                .chain(tree.heading_chain(block))
                .any(|h| CONFIG_HEADING.is_match(h));
            for code in &block.inline_code {
                let code = code.trim();
                if let Some(caps) = ENV_ACCESS.captures(code) {
                    if let Some(name) = caps.iter().skip(1).flatten().next() {
                        record(name.as_str(), conf::ENV_ACCESS, block.lines.start, "code");
                    }
                } else if config_section && ENV_NAME.is_match(code) {
                    record(code, conf::ENV_PROSE, block.lines.start, "prose");
                } else if config_section {
                    if let Some(caps) = DOTENV.captures(code) {
                        record(&caps[1], conf::ENV_PROSE, block.lines.start, "prose");
                    }
                }
            }
        }
        vars.into_values().collect()
    }

    fn structure(tree: &DocumentTree) -> Vec<Finding> {
        let mut entries: BTreeMap<String, Finding> = BTreeMap::new();
        let mut record = |name: &str, confidence: f64, evidence: String, line: usize| {
            let finding = Finding::new(name, confidence, evidence).at_line(line);
            match entries.get_mut(name) {
                Some(existing) => existing.absorb(finding),
                None => {
                    entries.insert(name.to_string(), finding);
                }
            }
        };
        for block in tree.blocks() {
            if block.is_code() {
                for (line, text) in block.code_lines() {
                    if let Some(caps) = TREE_ENTRY.captures(text) {
                        record(&caps[1], conf::TREE_ENTRY, format!("tree L{}", line), line);
                    }
                }
            } else {
                for code in &block.inline_code {
                    let code = code.trim();
                    if DIR_MENTION.is_match(code) {
                        record(code, conf::DIR_MENTION, format!("`{}` L{}", code, block.lines.start), block.lines.start);
                    }
                }
            }
        }
        entries.into_values().collect()
    }
}

impl Analyzer for MetadataExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, tree: &DocumentTree, _text: &str, _context: &ContextIndex) -> AnalysisResult {
        let manifest = Self::manifest(tree);
        let clone = Self::clone_url(tree);

        let name = Self::name(tree, clone.as_ref(), manifest.as_ref());
        let description = Self::description(tree, manifest.as_ref());
        let license = Self::license(tree, manifest.as_ref());
        let repository = Self::repository(tree, clone.as_ref());
        let environment = Self::environment(tree);
        let structure = Self::structure(tree);

        let fields = [&name, &description, &license, &repository];
        let mut confidences: Vec<f64> = fields.iter().filter_map(|f| f.as_ref().map(|f| f.confidence)).collect();
        confidences.extend(environment.iter().map(|v| v.confidence));
        confidences.extend(structure.iter().map(|s| s.confidence));

        let mut sources: Vec<String> = fields
            .iter()
            .filter_map(|f| f.as_ref().map(|f| f.evidence.clone()))
            .collect();
        sources.extend(environment.iter().map(|v| format!("env {} L{}", v.name, v.line)));
        sources.extend(structure.iter().flat_map(|s| s.evidence.iter().cloned()));
        sources.sort();
        sources.dedup();

        AnalysisResult::success(
            Self::NAME,
            AnalysisPayload::Metadata {
                name,
                description,
                license,
                repository,
                environment,
                structure,
            },
            score::combine(&confidences),
            sources,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentParser;
    use indoc::indoc;

    struct Meta {
        name: Option<MetadataField>,
        description: Option<MetadataField>,
        license: Option<MetadataField>,
        repository: Option<MetadataField>,
        environment: Vec<EnvVar>,
        structure: Vec<Finding>,
    }

    fn extract(text: &str) -> Meta {
        let tree = DocumentParser::default().parse(text).unwrap();
        match MetadataExtractor::new()
            .analyze(&tree, text, &ContextIndex::empty())
            .into_payload()
        {
            Some(AnalysisPayload::Metadata {
                name,
                description,
                license,
                repository,
                environment,
                structure,
            }) => Meta {
                name,
                description,
                license,
                repository,
                environment,
                structure,
            },
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_normalize_license() {
        assert_eq!(normalize_license("Licensed under the MIT License").as_deref(), Some("MIT"));
        assert_eq!(normalize_license("Apache License, Version 2.0").as_deref(), Some("Apache-2.0"));
        assert_eq!(normalize_license("GNU GPLv3").as_deref(), Some("GPL-3.0"));
        assert_eq!(normalize_license("LGPL-3.0-only").as_deref(), Some("LGPL-3.0"));
        assert_eq!(
            normalize_license("Dual-licensed under MIT or Apache-2.0").as_deref(),
            Some("MIT OR Apache-2.0")
        );
        assert_eq!(normalize_license("All rights reserved"), None);
    }

    #[test]
    fn test_normalize_repository() {
        assert_eq!(
            normalize_repository("https://github.com/acme/widget.git").as_deref(),
            Some("https://github.com/acme/widget")
        );
        assert_eq!(
            normalize_repository("git@gitlab.com:acme/widget.git").as_deref(),
            Some("https://gitlab.com/acme/widget")
        );
        assert_eq!(normalize_repository("https://github.com/acme/widget/issues"), None);
    }

    #[test]
    fn test_core_fields() {
        let meta = extract(indoc! {"
            # Widget

            [![CI](https://img.shields.io/badge/ci-passing-green)](https://github.com/acme/widget/actions)

            Widget turns sprockets into gadgets, quickly.

            ```bash
            git clone https://github.com/acme/widget.git
            ```

            ## License

            Released under the MIT License.
        "});
        let name = meta.name.unwrap();
        assert_eq!(name.value, "Widget");
        assert_eq!(name.confidence, conf::H1);
        assert_eq!(meta.description.unwrap().value, "Widget turns sprockets into gadgets, quickly.");
        let license = meta.license.unwrap();
        assert_eq!(license.value, "MIT");
        assert_eq!(license.confidence, conf::LICENSE_SECTION);
        assert_eq!(meta.repository.unwrap().value, "https://github.com/acme/widget");
    }

    #[test]
    fn test_name_falls_back_to_clone_url() {
        let meta = extract("```\ngit clone git@github.com:acme/gizmo.git\n```\n");
        let name = meta.name.unwrap();
        assert_eq!(name.value, "gizmo");
        assert_eq!(name.confidence, conf::CLONE_NAME);
    }

    #[test]
    fn test_manifest_fallbacks() {
        let meta = extract(indoc! {r#"
            ```json
            { "name": "gizmo", "description": "Small gizmo", "license": "ISC" }
            ```
        "#});
        assert_eq!(meta.name.unwrap().value, "gizmo");
        assert_eq!(meta.description.unwrap().confidence, conf::MANIFEST_DESCRIPTION);
        assert_eq!(meta.license.unwrap().value, "ISC");
    }

    #[test]
    fn test_environment_variables() {
        let meta = extract(indoc! {r#"
            ## Configuration

            Set `DATABASE_URL` and `PORT` before starting.

            ```bash
            export API_KEY=secret
            ```

            ```env
            DATABASE_URL=postgres://localhost/app
            ```

            ```js
            const port = process.env.PORT || 3000;
            ```
        "#});
        let names: Vec<(&str, &str)> = meta
            .environment
            .iter()
            .map(|v| (v.name.as_str(), v.source.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![("API_KEY", "export"), ("DATABASE_URL", "assignment"), ("PORT", "code")]
        );
        let db = meta.environment.iter().find(|v| v.name == "DATABASE_URL").unwrap();
        assert_eq!(db.line, 3);
    }

    #[test]
    fn test_structure() {
        let meta = extract(indoc! {"
            ```
            .
            ├── src/
            │   └── main.rs
            └── tests/
            ```

            Fixtures are in `testdata/`.
        "});
        let names: Vec<&str> = meta.structure.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["main.rs", "src/", "testdata/", "tests/"]);
    }

    #[test]
    fn test_empty_document() {
        let meta = extract("");
        assert!(meta.name.is_none() && meta.description.is_none());
        assert!(meta.environment.is_empty() && meta.structure.is_empty());
    }
}
