//! Dependency extraction: manifest mentions, install commands and manifest
//! snippets.

use std::collections::BTreeMap;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::{
    merge_evidence, AnalysisPayload, AnalysisResult, Analyzer, Finding, FrameworkFinding, Package,
};
use crate::context::ContextIndex;
use crate::document::{Block, DocumentTree};
use crate::score;

use super::catalog::{self, MANIFESTS, MANIFEST_GLOBS};
use super::shell;

/// Confidence of a package declared in a manifest snippet.
const SNIPPET: f64 = 0.9;
/// Confidence of a package named in an install command in a code block.
const INSTALL_COMMAND: f64 = 0.85;
/// Confidence of a manifest file named in code or inline code.
const FILE_IN_CODE: f64 = 0.85;
/// Confidence of a manifest file named in plain prose.
const FILE_IN_PROSE: f64 = 0.7;
/// Multiplier for anything found in inline code rather than a code block.
const INLINE_FACTOR: f64 = 0.8;

lazy_static! {
    static ref MANIFEST_GLOB_SET: GlobSet = {
        let mut builder = GlobSetBuilder::new();
        for (pattern, _) in MANIFEST_GLOBS {
            builder.add(
                GlobBuilder::new(pattern)
                    .case_insensitive(true)
                    .literal_separator(true)
                    .build()
                    .unwrap(),
            );
        }
        builder.build().unwrap()
    };

    static ref REQUIREMENT: Regex = Regex::new(
        r"^([A-Za-z0-9][A-Za-z0-9._-]*)(\[[^\]]+\])?\s*((?:==|>=|<=|~=|!=|>|<)\s*[^\s;#,]+(?:\s*,\s*(?:==|>=|<=|~=|!=|>|<)\s*[^\s;#,]+)*)?\s*(;.*)?$"
    ).unwrap();

    static ref GEM_LINE: Regex =
        Regex::new(r#"^\s*gem\s+['"]([\w.-]+)['"](?:\s*,\s*['"]([^'"]+)['"])?"#).unwrap();

    static ref GO_REQUIRE: Regex =
        Regex::new(r"^\s*(?:require\s+)?([\w.-]+\.[a-z]{2,}/[\w./-]+)\s+(v[\w.+-]+)").unwrap();
}

/// Split `name@version`, keeping a leading scope `@`.
fn split_at_version(spec: &str) -> (String, Option<String>) {
    let (scope, rest) = match spec.strip_prefix('@') {
        Some(rest) => ("@", rest),
        None => ("", spec),
    };
    match rest.split_once('@') {
        Some((name, version)) if !version.is_empty() => {
            (format!("{}{}", scope, name), Some(version.to_string()))
        }
        Some((name, _)) => (format!("{}{}", scope, name), None),
        None => (spec.to_string(), None),
    }
}

/// Split a pip requirement such as `flask>=2.0` or `uvicorn[standard]==0.23`.
fn split_requirement(spec: &str) -> Option<(String, Option<String>)> {
    let caps = REQUIREMENT.captures(spec.trim())?;
    let name = caps.get(1)?.as_str().to_string();
    let version = caps.get(3).map(|m| m.as_str().replace(' ', ""));
    Some((name, version))
}

fn package(manager: &str, name: String, version: Option<String>, dev: bool, confidence: f64, evidence: String) -> Package {
    Package {
        manager: manager.to_string(),
        name,
        version,
        dev,
        confidence: score::clamp_unit(confidence),
        evidence: vec![evidence],
    }
}

/// Value following `flag` in `args`.
fn flag_value<'a>(args: &[&'a str], flags: &[&str]) -> Option<&'a str> {
    args.windows(2)
        .find(|w| flags.contains(&w[0]))
        .map(|w| w[1])
}

/// Positional arguments, skipping options and the values of `valued` options.
fn positionals<'a>(args: &[&'a str], valued: &[&str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut skip = false;
    for arg in args {
        if skip {
            skip = false;
            continue;
        }
        if arg.starts_with('-') {
            skip = valued.contains(arg);
            continue;
        }
        out.push(*arg);
    }
    out
}

fn is_local_path(arg: &str) -> bool {
    arg.starts_with('.') || arg.starts_with('/') || arg.starts_with('~') || arg.contains("://")
}

/// Packages named by an install command, as `(manager, name, version, dev)`.
pub fn parse_install(command: &str) -> Vec<(&'static str, String, Option<String>, bool)> {
    let tokens = shell::tokens(command);
    let Some(first) = tokens.first() else {
        return Vec::new();
    };
    let exe = first.to_lowercase();
    let mut args: Vec<&str> = tokens[1..].to_vec();

    // `python -m pip install ...`
    let exe = if (exe == "python" || exe == "python3") && args.first() == Some(&"-m") && args.get(1) == Some(&"pip") {
        args.drain(..2);
        "pip".to_string()
    } else {
        exe
    };
    let Some(sub) = args.first().copied() else {
        return Vec::new();
    };
    let rest = &args[1..];
    let has = |flags: &[&str]| rest.iter().any(|a| flags.contains(a));

    let mut out = Vec::new();
    match (exe.as_str(), sub) {
        ("npm", "install" | "i" | "add")
        | ("yarn" | "pnpm" | "bun", "add")
        | ("pnpm", "install" | "i") => {
            if has(&["-g", "--global"]) {
                return out;
            }
            let dev = has(&["-D", "--save-dev", "--dev", "-d"]);
            for arg in positionals(rest, &[]) {
                if is_local_path(arg) {
                    continue;
                }
                let (name, version) = split_at_version(arg);
                out.push(("npm", name, version, dev));
            }
        }
        ("pip" | "pip3", "install") | ("uv", "add") | ("pipenv", "install") | ("poetry", "add") => {
            let dev = has(&["--dev", "-D", "-d"])
                || flag_value(rest, &["--group", "-G"]) == Some("dev");
            let valued = ["-r", "--requirement", "-e", "--editable", "-c", "--constraint", "-i", "--index-url", "--group", "-G", "--target", "-t"];
            for arg in positionals(rest, &valued) {
                if is_local_path(arg) || arg.contains('/') {
                    continue;
                }
                if let Some((name, version)) = split_requirement(arg) {
                    out.push(("pip", name, version, dev));
                }
            }
        }
        ("uv", "pip") if rest.first() == Some(&"install") => {
            return parse_install(&format!("pip {}", rest.join(" ")));
        }
        ("cargo", "add") => {
            let dev = has(&["--dev", "-D"]);
            for arg in positionals(rest, &["--features", "-F", "--rename", "--path", "--git", "--branch", "--tag", "--rev", "--package", "-p"]) {
                let (name, version) = split_at_version(arg);
                out.push(("cargo", name, version, dev));
            }
        }
        ("go", "get") => {
            for arg in positionals(rest, &[]) {
                if arg.starts_with('.') {
                    continue;
                }
                let (name, version) = split_at_version(arg);
                out.push(("go", name, version, false));
            }
        }
        ("gem", "install") => {
            let version = flag_value(rest, &["-v", "--version"]).map(str::to_string);
            for arg in positionals(rest, &["-v", "--version"]) {
                out.push(("gem", arg.to_string(), version.clone(), false));
            }
        }
        ("bundle", "add") => {
            let version = flag_value(rest, &["--version", "-v"]).map(str::to_string);
            let dev = flag_value(rest, &["--group", "-g"]).map(|g| g.contains("development") || g.contains("test")).unwrap_or(false);
            for arg in positionals(rest, &["--version", "-v", "--group", "-g"]) {
                out.push(("gem", arg.to_string(), version.clone(), dev));
            }
        }
        ("composer", "require") => {
            let dev = has(&["--dev"]);
            for arg in positionals(rest, &[]) {
                let (name, version) = match arg.split_once(':') {
                    Some((n, v)) => (n.to_string(), Some(v.to_string())),
                    None => (arg.to_string(), None),
                };
                out.push(("composer", name, version, dev));
            }
        }
        ("dotnet", "add") => {
            let pos = positionals(rest, &["--version", "-v", "--source", "-s", "--framework", "-f"]);
            if let Some(idx) = pos.iter().position(|a| *a == "package") {
                if let Some(name) = pos.get(idx + 1) {
                    let version = flag_value(rest, &["--version", "-v"]).map(str::to_string);
                    out.push(("nuget", name.to_string(), version, false));
                }
            }
        }
        _ => {}
    }
    out
}

/// Packages declared in a manifest snippet shown in a code block.
fn parse_snippet(block: &Block) -> Vec<(&'static str, String, Option<String>, bool)> {
    let tag = block.lang_tag().map(|t| t.to_lowercase()).unwrap_or_default();
    let text = block.text.trim();
    match tag.as_str() {
        "json" | "jsonc" | "json5" => parse_json_manifest(text),
        "toml" => parse_toml_manifest(text),
        "ruby" | "rb" | "gemfile" => parse_gemfile(text),
        "go" | "gomod" | "go-mod" => parse_go_mod(text),
        "" | "txt" | "text" | "requirements" | "pip" | "plaintext" => {
            let from_json = if text.starts_with('{') { parse_json_manifest(text) } else { Vec::new() };
            if !from_json.is_empty() {
                return from_json;
            }
            let gems = parse_gemfile(text);
            if !gems.is_empty() {
                return gems;
            }
            let go = parse_go_mod(text);
            if !go.is_empty() {
                return go;
            }
            parse_requirements(text)
        }
        _ => Vec::new(),
    }
}

fn parse_json_manifest(text: &str) -> Vec<(&'static str, String, Option<String>, bool)> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let sections: &[(&str, &'static str, bool)] = &[
        ("dependencies", "npm", false),
        ("devDependencies", "npm", true),
        ("peerDependencies", "npm", false),
        ("require", "composer", false),
        ("require-dev", "composer", true),
    ];
    for (key, manager, dev) in sections {
        if let Some(map) = value.get(key).and_then(|v| v.as_object()) {
            for (name, version) in map {
                if *manager == "composer" && (name == "php" || name.starts_with("ext-")) {
                    continue;
                }
                out.push((*manager, name.clone(), version.as_str().map(str::to_string), *dev));
            }
        }
    }
    out
}

fn toml_version(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Table(t) => t.get("version").and_then(|v| v.as_str()).map(str::to_string),
        _ => None,
    }
}

fn parse_toml_manifest(text: &str) -> Vec<(&'static str, String, Option<String>, bool)> {
    let Ok(value) = text.parse::<toml::Table>() else {
        return Vec::new();
    };
    let mut out = Vec::new();

    // Cargo.toml
    for (key, dev) in [("dependencies", false), ("dev-dependencies", true), ("build-dependencies", true)] {
        if let Some(table) = value.get(key).and_then(|v| v.as_table()) {
            for (name, spec) in table {
                out.push(("cargo", name.clone(), toml_version(spec), dev));
            }
        }
    }

    // pyproject.toml, PEP 621
    if let Some(project) = value.get("project").and_then(|v| v.as_table()) {
        if let Some(deps) = project.get("dependencies").and_then(|v| v.as_array()) {
            for dep in deps.iter().filter_map(|d| d.as_str()) {
                if let Some((name, version)) = split_requirement(dep) {
                    out.push(("pip", name, version, false));
                }
            }
        }
        if let Some(optional) = project.get("optional-dependencies").and_then(|v| v.as_table()) {
            for (group, deps) in optional {
                let dev = matches!(group.as_str(), "dev" | "test" | "tests" | "lint" | "docs");
                for dep in deps.as_array().into_iter().flatten().filter_map(|d| d.as_str()) {
                    if let Some((name, version)) = split_requirement(dep) {
                        out.push(("pip", name, version, dev));
                    }
                }
            }
        }
    }

    // Poetry
    if let Some(poetry) = value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.as_table())
    {
        let mut tables: Vec<(&toml::Table, bool)> = Vec::new();
        if let Some(t) = poetry.get("dependencies").and_then(|v| v.as_table()) {
            tables.push((t, false));
        }
        if let Some(t) = poetry.get("dev-dependencies").and_then(|v| v.as_table()) {
            tables.push((t, true));
        }
        if let Some(groups) = poetry.get("group").and_then(|v| v.as_table()) {
            for group in groups.values() {
                if let Some(t) = group.get("dependencies").and_then(|v| v.as_table()) {
                    tables.push((t, true));
                }
            }
        }
        for (table, dev) in tables {
            for (name, spec) in table {
                if name == "python" {
                    continue;
                }
                out.push(("pip", name.clone(), toml_version(spec), dev));
            }
        }
    }
    out
}

fn parse_requirements(text: &str) -> Vec<(&'static str, String, Option<String>, bool)> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .collect();
    if lines.is_empty() {
        return Vec::new();
    }
    let parsed: Vec<Option<(String, Option<String>)>> = lines.iter().map(|l| split_requirement(l)).collect();
    let all_match = parsed.iter().all(|p| p.is_some());
    let any_pinned = parsed.iter().flatten().any(|(_, v)| v.is_some());
    if !all_match || !any_pinned {
        return Vec::new();
    }
    parsed
        .into_iter()
        .flatten()
        .map(|(name, version)| ("pip", name, version, false))
        .collect()
}

fn parse_gemfile(text: &str) -> Vec<(&'static str, String, Option<String>, bool)> {
    let mut out = Vec::new();
    let mut dev_group = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("group") {
            dev_group = trimmed.contains(":development") || trimmed.contains(":test");
        } else if trimmed == "end" {
            dev_group = false;
        } else if let Some(caps) = GEM_LINE.captures(line) {
            out.push((
                "gem",
                caps[1].to_string(),
                caps.get(2).map(|m| m.as_str().to_string()),
                dev_group,
            ));
        }
    }
    out
}

fn parse_go_mod(text: &str) -> Vec<(&'static str, String, Option<String>, bool)> {
    if !text.contains("require") {
        return Vec::new();
    }
    text.lines()
        .filter_map(|line| GO_REQUIRE.captures(line))
        .map(|caps| ("go", caps[1].to_string(), Some(caps[2].to_string()), false))
        .collect()
}

/// Extracts package manifests, packages and the frameworks they imply.
#[derive(Debug, Default)]
pub struct DependencyExtractor;

impl DependencyExtractor {
    pub const NAME: &'static str = "DependencyExtractor";

    pub fn new() -> Self {
        Self
    }

    fn is_manifest(file: &str) -> bool {
        let base = file.rsplit('/').next().unwrap_or(file);
        MANIFESTS.contains_key(base.to_lowercase().as_str())
            || MANIFEST_GLOB_SET.is_match(base)
            || MANIFEST_GLOB_SET.is_match(file)
    }

    fn package_files(tree: &DocumentTree) -> Vec<Finding> {
        let mut files: BTreeMap<String, Finding> = BTreeMap::new();
        let mut record = |file: &str, confidence: f64, line: usize| {
            if !Self::is_manifest(file) {
                return;
            }
            let base = file.rsplit('/').next().unwrap_or(file);
            let finding = Finding::new(base, confidence, format!("`{}` L{}", file, line)).at_line(line);
            match files.get_mut(&base.to_lowercase()) {
                Some(existing) => existing.absorb(finding),
                None => {
                    files.insert(base.to_lowercase(), finding);
                }
            }
        };

        for block in tree.blocks() {
            if block.is_code() {
                for (line, text) in block.code_lines() {
                    for cap in catalog::FILE_NAME.captures_iter(text) {
                        record(&cap[1], FILE_IN_CODE, line);
                    }
                }
                continue;
            }
            for code in &block.inline_code {
                for cap in catalog::FILE_NAME.captures_iter(code) {
                    record(&cap[1], FILE_IN_CODE, block.lines.start);
                }
            }
            for cap in catalog::FILE_NAME.captures_iter(&block.text) {
                record(&cap[1], FILE_IN_PROSE, block.lines.start);
            }
        }
        files.into_values().collect()
    }

    /// Packages declared anywhere in the document, one entry per name and version.
    pub(crate) fn packages(tree: &DocumentTree) -> Vec<Package> {
        let mut found: Vec<Package> = Vec::new();

        for block in tree.blocks() {
            if block.is_code() {
                for (manager, name, version, dev) in parse_snippet(block) {
                    found.push(package(
                        manager,
                        name,
                        version,
                        dev,
                        SNIPPET,
                        format!("manifest snippet L{}", block.lines.start),
                    ));
                }
                if shell::may_hold_commands(block) {
                    for cmd in shell::block_commands(block) {
                        for (manager, name, version, dev) in parse_install(&cmd.text) {
                            found.push(package(
                                manager,
                                name,
                                version,
                                dev,
                                INSTALL_COMMAND,
                                format!("`{}` L{}", cmd.text, cmd.line),
                            ));
                        }
                    }
                }
            } else {
                for code in &block.inline_code {
                    for (manager, name, version, dev) in parse_install(code) {
                        found.push(package(
                            manager,
                            name,
                            version,
                            dev,
                            INSTALL_COMMAND * INLINE_FACTOR,
                            format!("`{}` L{}", code, block.lines.start),
                        ));
                    }
                }
            }
        }

        // Same package seen twice: keep the stronger sighting's data and
        // fold evidence together. Version disagreements are left for the
        // aggregator.
        let mut unique: Vec<Package> = Vec::new();
        for pkg in found {
            match unique
                .iter_mut()
                .find(|p| p.key() == pkg.key() && (p.version == pkg.version || pkg.version.is_none() || p.version.is_none()))
            {
                Some(existing) => {
                    if pkg.confidence > existing.confidence {
                        existing.confidence = pkg.confidence;
                        existing.dev = pkg.dev;
                    }
                    if existing.version.is_none() {
                        existing.version = pkg.version;
                    }
                    merge_evidence(&mut existing.evidence, pkg.evidence);
                }
                None => unique.push(pkg),
            }
        }
        unique.sort_by(|a, b| a.key().cmp(&b.key()).then_with(|| a.version.cmp(&b.version)));
        unique
    }

    fn frameworks(packages: &[Package]) -> Vec<FrameworkFinding> {
        let mut found: BTreeMap<&'static str, FrameworkFinding> = BTreeMap::new();
        for pkg in packages {
            let Some(spec) = catalog::framework_for_package(&pkg.name) else {
                continue;
            };
            let evidence = format!("package `{}` ({})", pkg.name, pkg.manager);
            let entry = found.entry(spec.name).or_insert_with(|| FrameworkFinding {
                name: spec.name.to_string(),
                language: Some(spec.language.to_string()),
                group: spec.group.map(str::to_string),
                confidence: 0.0,
                evidence: Vec::new(),
            });
            entry.confidence = entry.confidence.max(pkg.confidence);
            merge_evidence(&mut entry.evidence, vec![evidence]);
        }
        found.into_values().collect()
    }
}

impl Analyzer for DependencyExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn analyze(&self, tree: &DocumentTree, _text: &str, _context: &ContextIndex) -> AnalysisResult {
        let package_files = Self::package_files(tree);
        let packages = Self::packages(tree);
        let frameworks = Self::frameworks(&packages);

        let mut confidences: Vec<f64> = package_files.iter().map(|f| f.confidence).collect();
        confidences.extend(packages.iter().map(|p| p.confidence));
        let mut sources: Vec<String> = package_files.iter().flat_map(|f| f.evidence.clone()).collect();
        sources.extend(packages.iter().flat_map(|p| p.evidence.clone()));
        sources.sort();
        sources.dedup();

        tracing::debug!(
            package_files = package_files.len(),
            packages = packages.len(),
            frameworks = frameworks.len(),
            "dependencies extracted"
        );

        AnalysisResult::success(
            Self::NAME,
            AnalysisPayload::Dependencies {
                package_files,
                packages,
                frameworks,
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

    fn analyze(text: &str) -> (Vec<Finding>, Vec<Package>, Vec<FrameworkFinding>) {
        let tree = DocumentParser::default().parse(text).unwrap();
        match DependencyExtractor::new()
            .analyze(&tree, text, &ContextIndex::empty())
            .into_payload()
        {
            Some(AnalysisPayload::Dependencies {
                package_files,
                packages,
                frameworks,
            }) => (package_files, packages, frameworks),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_parse_install_commands() {
        let npm = parse_install("npm install --save-dev jest @types/node@20.1.0");
        assert_eq!(npm.len(), 2);
        assert_eq!(npm[0], ("npm", "jest".to_string(), None, true));
        assert_eq!(npm[1], ("npm", "@types/node".to_string(), Some("20.1.0".to_string()), true));

        let pip = parse_install("pip install -r requirements.txt flask==2.3.0 'uvicorn[standard]>=0.23'");
        assert_eq!(
            pip,
            vec![
                ("pip", "flask".to_string(), Some("==2.3.0".to_string()), false),
                ("pip", "uvicorn".to_string(), Some(">=0.23".to_string()), false),
            ]
        );

        assert_eq!(parse_install("cargo add serde@1.0 --features derive")[0].2.as_deref(), Some("1.0"));
        assert_eq!(parse_install("go get github.com/gin-gonic/gin@v1.9.1")[0].1, "github.com/gin-gonic/gin");
        assert_eq!(parse_install("poetry add --group dev pytest")[0].3, true);
        assert_eq!(parse_install("dotnet add package Newtonsoft.Json --version 13.0.1")[0].2.as_deref(), Some("13.0.1"));
        assert_eq!(parse_install("python -m pip install requests")[0].1, "requests");
        assert!(parse_install("npm install -g typescript").is_empty());
        assert!(parse_install("npm install").is_empty());
        assert!(parse_install("pip install -e .").is_empty());
    }

    #[test]
    fn test_manifest_files() {
        let (files, _, _) = analyze(indoc! {"
            Dependencies live in `package.json` and `requirements-dev.txt`.

            See also Cargo.toml.
        "});
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Cargo.toml", "package.json", "requirements-dev.txt"]);
        let cargo = &files[0];
        assert_eq!(cargo.confidence, FILE_IN_PROSE);
    }

    #[test]
    fn test_json_snippet_and_frameworks() {
        let (_, packages, frameworks) = analyze(indoc! {r#"
            ```json
            {
              "name": "web",
              "dependencies": { "react": "^18.2.0", "next": "14.0.0" },
              "devDependencies": { "jest": "^29.0.0" }
            }
            ```
        "#});
        assert_eq!(packages.len(), 3);
        let jest = packages.iter().find(|p| p.name == "jest").unwrap();
        assert!(jest.dev);
        assert_eq!(jest.version.as_deref(), Some("^29.0.0"));
        let names: Vec<&str> = frameworks.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Next.js", "React"]);
        assert!(frameworks.iter().all(|f| f.confidence == SNIPPET));
    }

    #[test]
    fn test_toml_snippets() {
        let (_, packages, _) = analyze(indoc! {r#"
            ```toml
            [dependencies]
            serde = { version = "1.0", features = ["derive"] }
            tokio = "1"

            [dev-dependencies]
            tempfile = "3"
            ```

            ```toml
            [tool.poetry.dependencies]
            python = "^3.11"
            fastapi = "^0.110"
            ```
        "#});
        let names: Vec<(&str, &str)> = packages.iter().map(|p| (p.manager.as_str(), p.name.as_str())).collect();
        assert_eq!(
            names,
            vec![("cargo", "serde"), ("cargo", "tempfile"), ("cargo", "tokio"), ("pip", "fastapi")]
        );
    }

    #[test]
    fn test_requirements_block() {
        let (_, packages, _) = analyze("```\nflask==2.3.0\nrequests\n# comment\n```\n");
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "flask");
    }

    #[test]
    fn test_version_disagreement_kept_separate() {
        let (_, packages, _) = analyze(indoc! {"
            ```bash
            npm install react@17.0.2
            ```

            ```bash
            npm install react@18.2.0
            ```
        "});
        assert_eq!(packages.len(), 2);
        assert!(packages.iter().all(|p| p.name == "react"));
    }

    #[test]
    fn test_gemfile_and_go_mod() {
        let (_, packages, _) = analyze(indoc! {r#"
            ```ruby
            gem 'rails', '~> 7.1'
            group :test do
              gem 'rspec-rails'
            end
            ```

            ```
            require (
                github.com/gin-gonic/gin v1.9.1
            )
            ```
        "#});
        let rails = packages.iter().find(|p| p.name == "rails").unwrap();
        assert_eq!(rails.version.as_deref(), Some("~> 7.1"));
        assert!(packages.iter().find(|p| p.name == "rspec-rails").unwrap().dev);
        let gin = packages.iter().find(|p| p.manager == "go").unwrap();
        assert_eq!(gin.version.as_deref(), Some("v1.9.1"));
    }
}
