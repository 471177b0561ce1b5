//! Output formatting for parse results.

use colored::Colorize;
use serde::Serialize;

use crate::analysis::CommandCategory;
use crate::diagnostics::{Diagnostic, Severity};
use crate::pipeline::ParseResult;
use crate::project::ProjectInfo;
use crate::score;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
    Yaml,
}

impl OutputFormat {
    pub const NAMES: &'static [&'static str] = &["pretty", "json", "yaml"];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pretty" => Some(OutputFormat::Pretty),
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }
}

/// One parsed document and where it came from.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: String,
    #[serde(flatten)]
    pub result: ParseResult,
}

/// Serialise reports as JSON: a single object for one document, an array
/// otherwise.
pub fn to_json(reports: &[FileReport]) -> anyhow::Result<String> {
    let json = match reports {
        [single] => serde_json::to_string_pretty(single)?,
        _ => serde_json::to_string_pretty(reports)?,
    };
    Ok(json)
}

pub fn to_yaml(reports: &[FileReport]) -> anyhow::Result<String> {
    let yaml = match reports {
        [single] => serde_yaml::to_string(single)?,
        _ => serde_yaml::to_string(reports)?,
    };
    Ok(yaml)
}

pub fn write_json(reports: &[FileReport]) -> anyhow::Result<()> {
    println!("{}", to_json(reports)?);
    Ok(())
}

pub fn write_yaml(reports: &[FileReport]) -> anyhow::Result<()> {
    print!("{}", to_yaml(reports)?);
    Ok(())
}

/// Human-readable output to stdout.
pub fn write_pretty(reports: &[FileReport], show_info: bool) {
    println!();
    print!("  ");
    print!("{}", "readme-lens".cyan().bold());
    println!(" v{}", env!("CARGO_PKG_VERSION"));

    for report in reports {
        println!();
        print!("  {}", "Document: ".dimmed());
        println!("{}", report.path);
        println!();
        write_status(&report.result);

        if let Some(project) = &report.result.data {
            println!();
            write_project(project);
        }

        write_diagnostics(&report.result, show_info);
    }
    println!();
}

fn write_status(result: &ParseResult) {
    if result.success {
        print!("  {}", "✓ OK".green());
    } else {
        print!("  {}", "✗ FAILED".red());
    }
    if let Some(project) = &result.data {
        let overall = project.confidence.overall;
        print!("  Confidence: ");
        write_colored_confidence(overall);
        print!("  Grade: ");
        write_colored_grade(score::calculate_grade(overall));
    }
    print!("  {}", format!("[{}]", result.summary.state).dimmed());
    println!();
}

fn write_colored_confidence(c: f64) {
    let text = format!("{:.2}", c);
    match c {
        c if c >= score::grades::A_MIN => print!("{}", text.green().bold()),
        c if c >= score::grades::B_MIN => print!("{}", text.green()),
        c if c >= score::grades::C_MIN => print!("{}", text.yellow()),
        c if c >= score::grades::D_MIN => print!("{}", text.yellow().bold()),
        _ => print!("{}", text.red()),
    }
}

fn write_colored_grade(grade: &str) {
    match grade {
        "A" => print!("{}", grade.green().bold()),
        "B" => print!("{}", grade.green()),
        "C" => print!("{}", grade.yellow()),
        "D" => print!("{}", grade.yellow().bold()),
        _ => print!("{}", grade.red()),
    }
}

fn write_project(project: &ProjectInfo) {
    let meta = &project.metadata;
    if let Some(name) = &meta.name {
        println!("  {:<14}{}", "Name".bold(), name.value);
    }
    if let Some(description) = &meta.description {
        println!("  {:<14}{}", "Description".bold(), description.value);
    }
    if let Some(license) = &meta.license {
        println!("  {:<14}{}", "License".bold(), license.value);
    }
    if let Some(repository) = &meta.repository {
        println!("  {:<14}{}", "Repository".bold(), repository.value.blue());
    }

    if !project.languages.is_empty() {
        println!();
        println!("  {} ({}):", "Languages".bold(), project.languages.len());
        for lang in &project.languages {
            let marker = if project.primary_language.as_deref() == Some(lang.name.as_str()) {
                "*".cyan().to_string()
            } else {
                " ".to_string()
            };
            println!("    {} {:<16}{}", marker, lang.name, format!("{:.2}", lang.confidence).dimmed());
        }
    }

    if !project.frameworks.is_empty() {
        println!();
        println!("  {} ({}):", "Frameworks".bold(), project.frameworks.len());
        for fw in &project.frameworks {
            let marker = if fw.primary { "*".cyan().to_string() } else { " ".to_string() };
            println!("    {} {:<16}{}", marker, fw.name, format!("{:.2}", fw.confidence).dimmed());
        }
    }

    if !project.commands.is_empty() {
        println!();
        println!("  {} ({}):", "Commands".bold(), project.commands.len());
        for category in CommandCategory::PRECEDENCE {
            for cmd in project.commands.get(category) {
                print!("    {:<9}", category.as_str().dimmed());
                print!("{}", cmd.text);
                if let Some(lang) = &cmd.language {
                    print!("  {}", format!("({}, {:.2})", lang, cmd.confidence).dimmed());
                }
                println!();
            }
        }
    }

    let deps = &project.dependencies;
    if !deps.packages.is_empty() || !deps.package_files.is_empty() {
        println!();
        println!("  {} ({}):", "Dependencies".bold(), deps.packages.len());
        if !deps.package_files.is_empty() {
            let files: Vec<&str> = deps.package_files.iter().map(|f| f.name.as_str()).collect();
            println!("    {} {}", "files:".dimmed(), files.join(", "));
        }
        for pkg in &deps.packages {
            print!("    {:<8}{}", pkg.manager.dimmed(), pkg.name);
            if let Some(version) = &pkg.version {
                print!(" {}", version.dimmed());
            }
            if pkg.dev {
                print!(" {}", "(dev)".dimmed());
            }
            if pkg.needs_review {
                print!(" {}", "needs review".yellow());
            }
            println!();
        }
    }

    let testing = &project.testing;
    if !testing.frameworks.is_empty() || !testing.tools.is_empty() {
        println!();
        let names: Vec<&str> = testing
            .frameworks
            .iter()
            .chain(&testing.tools)
            .map(|f| f.name.as_str())
            .collect();
        println!("  {:<14}{}", "Testing".bold(), names.join(", "));
    }

    if !meta.environment.is_empty() {
        let names: Vec<&str> = meta.environment.iter().map(|e| e.name.as_str()).collect();
        println!("  {:<14}{}", "Environment".bold(), names.join(", "));
    }

    for (category, findings) in &project.custom {
        let names: Vec<&str> = findings.iter().map(|f| f.name.as_str()).collect();
        println!("  {:<14}{}", category.bold(), names.join(", "));
    }

    if !project.manual_review.is_empty() {
        println!();
        println!("  {} ({}):", "Needs review".yellow().bold(), project.manual_review.len());
        for item in &project.manual_review {
            let candidates: Vec<&str> = item.candidates.iter().map(|c| c.name.as_str()).collect();
            println!("    {}: {} ({})", item.subject, candidates.join(" vs "), item.reason.dimmed());
        }
    }
}

fn write_diagnostics(result: &ParseResult, show_info: bool) {
    let shown: Vec<&Diagnostic> = result
        .diagnostics()
        .filter(|d| show_info || d.severity != Severity::Info)
        .collect();
    if shown.is_empty() {
        return;
    }
    println!();
    println!("  {} ({}):", "Diagnostics".bold(), shown.len());
    println!();
    for d in shown {
        write_severity_tag(d.severity);
        print!("   ");
        print!("{:<24}", d.code.dimmed());
        if let Some(line) = d.line {
            print!("{}", format!("L{}", line).dimmed());
        }
        println!();
        println!("            {}", d.message);
        for hint in &d.remediation {
            println!("            {} {}", "→".dimmed(), hint.dimmed());
        }
        if !d.alternatives.is_empty() {
            let alts: Vec<String> = d
                .alternatives
                .iter()
                .map(|s| format!("{} ({:.2})", s.name, s.score))
                .collect();
            println!("            {} {}", "maybe:".dimmed(), alts.join(", "));
        }
    }
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Critical => print!("    {} ", "CRIT ".red().bold()),
        Severity::Error => print!("    {} ", "ERROR".red()),
        Severity::Warning => print!("    {} ", "WARN ".yellow()),
        Severity::Info => print!("    {} ", "INFO ".blue()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::readme::ReadmeParser;

    fn report(text: &str) -> FileReport {
        let parser = ReadmeParser::new(Config::default()).unwrap();
        FileReport {
            path: "README.md".to_string(),
            result: parser.parse_content(text),
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::parse("yml"), Some(OutputFormat::Yaml));
        assert_eq!(OutputFormat::parse("sarif"), None);
        for name in OutputFormat::NAMES {
            assert!(OutputFormat::parse(name).is_some());
        }
    }

    #[test]
    fn test_json_shapes() {
        let single = to_json(&[report("# demo\n\n```python\nprint(1)\n```\n")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&single).unwrap();
        assert_eq!(value["path"], "README.md");
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["primary_language"], "Python");

        let many = to_json(&[report("# a"), report("# b")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&many).unwrap();
        assert_eq!(value.as_array().map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_yaml_output() {
        let yaml = to_yaml(&[report("# demo\n")]).unwrap();
        assert!(yaml.contains("path: README.md"));
        assert!(yaml.contains("success: true"));
    }
}
