//! Command extraction with language-context inheritance.

use crate::analysis::{
    AnalysisPayload, AnalysisResult, Analyzer, Capabilities, Command, CommandCategory,
    CommandSource,
};
use crate::context::ContextIndex;
use crate::document::{Block, DocumentTree};
use crate::score::{self, patterns};

use super::catalog::{self, ExecutableKind, ExecutableSpec, EXECUTABLES, FORCED_BUILD};
use super::shell::{self, ShellLine};

/// Which recognised pattern a command line matched, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommandPattern {
    PackageManager,
    Executable,
    Script,
    BareWord,
}

impl CommandPattern {
    pub fn confidence(&self) -> f64 {
        match self {
            CommandPattern::PackageManager => patterns::PACKAGE_MANAGER,
            CommandPattern::Executable => patterns::EXECUTABLE,
            CommandPattern::Script => patterns::SCRIPT,
            CommandPattern::BareWord => patterns::BARE_WORD,
        }
    }
}

/// Result of matching a single command line against the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub pattern: CommandPattern,
    /// Language implied by the command text alone.
    pub language: Option<&'static str>,
    pub category: CommandCategory,
}

/// Subcommands after which the next token names what is run.
const RUNNER_SUBCOMMANDS: &[&str] = &["run", "run-script", "exec", "x", "dlx"];

/// Executables whose every positional argument is a task or goal.
const TASK_RUNNERS: &[&str] = &[
    "make", "just", "task", "rake", "mvn", "./mvnw", "gradle", "./gradlew", "npx", "pnpx", "bunx",
];

const SCRIPT_DIRS: &[&str] = &["./", "bin/", "scripts/", "script/"];

/// Look up the executable for a first token.
fn executable(first: &str) -> Option<(&'static str, &'static ExecutableSpec)> {
    let lower = first.to_lowercase();
    if let Some((key, spec)) = EXECUTABLES.get_entry(lower.as_str()) {
        return Some((*key, spec));
    }
    // `/usr/bin/python3`, `.venv/bin/pytest`
    if !lower.starts_with("./") {
        let base = lower.rsplit('/').next().unwrap_or(&lower);
        return EXECUTABLES.get_entry(base).map(|(k, s)| (*k, s));
    }
    None
}

fn is_positional(token: &str) -> bool {
    !token.starts_with('-') && !token.contains('/') && !token.contains('.') && !token.contains('=')
}

fn words(token: &str) -> impl Iterator<Item = String> + '_ {
    token
        .split(|c: char| c == ':' || c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Categories suggested by a token: keywords in its words, plus the default
/// category when the token is itself a known executable.
fn token_categories(token: &str, out: &mut Vec<CommandCategory>) {
    out.extend(words(token).filter_map(|w| catalog::keyword_category(&w)));
    if let Some((_, spec)) = executable(token) {
        if spec.default_category != CommandCategory::Other {
            out.push(spec.default_category);
        }
    }
}

/// Match a preprocessed command line against the command grammar.
///
/// Patterns are tried in priority order: language package manager, generic
/// executable, `./script`, bare build-tool word.
pub fn classify(command: &str) -> Option<Classified> {
    let tokens = shell::tokens(command);
    let first = *tokens.first()?;
    let exe = executable(first);

    let pattern = match exe {
        Some((_, spec)) if tokens.len() >= 2 && spec.kind == ExecutableKind::PackageManager => {
            CommandPattern::PackageManager
        }
        Some(_) if tokens.len() >= 2 => CommandPattern::Executable,
        _ if SCRIPT_DIRS.iter().any(|d| first.starts_with(d)) && first.len() > 2 => {
            CommandPattern::Script
        }
        Some((_, spec)) if tokens.len() == 1 && spec.bare => CommandPattern::BareWord,
        _ => return None,
    };

    let args = &tokens[1..];
    let positional: Vec<&str> = args.iter().copied().filter(|t| is_positional(t)).collect();

    let (language, default_category, mut candidates) = match (pattern, exe) {
        (CommandPattern::Script, _) => {
            let file = first.rsplit('/').next().unwrap_or(first);
            let stem = file.split('.').next().unwrap_or(file);
            let mut found = Vec::new();
            found.extend(words(stem).filter_map(|w| catalog::keyword_category(&w)));
            (catalog::language_for_file(file), CommandCategory::Run, found)
        }
        (_, Some((name, spec))) => {
            let mut found = Vec::new();
            if FORCED_BUILD
                .iter()
                .any(|(e, sub)| *e == name && positional.contains(sub))
            {
                return Some(Classified {
                    pattern,
                    language: spec.language,
                    category: CommandCategory::Build,
                });
            }

            if TASK_RUNNERS.contains(&name) {
                for token in positional.iter().take(3) {
                    token_categories(token, &mut found);
                }
            } else if args.first() == Some(&"-m") {
                // `python -m pytest`
                if let Some(module) = args.get(1) {
                    token_categories(module, &mut found);
                }
            } else if let Some(sub) = args.first().filter(|t| is_positional(t)) {
                token_categories(sub, &mut found);
                if RUNNER_SUBCOMMANDS.contains(sub) {
                    if let Some(target) = args.get(1).filter(|t| is_positional(t)) {
                        token_categories(target, &mut found);
                    }
                }
            }
            (spec.language, spec.default_category, found)
        }
        (_, None) => return None,
    };

    candidates.sort();
    let category = candidates.first().copied().unwrap_or(default_category);
    Some(Classified {
        pattern,
        language,
        category,
    })
}

/// Extracts shell-like commands and resolves their language from context.
pub struct CommandExtractor {
    inference_penalty: f64,
}

impl CommandExtractor {
    pub const NAME: &'static str = "CommandExtractor";

    pub fn new(inference_penalty: f64) -> Self {
        Self { inference_penalty }
    }

    /// Resolve language and combined confidence for a command at `line`.
    ///
    /// The best overlapping context always wins. Without one, the language
    /// is inferred from the command text and `inference_penalty` applies.
    fn resolve(
        &self,
        classified: &Classified,
        line: usize,
        context: &ContextIndex,
    ) -> (Option<String>, f64) {
        let base = classified.pattern.confidence();
        match context.at_line(line).first() {
            Some(ctx) => (Some(ctx.language.clone()), base * ctx.confidence),
            None => (
                classified.language.map(str::to_string),
                base * self.inference_penalty,
            ),
        }
    }

    fn extract(
        &self,
        candidates: Vec<ShellLine>,
        source: CommandSource,
        factor: f64,
        context: &ContextIndex,
        out: &mut Vec<Command>,
    ) {
        for candidate in candidates {
            let Some(classified) = classify(&candidate.text) else {
                continue;
            };
            if source == CommandSource::InlineCode && classified.pattern == CommandPattern::BareWord {
                continue;
            }
            let (language, confidence) = self.resolve(&classified, candidate.line, context);
            out.push(Command {
                text: candidate.text,
                language,
                confidence: score::clamp_unit(confidence * factor),
                category: classified.category,
                line: candidate.line,
                source,
            });
        }
    }

    fn inline_candidates(block: &Block) -> Vec<ShellLine> {
        block
            .inline_code
            .iter()
            .flat_map(|code| shell::split_commands(&[(block.lines.start, code.as_str())]))
            .collect()
    }
}

impl Default for CommandExtractor {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl Analyzer for CommandExtractor {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::context_consumer()
    }

    fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.inference_penalty) {
            return Err(format!(
                "inference penalty {} is outside [0,1]",
                self.inference_penalty
            ));
        }
        Ok(())
    }

    fn analyze(&self, tree: &DocumentTree, _text: &str, context: &ContextIndex) -> AnalysisResult {
        let mut commands = Vec::new();

        for block in tree.blocks() {
            if block.is_code() {
                if shell::may_hold_commands(block) {
                    self.extract(
                        shell::block_commands(block),
                        CommandSource::CodeBlock,
                        1.0,
                        context,
                        &mut commands,
                    );
                }
            } else if !block.inline_code.is_empty() {
                self.extract(
                    Self::inline_candidates(block),
                    CommandSource::InlineCode,
                    patterns::INLINE_FACTOR,
                    context,
                    &mut commands,
                );
            }
        }

        // Same command written twice: keep the stronger sighting.
        let mut unique: Vec<Command> = Vec::with_capacity(commands.len());
        for cmd in commands {
            match unique.iter_mut().find(|c| c.dedup_key() == cmd.dedup_key()) {
                Some(existing) if existing.confidence < cmd.confidence => *existing = cmd,
                Some(_) => {}
                None => unique.push(cmd),
            }
        }

        let sources: Vec<String> = unique
            .iter()
            .map(|c| format!("L{} `{}`", c.line, c.text))
            .collect();
        let confidence = score::combine(&unique.iter().map(|c| c.confidence).collect::<Vec<_>>());
        tracing::debug!(commands = unique.len(), confidence, "commands extracted");

        AnalysisResult::success(
            Self::NAME,
            AnalysisPayload::Commands { commands: unique },
            confidence,
            sources,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextSource, LanguageContext};
    use crate::document::{DocumentParser, LineRange};
    use indoc::indoc;

    fn category(cmd: &str) -> Option<CommandCategory> {
        classify(cmd).map(|c| c.category)
    }

    #[test]
    fn test_go_install_is_build() {
        assert_eq!(category("go install"), Some(CommandCategory::Build));
        assert_eq!(category("go install ./cmd/tool"), Some(CommandCategory::Build));
        assert_eq!(category("mvn clean install"), Some(CommandCategory::Build));
        assert_eq!(category("./mvnw install"), Some(CommandCategory::Build));
        assert_eq!(category("cargo install ripgrep"), Some(CommandCategory::Install));
    }

    #[test]
    fn test_category_precedence() {
        assert_eq!(category("npm run build"), Some(CommandCategory::Build));
        assert_eq!(category("npm run test:unit"), Some(CommandCategory::Test));
        assert_eq!(category("npm install"), Some(CommandCategory::Install));
        assert_eq!(category("npm start"), Some(CommandCategory::Run));
        assert_eq!(category("bundle exec rspec"), Some(CommandCategory::Test));
        assert_eq!(category("python -m pytest -q"), Some(CommandCategory::Test));
        assert_eq!(category("python app.py"), Some(CommandCategory::Run));
        assert_eq!(category("kubectl apply -f k8s/"), Some(CommandCategory::Deploy));
        assert_eq!(category("git status"), Some(CommandCategory::Other));
        assert_eq!(category("cargo run --example test"), Some(CommandCategory::Run));
    }

    #[test]
    fn test_pattern_priority() {
        assert_eq!(classify("npm install").map(|c| c.pattern), Some(CommandPattern::PackageManager));
        assert_eq!(classify("docker build .").map(|c| c.pattern), Some(CommandPattern::Executable));
        let script = classify("./scripts/run-tests.sh").unwrap();
        assert_eq!(script.pattern, CommandPattern::Script);
        assert_eq!(script.category, CommandCategory::Test);
        assert_eq!(classify("make").map(|c| c.pattern), Some(CommandPattern::BareWord));
        assert_eq!(classify("make").map(|c| c.category), Some(CommandCategory::Build));
        assert!(classify("npm").is_none());
        assert!(classify("const x = 1;").is_none());
        assert!(classify("import os").is_none());
    }

    #[test]
    fn test_context_inheritance() {
        let text = indoc! {"
            # Demo

            ```javascript
            npm install
            ```

            ```python
            pip install -r requirements.txt
            ```

            ```bash
            make
            ```
        "};
        let tree = DocumentParser::default().parse(text).unwrap();
        let ctxs: Vec<LanguageContext> = tree
            .code_blocks()
            .filter_map(|b| {
                let lang = match b.lang_tag()? {
                    "javascript" => "JavaScript",
                    "python" => "Python",
                    _ => return None,
                };
                Some(LanguageContext::new(lang, b.lines, ContextSource::CodeTag, "test"))
            })
            .collect();
        let index = ContextIndex::from_contexts(ctxs);

        let result = CommandExtractor::default().analyze(&tree, text, &index);
        let Some(AnalysisPayload::Commands { commands }) = result.payload() else {
            panic!("expected commands payload");
        };
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0].language.as_deref(), Some("JavaScript"));
        assert!(commands[0].confidence > 0.8);
        assert_eq!(commands[1].language.as_deref(), Some("Python"));
        assert!(commands[1].confidence > 0.8);
        assert_eq!(commands[2].language, None);
        assert!((commands[2].confidence - 0.6 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_low_confidence_context_lowers_command() {
        let tree = DocumentParser::default().parse("```\ncargo build\n```\n").unwrap();
        let ctx = LanguageContext::new("Rust", LineRange::new(1, 3), ContextSource::TextMention, "t")
            .with_confidence(0.4);
        let index = ContextIndex::from_contexts(vec![ctx]);
        let result = CommandExtractor::default().analyze(&tree, "", &index);
        let Some(AnalysisPayload::Commands { commands }) = result.payload() else {
            panic!("expected commands payload");
        };
        assert!((commands[0].confidence - 0.95 * 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_context_wins_over_command_text() {
        let tree = DocumentParser::default().parse("```\nnpm ci\n```\n").unwrap();
        let ctx = LanguageContext::new("Python", LineRange::new(1, 3), ContextSource::CodeTag, "t");
        let index = ContextIndex::from_contexts(vec![ctx]);
        let result = CommandExtractor::new(0.5).analyze(&tree, "", &index);
        let Some(AnalysisPayload::Commands { commands }) = result.payload() else {
            panic!("expected commands payload");
        };
        assert_eq!(commands[0].language.as_deref(), Some("Python"));
        assert!((commands[0].confidence - 0.95 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_command_text_used_without_context() {
        let tree = DocumentParser::default().parse("```\nnpm ci\n```\n").unwrap();
        let result = CommandExtractor::new(0.5).analyze(&tree, "", &ContextIndex::empty());
        let Some(AnalysisPayload::Commands { commands }) = result.payload() else {
            panic!("expected commands payload");
        };
        assert_eq!(commands[0].language.as_deref(), Some("JavaScript"));
        assert!((commands[0].confidence - 0.95 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_inline_code_commands() {
        let tree = DocumentParser::default()
            .parse("Run `cargo test` to check, or `make` for everything.\n")
            .unwrap();
        let result = CommandExtractor::default().analyze(&tree, "", &ContextIndex::empty());
        let Some(AnalysisPayload::Commands { commands }) = result.payload() else {
            panic!("expected commands payload");
        };
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].source, CommandSource::InlineCode);
        assert_eq!(commands[0].category, CommandCategory::Test);
        assert!((commands[0].confidence - 0.95 * 0.8 * 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_data_blocks_skipped() {
        let tree = DocumentParser::default()
            .parse("```json\n{\"scripts\": {\"test\": \"jest\"}}\n```\n")
            .unwrap();
        let result = CommandExtractor::default().analyze(&tree, "", &ContextIndex::empty());
        assert_eq!(result.confidence(), 0.0);
    }
}
