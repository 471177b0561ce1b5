//! Shell-line preprocessing shared by the command-oriented analyzers.

use crate::document::Block;

/// A single command candidate with the document line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellLine {
    pub line: usize,
    pub text: String,
}

const PROMPTS: &[&str] = &["$ ", "> ", "PS> ", "% ", "❯ ", "λ "];

/// Strip an interactive prompt. Returns `None` when the line has none.
fn strip_prompt(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    for prompt in PROMPTS {
        if let Some(rest) = trimmed.strip_prefix(prompt) {
            return Some(rest);
        }
    }
    if trimmed == "$" || trimmed == ">" {
        return Some("");
    }
    // PowerShell: `PS C:\repo> cmd`
    if trimmed.starts_with("PS ") {
        if let Some(idx) = trimmed.find("> ") {
            return Some(&trimmed[idx + 2..]);
        }
    }
    None
}

/// Remove a trailing `# comment` that is outside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut prev = ' ';
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' && prev.is_whitespace() => return &line[..i],
            None => {}
        }
        prev = c;
    }
    line
}

/// Split on `&&`, `||` and `;` outside quotes.
fn split_chain(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ';' => {
                parts.push(&line[start..i]);
                start = i + 1;
            }
            None if (c == '&' || c == '|') && bytes.get(i + 1) == Some(&bytes[i]) => {
                parts.push(&line[start..i]);
                start = i + 2;
                i += 1;
            }
            None => {}
        }
        i += 1;
    }
    parts.push(&line[start..]);
    parts
}

/// Drop `sudo` and leading `VAR=value` assignments.
fn strip_prefixes(command: &str) -> &str {
    let mut rest = command.trim();
    loop {
        let Some((first, tail)) = rest.split_once(char::is_whitespace) else {
            return rest;
        };
        let is_env = first.contains('=')
            && first
                .split('=')
                .next()
                .map(|k| !k.is_empty() && k.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(false);
        if first == "sudo" || is_env {
            rest = tail.trim_start();
        } else {
            return rest;
        }
    }
}

/// Split a block of shell text into command candidates.
///
/// When any line carries a prompt, only prompted lines are treated as input;
/// the rest is output.
pub fn split_commands(lines: &[(usize, &str)]) -> Vec<ShellLine> {
    let prompted = lines.iter().any(|(_, l)| strip_prompt(l).is_some());

    // Join continuations first.
    let mut logical: Vec<(usize, String)> = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (line_no, raw) in lines {
        let body = if prompted {
            match (&pending, strip_prompt(raw)) {
                (_, Some(rest)) => rest.to_string(),
                (Some(_), None) => raw.trim().to_string(),
                (None, None) => continue,
            }
        } else {
            raw.trim().to_string()
        };

        let (start, mut acc) = pending.take().unwrap_or((*line_no, String::new()));
        if let Some(head) = body.strip_suffix('\\') {
            acc.push_str(head.trim_end());
            acc.push(' ');
            pending = Some((start, acc));
        } else {
            acc.push_str(&body);
            logical.push((start, acc));
        }
    }
    if let Some(p) = pending {
        logical.push(p);
    }

    let mut out = Vec::new();
    for (line, text) in logical {
        let text = text.trim();
        if text.is_empty() || text.starts_with('#') || text.starts_with("//") {
            continue;
        }
        for part in split_chain(strip_comment(text)) {
            let cmd = strip_prefixes(part);
            if !cmd.is_empty() {
                out.push(ShellLine {
                    line,
                    text: cmd.to_string(),
                });
            }
        }
    }
    out
}

/// Command candidates of a code block.
pub fn block_commands(block: &Block) -> Vec<ShellLine> {
    split_commands(&block.code_lines())
}

/// Tags whose blocks hold shell input rather than data.
const SHELL_TAGS: &[&str] = &[
    "bash", "sh", "shell", "zsh", "fish", "console", "terminal", "shell-session",
    "shellsession", "powershell", "ps", "ps1", "pwsh", "cmd", "bat", "batch", "text", "txt",
    "plaintext", "plain",
];

/// Whether a code block may contain commands: shell and text blocks,
/// untagged blocks and language blocks. Data and markup blocks are skipped.
pub fn may_hold_commands(block: &Block) -> bool {
    use super::catalog::{resolve_tag, TagMatch};

    match block.lang_tag() {
        None => true,
        Some(tag) => match resolve_tag(tag) {
            TagMatch::Neutral => SHELL_TAGS.contains(&tag.to_lowercase().as_str()),
            TagMatch::Language(_) | TagMatch::Unknown => true,
        },
    }
}

/// Whitespace tokens with surrounding quotes removed.
pub fn tokens(command: &str) -> Vec<&str> {
    command
        .split_whitespace()
        .map(|t| t.trim_matches(|c| c == '"' || c == '\''))
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<(usize, String)> {
        let lines: Vec<(usize, &str)> = text.lines().enumerate().map(|(i, l)| (i + 1, l)).collect();
        split_commands(&lines)
            .into_iter()
            .map(|s| (s.line, s.text))
            .collect()
    }

    #[test]
    fn test_prompts_and_output() {
        let got = split("$ npm install\nadded 12 packages\n$ npm test\n");
        assert_eq!(
            got,
            vec![(1, "npm install".to_string()), (3, "npm test".to_string())]
        );
    }

    #[test]
    fn test_continuation_and_chain() {
        let got = split("docker run \\\n  -p 8080:80 \\\n  app && echo ok\n");
        assert_eq!(got[0], (1, "docker run -p 8080:80 app".to_string()));
        assert_eq!(got[1], (1, "echo ok".to_string()));
    }

    #[test]
    fn test_comments_sudo_and_env() {
        let got = split("# setup\nsudo apt-get install -y jq # needed\nNODE_ENV=production node server.js\n");
        assert_eq!(
            got,
            vec![
                (2, "apt-get install -y jq".to_string()),
                (3, "node server.js".to_string()),
            ]
        );
    }

    #[test]
    fn test_quoted_separators_kept() {
        let got = split("echo \"a; b && c\"\n");
        assert_eq!(got, vec![(1, "echo \"a; b && c\"".to_string())]);
    }

    #[test]
    fn test_powershell_prompt() {
        let got = split("PS C:\\repo> dotnet build\n");
        assert_eq!(got, vec![(1, "dotnet build".to_string())]);
    }
}
