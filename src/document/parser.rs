//! Markdown to `DocumentTree`.
//!
//! Only the subset needed downstream is modelled: headings, prose and code
//! blocks with their line ranges. Malformed input degrades instead of failing;
//! an unterminated fence is closed at the end of its container and reported
//! as a warning.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::error::ParseError;

use super::{Block, BlockKind, DocumentTree, LineRange, ParseWarning};

/// Default upper bound on document size (5 MiB).
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Turns raw Markdown text into an addressable tree.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    max_bytes: usize,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl DocumentParser {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Parse raw bytes, rejecting anything that is not UTF-8 text.
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<DocumentTree, ParseError> {
        let text = std::str::from_utf8(bytes)?;
        self.parse(text)
    }

    /// Parse a Markdown document.
    pub fn parse(&self, text: &str) -> Result<DocumentTree, ParseError> {
        if text.len() > self.max_bytes {
            return Err(ParseError::TooLarge {
                size: text.len(),
                limit: self.max_bytes,
            });
        }
        if let Some(offset) = text.find('\0') {
            return Err(ParseError::Binary { offset });
        }

        let lines = LineIndex::new(text);
        let mut builder = TreeBuilder::new(text, &lines);
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;

        for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
            builder.handle(event, range);
        }

        let (blocks, warnings) = builder.finish();
        tracing::debug!(
            blocks = blocks.len(),
            warnings = warnings.len(),
            lines = lines.line_count(),
            "parsed document"
        );

        Ok(DocumentTree::new(blocks, lines.line_count(), warnings))
    }
}

/// Byte offset to 1-based line lookup.
struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1).filter(|&i| i < text.len()));
        Self {
            starts,
            len: text.len(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&s| s <= offset).max(1)
    }

    /// Line range covered by a byte range, ignoring a trailing newline.
    fn range_of(&self, start: usize, end: usize) -> LineRange {
        let last = if end > start { end - 1 } else { start };
        LineRange::new(self.line_of(start), self.line_of(last.min(self.len.max(1) - 1)))
    }

    fn line_count(&self) -> usize {
        if self.len == 0 {
            0
        } else {
            self.starts.len()
        }
    }
}

/// Block under construction.
struct OpenBlock {
    kind: BlockKind,
    explicit: bool,
    start: usize,
    end: usize,
    text: String,
    lang: Option<String>,
    info: Option<String>,
    fenced: bool,
    level: Option<u8>,
    inline_code: Vec<String>,
    links: Vec<String>,
    images: usize,
}

impl OpenBlock {
    fn new(kind: BlockKind, explicit: bool, start: usize, end: usize) -> Self {
        Self {
            kind,
            explicit,
            start,
            end,
            text: String::new(),
            lang: None,
            info: None,
            fenced: false,
            level: None,
            inline_code: Vec::new(),
            links: Vec::new(),
            images: 0,
        }
    }
}

struct TreeBuilder<'a> {
    source: &'a str,
    lines: &'a LineIndex,
    blocks: Vec<Block>,
    current: Option<OpenBlock>,
    /// Image nesting; alt text is not block text.
    in_image: usize,
    /// Open headings as (level, block index).
    sections: Vec<(u8, usize)>,
    warnings: Vec<ParseWarning>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, lines: &'a LineIndex) -> Self {
        Self {
            source,
            lines,
            blocks: Vec::new(),
            current: None,
            in_image: 0,
            sections: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn handle(&mut self, event: Event<'_>, range: std::ops::Range<usize>) {
        match event {
            Event::Start(tag) => self.start_tag(tag, range),
            Event::End(tag) => self.end_tag(tag, range),
            Event::Text(text) => self.push_text(&text, range),
            Event::Code(code) => {
                self.push_text(&code, range);
                if let Some(open) = self.current.as_mut() {
                    open.inline_code.push(code.to_string());
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(open) = self.current.as_mut() {
                    open.text.push('\n');
                    open.end = open.end.max(range.end);
                }
            }
            Event::TaskListMarker(_) => {}
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>, range: std::ops::Range<usize>) {
        match tag {
            Tag::Paragraph => self.open_explicit(BlockKind::Paragraph, range, |_| {}),
            Tag::Heading { level, .. } => {
                let level = heading_level(level);
                self.open_explicit(BlockKind::Heading, range, |b| b.level = Some(level));
            }
            Tag::CodeBlock(kind) => {
                let (fenced, info) = match kind {
                    CodeBlockKind::Fenced(info) => (true, Some(info.to_string())),
                    CodeBlockKind::Indented => (false, None),
                };
                self.open_explicit(BlockKind::Code, range, |b| {
                    b.fenced = fenced;
                    b.lang = Some(
                        info.as_deref()
                            .and_then(|i| i.split_whitespace().next())
                            .unwrap_or("")
                            .to_string(),
                    );
                    b.info = info.filter(|i| !i.trim().is_empty());
                });
            }
            Tag::Image { .. } => {
                self.in_image += 1;
                self.ensure_open(range.start, range.end);
                if let Some(open) = self.current.as_mut() {
                    open.images += 1;
                }
            }
            Tag::Link { dest_url, .. } => {
                self.ensure_open(range.start, range.end);
                if let Some(open) = self.current.as_mut() {
                    open.links.push(dest_url.to_string());
                }
            }
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {}
            Tag::TableHead | Tag::TableRow | Tag::TableCell => {}
            _ => self.close_implicit(),
        }
    }

    fn end_tag(&mut self, tag: TagEnd, range: std::ops::Range<usize>) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock => {
                if matches!(tag, TagEnd::CodeBlock) && self.current.as_ref().map(|o| o.fenced).unwrap_or(false) {
                    self.check_fence_closed(range.clone());
                }
                if let Some(open) = self.current.as_mut() {
                    open.end = open.end.max(range.end);
                }
                if self.current.as_ref().map(|o| o.explicit).unwrap_or(false) {
                    self.finish_current();
                }
            }
            TagEnd::Image => {
                self.in_image = self.in_image.saturating_sub(1);
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {}
            TagEnd::TableCell => {
                if let Some(open) = self.current.as_mut() {
                    open.text.push_str(" | ");
                }
            }
            TagEnd::TableRow | TagEnd::TableHead => {
                if let Some(open) = self.current.as_mut() {
                    open.text.push('\n');
                }
            }
            _ => self.close_implicit(),
        }
    }

    fn push_text(&mut self, text: &str, range: std::ops::Range<usize>) {
        if self.in_image > 0 {
            return;
        }
        self.ensure_open(range.start, range.end);
        if let Some(open) = self.current.as_mut() {
            open.text.push_str(text);
            open.end = open.end.max(range.end);
        }
    }

    fn ensure_open(&mut self, start: usize, end: usize) {
        if self.current.is_none() {
            self.current = Some(OpenBlock::new(BlockKind::Paragraph, false, start, end));
        }
    }

    fn open_explicit(
        &mut self,
        kind: BlockKind,
        range: std::ops::Range<usize>,
        init: impl FnOnce(&mut OpenBlock),
    ) {
        match &self.current {
            Some(open) if open.explicit => return,
            Some(_) => self.finish_current(),
            None => {}
        }
        let mut open = OpenBlock::new(kind, true, range.start, range.end);
        init(&mut open);
        self.current = Some(open);
    }

    fn close_implicit(&mut self) {
        if matches!(&self.current, Some(open) if !open.explicit) {
            self.finish_current();
        }
    }

    fn finish_current(&mut self) {
        let Some(open) = self.current.take() else {
            return;
        };

        let mut lines = self.lines.range_of(open.start, open.end);
        let text = if open.kind == BlockKind::Code {
            open.text
        } else {
            open.text.trim().to_string()
        };
        if text.is_empty() && open.kind != BlockKind::Code && open.images == 0 {
            return;
        }

        // Keep ranges monotonic and disjoint; a block that starts on the last
        // line of its predecessor is shifted, one that cannot be shifted is
        // folded into it.
        if let Some(prev) = self.blocks.last_mut() {
            if lines.start <= prev.lines.end {
                if lines.end > prev.lines.end {
                    lines = LineRange::new(prev.lines.end + 1, lines.end);
                } else {
                    if !text.is_empty() {
                        prev.text.push('\n');
                        prev.text.push_str(&text);
                    }
                    prev.inline_code.extend(open.inline_code);
                    prev.links.extend(open.links);
                    prev.images += open.images;
                    return;
                }
            }
        }

        let index = self.blocks.len();
        let section = if open.kind == BlockKind::Heading {
            let level = open.level.unwrap_or(1);
            while self.sections.last().map(|(l, _)| *l >= level).unwrap_or(false) {
                self.sections.pop();
            }
            let parent = self.sections.last().map(|(_, i)| *i);
            self.sections.push((level, index));
            parent
        } else {
            self.sections.last().map(|(_, i)| *i)
        };

        tracing::trace!(index, kind = ?open.kind, %lines, src = %excerpt(self.source, open.start), "block");

        self.blocks.push(Block {
            index,
            kind: open.kind,
            text,
            lang: open.lang,
            info: open.info,
            fenced: open.fenced,
            level: open.level,
            lines,
            section,
            inline_code: open.inline_code,
            links: open.links,
            images: open.images,
        });
    }

    /// Warn when a fenced block ends without its closing fence, i.e. at end
    /// of document or of its container.
    fn check_fence_closed(&mut self, range: std::ops::Range<usize>) {
        let Some(slice) = self.source.get(range.start..range.end) else {
            return;
        };
        let slice = slice.trim_end_matches(['\n', '\r']);
        let mut lines = slice.split('\n');
        let Some((fence_char, len)) = lines.next().and_then(fence_of) else {
            return;
        };
        let closed = slice.contains('\n')
            && lines
                .last()
                .and_then(fence_of)
                .map(|(c, run)| c == fence_char && run >= len)
                .unwrap_or(false);
        if closed {
            return;
        }

        let line = self.lines.line_of(range.start);
        self.warnings.push(ParseWarning {
            code: "W_UNTERMINATED_FENCE".to_string(),
            line,
            message: format!(
                "code fence {} opened on line {} is never closed; closed at end of its container",
                fence_char.to_string().repeat(len),
                line
            ),
        });
    }

    fn finish(mut self) -> (Vec<Block>, Vec<ParseWarning>) {
        self.finish_current();
        (self.blocks, self.warnings)
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn excerpt(source: &str, start: usize) -> &str {
    let rest = source.get(start..).unwrap_or("");
    let end = rest.find('\n').unwrap_or(rest.len()).min(40);
    rest.get(..end).unwrap_or(rest)
}

/// Fence character and run length of a fence line, ignoring container
/// prefixes (indentation, block quote markers).
fn fence_of(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(|c: char| c == ' ' || c == '\t' || c == '>');
    let fence_char = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let run = trimmed.chars().take_while(|c| *c == fence_char).count();
    (run >= 3).then_some((fence_char, run))
}
