//! Addressable document tree.

use serde::{Deserialize, Serialize};

/// Inclusive, 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn single(line: usize) -> Self {
        Self::new(line, line)
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }

    pub fn overlaps(&self, other: &LineRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether `other` lies entirely within this range.
    pub fn covers(&self, other: &LineRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Lines between this range and `line` (0 when contained).
    pub fn distance_to(&self, line: usize) -> usize {
        if line < self.start {
            self.start - line
        } else if line > self.end {
            line - self.end
        } else {
            0
        }
    }

    /// Lines separating two ranges (0 when they overlap or touch).
    pub fn gap_to(&self, other: &LineRange) -> usize {
        if self.overlaps(other) {
            0
        } else if self.end < other.start {
            other.start - self.end - 1
        } else {
            self.start - other.end - 1
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "L{}", self.start)
        } else {
            write!(f, "L{}-{}", self.start, self.end)
        }
    }
}

/// Kind of parsed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Heading,
    Paragraph,
    Code,
}

/// A parsed document unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in document order.
    pub index: usize,
    pub kind: BlockKind,
    pub text: String,
    /// Declared language tag, verbatim. Only set for code blocks; may be empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Full fence info string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    #[serde(default)]
    pub fenced: bool,
    /// Heading level (1-6).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    pub lines: LineRange,
    /// Index of the heading block this block sits under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<usize>,
    /// Inline code spans found in prose blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inline_code: Vec<String>,
    /// Link destinations found in prose blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default)]
    pub images: usize,
}

impl Block {
    pub fn is_code(&self) -> bool {
        self.kind == BlockKind::Code
    }

    pub fn is_heading(&self) -> bool {
        self.kind == BlockKind::Heading
    }

    /// Headings and paragraphs.
    pub fn is_prose(&self) -> bool {
        !self.is_code()
    }

    /// Declared language tag, if non-empty.
    pub fn lang_tag(&self) -> Option<&str> {
        self.lang.as_deref().filter(|l| !l.trim().is_empty())
    }

    /// Code lines paired with their document line numbers.
    ///
    /// For fenced blocks the first content line is the one after the fence.
    pub fn code_lines(&self) -> Vec<(usize, &str)> {
        if !self.is_code() {
            return Vec::new();
        }
        let first = if self.fenced {
            self.lines.start + 1
        } else {
            self.lines.start
        };
        self.text
            .lines()
            .enumerate()
            .map(|(i, line)| (first + i, line))
            .collect()
    }

    /// Whether the paragraph is nothing but images and links (a badge row).
    pub fn is_badge_row(&self) -> bool {
        if self.kind != BlockKind::Paragraph || self.images == 0 {
            return false;
        }
        self.text
            .chars()
            .all(|c| c.is_whitespace() || matches!(c, '|' | '-' | '·' | '•'))
    }
}

/// Non-fatal anomaly found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub code: String,
    pub line: usize,
    pub message: String,
}

/// Parsed document: blocks in document order with monotonically increasing,
/// non-overlapping line ranges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    blocks: Vec<Block>,
    line_count: usize,
    warnings: Vec<ParseWarning>,
}

impl DocumentTree {
    pub(crate) fn new(blocks: Vec<Block>, line_count: usize, warnings: Vec<ParseWarning>) -> Self {
        Self {
            blocks,
            line_count,
            warnings,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.is_code())
    }

    pub fn prose_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.is_prose())
    }

    pub fn headings(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.is_heading())
    }

    /// Block whose range contains `line`.
    pub fn block_at_line(&self, line: usize) -> Option<&Block> {
        let idx = self.blocks.partition_point(|b| b.lines.end < line);
        self.blocks.get(idx).filter(|b| b.lines.contains(line))
    }

    /// Heading a block sits under.
    pub fn section_heading(&self, block: &Block) -> Option<&Block> {
        block.section.and_then(|i| self.blocks.get(i))
    }

    /// Line range from a heading to the last block before the next heading of
    /// the same or a higher level.
    pub fn section_range(&self, heading_index: usize) -> Option<LineRange> {
        let heading = self.blocks.get(heading_index).filter(|b| b.is_heading())?;
        let level = heading.level.unwrap_or(1);
        let mut end = heading.lines.end;
        for block in &self.blocks[heading_index + 1..] {
            if block.is_heading() && block.level.unwrap_or(1) <= level {
                break;
            }
            end = block.lines.end;
        }
        Some(LineRange::new(heading.lines.start, end))
    }

    /// Whether `range` starts and ends on block boundaries.
    pub fn is_block_aligned(&self, range: &LineRange) -> bool {
        self.blocks.iter().any(|b| b.lines.start == range.start)
            && self.blocks.iter().any(|b| b.lines.end == range.end)
    }

    /// Nearest prose block before `block_index`, no more than `max_gap` lines away.
    pub fn preceding_prose(&self, block_index: usize, max_gap: usize) -> Option<&Block> {
        let block = self.blocks.get(block_index)?;
        self.blocks[..block_index]
            .iter()
            .rev()
            .take_while(|b| b.lines.gap_to(&block.lines) <= max_gap)
            .find(|b| b.kind == BlockKind::Paragraph)
    }

    /// Heading texts along the section chain of a block, innermost first.
    pub fn heading_chain(&self, block: &Block) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.section_heading(block);
        let mut last_level = u8::MAX;
        while let Some(h) = current {
            let level = h.level.unwrap_or(1);
            if level < last_level {
                chain.push(h.text.as_str());
                last_level = level;
            }
            if level <= 1 {
                break;
            }
            current = self.section_heading(h);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_range_relations() {
        let a = LineRange::new(3, 6);
        let b = LineRange::new(6, 9);
        let c = LineRange::new(10, 12);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.gap_to(&c), 3);
        assert_eq!(c.gap_to(&a), 3);
        assert_eq!(a.distance_to(1), 2);
        assert_eq!(a.distance_to(4), 0);
        assert!(LineRange::new(1, 20).covers(&a));
        assert_eq!(a.len(), 4);
        assert_eq!(a.to_string(), "L3-6");
    }

    #[test]
    fn test_inverted_range_is_normalised() {
        let r = LineRange::new(5, 2);
        assert_eq!(r.start, 5);
        assert_eq!(r.end, 5);
    }
}
