use serde::{Deserialize, Serialize};

/// Byte-offset span into source text. Start is inclusive, end is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span from byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start ({start}) must be <= end ({end})");
        Self { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span is empty (zero-length).
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A 1-indexed line, 0-indexed column source position, matching spec.md's
/// data model exactly. Produced incrementally by the lexer as it scans
/// rather than recovered from a byte offset after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub const START: Position = Position { line: 1, column: 0 };
}

/// Pre-computed index of line start positions for on-demand line/column
/// lookup. Used by the diff parser to split old/new source into lines and
/// to translate copied-subtree positions by a line offset.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index by scanning the source text for newline characters.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a `(1-indexed line, 0-indexed column)` pair,
    /// matching [`Position`]'s convention.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = self.line_starts.partition_point(|&start| start <= offset);
        let line_idx = line_idx.saturating_sub(1);
        let line = (line_idx as u32) + 1;
        let col = offset - self.line_starts[line_idx];
        (line, col)
    }

    /// Convert a byte offset directly to a [`Position`].
    pub fn position(&self, offset: u32) -> Position {
        let (line, column) = self.line_col(offset);
        Position::new(line, column)
    }

    /// Return the number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Split source text into physical lines, each retaining its line ending
/// (`\n`, `\r\n`, or nothing for a final unterminated line). Per spec.md
/// §4.3, form-feed is never treated as a line separator.
pub fn split_lines_keepends(source: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    let bytes = source.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            lines.push(&source[start..=i]);
            i += 1;
            start = i;
        } else if bytes[i] == b'\r' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                lines.push(&source[start..=i + 1]);
                i += 2;
            } else {
                lines.push(&source[start..=i]);
                i += 1;
            }
            start = i;
        } else {
            i += 1;
        }
    }
    if start < source.len() {
        lines.push(&source[start..]);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_new_and_len() {
        let span = Span::new(5, 10);
        assert_eq!(span.start, 5);
        assert_eq!(span.end, 10);
        assert_eq!(span.len(), 5);
        assert!(!span.is_empty());
    }

    #[test]
    fn span_empty() {
        let span = Span::new(3, 3);
        assert_eq!(span.len(), 0);
        assert!(span.is_empty());
    }

    #[test]
    fn span_merge() {
        let a = Span::new(5, 10);
        let b = Span::new(8, 15);
        let merged = a.merge(b);
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 15);
    }

    #[test]
    fn position_ordering_is_lexicographic() {
        assert!(Position::new(1, 5) < Position::new(2, 0));
        assert!(Position::new(1, 5) < Position::new(1, 6));
    }

    #[test]
    fn line_index_single_line() {
        let idx = LineIndex::new("hello");
        assert_eq!(idx.line_col(0), (1, 0));
        assert_eq!(idx.line_col(4), (1, 4));
    }

    #[test]
    fn line_index_multiple_lines() {
        let src = "hello\nworld\nfoo";
        let idx = LineIndex::new(src);
        assert_eq!(idx.line_col(0), (1, 0));
        assert_eq!(idx.line_col(6), (2, 0));
        assert_eq!(idx.line_col(12), (3, 0));
        assert_eq!(idx.line_col(13), (3, 1));
    }

    #[test]
    fn position_matches_line_col() {
        let idx = LineIndex::new("hello\nworld");
        assert_eq!(idx.position(6), Position::new(2, 0));
    }

    #[test]
    fn split_lines_keepends_handles_mixed_endings() {
        let lines = split_lines_keepends("a\nb\r\nc");
        assert_eq!(lines, vec!["a\n", "b\r\n", "c"]);
    }

    #[test]
    fn split_lines_keepends_form_feed_is_not_a_separator() {
        let lines = split_lines_keepends("a\x0cb\n");
        assert_eq!(lines, vec!["a\x0cb\n"]);
    }

    #[test]
    fn split_lines_keepends_trailing_newline_yields_no_empty_tail() {
        let lines = split_lines_keepends("a\n");
        assert_eq!(lines, vec!["a\n"]);
    }
}
