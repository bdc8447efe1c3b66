//! Source locations for templates and tag expressions.
//!
//! Offsets are byte offsets into the template text. Line and column
//! numbers are derived on demand from a [`LineIndex`], which the tag
//! scanner fills in as it walks the template.

use std::fmt;

/// A half-open span `[index, index + length)` of template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceRange {
    pub index: usize,
    pub length: usize,
}

impl SourceRange {
    pub const fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// Range covering `start..end`. An inverted pair yields an empty range.
    pub const fn between(start: usize, end: usize) -> Self {
        if end < start {
            Self { index: start, length: 0 }
        } else {
            Self {
                index: start,
                length: end - start,
            }
        }
    }

    pub const fn end(&self) -> usize {
        self.index + self.length
    }

    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Smallest range containing both `self` and `other`.
    pub fn merge(self, other: Self) -> Self {
        let start = self.index.min(other.index);
        let end = self.end().max(other.end());
        Self::between(start, end)
    }

    pub const fn offset(self, by: usize) -> Self {
        Self {
            index: self.index + by,
            length: self.length,
        }
    }
}

/// 1-based line and column of an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextPosition {
    pub line: usize,
    pub column: usize,
}

impl Default for TextPosition {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Sorted offsets of every `\n` seen so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    newlines: Vec<usize>,
}

impl LineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full index for `text` in one pass.
    pub fn from_text(text: &str) -> Self {
        let newlines = text
            .bytes()
            .enumerate()
            .filter_map(|(i, b)| (b == b'\n').then_some(i))
            .collect();
        Self { newlines }
    }

    /// Record a newline at `offset`. Offsets must arrive in increasing
    /// order; a repeated or out-of-order offset is ignored.
    pub fn record(&mut self, offset: usize) {
        if self.newlines.last().is_none_or(|&last| offset > last) {
            self.newlines.push(offset);
        }
    }

    pub fn newline_count(&self) -> usize {
        self.newlines.len()
    }

    pub fn position(&self, offset: usize) -> TextPosition {
        // Number of newlines strictly before `offset`.
        let line_idx = self.newlines.partition_point(|&nl| nl < offset);
        let line_start = if line_idx == 0 {
            0
        } else {
            self.newlines[line_idx - 1] + 1
        };
        TextPosition {
            line: line_idx + 1,
            column: offset - line_start + 1,
        }
    }

    pub fn position_of(&self, range: SourceRange) -> TextPosition {
        self.position(range.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_across_lines() {
        let index = LineIndex::from_text("ab\ncd\n\nef");
        assert_eq!(index.position(0), TextPosition { line: 1, column: 1 });
        assert_eq!(index.position(2), TextPosition { line: 1, column: 3 });
        assert_eq!(index.position(3), TextPosition { line: 2, column: 1 });
        assert_eq!(index.position(6), TextPosition { line: 3, column: 1 });
        assert_eq!(index.position(8), TextPosition { line: 4, column: 2 });
    }

    #[test]
    fn test_record_ignores_out_of_order() {
        let mut index = LineIndex::new();
        index.record(4);
        index.record(4);
        index.record(2);
        index.record(9);
        assert_eq!(index.newline_count(), 2);
    }

    #[test]
    fn test_merge() {
        let a = SourceRange::new(3, 2);
        let b = SourceRange::new(8, 4);
        assert_eq!(a.merge(b), SourceRange::new(3, 9));
    }
}
