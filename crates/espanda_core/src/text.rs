//! Source positions.
//!
//! Every AST node carries a [`TextRange`]; diagnostics carry a [`TextSpan`].
//! Both are byte offsets into the UTF-8 source. [`LineMap`] turns offsets
//! into 1-based line/column pairs for dumps and human readable output.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Byte offset into a source file.
pub type TextPos = u32;

/// A half-open `[pos, end)` byte range.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Serialize)]
pub struct TextRange {
    pub pos: TextPos,
    pub end: TextPos,
}

impl TextRange {
    #[inline]
    pub fn new(pos: TextPos, end: TextPos) -> Self {
        debug_assert!(end >= pos);
        Self { pos, end }
    }

    #[inline]
    pub fn empty(pos: TextPos) -> Self {
        Self { pos, end: pos }
    }

    #[inline]
    pub fn len(&self) -> TextPos {
        self.end - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pos == self.end
    }

    /// Smallest range covering both `self` and `other`.
    #[inline]
    pub fn cover(&self, other: TextRange) -> TextRange {
        TextRange::new(self.pos.min(other.pos), self.end.max(other.end))
    }

    #[inline]
    pub fn to_span(&self) -> TextSpan {
        TextSpan::new(self.pos, self.len())
    }

    #[inline]
    pub fn to_range(&self) -> Range<usize> {
        self.pos as usize..self.end as usize
    }
}

impl fmt::Debug for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.pos, self.end)
    }
}

/// A start offset plus a length, the shape diagnostics are reported in.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Serialize)]
pub struct TextSpan {
    pub start: TextPos,
    pub length: TextPos,
}

impl TextSpan {
    #[inline]
    pub fn new(start: TextPos, length: TextPos) -> Self {
        Self { start, length }
    }

    #[inline]
    pub fn end(&self) -> TextPos {
        self.start + self.length
    }

    #[inline]
    pub fn contains(&self, pos: TextPos) -> bool {
        pos >= self.start && pos < self.end()
    }
}

impl fmt::Debug for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.start, self.length)
    }
}

impl From<TextRange> for TextSpan {
    fn from(range: TextRange) -> Self {
        range.to_span()
    }
}

/// A 1-based line and column pair.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct LineColumn {
    pub line: u32,
    pub column: u32,
}

/// Offsets of every line start in a source file.
#[derive(Debug, Clone)]
pub struct LineMap {
    line_starts: Vec<TextPos>,
}

impl LineMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i as TextPos + 1),
        );
        Self { line_starts }
    }

    /// 0-based line index containing `pos`.
    pub fn line_index(&self, pos: TextPos) -> usize {
        match self.line_starts.binary_search(&pos) {
            Ok(line) => line,
            Err(next) => next - 1,
        }
    }

    pub fn line_column(&self, pos: TextPos) -> LineColumn {
        let line = self.line_index(pos);
        LineColumn {
            line: line as u32 + 1,
            column: pos - self.line_starts[line] + 1,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_cover() {
        let a = TextRange::new(4, 8);
        let b = TextRange::new(2, 5);
        assert_eq!(a.cover(b), TextRange::new(2, 8));
        assert_eq!(a.to_span(), TextSpan::new(4, 4));
    }

    #[test]
    fn test_line_map_is_one_based() {
        let map = LineMap::new("let a;\nlet b;\n\nc");
        assert_eq!(map.line_count(), 4);
        assert_eq!(map.line_column(0), LineColumn { line: 1, column: 1 });
        assert_eq!(map.line_column(7), LineColumn { line: 2, column: 1 });
        assert_eq!(map.line_column(11), LineColumn { line: 2, column: 5 });
        assert_eq!(map.line_column(15), LineColumn { line: 4, column: 1 });
    }
}
