// Copyright (C) 2019-2026 Provable Inc.
// This file is part of the Peggy library.

// The Peggy library is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// The Peggy library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with the Peggy library. If not, see <https://www.gnu.org/licenses/>.

//! Source position model: [`Location`] and [`Span`].
//!
//! Spans are half-open over byte offsets; line and column are 1-based and
//! exist only to make diagnostics readable, never to drive parsing decisions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single point in source text.
///
/// `line` and `column` are 1-based; `offset` is a 0-based byte offset into
/// the source string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Location {
    pub const fn new(line: u32, column: u32, offset: usize) -> Self {
        debug_assert!(line >= 1 && column >= 1, "line and column are 1-based");
        Self { line, column, offset }
    }

    /// The location at the very start of a source file.
    pub const fn start() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range over source text, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub fn new(start: Location, end: Location) -> Self {
        debug_assert!(end.offset >= start.offset, "span end must not precede its start");
        Self { start, end }
    }

    /// A zero-length span at `loc`, used for "expected X here" diagnostics.
    pub fn empty(loc: Location) -> Self {
        Self { start: loc, end: loc }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        let start = if self.start.offset <= other.start.offset { self.start } else { other.start };
        let end = if self.end.offset >= other.end.offset { self.end } else { other.end };
        Span::new(start, end)
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Slice the text this span covers out of `input`.
    ///
    /// `input` must be the same string the span was produced over; offsets
    /// are byte offsets, so this never splits a UTF-8 code point as long as
    /// that invariant holds.
    pub fn extract<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start.offset..self.end.offset]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Tracks line/column while scanning a source string left to right.
///
/// Used by the lexer and by the recovery controller, both of which advance
/// a cursor over the input one character at a time and need the resulting
/// `Location` for diagnostics. Tabs advance the column by one, per spec:
/// column is a character count, not a visual width.
#[derive(Clone, Debug)]
pub struct LineColTracker {
    line: u32,
    column: u32,
    offset: usize,
}

impl LineColTracker {
    pub fn new() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, self.column, self.offset)
    }

    /// Advance past a single character, updating line/column/offset.
    pub fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// Advance past an entire string slice.
    pub fn advance_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance(ch);
        }
    }
}

impl Default for LineColTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the `Location` for a byte offset into `input` from scratch.
///
/// This is O(n) in the offset; callers on the hot path (the engine) track
/// position incrementally with [`LineColTracker`] instead and only fall back
/// to this when rendering a diagnostic for an offset captured elsewhere.
pub fn locate(input: &str, offset: usize) -> Location {
    let mut tracker = LineColTracker::new();
    for ch in input[..offset.min(input.len())].chars() {
        tracker.advance(ch);
    }
    tracker.location()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_tracks_lines_and_columns() {
        let input = "ab\ncd\nef";
        assert_eq!(locate(input, 0), Location::new(1, 1, 0));
        assert_eq!(locate(input, 2), Location::new(1, 3, 2));
        assert_eq!(locate(input, 3), Location::new(2, 1, 3));
        assert_eq!(locate(input, 6), Location::new(3, 1, 6));
    }

    #[test]
    fn span_to_joins_ranges() {
        let a = Span::new(Location::new(1, 1, 0), Location::new(1, 3, 2));
        let b = Span::new(Location::new(1, 5, 4), Location::new(1, 7, 6));
        let joined = a.to(b);
        assert_eq!(joined.start.offset, 0);
        assert_eq!(joined.end.offset, 6);
    }

    #[test]
    fn span_extract_returns_exact_text() {
        let input = "hello world";
        let span = Span::new(Location::new(1, 1, 0), Location::new(1, 6, 5));
        assert_eq!(span.extract(input), "hello");
    }

    #[test]
    fn tabs_advance_column_by_one() {
        let mut tracker = LineColTracker::new();
        tracker.advance('\t');
        assert_eq!(tracker.location(), Location::new(1, 2, 1));
    }
}
