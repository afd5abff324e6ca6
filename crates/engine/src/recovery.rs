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

use peggy_span::{locate, Location};

/// Characters the recovery controller treats as synchronisation points: a
/// rule that failed outright is resumed by skipping forward to the nearest
/// one of these (or end of input, which is always reachable).
const SYNC_CHARS: [char; 6] = [',', ';', '}', ')', ']', '\n'];

/// Scans `input` forward from `from` looking for the nearest synchronisation
/// character, without consuming it — the caller's enclosing `Sequence`/
/// `Choice` is expected to match it normally once control returns to it.
///
/// Returns the byte offset of the sync character, or `input.len()` if none
/// is found before the end of input.
pub fn scan_to_sync_point(input: &str, from: usize) -> usize {
    match input[from..].find(SYNC_CHARS) {
        Some(rel) => from + rel,
        None => input.len(),
    }
}

/// Where a skipped span (reported as a `CstNode::Error`) starts and ends,
/// plus the `Location` a diagnostic about it should point at.
pub struct Skipped {
    pub start: usize,
    pub end: usize,
}

impl Skipped {
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }

    pub fn location(&self, input: &str) -> Location {
        locate(input, self.start)
    }
}

/// Computes the span a panic-mode recovery step skips: from the point a
/// rule's own match failed (`from`) to the next synchronisation point.
pub fn recover_span(input: &str, from: usize) -> Skipped {
    Skipped { start: from, end: scan_to_sync_point(input, from) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_before_a_comma() {
        assert_eq!(scan_to_sync_point("abc, def", 0), 3);
    }

    #[test]
    fn falls_back_to_end_of_input_with_no_sync_character() {
        let input = "abcdef";
        assert_eq!(scan_to_sync_point(input, 0), input.len());
    }

    #[test]
    fn recover_span_reports_the_skipped_slice() {
        let input = "@@@, rest";
        let skipped = recover_span(input, 0);
        assert_eq!(skipped.text(input), "@@@");
        assert_eq!(skipped.location(input), Location::new(1, 1, 0));
    }
}
