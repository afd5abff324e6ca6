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

use std::iter::Peekable;
use std::str::Chars;

/// A parsed `[...]` character class, ready for `O(items)` matching.
///
/// `CharClass.pattern` (from `peggy-tree`) keeps its escapes literal, same as
/// the raw grammar source; this compiles it once per grammar rather than
/// re-parsing the pattern string on every match attempt.
#[derive(Clone, Debug)]
pub struct CompiledCharClass {
    items: Vec<ClassItem>,
    negated: bool,
    case_insensitive: bool,
}

#[derive(Clone, Copy, Debug)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

impl CompiledCharClass {
    pub fn compile(pattern: &str, negated: bool, case_insensitive: bool) -> Self {
        Self { items: parse_pattern(pattern), negated, case_insensitive }
    }

    pub fn matches(&self, c: char) -> bool {
        let found = self.items.iter().any(|item| item_matches(item, c, self.case_insensitive));
        found != self.negated
    }
}

fn item_matches(item: &ClassItem, c: char, case_insensitive: bool) -> bool {
    match item {
        ClassItem::Char(ch) => chars_equal(*ch, c, case_insensitive),
        ClassItem::Range(lo, hi) => {
            if case_insensitive {
                let c_lower = c.to_ascii_lowercase();
                let c_upper = c.to_ascii_uppercase();
                (*lo..=*hi).contains(&c_lower) || (*lo..=*hi).contains(&c_upper) || (*lo..=*hi).contains(&c)
            } else {
                (*lo..=*hi).contains(&c)
            }
        }
    }
}

fn chars_equal(a: char, b: char, case_insensitive: bool) -> bool {
    if case_insensitive {
        a.to_ascii_lowercase() == b.to_ascii_lowercase()
    } else {
        a == b
    }
}

fn parse_pattern(pattern: &str) -> Vec<ClassItem> {
    let mut chars = pattern.chars().peekable();
    let mut items = Vec::new();
    while let Some(first) = decode_one(&mut chars) {
        if matches!(chars.peek(), Some('-')) {
            // Peek past the hyphen: a trailing `-` with nothing after it is a
            // literal hyphen, not the start of an open range.
            let mut lookahead = chars.clone();
            lookahead.next();
            if lookahead.peek().is_some() {
                chars.next();
                let second = decode_one(&mut chars).expect("checked by peek above");
                let (lo, hi) = if first <= second { (first, second) } else { (second, first) };
                items.push(ClassItem::Range(lo, hi));
                continue;
            }
        }
        items.push(ClassItem::Char(first));
    }
    items
}

fn decode_one(chars: &mut Peekable<Chars<'_>>) -> Option<char> {
    let c = chars.next()?;
    if c != '\\' {
        return Some(c);
    }
    match chars.next() {
        Some('n') => Some('\n'),
        Some('r') => Some('\r'),
        Some('t') => Some('\t'),
        Some('\\') => Some('\\'),
        Some('\'') => Some('\''),
        Some('"') => Some('"'),
        Some(']') => Some(']'),
        Some('-') => Some('-'),
        Some('0') => Some('\0'),
        Some('x') => {
            let hex: String = (0..2).filter_map(|_| chars.next()).collect();
            u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
        }
        Some('u') => {
            let hex: String = (0..4).filter_map(|_| chars.next()).collect();
            u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
        }
        Some(other) => Some(other),
        None => Some('\\'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_simple_range_matches_its_bounds_and_interior() {
        let class = CompiledCharClass::compile("a-z", false, false);
        assert!(class.matches('a'));
        assert!(class.matches('m'));
        assert!(class.matches('z'));
        assert!(!class.matches('A'));
        assert!(!class.matches('0'));
    }

    #[test]
    fn negation_inverts_membership() {
        let class = CompiledCharClass::compile("0-9", true, false);
        assert!(class.matches('a'));
        assert!(!class.matches('5'));
    }

    #[test]
    fn a_trailing_hyphen_is_a_literal_character() {
        let class = CompiledCharClass::compile("+-", false, false);
        assert!(class.matches('+'));
        assert!(class.matches('-'));
        assert!(!class.matches('a'));
    }

    #[test]
    fn case_insensitive_ranges_match_both_cases() {
        let class = CompiledCharClass::compile("a-z", false, true);
        assert!(class.matches('A'));
        assert!(class.matches('z'));
    }

    #[test]
    fn escaped_bracket_and_backslash_are_literal_members() {
        let class = CompiledCharClass::compile(r"\]\\", false, false);
        assert!(class.matches(']'));
        assert!(class.matches('\\'));
    }
}
