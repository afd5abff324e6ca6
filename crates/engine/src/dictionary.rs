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

use std::collections::HashMap;

/// A compiled `Dictionary` literal set (the reserved, as-yet-unsyntaxed
/// construct `SPEC_FULL.md` §9 notes as present in the data model but with no
/// surface grammar syntax to produce it). Grammars built through the
/// external tooling the toolkit is paired with can still populate
/// `Expression::Dictionary { words, .. }` directly; this module is what the
/// engine uses to evaluate one efficiently.
///
/// Matching always takes the longest member that matches at the current
/// position, same as a dictionary-based lexer would, rather than the first
/// one listed.
#[derive(Clone, Debug, Default)]
pub struct Trie {
    root: Node,
    case_insensitive: bool,
}

#[derive(Clone, Debug, Default)]
struct Node {
    children: HashMap<char, Node>,
    /// Byte length of the word ending here, if any word does.
    end: Option<usize>,
}

impl Trie {
    pub fn build(words: &[String], case_insensitive: bool) -> Self {
        let mut root = Node::default();
        for word in words {
            let mut node = &mut root;
            for c in word.chars() {
                let key = if case_insensitive { c.to_ascii_lowercase() } else { c };
                node = node.children.entry(key).or_default();
            }
            node.end = Some(word.len());
        }
        Self { root, case_insensitive }
    }

    /// Returns the byte length of the longest dictionary member matching a
    /// prefix of `text`, or `None` if no member matches at all.
    pub fn longest_match(&self, text: &str) -> Option<usize> {
        let mut node = &self.root;
        let mut best = node.end;
        for c in text.chars() {
            let key = if self.case_insensitive { c.to_ascii_lowercase() } else { c };
            match node.children.get(&key) {
                Some(next) => {
                    node = next;
                    if node.end.is_some() {
                        best = node.end;
                    }
                }
                None => break,
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_the_longest_matching_member() {
        let trie = Trie::build(&words(&["a", "ab", "abc"]), false);
        assert_eq!(trie.longest_match("abcd"), Some(3));
    }

    #[test]
    fn no_member_matching_returns_none() {
        let trie = Trie::build(&words(&["foo", "bar"]), false);
        assert_eq!(trie.longest_match("baz"), None);
    }

    #[test]
    fn case_insensitive_matching_ignores_case() {
        let trie = Trie::build(&words(&["select"]), true);
        assert_eq!(trie.longest_match("SELECT x"), Some(6));
    }
}
