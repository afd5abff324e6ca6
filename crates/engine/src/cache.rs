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
use std::hash::BuildHasherDefault;

use fxhash::FxHasher;
use peggy_tree::{AstNode, CstNode};

/// Packrat memoisation table, keyed by the `(rule id, start offset)` pair
/// that fully determines a rule invocation's outcome in a backtracking PEG.
///
/// Entries are never inserted for a rule whose [`crate::CompiledGrammar`]
/// analysis marks it as touching captures: replaying the capture-stack
/// mutations a cached success implies would need either re-running the rule
/// anyway or recording a capture delta to replay, and grammars that rely on
/// back-references are rare enough that always-missing the cache for them is
/// an acceptable trade (documented in the design notes as a simplification).
#[derive(Default)]
pub struct PackratCache {
    entries: HashMap<(u16, usize), CacheEntry, BuildHasherDefault<FxHasher>>,
}

#[derive(Clone, Debug)]
pub enum CacheEntry {
    Success { end_offset: usize, cst: CstNode, ast: AstNode },
    Failure,
}

impl PackratCache {
    pub fn new() -> Self {
        Self { entries: HashMap::default() }
    }

    pub fn get(&self, rule_id: u16, offset: usize) -> Option<&CacheEntry> {
        self.entries.get(&(rule_id, offset))
    }

    pub fn insert(&mut self, rule_id: u16, offset: usize, entry: CacheEntry) {
        self.entries.insert((rule_id, offset), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use peggy_span::{Location, Span};

    use super::*;

    fn leaf() -> (CstNode, AstNode) {
        let span = Span::empty(Location::start());
        (
            CstNode::Terminal { span, rule: "A".into(), text: String::new(), leading_trivia: vec![], trailing_trivia: vec![] },
            AstNode::Terminal { span, rule: "A".into(), text: String::new(), value: None },
        )
    }

    #[test]
    fn distinct_offsets_for_the_same_rule_do_not_collide() {
        let mut cache = PackratCache::new();
        let (cst, ast) = leaf();
        cache.insert(0, 3, CacheEntry::Success { end_offset: 5, cst, ast });
        assert!(cache.get(0, 3).is_some());
        assert!(cache.get(0, 4).is_none());
        assert!(cache.get(1, 3).is_none());
    }

    #[test]
    fn a_failure_entry_is_distinguishable_from_absence() {
        let mut cache = PackratCache::new();
        cache.insert(2, 0, CacheEntry::Failure);
        assert!(matches!(cache.get(2, 0), Some(CacheEntry::Failure)));
        assert!(cache.get(2, 1).is_none());
    }
}
