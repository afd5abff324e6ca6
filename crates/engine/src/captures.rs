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

/// Runtime storage for named captures (`$name<expr>`) and the lookups that
/// back-references (`$name`) perform against them.
///
/// Frames form a stack so that a capture made inside a nested rule call does
/// not leak into the caller once that rule returns, while a capture made
/// directly in the current rule's own sequence remains visible to later
/// elements of that same sequence (and to the rule's own back-references).
///
/// Backtracking (a failed `Choice` alternative, a failed `Optional`, a
/// rolled-back predicate) restores a prior snapshot. Snapshots clone the
/// whole frame stack; §9 calls this out as a simplification of the
/// persistent/COW structure the specification suggests, traded for a much
/// simpler implementation since grammars rarely nest captures deeply enough
/// for the clone cost to matter.
#[derive(Clone, Debug, Default)]
pub struct CaptureStack {
    frames: Vec<HashMap<String, String>>,
}

/// An opaque snapshot produced by [`CaptureStack::snapshot`]. Only valid for
/// [`CaptureStack::restore`] on the stack that produced it.
#[derive(Clone, Debug)]
pub struct CaptureSnapshot {
    frames: Vec<HashMap<String, String>>,
}

impl CaptureStack {
    pub fn new() -> Self {
        Self { frames: vec![HashMap::new()] }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
        if self.frames.is_empty() {
            self.frames.push(HashMap::new());
        }
    }

    /// Records a capture in the current (innermost) frame, overwriting any
    /// prior value for `name` set earlier in the same frame.
    pub fn set(&mut self, name: &str, text: String) {
        self.frames.last_mut().expect("frame stack is never empty").insert(name.to_string(), text);
    }

    /// Looks up `name` starting from the innermost frame outward, so a
    /// back-reference sees the nearest enclosing capture of that name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.frames.iter().rev().find_map(|frame| frame.get(name)).map(String::as_str)
    }

    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot { frames: self.frames.clone() }
    }

    pub fn restore(&mut self, snapshot: CaptureSnapshot) {
        self.frames = snapshot.frames;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_capture_is_visible_to_a_later_back_reference_in_the_same_frame() {
        let mut stack = CaptureStack::new();
        stack.set("tag", "div".to_string());
        assert_eq!(stack.get("tag"), Some("div"));
    }

    #[test]
    fn popping_a_frame_removes_captures_made_inside_it() {
        let mut stack = CaptureStack::new();
        stack.set("outer", "a".to_string());
        stack.push_frame();
        stack.set("inner", "b".to_string());
        stack.pop_frame();
        assert_eq!(stack.get("inner"), None);
        assert_eq!(stack.get("outer"), Some("a"));
    }

    #[test]
    fn restoring_a_snapshot_undoes_captures_made_after_it() {
        let mut stack = CaptureStack::new();
        stack.set("a", "1".to_string());
        let snap = stack.snapshot();
        stack.set("a", "2".to_string());
        stack.set("b", "3".to_string());
        stack.restore(snap);
        assert_eq!(stack.get("a"), Some("1"));
        assert_eq!(stack.get("b"), None);
    }
}
