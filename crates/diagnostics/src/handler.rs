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

use std::cell::RefCell;

use crate::{Diagnostic, Severity};

/// Accumulates [`Diagnostic`]s during a single parse.
///
/// Uses interior mutability so deeply recursive engine code (rule
/// invocations nested dozens of frames deep under `Sequence`/`Choice`) can
/// emit diagnostics without threading a `&mut Handler` through every
/// expression-evaluation function — the same rationale the toolkit's own
/// id-allocating builders give for their `RefCell` use. A `Handler` is
/// scoped to one `parse` call and discarded with it; it is never shared
/// across parses.
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
    cascade_limit: usize,
}

impl Handler {
    /// `cascade_limit` bounds the number of Error-severity diagnostics this
    /// handler will accept before [`Handler::cascade_exceeded`] reports true.
    pub fn new(cascade_limit: usize) -> Self {
        Self { diagnostics: RefCell::new(Vec::new()), cascade_limit }
    }

    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.borrow().iter().filter(|d| d.severity.is_error()).count()
    }

    /// True once the number of Error-severity diagnostics reaches the
    /// cascade bound (default 100 per the recovery controller's spec).
    pub fn cascade_exceeded(&self) -> bool {
        self.cascade_limit > 0 && self.error_count() >= self.cascade_limit
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn has_severity(&self, severity: Severity) -> bool {
        self.diagnostics.borrow().iter().any(|d| d.severity == severity)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all diagnostics emitted so far, in emission order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Consume the handler, returning its diagnostics in emission order.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use peggy_span::{Location, Span};

    use super::*;

    #[test]
    fn cascade_exceeded_after_limit() {
        let handler = Handler::new(2);
        let span = Span::empty(Location::start());
        handler.emit(Diagnostic::error(span, "one"));
        assert!(!handler.cascade_exceeded());
        handler.emit(Diagnostic::error(span, "two"));
        assert!(handler.cascade_exceeded());
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let handler = Handler::new(100);
        let span = Span::empty(Location::start());
        handler.emit(Diagnostic::warning(span, "duplicate rule"));
        assert!(!handler.has_errors());
        assert_eq!(handler.len(), 1);
    }
}
