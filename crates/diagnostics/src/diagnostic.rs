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

use peggy_span::Span;
use serde::{Deserialize, Serialize};

use crate::Severity;

/// An annotation anchored to a span inside a [`Diagnostic`]'s source, rendered
/// as a caret (primary) or dash (secondary) underline beneath the source line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub span: Span,
    pub message: String,
    pub is_primary: bool,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self { span, message: message.into(), is_primary: true }
    }

    pub fn secondary(span: Span, message: impl Into<String>) -> Self {
        Self { span, message: message.into(), is_primary: false }
    }
}

/// A single structured diagnostic: severity, optional code, message, one
/// primary span plus any number of labels, and aggregated help/notes.
///
/// Diagnostics are immutable once built; [`crate::Handler`] accumulates them
/// during a parse and [`crate::render`] turns them into Rust-style text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<String>,
    pub message: String,
    pub span: Span,
    pub labels: Vec<Label>,
    pub help: Vec<String>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, span: Span, message: impl Into<String>) -> Self {
        Self { severity, code: None, message: message.into(), span, labels: Vec::new(), help: Vec::new(), notes: Vec::new() }
    }

    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, span, message)
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, span, message)
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Project to an LSP `Diagnostic`-shaped tuple: 0-based start/end
    /// line/column and a 1-4 severity, per the facade's external interface.
    pub fn to_lsp(&self) -> LspDiagnostic {
        LspDiagnostic {
            start_line: self.span.start.line.saturating_sub(1),
            start_column: self.span.start.column.saturating_sub(1),
            end_line: self.span.end.line.saturating_sub(1),
            end_column: self.span.end.column.saturating_sub(1),
            severity: self.severity.to_lsp(),
            message: self.message.clone(),
        }
    }
}

/// LSP-shaped projection of a [`Diagnostic`], returned by [`Diagnostic::to_lsp`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspDiagnostic {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub severity: u8,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use peggy_span::Location;

    use super::*;

    #[test]
    fn round_trips_through_json() {
        let span = Span::new(Location::new(2, 1, 5), Location::new(2, 4, 8));
        let diag = Diagnostic::error(span, "unexpected input").with_code("E001").with_help("expected 'a'");
        let encoded = serde_json::to_string(&diag).expect("diagnostics are serde-serializable");
        let decoded: Diagnostic = serde_json::from_str(&encoded).expect("round-trips");
        assert_eq!(decoded, diag);
    }

    #[test]
    fn to_lsp_is_zero_based() {
        let span = Span::new(Location::new(3, 5, 20), Location::new(3, 8, 23));
        let diag = Diagnostic::error(span, "unexpected input");
        let lsp = diag.to_lsp();
        assert_eq!(lsp.start_line, 2);
        assert_eq!(lsp.start_column, 4);
        assert_eq!(lsp.severity, 1);
    }
}
