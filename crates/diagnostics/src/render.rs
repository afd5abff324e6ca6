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

use colored::Colorize;

use crate::{Diagnostic, Label, Severity};

/// Render a single [`Diagnostic`] in the Rust-compiler style described by the
/// diagnostic renderer component: a header naming severity/code/message, a
/// `--> file:line:col` pointer, the annotated source lines, and aggregated
/// help/note lines.
///
/// `source` must be the exact text the diagnostic's spans were computed
/// over; line numbers and underlines are derived by re-splitting it on `\n`.
pub fn render(diagnostic: &Diagnostic, filename: &str, source: &str) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let mut out = String::new();

    out.push_str(&header(diagnostic));
    out.push('\n');
    out.push_str(&format!(
        "  --> {filename}:{}:{}\n",
        diagnostic.span.start.line, diagnostic.span.start.column
    ));

    let mut labels: Vec<&Label> = diagnostic.labels.iter().collect();
    let implicit_primary;
    if !labels.iter().any(|l| l.is_primary) {
        implicit_primary = Label::primary(diagnostic.span, diagnostic.message.clone());
        labels.insert(0, &implicit_primary);
    }
    labels.sort_by_key(|l| l.span.start.line);

    let gutter_width = labels
        .iter()
        .map(|l| l.span.end.line)
        .chain(labels.iter().map(|l| l.span.start.line))
        .max()
        .unwrap_or(diagnostic.span.start.line)
        .to_string()
        .len();

    out.push_str(&gutter(gutter_width, None));
    out.push_str(" |\n");

    for label in &labels {
        render_label(&mut out, &lines, label, gutter_width);
    }

    if !diagnostic.help.is_empty() || !diagnostic.notes.is_empty() {
        out.push_str(&gutter(gutter_width, None));
        out.push_str(" |\n");
        for help in &diagnostic.help {
            out.push_str(&gutter(gutter_width, None));
            out.push_str(&format!(" = {}: {}\n", "help".cyan().bold(), help));
        }
        for note in &diagnostic.notes {
            out.push_str(&gutter(gutter_width, None));
            out.push_str(&format!(" = {}: {}\n", "note".bold(), note));
        }
    }

    out
}

/// Render every diagnostic in `diagnostics`, joined by blank lines, matching
/// `ParseResultWithDiagnostics::formatDiagnostics`.
pub fn render_all(diagnostics: &[Diagnostic], filename: &str, source: &str) -> String {
    diagnostics.iter().map(|d| render(d, filename, source)).collect::<Vec<_>>().join("\n")
}

fn header(diagnostic: &Diagnostic) -> String {
    let severity = colorize_severity(diagnostic.severity);
    match &diagnostic.code {
        Some(code) => format!("{severity}[{code}]: {}", diagnostic.message),
        None => format!("{severity}: {}", diagnostic.message),
    }
}

fn colorize_severity(severity: Severity) -> colored::ColoredString {
    let text = severity.to_string();
    match severity {
        Severity::Error => text.red().bold(),
        Severity::Warning => text.yellow().bold(),
        Severity::Info => text.blue().bold(),
        Severity::Hint => text.normal(),
    }
}

fn gutter(width: usize, number: Option<u32>) -> String {
    match number {
        Some(n) => format!("{:>width$}", n, width = width),
        None => " ".repeat(width),
    }
}

fn render_label(out: &mut String, lines: &[&str], label: &Label, gutter_width: usize) {
    let start_line = label.span.start.line;
    let end_line = label.span.end.line.max(start_line);
    let marker = if label.is_primary { '^' } else { '-' };

    for line_no in start_line..=end_line {
        let Some(text) = lines.get((line_no - 1) as usize) else { continue };
        out.push_str(&gutter(gutter_width, Some(line_no)));
        out.push_str(&format!(" | {text}\n"));

        let (from_col, to_col) = underline_columns(label, line_no, text.chars().count() as u32);
        let prefix = " ".repeat(from_col.saturating_sub(1) as usize);
        let underline = marker.to_string().repeat((to_col.saturating_sub(from_col).max(1)) as usize);
        out.push_str(&gutter(gutter_width, None));
        out.push_str(&format!(" | {prefix}{underline} {}\n", label.message));
    }
}

/// 1-based [from, to) column range to underline on `line_no` for a label
/// whose span may cover multiple lines.
fn underline_columns(label: &Label, line_no: u32, line_len: u32) -> (u32, u32) {
    let start_line = label.span.start.line;
    let end_line = label.span.end.line;
    match (line_no == start_line, line_no == end_line) {
        (true, true) => (label.span.start.column, label.span.end.column.max(label.span.start.column + 1)),
        (true, false) => (label.span.start.column, line_len + 1),
        (false, true) => (1, label.span.end.column),
        (false, false) => (1, line_len + 1),
    }
}

#[cfg(test)]
mod tests {
    use peggy_span::{Location, Span};

    use super::*;

    #[test]
    fn renders_header_and_pointer() {
        let span = Span::new(Location::new(1, 1, 0), Location::new(1, 2, 1));
        let diag = Diagnostic::error(span, "unexpected input").with_code("E001").with_help("expected 'a'");
        let rendered = render(&diag, "grammar.peg", "b");
        assert!(rendered.contains("--> grammar.peg:1:1"));
        assert!(rendered.contains("help"));
    }

    #[test]
    fn underlines_primary_span_with_carets() {
        let span = Span::new(Location::new(1, 3, 2), Location::new(1, 6, 5));
        let diag = Diagnostic::error(span, "unexpected input");
        let rendered = render(&diag, "f", "abXYZc");
        assert!(rendered.contains("^^^"));
    }
}
