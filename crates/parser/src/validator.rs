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

use std::collections::HashSet;

use peggy_diagnostics::{Diagnostic, Handler, ParseError, Result};
use peggy_tree::{Expression, Grammar};

/// Validate a parsed grammar: every `Reference.rule_name` must resolve to a
/// defined rule, and duplicate rule names are reported as warnings (the
/// later definition wins, non-fatally). Returns the same grammar unchanged
/// on success.
pub fn validate(grammar: Grammar, handler: &Handler) -> Result<Grammar> {
    report_duplicate_rules(&grammar, handler);
    check_references(&grammar)?;
    Ok(grammar)
}

fn report_duplicate_rules(grammar: &Grammar, handler: &Handler) {
    let mut seen = HashSet::new();
    for rule in &grammar.rules {
        if !seen.insert(rule.name.as_str()) {
            handler.emit(Diagnostic::warning(
                rule.span,
                format!("rule `{}` is defined more than once; the later definition wins", rule.name),
            ));
        }
    }
}

fn check_references(grammar: &Grammar) -> Result<()> {
    let defined: HashSet<&str> = grammar.rules.iter().map(|r| r.name.as_str()).collect();
    for rule in &grammar.rules {
        check_expression(&rule.expression, &defined)?;
    }
    if let Some(expr) = &grammar.whitespace_expr {
        check_expression(expr, &defined)?;
    }
    if let Some(expr) = &grammar.word_expr {
        check_expression(expr, &defined)?;
    }
    Ok(())
}

fn check_expression(expr: &Expression, defined: &HashSet<&str>) -> Result<()> {
    match expr {
        Expression::Reference { span, rule_name } if !defined.contains(rule_name.as_str()) => {
            Err(ParseError::SemanticError { location: span.start, reason: format!("undefined rule '{rule_name}'") })
        }
        Expression::Reference { .. }
        | Expression::Literal { .. }
        | Expression::CharClass { .. }
        | Expression::Any { .. }
        | Expression::BackReference { .. }
        | Expression::Cut { .. }
        | Expression::Dictionary { .. } => Ok(()),
        Expression::Sequence { elements, .. } | Expression::Choice { alternatives: elements, .. } => {
            elements.iter().try_for_each(|e| check_expression(e, defined))
        }
        Expression::Group { expression, .. }
        | Expression::ZeroOrMore { expression, .. }
        | Expression::OneOrMore { expression, .. }
        | Expression::Optional { expression, .. }
        | Expression::Repetition { expression, .. }
        | Expression::And { expression, .. }
        | Expression::Not { expression, .. }
        | Expression::TokenBoundary { expression, .. }
        | Expression::Ignore { expression, .. }
        | Expression::Capture { expression, .. }
        | Expression::CaptureScope { expression, .. } => check_expression(expression, defined),
    }
}

#[cfg(test)]
mod tests {
    use peggy_diagnostics::Handler;

    use super::*;
    use crate::parse_grammar;

    #[test]
    fn undefined_reference_is_a_semantic_error() {
        let handler = Handler::new(100);
        let grammar = parse_grammar("A <- Foo", &handler).unwrap();
        let err = validate(grammar, &handler).unwrap_err();
        match err {
            ParseError::SemanticError { reason, .. } => assert!(reason.contains("Foo")),
            other => panic!("expected SemanticError, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_rules_are_a_non_fatal_warning() {
        let handler = Handler::new(100);
        let grammar = parse_grammar("A <- 'x'\nA <- 'y'", &handler).unwrap();
        let grammar = validate(grammar, &handler).unwrap();
        assert!(!handler.has_errors());
        assert_eq!(handler.len(), 1);
        assert_eq!(grammar.rule("A").unwrap().expression.describe(), "'y'");
    }

    #[test]
    fn well_formed_grammar_validates_cleanly() {
        let handler = Handler::new(100);
        let grammar = parse_grammar("A <- 'x' B\nB <- 'y'", &handler).unwrap();
        assert!(validate(grammar, &handler).is_ok());
        assert!(handler.is_empty());
    }
}
