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

use peggy_tree::{Expression, Grammar, Rule};

/// A [`Grammar`] with each effective rule assigned a dense `u16` id, plus a
/// couple of static analyses over each rule's expression tree computed once
/// at compile time rather than re-derived on every parse.
///
/// Duplicate rule definitions are folded here exactly like
/// [`Grammar::rule`]'s "last wins" lookup, so the ids line up with what a
/// `Reference` actually resolves to at runtime.
#[derive(Debug)]
pub struct CompiledGrammar {
    grammar: Grammar,
    rule_ids: HashMap<String, u16>,
    order: Vec<String>,
    /// True if evaluating this rule can ever write a capture visible to its
    /// caller (i.e. the rule's body touches `Capture`/`CaptureScope`/
    /// `BackReference` outside of a predicate). Packrat caching is skipped
    /// for such rules rather than tracking a capture replay log.
    touches_captures: Vec<bool>,
    /// True if this rule's body can contribute a nested `Reference` or
    /// `TokenBoundary` child (i.e. it is "compound" per §4.D's tree
    /// construction rule). False means the whole rule collapses to one flat
    /// `Terminal` using its own matched span.
    is_compound: Vec<bool>,
}

impl CompiledGrammar {
    pub fn compile(grammar: Grammar) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut rule_ids: HashMap<String, u16> = HashMap::new();
        for rule in &grammar.rules {
            if !rule_ids.contains_key(&rule.name) {
                rule_ids.insert(rule.name.clone(), order.len() as u16);
                order.push(rule.name.clone());
            }
        }

        let mut touches_captures = vec![false; order.len()];
        let mut is_compound = vec![false; order.len()];
        for (name, id) in &rule_ids {
            let rule = grammar.rule(name).expect("rule_ids only contains defined rule names");
            touches_captures[*id as usize] = expression_touches_captures(&rule.expression);
            is_compound[*id as usize] = expression_is_compound(&rule.expression);
        }

        Self { grammar, rule_ids, order, touches_captures, is_compound }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn rule_id(&self, name: &str) -> Option<u16> {
        self.rule_ids.get(name).copied()
    }

    pub fn rule_name(&self, id: u16) -> Option<&str> {
        self.order.get(id as usize).map(String::as_str)
    }

    /// The effective (last-wins) rule definition for `name`.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.grammar.rule(name)
    }

    pub fn rule_by_id(&self, id: u16) -> Option<&Rule> {
        self.rule_name(id).and_then(|name| self.rule(name))
    }

    pub fn start_rule(&self) -> Option<&Rule> {
        self.grammar.start_rule_name().and_then(|name| self.rule(name))
    }

    pub fn touches_captures(&self, id: u16) -> bool {
        self.touches_captures.get(id as usize).copied().unwrap_or(true)
    }

    pub fn is_compound(&self, id: u16) -> bool {
        self.is_compound.get(id as usize).copied().unwrap_or(true)
    }

    pub fn rule_count(&self) -> usize {
        self.order.len()
    }
}

/// Unwraps transparent `Group` wrappers to see whether an expression's
/// top-level shape is a bare `TokenBoundary`, per the rule-level `Token`
/// classification in §4.D.
pub fn is_token_boundary_at_top(expr: &Expression) -> bool {
    match expr {
        Expression::TokenBoundary { .. } => true,
        Expression::Group { expression, .. } => is_token_boundary_at_top(expression),
        _ => false,
    }
}

/// Does not recurse into `And`/`Not`: side effects inside a predicate are
/// always rolled back (see `State::eval`'s dry-run handling), so a capture or
/// nested reference reachable only through a predicate never actually
/// contributes anything a caller can observe.
fn expression_touches_captures(expr: &Expression) -> bool {
    match expr {
        Expression::Capture { .. } | Expression::CaptureScope { .. } | Expression::BackReference { .. } => true,
        Expression::And { .. } | Expression::Not { .. } => false,
        Expression::Sequence { elements, .. } | Expression::Choice { alternatives: elements, .. } => {
            elements.iter().any(expression_touches_captures)
        }
        Expression::Group { expression, .. }
        | Expression::ZeroOrMore { expression, .. }
        | Expression::OneOrMore { expression, .. }
        | Expression::Optional { expression, .. }
        | Expression::Repetition { expression, .. }
        | Expression::TokenBoundary { expression, .. }
        | Expression::Ignore { expression, .. } => expression_touches_captures(expression),
        _ => false,
    }
}

fn expression_is_compound(expr: &Expression) -> bool {
    match expr {
        Expression::Reference { .. } | Expression::TokenBoundary { .. } => true,
        Expression::And { .. } | Expression::Not { .. } => false,
        Expression::Sequence { elements, .. } | Expression::Choice { alternatives: elements, .. } => {
            elements.iter().any(expression_is_compound)
        }
        Expression::Group { expression, .. }
        | Expression::ZeroOrMore { expression, .. }
        | Expression::OneOrMore { expression, .. }
        | Expression::Optional { expression, .. }
        | Expression::Repetition { expression, .. }
        | Expression::Ignore { expression, .. }
        | Expression::Capture { expression, .. }
        | Expression::CaptureScope { expression, .. } => expression_is_compound(expression),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use peggy_diagnostics::Handler;
    use peggy_parser::{parse_grammar, validate};

    use super::*;

    fn compile(source: &str) -> CompiledGrammar {
        let handler = Handler::new(100);
        let grammar = parse_grammar(source, &handler).unwrap();
        let grammar = validate(grammar, &handler).unwrap();
        CompiledGrammar::compile(grammar)
    }

    #[test]
    fn duplicate_rules_get_one_id_using_the_last_definition() {
        let compiled = compile("A <- 'x'\nA <- 'y'");
        assert_eq!(compiled.rule_count(), 1);
        let id = compiled.rule_id("A").unwrap();
        assert_eq!(compiled.rule_by_id(id).unwrap().expression.describe(), "'y'");
    }

    #[test]
    fn a_bare_char_class_repetition_is_not_compound() {
        let compiled = compile("Number <- [0-9]+");
        let id = compiled.rule_id("Number").unwrap();
        assert!(!compiled.is_compound(id));
    }

    #[test]
    fn a_rule_referencing_another_rule_is_compound() {
        let compiled = compile("A <- B 'x'\nB <- 'y'");
        let id = compiled.rule_id("A").unwrap();
        assert!(compiled.is_compound(id));
    }

    #[test]
    fn capture_inside_a_predicate_does_not_count() {
        let compiled = compile("A <- &$x<'a'> 'a'");
        let id = compiled.rule_id("A").unwrap();
        assert!(!compiled.touches_captures(id));
    }
}
