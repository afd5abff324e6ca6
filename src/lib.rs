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

//! Parser façade (component J): resolves configuration, compiles grammar
//! source into a [`CompiledGrammar`], and exposes the three entry points a
//! caller actually needs — `parse`, `parse_cst`, and
//! `parse_cst_with_diagnostics` — over `peggy-lexer`/`peggy-parser`'s grammar
//! ingest and `peggy-engine`'s execution engine.
//!
//! ```
//! use peggy::Peggy;
//!
//! let peggy = Peggy::compile("Number <- [0-9]+").unwrap();
//! let cst = peggy.parse_cst("42").unwrap();
//! assert_eq!(cst.rule_name(), "Number");
//! ```

use std::sync::Arc;

use peggy_diagnostics::{render_all, Diagnostic, Handler, ParseError, Severity};
use peggy_engine::{CompiledGrammar, EngineConfig, RecoveryStrategy as EngineRecoveryStrategy};
use peggy_parser::{parse_grammar, validate};
use peggy_tree::{Action, ActionTable, AstNode, CstNode, Value};

pub use peggy_diagnostics::{ParseError as Error, Result};
pub use peggy_engine::RecoveryStrategy;
pub use peggy_tree::{Action as ActionTrait, AstNode as Ast, CstNode as Cst, SemanticValues, Value as ActionValue};

/// Immutable per-parse configuration, resolved once and threaded through the
/// engine (§4.G). The `Default` mirrors the engine's own defaults: packrat
/// on, no recovery, trivia captured.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub packrat_enabled: bool,
    pub recovery_strategy: RecoveryStrategy,
    pub capture_trivia: bool,
    /// See [`peggy_engine::EngineConfig::cascade_limit`].
    pub cascade_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { packrat_enabled: true, recovery_strategy: RecoveryStrategy::None, capture_trivia: true, cascade_limit: 100 }
    }
}

impl Config {
    pub fn with_packrat(mut self, enabled: bool) -> Self {
        self.packrat_enabled = enabled;
        self
    }

    pub fn with_recovery(mut self, strategy: RecoveryStrategy) -> Self {
        self.recovery_strategy = strategy;
        self
    }

    pub fn with_trivia(mut self, enabled: bool) -> Self {
        self.capture_trivia = enabled;
        self
    }

    fn to_engine_config(self) -> EngineConfig {
        EngineConfig {
            packrat_enabled: self.packrat_enabled,
            recovery: self.recovery_strategy,
            capture_trivia: self.capture_trivia,
            cascade_limit: self.cascade_limit,
        }
    }
}

/// The result of [`Peggy::parse_cst_with_diagnostics`]: always returns,
/// carrying whatever (possibly partial) tree could be built plus every
/// diagnostic collected along the way, per §6's `ParseResultWithDiagnostics`.
#[derive(Clone, Debug)]
pub struct ParseResultWithDiagnostics {
    pub node: Option<CstNode>,
    pub diagnostics: Vec<Diagnostic>,
    pub source: String,
}

impl ParseResultWithDiagnostics {
    /// True when no diagnostic has `Error` severity.
    pub fn is_success(&self) -> bool {
        !self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        !self.is_success()
    }

    pub fn has_node(&self) -> bool {
        self.node.is_some()
    }

    /// Renders every diagnostic in the Rust-compiler style, joined by blank
    /// lines, against `self.source` under `filename`.
    pub fn format_diagnostics(&self, filename: &str) -> String {
        render_all(&self.diagnostics, filename, &self.source)
    }
}

/// A grammar compiled once (lexed, parsed, validated, rule ids assigned) and
/// ready to drive any number of independent parses. Cheaply shareable: clone
/// or wrap in an `Arc` to reuse across threads, since each `parse*` call owns
/// its own cursor, packrat cache, and capture stack (§5).
pub struct Peggy {
    compiled: CompiledGrammar,
    actions: ActionTable,
}

impl Peggy {
    /// Lex, parse, and validate `source` into a [`Peggy`] instance with no
    /// rule actions attached. Fails on the grammar's own size cap, a lexer
    /// error, a parse error, or an unresolved rule reference (§4.A–§4.C).
    pub fn compile(source: &str) -> Result<Self> {
        Self::compile_with_actions(source, ActionTable::new())
    }

    /// As [`Peggy::compile`], attaching the external action callbacks named
    /// in `actions` (rule name → [`Action`]). The engine never inspects an
    /// action's body, only invokes it per §6.
    pub fn compile_with_actions(source: &str, actions: ActionTable) -> Result<Self> {
        let handler = Handler::new(100);
        let grammar = parse_grammar(source, &handler)?;
        let grammar = validate(grammar, &handler)?;
        if handler.has_errors() {
            let diagnostics = handler.into_diagnostics();
            let first = diagnostics.into_iter().find(|d| d.severity == Severity::Error).expect("has_errors just checked");
            return Err(ParseError::SemanticError { location: first.span.start, reason: first.message });
        }
        let compiled = CompiledGrammar::compile(grammar);
        tracing::debug!(rule_count = compiled.rule_count(), action_count = actions.len(), "grammar compiled");
        Ok(Self { compiled, actions })
    }

    /// Attach (or replace) a single rule's action after compilation.
    pub fn with_action(mut self, rule_name: impl Into<String>, action: impl Action + 'static) -> Self {
        self.actions.insert(rule_name.into(), Arc::new(action));
        self
    }

    /// `parse(input) → value` (§4.G): runs actions and returns the start
    /// rule's semantic value, failing on the first error regardless of
    /// configured recovery strategy (an action-driven caller wants a value
    /// or a reason, never a partial tree).
    pub fn parse(&self, input: &str) -> Result<Option<Value>> {
        self.parse_with_config(input, Config::default().with_recovery(RecoveryStrategy::None))
    }

    pub fn parse_with_config(&self, input: &str, config: Config) -> Result<Option<Value>> {
        let outcome = peggy_engine::run(input, &self.compiled, &self.actions, config.to_engine_config());
        match outcome.fatal {
            Some(err) => Err(err),
            None => Ok(outcome.value),
        }
    }

    /// `parseCst(input) → CstNode` (§4.G): builds a lossless CST, failing on
    /// the first error unless recovery is enabled in `config`.
    pub fn parse_cst(&self, input: &str) -> Result<CstNode> {
        self.parse_cst_with_config(input, Config::default())
    }

    pub fn parse_cst_with_config(&self, input: &str, config: Config) -> Result<CstNode> {
        let outcome = peggy_engine::run(input, &self.compiled, &self.actions, config.to_engine_config());
        match (outcome.cst, outcome.fatal) {
            (Some(cst), _) => Ok(cst),
            (None, Some(err)) => Err(err),
            (None, None) => unreachable!("engine returns either a tree or a fatal error"),
        }
    }

    /// `parseCstWithDiagnostics(input) → {node?, diagnostics[], source}`
    /// (§4.G): always returns, never propagates a `Result::Err`.
    pub fn parse_cst_with_diagnostics(&self, input: &str, config: Config) -> ParseResultWithDiagnostics {
        let config = config.with_recovery(match config.recovery_strategy {
            RecoveryStrategy::None => RecoveryStrategy::Basic,
            other => other,
        });
        let outcome = peggy_engine::run(input, &self.compiled, &self.actions, config.to_engine_config());
        let mut diagnostics = outcome.diagnostics;
        if let Some(fatal) = &outcome.fatal {
            if diagnostics.iter().all(|d| d.message != fatal.user_message()) {
                diagnostics.push(Diagnostic::error(peggy_span::Span::empty(fatal.location()), fatal.user_message()));
            }
        }
        ParseResultWithDiagnostics { node: outcome.cst, diagnostics, source: input.to_string() }
    }

    /// As [`Peggy::parse_cst_with_diagnostics`], but also builds the
    /// trivia-stripped AST and runs actions.
    pub fn parse_ast_with_diagnostics(&self, input: &str, config: Config) -> (Option<AstNode>, Vec<Diagnostic>) {
        let config = config.with_recovery(match config.recovery_strategy {
            RecoveryStrategy::None => RecoveryStrategy::Basic,
            other => other,
        });
        let outcome = peggy_engine::run(input, &self.compiled, &self.actions, config.to_engine_config());
        (outcome.ast, outcome.diagnostics)
    }

    pub fn rule_count(&self) -> usize {
        self.compiled.rule_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_parses_a_token_rule_with_trivia() {
        let peggy = Peggy::compile("Number <- < [0-9]+ >\n%whitespace <- [ ]*").unwrap();
        let cst = peggy.parse_cst("  42  ").unwrap();
        match &cst {
            CstNode::Token { text, leading_trivia, trailing_trivia, .. } => {
                assert_eq!(text, "42");
                assert_eq!(leading_trivia.len(), 1);
                assert_eq!(trailing_trivia.len(), 1);
            }
            other => panic!("expected a Token node, got {other:?}"),
        }
    }

    #[test]
    fn undefined_rule_reference_is_a_semantic_error_and_never_invokes_the_engine() {
        let err = Peggy::compile("A <- Foo").unwrap_err();
        match err {
            ParseError::SemanticError { reason, .. } => assert!(reason.contains("Foo")),
            other => panic!("expected SemanticError, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_input_without_recovery_is_unexpected_input() {
        let peggy = Peggy::compile("S <- 'a'").unwrap();
        let err = peggy.parse_cst("b").unwrap_err();
        match err {
            ParseError::UnexpectedInput { found, expected, .. } => {
                assert_eq!(found, "'b'");
                assert_eq!(expected, "'a'");
            }
            other => panic!("expected UnexpectedInput, got {other:?}"),
        }
    }

    #[test]
    fn advanced_recovery_yields_a_partial_tree_with_diagnostics() {
        let peggy = Peggy::compile("List <- Item (',' Item)*\nItem <- < [a-z]+ >\n%whitespace <- [ ]*").unwrap();
        let result = peggy.parse_cst_with_diagnostics(
            "abc, 123, def",
            Config::default().with_recovery(RecoveryStrategy::Advanced),
        );
        assert!(result.has_node());
        assert!(result.has_errors());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn action_values_flow_through_parse() {
        struct ToInt;
        impl Action for ToInt {
            fn apply(&self, values: &SemanticValues) -> std::result::Result<Value, String> {
                values.to_int().map(Value::Int).ok_or_else(|| "not an integer".to_string())
            }
        }
        let peggy = Peggy::compile("Number <- < [0-9]+ >").unwrap().with_action("Number", ToInt);
        let value = peggy.parse("42").unwrap();
        assert_eq!(value, Some(Value::Int(42)));
    }

    /// §8 invariant 2 (round-trip): terminal/token text plus trivia, in
    /// document order, reconstitutes the input exactly.
    #[test]
    fn cst_round_trips_the_input_through_trivia() {
        let peggy =
            Peggy::compile("List <- Item (',' Item)*\nItem <- < [a-z]+ >\n%whitespace <- [ \\t]*").unwrap();
        let input = "  abc, def ,ghi  ";
        let cst = peggy.parse_cst(input).unwrap();
        assert_eq!(cst.reconstitute(), input);
    }

    /// §8 invariant 3 (packrat equivalence): enabling/disabling packrat must
    /// not change the resulting tree, only whether the cache is consulted.
    #[test]
    fn packrat_enabled_or_disabled_yields_the_same_tree() {
        let peggy = Peggy::compile("Expr <- Term ('+' Term)*\nTerm <- < [0-9]+ >\n%whitespace <- [ ]*").unwrap();
        let input = "1 + 2 + 3";
        let with_cache = peggy.parse_cst_with_config(input, Config::default().with_packrat(true)).unwrap();
        let without_cache = peggy.parse_cst_with_config(input, Config::default().with_packrat(false)).unwrap();
        assert_eq!(with_cache, without_cache);
    }

    /// §8 invariant 4 (ordered choice): once the first alternative matches,
    /// later alternatives are never attempted at that offset.
    #[test]
    fn ordered_choice_prefers_the_first_matching_alternative() {
        let peggy = Peggy::compile("A <- 'foo' / 'foobar'").unwrap();
        let cst = peggy.parse_cst("foo").unwrap();
        assert_eq!(cst.span().len(), 3);
    }

    /// §8 invariant 5 (no-progress termination): a repetition whose body can
    /// match the empty string still terminates instead of looping forever.
    #[test]
    fn zero_or_more_over_an_optional_body_terminates_on_empty_match() {
        let peggy = Peggy::compile("A <- ('x'?)*").unwrap();
        let cst = peggy.parse_cst("xx").unwrap();
        assert_eq!(cst.span().len(), 2);
    }

    /// §8 invariant 7 (cascade bound): once the number of synthesised Error
    /// nodes reaches the configured limit, recovery stops absorbing failures
    /// and the parse ends in a hard failure instead of cycling forever.
    #[test]
    fn cascade_bound_caps_the_number_of_error_nodes() {
        let peggy = Peggy::compile("List <- Item (',' Item)*\nItem <- < [a-z]+ >\n%whitespace <- [ ]*").unwrap();
        let mut config = Config::default().with_recovery(RecoveryStrategy::Advanced);
        config.cascade_limit = 2;
        let bad_input = "@, @, @, @, @, @";
        let result = peggy.parse_cst_with_diagnostics(bad_input, config);
        assert!(result.diagnostics.iter().filter(|d| d.severity == Severity::Error).count() <= 2);
    }

    /// Scenario 2 (§8): a left-recursion-free arithmetic grammar whose
    /// actions fold to a single integer, honouring `*` binding tighter than
    /// `+`/`-` through the grammar's own rule layering rather than the
    /// engine special-casing precedence. `AddOp`/`MulOp` are their own
    /// `Reference`d, `TokenBoundary` rules (rather than bare literals
    /// inline) so their matched text flows into `child_values` at all —
    /// only `Reference`/`TokenBoundary` children contribute a semantic
    /// value (see `RuleFrame` in `peggy-engine`).
    #[test]
    fn calculator_actions_respect_operator_precedence() {
        struct Fold(fn(i64, &str, i64) -> i64);
        impl Action for Fold {
            fn apply(&self, values: &SemanticValues) -> std::result::Result<Value, String> {
                let mut acc = values.get(1).and_then(Value::as_int).ok_or("missing first term")?;
                let mut i = 2;
                while let (Some(op), Some(rhs)) = (values.get(i), values.get(i + 1).and_then(Value::as_int)) {
                    let op = match op {
                        Value::Str(s) => s.clone(),
                        _ => return Err("expected operator token".to_string()),
                    };
                    acc = (self.0)(acc, &op, rhs);
                    i += 2;
                }
                Ok(Value::Int(acc))
            }
        }

        let source = r#"
Expr <- Term (AddOp Term)*
Term <- Factor (MulOp Factor)*
Factor <- Number
Number <- < [0-9]+ >
AddOp <- < [+\-] >
MulOp <- < [*/] >
%whitespace <- [ ]*
"#;
        let fold_add_sub: fn(i64, &str, i64) -> i64 =
            |acc, op, rhs| if op == "+" { acc + rhs } else { acc - rhs };
        let fold_mul_div: fn(i64, &str, i64) -> i64 =
            |acc, op, rhs| if op == "*" { acc * rhs } else { acc / rhs };

        struct ToInt;
        impl Action for ToInt {
            fn apply(&self, values: &SemanticValues) -> std::result::Result<Value, String> {
                values.to_int().map(Value::Int).ok_or_else(|| "not an integer".to_string())
            }
        }
        struct FirstChild;
        impl Action for FirstChild {
            fn apply(&self, values: &SemanticValues) -> std::result::Result<Value, String> {
                values.get(1).cloned().ok_or_else(|| "missing child".to_string())
            }
        }

        let peggy = Peggy::compile(source)
            .unwrap()
            .with_action("Number", ToInt)
            .with_action("Factor", FirstChild)
            .with_action("Term", Fold(fold_mul_div))
            .with_action("Expr", Fold(fold_add_sub));

        let value = peggy.parse("3 + 5 * 2").unwrap();
        assert_eq!(value, Some(Value::Int(13)));
    }

    /// §8 invariant 1 (determinism): two successive parses of the same input
    /// with the same grammar and configuration yield structurally equal
    /// trees and identical diagnostics.
    #[test]
    fn two_successive_parses_yield_equal_trees_and_diagnostics() {
        let peggy = Peggy::compile("List <- Item (',' Item)*\nItem <- < [a-z]+ >\n%whitespace <- [ ]*").unwrap();
        let input = "abc, 123, def";
        let config = Config::default().with_recovery(RecoveryStrategy::Advanced);
        let first = peggy.parse_cst_with_diagnostics(input, config);
        let second = peggy.parse_cst_with_diagnostics(input, config);
        assert_eq!(first.node, second.node);
        assert_eq!(first.diagnostics.len(), second.diagnostics.len());
        for (a, b) in first.diagnostics.iter().zip(second.diagnostics.iter()) {
            assert_eq!(a.message, b.message);
            assert_eq!(a.span, b.span);
        }
    }

    /// §8 invariant 6 (recovery monotonicity): ADVANCED recovery never
    /// produces fewer non-error CST nodes than BASIC on the same input, and
    /// BASIC emits at least one diagnostic where it fails outright.
    #[test]
    fn advanced_recovery_never_yields_fewer_nodes_than_basic() {
        let peggy = Peggy::compile("List <- Item (',' Item)*\nItem <- < [a-z]+ >\n%whitespace <- [ ]*").unwrap();
        let input = "abc, 123, def";
        let basic = peggy.parse_cst_with_diagnostics(input, Config::default().with_recovery(RecoveryStrategy::Basic));
        let advanced =
            peggy.parse_cst_with_diagnostics(input, Config::default().with_recovery(RecoveryStrategy::Advanced));

        assert!(!basic.has_node());
        assert!(basic.has_errors());

        assert!(advanced.has_node());
        let advanced_tree = advanced.node.as_ref().unwrap();
        assert!(advanced_tree.error_count() >= 1);
        assert!(advanced_tree.reconstitute().contains("abc"));
    }
}
