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

use peggy_diagnostics::{Diagnostic, Handler, ParseError};
use peggy_span::{Location, Span};
use peggy_tree::{ActionTable, AstNode, CstNode, Expression, SemanticValues, Trivia, Value, ERROR_RULE_NAME};

use crate::cache::{CacheEntry, PackratCache};
use crate::captures::CaptureStack;
use crate::charclass::CompiledCharClass;
use crate::compiled::{is_token_boundary_at_top, CompiledGrammar};
use crate::config::{EngineConfig, RecoveryStrategy};
use crate::dictionary::Trie;
use crate::recovery::recover_span;

/// The result of running the engine once over a complete input: whatever
/// tree could be built, plus every diagnostic collected along the way and
/// the fatal error that stopped the parse outright, if any.
pub struct EngineOutcome {
    pub cst: Option<CstNode>,
    pub ast: Option<AstNode>,
    pub value: Option<Value>,
    pub diagnostics: Vec<Diagnostic>,
    pub fatal: Option<ParseError>,
}

/// What a single rule invocation produced, passed back up to whichever
/// expression (usually a `Reference`) invoked it.
#[derive(Clone)]
struct RuleResult {
    cst: CstNode,
    ast: AstNode,
}

/// Accumulates the pieces a rule's own body contributes as it is matched:
/// the CST fragments in document order (every fragment tiles its slice of
/// the input, including trivia, so concatenating them reconstitutes the
/// rule's whole span), the parallel AST children (only `Reference`/
/// `TokenBoundary` contribute one, skipping anything under `Ignore`), the
/// `SemanticValues.child_values` list, and which `Choice` alternative (if
/// any) was last taken directly inside this rule's body.
struct RuleFrame {
    rule_id: u16,
    rule_name: String,
    cst_children: Vec<CstNode>,
    ast_children: Vec<AstNode>,
    child_values: Vec<Value>,
    chosen_alt: Option<usize>,
}

impl RuleFrame {
    fn new(rule_id: u16, rule_name: String) -> Self {
        Self { rule_id, rule_name, cst_children: Vec::new(), ast_children: Vec::new(), child_values: Vec::new(), chosen_alt: None }
    }

    /// A frame for content that will never be attached to a real tree: the
    /// interior of a `TokenBoundary` (collapsed to flat text) and anything
    /// under `Ignore` (dropped outright).
    fn scratch() -> Self {
        Self::new(u16::MAX, String::new())
    }
}

pub fn run(input: &str, compiled: &CompiledGrammar, actions: &ActionTable, config: EngineConfig) -> EngineOutcome {
    let handler = Handler::new(config.cascade_limit);
    let mut engine = Engine::new(input, compiled, actions, config, &handler);

    let Some(rule) = compiled.start_rule() else {
        return EngineOutcome {
            cst: None,
            ast: None,
            value: None,
            diagnostics: handler.into_diagnostics(),
            fatal: Some(ParseError::SemanticError { location: Location::start(), reason: "grammar has no rules".into() }),
        };
    };
    let start_id = compiled.rule_id(&rule.name).expect("start rule is a compiled rule");

    match engine.eval_rule(start_id) {
        Some(result) => engine.finish(result),
        None => {
            let fatal = engine.farthest_error();
            if let RecoveryStrategy::Basic = config.recovery {
                handler.emit(Diagnostic::error(Span::empty(fatal.location()), fatal.user_message()));
            }
            EngineOutcome { cst: None, ast: None, value: None, diagnostics: handler.into_diagnostics(), fatal: Some(fatal) }
        }
    }
}

struct Engine<'a> {
    input: &'a str,
    compiled: &'a CompiledGrammar,
    actions: &'a ActionTable,
    config: EngineConfig,
    handler: &'a Handler,
    cursor: Tracker,
    captures: CaptureStack,
    cache: PackratCache,
    in_token: bool,
    choice_commit_stack: Vec<bool>,
    farthest_offset: usize,
    farthest_expected: Vec<String>,
    farthest_eof: bool,
    fatal: Option<ParseError>,
}

/// A minimal line/column cursor, matching the incremental-tracking style
/// `peggy-span::LineColTracker` exists for, but owned here so it can be
/// rewound mid-scan when trailing trivia is split at a newline.
#[derive(Clone)]
struct Tracker {
    line: u32,
    column: u32,
    offset: usize,
}

impl Tracker {
    fn new() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.column, self.offset)
    }

    fn advance(&mut self, ch: char) {
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn advance_str(&mut self, text: &str) {
        for ch in text.chars() {
            self.advance(ch);
        }
    }

    fn at(input: &str, offset: usize) -> Self {
        let mut tracker = Self::new();
        tracker.advance_str(&input[..offset]);
        tracker
    }
}

impl<'a> Engine<'a> {
    fn new(input: &'a str, compiled: &'a CompiledGrammar, actions: &'a ActionTable, config: EngineConfig, handler: &'a Handler) -> Self {
        Self {
            input,
            compiled,
            actions,
            config,
            handler,
            cursor: Tracker::new(),
            captures: CaptureStack::new(),
            cache: PackratCache::new(),
            in_token: false,
            choice_commit_stack: Vec::new(),
            farthest_offset: 0,
            farthest_expected: Vec::new(),
            farthest_eof: false,
            fatal: None,
        }
    }

    fn offset(&self) -> usize {
        self.cursor.offset
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.offset()..]
    }

    fn record_failure(&mut self, offset: usize, expected: String, eof: bool) {
        if offset > self.farthest_offset {
            self.farthest_offset = offset;
            self.farthest_expected = vec![expected];
            self.farthest_eof = eof;
        } else if offset == self.farthest_offset {
            if !self.farthest_expected.contains(&expected) {
                self.farthest_expected.push(expected);
            }
            self.farthest_eof = self.farthest_eof || eof;
        }
    }

    fn farthest_error(&self) -> ParseError {
        let location = Tracker::at(self.input, self.farthest_offset).location();
        let expected = if self.farthest_expected.is_empty() {
            "more input".to_string()
        } else {
            self.farthest_expected.join(" or ")
        };
        if self.farthest_eof || self.farthest_offset >= self.input.len() {
            ParseError::UnexpectedEof { location, expected }
        } else {
            let found = describe_found(self.input, self.farthest_offset);
            ParseError::UnexpectedInput { location, found, expected }
        }
    }

    fn finish(&mut self, result: RuleResult) -> EngineOutcome {
        if self.offset() >= self.input.len() {
            let value = result.ast.value().cloned();
            return EngineOutcome {
                cst: Some(result.cst),
                ast: Some(result.ast),
                value,
                diagnostics: self.handler.diagnostics(),
                fatal: self.fatal.clone(),
            };
        }

        // Trailing input remains: the start rule matched a prefix only.
        let start = self.offset();
        let loc = self.cursor.location();
        let found = describe_found(self.input, start);
        let trailing = ParseError::UnexpectedInput { location: loc, found, expected: "end of input".into() };

        match self.config.recovery {
            RecoveryStrategy::Advanced if self.handler.cascade_exceeded() => {
                EngineOutcome { cst: None, ast: None, value: None, diagnostics: self.handler.diagnostics(), fatal: Some(trailing) }
            }
            RecoveryStrategy::Advanced => {
                let skipped = recover_span(self.input, start);
                self.handler.emit(
                    Diagnostic::error(Span::new(loc, Tracker::at(self.input, skipped.end).location()), trailing.user_message())
                        .with_help("the matched grammar did not account for the remaining input"),
                );
                let error_node = CstNode::Error {
                    span: Span::new(loc, Tracker::at(self.input, skipped.end).location()),
                    skipped_text: skipped.text(self.input).to_string(),
                    expected: "end of input".into(),
                    leading_trivia: Vec::new(),
                    trailing_trivia: Vec::new(),
                };
                let error_ast = AstNode::Terminal {
                    span: error_node.span(),
                    rule: ERROR_RULE_NAME.to_string(),
                    text: skipped.text(self.input).to_string(),
                    value: None,
                };
                let cst = wrap_with_trailing_error(result.cst, error_node);
                let ast = wrap_ast_with_trailing_error(result.ast, error_ast);
                let value = ast.value().cloned();
                EngineOutcome { cst: Some(cst), ast: Some(ast), value, diagnostics: self.handler.diagnostics(), fatal: None }
            }
            RecoveryStrategy::Basic => {
                self.handler.emit(Diagnostic::error(loc, trailing.user_message()));
                EngineOutcome { cst: None, ast: None, value: None, diagnostics: self.handler.diagnostics(), fatal: Some(trailing) }
            }
            RecoveryStrategy::None => {
                EngineOutcome { cst: None, ast: None, value: None, diagnostics: self.handler.diagnostics(), fatal: Some(trailing) }
            }
        }
    }

    /// Evaluate the named rule at the current cursor, producing its own
    /// fully finalized `CstNode`/`AstNode` pair. Handles packrat lookups,
    /// action invocation, and (in `Advanced` recovery) panic-mode recovery
    /// for a rule whose whole body fails to match.
    fn eval_rule(&mut self, rule_id: u16) -> Option<RuleResult> {
        let start = self.offset();
        let cacheable = self.config.packrat_enabled && !self.compiled.touches_captures(rule_id);
        if cacheable {
            match self.cache.get(rule_id, start) {
                Some(CacheEntry::Success { end_offset, cst, ast }) => {
                    let (cst, ast) = (cst.clone(), ast.clone());
                    self.cursor = Tracker::at(self.input, *end_offset);
                    return Some(RuleResult { cst, ast });
                }
                Some(CacheEntry::Failure) => return None,
                None => {}
            }
        }

        let rule = self.compiled.rule_by_id(rule_id).expect("rule_id came from this CompiledGrammar");
        let rule_name = rule.name.clone();
        let expr = rule.expression.clone();
        let action_name = rule_name.clone();
        let error_message = rule.error_message.clone();

        let mut frame = RuleFrame::new(rule_id, rule_name.clone());
        let matched = self.eval_expr(&expr, &mut frame, false);

        if !matched {
            self.cursor = Tracker::at(self.input, start);
            if cacheable {
                self.cache.insert(rule_id, start, CacheEntry::Failure);
            }
            return self.recover_rule(rule_id, &rule_name, &expr, error_message, start);
        }

        let end = self.offset();
        // The body's own leaf-level evaluators (`emit_leaf`/`eval_token_boundary`) may
        // already have consumed and recorded this rule's trailing trivia while matching
        // its last child; `self.cursor` has moved past that trivia by now, so deriving
        // this rule's own span from the cursor would silently swallow it into the
        // matched content. Anchor the end of the span to the last child's own
        // (trivia-exclusive) span end instead, falling back to the cursor only when the
        // body produced no children at all (e.g. a zero-width match).
        let content_end = frame.cst_children.last().map(|c| c.span().end).unwrap_or_else(|| self.cursor.location());
        let leaf_leading = frame.cst_children.first().map(|c| c.leading_trivia().to_vec()).unwrap_or_default();
        let leaf_trailing = frame.cst_children.last().map(|c| c.trailing_trivia().to_vec()).unwrap_or_default();
        let span = Span::new(Tracker::at(self.input, start).location(), content_end);
        let matched_text = span.extract(self.input).to_string();

        let values = SemanticValues {
            matched_text,
            span,
            child_values: frame.child_values.clone(),
            chosen_alternative_index: frame.chosen_alt,
        };
        let value = self.invoke_action(&action_name, span, &values);

        let is_token = is_token_boundary_at_top(&expr);
        let cst = if is_token {
            frame.cst_children.into_iter().next().unwrap_or_else(|| CstNode::Token {
                span,
                rule: rule_name.clone(),
                text: values.matched_text.clone(),
                leading_trivia: Vec::new(),
                trailing_trivia: Vec::new(),
            })
        } else if self.compiled.is_compound(rule_id) {
            CstNode::NonTerminal { span, rule: rule_name.clone(), children: frame.cst_children, leading_trivia: Vec::new(), trailing_trivia: Vec::new() }
        } else {
            CstNode::Terminal { span, rule: rule_name.clone(), text: values.matched_text.clone(), leading_trivia: leaf_leading, trailing_trivia: leaf_trailing }
        };

        let ast = if is_token {
            AstNode::Terminal { span, rule: rule_name.clone(), text: values.matched_text.clone(), value: value.clone() }
        } else if self.compiled.is_compound(rule_id) {
            AstNode::NonTerminal { span, rule: rule_name.clone(), children: frame.ast_children, value: value.clone() }
        } else {
            AstNode::Terminal { span, rule: rule_name.clone(), text: values.matched_text.clone(), value: value.clone() }
        };

        let result = RuleResult { cst, ast };
        if cacheable {
            self.cache.insert(rule_id, start, CacheEntry::Success { end_offset: end, cst: result.cst.clone(), ast: result.ast.clone() });
        }
        Some(result)
    }

    /// Applied only in `Advanced` recovery: a rule's body has just failed to
    /// match at all. Skip to a synchronisation point and return a
    /// successful `CstNode::Error`/`AstNode::Terminal` pair so the caller
    /// (`Sequence`/`Choice`/a parent `Reference`) needs no special
    /// awareness of recovery having happened.
    fn recover_rule(
        &mut self,
        rule_id: u16,
        rule_name: &str,
        expr: &Expression,
        error_message: Option<String>,
        start: usize,
    ) -> Option<RuleResult> {
        let _ = rule_id;
        if self.config.recovery != RecoveryStrategy::Advanced || self.handler.cascade_exceeded() {
            return None;
        }

        let leading = self.take_leading_trivia();
        let from = self.offset();
        let skipped = recover_span(self.input, from);
        let expected = error_message.unwrap_or_else(|| expr.describe());
        let start_loc = Tracker::at(self.input, from).location();
        let end_loc = Tracker::at(self.input, skipped.end).location();
        self.handler.emit(
            Diagnostic::error(Span::new(start_loc, end_loc), format!("failed to parse {rule_name}: expected {expected}"))
                .with_help(format!("skipped input up to the next `{}`", self.sync_preview(skipped.end))),
        );
        self.cursor = Tracker::at(self.input, skipped.end);
        let trailing = self.take_trailing_trivia();

        let span = Span::new(start_loc, end_loc);
        let cst = CstNode::Error {
            span,
            skipped_text: skipped.text(self.input).to_string(),
            expected,
            leading_trivia: leading,
            trailing_trivia: trailing,
        };
        let ast = AstNode::Terminal { span, rule: ERROR_RULE_NAME.to_string(), text: skipped.text(self.input).to_string(), value: None };
        Some(RuleResult { cst, ast })
    }

    fn sync_preview(&self, at: usize) -> String {
        self.input[at..].chars().next().map(|c| c.to_string()).unwrap_or_else(|| "end of input".to_string())
    }

    fn invoke_action(&mut self, rule_name: &str, span: Span, values: &SemanticValues) -> Option<Value> {
        let action = self.actions.get(rule_name)?;
        match action.apply(values) {
            Ok(value) => Some(value),
            Err(cause) => {
                let error = ParseError::ActionError { location: span.start, action: rule_name.to_string(), cause: cause.clone() };
                self.handler.emit(Diagnostic::error(span, format!("action `{rule_name}` failed: {cause}")));
                if self.fatal.is_none() && self.config.recovery == RecoveryStrategy::None {
                    self.fatal = Some(error);
                }
                None
            }
        }
    }

    /// Evaluate one expression against the current cursor. On success,
    /// mutates `self.cursor`/`self.captures` and (for the primitives that
    /// are leaf emissions) appends to `frame`; on failure, leaves all of
    /// those exactly as they were on entry.
    fn eval_expr(&mut self, expr: &Expression, frame: &mut RuleFrame, predicate: bool) -> bool {
        match expr {
            Expression::Literal { text, case_insensitive, .. } => self.eval_literal(text, *case_insensitive, frame, predicate),
            Expression::CharClass { pattern, negated, case_insensitive, .. } => {
                self.eval_charclass(pattern, *negated, *case_insensitive, frame, predicate)
            }
            Expression::Any { .. } => self.eval_any(frame, predicate),
            Expression::Dictionary { words, case_insensitive, .. } => self.eval_dictionary(words, *case_insensitive, frame, predicate),
            Expression::BackReference { name, .. } => self.eval_backreference(name, frame, predicate),
            Expression::Cut { .. } => {
                if let Some(top) = self.choice_commit_stack.last_mut() {
                    *top = true;
                }
                true
            }
            Expression::Reference { rule_name, .. } => self.eval_reference(rule_name, frame, predicate),

            Expression::Sequence { elements, .. } => self.eval_sequence(elements, frame, predicate),
            Expression::Choice { alternatives, .. } => self.eval_choice(alternatives, frame, predicate),
            Expression::Group { expression, .. } => self.eval_expr(expression, frame, predicate),

            Expression::ZeroOrMore { expression, .. } => {
                self.eval_repetition(expression, 0, None, frame, predicate);
                true
            }
            Expression::OneOrMore { expression, .. } => self.eval_repetition(expression, 1, None, frame, predicate),
            Expression::Optional { expression, .. } => {
                self.eval_expr(expression, frame, predicate);
                true
            }
            Expression::Repetition { expression, min, max, .. } => self.eval_repetition(expression, *min, *max, frame, predicate),

            Expression::And { expression, .. } => self.eval_predicate(expression, false, frame),
            Expression::Not { expression, .. } => self.eval_predicate(expression, true, frame),

            Expression::TokenBoundary { expression, .. } => self.eval_token_boundary(expression, frame, predicate),
            Expression::Ignore { expression, .. } => {
                let mut scratch = RuleFrame::scratch();
                self.eval_expr(expression, &mut scratch, predicate)
            }
            Expression::Capture { name, expression, .. } => self.eval_capture(name, expression, frame, predicate),
            Expression::CaptureScope { expression, .. } => {
                self.captures.push_frame();
                let matched = self.eval_expr(expression, frame, predicate);
                self.captures.pop_frame();
                matched
            }
        }
    }

    fn eval_literal(&mut self, text: &str, case_insensitive: bool, frame: &mut RuleFrame, predicate: bool) -> bool {
        let snapshot = self.cursor.clone();
        let leading = self.take_leading_trivia();
        let content_start = self.offset();
        let remaining = self.remaining();
        let matches_at = remaining.get(..text.len()).map(|candidate| {
            if case_insensitive { candidate.eq_ignore_ascii_case(text) } else { candidate == text }
        });

        if matches_at != Some(true) {
            self.cursor = snapshot;
            self.record_failure(content_start, format!("'{text}'"), remaining.is_empty());
            return false;
        }

        self.cursor.advance_str(&remaining[..text.len()]);

        if is_word_like(text) && self.word_rejects_boundary() {
            self.cursor = snapshot;
            self.record_failure(content_start, format!("'{text}'"), false);
            return false;
        }

        if !predicate {
            self.emit_leaf(frame, leading, content_start);
        }
        true
    }

    fn eval_charclass(&mut self, pattern: &str, negated: bool, case_insensitive: bool, frame: &mut RuleFrame, predicate: bool) -> bool {
        let compiled = CompiledCharClass::compile(pattern, negated, case_insensitive);
        let snapshot = self.cursor.clone();
        let leading = self.take_leading_trivia();
        let content_start = self.offset();
        match self.remaining().chars().next() {
            Some(c) if compiled.matches(c) => {
                self.cursor.advance(c);
                if !predicate {
                    self.emit_leaf(frame, leading, content_start);
                }
                true
            }
            other => {
                self.cursor = snapshot;
                self.record_failure(content_start, format!("[{pattern}]"), other.is_none());
                false
            }
        }
    }

    fn eval_any(&mut self, frame: &mut RuleFrame, predicate: bool) -> bool {
        let snapshot = self.cursor.clone();
        let leading = self.take_leading_trivia();
        let content_start = self.offset();
        match self.remaining().chars().next() {
            Some(c) => {
                self.cursor.advance(c);
                if !predicate {
                    self.emit_leaf(frame, leading, content_start);
                }
                true
            }
            None => {
                self.cursor = snapshot;
                self.record_failure(content_start, "any character".into(), true);
                false
            }
        }
    }

    fn eval_dictionary(&mut self, words: &[String], case_insensitive: bool, frame: &mut RuleFrame, predicate: bool) -> bool {
        let trie = Trie::build(words, case_insensitive);
        let snapshot = self.cursor.clone();
        let leading = self.take_leading_trivia();
        let content_start = self.offset();
        match trie.longest_match(self.remaining()) {
            Some(len) => {
                let text = self.remaining()[..len].to_string();
                self.cursor.advance_str(&text);
                if !predicate {
                    self.emit_leaf(frame, leading, content_start);
                }
                true
            }
            None => {
                self.cursor = snapshot;
                self.record_failure(content_start, "dictionary entry".into(), self.remaining().is_empty());
                false
            }
        }
    }

    fn eval_backreference(&mut self, name: &str, frame: &mut RuleFrame, predicate: bool) -> bool {
        let Some(captured) = self.captures.get(name).map(str::to_string) else {
            self.record_failure(self.offset(), format!("back-reference to ${name}"), false);
            return false;
        };
        let snapshot = self.cursor.clone();
        let leading = self.take_leading_trivia();
        let content_start = self.offset();
        let remaining = self.remaining();
        if remaining.get(..captured.len()) == Some(captured.as_str()) {
            self.cursor.advance_str(&captured);
            if !predicate {
                self.emit_leaf(frame, leading, content_start);
            }
            true
        } else {
            self.cursor = snapshot;
            self.record_failure(content_start, format!("back-reference to ${name}"), remaining.is_empty());
            false
        }
    }

    fn eval_reference(&mut self, rule_name: &str, frame: &mut RuleFrame, predicate: bool) -> bool {
        let Some(rule_id) = self.compiled.rule_id(rule_name) else {
            self.record_failure(self.offset(), rule_name.to_string(), false);
            return false;
        };
        let snapshot = self.cursor.clone();
        let leading = self.take_leading_trivia();
        match self.eval_rule(rule_id) {
            Some(result) => {
                let trailing = self.take_trailing_trivia();
                if !predicate {
                    let child_text = match &result.ast {
                        AstNode::Terminal { text, .. } => text.clone(),
                        AstNode::NonTerminal { .. } => String::new(),
                    };
                    let value = result.ast.value().cloned().unwrap_or(Value::Str(child_text));
                    frame.ast_children.push(result.ast);
                    frame.child_values.push(value);
                    frame.cst_children.push(attach_trivia(result.cst, leading, trailing));
                }
                true
            }
            None => {
                self.cursor = snapshot;
                false
            }
        }
    }

    fn eval_sequence(&mut self, elements: &[Expression], frame: &mut RuleFrame, predicate: bool) -> bool {
        let snapshot = self.cursor.clone();
        let captures_snapshot = self.captures.snapshot();
        let cst_len = frame.cst_children.len();
        let ast_len = frame.ast_children.len();
        let values_len = frame.child_values.len();

        for element in elements {
            if !self.eval_expr(element, frame, predicate) {
                self.cursor = snapshot;
                self.captures.restore(captures_snapshot);
                frame.cst_children.truncate(cst_len);
                frame.ast_children.truncate(ast_len);
                frame.child_values.truncate(values_len);
                return false;
            }
        }
        true
    }

    fn eval_choice(&mut self, alternatives: &[Expression], frame: &mut RuleFrame, predicate: bool) -> bool {
        let snapshot = self.cursor.clone();
        let captures_snapshot = self.captures.snapshot();
        let cst_len = frame.cst_children.len();
        let ast_len = frame.ast_children.len();
        let values_len = frame.child_values.len();

        self.choice_commit_stack.push(false);
        let mut matched_index = None;
        for (index, alternative) in alternatives.iter().enumerate() {
            self.cursor = snapshot.clone();
            self.captures.restore(captures_snapshot.clone());
            frame.cst_children.truncate(cst_len);
            frame.ast_children.truncate(ast_len);
            frame.child_values.truncate(values_len);

            if self.eval_expr(alternative, frame, predicate) {
                matched_index = Some(index);
                break;
            }
            if *self.choice_commit_stack.last().expect("just pushed") {
                break;
            }
        }
        self.choice_commit_stack.pop();

        match matched_index {
            Some(index) => {
                if !predicate {
                    frame.chosen_alt = Some(index);
                }
                true
            }
            None => {
                self.cursor = snapshot;
                self.captures.restore(captures_snapshot);
                frame.cst_children.truncate(cst_len);
                frame.ast_children.truncate(ast_len);
                frame.child_values.truncate(values_len);
                false
            }
        }
    }

    fn eval_repetition(&mut self, inner: &Expression, min: u32, max: Option<u32>, frame: &mut RuleFrame, predicate: bool) -> bool {
        let snapshot = self.cursor.clone();
        let captures_snapshot = self.captures.snapshot();
        let cst_len = frame.cst_children.len();
        let ast_len = frame.ast_children.len();
        let values_len = frame.child_values.len();

        let mut count = 0u32;
        loop {
            if let Some(max) = max {
                if count >= max {
                    break;
                }
            }
            let before = self.offset();
            if !self.eval_expr(inner, frame, predicate) {
                break;
            }
            count += 1;
            if self.offset() == before {
                // Zero-width match: counted once, stop to avoid looping forever.
                break;
            }
        }

        if count < min {
            self.cursor = snapshot;
            self.captures.restore(captures_snapshot);
            frame.cst_children.truncate(cst_len);
            frame.ast_children.truncate(ast_len);
            frame.child_values.truncate(values_len);
            return false;
        }
        true
    }

    fn eval_predicate(&mut self, inner: &Expression, negate: bool, frame: &mut RuleFrame) -> bool {
        let snapshot = self.cursor.clone();
        let captures_snapshot = self.captures.snapshot();
        let mut scratch = RuleFrame::scratch();
        let matched = self.eval_expr(inner, &mut scratch, true);
        self.cursor = snapshot;
        self.captures.restore(captures_snapshot);
        let _ = frame;
        if negate {
            !matched
        } else {
            matched
        }
    }

    fn eval_token_boundary(&mut self, inner: &Expression, frame: &mut RuleFrame, predicate: bool) -> bool {
        let snapshot = self.cursor.clone();
        let leading = self.take_leading_trivia();
        let content_start = self.offset();
        let prev_in_token = self.in_token;
        self.in_token = true;
        let mut scratch = RuleFrame::scratch();
        let matched = self.eval_expr(inner, &mut scratch, predicate);
        self.in_token = prev_in_token;

        if !matched {
            self.cursor = snapshot;
            return false;
        }
        if predicate {
            self.cursor = snapshot;
            return true;
        }

        let content_end = self.offset();
        let span = Span::new(Tracker::at(self.input, content_start).location(), self.cursor.location());
        let text = span.extract(self.input).to_string();
        let trailing = self.take_trailing_trivia();
        let node = CstNode::Token { span, rule: frame.rule_name.clone(), text: text.clone(), leading_trivia: leading, trailing_trivia: trailing };
        frame.cst_children.push(node);
        frame.ast_children.push(AstNode::Terminal { span, rule: frame.rule_name.clone(), text: text.clone(), value: None });
        frame.child_values.push(Value::Str(text));
        let _ = content_end;
        true
    }

    fn eval_capture(&mut self, name: &str, inner: &Expression, frame: &mut RuleFrame, predicate: bool) -> bool {
        let start = self.offset();
        if !self.eval_expr(inner, frame, predicate) {
            return false;
        }
        if !predicate {
            let text = self.input[start..self.offset()].to_string();
            self.captures.set(name, text);
        }
        true
    }

    /// A bare terminal match (`Literal`/`CharClass`/`Any`/`Dictionary`/
    /// `BackReference`) contributes a flat `CstNode::Terminal` tagged with
    /// the enclosing rule's name, and no value of its own (see DESIGN.md).
    /// `content_start` is the offset right after leading trivia was taken,
    /// i.e. where the matched text itself begins; `self.cursor` must already
    /// be positioned just past that text when this is called.
    fn emit_leaf(&mut self, frame: &mut RuleFrame, leading: Vec<Trivia>, content_start: usize) {
        let start_loc = Tracker::at(self.input, content_start).location();
        let end_loc = self.cursor.location();
        let text = self.input[content_start..self.offset()].to_string();
        let trailing = self.take_trailing_trivia();
        let span = Span::new(start_loc, end_loc);
        frame.cst_children.push(CstNode::Terminal { span, rule: frame.rule_name.clone(), text, leading_trivia: leading, trailing_trivia: trailing });
    }

    fn take_leading_trivia(&mut self) -> Vec<Trivia> {
        self.skip_and_maybe_capture()
    }

    fn take_trailing_trivia(&mut self) -> Vec<Trivia> {
        if self.in_token {
            return Vec::new();
        }
        let before = self.cursor.location();
        let all = self.skip_and_maybe_capture();
        let Some(Trivia::Whitespace { text, .. }) = all.into_iter().next() else {
            return Vec::new();
        };
        match text.find('\n') {
            Some(nl) => {
                let split_at = nl + 1;
                let trailing_text = text[..split_at].to_string();
                self.cursor = Tracker::at(self.input, before.offset + split_at);
                if trailing_text.is_empty() {
                    Vec::new()
                } else {
                    let span = Span::new(before, self.cursor.location());
                    if self.config.capture_trivia {
                        vec![Trivia::Whitespace { span, text: trailing_text }]
                    } else {
                        Vec::new()
                    }
                }
            }
            None => {
                let span = Span::new(before, self.cursor.location());
                if self.config.capture_trivia {
                    vec![Trivia::Whitespace { span, text }]
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn skip_and_maybe_capture(&mut self) -> Vec<Trivia> {
        if self.in_token {
            return Vec::new();
        }
        let Some(whitespace_expr) = self.compiled.grammar().whitespace_expr.clone() else {
            return Vec::new();
        };
        let start = self.cursor.location();
        loop {
            let before = self.offset();
            let prev_in_token = self.in_token;
            self.in_token = true;
            let mut scratch = RuleFrame::scratch();
            let matched = self.eval_expr(&whitespace_expr, &mut scratch, false);
            self.in_token = prev_in_token;
            if !matched || self.offset() == before {
                break;
            }
        }
        let end = self.cursor.location();
        if end.offset == start.offset {
            return Vec::new();
        }
        if self.config.capture_trivia {
            let span = Span::new(start, end);
            vec![Trivia::Whitespace { span, text: span.extract(self.input).to_string() }]
        } else {
            Vec::new()
        }
    }

    /// Negative lookahead against `%word`: true if the character directly
    /// after a just-matched keyword-like literal would extend it into a
    /// longer identifier, meaning the literal should not have matched here.
    fn word_rejects_boundary(&mut self) -> bool {
        let Some(word_expr) = self.compiled.grammar().word_expr.clone() else {
            return false;
        };
        let snapshot = self.cursor.clone();
        let prev_in_token = self.in_token;
        self.in_token = true;
        let mut scratch = RuleFrame::scratch();
        let matched = self.eval_expr(&word_expr, &mut scratch, true);
        self.in_token = prev_in_token;
        self.cursor = snapshot;
        matched
    }
}

fn is_word_like(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn describe_found(input: &str, offset: usize) -> String {
    match input[offset..].chars().next() {
        Some(c) => format!("'{c}'"),
        None => "end of input".to_string(),
    }
}

/// Attaches the trivia an enclosing `Reference` took around a rule
/// invocation to that rule's own result. The rule's body may already have
/// captured real leading/trailing trivia internally (a `TokenBoundary` or a
/// bare leaf match consumes up to the next non-trivia token as part of
/// matching); by the time the caller's own `take_leading_trivia`/
/// `take_trailing_trivia` run, that trivia is gone from the input and those
/// calls see nothing. Merging instead of replacing keeps whichever side
/// actually captured something rather than letting an empty outer capture
/// clobber a non-empty inner one.
fn attach_trivia(node: CstNode, leading: Vec<Trivia>, trailing: Vec<Trivia>) -> CstNode {
    fn merge_leading(outer: Vec<Trivia>, inner: Vec<Trivia>) -> Vec<Trivia> {
        if outer.is_empty() {
            inner
        } else if inner.is_empty() {
            outer
        } else {
            outer.into_iter().chain(inner).collect()
        }
    }
    fn merge_trailing(inner: Vec<Trivia>, outer: Vec<Trivia>) -> Vec<Trivia> {
        if inner.is_empty() {
            outer
        } else if outer.is_empty() {
            inner
        } else {
            inner.into_iter().chain(outer).collect()
        }
    }

    match node {
        CstNode::Terminal { span, rule, text, leading_trivia, trailing_trivia } => CstNode::Terminal {
            span,
            rule,
            text,
            leading_trivia: merge_leading(leading, leading_trivia),
            trailing_trivia: merge_trailing(trailing_trivia, trailing),
        },
        CstNode::NonTerminal { span, rule, children, leading_trivia, trailing_trivia } => CstNode::NonTerminal {
            span,
            rule,
            children,
            leading_trivia: merge_leading(leading, leading_trivia),
            trailing_trivia: merge_trailing(trailing_trivia, trailing),
        },
        CstNode::Token { span, rule, text, leading_trivia, trailing_trivia } => CstNode::Token {
            span,
            rule,
            text,
            leading_trivia: merge_leading(leading, leading_trivia),
            trailing_trivia: merge_trailing(trailing_trivia, trailing),
        },
        CstNode::Error { span, skipped_text, expected, leading_trivia, trailing_trivia } => CstNode::Error {
            span,
            skipped_text,
            expected,
            leading_trivia: merge_leading(leading, leading_trivia),
            trailing_trivia: merge_trailing(trailing_trivia, trailing),
        },
    }
}

fn wrap_with_trailing_error(root: CstNode, error: CstNode) -> CstNode {
    match root {
        CstNode::NonTerminal { span, rule, mut children, leading_trivia, .. } => {
            let span = span.to(error.span());
            children.push(error);
            CstNode::NonTerminal { span, rule, children, leading_trivia, trailing_trivia: Vec::new() }
        }
        other => {
            let span = other.span().to(error.span());
            let rule = other.rule_name().to_string();
            CstNode::NonTerminal { span, rule, children: vec![other, error], leading_trivia: Vec::new(), trailing_trivia: Vec::new() }
        }
    }
}

fn wrap_ast_with_trailing_error(root: AstNode, error: AstNode) -> AstNode {
    match root {
        AstNode::NonTerminal { span, rule, mut children, value } => {
            let span = span.to(error.span());
            children.push(error);
            AstNode::NonTerminal { span, rule, children, value }
        }
        other => {
            let span = other.span().to(error.span());
            let rule = other.rule_name().to_string();
            AstNode::NonTerminal { span, rule, children: vec![other, error], value: None }
        }
    }
}
