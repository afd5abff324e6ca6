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

use peggy_diagnostics::{Diagnostic, Handler, ParseError, Result};
use peggy_lexer::{MAX_GRAMMAR_LEN, Token, TokenKind, lex};
use peggy_span::{Location, Span};
use peggy_tree::{Expression, Grammar, Rule};
use tracing::debug;

use crate::escape::{split_char_class, split_string_literal};

/// Parse grammar source text into a [`Grammar`], per the productions in the
/// grammar parser component: `Grammar ← (Directive | Rule)* Eof`.
///
/// Fails fast with a `SemanticError` on the grammar's own size cap, the
/// first lexer `Error` token, or the first unexpected token; recoverable,
/// partial-tree parsing is a property of the *target* language the compiled
/// grammar parses, not of the grammar source itself.
pub fn parse_grammar(source: &str, handler: &Handler) -> Result<Grammar> {
    if source.len() > MAX_GRAMMAR_LEN {
        return Err(ParseError::SemanticError {
            location: Location::start(),
            reason: format!("grammar source exceeds the {MAX_GRAMMAR_LEN} character limit"),
        });
    }

    let tokens = lex(source);
    debug!(token_count = tokens.len(), "lexed grammar source");
    let mut parser = Parser { tokens, pos: 0, handler };
    parser.parse_grammar()
}

struct Parser<'h> {
    tokens: Vec<Token>,
    pos: usize,
    handler: &'h Handler,
}

impl<'h> Parser<'h> {
    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            let found = self.current();
            Err(ParseError::UnexpectedInput {
                location: found.span.start,
                found: describe_token(found),
                expected: what.to_string(),
            })
        }
    }

    fn check_lex_error(&self, token: &Token) -> Result<()> {
        if let TokenKind::Error(kind) = token.kind {
            return Err(ParseError::SemanticError { location: token.span.start, reason: kind.message().to_string() });
        }
        Ok(())
    }

    fn parse_grammar(&mut self) -> Result<Grammar> {
        let mut rules: Vec<Rule> = Vec::new();
        let mut whitespace_expr = None;
        let mut word_expr = None;

        while !self.at(TokenKind::Eof) {
            self.check_lex_error(self.current())?;
            if self.at(TokenKind::Directive) {
                self.parse_directive(&mut whitespace_expr, &mut word_expr)?;
            } else {
                rules.push(self.parse_rule()?);
            }
        }

        Ok(Grammar { rules, start_rule: None, whitespace_expr, word_expr })
    }

    fn parse_directive(
        &mut self,
        whitespace_expr: &mut Option<Expression>,
        word_expr: &mut Option<Expression>,
    ) -> Result<()> {
        let directive = self.bump();
        let name = directive.text.trim_start_matches('%').to_string();
        self.expect(TokenKind::ArrowLeft, "'<-'")?;
        let expr = self.parse_choice()?;
        match name.as_str() {
            "whitespace" => *whitespace_expr = Some(expr),
            "word" => *word_expr = Some(expr),
            _ => {
                // Unknown directive names are ignored per the grammar parser spec.
                // `startRule` likewise has no grammar-text syntax (see DESIGN.md);
                // the effective start rule is always the first one in source order.
            }
        }
        Ok(())
    }

    fn parse_rule(&mut self) -> Result<Rule> {
        let name_tok = self.expect(TokenKind::Identifier, "a rule name")?;
        self.expect(TokenKind::ArrowLeft, "'<-'")?;
        let expression = self.parse_choice()?;
        let action = if self.at(TokenKind::ActionBlock) {
            let tok = self.bump();
            Some(strip_action_braces(&tok.text))
        } else {
            None
        };
        let span = name_tok.span.to(expression.span());
        Ok(Rule { span, name: name_tok.text, expression, action, error_message: None })
    }

    fn parse_choice(&mut self) -> Result<Expression> {
        let first = self.parse_sequence()?;
        if !self.at(TokenKind::Slash) {
            return Ok(first);
        }
        let mut alternatives = vec![first];
        while self.at(TokenKind::Slash) {
            self.bump();
            alternatives.push(self.parse_sequence()?);
        }
        let span = alternatives.first().unwrap().span().to(alternatives.last().unwrap().span());
        Ok(Expression::Choice { span, alternatives })
    }

    fn parse_sequence(&mut self) -> Result<Expression> {
        let mut elements = vec![self.parse_prefix()?];
        while self.starts_prefix() {
            elements.push(self.parse_prefix()?);
        }
        if elements.len() == 1 {
            return Ok(elements.pop().unwrap());
        }
        let span = elements.first().unwrap().span().to(elements.last().unwrap().span());
        Ok(Expression::Sequence { span, elements })
    }

    /// True if the current token can start another `Prefix` within the
    /// sequence being parsed. An identifier immediately followed by `<-`
    /// starts a new rule instead, per the one-token-lookahead disambiguation.
    fn starts_prefix(&self) -> bool {
        if self.at(TokenKind::Identifier) && self.nth(1).kind == TokenKind::ArrowLeft {
            return false;
        }
        matches!(
            self.current().kind,
            TokenKind::Identifier
                | TokenKind::StringLiteral
                | TokenKind::CharClassLiteral
                | TokenKind::Dot
                | TokenKind::Cut
                | TokenKind::OpenParen
                | TokenKind::Lt
                | TokenKind::Dollar
                | TokenKind::Amp
                | TokenKind::Bang
                | TokenKind::Tilde
        )
    }

    fn parse_prefix(&mut self) -> Result<Expression> {
        let start = self.current().span.start;
        if self.at(TokenKind::Amp) {
            self.bump();
            let inner = self.parse_suffix()?;
            let span = Span::new(start, inner.span().end);
            return Ok(Expression::And { span, expression: Box::new(inner) });
        }
        if self.at(TokenKind::Bang) {
            self.bump();
            let inner = self.parse_suffix()?;
            let span = Span::new(start, inner.span().end);
            return Ok(Expression::Not { span, expression: Box::new(inner) });
        }
        if self.at(TokenKind::Tilde) {
            self.bump();
            let inner = self.parse_suffix()?;
            let span = Span::new(start, inner.span().end);
            return Ok(Expression::Ignore { span, expression: Box::new(inner) });
        }
        self.parse_suffix()
    }

    fn parse_suffix(&mut self) -> Result<Expression> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::Star => {
                    let end = self.bump().span.end;
                    let span = Span::new(expr.span().start, end);
                    expr = Expression::ZeroOrMore { span, expression: Box::new(expr) };
                }
                TokenKind::Plus => {
                    let end = self.bump().span.end;
                    let span = Span::new(expr.span().start, end);
                    expr = Expression::OneOrMore { span, expression: Box::new(expr) };
                }
                TokenKind::Question => {
                    let end = self.bump().span.end;
                    let span = Span::new(expr.span().start, end);
                    expr = Expression::Optional { span, expression: Box::new(expr) };
                }
                TokenKind::OpenBrace => {
                    self.bump();
                    let (min, max) = self.parse_repetition_bounds()?;
                    let end = self.expect(TokenKind::CloseBrace, "'}'")?.span.end;
                    let span = Span::new(expr.span().start, end);
                    expr = Expression::Repetition { span, expression: Box::new(expr), min, max };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_repetition_bounds(&mut self) -> Result<(u32, Option<u32>)> {
        let min_tok = self.expect(TokenKind::IntegerLiteral, "a repetition count")?;
        let min: u32 = min_tok.text.parse().unwrap_or(0);
        if !self.at(TokenKind::Comma) {
            return Ok((min, Some(min)));
        }
        self.bump();
        if self.at(TokenKind::IntegerLiteral) {
            let max_tok = self.bump();
            let max: u32 = max_tok.text.parse().unwrap_or(min);
            if max < min {
                self.handler.emit(Diagnostic::error(
                    max_tok.span,
                    format!("repetition upper bound {max} is less than lower bound {min}"),
                ));
                return Ok((min, Some(min)));
            }
            Ok((min, Some(max)))
        } else {
            Ok((min, None))
        }
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.current().clone();
        self.check_lex_error(&token)?;
        match token.kind {
            TokenKind::Identifier => {
                self.bump();
                Ok(Expression::Reference { span: token.span, rule_name: token.text })
            }
            TokenKind::StringLiteral => {
                self.bump();
                let (text, case_insensitive) = split_string_literal(&token.text);
                Ok(Expression::Literal { span: token.span, text, case_insensitive })
            }
            TokenKind::CharClassLiteral => {
                self.bump();
                let (pattern, negated, case_insensitive) = split_char_class(&token.text);
                Ok(Expression::CharClass { span: token.span, pattern, negated, case_insensitive })
            }
            TokenKind::Dot => {
                self.bump();
                Ok(Expression::Any { span: token.span })
            }
            TokenKind::Cut => {
                self.bump();
                Ok(Expression::Cut { span: token.span })
            }
            TokenKind::OpenParen => {
                self.bump();
                let inner = self.parse_choice()?;
                let end = self.expect(TokenKind::CloseParen, "')'")?.span.end;
                let span = Span::new(token.span.start, end);
                Ok(Expression::Group { span, expression: Box::new(inner) })
            }
            TokenKind::Lt => {
                self.bump();
                let inner = self.parse_choice()?;
                let end = self.expect(TokenKind::Gt, "'>'")?.span.end;
                let span = Span::new(token.span.start, end);
                Ok(Expression::TokenBoundary { span, expression: Box::new(inner) })
            }
            TokenKind::Dollar => {
                self.bump();
                let name_tok = self.expect(TokenKind::Identifier, "a capture name")?;
                if self.at(TokenKind::Lt) {
                    self.bump();
                    let inner = self.parse_choice()?;
                    let end = self.expect(TokenKind::Gt, "'>'")?.span.end;
                    let span = Span::new(token.span.start, end);
                    Ok(Expression::Capture { span, name: name_tok.text, expression: Box::new(inner) })
                } else {
                    let span = Span::new(token.span.start, name_tok.span.end);
                    Ok(Expression::BackReference { span, name: name_tok.text })
                }
            }
            _ => Err(ParseError::UnexpectedInput {
                location: token.span.start,
                found: describe_token(&token),
                expected: "an expression".to_string(),
            }),
        }
    }
}

fn strip_action_braces(raw: &str) -> String {
    raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')).unwrap_or(raw).trim().to_string()
}

fn describe_token(token: &Token) -> String {
    match &token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Error(kind) => kind.message().to_string(),
        _ if token.text.is_empty() => format!("{:?}", token.kind),
        _ => format!("'{}'", token.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Grammar {
        let handler = Handler::new(100);
        parse_grammar(source, &handler).expect("grammar should parse")
    }

    #[test]
    fn parses_a_single_rule_char_class() {
        let grammar = parse("Number <- [0-9]+");
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(grammar.rules[0].name, "Number");
        assert!(matches!(grammar.rules[0].expression, Expression::OneOrMore { .. }));
    }

    #[test]
    fn parses_ordered_choice_and_sequence() {
        let grammar = parse("Expr <- Term ('+' / '-') Term");
        match &grammar.rules[0].expression {
            Expression::Sequence { elements, .. } => assert_eq!(elements.len(), 3),
            other => panic!("expected a Sequence, got {other:?}"),
        }
    }

    #[test]
    fn whitespace_directive_populates_grammar_slot() {
        let grammar = parse("%whitespace <- [ \\t]*\nNumber <- [0-9]+");
        assert!(grammar.whitespace_expr.is_some());
    }

    #[test]
    fn token_boundary_and_action_are_parsed() {
        let grammar = parse("Number <- < [0-9]+ > { return sv.toInt(); }");
        assert!(matches!(grammar.rules[0].expression, Expression::TokenBoundary { .. }));
        assert_eq!(grammar.rules[0].action.as_deref(), Some("return sv.toInt();"));
    }

    #[test]
    fn identifier_followed_by_arrow_ends_the_current_sequence() {
        let grammar = parse("A <- 'x'\nB <- 'y'");
        assert_eq!(grammar.rules.len(), 2);
    }

    #[test]
    fn capture_and_back_reference_round_trip() {
        let grammar = parse("Tag <- '<' $name<[a-z]+> '>' $name");
        match &grammar.rules[0].expression {
            Expression::Sequence { elements, .. } => {
                assert!(matches!(elements[1], Expression::Capture { .. }));
                assert!(matches!(elements[3], Expression::BackReference { .. }));
            }
            other => panic!("expected a Sequence, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_rule_names_are_kept_for_the_validator_to_flag() {
        let grammar = parse("A <- 'x'\nA <- 'y'");
        assert_eq!(grammar.rules.len(), 2);
        assert_eq!(grammar.rule("A").unwrap().expression.describe(), "'y'");
    }
}
