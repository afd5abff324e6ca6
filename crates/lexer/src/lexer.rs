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

use logos::Logos;
use peggy_span::{LineColTracker, Span};

use crate::token::{LexErrorKind, Token, TokenKind};

/// The hard cap on grammar source size; enforced before lexing starts (§6
/// "Size cap").
pub const MAX_GRAMMAR_LEN: usize = 1_000_000;

/// Internal logos token enum. Kept distinct from [`TokenKind`] because
/// logos owns this type during lexing and several of our kinds (string
/// literals, character classes, action blocks) are produced by manual-scan
/// callbacks rather than a single regex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Logos)]
#[logos(skip r"([ \t\r\n\f]+|#[^\n]*)")]
enum LogosToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    #[regex(r"%[A-Za-z_][A-Za-z0-9_]*")]
    Directive,

    #[token("\"", scan_string)]
    #[token("'", scan_string)]
    StringLiteral,

    #[token("[", scan_char_class)]
    CharClassLiteral,

    #[regex(r"[0-9]+")]
    IntegerLiteral,

    #[token("{", scan_action_or_brace)]
    OpenBraceOrAction,

    #[token("<-")]
    #[token("\u{2190}")] // ←
    ArrowLeft,

    #[token("/")]
    Slash,
    #[token("&")]
    Amp,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token(".")]
    Dot,
    #[token("~")]
    Tilde,
    #[token("\u{2191}")] // ↑
    #[token("^")]
    Cut,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("}")]
    CloseBrace,
    #[token(",")]
    Comma,
    #[token("$")]
    Dollar,
    #[token("|")]
    Pipe,
}

/// Consume a quoted string: `'...'` or `"..."` with backslash escapes,
/// stopping at the matching (unescaped) quote. Whether it actually found a
/// close quote is determined afterward by [`terminated_quoted`], mirroring
/// how `comment_block`-style callbacks in rowan-based lexers always bump to
/// a resting point and let the caller classify the result.
fn scan_string(lex: &mut logos::Lexer<LogosToken>) {
    let quote = lex.slice().chars().next().expect("token slice is the opening quote");
    let mut consumed = 0usize;
    let mut closed = false;
    let mut chars = lex.remainder().char_indices();
    while let Some((idx, c)) = chars.next() {
        consumed = idx + c.len_utf8();
        if c == '\\' {
            if let Some((idx2, c2)) = chars.next() {
                consumed = idx2 + c2.len_utf8();
            }
            continue;
        }
        if c == quote {
            closed = true;
            break;
        }
    }
    lex.bump(consumed);
    if closed && lex.remainder().starts_with('i') {
        lex.bump(1);
    }
}

/// Consume `[...]` or `[^...]`, with `\]` and other backslash escapes
/// preserved literally for the parser to interpret.
fn scan_char_class(lex: &mut logos::Lexer<LogosToken>) {
    let mut consumed = 0usize;
    let mut closed = false;
    let mut chars = lex.remainder().char_indices();
    while let Some((idx, c)) = chars.next() {
        consumed = idx + c.len_utf8();
        if c == '\\' {
            if let Some((idx2, c2)) = chars.next() {
                consumed = idx2 + c2.len_utf8();
            }
            continue;
        }
        if c == ']' {
            closed = true;
            break;
        }
    }
    lex.bump(consumed);
    if closed && lex.remainder().starts_with('i') {
        lex.bump(1);
    }
}

/// Resolves the `{` ambiguity: a repetition brace (`{n}`, `{n,}`, `{n,m}`)
/// is left as a bare `{` so the surrounding tokens (`IntegerLiteral`,
/// `Comma`, `CloseBrace`) lex normally; anything else starts an action
/// block, scanned here as one balanced-brace token with quoted-string
/// contents skipped so braces inside action source strings don't unbalance
/// the count.
fn scan_action_or_brace(lex: &mut logos::Lexer<LogosToken>) {
    if looks_like_repetition_brace(lex.remainder()) {
        // Leave the brace as a single `{`; the repetition body (digits,
        // comma, closing `}`) lexes normally as separate tokens.
        return;
    }

    let mut depth = 1i32;
    let mut consumed = 0usize;
    let mut in_string: Option<char> = None;
    let mut chars = lex.remainder().char_indices();
    while let Some((idx, c)) = chars.next() {
        consumed = idx + c.len_utf8();
        match in_string {
            Some(quote) => {
                if c == '\\' {
                    if let Some((idx2, c2)) = chars.next() {
                        consumed = idx2 + c2.len_utf8();
                    }
                } else if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                '"' | '\'' => in_string = Some(c),
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            },
        }
    }
    lex.bump(consumed);
}

fn looks_like_repetition_brace(rest: &str) -> bool {
    let mut chars = rest.chars().peekable();
    let mut saw_digit = false;
    while matches!(chars.peek(), Some(c) if c.is_ascii_digit()) {
        saw_digit = true;
        chars.next();
    }
    saw_digit && matches!(chars.peek(), Some('}') | Some(','))
}

fn terminated_quoted(slice: &str, quote: char) -> bool {
    let body = slice.strip_suffix('i').unwrap_or(slice);
    body.len() > 1 && body.ends_with(quote)
}

fn terminated_char_class(slice: &str) -> bool {
    let body = slice.strip_suffix('i').unwrap_or(slice);
    body.len() > 1 && body.ends_with(']')
}

fn terminated_action(slice: &str) -> bool {
    slice.ends_with('}')
}

/// Lex `source` into a token stream terminated by `Eof`.
///
/// Lexing never fails outright: unterminated strings/char-classes/actions
/// and unrecognised characters are reported as `Error` tokens carrying the
/// offending span, per the grammar lexer's error-token discipline, so the
/// parser can keep going and produce further diagnostics in the same pass.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut tracker = LineColTracker::new();
    let mut logos_lexer = LogosToken::lexer(source);

    while let Some(result) = logos_lexer.next() {
        let slice = logos_lexer.slice();
        let start = tracker.location();
        tracker.advance_str(slice);
        let end = tracker.location();
        let span = Span::new(start, end);

        let kind = match result {
            Ok(LogosToken::Identifier) => TokenKind::Identifier,
            Ok(LogosToken::Directive) => TokenKind::Directive,
            Ok(LogosToken::IntegerLiteral) => TokenKind::IntegerLiteral,
            Ok(LogosToken::StringLiteral) => {
                let quote = slice.chars().next().unwrap_or('"');
                if terminated_quoted(slice, quote) {
                    TokenKind::StringLiteral
                } else {
                    TokenKind::Error(LexErrorKind::UnterminatedString)
                }
            }
            Ok(LogosToken::CharClassLiteral) => {
                if terminated_char_class(slice) {
                    TokenKind::CharClassLiteral
                } else {
                    TokenKind::Error(LexErrorKind::UnterminatedCharClass)
                }
            }
            Ok(LogosToken::OpenBraceOrAction) => {
                if slice == "{" {
                    TokenKind::OpenBrace
                } else if terminated_action(slice) {
                    TokenKind::ActionBlock
                } else {
                    TokenKind::Error(LexErrorKind::UnterminatedAction)
                }
            }
            Ok(LogosToken::ArrowLeft) => TokenKind::ArrowLeft,
            Ok(LogosToken::Slash) => TokenKind::Slash,
            Ok(LogosToken::Amp) => TokenKind::Amp,
            Ok(LogosToken::Bang) => TokenKind::Bang,
            Ok(LogosToken::Question) => TokenKind::Question,
            Ok(LogosToken::Star) => TokenKind::Star,
            Ok(LogosToken::Plus) => TokenKind::Plus,
            Ok(LogosToken::Dot) => TokenKind::Dot,
            Ok(LogosToken::Tilde) => TokenKind::Tilde,
            Ok(LogosToken::Cut) => TokenKind::Cut,
            Ok(LogosToken::OpenParen) => TokenKind::OpenParen,
            Ok(LogosToken::CloseParen) => TokenKind::CloseParen,
            Ok(LogosToken::Lt) => TokenKind::Lt,
            Ok(LogosToken::Gt) => TokenKind::Gt,
            Ok(LogosToken::CloseBrace) => TokenKind::CloseBrace,
            Ok(LogosToken::Comma) => TokenKind::Comma,
            Ok(LogosToken::Dollar) => TokenKind::Dollar,
            Ok(LogosToken::Pipe) => TokenKind::Pipe,
            Err(()) => TokenKind::Error(LexErrorKind::UnexpectedChar),
        };

        tokens.push(Token { kind, span, text: slice.to_string() });
    }

    let eof_loc = tracker.location();
    tokens.push(Token { kind: TokenKind::Eof, span: Span::empty(eof_loc), text: String::new() });
    tokens
}

#[cfg(test)]
mod tests {
    use expect_test::{Expect, expect};

    use super::*;

    fn check(source: &str, expected: Expect) {
        let tokens = lex(source);
        let rendered: Vec<String> = tokens
            .iter()
            .map(|t| format!("{:?} {:?}", t.kind, t.text))
            .collect();
        expected.assert_eq(&rendered.join("\n"));
    }

    #[test]
    fn lexes_a_simple_rule() {
        check(
            "Number <- [0-9]+",
            expect![[r#"
                Identifier "Number"
                ArrowLeft "<-"
                CharClassLiteral "[0-9]"
                Plus "+"
                Eof ""#]],
        );
    }

    #[test]
    fn distinguishes_repetition_brace_from_action_block() {
        let tokens = lex("a{2,4} { return 1; }");
        assert_eq!(tokens[1].kind, TokenKind::OpenBrace);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::ActionBlock));
    }

    #[test]
    fn unterminated_string_is_an_error_token_not_a_lex_failure() {
        let tokens = lex("'abc");
        assert_eq!(tokens[0].kind, TokenKind::Error(LexErrorKind::UnterminatedString));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn braces_inside_action_strings_do_not_unbalance_the_scan() {
        let tokens = lex(r#"{ if (x == "}") { return 1; } }"#);
        assert_eq!(tokens[0].kind, TokenKind::ActionBlock);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn unicode_cut_and_arrow_synonyms_lex_the_same_as_ascii() {
        let unicode = lex("A \u{2190} B \u{2191}");
        let ascii = lex("A <- B ^");
        let kinds_u: Vec<_> = unicode.iter().map(|t| t.kind).collect();
        let kinds_a: Vec<_> = ascii.iter().map(|t| t.kind).collect();
        assert_eq!(kinds_u, kinds_a);
    }
}
