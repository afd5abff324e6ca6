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

/// Why a lexeme that started a string/char-class/action-block scan never
/// found its closing delimiter, or why a character matched nothing at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrorKind {
    UnterminatedString,
    UnterminatedCharClass,
    UnterminatedAction,
    UnexpectedChar,
}

impl LexErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            LexErrorKind::UnterminatedString => "unterminated string literal",
            LexErrorKind::UnterminatedCharClass => "unterminated character class",
            LexErrorKind::UnterminatedAction => "unterminated action block",
            LexErrorKind::UnexpectedChar => "unexpected character",
        }
    }
}

/// The kind of a grammar-source token. Whitespace and `#`-line-comments are
/// skipped during lexing (the grammar's own text has no round-trip
/// requirement; only the CST the *compiled* grammar produces over its
/// target input does).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    /// `%name`; the parser strips the leading `%` and interprets the name.
    Directive,
    StringLiteral,
    CharClassLiteral,
    IntegerLiteral,
    /// A balanced `{ ... }` action block, quoted-string contents skipped
    /// while scanning for the matching close brace.
    ActionBlock,
    /// `<-` or `←`.
    ArrowLeft,
    Slash,
    Amp,
    Bang,
    Question,
    Star,
    Plus,
    Dot,
    Tilde,
    /// `↑` or `^`.
    Cut,
    OpenParen,
    CloseParen,
    Lt,
    Gt,
    OpenBrace,
    CloseBrace,
    Comma,
    Dollar,
    Pipe,
    Eof,
    Error(LexErrorKind),
}

/// A single lexed token: its kind, its span in the source, and its exact
/// source text (escapes are preserved literally; the parser unescapes).
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TokenKind::Error(_))
    }
}
