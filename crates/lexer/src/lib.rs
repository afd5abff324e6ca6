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

//! Tokeniser for Peggy grammar source text (component D): identifiers,
//! directives, string/char-class literals, action blocks, and the PEG
//! operator set, with line/column tracking for diagnostics.

mod lexer;
mod token;

pub use lexer::{MAX_GRAMMAR_LEN, lex};
pub use token::{LexErrorKind, Token, TokenKind};
