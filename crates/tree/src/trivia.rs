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

/// Whitespace or a comment, preserved for round-trip but otherwise not
/// semantically meaningful. Only produced between tokens, never inside a
/// `TokenBoundary` region (see `peggy-engine`'s trivia discipline).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trivia {
    Whitespace { span: Span, text: String },
    LineComment { span: Span, text: String },
    BlockComment { span: Span, text: String },
}

impl Trivia {
    pub fn span(&self) -> Span {
        match self {
            Trivia::Whitespace { span, .. } | Trivia::LineComment { span, .. } | Trivia::BlockComment { span, .. } => {
                *span
            }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Trivia::Whitespace { text, .. } | Trivia::LineComment { text, .. } | Trivia::BlockComment { text, .. } => {
                text
            }
        }
    }
}
