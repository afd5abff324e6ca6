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

//! The data model shared by the grammar parser and the execution engine:
//! [`Expression`]/[`Rule`]/[`Grammar`], [`Trivia`], the lossless [`CstNode`]
//! tree (with a rowan-backed [`SyntaxNode`] view), and the trivia-stripped
//! [`AstNode`] tree with its [`SemanticValues`]/[`Action`] action interface.

mod ast;
mod cst;
mod expression;
mod trivia;

pub use ast::{Action, ActionTable, AstNode, SemanticValues, Value};
pub use cst::{
    CstNode,
    ERROR_RULE_NAME,
    NodeTag,
    PeggyLanguage,
    RULE_MASK,
    SyntaxElement,
    SyntaxKind,
    SyntaxNode,
    SyntaxToken,
    syntax_kind_from_raw,
    to_green,
};
pub use expression::{Expression, Grammar, Rule};
pub use trivia::Trivia;
