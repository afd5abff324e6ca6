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

/// A PEG expression. Every variant carries a `span` recorded at grammar-parse
/// time, except combinators whose span is the union of their children (see
/// `Expression::span`).
///
/// Implemented as a single tagged sum type with one payload per variant and
/// matched exhaustively throughout the engine; the set of constructs a PEG
/// grammar can express is closed, so there is no benefit to virtual dispatch
/// here (see `Expression::eval` call sites in `peggy-engine`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    // -- terminals --
    Literal { span: Span, text: String, case_insensitive: bool },
    CharClass { span: Span, pattern: String, negated: bool, case_insensitive: bool },
    Any { span: Span },
    Reference { span: Span, rule_name: String },
    BackReference { span: Span, name: String },
    Cut { span: Span },
    /// Reserved: no grammar-text syntax produces this yet (see DESIGN.md).
    Dictionary { span: Span, words: Vec<String>, case_insensitive: bool },

    // -- combinators --
    Sequence { span: Span, elements: Vec<Expression> },
    Choice { span: Span, alternatives: Vec<Expression> },
    Group { span: Span, expression: Box<Expression> },

    // -- repetition --
    ZeroOrMore { span: Span, expression: Box<Expression> },
    OneOrMore { span: Span, expression: Box<Expression> },
    Optional { span: Span, expression: Box<Expression> },
    Repetition { span: Span, expression: Box<Expression>, min: u32, max: Option<u32> },

    // -- predicates --
    And { span: Span, expression: Box<Expression> },
    Not { span: Span, expression: Box<Expression> },

    // -- capture control --
    TokenBoundary { span: Span, expression: Box<Expression> },
    Ignore { span: Span, expression: Box<Expression> },
    Capture { span: Span, name: String, expression: Box<Expression> },
    CaptureScope { span: Span, expression: Box<Expression> },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal { span, .. }
            | Expression::CharClass { span, .. }
            | Expression::Any { span }
            | Expression::Reference { span, .. }
            | Expression::BackReference { span, .. }
            | Expression::Cut { span }
            | Expression::Dictionary { span, .. }
            | Expression::Sequence { span, .. }
            | Expression::Choice { span, .. }
            | Expression::Group { span, .. }
            | Expression::ZeroOrMore { span, .. }
            | Expression::OneOrMore { span, .. }
            | Expression::Optional { span, .. }
            | Expression::Repetition { span, .. }
            | Expression::And { span, .. }
            | Expression::Not { span, .. }
            | Expression::TokenBoundary { span, .. }
            | Expression::Ignore { span, .. }
            | Expression::Capture { span, .. }
            | Expression::CaptureScope { span, .. } => *span,
        }
    }

    /// A short human-readable expectation string, used as the default
    /// `expected` text in diagnostics when a rule has no `errorMessage`.
    pub fn describe(&self) -> String {
        match self {
            Expression::Literal { text, .. } => format!("'{text}'"),
            Expression::CharClass { pattern, negated: false, .. } => format!("[{pattern}]"),
            Expression::CharClass { pattern, negated: true, .. } => format!("[^{pattern}]"),
            Expression::Any { .. } => "any character".to_string(),
            Expression::Reference { rule_name, .. } => rule_name.clone(),
            Expression::BackReference { name, .. } => format!("back-reference to ${name}"),
            Expression::Cut { .. } => "cut".to_string(),
            Expression::Dictionary { .. } => "dictionary entry".to_string(),
            Expression::Sequence { .. } => "sequence".to_string(),
            Expression::Choice { .. } => "one of several alternatives".to_string(),
            Expression::Group { expression, .. } => expression.describe(),
            Expression::ZeroOrMore { expression, .. } => format!("{}*", expression.describe()),
            Expression::OneOrMore { expression, .. } => format!("{}+", expression.describe()),
            Expression::Optional { expression, .. } => format!("{}?", expression.describe()),
            Expression::Repetition { expression, .. } => format!("{}{{..}}", expression.describe()),
            Expression::And { expression, .. } => format!("&{}", expression.describe()),
            Expression::Not { expression, .. } => format!("!{}", expression.describe()),
            Expression::TokenBoundary { expression, .. } => expression.describe(),
            Expression::Ignore { expression, .. } => expression.describe(),
            Expression::Capture { expression, .. } => expression.describe(),
            Expression::CaptureScope { expression, .. } => expression.describe(),
        }
    }
}

/// A named grammar rule: `name <- expression`, plus an optional opaque
/// action source and an optional error-message override.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub span: Span,
    pub name: String,
    pub expression: Expression,
    /// Opaque action source text, compiled externally (see `peggy-tree::Action`).
    pub action: Option<String>,
    /// Overrides the default `expected` string in diagnostics for this rule.
    /// Modelled per the data model but not yet populated by the grammar
    /// parser (see DESIGN.md open question).
    pub error_message: Option<String>,
}

/// A parsed, validated grammar: an ordered list of rules plus the optional
/// `%whitespace`/`%word` directive expressions and an optional explicit
/// start rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Grammar {
    pub rules: Vec<Rule>,
    pub start_rule: Option<String>,
    pub whitespace_expr: Option<Expression>,
    pub word_expr: Option<Expression>,
}

impl Grammar {
    /// The name of the effective start rule: the explicit `startRule` if
    /// set, otherwise the first rule in source order.
    pub fn start_rule_name(&self) -> Option<&str> {
        self.start_rule.as_deref().or_else(|| self.rules.first().map(|r| r.name.as_str()))
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().rev().find(|r| r.name == name)
    }
}
