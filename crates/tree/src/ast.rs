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

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use peggy_span::Span;

/// The dynamically-typed result of a rule action.
///
/// Actions are an opaque external callback (`apply(SemanticValues) -> Any`);
/// this enum covers the primitive shapes `SemanticValues`'s own
/// `toInt`/`toDouble`/`toLong` accessors expect plus an escape hatch
/// (`Custom`) for action results the toolkit itself never inspects.
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Long(i64),
    Double(f64),
    Str(String),
    List(Vec<Value>),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) | Value::Long(v) => Some(*v),
            Value::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) | Value::Long(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Long(v) => write!(f, "Long({v})"),
            Value::Double(v) => write!(f, "Double({v})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => write!(f, "List({items:?})"),
            Value::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) | (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

/// The trivia-stripped counterpart to `CstNode`. `value` is populated only
/// when the originating rule carries an action.
#[derive(Clone, Debug, PartialEq)]
pub enum AstNode {
    Terminal { span: Span, rule: String, text: String, value: Option<Value> },
    NonTerminal { span: Span, rule: String, children: Vec<AstNode>, value: Option<Value> },
}

impl AstNode {
    pub fn span(&self) -> Span {
        match self {
            AstNode::Terminal { span, .. } | AstNode::NonTerminal { span, .. } => *span,
        }
    }

    pub fn rule_name(&self) -> &str {
        match self {
            AstNode::Terminal { rule, .. } | AstNode::NonTerminal { rule, .. } => rule,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            AstNode::Terminal { value, .. } | AstNode::NonTerminal { value, .. } => value.as_ref(),
        }
    }

    pub fn children(&self) -> &[AstNode] {
        match self {
            AstNode::NonTerminal { children, .. } => children,
            AstNode::Terminal { .. } => &[],
        }
    }
}

/// The per-rule bundle handed to a rule's action.
///
/// `matched_text` equals the token text when the rule's expression is (or
/// contains at its top level) a `TokenBoundary`; otherwise it is the plain
/// `span.extract(input)` text. `child_values` excludes any child whose
/// value was suppressed by `Ignore`.
#[derive(Clone, Debug)]
pub struct SemanticValues {
    pub matched_text: String,
    pub span: Span,
    pub child_values: Vec<Value>,
    pub chosen_alternative_index: Option<usize>,
}

impl SemanticValues {
    /// `$0`: the full match / token text.
    pub fn token(&self) -> &str {
        &self.matched_text
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn size(&self) -> usize {
        self.child_values.len()
    }

    pub fn values(&self) -> &[Value] {
        &self.child_values
    }

    /// `$N` (1-based): the Nth child value.
    pub fn get(&self, i: usize) -> Option<&Value> {
        i.checked_sub(1).and_then(|idx| self.child_values.get(idx))
    }

    pub fn choice(&self) -> Option<usize> {
        self.chosen_alternative_index
    }

    pub fn to_int(&self) -> Option<i64> {
        self.matched_text.trim().parse().ok()
    }

    pub fn to_long(&self) -> Option<i64> {
        self.to_int()
    }

    pub fn to_double(&self) -> Option<f64> {
        self.matched_text.trim().parse().ok()
    }
}

/// The opaque action interface a grammar rule's `{ ... }` block compiles
/// down to externally. The engine never inspects an action's body, only
/// invokes it and maps a failure to `ActionError`.
pub trait Action: Send + Sync {
    fn apply(&self, values: &SemanticValues) -> Result<Value, String>;
}

impl<F> Action for F
where
    F: Fn(&SemanticValues) -> Result<Value, String> + Send + Sync,
{
    fn apply(&self, values: &SemanticValues) -> Result<Value, String> {
        self(values)
    }
}

/// A compiled grammar's action table, mapping rule name to its callback.
/// Populated by the external action compiler named in the Out-of-scope
/// section; the toolkit only stores and invokes these. An `IndexMap` keeps
/// insertion order stable for anything that iterates the table (e.g. a
/// future action-compiler diagnostic listing rules in source order).
pub type ActionTable = indexmap::IndexMap<String, Arc<dyn Action>>;

#[cfg(test)]
mod tests {
    use peggy_span::Location;

    use super::*;

    #[test]
    fn semantic_values_get_is_one_based() {
        let sv = SemanticValues {
            matched_text: "42".into(),
            span: Span::empty(Location::start()),
            child_values: vec![Value::Int(1), Value::Int(2)],
            chosen_alternative_index: None,
        };
        assert_eq!(sv.get(1), Some(&Value::Int(1)));
        assert_eq!(sv.get(0), None);
    }

    #[test]
    fn to_int_parses_matched_text() {
        let sv = SemanticValues {
            matched_text: " 42 ".into(),
            span: Span::empty(Location::start()),
            child_values: vec![],
            chosen_alternative_index: None,
        };
        assert_eq!(sv.to_int(), Some(42));
    }
}
