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
use rowan::GreenNodeBuilder;
use serde::{Deserialize, Serialize};

use crate::Trivia;

/// Sentinel rule name used by `CstNode::Error` nodes, per the data model.
pub const ERROR_RULE_NAME: &str = "<error>";

/// A node of the lossless Concrete Syntax Tree.
///
/// This is the primary, owned representation the engine builds bottom-up; a
/// parallel rowan-backed `GreenNode` view (see [`to_green`]) can be derived
/// from it for tooling that wants rowan's cursor/incremental-reuse
/// machinery, mirroring how the toolkit this was modelled on ships both a
/// plain AST and a rowan-based lossless tree side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CstNode {
    Terminal {
        span: Span,
        rule: String,
        text: String,
        leading_trivia: Vec<Trivia>,
        trailing_trivia: Vec<Trivia>,
    },
    NonTerminal {
        span: Span,
        rule: String,
        children: Vec<CstNode>,
        leading_trivia: Vec<Trivia>,
        trailing_trivia: Vec<Trivia>,
    },
    Token {
        span: Span,
        rule: String,
        text: String,
        leading_trivia: Vec<Trivia>,
        trailing_trivia: Vec<Trivia>,
    },
    Error {
        span: Span,
        skipped_text: String,
        expected: String,
        leading_trivia: Vec<Trivia>,
        trailing_trivia: Vec<Trivia>,
    },
}

impl CstNode {
    pub fn span(&self) -> Span {
        match self {
            CstNode::Terminal { span, .. }
            | CstNode::NonTerminal { span, .. }
            | CstNode::Token { span, .. }
            | CstNode::Error { span, .. } => *span,
        }
    }

    /// The rule name, or the `<error>` sentinel for error nodes.
    pub fn rule_name(&self) -> &str {
        match self {
            CstNode::Terminal { rule, .. } | CstNode::NonTerminal { rule, .. } | CstNode::Token { rule, .. } => rule,
            CstNode::Error { .. } => ERROR_RULE_NAME,
        }
    }

    pub fn leading_trivia(&self) -> &[Trivia] {
        match self {
            CstNode::Terminal { leading_trivia, .. }
            | CstNode::NonTerminal { leading_trivia, .. }
            | CstNode::Token { leading_trivia, .. }
            | CstNode::Error { leading_trivia, .. } => leading_trivia,
        }
    }

    pub fn trailing_trivia(&self) -> &[Trivia] {
        match self {
            CstNode::Terminal { trailing_trivia, .. }
            | CstNode::NonTerminal { trailing_trivia, .. }
            | CstNode::Token { trailing_trivia, .. }
            | CstNode::Error { trailing_trivia, .. } => trailing_trivia,
        }
    }

    pub fn children(&self) -> &[CstNode] {
        match self {
            CstNode::NonTerminal { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CstNode::Error { .. })
    }

    /// Re-derive the exact source text this node (including its trivia)
    /// covers, by walking children and trivia in document order. Used by
    /// the round-trip property test.
    pub fn reconstitute(&self) -> String {
        let mut out = String::new();
        for t in self.leading_trivia() {
            out.push_str(t.text());
        }
        match self {
            CstNode::Terminal { text, .. } | CstNode::Token { text, .. } => out.push_str(text),
            CstNode::Error { skipped_text, .. } => out.push_str(skipped_text),
            CstNode::NonTerminal { children, .. } => {
                for child in children {
                    out.push_str(&child.reconstitute());
                }
            }
        }
        for t in self.trailing_trivia() {
            out.push_str(t.text());
        }
        out
    }

    /// Count of `CstNode::Error` nodes anywhere in this tree, used to check
    /// the cascade-bound invariant.
    pub fn error_count(&self) -> usize {
        let mut count = if self.is_error() { 1 } else { 0 };
        for child in self.children() {
            count += child.error_count();
        }
        count
    }
}

/// The tag half of a bit-packed rowan `SyntaxKind`: the high 4 bits identify
/// the node/token category, the low 12 bits (see [`RULE_MASK`]) identify
/// which grammar rule produced it. This lets a single `#[repr(u16)]`-shaped
/// rowan kind represent a data-driven, not compile-time-closed, set of rule
/// names — grammars are loaded at runtime, unlike a fixed-language parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum NodeTag {
    Terminal = 0,
    NonTerminal = 1,
    Token = 2,
    Error = 3,
    Whitespace = 4,
    LineComment = 5,
    BlockComment = 6,
    Eof = 7,
}

const RULE_BITS: u16 = 12;
pub const RULE_MASK: u16 = (1 << RULE_BITS) - 1;

impl NodeTag {
    fn from_u16(raw: u16) -> Self {
        match raw {
            0 => NodeTag::Terminal,
            1 => NodeTag::NonTerminal,
            2 => NodeTag::Token,
            3 => NodeTag::Error,
            4 => NodeTag::Whitespace,
            5 => NodeTag::LineComment,
            6 => NodeTag::BlockComment,
            _ => NodeTag::Eof,
        }
    }
}

/// A rowan `SyntaxKind` newtype packing [`NodeTag`] and a grammar-assigned
/// rule id into a single `u16`, as rowan's green tree requires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyntaxKind(pub u16);

impl SyntaxKind {
    pub fn new(tag: NodeTag, rule_id: u16) -> Self {
        debug_assert!(rule_id <= RULE_MASK, "rule id overflows the 12 bits reserved for it");
        Self(((tag as u16) << RULE_BITS) | (rule_id & RULE_MASK))
    }

    pub fn tag(self) -> NodeTag {
        NodeTag::from_u16(self.0 >> RULE_BITS)
    }

    pub fn rule_id(self) -> u16 {
        self.0 & RULE_MASK
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        rowan::SyntaxKind(kind.0)
    }
}

pub fn syntax_kind_from_raw(raw: rowan::SyntaxKind) -> SyntaxKind {
    SyntaxKind(raw.0)
}

/// The rowan language tag for Peggy's lossless syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeggyLanguage {}

impl rowan::Language for PeggyLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        syntax_kind_from_raw(raw)
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<PeggyLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<PeggyLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<PeggyLanguage>;

/// Build a rowan `GreenNode` view of a `CstNode` tree. `rule_id` assigns
/// each rule name the dense integer id it was given at grammar-compile time
/// (see `peggy-engine::CompiledGrammar`), so the same ids back both the
/// packrat cache and this tree.
pub fn to_green(root: &CstNode, rule_id: &dyn Fn(&str) -> u16) -> rowan::GreenNode {
    let mut builder = GreenNodeBuilder::new();
    build_green(&mut builder, root, rule_id);
    builder.finish()
}

fn build_green(builder: &mut GreenNodeBuilder<'static>, node: &CstNode, rule_id: &dyn Fn(&str) -> u16) {
    for trivia in node.leading_trivia() {
        push_trivia(builder, trivia);
    }
    match node {
        CstNode::Terminal { rule, text, .. } => {
            let kind = SyntaxKind::new(NodeTag::Terminal, rule_id(rule));
            builder.token(kind.into(), text);
        }
        CstNode::Token { rule, text, .. } => {
            let kind = SyntaxKind::new(NodeTag::Token, rule_id(rule));
            builder.token(kind.into(), text);
        }
        CstNode::Error { skipped_text, .. } => {
            let kind = SyntaxKind::new(NodeTag::Error, 0);
            builder.token(kind.into(), skipped_text);
        }
        CstNode::NonTerminal { rule, children, .. } => {
            let kind = SyntaxKind::new(NodeTag::NonTerminal, rule_id(rule));
            builder.start_node(kind.into());
            for child in children {
                build_green(builder, child, rule_id);
            }
            builder.finish_node();
        }
    }
    for trivia in node.trailing_trivia() {
        push_trivia(builder, trivia);
    }
}

fn push_trivia(builder: &mut GreenNodeBuilder<'static>, trivia: &Trivia) {
    let tag = match trivia {
        Trivia::Whitespace { .. } => NodeTag::Whitespace,
        Trivia::LineComment { .. } => NodeTag::LineComment,
        Trivia::BlockComment { .. } => NodeTag::BlockComment,
    };
    builder.token(SyntaxKind::new(tag, 0).into(), trivia.text());
}

#[cfg(test)]
mod tests {
    use peggy_span::Location;

    use super::*;

    fn span(a: usize, b: usize) -> Span {
        Span::new(Location::new(1, a as u32 + 1, a), Location::new(1, b as u32 + 1, b))
    }

    #[test]
    fn round_trip_reconstitutes_input() {
        let node = CstNode::NonTerminal {
            span: span(2, 4),
            rule: "Number".into(),
            children: vec![],
            leading_trivia: vec![Trivia::Whitespace { span: span(0, 2), text: "  ".into() }],
            trailing_trivia: vec![Trivia::Whitespace { span: span(4, 6), text: "  ".into() }],
        };
        // A NonTerminal with no children still round-trips via its trivia only
        // in this unit test; the engine never emits an empty NonTerminal.
        assert_eq!(node.reconstitute(), "    ");
    }

    #[test]
    fn syntax_kind_round_trips_tag_and_rule_id() {
        let kind = SyntaxKind::new(NodeTag::NonTerminal, 42);
        assert_eq!(kind.tag(), NodeTag::NonTerminal);
        assert_eq!(kind.rule_id(), 42);
    }

    #[test]
    fn error_count_sums_nested_errors() {
        let error = CstNode::Error {
            span: span(0, 1),
            skipped_text: "@".into(),
            expected: "identifier".into(),
            leading_trivia: vec![],
            trailing_trivia: vec![],
        };
        let parent = CstNode::NonTerminal {
            span: span(0, 1),
            rule: "List".into(),
            children: vec![error],
            leading_trivia: vec![],
            trailing_trivia: vec![],
        };
        assert_eq!(parent.error_count(), 1);
    }
}
