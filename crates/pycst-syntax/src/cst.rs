//! Rowan-based concrete syntax tree types.
//!
//! Defines the `PyLanguage` marker type that connects [`SyntaxKind`] to
//! rowan's generic tree infrastructure, plus type aliases for convenience
//! and the `prefix()`/`start_pos()`/`end_pos()` accessors that recover
//! spec-shaped positions from rowan's plain byte-offset tree.

use pycst_common::span::{LineIndex, Position};

use crate::syntax_kind::SyntaxKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PyLanguage {}

impl rowan::Language for PyLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        SyntaxKind(raw.0)
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind.0)
    }
}

/// A CST node (interior node with children).
pub type SyntaxNode = rowan::SyntaxNode<PyLanguage>;

/// A CST token (leaf node with text).
pub type SyntaxToken = rowan::SyntaxToken<PyLanguage>;

/// Either a node or a token in the CST.
pub type SyntaxElement = rowan::SyntaxElement<PyLanguage>;

/// Position and prefix accessors layered on top of rowan's raw byte-range
/// tree (spec.md §6 `SyntaxToken::start_pos()/end_pos()/prefix()`).
pub trait SyntaxTokenExt {
    /// The concatenated text of every immediately preceding trivia sibling
    /// (whitespace runs, comments) -- the `prefix` spec.md attaches to each
    /// token, recovered as a derived view rather than stored per-token
    /// (SPEC_FULL.md §3).
    fn prefix(&self) -> String;
    fn start_pos(&self, line_index: &LineIndex) -> Position;
    fn end_pos(&self, line_index: &LineIndex) -> Position;
}

impl SyntaxTokenExt for SyntaxToken {
    fn prefix(&self) -> String {
        let mut parts = Vec::new();
        let mut cur = self.prev_sibling_or_token();
        while let Some(elem) = cur {
            match elem.as_token() {
                Some(tok) if tok.kind().is_trivia() => {
                    parts.push(tok.text().to_string());
                    cur = tok.prev_sibling_or_token();
                }
                _ => break,
            }
        }
        parts.reverse();
        parts.concat()
    }

    fn start_pos(&self, line_index: &LineIndex) -> Position {
        line_index.position(self.text_range().start().into())
    }

    fn end_pos(&self, line_index: &LineIndex) -> Position {
        line_index.position(self.text_range().end().into())
    }
}

/// `Node.get_code()` from spec.md §6: the exact source text this node
/// spans, trivia included, so re-parsing it in isolation reproduces the
/// same bytes.
pub trait SyntaxNodeExt {
    fn get_code(&self) -> String;
}

impl SyntaxNodeExt for SyntaxNode {
    fn get_code(&self) -> String {
        self.text().to_string()
    }
}
