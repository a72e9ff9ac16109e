//! `SyntaxKind` for the pycst CST.
//!
//! Unlike a single fixed-grammar compiler, a grammar here is a runtime
//! input (spec.md §6: grammar text is loaded per Python version), so the
//! set of node kinds cannot be a compile-time enum the way the teacher's
//! `SyntaxKind` is. Instead `SyntaxKind` is a `u16` newtype: values below
//! [`FIRST_NONTERMINAL`] are fixed token/trivia kinds known at compile
//! time; values at or above it are nonterminal numbers assigned by
//! `pycst_grammar::Grammar` when a grammar is built, using the exact same
//! `256 + index` convention pgen2 uses for its own `symbol2number` table —
//! so a `pycst_grammar::NonterminalId` converts losslessly into a
//! `SyntaxKind`.

use pycst_common::token::TokenKind;
use pycst_grammar::{NonterminalId, FIRST_NONTERMINAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyntaxKind(pub u16);

#[allow(non_upper_case_globals)]
impl SyntaxKind {
    pub const TOMBSTONE: SyntaxKind = SyntaxKind(0);
    pub const NAME: SyntaxKind = SyntaxKind(1);
    pub const NUMBER: SyntaxKind = SyntaxKind(2);
    pub const STRING: SyntaxKind = SyntaxKind(3);
    pub const FSTRING_START: SyntaxKind = SyntaxKind(4);
    pub const FSTRING_STRING: SyntaxKind = SyntaxKind(5);
    pub const FSTRING_END: SyntaxKind = SyntaxKind(6);
    pub const NEWLINE: SyntaxKind = SyntaxKind(7);
    pub const INDENT: SyntaxKind = SyntaxKind(8);
    pub const DEDENT: SyntaxKind = SyntaxKind(9);
    pub const ERROR_DEDENT: SyntaxKind = SyntaxKind(10);
    pub const OP: SyntaxKind = SyntaxKind(11);
    pub const ERRORTOKEN: SyntaxKind = SyntaxKind(12);
    pub const ENDMARKER: SyntaxKind = SyntaxKind(13);
    /// A run of whitespace/comment/continuation trivia, modeled as its own
    /// leaf sibling rather than an owned field on the following token (the
    /// prefix decision recorded in SPEC_FULL.md §3).
    pub const WHITESPACE: SyntaxKind = SyntaxKind(14);
    pub const COMMENT: SyntaxKind = SyntaxKind(15);
    /// Wraps tokens collected during error recovery that don't reduce to
    /// any grammar rule (spec.md §7's `error_node`).
    pub const ERROR_NODE: SyntaxKind = SyntaxKind(16);
    /// A single token error recovery couldn't even group (`error_leaf`).
    pub const ERROR_LEAF: SyntaxKind = SyntaxKind(17);

    pub fn is_nonterminal(self) -> bool {
        self.0 >= FIRST_NONTERMINAL
    }

    pub fn is_trivia(self) -> bool {
        matches!(self, SyntaxKind::WHITESPACE | SyntaxKind::COMMENT)
    }
}

impl From<NonterminalId> for SyntaxKind {
    fn from(id: NonterminalId) -> Self {
        SyntaxKind(id.0)
    }
}

impl From<TokenKind> for SyntaxKind {
    fn from(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Name => SyntaxKind::NAME,
            TokenKind::Number => SyntaxKind::NUMBER,
            TokenKind::String => SyntaxKind::STRING,
            TokenKind::FstringStart => SyntaxKind::FSTRING_START,
            TokenKind::FstringString => SyntaxKind::FSTRING_STRING,
            TokenKind::FstringEnd => SyntaxKind::FSTRING_END,
            TokenKind::Newline => SyntaxKind::NEWLINE,
            TokenKind::Indent => SyntaxKind::INDENT,
            TokenKind::Dedent => SyntaxKind::DEDENT,
            TokenKind::ErrorDedent => SyntaxKind::ERROR_DEDENT,
            TokenKind::Op => SyntaxKind::OP,
            TokenKind::ErrorToken => SyntaxKind::ERRORTOKEN,
            TokenKind::Endmarker => SyntaxKind::ENDMARKER,
        }
    }
}
