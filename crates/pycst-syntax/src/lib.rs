//! Python CST parser: turns a grammar-driven token stream into a lossless
//! concrete syntax tree (CST) using the `rowan` library. The CST preserves
//! every token including whitespace and comments (as trivia siblings), so
//! `node.text()` reproduces the source byte-for-byte.

pub mod cst;
pub mod error;
mod parser;
pub mod syntax_kind;
mod trivia;

pub use cst::{SyntaxElement, SyntaxNode, SyntaxNodeExt, SyntaxToken, SyntaxTokenExt};
pub use error::{ParseError, ParseFailure};
pub use parser::Parser;
pub use syntax_kind::SyntaxKind;

use pycst_common::span::LineIndex;
use pycst_grammar::{Grammar, NonterminalId};

/// Fixed names for the token/trivia/error kinds below
/// [`pycst_grammar::FIRST_NONTERMINAL`], mirroring pgen2's own terminal
/// names (so `"NAME"`, not a made-up spelling).
fn fixed_kind_name(kind: SyntaxKind) -> &'static str {
    match kind {
        SyntaxKind::TOMBSTONE => "TOMBSTONE",
        SyntaxKind::NAME => "NAME",
        SyntaxKind::NUMBER => "NUMBER",
        SyntaxKind::STRING => "STRING",
        SyntaxKind::FSTRING_START => "FSTRING_START",
        SyntaxKind::FSTRING_STRING => "FSTRING_STRING",
        SyntaxKind::FSTRING_END => "FSTRING_END",
        SyntaxKind::NEWLINE => "NEWLINE",
        SyntaxKind::INDENT => "INDENT",
        SyntaxKind::DEDENT => "DEDENT",
        SyntaxKind::ERROR_DEDENT => "ERROR_DEDENT",
        SyntaxKind::OP => "OP",
        SyntaxKind::ERRORTOKEN => "ERRORTOKEN",
        SyntaxKind::ENDMARKER => "ENDMARKER",
        SyntaxKind::WHITESPACE => "WHITESPACE",
        SyntaxKind::COMMENT => "COMMENT",
        SyntaxKind::ERROR_NODE => "error_node",
        SyntaxKind::ERROR_LEAF => "error_leaf",
        _ => "UNKNOWN",
    }
}

/// Options accepted by [`GrammarExt::parse`], mirroring spec.md §6's
/// `Grammar.parse(code, *, error_recovery, start_symbol, ...)`. The cache
/// and diff-cache knobs live one layer up, in `pycst-cache`/`pycst-diff`;
/// this crate only knows how to run one full parse.
#[derive(Debug, Clone)]
pub struct ParseOptions<'a> {
    pub error_recovery: bool,
    pub start_symbol: &'a str,
}

impl Default for ParseOptions<'static> {
    fn default() -> Self {
        Self {
            error_recovery: true,
            start_symbol: "file_input",
        }
    }
}

/// Extension seam a facade crate calls into, since `pycst-grammar` cannot
/// depend on `pycst-syntax` (that would be circular) but `Grammar::parse`
/// is spec.md §6's public entry point.
pub trait GrammarExt {
    fn parse(&self, code: &str, opts: ParseOptions) -> Result<Parse, ParseFailure>;

    /// Walk `root` for `error_node`/`error_leaf` nodes, per spec.md §4.7 /
    /// §6. `line_index` must be built from the same source `root` was
    /// parsed from, to translate rowan's byte offsets into `Position`s.
    fn iter_errors(&self, root: &SyntaxNode, line_index: &LineIndex) -> Vec<error::Issue>;

    /// `Node.type` / a leaf's kind name from spec.md §6: the grammar rule
    /// name for a nonterminal kind, or the fixed terminal name otherwise.
    fn kind_name(&self, kind: SyntaxKind) -> String;
}

impl GrammarExt for Grammar {
    fn parse(&self, code: &str, opts: ParseOptions) -> Result<Parse, ParseFailure> {
        let start = self
            .name_to_nonterminal
            .get(opts.start_symbol)
            .copied()
            .unwrap_or(self.start);
        if opts.error_recovery && start != self.start {
            return Err(ParseFailure::NotImplemented(
                "error_recovery is not supported together with a non-default start_symbol".to_string(),
            ));
        }
        let tokens = pycst_lexer::Lexer::tokenize(code);
        let (green, errors) =
            Parser::with_start(self, start, opts.error_recovery).parse(tokens)?;
        Ok(Parse { green, errors })
    }

    fn iter_errors(&self, root: &SyntaxNode, line_index: &LineIndex) -> Vec<error::Issue> {
        root.descendants()
            .filter(|n| n.kind() == SyntaxKind::ERROR_NODE || n.kind() == SyntaxKind::ERROR_LEAF)
            .map(|n| {
                let range = n.text_range();
                error::Issue::new(
                    format!("{:?}", n.kind()),
                    line_index.position(range.start().into()),
                    line_index.position(range.end().into()),
                )
            })
            .collect()
    }

    fn kind_name(&self, kind: SyntaxKind) -> String {
        if kind.is_nonterminal() {
            self.nonterminal_name(NonterminalId(kind.0)).to_string()
        } else {
            fixed_kind_name(kind).to_string()
        }
    }
}

/// Result of parsing a Python source file.
///
/// Contains the green tree (the immutable, cheap-to-clone CST) and any
/// recoverable parse errors encountered along the way.
pub struct Parse {
    green: rowan::GreenNode,
    errors: Vec<ParseError>,
}

impl Parse {
    /// Build the syntax tree root from the green node.
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    /// Parse errors encountered during parsing.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Whether parsing completed without any recoverable errors.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse a Python source file into a CST under `grammar`.
///
/// Lexes `source` with `pycst-lexer`, then drives the table-driven parser
/// engine to build a rowan green tree. `error_recovery` controls whether a
/// malformed token is bundled into an `error_node`/`error_leaf` (per
/// spec.md §7) or raises [`ParseFailure::Syntax`] immediately.
pub fn parse(source: &str, grammar: &Grammar, error_recovery: bool) -> Result<Parse, ParseFailure> {
    let tokens = pycst_lexer::Lexer::tokenize(source);
    let (green, errors) = Parser::new(grammar, error_recovery).parse(tokens)?;
    Ok(Parse { green, errors })
}
