//! Errors raised while compiling a grammar. All are build-time: per spec.md
//! §7, a grammar that fails to build never reaches the parser.

use std::fmt;

/// Where in the grammar source text an error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaPos {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for MetaPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Failure to parse the grammar meta-language text itself (malformed BNF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarParseError {
    pub message: String,
    pub pos: MetaPos,
}

impl GrammarParseError {
    pub fn new(message: impl Into<String>, pos: MetaPos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

impl fmt::Display for GrammarParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.pos)
    }
}

impl std::error::Error for GrammarParseError {}

/// Failure while turning parsed NFAs into grammar tables: left recursion,
/// ambiguous first sets, or (not expected once those two are excluded) a
/// reference to an undefined nonterminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarBuildError {
    /// A rule's first-set calculation recursed into itself unguarded
    /// (spec.md §3 invariant 1).
    LeftRecursion { rule: String },
    /// Two alternatives reachable from the same state share a first-set
    /// entry (spec.md §3 invariant 2).
    Ambiguity {
        rule: String,
        terminal: String,
        first_origin: String,
        second_origin: String,
    },
    /// A rule referenced a nonterminal with no matching rule definition.
    UndefinedNonterminal { rule: String, reference: String },
    /// The grammar meta-language text failed to parse.
    Parse(GrammarParseError),
}

impl fmt::Display for GrammarBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarBuildError::LeftRecursion { rule } => {
                write!(f, "left recursion for rule {rule:?}")
            }
            GrammarBuildError::Ambiguity {
                rule,
                terminal,
                first_origin,
                second_origin,
            } => write!(
                f,
                "rule {rule:?} is ambiguous: {terminal:?} is in the first set of \
                 {first_origin:?} as well as {second_origin:?}"
            ),
            GrammarBuildError::UndefinedNonterminal { rule, reference } => write!(
                f,
                "rule {rule:?} references undefined nonterminal {reference:?}"
            ),
            GrammarBuildError::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GrammarBuildError {}

impl From<GrammarParseError> for GrammarBuildError {
    fn from(e: GrammarParseError) -> Self {
        GrammarBuildError::Parse(e)
    }
}
