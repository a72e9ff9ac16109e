//! Parse error and issue types.
//!
//! Three error kinds per the error handling design: a recoverable
//! [`ParseError`] collected into the tree as `error_node`/`error_leaf`
//! (and surfaced through [`Issue`]/`iter_errors`), a fatal [`ParserSyntaxError`]
//! raised when `error_recovery` is disabled, and a fatal [`InternalParseError`]
//! that indicates a bug in the parser engine rather than bad input.
//!
//! Positions are `(line, column)` pairs rather than byte offsets: the parser
//! engine only ever sees [`pycst_common::token::Token`], which carries
//! `start_pos`/`end_pos`, not a byte span into the original source.

use std::fmt;

use pycst_common::span::Position;

/// A single recoverable parse error recorded while building the tree.
///
/// Parse errors carry the primary location where the problem was detected, a
/// human-readable message, and an optional related location for context
/// (e.g. "opened here" for a construct whose closing delimiter never
/// arrived).
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Start of the primary source location where the error was detected.
    pub start_pos: Position,
    /// End of the primary source location.
    pub end_pos: Position,
    /// Optional related location with context message.
    pub related: Option<(String, Position, Position)>,
}

impl ParseError {
    /// Create a new parse error with just a message and location.
    pub fn new(message: impl Into<String>, start_pos: Position, end_pos: Position) -> Self {
        Self {
            message: message.into(),
            start_pos,
            end_pos,
            related: None,
        }
    }

    /// Create a parse error with a related location for additional context.
    pub fn with_related(
        message: impl Into<String>,
        start_pos: Position,
        end_pos: Position,
        related_message: impl Into<String>,
        related_start: Position,
        related_end: Position,
    ) -> Self {
        Self {
            message: message.into(),
            start_pos,
            end_pos,
            related: Some((related_message.into(), related_start, related_end)),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// An issue surfaced by `Grammar::iter_errors`, walking the finished tree for
/// `error_node`/`error_leaf` nodes rather than being raised during parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub message: String,
    pub start_pos: Position,
    pub end_pos: Position,
}

impl Issue {
    pub fn new(message: impl Into<String>, start_pos: Position, end_pos: Position) -> Self {
        Self {
            message: message.into(),
            start_pos,
            end_pos,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Raised when `error_recovery = false` and the parser hits a token with no
/// transition in a non-final state. Carries the offending leaf's location.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserSyntaxError {
    pub message: String,
    pub start_pos: Position,
    pub end_pos: Position,
}

impl ParserSyntaxError {
    pub fn new(message: impl Into<String>, start_pos: Position, end_pos: Position) -> Self {
        Self {
            message: message.into(),
            start_pos,
            end_pos,
        }
    }
}

impl fmt::Display for ParserSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParserSyntaxError {}

/// Raised when the parser engine reaches a state that should be
/// unreachable given a well-formed grammar: a non-empty stack after
/// ENDMARKER, or a plan lookup for a token with no kind label. Indicates a
/// bug in the engine, not in the input program.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalParseError {
    pub message: String,
}

impl InternalParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for InternalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal parser error: {}", self.message)
    }
}

impl std::error::Error for InternalParseError {}

/// Everything `Parser::parse` can fail with: either kind is fatal and
/// terminates the parse immediately, unlike a recoverable [`ParseError`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    Syntax(ParserSyntaxError),
    Internal(InternalParseError),
    /// `error_recovery = true` combined with a non-default `start_symbol`
    /// (spec.md §9 Open Questions: the source gates this combination with
    /// a hard `NotImplemented` rather than defining its semantics, and
    /// this retains that gate).
    NotImplemented(String),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::Syntax(e) => write!(f, "{e}"),
            ParseFailure::Internal(e) => write!(f, "{e}"),
            ParseFailure::NotImplemented(msg) => write!(f, "not implemented: {msg}"),
        }
    }
}

impl std::error::Error for ParseFailure {}

impl From<ParserSyntaxError> for ParseFailure {
    fn from(e: ParserSyntaxError) -> Self {
        ParseFailure::Syntax(e)
    }
}

impl From<InternalParseError> for ParseFailure {
    fn from(e: InternalParseError) -> Self {
        ParseFailure::Internal(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_new() {
        let err = ParseError::new(
            "expected expression",
            Position::new(1, 5),
            Position::new(1, 10),
        );
        assert_eq!(err.message, "expected expression");
        assert_eq!(err.start_pos, Position::new(1, 5));
        assert_eq!(err.end_pos, Position::new(1, 10));
        assert!(err.related.is_none());
    }

    #[test]
    fn parse_error_with_related() {
        let err = ParseError::with_related(
            "unclosed bracket",
            Position::new(5, 0),
            Position::new(5, 3),
            "opened here",
            Position::new(1, 10),
            Position::new(1, 12),
        );
        assert_eq!(err.message, "unclosed bracket");
        let (msg, start, end) = err.related.unwrap();
        assert_eq!(msg, "opened here");
        assert_eq!(start, Position::new(1, 10));
        assert_eq!(end, Position::new(1, 12));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::new("unexpected token", Position::new(1, 0), Position::new(1, 1));
        assert_eq!(err.to_string(), "unexpected token");
    }

    #[test]
    fn parser_syntax_error_carries_position() {
        let err = ParserSyntaxError::new(
            "unexpected token",
            Position::new(1, 3),
            Position::new(1, 4),
        );
        assert_eq!(err.start_pos, Position::new(1, 3));
    }

    #[test]
    fn internal_parse_error_display_prefixed() {
        let err = InternalParseError::new("stack non-empty at ENDMARKER");
        assert_eq!(
            err.to_string(),
            "internal parser error: stack non-empty at ENDMARKER"
        );
    }
}
