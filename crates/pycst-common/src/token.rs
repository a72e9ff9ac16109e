use serde::Serialize;

use crate::span::Position;

/// A token produced by the tokenizer, ready to be fed to the parser engine.
///
/// `prefix + text`, concatenated across every token in source order,
/// reproduces the original source byte-for-byte (spec.md §8 invariant 1/2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Box<str>,
    pub start_pos: Position,
    pub prefix: Box<str>,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        text: impl Into<Box<str>>,
        start_pos: Position,
        prefix: impl Into<Box<str>>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start_pos,
            prefix: prefix.into(),
        }
    }

    /// End position, accounting for embedded newlines in multi-line tokens
    /// (triple-quoted strings, f-strings spanning lines).
    pub fn end_pos(&self) -> Position {
        let mut line = self.start_pos.line;
        let mut last_newline_at = None;
        for (i, b) in self.text.bytes().enumerate() {
            if b == b'\n' {
                line += 1;
                last_newline_at = Some(i + 1);
            }
        }
        let column = match last_newline_at {
            Some(offset) => (self.text.len() - offset) as u32,
            None => self.start_pos.column + self.text.len() as u32,
        };
        Position::new(line, column)
    }
}

/// The fixed vocabulary of token kinds the tokenizer can produce.
///
/// Mirrors the closed enum spec.md §3 demands: `NAME`/`OP` additionally carry
/// a reserved-word identity, resolved by the parser engine against a
/// grammar's `reserved_strings` table rather than encoded here — this enum
/// only distinguishes the lexical *shape* of a token, not its grammar role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    /// An identifier or keyword spelling (`foo`, `if`, `class`). Keyword-ness
    /// is a grammar-table lookup, not a lexer decision.
    Name,
    /// A numeric literal (int, float, complex, with any base prefix or
    /// underscore separators), taken verbatim.
    Number,
    /// A non-f string literal, including any prefix (`r`, `b`, `rb`, …) and
    /// quote style (single, double, triple).
    String,
    /// Opening delimiter of an f-string: prefix + quote, e.g. `f"`, `rf'''`.
    FstringStart,
    /// A run of literal text inside an f-string, between expressions.
    FstringString,
    /// Closing quote of an f-string.
    FstringEnd,
    /// End of logical line (statement terminator). Not emitted for blank or
    /// continued lines.
    Newline,
    /// Synthetic token: indentation increased.
    Indent,
    /// Synthetic token: indentation decreased to match an enclosing level.
    Dedent,
    /// Synthetic token: indentation decreased but matches no enclosing
    /// level exactly.
    ErrorDedent,
    /// An operator or punctuation mark recognized by the operator table.
    Op,
    /// A single unrecognized character, emitted so the tokenizer never
    /// aborts on bad input.
    ErrorToken,
    /// End of input, after all pending DEDENTs have been emitted.
    Endmarker,
}

impl TokenKind {
    /// Whether this kind can carry a reserved-word/operator identity
    /// distinct from the generic NAME/OP label (spec.md §3).
    pub fn carries_reserved_identity(self) -> bool {
        matches!(self, TokenKind::Name | TokenKind::Op)
    }

    /// Whether this kind is one of the synthetic structural tokens the
    /// tokenizer synthesizes rather than reads directly off the input.
    pub fn is_synthetic(self) -> bool {
        matches!(
            self,
            TokenKind::Indent | TokenKind::Dedent | TokenKind::ErrorDedent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_new_constructor() {
        let tok = Token::new(TokenKind::Name, "foo", Position::new(1, 4), "  ");
        assert_eq!(tok.kind, TokenKind::Name);
        assert_eq!(&*tok.text, "foo");
        assert_eq!(tok.start_pos, Position::new(1, 4));
        assert_eq!(&*tok.prefix, "  ");
    }

    #[test]
    fn end_pos_single_line_token() {
        let tok = Token::new(TokenKind::Name, "hello", Position::new(1, 0), "");
        assert_eq!(tok.end_pos(), Position::new(1, 5));
    }

    #[test]
    fn end_pos_multiline_token() {
        let tok = Token::new(TokenKind::String, "\"\"\"a\nbc\"\"\"", Position::new(3, 4), "");
        // text is `"""a\nbc"""`: one embedded newline, 6 bytes after it.
        assert_eq!(tok.end_pos(), Position::new(4, 6));
    }

    #[test]
    fn carries_reserved_identity_only_for_name_and_op() {
        assert!(TokenKind::Name.carries_reserved_identity());
        assert!(TokenKind::Op.carries_reserved_identity());
        assert!(!TokenKind::String.carries_reserved_identity());
        assert!(!TokenKind::Newline.carries_reserved_identity());
    }

    #[test]
    fn is_synthetic_covers_indent_dedent_family() {
        assert!(TokenKind::Indent.is_synthetic());
        assert!(TokenKind::Dedent.is_synthetic());
        assert!(TokenKind::ErrorDedent.is_synthetic());
        assert!(!TokenKind::Newline.is_synthetic());
        assert!(!TokenKind::Endmarker.is_synthetic());
    }
}
