//! Splits a token's accumulated prefix into trivia runs.
//!
//! The lexer hands every token a single `prefix: Box<str>` string (spaces,
//! comments, backslash-continuations, blank lines, all folded together). The
//! tree builder explodes that string into alternating `WHITESPACE`/`COMMENT`
//! leaves so they become real siblings in the rowan tree, and
//! `SyntaxTokenExt::prefix()` walks them back into one string on demand.
//!
//! Grounded on `prefix.py`'s category split (comment / backslash / newline /
//! form-feed / spacing / BOM), collapsed to the two trivia kinds this CST's
//! `SyntaxKind` vocabulary carries -- every non-comment category (spacing,
//! line continuations, blank-line newlines, form-feeds, BOM) folds into a
//! single WHITESPACE run.

use crate::syntax_kind::SyntaxKind;

/// Split `prefix` into `(kind, text)` runs in source order. `kind` is always
/// `WHITESPACE` or `COMMENT`. Adjacent same-kind text never appears twice in
/// a row except across a comment (a comment run always ends at a line
/// ending, never consuming it).
pub(crate) fn split_prefix(prefix: &str) -> Vec<(SyntaxKind, String)> {
    let mut parts = Vec::new();
    let mut spacing = String::new();
    let mut chars = prefix.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c == '#' {
            if !spacing.is_empty() {
                parts.push((SyntaxKind::WHITESPACE, std::mem::take(&mut spacing)));
            }
            let mut comment = String::new();
            while let Some(&c2) = chars.peek() {
                if c2 == '\n' || c2 == '\r' {
                    break;
                }
                comment.push(c2);
                chars.next();
            }
            parts.push((SyntaxKind::COMMENT, comment));
        } else {
            spacing.push(c);
            chars.next();
        }
    }

    if !spacing.is_empty() {
        parts.push((SyntaxKind::WHITESPACE, spacing));
    }

    parts
}
