//! Tokenizer integration tests over small, whole Python snippets (as
//! opposed to the single-construct unit tests in `src/lib.rs`).

use pycst_common::token::TokenKind;
use pycst_lexer::Lexer;

/// `prefix + text`, concatenated across every token in source order,
/// must reproduce the source exactly (spec.md §8 invariant 1/2).
fn reconstruct(source: &str) -> String {
    Lexer::tokenize(source)
        .iter()
        .map(|t| format!("{}{}", t.prefix, t.text))
        .collect()
}

#[test]
fn round_trips_a_small_function() {
    let source = "def add(a, b):\n    return a + b\n";
    assert_eq!(reconstruct(source), source);
}

#[test]
fn round_trips_blank_lines_and_comments() {
    let source = "# header\n\nx = 1  # trailing\n\n\ny = 2\n";
    assert_eq!(reconstruct(source), source);
}

#[test]
fn round_trips_nested_indentation() {
    let source = "if a:\n    if b:\n        x = 1\n    else:\n        x = 2\n";
    assert_eq!(reconstruct(source), source);
    let tokens = Lexer::tokenize(source);
    let indents = tokens.iter().filter(|t| t.kind == TokenKind::Indent).count();
    let dedents = tokens.iter().filter(|t| t.kind == TokenKind::Dedent).count();
    assert_eq!(indents, dedents);
}

#[test]
fn round_trips_triple_quoted_strings_spanning_lines() {
    let source = "x = \"\"\"first\nsecond\nthird\"\"\"\n";
    assert_eq!(reconstruct(source), source);
    let tokens = Lexer::tokenize(source);
    assert!(tokens.iter().any(|t| t.kind == TokenKind::String && t.text.contains('\n')));
}

#[test]
fn round_trips_an_fstring_with_an_embedded_expression() {
    let source = "x = f\"hello {name!r:>10}\"\n";
    assert_eq!(reconstruct(source), source);
    let tokens = Lexer::tokenize(source);
    assert!(tokens.iter().any(|t| t.kind == TokenKind::FstringStart));
    assert!(tokens.iter().any(|t| t.kind == TokenKind::FstringEnd));
}

#[test]
fn round_trips_line_continuation_via_open_bracket() {
    let source = "x = (1 +\n     2)\n";
    assert_eq!(reconstruct(source), source);
    let tokens = Lexer::tokenize(source);
    assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Newline).count(), 1);
}

#[test]
fn round_trips_backslash_line_continuation() {
    let source = "x = 1 + \\\n    2\n";
    assert_eq!(reconstruct(source), source);
}

#[test]
fn unrecognized_byte_becomes_an_error_token_without_aborting() {
    let source = "x = 1 $ 2\n";
    let tokens = Lexer::tokenize(source);
    assert!(tokens.iter().any(|t| t.kind == TokenKind::ErrorToken));
    assert_eq!(reconstruct(source), source);
}

#[test]
fn always_ends_with_an_endmarker() {
    let tokens = Lexer::tokenize("x = 1\n");
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Endmarker);
}
