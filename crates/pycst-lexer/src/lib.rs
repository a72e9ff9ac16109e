//! Python tokenizer (`TK`): indentation tracking, line continuations,
//! triple-quoted and f-string literals, and an operator table matched
//! greedily longest-first. Never aborts on bad input -- unrecognized bytes
//! become `ERRORTOKEN` and unterminated strings/brackets surface as
//! `ERRORTOKEN` at end of input.

mod cursor;

use std::collections::VecDeque;

use cursor::Cursor;
use pycst_common::span::Position;
use pycst_common::token::{Token, TokenKind};

/// Multi-character operators, longest first so a greedy scan never needs
/// backtracking once byte `n` fails to extend a match of length `n-1`.
const OPERATORS: &[&str] = &[
    "**=", "//=", "<<=", ">>=", "...", "!=", "->", ":=", "<=", ">=", "==", "**", "//", "<<", ">>",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "(", ")", "[", "]", "{", "}", ",", ":",
    ".", ";", "@", "=", "+", "-", "*", "/", "%", "&", "|", "^", "~", "<", ">",
];

fn match_operator(src: &str) -> Option<&'static str> {
    OPERATORS.iter().copied().find(|op| src.starts_with(op))
}

/// The nested state of an f-string currently being tokenized. F-strings can
/// nest (`f"{f'{x}'}"`), so this is a stack frame, not a single flag.
#[derive(Debug, Clone)]
enum FMode {
    /// Scanning literal text up to the next `{`/`}}` or the closing quote.
    Body { quote: char, triple: bool },
    /// Inside a `{expression}` substitution. `depth` counts brackets opened
    /// *within* the expression so a nested `}` doesn't end the substitution
    /// early. Once `:` is seen at `depth == 0`, `in_spec` flips and the rest
    /// of the substitution up to the closing `}` is scanned as a literal
    /// format spec (nested `{…}` inside a format spec is not re-tokenized,
    /// which keeps round-trip intact at the cost of not exposing it as
    /// separate tokens).
    Expr {
        depth: u32,
        quote: char,
        triple: bool,
        in_spec: bool,
    },
}

pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    /// Column-width stack for indentation; always starts at `[0]`.
    indents: Vec<u32>,
    /// Depth of open `(`/`[`/`{` at the top level (not inside an f-string
    /// expression, which tracks its own depth in `FMode::Expr`).
    paren_depth: u32,
    at_line_start: bool,
    prefix_buf: String,
    fstring_stack: Vec<FMode>,
    pending: VecDeque<Token>,
    done: bool,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut cursor = Cursor::new(source);
        let mut prefix_buf = String::new();
        // BOM is part of the first token's prefix, not a token of its own
        // (spec.md §8 S5).
        if source.starts_with('\u{feff}') {
            cursor.advance();
            prefix_buf.push('\u{feff}');
        }
        Self {
            cursor,
            indents: vec![0],
            paren_depth: 0,
            at_line_start: true,
            prefix_buf,
            fstring_stack: Vec::new(),
            pending: VecDeque::new(),
            done: false,
            line: 1,
            column: 0,
        }
    }

    pub fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source).collect()
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.cursor.advance()?;
        if c == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn take_prefix(&mut self) -> Box<str> {
        std::mem::take(&mut self.prefix_buf).into_boxed_str()
    }

    fn emit(&mut self, kind: TokenKind, text: impl Into<Box<str>>, start: Position) -> Token {
        let prefix = self.take_prefix();
        Token::new(kind, text, start, prefix)
    }

    fn emit_synthetic(&mut self, kind: TokenKind, start: Position) -> Token {
        let prefix = self.take_prefix();
        Token::new(kind, "", start, prefix)
    }

    // ── Indentation / logical-line boundary ─────────────────────────────

    /// Called when `at_line_start` and not inside brackets: skips blank and
    /// comment-only lines (folding them into `prefix_buf`), then compares
    /// the next real line's indentation against the stack, queuing any
    /// INDENT/DEDENT/ERROR_DEDENT tokens into `pending`.
    fn handle_line_start(&mut self) {
        loop {
            let ws_byte_start = self.prefix_buf.len();
            self.cursor_eat_indent_ws();
            let width = tab_expanded_width(&self.prefix_buf[ws_byte_start..]);

            match self.cursor.peek() {
                None => {
                    self.unwind_indents_to(0);
                    return;
                }
                Some('#') => {
                    self.consume_comment();
                    if self.consume_newline_into_prefix() {
                        continue;
                    }
                    self.unwind_indents_to(0);
                    return;
                }
                Some('\n') | Some('\r') => {
                    self.consume_newline_into_prefix();
                    continue;
                }
                Some('\\') if self.is_backslash_continuation() => {
                    self.advance();
                    self.consume_newline_into_prefix();
                    continue;
                }
                Some(_) => {
                    self.at_line_start = false;
                    self.adjust_indent(width);
                    return;
                }
            }
        }
    }

    /// Consume spaces/tabs/form-feeds at a logical-line start into the
    /// prefix buffer without interpreting them yet.
    fn cursor_eat_indent_ws(&mut self) {
        while matches!(self.cursor.peek(), Some(' ') | Some('\t') | Some('\x0c')) {
            let c = self.advance().unwrap();
            self.prefix_buf.push(c);
        }
    }

    fn consume_comment(&mut self) {
        while let Some(c) = self.cursor.peek() {
            if c == '\n' || c == '\r' {
                break;
            }
            self.advance();
            self.prefix_buf.push(c);
        }
    }

    /// Consumes a `\n` or `\r\n` into the prefix buffer. Returns `true` if a
    /// newline was consumed, `false` at EOF.
    fn consume_newline_into_prefix(&mut self) -> bool {
        match self.cursor.peek() {
            Some('\r') => {
                self.advance();
                self.prefix_buf.push('\r');
                if self.cursor.peek() == Some('\n') {
                    self.advance();
                    self.prefix_buf.push('\n');
                }
                true
            }
            Some('\n') => {
                self.advance();
                self.prefix_buf.push('\n');
                true
            }
            _ => false,
        }
    }

    fn is_backslash_continuation(&self) -> bool {
        matches!(self.cursor.peek_next(), Some('\n') | Some('\r'))
    }

    fn adjust_indent(&mut self, width: u32) {
        let top = *self.indents.last().unwrap();
        if width == top {
            return;
        }
        if width > top {
            self.indents.push(width);
            let start = self.pos();
            let tok = self.emit_synthetic(TokenKind::Indent, start);
            self.pending.push_back(tok);
            return;
        }
        while *self.indents.last().unwrap() > width {
            self.indents.pop();
            let start = self.pos();
            let tok = self.emit_synthetic(TokenKind::Dedent, start);
            self.pending.push_back(tok);
        }
        if *self.indents.last().unwrap() != width {
            let start = self.pos();
            let tok = self.emit_synthetic(TokenKind::ErrorDedent, start);
            self.pending.push_back(tok);
        }
    }

    fn unwind_indents_to(&mut self, width: u32) {
        while *self.indents.last().unwrap() > width {
            self.indents.pop();
            let start = self.pos();
            let tok = self.emit_synthetic(TokenKind::Dedent, start);
            self.pending.push_back(tok);
        }
        let start = self.pos();
        let tok = self.emit(TokenKind::Endmarker, "", start);
        self.pending.push_back(tok);
    }

    // ── Dispatch ──────────────────────────────────────────────────────

    fn produce(&mut self) -> Token {
        if self.at_line_start && self.paren_depth == 0 && self.fstring_stack.is_empty() {
            self.handle_line_start();
            if let Some(tok) = self.pending.pop_front() {
                return tok;
            }
        }

        match self.fstring_stack.last().cloned() {
            None => self.lex_normal(),
            Some(FMode::Body { quote, triple }) => self.lex_fstring_body(quote, triple),
            Some(FMode::Expr { in_spec: true, .. }) => self.lex_fstring_spec(),
            Some(FMode::Expr { .. }) => self.lex_fstring_expr(),
        }
    }

    fn lex_normal(&mut self) -> Token {
        loop {
            match self.cursor.peek() {
                Some(' ') | Some('\t') | Some('\x0c') => {
                    let c = self.advance().unwrap();
                    self.prefix_buf.push(c);
                }
                Some('\\') if self.is_backslash_continuation() => {
                    self.advance();
                    self.prefix_buf.push('\\');
                    self.consume_newline_into_prefix();
                }
                Some('#') => {
                    self.consume_comment();
                }
                _ => break,
            }
        }

        let start = self.pos();

        let Some(c) = self.cursor.peek() else {
            if self.indents.len() > 1 {
                self.unwind_indents_to(0);
                return self.pending.pop_front().unwrap();
            }
            return self.emit(TokenKind::Endmarker, "", start);
        };

        match c {
            '\n' | '\r' => {
                if self.paren_depth > 0 {
                    self.consume_newline_into_prefix();
                    self.lex_normal()
                } else {
                    let mut text = String::new();
                    if c == '\r' {
                        text.push(self.advance().unwrap());
                        if self.cursor.peek() == Some('\n') {
                            text.push(self.advance().unwrap());
                        }
                    } else {
                        text.push(self.advance().unwrap());
                    }
                    self.at_line_start = true;
                    self.emit(TokenKind::Newline, text, start)
                }
            }
            '0'..='9' => self.lex_number(start),
            '.' if self.cursor.peek_next().is_some_and(|n| n.is_ascii_digit()) => {
                self.lex_number(start)
            }
            c if is_string_prefix_start(c) => self.lex_name_or_string(start),
            c if is_ident_start(c) => self.lex_name(start),
            '"' | '\'' => self.lex_plain_string(start, None),
            '(' | '[' | '{' => {
                self.paren_depth += 1;
                self.lex_operator(start)
            }
            ')' | ']' | '}' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                self.lex_operator(start)
            }
            _ => self.lex_operator(start),
        }
    }

    fn lex_operator(&mut self, start: Position) -> Token {
        let rest = self.cursor.rest();
        if let Some(op) = match_operator(rest) {
            for _ in 0..op.chars().count() {
                self.advance();
            }
            self.emit(TokenKind::Op, op, start)
        } else {
            let c = self.advance().unwrap();
            let mut buf = [0u8; 4];
            self.emit(TokenKind::ErrorToken, c.encode_utf8(&mut buf) as &str, start)
        }
    }

    fn lex_name(&mut self, start: Position) -> Token {
        let byte_start = self.cursor.pos();
        self.advance();
        while self.cursor.peek().is_some_and(is_ident_continue) {
            self.advance();
        }
        let text = self.cursor.slice(byte_start, self.cursor.pos());
        self.emit(TokenKind::Name, text, start)
    }

    /// Dispatches identifiers that might be string prefixes (`r`, `b`, `u`,
    /// `f`, `rb`, `fr`, …) to either a plain name or a string/f-string start.
    fn lex_name_or_string(&mut self, start: Position) -> Token {
        let byte_start = self.cursor.pos();
        let mut prefix = String::new();
        // String prefixes are at most two letters (`rb`, `fr`, …); anything
        // longer can't be one, so the loop bound alone disambiguates.
        while self
            .cursor
            .peek()
            .is_some_and(|c| matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'u' | 'f'))
            && prefix.len() < 2
        {
            prefix.push(self.advance().unwrap());
        }
        match self.cursor.peek() {
            Some('"') | Some('\'') => {
                let is_f = prefix.to_ascii_lowercase().contains('f');
                if is_f {
                    self.lex_fstring_start(start, byte_start)
                } else {
                    self.lex_plain_string(start, Some(byte_start))
                }
            }
            _ => {
                // Not actually a string prefix; keep consuming as a normal
                // identifier from the start.
                while self.cursor.peek().is_some_and(is_ident_continue) {
                    self.advance();
                }
                let text = self.cursor.slice(byte_start, self.cursor.pos());
                self.emit(TokenKind::Name, text, start)
            }
        }
    }

    fn quote_kind(&mut self) -> (char, bool) {
        let quote = self.cursor.peek().unwrap();
        let triple = self.cursor.peek_next() == Some(quote) && self.peek_at(2) == Some(quote);
        (quote, triple)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.cursor.rest().chars().nth(n)
    }

    fn consume_quote(&mut self, quote: char, triple: bool) {
        self.advance();
        if triple {
            self.advance();
            self.advance();
        }
        let _ = quote;
    }

    fn lex_plain_string(&mut self, start: Position, prefix_byte_start: Option<u32>) -> Token {
        let byte_start = prefix_byte_start.unwrap_or_else(|| self.cursor.pos());
        let (quote, triple) = self.quote_kind();
        self.consume_quote(quote, triple);
        let mut terminated = false;
        loop {
            match self.cursor.peek() {
                None => break,
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(c) if c == quote => {
                    if !triple {
                        self.advance();
                        terminated = true;
                        break;
                    }
                    if self.cursor.peek_next() == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.advance();
                        self.advance();
                        self.advance();
                        terminated = true;
                        break;
                    }
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let text = self.cursor.slice(byte_start, self.cursor.pos());
        let kind = if terminated {
            TokenKind::String
        } else {
            TokenKind::ErrorToken
        };
        self.emit(kind, text, start)
    }

    fn lex_fstring_start(&mut self, start: Position, byte_start: u32) -> Token {
        let (quote, triple) = self.quote_kind();
        self.consume_quote(quote, triple);
        self.fstring_stack.push(FMode::Body { quote, triple });
        let text = self.cursor.slice(byte_start, self.cursor.pos());
        self.emit(TokenKind::FstringStart, text, start)
    }

    /// Scans literal f-string text until a `{` substitution opens, a literal
    /// `{{`/`}}` escape, or the closing quote is found.
    fn lex_fstring_body(&mut self, quote: char, triple: bool) -> Token {
        let start = self.pos();
        let byte_start = self.cursor.pos();
        loop {
            match self.cursor.peek() {
                None => {
                    self.fstring_stack.pop();
                    let text = self.cursor.slice(byte_start, self.cursor.pos());
                    if text.is_empty() {
                        return self.emit(TokenKind::ErrorToken, "", start);
                    }
                    return self.emit(TokenKind::FstringString, text, start);
                }
                Some('{') if self.cursor.peek_next() == Some('{') => {
                    self.advance();
                    self.advance();
                }
                Some('}') if self.cursor.peek_next() == Some('}') => {
                    self.advance();
                    self.advance();
                }
                Some('{') => break,
                Some(c) if c == quote => {
                    if !triple {
                        break;
                    }
                    if self.cursor.peek_next() == Some(quote) && self.peek_at(2) == Some(quote) {
                        break;
                    }
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        let text = self.cursor.slice(byte_start, self.cursor.pos());
        if !text.is_empty() {
            return self.emit(TokenKind::FstringString, text, start);
        }

        match self.cursor.peek() {
            Some('{') => {
                self.advance();
                // Push on top of, not instead of, the `Body` frame: once the
                // substitution's closing `}` pops this `Expr` frame, `Body`
                // must reappear so literal scanning can resume.
                self.fstring_stack.push(FMode::Expr {
                    depth: 0,
                    quote,
                    triple,
                    in_spec: false,
                });
                self.emit(TokenKind::Op, "{", start)
            }
            Some(q) if q == quote => {
                let byte_start = self.cursor.pos();
                self.consume_quote(quote, triple);
                self.fstring_stack.pop();
                let text = self.cursor.slice(byte_start, self.cursor.pos());
                self.emit(TokenKind::FstringEnd, text, start)
            }
            None => self.emit(TokenKind::ErrorToken, "", start),
            _ => unreachable!(),
        }
    }

    /// Scans literal format-spec text (after the `:` in a substitution) up
    /// to the closing `}`. A `{nested}` substitution inside a format spec is
    /// treated as literal text rather than re-tokenized (round-trip stays
    /// intact; it just isn't exposed as separate expression tokens).
    fn lex_fstring_spec(&mut self) -> Token {
        let start = self.pos();
        let byte_start = self.cursor.pos();
        while !matches!(self.cursor.peek(), None | Some('}')) {
            self.advance();
        }
        let text = self.cursor.slice(byte_start, self.cursor.pos());
        if !text.is_empty() {
            return self.emit(TokenKind::FstringString, text, start);
        }
        match self.cursor.peek() {
            Some('}') => {
                self.advance();
                self.fstring_stack.pop();
                self.emit(TokenKind::Op, "}", start)
            }
            _ => {
                self.fstring_stack.pop();
                self.emit(TokenKind::ErrorToken, "", start)
            }
        }
    }

    /// Tokenizes inside a `{expression}` substitution using the ordinary
    /// Python token rules, but watches for the unmatched `!`, `:`, `}` that
    /// close the substitution (spec.md §4.3: `!=` is the operator, not a
    /// conversion marker).
    fn lex_fstring_expr(&mut self) -> Token {
        while matches!(self.cursor.peek(), Some(' ') | Some('\t')) {
            let c = self.advance().unwrap();
            self.prefix_buf.push(c);
        }

        let start = self.pos();
        let Some(FMode::Expr { depth, .. }) = self.fstring_stack.last().cloned() else {
            unreachable!("lex_fstring_expr called outside an Expr frame")
        };

        match self.cursor.peek() {
            None => {
                self.fstring_stack.pop();
                self.emit(TokenKind::ErrorToken, "", start)
            }
            Some('(') | Some('[') | Some('{') => {
                self.bump_expr_depth(1);
                self.lex_operator(start)
            }
            Some(')') | Some(']') => {
                self.bump_expr_depth(-1);
                self.lex_operator(start)
            }
            Some('}') if depth == 0 => {
                self.advance();
                self.fstring_stack.pop();
                self.emit(TokenKind::Op, "}", start)
            }
            Some('}') => {
                self.bump_expr_depth(-1);
                self.lex_operator(start)
            }
            Some(':') if depth == 0 => {
                self.advance();
                if let Some(FMode::Expr { in_spec, .. }) = self.fstring_stack.last_mut() {
                    *in_spec = true;
                }
                self.emit(TokenKind::Op, ":", start)
            }
            Some('!') if depth == 0 && self.cursor.peek_next() != Some('=') => {
                self.advance();
                self.emit(TokenKind::Op, "!", start)
            }
            Some('"') | Some('\'') => self.lex_plain_string(start, None),
            c if c.is_some_and(is_ident_start) => {
                let start_byte = self.cursor.pos();
                self.advance();
                while self.cursor.peek().is_some_and(is_ident_continue) {
                    self.advance();
                }
                let text = self.cursor.slice(start_byte, self.cursor.pos());
                self.emit(TokenKind::Name, text, start)
            }
            Some(c) if c.is_ascii_digit() => self.lex_number(start),
            _ => self.lex_operator(start),
        }
    }

    /// Adjusts the bracket-nesting counter of the innermost `Expr` frame.
    /// The bracket character itself is consumed separately by `lex_operator`.
    fn bump_expr_depth(&mut self, delta: i32) {
        if let Some(FMode::Expr { depth, .. }) = self.fstring_stack.last_mut() {
            if delta > 0 {
                *depth += delta as u32;
            } else {
                *depth = depth.saturating_sub((-delta) as u32);
            }
        }
    }

    fn lex_number(&mut self, start: Position) -> Token {
        let byte_start = self.cursor.pos();
        let first = self.advance().unwrap();

        if first == '0' {
            match self.cursor.peek() {
                Some('x' | 'X') => {
                    self.advance();
                    self.eat_while_digits(|c| c.is_ascii_hexdigit());
                    return self.emit(
                        TokenKind::Number,
                        self.cursor.slice(byte_start, self.cursor.pos()),
                        start,
                    );
                }
                Some('b' | 'B') => {
                    self.advance();
                    self.eat_while_digits(|c| c == '0' || c == '1');
                    return self.emit(
                        TokenKind::Number,
                        self.cursor.slice(byte_start, self.cursor.pos()),
                        start,
                    );
                }
                Some('o' | 'O') => {
                    self.advance();
                    self.eat_while_digits(|c| ('0'..='7').contains(&c));
                    return self.emit(
                        TokenKind::Number,
                        self.cursor.slice(byte_start, self.cursor.pos()),
                        start,
                    );
                }
                _ => {}
            }
        }

        if first != '.' {
            self.eat_while_digits(|c| c.is_ascii_digit());
        }

        if self.cursor.peek() == Some('.') {
            self.advance();
            self.eat_while_digits(|c| c.is_ascii_digit());
        }

        if matches!(self.cursor.peek(), Some('e' | 'E'))
            && matches!(self.cursor.peek_next(), Some(c) if c.is_ascii_digit() || c == '+' || c == '-')
        {
            self.advance();
            if matches!(self.cursor.peek(), Some('+' | '-')) {
                self.advance();
            }
            self.eat_while_digits(|c| c.is_ascii_digit());
        }

        if matches!(self.cursor.peek(), Some('j' | 'J')) {
            self.advance();
        }

        self.emit(
            TokenKind::Number,
            self.cursor.slice(byte_start, self.cursor.pos()),
            start,
        )
    }

    fn eat_while_digits(&mut self, predicate: impl Fn(char) -> bool) {
        while self
            .cursor
            .peek()
            .is_some_and(|c| predicate(c) || c == '_')
        {
            self.advance();
        }
    }
}

/// Expands tabs to the next multiple of 8 for indentation-width comparison
/// (spec.md §4.3); the raw bytes are kept verbatim in the prefix regardless.
fn tab_expanded_width(ws: &str) -> u32 {
    let mut width = 0u32;
    for c in ws.chars() {
        match c {
            '\t' => width = (width / 8 + 1) * 8,
            '\x0c' => {}
            _ => width += 1,
        }
    }
    width
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_string_prefix_start(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'u' | 'f')
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(tok) = self.pending.pop_front() {
            if tok.kind == TokenKind::Endmarker {
                self.done = true;
            }
            return Some(tok);
        }
        if self.done {
            return None;
        }
        let tok = self.produce();
        if tok.kind == TokenKind::Endmarker {
            self.done = true;
        }
        Some(tok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_expression_statement() {
        assert_eq!(
            kinds("hello + 1\n"),
            vec![
                TokenKind::Name,
                TokenKind::Op,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Endmarker,
            ]
        );
    }

    #[test]
    fn round_trips_prefix_and_text() {
        let tokens = Lexer::tokenize("  x = 1\n");
        let reconstructed: String = tokens
            .iter()
            .map(|t| format!("{}{}", t.prefix, t.text))
            .collect();
        assert_eq!(reconstructed, "  x = 1\n");
    }

    #[test]
    fn indent_dedent_stack() {
        let src = "if x:\n    y = 1\nz = 2\n";
        let k = kinds(src);
        assert!(k.contains(&TokenKind::Indent));
        assert!(k.contains(&TokenKind::Dedent));
    }

    #[test]
    fn mismatched_dedent_emits_error_dedent() {
        let src = "if x:\n  if y:\n    z = 1\n z = 2\n";
        let k = kinds(src);
        assert!(k.contains(&TokenKind::ErrorDedent));
    }

    #[test]
    fn continuation_inside_brackets_suppresses_newline() {
        let tokens = Lexer::tokenize("(1,\n 2)\n");
        let k: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        // Only one NEWLINE: the one terminating the whole statement.
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn backslash_continuation_suppresses_newline() {
        let tokens = Lexer::tokenize("x = 1 + \\\n    2\n");
        let k: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(k.iter().filter(|k| **k == TokenKind::Newline).count(), 1);
    }

    #[test]
    fn triple_quoted_string_is_one_token() {
        let tokens = Lexer::tokenize("\"\"\"a\nb\"\"\"\n");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(&*tokens[0].text, "\"\"\"a\nb\"\"\"");
    }

    #[test]
    fn fstring_with_expression() {
        let k = kinds("f\"hello {name}!\"\n");
        assert_eq!(
            k,
            vec![
                TokenKind::FstringStart,
                TokenKind::FstringString,
                TokenKind::Op,   // {
                TokenKind::Name, // name
                TokenKind::Op,   // }
                TokenKind::FstringString,
                TokenKind::FstringEnd,
                TokenKind::Newline,
                TokenKind::Endmarker,
            ]
        );
    }

    #[test]
    fn fstring_not_equal_is_an_operator_not_a_conversion() {
        let k = kinds("f\"{a!=b}\"\n");
        assert!(k.contains(&TokenKind::Op));
        let tokens = Lexer::tokenize("f\"{a!=b}\"\n");
        let op_texts: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Op)
            .map(|t| &*t.text)
            .collect();
        assert!(op_texts.contains(&"!="));
    }

    #[test]
    fn unrecognized_character_becomes_error_token() {
        let k = kinds("x = $\n");
        assert!(k.contains(&TokenKind::ErrorToken));
    }

    #[test]
    fn unterminated_string_is_error_token_at_eof() {
        let tokens = Lexer::tokenize("x = \"abc");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Endmarker);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::ErrorToken));
        assert!(!tokens.iter().any(|t| t.kind == TokenKind::String));
    }

    #[test]
    fn bom_becomes_part_of_first_prefix() {
        let src = "\u{feff}foo = 1\n";
        let tokens = Lexer::tokenize(src);
        assert!(tokens[0].prefix.starts_with('\u{feff}'));
    }

    #[test]
    fn greedy_operator_matching_prefers_longest() {
        let tokens = Lexer::tokenize("a **= b\n");
        let op = tokens.iter().find(|t| t.kind == TokenKind::Op).unwrap();
        assert_eq!(&*op.text, "**=");
    }

    #[test]
    fn trailing_dedents_then_endmarker_at_eof() {
        let tokens = Lexer::tokenize("if x:\n    y = 1");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Endmarker);
        assert!(tokens
            .iter()
            .rev()
            .skip(1)
            .next()
            .is_some_and(|t| t.kind == TokenKind::Dedent));
    }
}
