//! A small hand-written tokenizer for the grammar meta-language (§4.1's
//! `grammar: (NEWLINE | rule)* ENDMARKER` BNF dialect). This is deliberately
//! independent of `pycst-lexer`: the meta-language is not Python and needs
//! none of Python's indentation or f-string machinery.

use crate::error::{GrammarParseError, MetaPos};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaTok {
    Name(String),
    /// A quoted literal, already unescaped (the grammar's own keyword or
    /// operator spelling, e.g. `if` or `+=`).
    String(String),
    Colon,
    Pipe,
    Plus,
    Star,
    LPar,
    RPar,
    LSqb,
    RSqb,
    Newline,
    Endmarker,
}

pub struct MetaToken {
    pub tok: MetaTok,
    pub pos: MetaPos,
}

pub struct MetaLexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> MetaLexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 0,
        }
    }

    pub fn tokenize(src: &'a str) -> Result<Vec<MetaToken>, GrammarParseError> {
        let mut lexer = Self::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let done = tok.tok == MetaTok::Endmarker;
            out.push(tok);
            if done {
                break;
            }
        }
        Ok(out)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn here(&self) -> MetaPos {
        MetaPos {
            line: self.line,
            column: self.col,
        }
    }

    fn next_token(&mut self) -> Result<MetaToken, GrammarParseError> {
        loop {
            match self.peek() {
                None => {
                    return Ok(MetaToken {
                        tok: MetaTok::Endmarker,
                        pos: self.here(),
                    })
                }
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.bump();
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'\n') => {
                    let pos = self.here();
                    self.bump();
                    return Ok(MetaToken {
                        tok: MetaTok::Newline,
                        pos,
                    });
                }
                Some(_) => break,
            }
        }

        let pos = self.here();
        let b = self.peek().unwrap();
        match b {
            b':' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::Colon,
                    pos,
                })
            }
            b'|' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::Pipe,
                    pos,
                })
            }
            b'+' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::Plus,
                    pos,
                })
            }
            b'*' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::Star,
                    pos,
                })
            }
            b'(' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::LPar,
                    pos,
                })
            }
            b')' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::RPar,
                    pos,
                })
            }
            b'[' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::LSqb,
                    pos,
                })
            }
            b']' => {
                self.bump();
                Ok(MetaToken {
                    tok: MetaTok::RSqb,
                    pos,
                })
            }
            b'\'' | b'"' => self.scan_string(pos, b),
            _ if b.is_ascii_alphabetic() || b == b'_' => Ok(self.scan_name(pos)),
            _ => Err(GrammarParseError::new(
                format!("unexpected character {:?}", b as char),
                pos,
            )),
        }
    }

    fn scan_name(&mut self, pos: MetaPos) -> MetaToken {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.bump();
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos])
            .unwrap()
            .to_string();
        MetaToken {
            tok: MetaTok::Name(text),
            pos,
        }
    }

    fn scan_string(&mut self, pos: MetaPos, quote: u8) -> Result<MetaToken, GrammarParseError> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(GrammarParseError::new("unterminated string literal", pos)),
                Some(b) if b == quote => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'\\') => value.push('\\'),
                    Some(other) if other == quote => value.push(quote as char),
                    Some(other) => value.push(other as char),
                    None => return Err(GrammarParseError::new("unterminated string literal", pos)),
                },
                Some(b) => value.push(b as char),
            }
        }
        Ok(MetaToken {
            tok: MetaTok::String(value),
            pos,
        })
    }
}
