//! Grammar parser (`GP`): turns grammar meta-language text into one NFA
//! fragment per rule via Thompson-style construction, grounded directly on
//! `_GrammarParser`/`NFAState` in pgen2's `pgen.py`.
//!
//! ```text
//! grammar: (NEWLINE | rule)* ENDMARKER
//! rule:    NAME ':' rhs NEWLINE
//! rhs:     alt ('|' alt)*
//! alt:     item+
//! item:    '[' rhs ']' | atom ('+' | '*')?
//! atom:    '(' rhs ')' | NAME | STRING
//! ```

use rustc_hash::FxHashMap;

use crate::error::GrammarParseError;
use crate::meta_lexer::{MetaLexer, MetaTok, MetaToken};

/// An arc label: either a bare rule/token name (`NAME`, `stmt`) or a quoted
/// literal (`"if"`, `"+="`). Distinguishing the two is deferred to table
/// construction, exactly as pgen2 defers `label[0].isalpha()` dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArcLabel {
    /// A bare identifier: either another rule name or a named token class.
    Name(String),
    /// A quoted literal spelling: a keyword or an operator/punctuation string.
    Literal(String),
}

/// One state of an NFA fragment. Arcs with `label: None` are epsilon
/// transitions. States live in a shared [`NfaArena`] and are referenced by
/// index rather than owned pointers, so fragments can share/merge states
/// freely during construction without fighting the borrow checker.
#[derive(Debug)]
pub struct NfaState {
    pub from_rule: String,
    pub arcs: Vec<(Option<ArcLabel>, usize)>,
}

/// Arena owning every NFA state produced while compiling a grammar. Kept
/// alive only for the duration of DFA construction (`dfa::build_dfa`
/// consumes slices of it); nothing here survives into the final `Grammar`.
#[derive(Debug, Default)]
pub struct NfaArena {
    states: Vec<NfaState>,
}

impl NfaArena {
    pub fn new_state(&mut self, from_rule: &str) -> usize {
        self.states.push(NfaState {
            from_rule: from_rule.to_string(),
            arcs: Vec::new(),
        });
        self.states.len() - 1
    }

    pub fn add_arc(&mut self, from: usize, to: usize, label: Option<ArcLabel>) {
        self.states[from].arcs.push((label, to));
    }

    pub fn state(&self, index: usize) -> &NfaState {
        &self.states[index]
    }
}

/// An NFA fragment: an entry and exit state. Concatenation, alternation,
/// and the repetition operators all operate on these pairs.
#[derive(Debug, Clone, Copy)]
struct Fragment {
    entry: usize,
    exit: usize,
}

/// Result of compiling grammar text: one NFA fragment per rule, the arena
/// backing them, and the name of the first rule encountered (the grammar's
/// start symbol, per pgen2's `start_symbol is None` bootstrapping).
pub struct ParsedGrammar {
    pub arena: NfaArena,
    pub rules: FxHashMap<String, Fragment>,
    pub rule_order: Vec<String>,
    pub start_symbol: String,
}

struct MetaParser<'a> {
    tokens: Vec<MetaToken>,
    idx: usize,
    arena: NfaArena,
    current_rule: String,
    _src: &'a str,
}

impl<'a> MetaParser<'a> {
    fn new(src: &'a str) -> Result<Self, GrammarParseError> {
        let tokens = MetaLexer::tokenize(src)?;
        Ok(Self {
            tokens,
            idx: 0,
            arena: NfaArena::default(),
            current_rule: String::new(),
            _src: src,
        })
    }

    fn cur(&self) -> &MetaTok {
        &self.tokens[self.idx].tok
    }

    fn pos(&self) -> crate::error::MetaPos {
        self.tokens[self.idx].pos
    }

    fn advance(&mut self) {
        if self.idx + 1 < self.tokens.len() {
            self.idx += 1;
        }
    }

    fn expect_colon(&mut self) -> Result<(), GrammarParseError> {
        if *self.cur() == MetaTok::Colon {
            self.advance();
            Ok(())
        } else {
            Err(GrammarParseError::new("expected ':'", self.pos()))
        }
    }

    fn expect_newline(&mut self) -> Result<(), GrammarParseError> {
        if *self.cur() == MetaTok::Newline {
            self.advance();
            Ok(())
        } else {
            Err(GrammarParseError::new("expected end of rule", self.pos()))
        }
    }

    fn parse(mut self) -> Result<ParsedGrammar, GrammarParseError> {
        let mut rules = FxHashMap::default();
        let mut rule_order = Vec::new();
        let mut start_symbol = None;

        loop {
            while *self.cur() == MetaTok::Newline {
                self.advance();
            }
            if *self.cur() == MetaTok::Endmarker {
                break;
            }

            let name = match self.cur().clone() {
                MetaTok::Name(n) => n,
                _ => return Err(GrammarParseError::new("expected rule name", self.pos())),
            };
            self.advance();
            self.expect_colon()?;
            self.current_rule = name.clone();

            let fragment = self.parse_rhs()?;
            self.expect_newline()?;

            if start_symbol.is_none() {
                start_symbol = Some(name.clone());
            }
            rule_order.push(name.clone());
            rules.insert(name, fragment);
        }

        let start_symbol = start_symbol
            .ok_or_else(|| GrammarParseError::new("grammar text defines no rules", self.pos()))?;

        Ok(ParsedGrammar {
            arena: self.arena,
            rules,
            rule_order,
            start_symbol,
        })
    }

    /// `rhs: alt ('|' alt)*`
    fn parse_rhs(&mut self) -> Result<Fragment, GrammarParseError> {
        let first = self.parse_alt()?;
        if *self.cur() != MetaTok::Pipe {
            return Ok(first);
        }

        let rule = self.current_rule.clone();
        let entry = self.arena.new_state(&rule);
        let exit = self.arena.new_state(&rule);
        self.arena.add_arc(entry, first.entry, None);
        self.arena.add_arc(first.exit, exit, None);

        while *self.cur() == MetaTok::Pipe {
            self.advance();
            let alt = self.parse_alt()?;
            self.arena.add_arc(entry, alt.entry, None);
            self.arena.add_arc(alt.exit, exit, None);
        }

        Ok(Fragment { entry, exit })
    }

    /// `alt: item+`
    fn parse_alt(&mut self) -> Result<Fragment, GrammarParseError> {
        let mut frag = self.parse_item()?;
        loop {
            match self.cur() {
                MetaTok::Name(_) | MetaTok::String(_) | MetaTok::LPar | MetaTok::LSqb => {
                    let next = self.parse_item()?;
                    self.arena.add_arc(frag.exit, next.entry, None);
                    frag.exit = next.exit;
                }
                _ => break,
            }
        }
        Ok(frag)
    }

    /// `item: '[' rhs ']' | atom ('+' | '*')?`
    fn parse_item(&mut self) -> Result<Fragment, GrammarParseError> {
        if *self.cur() == MetaTok::LSqb {
            self.advance();
            let frag = self.parse_rhs()?;
            if *self.cur() != MetaTok::RSqb {
                return Err(GrammarParseError::new("expected ']'", self.pos()));
            }
            self.advance();
            // Optional: skip straight from entry to exit.
            self.arena.add_arc(frag.entry, frag.exit, None);
            return Ok(frag);
        }

        let frag = self.parse_atom()?;
        match self.cur() {
            MetaTok::Plus => {
                self.advance();
                self.arena.add_arc(frag.exit, frag.entry, None);
                Ok(frag)
            }
            MetaTok::Star => {
                self.advance();
                self.arena.add_arc(frag.exit, frag.entry, None);
                Ok(Fragment {
                    entry: frag.entry,
                    exit: frag.entry,
                })
            }
            _ => Ok(frag),
        }
    }

    /// `atom: '(' rhs ')' | NAME | STRING`
    fn parse_atom(&mut self) -> Result<Fragment, GrammarParseError> {
        match self.cur().clone() {
            MetaTok::LPar => {
                self.advance();
                let frag = self.parse_rhs()?;
                if *self.cur() != MetaTok::RPar {
                    return Err(GrammarParseError::new("expected ')'", self.pos()));
                }
                self.advance();
                Ok(frag)
            }
            MetaTok::Name(name) => {
                self.advance();
                let rule = self.current_rule.clone();
                let entry = self.arena.new_state(&rule);
                let exit = self.arena.new_state(&rule);
                self.arena.add_arc(entry, exit, Some(ArcLabel::Name(name)));
                Ok(Fragment { entry, exit })
            }
            MetaTok::String(s) => {
                self.advance();
                let rule = self.current_rule.clone();
                let entry = self.arena.new_state(&rule);
                let exit = self.arena.new_state(&rule);
                self.arena
                    .add_arc(entry, exit, Some(ArcLabel::Literal(s)));
                Ok(Fragment { entry, exit })
            }
            _ => Err(GrammarParseError::new(
                "expected '(...)' or NAME or STRING",
                self.pos(),
            )),
        }
    }
}

pub fn parse_grammar_text(src: &str) -> Result<ParsedGrammar, GrammarParseError> {
    MetaParser::new(src)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_literal_rule() {
        let parsed = parse_grammar_text("rule: 'x'\n").unwrap();
        assert_eq!(parsed.start_symbol, "rule");
        assert!(parsed.rules.contains_key("rule"));
    }

    #[test]
    fn parses_alternation() {
        let parsed = parse_grammar_text("rule: 'a' | 'b'\n").unwrap();
        let frag = parsed.rules["rule"];
        // entry should epsilon-branch into two alternatives.
        let entry_arcs = &parsed.arena.state(frag.entry).arcs;
        assert_eq!(entry_arcs.len(), 2);
        assert!(entry_arcs.iter().all(|(label, _)| label.is_none()));
    }

    #[test]
    fn parses_optional_and_repetition() {
        let parsed = parse_grammar_text("rule: [ 'a' ] 'b'* 'c'+\n").unwrap();
        assert!(parsed.rules.contains_key("rule"));
    }

    #[test]
    fn parses_multiple_rules_and_tracks_start_symbol() {
        let parsed = parse_grammar_text("first: 'a'\nsecond: 'b'\n").unwrap();
        assert_eq!(parsed.start_symbol, "first");
        assert_eq!(parsed.rule_order, vec!["first", "second"]);
    }

    #[test]
    fn malformed_grammar_is_an_error() {
        assert!(parse_grammar_text("rule: *\n").is_err());
    }
}
