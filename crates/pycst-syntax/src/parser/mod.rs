//! Table-driven pushdown parser engine.
//!
//! Consumes a [`pycst_grammar::Grammar`]'s per-nonterminal DFA tables and a
//! token stream, producing a rowan green tree plus any recoverable errors.
//! Grounded on `parso/parser.py`'s `BaseParser`/`Stack`/`StackNode` (the
//! generic `add_token`/`_pop` engine) and `parso/python/parser.py`'s
//! `error_recovery`/`_stack_removal` (the Python-specific recovery policy).
//!
//! Unlike the event-stream builder this replaces, nodes are assembled
//! bottom-up as plain `rowan::GreenNode` values held in each stack frame's
//! own `Vec`, rather than through `GreenNodeBuilder`'s single-cursor nesting.
//! That is what lets error recovery flatten several frames' accumulated
//! children into one `error_node`, the way `_stack_removal` does.

use pycst_common::token::{Token, TokenKind};
use pycst_grammar::{Grammar, NonterminalId};

use crate::error::{InternalParseError, ParseError, ParseFailure, ParserSyntaxError};
use crate::syntax_kind::SyntaxKind;

type Elem = rowan::NodeOrToken<rowan::GreenNode, rowan::GreenToken>;

fn raw(kind: SyntaxKind) -> rowan::SyntaxKind {
    rowan::SyntaxKind(kind.0)
}

fn leaf_elements(token: &Token) -> Vec<Elem> {
    let mut elems = Vec::new();
    for (kind, text) in crate::trivia::split_prefix(&token.prefix) {
        elems.push(Elem::Token(rowan::GreenToken::new(raw(kind), &text)));
    }
    let kind = SyntaxKind::from(token.kind);
    elems.push(Elem::Token(rowan::GreenToken::new(raw(kind), &token.text)));
    elems
}

fn dfa_state<'a>(grammar: &'a Grammar, frame: &StackFrame) -> &'a pycst_grammar::DfaState {
    &grammar.nonterminal_to_dfas[&frame.nonterminal][frame.dfa_index]
}

/// The text of the last token under `elem`, however deeply nested.
fn last_leaf_text(elem: &Elem) -> Option<String> {
    match elem {
        Elem::Token(t) => Some(t.text().to_string()),
        Elem::Node(n) => {
            let root = crate::cst::SyntaxNode::new_root(n.clone());
            root.last_token().map(|t| t.text().to_string())
        }
    }
}

struct StackFrame {
    nonterminal: NonterminalId,
    dfa_index: usize,
    nodes: Vec<Elem>,
}

impl StackFrame {
    fn new(nonterminal: NonterminalId, dfa_index: usize) -> Self {
        Self {
            nonterminal,
            dfa_index,
            nodes: Vec::new(),
        }
    }
}

/// Drives the stack-of-DFAs engine to completion for one token stream.
pub struct Parser<'g> {
    grammar: &'g Grammar,
    start: NonterminalId,
    stack: Vec<StackFrame>,
    errors: Vec<ParseError>,
    error_recovery: bool,
    root: Option<Elem>,
    /// Synthetic INDENTs discarded by recovery, paired with the indent
    /// depth at the time, so the matching DEDENT can be dropped too
    /// (mirrors `_omit_dedent_list` / `_indent_counter`).
    omit_dedent_list: Vec<i32>,
    indent_counter: i32,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar, error_recovery: bool) -> Self {
        Self::with_start(grammar, grammar.start, error_recovery)
    }

    /// Like [`Parser::new`], but starts the pushdown stack at `start`
    /// instead of the grammar's own start symbol (spec.md §6's
    /// `start_symbol` parameter to `Grammar.parse`).
    pub fn with_start(grammar: &'g Grammar, start: NonterminalId, error_recovery: bool) -> Self {
        let frame = StackFrame::new(start, 0);
        Self {
            grammar,
            start,
            stack: vec![frame],
            errors: Vec::new(),
            error_recovery,
            root: None,
            omit_dedent_list: Vec::new(),
            indent_counter: 0,
        }
    }

    /// Feed every token from a completed tokenization through the engine,
    /// then drain trailing final frames. Returns the finished root node.
    ///
    /// Fatal per spec.md §7: a genuine mismatch with `error_recovery off`
    /// raises [`ParserSyntaxError`] immediately, and a non-empty stack after
    /// the last token raises [`InternalParseError`] -- both abort the parse
    /// rather than returning a partial tree.
    pub fn parse(mut self, tokens: Vec<Token>) -> Result<(rowan::GreenNode, Vec<ParseError>), ParseFailure> {
        for token in tokens {
            self.feed(token)?;
        }

        while let Some(top) = self.stack.last() {
            if dfa_state(self.grammar, top).is_final {
                self.pop();
            } else {
                break;
            }
        }

        if !self.stack.is_empty() {
            return Err(InternalParseError::new("incomplete input: unfinished stack at end of tokens").into());
        }

        let start_kind = raw(SyntaxKind::from(self.start));
        match self.root {
            Some(Elem::Node(node)) if node.kind() == start_kind => Ok((node, self.errors)),
            // Single-child inlining (`convert_node`) can collapse the whole
            // program down to one non-`file_input` node or a bare leaf when
            // the start rule only ever produced one child; re-wrap it so
            // callers always get a `file_input`-kinded root, matching
            // `python/parser.py`'s post-parse wrap.
            Some(other) => Ok((rowan::GreenNode::new(start_kind, vec![other]), self.errors)),
            None => Err(InternalParseError::new("no root node produced").into()),
        }
    }

    /// Track INDENT/DEDENT bookkeeping for `_omit_dedent_list`, then route
    /// the token through the engine, retrying on intermediate reduces and
    /// invoking recovery on a genuine mismatch.
    fn feed(&mut self, token: Token) -> Result<(), ParseFailure> {
        if token.kind == TokenKind::Dedent {
            if let Some(&last) = self.omit_dedent_list.last() {
                if last == self.indent_counter {
                    self.omit_dedent_list.pop();
                    return Ok(());
                }
            }
            self.indent_counter -= 1;
        } else if token.kind == TokenKind::Indent {
            self.indent_counter += 1;
        }
        self.add_token(token)
    }

    fn add_token(&mut self, token: Token) -> Result<(), ParseFailure> {
        let transition = self
            .grammar
            .token_to_transition(token.kind, &token.text);

        loop {
            let Some(top) = self.stack.last() else {
                return Err(InternalParseError::new("too much input: stack exhausted").into());
            };
            let state = dfa_state(self.grammar, top);
            if let Some(plan) = state.plans.get(&transition) {
                let next_dfa = plan.next_dfa;
                let pushes = plan.pushes.clone();
                self.stack.last_mut().unwrap().dfa_index = next_dfa;
                for push in pushes {
                    self.stack.push(StackFrame::new(push.nonterminal, push.index));
                }
                self.stack.last_mut().unwrap().nodes.extend(leaf_elements(&token));
                return Ok(());
            } else if state.is_final {
                self.pop();
            } else {
                self.error_recovery(token)?;
                return Ok(());
            }
        }
    }

    fn pop(&mut self) {
        let tos = self.stack.pop().unwrap();
        let nonterminal = tos.nonterminal;
        let mut new_nodes = convert_node(nonterminal, tos.nodes);
        match self.stack.last_mut() {
            Some(parent) => parent.nodes.append(&mut new_nodes),
            None => {
                self.root = Some(if new_nodes.len() == 1 {
                    new_nodes.pop().unwrap()
                } else {
                    Elem::Node(rowan::GreenNode::new(raw(SyntaxKind::from(nonterminal)), new_nodes))
                });
            }
        }
    }

    /// Walk the stack downward to the nearest enclosing `suite` or
    /// `file_input`, as `current_suite` does in `python/parser.py`.
    fn nearest_recovery_index(&self) -> usize {
        let mut one_line_suite = false;
        let mut until_index = 0;
        for idx in (0..self.stack.len()).rev() {
            until_index = idx;
            if one_line_suite {
                break;
            }
            let name = self.grammar.nonterminal_name(self.stack[idx].nonterminal);
            if name == "file_input" {
                break;
            } else if name == "suite" {
                if self.stack[idx].nodes.len() > 1 {
                    break;
                } else if self.stack[idx].nodes.is_empty() {
                    one_line_suite = true;
                }
            }
        }
        until_index
    }

    /// Bundle every child accumulated in frames above `start_index` into one
    /// `error_node` appended to `stack[start_index - 1]`. Returns whether
    /// anything was bundled (`_stack_removal`).
    fn stack_removal(&mut self, start_index: usize) -> bool {
        let mut bundled = Vec::new();
        for frame in self.stack.drain(start_index..) {
            bundled.extend(frame.nodes);
        }
        let had_nodes = !bundled.is_empty();
        if had_nodes {
            let error_node = Elem::Node(rowan::GreenNode::new(raw(SyntaxKind::ERROR_NODE), bundled));
            self.stack[start_index - 1].nodes.push(error_node);
        }
        had_nodes
    }

    /// Mirrors `python/parser.py`'s check before generic error recovery: a
    /// `simple_stmt` that's otherwise complete except for its trailing
    /// NEWLINE silently accepts ENDMARKER (or a DEDENT following a leaf with
    /// no newline in it) as if the NEWLINE had already been consumed, since
    /// real Python source commonly has no newline at end of file. Runs
    /// whether or not `error_recovery` is enabled, since parso treats this
    /// as valid syntax, not a recoverable error.
    fn accept_missing_trailing_newline(&mut self, token: &Token) -> bool {
        if self.grammar.nonterminal_name(self.start) != "file_input" {
            return false;
        }
        let qualifies = match token.kind {
            TokenKind::Endmarker => true,
            TokenKind::Dedent => {
                let last_leaf = self
                    .stack
                    .last()
                    .and_then(|f| f.nodes.last())
                    .and_then(last_leaf_text);
                !last_leaf.map_or(false, |t| t.contains('\n'))
            }
            _ => false,
        };
        if !qualifies {
            return false;
        }

        let next_dfa = {
            let Some(top) = self.stack.last() else {
                return false;
            };
            if self.grammar.nonterminal_name(top.nonterminal) != "simple_stmt" {
                return false;
            }
            let state = dfa_state(self.grammar, top);
            let transition = self.grammar.token_to_transition(TokenKind::Newline, "\n");
            let Some(plan) = state.plans.get(&transition) else {
                return false;
            };
            let dfas = &self.grammar.nonterminal_to_dfas[&top.nonterminal];
            if !plan.pushes.is_empty() || !dfas[plan.next_dfa].is_final {
                return false;
            }
            plan.next_dfa
        };

        self.stack.last_mut().unwrap().dfa_index = next_dfa;
        true
    }

    fn error_recovery(&mut self, token: Token) -> Result<(), ParseFailure> {
        if self.accept_missing_trailing_newline(&token) {
            return self.add_token(token);
        }

        if !self.error_recovery {
            return Err(ParserSyntaxError::new(
                "SyntaxError: invalid syntax",
                token.start_pos,
                token.end_pos(),
            )
            .into());
        }

        let until_index = self.nearest_recovery_index();
        let start_index = until_index + 1;

        self.errors.push(ParseError::new(
            format!("unexpected {:?} {:?}", token.kind, token.text),
            token.start_pos,
            token.end_pos(),
        ));

        if self.stack_removal(start_index) {
            return self.add_token(token);
        }

        if token.kind == TokenKind::Indent {
            self.omit_dedent_list.push(self.indent_counter);
        }

        let error_leaf = Elem::Node(rowan::GreenNode::new(raw(SyntaxKind::ERROR_LEAF), leaf_elements(&token)));
        self.stack.last_mut().unwrap().nodes.push(error_leaf);
        Ok(())
    }
}

/// Whether `elem` is a trivia leaf (`WHITESPACE`/`COMMENT`) rather than a
/// real grammar child. Prefix trivia is modeled as a sibling leaf rather
/// than a field on the following token (SPEC_FULL.md §3), so it must be
/// excluded from the single-child count below or a token with any leading
/// whitespace would never collapse.
fn is_trivia(elem: &Elem) -> bool {
    matches!(elem, Elem::Token(t) if SyntaxKind(t.kind().0).is_trivia())
}

/// `BaseParser._pop`'s single-child inlining: a nonterminal whose DFA only
/// ever produced one *real* (non-trivia) child collapses to that child
/// rather than wrapping it. Any trivia siblings collapse along with it,
/// since they have nowhere else to live once the wrapping node is gone --
/// the caller splices the returned elements directly into its own frame.
fn convert_node(nonterminal: NonterminalId, nodes: Vec<Elem>) -> Vec<Elem> {
    let real_count = nodes.iter().filter(|e| !is_trivia(e)).count();
    if real_count == 1 {
        nodes
    } else {
        vec![Elem::Node(rowan::GreenNode::new(raw(SyntaxKind::from(nonterminal)), nodes))]
    }
}
