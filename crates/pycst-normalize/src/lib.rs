//! Generic CST visitor framework (spec.md §4.7 `NM`).
//!
//! Concrete style rules (PEP 8 checks, etc.) are out of scope (spec.md
//! §1); this crate only ships the walk and the `Issue` collection it
//! writes into. A caller implements [`Rule`] for whatever checks it
//! wants and registers them with a [`Normalizer`].

use rowan::NodeOrToken;
use rustc_hash::FxHashSet;

use pycst_common::span::{LineIndex, Position};
use pycst_syntax::{SyntaxNode, SyntaxToken};

/// One finding emitted by a [`Rule`], keyed for dedup by `(code, start_pos)`
/// (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub code: String,
    pub message: String,
    pub start_pos: Position,
}

/// A single normalization check. Implementers look at a node or leaf as
/// the walk passes over it and call [`Context::add_issue`] for anything
/// worth flagging.
pub trait Rule {
    /// Stable identifier for issues this rule raises, e.g. `"E201"`.
    fn code(&self) -> &str;

    /// Called on entering `node`, before its children are visited.
    /// Returning `false` skips descending into this node's children
    /// (the rule has already seen everything it needs from this subtree).
    fn visit_node(&self, node: &SyntaxNode, ctx: &mut Context) -> bool {
        let _ = (node, ctx);
        true
    }

    /// Called for every leaf token in source order.
    fn visit_leaf(&self, leaf: &SyntaxToken, ctx: &mut Context) {
        let _ = (leaf, ctx);
    }
}

/// Per-walk state threaded through every rule: the line index for
/// translating byte offsets to positions, and the deduplicated issue
/// list being built up.
pub struct Context<'a> {
    line_index: &'a LineIndex,
    issues: Vec<Issue>,
    seen: FxHashSet<(String, Position)>,
}

impl<'a> Context<'a> {
    fn new(line_index: &'a LineIndex) -> Self {
        Self {
            line_index,
            issues: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    pub fn line_index(&self) -> &LineIndex {
        self.line_index
    }

    /// Record a finding. A second call with the same `(code, start_pos)`
    /// pair is a no-op.
    pub fn add_issue(&mut self, code: impl Into<String>, message: impl Into<String>, start_pos: Position) {
        let code = code.into();
        if self.seen.insert((code.clone(), start_pos)) {
            self.issues.push(Issue {
                code,
                message: message.into(),
                start_pos,
            });
        }
    }

    fn into_issues(self) -> Vec<Issue> {
        self.issues
    }
}

/// Drives a depth-first, left-to-right walk of a CST, calling every
/// registered [`Rule`] at each node and leaf.
#[derive(Default)]
pub struct Normalizer {
    rules: Vec<Box<dyn Rule>>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn run(&self, root: &SyntaxNode, line_index: &LineIndex) -> Vec<Issue> {
        let mut ctx = Context::new(line_index);
        self.walk(root, &mut ctx);
        ctx.into_issues()
    }

    fn walk(&self, node: &SyntaxNode, ctx: &mut Context) {
        let mut descend = true;
        for rule in &self.rules {
            if !rule.visit_node(node, ctx) {
                descend = false;
            }
        }
        if !descend {
            return;
        }
        for child in node.children_with_tokens() {
            match child {
                NodeOrToken::Node(n) => self.walk(&n, ctx),
                NodeOrToken::Token(t) => {
                    for rule in &self.rules {
                        rule.visit_leaf(&t, ctx);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pycst_grammar::Grammar;
    use pycst_syntax::{GrammarExt, ParseOptions};

    struct FlagEveryName;

    impl Rule for FlagEveryName {
        fn code(&self) -> &str {
            "T001"
        }

        fn visit_leaf(&self, leaf: &SyntaxToken, ctx: &mut Context) {
            if leaf.kind() == pycst_syntax::SyntaxKind::NAME {
                let pos = ctx.line_index().position(leaf.text_range().start().into());
                ctx.add_issue(self.code(), format!("name `{}`", leaf.text()), pos);
            }
        }
    }

    #[test]
    fn walk_visits_every_name_leaf_once() {
        let grammar = Grammar::from_text("file_input: NAME NEWLINE NAME NEWLINE ENDMARKER\n").unwrap();
        let src = "a\nb\n";
        let parse = grammar.parse(src, ParseOptions::default()).unwrap();
        let root = parse.syntax();
        let line_index = LineIndex::new(src);

        let mut normalizer = Normalizer::new();
        normalizer.register(Box::new(FlagEveryName));
        let issues = normalizer.run(&root, &line_index);

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].code, "T001");
        assert_eq!(issues[0].start_pos, Position::new(1, 0));
        assert_eq!(issues[1].start_pos, Position::new(2, 0));
    }

    #[test]
    fn add_issue_deduplicates_by_code_and_position() {
        let line_index = LineIndex::new("x");
        let mut ctx = Context::new(&line_index);
        ctx.add_issue("E001", "first", Position::new(1, 0));
        ctx.add_issue("E001", "duplicate", Position::new(1, 0));
        ctx.add_issue("E002", "different code, same pos", Position::new(1, 0));

        let issues = ctx.into_issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].message, "first");
    }

    struct SkipAllChildren;

    impl Rule for SkipAllChildren {
        fn code(&self) -> &str {
            "T002"
        }

        fn visit_node(&self, _node: &SyntaxNode, _ctx: &mut Context) -> bool {
            false
        }

        fn visit_leaf(&self, _leaf: &SyntaxToken, ctx: &mut Context) {
            ctx.add_issue(self.code(), "should never run", Position::START);
        }
    }

    #[test]
    fn a_rule_can_decline_to_descend_into_a_subtree() {
        let grammar = Grammar::from_text("file_input: NAME NEWLINE ENDMARKER\n").unwrap();
        let src = "a\n";
        let parse = grammar.parse(src, ParseOptions::default()).unwrap();
        let root = parse.syntax();
        let line_index = LineIndex::new(src);

        let mut normalizer = Normalizer::new();
        normalizer.register(Box::new(SkipAllChildren));
        let issues = normalizer.run(&root, &line_index);
        assert!(issues.is_empty());
    }
}
