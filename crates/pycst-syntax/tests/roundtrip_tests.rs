//! Integration tests over the real, shipped Python grammar (as opposed to
//! the tiny hand-written grammars the per-module unit tests use).

use pycst_py_grammar::{load_grammar, PyVersion};
use pycst_syntax::{GrammarExt, ParseOptions, SyntaxNodeExt};

fn grammar() -> &'static pycst_grammar::Grammar {
    load_grammar(PyVersion::PY311).unwrap()
}

/// spec.md §8 invariant 1/2: a clean parse's `get_code()` reproduces the
/// source exactly.
fn assert_round_trips(source: &str) {
    let grammar = grammar();
    let parse = grammar.parse(source, ParseOptions::default()).unwrap();
    let root = parse.syntax();
    assert_eq!(root.get_code(), source, "round-trip mismatch for {source:?}");
}

#[test]
fn round_trips_a_well_formed_module() {
    assert_round_trips("def add(a, b):\n    return a + b\n");
}

#[test]
fn round_trips_an_arithmetic_expression_statement() {
    assert_round_trips("hello + 1\n");
}

#[test]
fn round_trips_an_if_else_with_comments() {
    assert_round_trips("if x:\n    y = 1  # then\nelse:\n    y = 2  # else\n");
}

#[test]
fn round_trips_imports_and_decorators() {
    assert_round_trips("import os\nfrom sys import argv\n\n\n@staticmethod\ndef f():\n    pass\n");
}

#[test]
fn round_trips_a_class_with_a_docstring() {
    assert_round_trips("class C:\n    \"\"\"doc\"\"\"\n    def m(self):\n        pass\n");
}

/// spec.md §8 S1: `"hello + 1"` must parse to a flat `arith_expr` holding
/// exactly `Name("hello")`, `Operator("+")`, `Number("1")` -- no leftover
/// `term`/`factor`/`power`/`atom_expr`/`atom` wrapper node from a
/// single-child chain that failed to collapse because of the whitespace
/// sitting in front of `+`/`1`.
#[test]
fn arith_expr_has_no_spurious_wrapper_nodes() {
    let grammar = grammar();
    let source = "hello + 1\n";
    let parse = grammar.parse(source, ParseOptions::default()).unwrap();
    let root = parse.syntax();

    let arith_expr = root
        .descendants()
        .find(|n| grammar.kind_name(n.kind()) == "arith_expr")
        .expect("arith_expr node");

    let real_children: Vec<_> = arith_expr
        .children_with_tokens()
        .filter(|el| !matches!(grammar.kind_name(el.kind()).as_str(), "WHITESPACE" | "COMMENT"))
        .collect();

    assert_eq!(
        real_children.len(),
        3,
        "expected exactly Name, Operator, Number with no wrapper nodes, got {real_children:?}"
    );
    assert!(
        real_children.iter().all(|el| el.as_node().is_none()),
        "every real child should be a plain leaf token, not a wrapper node"
    );
    assert_eq!(real_children[0].as_token().unwrap().text(), "hello");
    assert_eq!(real_children[1].as_token().unwrap().text(), "+");
    assert_eq!(real_children[2].as_token().unwrap().text(), "1");
}

/// The lexer never synthesizes a NEWLINE before ENDMARKER at EOF (it mirrors
/// the real tokenizer, which doesn't either), so a source file with no
/// trailing newline -- extremely common in real Python -- must still parse
/// clean rather than tripping error recovery on the missing NEWLINE.
#[test]
fn a_module_with_no_trailing_newline_parses_without_error() {
    let grammar = grammar();
    let source = "x = 1";
    let parse = grammar.parse(source, ParseOptions::default()).unwrap();
    assert!(parse.ok(), "expected a clean parse, got errors: {:?}", parse.errors());
    assert_eq!(parse.syntax().get_code(), source);
}

/// spec.md §7 / S2: a malformed construct still yields a tree whose text
/// matches the source exactly, with the bad part wrapped in an
/// `error_node`/`error_leaf` rather than aborting the parse.
#[test]
fn a_malformed_function_body_recovers_and_still_round_trips() {
    let grammar = grammar();
    let source = "def x(): f.\n";
    let parse = grammar
        .parse(source, ParseOptions {
            error_recovery: true,
            start_symbol: "file_input",
        })
        .unwrap();
    let root = parse.syntax();
    assert_eq!(root.get_code(), source);
    assert!(!parse.ok());
    assert!(!parse.errors().is_empty());
}

/// spec.md §7: with `error_recovery` off, the same input is a fatal
/// `ParserSyntaxError` instead of a recovered tree.
#[test]
fn the_same_malformed_input_is_fatal_without_recovery() {
    let grammar = grammar();
    let source = "def x(): f.\n";
    let err = grammar
        .parse(source, ParseOptions {
            error_recovery: false,
            start_symbol: "file_input",
        })
        .unwrap_err();
    assert!(matches!(err, pycst_syntax::ParseFailure::Syntax(_)));
}

#[test]
fn iter_errors_reports_a_position_inside_the_malformed_region() {
    let grammar = grammar();
    let source = "if x: f.\nelse: g(\n";
    let parse = grammar.parse(source, ParseOptions::default()).unwrap();
    let root = parse.syntax();
    let line_index = pycst_common::span::LineIndex::new(source);
    let issues = grammar.iter_errors(&root, &line_index);
    assert!(!issues.is_empty());
}

#[test]
fn an_unsupported_start_symbol_falls_back_to_the_grammars_own_start() {
    let grammar = grammar();
    let parse = grammar
        .parse("x = 1\n", ParseOptions {
            error_recovery: true,
            start_symbol: "not_a_real_rule",
        })
        .unwrap();
    assert_eq!(parse.syntax().get_code(), "x = 1\n");
}
