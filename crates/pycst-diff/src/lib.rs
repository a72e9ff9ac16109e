//! Incremental re-parsing: reuse unchanged top-level statements from an old
//! CST instead of reparsing the whole file from scratch (spec.md §4.5 `DP`).
//!
//! Rowan's green tree stores only each child's length, not an absolute
//! offset, so splicing a reused subtree into a new parent "renumbers" its
//! position for free once the red tree is walked -- there is no separate
//! position-patching pass to write, unlike an AST that stores a literal
//! `start_pos` tuple per node.
//!
//! The fast path only ever reuses whole top-level statements (the
//! granularity spec.md calls for), so a reused gap always starts and ends
//! at column 0 -- the lexer's indent stack is never left mid-block across
//! a splice point. Anything the fast path can't line up exactly -- a
//! change that splits a statement, a grammar ambiguity, trailing trivia
//! that doesn't match up -- is caught by the final full-text comparison
//! and answered with an ordinary full reparse, never a wrong answer.

use rowan::{GreenNode, GreenToken, NodeOrToken, TextRange};
use similar::{DiffOp, TextDiff};

use pycst_common::span::{split_lines_keepends, LineIndex};
use pycst_grammar::Grammar;
use pycst_syntax::{GrammarExt, ParseFailure, ParseOptions, SyntaxElement, SyntaxNode};

/// Reparse `new_source` given an `old_tree` that was produced by parsing
/// `old_source` under the same `grammar`, reusing unchanged top-level
/// statements where possible.
///
/// Never returns a tree whose text differs from `new_source`: when the
/// incremental splice can't be made to line up, this falls back to an
/// ordinary full parse of `new_source` and surfaces whatever that would
/// surface.
pub fn diff_parse(
    grammar: &Grammar,
    old_tree: &SyntaxNode,
    old_source: &str,
    new_source: &str,
) -> Result<SyntaxNode, ParseFailure> {
    if let Some(node) = try_diff_parse(grammar, old_tree, old_source, new_source)? {
        return Ok(node);
    }
    let parse = grammar.parse(new_source, ParseOptions::default())?;
    Ok(parse.syntax())
}

/// `Ok(None)` means the fast path declined (no error, just no splice);
/// the caller should fall back to a full parse. Errors from a gap's own
/// sub-parse still propagate, since a genuine syntax error in the new
/// source is just as real via the fast path as via a full parse.
fn try_diff_parse(
    grammar: &Grammar,
    old_tree: &SyntaxNode,
    old_source: &str,
    new_source: &str,
) -> Result<Option<SyntaxNode>, ParseFailure> {
    let old_lines = split_lines_keepends(old_source);
    let new_lines = split_lines_keepends(new_source);
    let old_line_index = LineIndex::new(old_source);

    let equal_map = build_equal_map(&old_lines, &new_lines);

    // Forward scan: accept a child of the old root as a copy candidate
    // only when it lands exactly at the next expected new-line cursor.
    // Anything skipped is implicitly folded into the gap before the next
    // accepted candidate.
    let candidates = collect_ordered_candidates(old_tree, &old_line_index, &equal_map, &old_lines, &new_lines);
    if candidates.is_empty() && new_lines.is_empty() {
        return Ok(None);
    }

    let mut spliced: Vec<NodeOrToken<GreenNode, GreenToken>> = Vec::new();
    let mut cursor = 0usize;
    for (element, new_start, new_end) in &candidates {
        if *new_start < cursor {
            // Candidates must appear in non-decreasing new-line order; a
            // violation means the diff produced something we can't trust
            // to splice cleanly.
            return Ok(None);
        }
        if cursor < *new_start {
            let is_final = false;
            match parse_gap(grammar, &new_lines, cursor, *new_start, is_final)? {
                Some(mut gap_children) => spliced.append(&mut gap_children),
                None => return Ok(None),
            }
        }
        spliced.push(rebuild_green_element(element));
        cursor = *new_end;
    }
    if cursor <= new_lines.len() {
        match parse_gap(grammar, &new_lines, cursor, new_lines.len(), true)? {
            Some(mut gap_children) => spliced.append(&mut gap_children),
            None => return Ok(None),
        }
    }

    let root = GreenNode::new(rowan::SyntaxKind(old_tree.kind().0), spliced);
    let node = SyntaxNode::new_root(root);

    // Step 5: the resulting token stream must equal the new source
    // exactly, or we don't trust the splice.
    if node.text().to_string() != new_source {
        return Ok(None);
    }
    Ok(Some(node))
}

/// Parse `new_lines[start..end]` as a standalone `file_input` fragment and
/// return its children with the synthetic `ENDMARKER` stripped, unless
/// `is_final` (in which case this fragment really does reach new EOF, so
/// its `ENDMARKER` -- and whatever trailing trivia precedes it -- is the
/// real one).
fn parse_gap(
    grammar: &Grammar,
    new_lines: &[&str],
    start: usize,
    end: usize,
    is_final: bool,
) -> Result<Option<Vec<NodeOrToken<GreenNode, GreenToken>>>, ParseFailure> {
    let source: String = new_lines[start..end].concat();
    let parse = grammar.parse(&source, ParseOptions::default())?;
    let root = parse.syntax();
    let mut kids: Vec<_> = root.children_with_tokens().collect();
    if !is_final {
        match kids.last() {
            Some(el) if el.kind() == pycst_syntax::SyntaxKind::ENDMARKER => {
                kids.pop();
            }
            _ => return Ok(None),
        }
    }
    Ok(Some(kids.iter().map(rebuild_green_element).collect()))
}

/// `equal_map[i] = Some(j)` when old line `i` is unchanged and corresponds
/// to new line `j`.
fn build_equal_map(old_lines: &[&str], new_lines: &[&str]) -> Vec<Option<usize>> {
    let mut map = vec![None; old_lines.len()];
    let diff = TextDiff::from_slices(old_lines, new_lines);
    for op in diff.ops() {
        if let DiffOp::Equal {
            old_index,
            new_index,
            len,
        } = *op
        {
            for k in 0..len {
                map[old_index + k] = Some(new_index + k);
            }
        }
    }
    map
}

fn line_span(line_index: &LineIndex, range: TextRange) -> (usize, usize) {
    let start = line_index.position(range.start().into()).line as usize - 1;
    let end_pos = line_index.position(range.end().into());
    let end = if end_pos.column == 0 {
        (end_pos.line as usize).saturating_sub(1)
    } else {
        end_pos.line as usize
    };
    (start, end.max(start))
}

/// Whether `el` (a direct child of the old root) is a valid copy
/// candidate landing exactly at `new_cursor`. Returns the new-line index
/// just past the candidate on success.
fn copy_candidate(
    el: &SyntaxElement,
    old_line_index: &LineIndex,
    equal_map: &[Option<usize>],
    old_lines: &[&str],
    new_lines: &[&str],
    new_cursor: usize,
) -> Option<usize> {
    let (start, end) = line_span(old_line_index, el.text_range());
    if start >= end || end > equal_map.len() {
        return None;
    }
    let mapped_start = equal_map[start]?;
    for (k, entry) in equal_map[start..end].iter().enumerate() {
        if *entry != Some(mapped_start + k) {
            return None;
        }
    }
    let mapped_end = mapped_start + (end - start);
    if mapped_start != new_cursor || mapped_end > new_lines.len() {
        return None;
    }
    let old_text: String = old_lines[start..end].concat();
    let new_text: String = new_lines[mapped_start..mapped_end].concat();
    if old_text != new_text {
        return None;
    }
    Some(mapped_end)
}

/// Re-run the forward scan to produce `(element, new_start, new_end)`
/// triples in source order, for the splicing pass.
fn collect_ordered_candidates<'a>(
    old_tree: &'a SyntaxNode,
    old_line_index: &LineIndex,
    equal_map: &[Option<usize>],
    old_lines: &[&str],
    new_lines: &[&str],
) -> Vec<(SyntaxElement, usize, usize)> {
    let mut out = Vec::new();
    let mut new_cursor = 0usize;
    for el in old_tree.children_with_tokens() {
        if let Some(new_end) =
            copy_candidate(&el, old_line_index, equal_map, old_lines, new_lines, new_cursor)
        {
            let (start, _) = line_span(old_line_index, el.text_range());
            let new_start = equal_map[start].unwrap();
            out.push((el, new_start, new_end));
            new_cursor = new_end;
        }
    }
    out
}

/// Lift a red `SyntaxElement` back to its underlying green element without
/// walking or reallocating its subtree -- `SyntaxNode`/`SyntaxToken` already
/// own (Arc-backed) green data, so `.green()` hands back the exact same
/// allocation a copy candidate had in `old_tree`. This is what makes a
/// reused top-level statement pointer-identical to its counterpart in the
/// old tree (spec.md §4.5 / S8), not merely text-identical.
fn rebuild_green_element(el: &SyntaxElement) -> NodeOrToken<GreenNode, GreenToken> {
    match el {
        NodeOrToken::Node(n) => NodeOrToken::Node(n.green().into_owned()),
        NodeOrToken::Token(t) => NodeOrToken::Token(t.green().clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> Grammar {
        Grammar::from_text(
            "file_input: (NEWLINE | stmt)* ENDMARKER\n\
             stmt: NAME NEWLINE\n",
        )
        .unwrap()
    }

    #[test]
    fn identical_source_round_trips_via_the_fast_path() {
        let grammar = grammar();
        let src = "a\nb\nc\n";
        let parse = grammar.parse(src, ParseOptions::default()).unwrap();
        let old_tree = parse.syntax();

        let node = diff_parse(&grammar, &old_tree, src, src).unwrap();
        assert_eq!(node.text().to_string(), src);
    }

    #[test]
    fn a_single_changed_middle_line_still_reparses_correctly() {
        let grammar = grammar();
        let old_src = "a\nb\nc\n";
        let new_src = "a\nx\nc\n";
        let parse = grammar.parse(old_src, ParseOptions::default()).unwrap();
        let old_tree = parse.syntax();

        let node = diff_parse(&grammar, &old_tree, old_src, new_src).unwrap();
        assert_eq!(node.text().to_string(), new_src);
    }

    #[test]
    fn an_unchanged_statement_is_pointer_identical_to_the_old_tree() {
        // spec.md §4.5 / S8: a reused top-level statement is the *same*
        // green node as in the old tree, not merely equal text.
        let grammar = grammar();
        let old_src = "a\nb\nc\n";
        let new_src = "a\nx\nc\n";
        let parse = grammar.parse(old_src, ParseOptions::default()).unwrap();
        let old_tree = parse.syntax();

        let node = diff_parse(&grammar, &old_tree, old_src, new_src).unwrap();

        let old_first = old_tree.children().next().unwrap();
        let new_first = node.children().next().unwrap();
        assert_eq!(old_first.text().to_string(), "a\n");
        assert_eq!(new_first.text().to_string(), "a\n");
        assert!(
            std::ptr::eq(&*old_first.green(), &*new_first.green()),
            "unchanged statement should reuse the old tree's green node, not rebuild it"
        );
    }

    #[test]
    fn an_appended_statement_reparses_correctly() {
        let grammar = grammar();
        let old_src = "a\nb\n";
        let new_src = "a\nb\nc\n";
        let parse = grammar.parse(old_src, ParseOptions::default()).unwrap();
        let old_tree = parse.syntax();

        let node = diff_parse(&grammar, &old_tree, old_src, new_src).unwrap();
        assert_eq!(node.text().to_string(), new_src);
    }

    #[test]
    fn falls_back_cleanly_on_completely_different_source() {
        let grammar = grammar();
        let old_src = "a\n";
        let new_src = "totally\ndifferent\nshape\n";
        let parse = grammar.parse(old_src, ParseOptions::default()).unwrap();
        let old_tree = parse.syntax();

        let node = diff_parse(&grammar, &old_tree, old_src, new_src).unwrap();
        assert_eq!(node.text().to_string(), new_src);
    }
}
