//! Serializable mirror of a rowan green tree.
//!
//! `rowan::GreenNode`/`GreenToken` don't implement `serde::Serialize`
//! themselves, so the cache translates a parsed tree into this plain enum
//! (kind number + text, recursively) before handing it to `serde_json`, and
//! rebuilds a fresh `GreenNode` from it on a cache hit.

use rowan::{GreenNode, GreenToken, NodeOrToken};
use serde::{Deserialize, Serialize};

use pycst_syntax::{SyntaxElement, SyntaxNode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SerializedElement {
    Node {
        kind: u16,
        children: Vec<SerializedElement>,
    },
    Token {
        kind: u16,
        text: String,
    },
}

/// Flatten a syntax node into its serializable form.
pub fn serialize_node(node: &SyntaxNode) -> SerializedElement {
    let children = node
        .children_with_tokens()
        .map(|el| serialize_element(&el))
        .collect();
    SerializedElement::Node {
        kind: node.kind().0,
        children,
    }
}

fn serialize_element(el: &SyntaxElement) -> SerializedElement {
    match el {
        NodeOrToken::Node(n) => serialize_node(n),
        NodeOrToken::Token(t) => SerializedElement::Token {
            kind: t.kind().0,
            text: t.text().to_string(),
        },
    }
}

fn to_green_elem(elem: &SerializedElement) -> NodeOrToken<GreenNode, GreenToken> {
    match elem {
        SerializedElement::Node { kind, children } => {
            let kids: Vec<_> = children.iter().map(to_green_elem).collect();
            NodeOrToken::Node(GreenNode::new(rowan::SyntaxKind(*kind), kids))
        }
        SerializedElement::Token { kind, text } => {
            NodeOrToken::Token(GreenToken::new(rowan::SyntaxKind(*kind), text))
        }
    }
}

/// Rebuild a `GreenNode` root from its serialized form. `elem` must be a
/// `Node` variant -- the root of any parse always is.
pub fn deserialize_root(elem: &SerializedElement) -> GreenNode {
    match to_green_elem(elem) {
        NodeOrToken::Node(n) => n,
        NodeOrToken::Token(_) => unreachable!("a parse's root is always a node"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pycst_grammar::Grammar;

    #[test]
    fn round_trips_through_serialization() {
        let grammar = Grammar::from_text("file_input: NAME NEWLINE ENDMARKER\n").unwrap();
        let parse = pycst_syntax::parse("x\n", &grammar, true).unwrap();
        let original = parse.syntax();

        let serialized = serialize_node(&original);
        let json = serde_json::to_string(&serialized).unwrap();
        let deserialized: SerializedElement = serde_json::from_str(&json).unwrap();
        let rebuilt = SyntaxNode::new_root(deserialize_root(&deserialized));

        assert_eq!(original.text().to_string(), rebuilt.text().to_string());
        assert_eq!(original.kind(), rebuilt.kind());
    }
}
