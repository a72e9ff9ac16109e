//! Ships one pgen2-style grammar text file per supported Python version,
//! embedded at compile time via `include_str!`, and memoizes the compiled
//! `pycst_grammar::Grammar` per version so repeated `load_grammar` calls
//! (e.g. once per file in an editor session) don't recompile the DFA
//! tables (spec.md §6's `load_grammar(version) -> Grammar`).
//!
//! The grammar text itself is the actual CPython/pgen2 grammar file for
//! each version (filenames `grammar39.txt`/`grammar311.txt` keep pgen2's
//! own naming convention), not a hand-written subset.

use std::fmt;
use std::sync::OnceLock;

use pycst_grammar::error::GrammarBuildError;
use pycst_grammar::Grammar;

const GRAMMAR_39: &str = include_str!("../grammars/grammar39.txt");
const GRAMMAR_311: &str = include_str!("../grammars/grammar311.txt");

/// A supported Python language version, `(major, minor)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PyVersion {
    pub major: u8,
    pub minor: u8,
}

impl PyVersion {
    pub const PY39: PyVersion = PyVersion { major: 3, minor: 9 };
    pub const PY311: PyVersion = PyVersion {
        major: 3,
        minor: 11,
    };
}

impl fmt::Display for PyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Failure surfaced by [`load_grammar`]: either the version has no shipped
/// grammar text, or (should never happen for a shipped file) the grammar
/// failed to build (spec.md §9 "Version switching").
#[derive(Debug, Clone, PartialEq)]
pub enum LoadGrammarError {
    UnsupportedVersion(PyVersion),
    Build(GrammarBuildError),
}

impl fmt::Display for LoadGrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadGrammarError::UnsupportedVersion(v) => {
                write!(f, "no shipped grammar for Python {v}")
            }
            LoadGrammarError::Build(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadGrammarError {}

impl From<GrammarBuildError> for LoadGrammarError {
    fn from(e: GrammarBuildError) -> Self {
        LoadGrammarError::Build(e)
    }
}

static PY39_GRAMMAR: OnceLock<Grammar> = OnceLock::new();
static PY311_GRAMMAR: OnceLock<Grammar> = OnceLock::new();

/// Parse and memoize the grammar for `version`. Subsequent calls for the
/// same version return the same compiled `Grammar` without rebuilding it.
pub fn load_grammar(version: PyVersion) -> Result<&'static Grammar, LoadGrammarError> {
    let (cell, text) = match (version.major, version.minor) {
        (3, 9) => (&PY39_GRAMMAR, GRAMMAR_39),
        (3, 11) => (&PY311_GRAMMAR, GRAMMAR_311),
        _ => return Err(LoadGrammarError::UnsupportedVersion(version)),
    };
    if let Some(grammar) = cell.get() {
        return Ok(grammar);
    }
    let built = Grammar::from_text(text)?;
    // If another call won the race, drop our copy and use theirs: `Grammar`
    // is immutable and shared once built, so either copy is equally valid.
    let _ = cell.set(built);
    Ok(cell.get().expect("just set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_and_memoizes_py311() {
        let a = load_grammar(PyVersion::PY311).unwrap();
        let b = load_grammar(PyVersion::PY311).unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(a.nonterminal_name(a.start), "file_input");
    }

    #[test]
    fn loads_py39() {
        let grammar = load_grammar(PyVersion::PY39).unwrap();
        assert_eq!(grammar.nonterminal_name(grammar.start), "file_input");
    }

    #[test]
    fn unsupported_version_is_an_error() {
        let err = load_grammar(PyVersion { major: 2, minor: 7 }).unwrap_err();
        assert!(matches!(err, LoadGrammarError::UnsupportedVersion(_)));
    }
}
