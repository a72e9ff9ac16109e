//! Compiles a pgen2-style EBNF grammar into per-nonterminal DFAs with
//! precomputed transition plans (`GP` + `DB` + `GT` of the pipeline this
//! workspace implements).

mod dfa;
mod grammar;
mod meta_lexer;
mod nfa;

pub mod error;

pub use grammar::{
    DfaState, Grammar, NonterminalId, Plan, ReservedLabel, StateRef, Transition,
    FIRST_NONTERMINAL,
};
