//! Grammar tables (`GT`): assembles per-nonterminal DFAs into the
//! transition-plan tables the parser engine consumes. Grounded on
//! `Grammar._make_grammar`/`_calculate_first_terminals` in pgen2's
//! `grammar.py`.

use rustc_hash::FxHashMap;

use crate::dfa::{build_dfa, minimize_dfa, RawDfaState};
use crate::error::GrammarBuildError;
use crate::nfa::{parse_grammar_text, ArcLabel};
use pycst_common::token::TokenKind;

/// A nonterminal's grammar-assigned number. Numbered starting at 256 to sit
/// above the fixed token-kind range, mirroring pgen2's own
/// `256 + len(nonterminal2number)` convention — preserved verbatim because
/// `pycst-syntax::SyntaxKind` reuses this exact number as its raw rowan kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalId(pub u16);

pub const FIRST_NONTERMINAL: u16 = 256;

/// A distinct arc label. Plain token kinds (NUMBER, NEWLINE, …) transition
/// on kind alone; NAME and OP additionally carry a reserved-word identity
/// when the grammar text spells out a specific keyword or operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Kind(TokenKind),
    Keyword(ReservedLabel),
    Operator(ReservedLabel),
}

pub type ReservedLabel = u32;

/// A reference to a specific DFA state, possibly in a different rule's
/// table than the one currently being executed — this is what a `Plan`
/// pushes onto the parser's stack to enter a nested rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateRef {
    pub nonterminal: NonterminalId,
    pub index: usize,
}

/// Precomputed: on seeing this transition from a given DFA state, push each
/// state in `pushes` (entering nested rules), then move the top of stack to
/// `next_dfa` (a state index within the *current* rule's table).
#[derive(Debug, Clone)]
pub struct Plan {
    pub next_dfa: usize,
    pub pushes: Vec<StateRef>,
}

#[derive(Debug)]
pub struct DfaState {
    pub is_final: bool,
    pub plans: FxHashMap<Transition, Plan>,
}

/// The compiled grammar: one DFA table per nonterminal, plus enough
/// bookkeeping to map parser-facing tokens to transitions and nonterminal
/// numbers back to names for diagnostics.
pub struct Grammar {
    pub nonterminal_to_dfas: FxHashMap<NonterminalId, Vec<DfaState>>,
    pub nonterminal_names: FxHashMap<NonterminalId, String>,
    pub name_to_nonterminal: FxHashMap<String, NonterminalId>,
    pub start: NonterminalId,
    pub reserved_strings: FxHashMap<String, Transition>,
    reserved_spellings: Vec<String>,
}

impl Grammar {
    /// Compile a grammar from meta-language source text (spec.md §4.1–§4.2).
    pub fn from_text(src: &str) -> Result<Self, GrammarBuildError> {
        let parsed = parse_grammar_text(src)?;

        // Build + minimize a raw DFA per rule first.
        let mut raw_dfas: FxHashMap<String, Vec<RawDfaState>> = FxHashMap::default();
        for name in &parsed.rule_order {
            let frag = parsed.rules[name];
            let mut dfa = build_dfa(&parsed.arena, frag.entry, frag.exit);
            minimize_dfa(&mut dfa);
            raw_dfas.insert(name.clone(), dfa);
        }

        // Assign nonterminal numbers in sorted order (pgen2's own order).
        let mut sorted_names = parsed.rule_order.clone();
        sorted_names.sort();
        let mut name_to_nonterminal = FxHashMap::default();
        let mut nonterminal_names = FxHashMap::default();
        for name in &sorted_names {
            let id = NonterminalId(FIRST_NONTERMINAL + name_to_nonterminal.len() as u16);
            name_to_nonterminal.insert(name.clone(), id);
            nonterminal_names.insert(id, name.clone());
        }

        let mut builder = TableBuilder {
            raw_dfas: &raw_dfas,
            name_to_nonterminal: &name_to_nonterminal,
            reserved_strings: FxHashMap::default(),
            reserved_spellings: Vec::new(),
            first_terminals: FxHashMap::default(),
            first_plans: FxHashMap::default(),
        };

        for name in &sorted_names {
            if !builder.first_terminals.contains_key(name) {
                builder.calculate_first_terminals(name)?;
            }
        }

        let mut nonterminal_to_dfas = FxHashMap::default();
        for name in &sorted_names {
            let id = name_to_nonterminal[name];
            let dfas = builder.assemble_rule(name, &name_to_nonterminal)?;
            nonterminal_to_dfas.insert(id, dfas);
        }

        let start = name_to_nonterminal[&parsed.start_symbol];

        Ok(Grammar {
            nonterminal_to_dfas,
            nonterminal_names,
            name_to_nonterminal,
            start,
            reserved_strings: builder.reserved_strings,
            reserved_spellings: builder.reserved_spellings,
        })
    }

    /// Map a token's kind + text to its grammar transition, resolving
    /// reserved keyword/operator spellings first, exactly as
    /// `_token_to_transition` does for `PE`.
    pub fn token_to_transition(&self, kind: TokenKind, text: &str) -> Transition {
        if kind.carries_reserved_identity() {
            if let Some(&t) = self.reserved_strings.get(text) {
                return t;
            }
        }
        Transition::Kind(kind)
    }

    pub fn spelling_of(&self, label: ReservedLabel) -> &str {
        &self.reserved_spellings[label as usize]
    }

    pub fn start_dfas(&self) -> &[DfaState] {
        &self.nonterminal_to_dfas[&self.start]
    }

    pub fn nonterminal_name(&self, id: NonterminalId) -> &str {
        &self.nonterminal_names[&id]
    }
}

struct TableBuilder<'a> {
    raw_dfas: &'a FxHashMap<String, Vec<RawDfaState>>,
    name_to_nonterminal: &'a FxHashMap<String, NonterminalId>,
    reserved_strings: FxHashMap<String, Transition>,
    reserved_spellings: Vec<String>,
    /// `None` while a rule's first-set computation is in progress (left
    /// recursion sentinel), `Some` once complete.
    first_terminals: FxHashMap<String, Option<Vec<Transition>>>,
    first_plans: FxHashMap<String, FxHashMap<Transition, Vec<StateRef>>>,
}

impl<'a> TableBuilder<'a> {
    fn intern(&mut self, spelling: &str) -> ReservedLabel {
        let id = self.reserved_spellings.len() as ReservedLabel;
        self.reserved_spellings.push(spelling.to_string());
        id
    }

    fn resolve_terminal(&mut self, rule: &str, label: &ArcLabel) -> Result<Transition, GrammarBuildError> {
        match label {
            ArcLabel::Literal(spelling) => {
                if let Some(&t) = self.reserved_strings.get(spelling) {
                    return Ok(t);
                }
                let is_keyword = spelling.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false);
                let id = self.intern(spelling);
                let t = if is_keyword {
                    Transition::Keyword(id)
                } else {
                    Transition::Operator(id)
                };
                self.reserved_strings.insert(spelling.clone(), t);
                Ok(t)
            }
            ArcLabel::Name(name) => token_kind_from_name(name)
                .map(Transition::Kind)
                .ok_or_else(|| GrammarBuildError::UndefinedNonterminal {
                    rule: rule.to_string(),
                    reference: name.clone(),
                }),
        }
    }

    /// Ports `_calculate_first_terminals`: only the start state (index 0)
    /// of a rule's DFA is examined, since that's all that can begin it.
    fn calculate_first_terminals(&mut self, rule: &str) -> Result<(), GrammarBuildError> {
        self.first_terminals.insert(rule.to_string(), None);
        self.first_plans.insert(rule.to_string(), FxHashMap::default());

        let dfas = &self.raw_dfas[rule];
        let start = &dfas[0];

        let mut total: Vec<Transition> = Vec::new();
        let mut overlap_origin: FxHashMap<Transition, String> = FxHashMap::default();

        for (label, &next_index) in &start.arcs {
            match label {
                ArcLabel::Name(name) if self.name_to_nonterminal.contains_key(name) => {
                    if !self.first_terminals.contains_key(name) {
                        self.calculate_first_terminals(name)?;
                    }
                    let fset = self.first_terminals[name].clone().ok_or_else(|| {
                        GrammarBuildError::LeftRecursion { rule: rule.to_string() }
                    })?;

                    for t in &fset {
                        if let Some(existing) = overlap_origin.get(t) {
                            return Err(GrammarBuildError::Ambiguity {
                                rule: rule.to_string(),
                                terminal: format!("{t:?}"),
                                first_origin: existing.clone(),
                                second_origin: name.clone(),
                            });
                        }
                        overlap_origin.insert(*t, name.clone());
                        total.push(*t);
                    }

                    let sub_plans = self.first_plans[name].clone();
                    let entry = self.first_plans.get_mut(rule).unwrap();
                    for (t, pushes) in sub_plans {
                        let mut full_pushes = vec![StateRef {
                            nonterminal: self.name_to_nonterminal[name],
                            index: next_index,
                        }];
                        full_pushes.extend(pushes);
                        entry.insert(t, full_pushes);
                    }
                }
                _ => {
                    let t = self.resolve_terminal(rule, label)?;
                    if let Some(existing) = overlap_origin.get(&t) {
                        return Err(GrammarBuildError::Ambiguity {
                            rule: rule.to_string(),
                            terminal: format!("{t:?}"),
                            first_origin: existing.clone(),
                            second_origin: format!("{label:?}"),
                        });
                    }
                    overlap_origin.insert(t, format!("{label:?}"));
                    total.push(t);
                    self.first_plans.get_mut(rule).unwrap().insert(
                        t,
                        vec![StateRef {
                            nonterminal: self.name_to_nonterminal[rule],
                            index: next_index,
                        }],
                    );
                }
            }
        }

        self.first_terminals.insert(rule.to_string(), Some(total));
        Ok(())
    }

    /// Splices nonterminal-arc first-plans into every state of a rule,
    /// producing its final `plans` maps (the second half of
    /// `Grammar._make_grammar`).
    fn assemble_rule(
        &mut self,
        rule: &str,
        name_to_nonterminal: &FxHashMap<String, NonterminalId>,
    ) -> Result<Vec<DfaState>, GrammarBuildError> {
        let dfas = &self.raw_dfas[rule];
        let mut out = Vec::with_capacity(dfas.len());

        for state in dfas {
            let mut plans = FxHashMap::default();
            for (label, &next_index) in &state.arcs {
                match label {
                    ArcLabel::Name(name) if name_to_nonterminal.contains_key(name) => {
                        for (t, pushes) in &self.first_plans[name] {
                            plans.insert(
                                *t,
                                Plan {
                                    next_dfa: next_index,
                                    pushes: pushes.clone(),
                                },
                            );
                        }
                    }
                    _ => {
                        let t = self.resolve_terminal(rule, label)?;
                        plans.insert(
                            t,
                            Plan {
                                next_dfa: next_index,
                                pushes: Vec::new(),
                            },
                        );
                    }
                }
            }
            out.push(DfaState {
                is_final: state.is_final,
                plans,
            });
        }

        Ok(out)
    }
}

/// Maps a bare name appearing in grammar text to a fixed token kind, when
/// it is not itself a nonterminal reference.
fn token_kind_from_name(name: &str) -> Option<TokenKind> {
    Some(match name {
        "NAME" => TokenKind::Name,
        "NUMBER" => TokenKind::Number,
        "STRING" => TokenKind::String,
        "FSTRING_START" => TokenKind::FstringStart,
        "FSTRING_STRING" => TokenKind::FstringString,
        "FSTRING_END" => TokenKind::FstringEnd,
        "NEWLINE" => TokenKind::Newline,
        "INDENT" => TokenKind::Indent,
        "DEDENT" => TokenKind::Dedent,
        "ERROR_DEDENT" => TokenKind::ErrorDedent,
        "OP" => TokenKind::Op,
        "ERRORTOKEN" => TokenKind::ErrorToken,
        "ENDMARKER" => TokenKind::Endmarker,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_grammar() {
        let grammar = Grammar::from_text("file_input: NAME NEWLINE ENDMARKER\n").unwrap();
        assert_eq!(grammar.nonterminal_name(grammar.start), "file_input");
        assert_eq!(grammar.start_dfas().len() > 0, true);
    }

    #[test]
    fn reserved_keyword_gets_its_own_transition() {
        let grammar = Grammar::from_text("stmt: 'if' NAME | NAME\n").unwrap();
        let t = grammar.token_to_transition(TokenKind::Name, "if");
        assert!(matches!(t, Transition::Keyword(_)));
        let t2 = grammar.token_to_transition(TokenKind::Name, "anything_else");
        assert!(matches!(t2, Transition::Kind(TokenKind::Name)));
    }

    #[test]
    fn left_recursion_is_rejected() {
        let err = Grammar::from_text("expr: expr '+' NAME | NAME\n").unwrap_err();
        assert!(matches!(err, GrammarBuildError::LeftRecursion { .. }));
    }

    #[test]
    fn ambiguous_first_sets_are_rejected() {
        // Both alternatives can start with NAME: ambiguous.
        let err = Grammar::from_text("start: a | b\na: NAME\nb: NAME\n").unwrap_err();
        assert!(matches!(err, GrammarBuildError::Ambiguity { .. }));
    }

    #[test]
    fn nested_nonterminal_push_is_recorded_in_plan() {
        let grammar = Grammar::from_text("file_input: stmt ENDMARKER\nstmt: NAME NEWLINE\n").unwrap();
        let start_dfas = grammar.start_dfas();
        let transition = Transition::Kind(TokenKind::Name);
        let plan = start_dfas[0].plans.get(&transition).unwrap();
        assert_eq!(plan.pushes.len(), 1);
        assert_eq!(
            grammar.nonterminal_name(plan.pushes[0].nonterminal),
            "stmt"
        );
    }
}
