//! DFA builder (`DB`): subset-constructs a DFA from an NFA fragment, then
//! minimizes it by repeated state merging. Grounded on `_make_dfa` and
//! `_simplify_dfa` in pgen2's `pgen.py`.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::nfa::{ArcLabel, NfaArena};

/// A DFA state before grammar-table assembly: just enough to drive subset
/// construction and minimization. `arcs` targets are indices into the same
/// rule's state vector.
#[derive(Debug, Clone)]
pub struct RawDfaState {
    pub is_final: bool,
    pub arcs: FxHashMap<ArcLabel, usize>,
}

struct BuildState {
    nfaset: FxHashSet<usize>,
    is_final: bool,
    arcs: FxHashMap<ArcLabel, usize>,
}

fn epsilon_closure(arena: &NfaArena, start: usize) -> FxHashSet<usize> {
    let mut set = FxHashSet::default();
    let mut stack = vec![start];
    while let Some(s) = stack.pop() {
        if set.insert(s) {
            for (label, target) in &arena.state(s).arcs {
                if label.is_none() {
                    stack.push(*target);
                }
            }
        }
    }
    set
}

/// Subset-construct a DFA from the NFA fragment `(entry, exit)`. The result
/// is ordered with the start state at index 0, per spec.md §3 invariant 3.
pub fn build_dfa(arena: &NfaArena, entry: usize, exit: usize) -> Vec<RawDfaState> {
    let start_set = epsilon_closure(arena, entry);
    let mut states = vec![BuildState {
        is_final: start_set.contains(&exit),
        nfaset: start_set,
        arcs: FxHashMap::default(),
    }];

    let mut i = 0;
    while i < states.len() {
        let mut grouped: FxHashMap<ArcLabel, FxHashSet<usize>> = FxHashMap::default();
        for &nfa_state in &states[i].nfaset {
            for (label, target) in &arena.state(nfa_state).arcs {
                if let Some(label) = label {
                    let closure = epsilon_closure(arena, *target);
                    grouped.entry(label.clone()).or_default().extend(closure);
                }
            }
        }

        for (label, target_set) in grouped {
            let existing = states.iter().position(|s| s.nfaset == target_set);
            let idx = existing.unwrap_or_else(|| {
                states.push(BuildState {
                    is_final: target_set.contains(&exit),
                    nfaset: target_set,
                    arcs: FxHashMap::default(),
                });
                states.len() - 1
            });
            states[i].arcs.insert(label, idx);
        }
        i += 1;
    }

    states
        .into_iter()
        .map(|s| RawDfaState {
            is_final: s.is_final,
            arcs: s.arcs,
        })
        .collect()
}

fn states_equal(a: &RawDfaState, b: &RawDfaState) -> bool {
    a.is_final == b.is_final && a.arcs == b.arcs
}

/// Fixed-point merge of any two states with identical `is_final` and
/// identical arc maps (same labels pointing to the same targets). Not
/// theoretically optimal — preserved verbatim from pgen2, which compares
/// arcs by target identity rather than recursive automaton equality, and
/// may leave pathological non-minimal-but-correct DFAs in rare cases.
pub fn minimize_dfa(states: &mut Vec<RawDfaState>) {
    loop {
        let mut merged = None;
        'search: for i in 0..states.len() {
            for j in (i + 1)..states.len() {
                if states_equal(&states[i], &states[j]) {
                    merged = Some((i, j));
                    break 'search;
                }
            }
        }
        let Some((keep, remove)) = merged else {
            break;
        };
        states.remove(remove);
        for state in states.iter_mut() {
            for target in state.arcs.values_mut() {
                if *target == remove {
                    *target = keep;
                } else if *target > remove {
                    *target -= 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::parse_grammar_text;

    fn dfa_for(src: &str) -> Vec<RawDfaState> {
        let parsed = parse_grammar_text(src).unwrap();
        let frag = parsed.rules[&parsed.start_symbol];
        let mut dfa = build_dfa(&parsed.arena, frag.entry, frag.exit);
        minimize_dfa(&mut dfa);
        dfa
    }

    #[test]
    fn single_literal_has_start_and_final_state() {
        let dfa = dfa_for("rule: 'x'\n");
        assert!(!dfa[0].is_final);
        assert_eq!(dfa[0].arcs.len(), 1);
        let target = *dfa[0].arcs.values().next().unwrap();
        assert!(dfa[target].is_final);
    }

    #[test]
    fn star_repetition_loops_back_to_start() {
        // rule: 'x'*  -- the start state should itself be final (zero
        // repetitions accepted) and have a self-referencing arc on 'x'.
        let dfa = dfa_for("rule: 'x'*\n");
        assert!(dfa[0].is_final);
        let target = *dfa[0].arcs.values().next().unwrap();
        assert_eq!(target, 0);
    }

    #[test]
    fn alternation_produces_single_final_state_after_minimization() {
        let dfa = dfa_for("rule: 'a' | 'b'\n");
        assert!(!dfa[0].is_final);
        assert_eq!(dfa[0].arcs.len(), 2);
        // Both alternatives converge on the same (minimized) final state.
        let targets: FxHashSet<_> = dfa[0].arcs.values().copied().collect();
        assert_eq!(targets.len(), 1);
    }

    #[test]
    fn plus_repetition_requires_at_least_one() {
        let dfa = dfa_for("rule: 'x'+\n");
        assert!(!dfa[0].is_final);
        let target = *dfa[0].arcs.values().next().unwrap();
        assert!(dfa[target].is_final);
        // The final state loops back on itself for further repetitions.
        assert_eq!(*dfa[target].arcs.values().next().unwrap(), target);
    }
}
