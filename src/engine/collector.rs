//! Match collection.
//!
//! A state machine over the lookup sequence. Active partial matches are trie
//! traversal states keyed by their start position; at every position each
//! active state, plus a freshly started one, advances by every alternative
//! element at that position:
//!
//! ```text
//! position:      0        1        2
//! alternatives: [LEFT]   [a, a2]  [b]
//!
//! fresh@0 ──LEFT──► anchored state
//! fresh@1 ──a─────► known ──b──► final  => Action [0..2)
//!          └─a2───► unknown (dropped)
//! ```
//!
//! States that reach a node holding a value emit a candidate action and keep
//! going, so a shorter rule firing inside a longer one still surfaces both
//! candidates for the selection strategy to arbitrate.

use tracing::trace;

use super::sequence::PositionSequence;
use super::trie::{NodeId, ROOT};
use crate::rules::{PatternKey, RulesCollection};
use crate::{Action, InputElement, TermMatch, TermMatches};

#[derive(Debug, Clone)]
struct Partial {
    node: NodeId,
    /// Start of the consumed span, in term positions.
    start: usize,
    /// Exclusive end of the consumed span so far, in term positions.
    end: usize,
    matches: TermMatches,
}

/// Walk `lookup` against the compiled rules and return every candidate
/// action. `offset` is 1 when a LEFT boundary occupies position 0.
///
/// Candidate spans are reported in term coordinates: boundary elements are
/// virtual and contribute neither span positions nor term matches.
pub(crate) fn collect_actions<'r>(
    rules: &'r RulesCollection,
    lookup: &PositionSequence<InputElement>,
    offset: usize,
) -> Vec<Action<'r>> {
    let trie = rules.trie();
    let mut actions: Vec<Action<'r>> = Vec::new();
    let mut active: Vec<Partial> = Vec::new();

    for (pos, alternatives) in lookup.iter().enumerate() {
        let mut carried: Vec<Partial> = Vec::new();
        let term_pos = pos.saturating_sub(offset);
        let fresh = Partial { node: ROOT, start: term_pos, end: term_pos, matches: Vec::new() };

        for source in active.iter().chain(std::iter::once(&fresh)) {
            for alternative in alternatives {
                match alternative {
                    InputElement::Boundary(boundary) => {
                        if let Some(node) = trie.step(source.node, &PatternKey::Boundary(*boundary)) {
                            let next = Partial {
                                node,
                                start: source.start,
                                end: source.end,
                                matches: source.matches.clone(),
                            };
                            emit_if_final(rules, &next, &mut actions);
                            carried.push(next);
                        }
                    }
                    InputElement::Term(term) => {
                        let form = rules.fold(&term.value);
                        let end = term_pos + 1;

                        if let Some(node) = trie.step(source.node, &PatternKey::Term(form.clone())) {
                            let mut matches = source.matches.clone();
                            matches.push(TermMatch::exact(term.clone()));
                            let next = Partial { node, start: source.start, end, matches };
                            emit_if_final(rules, &next, &mut actions);
                            carried.push(next);
                        }

                        for (node, capture) in trie.wildcard_steps(source.node, &form) {
                            let mut matches = source.matches.clone();
                            matches.push(TermMatch { term: term.clone(), capture: Some(capture) });
                            let next = Partial { node, start: source.start, end, matches };
                            emit_if_final(rules, &next, &mut actions);
                            carried.push(next);
                        }
                    }
                }
            }
        }
        active = carried;
    }

    trace!(candidates = actions.len(), "collected candidate actions");
    actions
}

fn emit_if_final<'r>(rules: &'r RulesCollection, state: &Partial, actions: &mut Vec<Action<'r>>) {
    if let Some(instructions) = rules.trie().value(state.node) {
        actions.push(Action {
            start: state.start,
            end: state.end,
            term_matches: state.matches.clone(),
            instructions,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Term;
    use crate::api::Options;
    use crate::rules::parse_rules;
    use crate::{LEFT_BOUNDARY, RIGHT_BOUNDARY};

    fn compile(rules: &str) -> RulesCollection {
        parse_rules(rules, &Options::default()).unwrap()
    }

    fn lookup_of(tokens: &[&str], boundaries: bool) -> (PositionSequence<InputElement>, usize) {
        let mut seq = PositionSequence::new();
        if boundaries {
            seq.next_position();
            seq.add_element(LEFT_BOUNDARY);
        }
        for token in tokens {
            seq.next_position();
            seq.add_element(InputElement::Term(Term::new(*token)));
        }
        if boundaries {
            seq.next_position();
            seq.add_element(RIGHT_BOUNDARY);
        }
        (seq, usize::from(boundaries))
    }

    #[test]
    fn multi_token_rule_spans_all_consumed_positions() {
        let rules = compile("c => d\na b => b");
        let (lookup, offset) = lookup_of(&["a", "b"], false);

        let actions = collect_actions(&rules, &lookup, offset);
        assert_eq!(actions.len(), 1);
        assert_eq!((actions[0].start, actions[0].end), (0, 2));
        assert_eq!(actions[0].term_matches.len(), 2);
        assert_eq!(actions[0].term_matches[1].term.value, "b");
    }

    #[test]
    fn unknown_token_yields_no_candidates() {
        let rules = compile("c => d\na b => b");
        let (lookup, offset) = lookup_of(&["x"], false);
        assert!(collect_actions(&rules, &lookup, offset).is_empty());
    }

    #[test]
    fn rule_fires_at_every_occurrence() {
        let rules = compile("c => d");
        let (lookup, offset) = lookup_of(&["c", "x", "c"], false);

        let actions = collect_actions(&rules, &lookup, offset);
        let spans: Vec<(usize, usize)> = actions.iter().map(|a| (a.start, a.end)).collect();
        assert_eq!(spans, [(0, 1), (2, 3)]);
    }

    #[test]
    fn alternatives_at_one_position_all_advance() {
        let rules = compile("a b => x\nq b => y");
        let mut lookup = PositionSequence::new();
        lookup.next_position();
        lookup.add_element(InputElement::Term(Term::new("a")));
        lookup.add_element(InputElement::Term(Term::new("q")));
        lookup.next_position();
        lookup.add_element(InputElement::Term(Term::new("b")));

        let actions = collect_actions(&rules, &lookup, 0);
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| (a.start, a.end) == (0, 2)));
    }

    #[test]
    fn wildcard_match_captures_remainder() {
        let rules = compile("ab* => cd");
        let (lookup, offset) = lookup_of(&["abc"], false);

        let actions = collect_actions(&rules, &lookup, offset);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].term_matches[0].capture.as_deref(), Some("c"));

        let (lookup, offset) = lookup_of(&["xab"], false);
        assert!(collect_actions(&rules, &lookup, offset).is_empty());
    }

    #[test]
    fn left_anchored_rule_only_matches_at_query_start() {
        let rules = compile("\"a => b");

        let (lookup, offset) = lookup_of(&["a", "x"], true);
        let actions = collect_actions(&rules, &lookup, offset);
        assert_eq!(actions.len(), 1);
        assert_eq!((actions[0].start, actions[0].end), (0, 1));

        let (lookup, offset) = lookup_of(&["x", "a"], true);
        assert!(collect_actions(&rules, &lookup, offset).is_empty());
    }

    #[test]
    fn right_anchored_rule_only_matches_at_query_end() {
        let rules = compile("a\" => b");

        let (lookup, offset) = lookup_of(&["x", "a"], true);
        let actions = collect_actions(&rules, &lookup, offset);
        assert_eq!(actions.len(), 1);
        assert_eq!((actions[0].start, actions[0].end), (1, 2));
        assert_eq!(actions[0].term_matches.len(), 1);

        let (lookup, offset) = lookup_of(&["a", "x"], true);
        assert!(collect_actions(&rules, &lookup, offset).is_empty());
    }

    #[test]
    fn anchors_are_ignored_without_boundaries_in_the_lookup() {
        // nested scopes build their lookup without boundary elements, so an
        // anchored rule cannot fire there
        let rules = compile("\"a => b");
        let (lookup, offset) = lookup_of(&["a"], false);
        assert!(collect_actions(&rules, &lookup, offset).is_empty());
    }

    #[test]
    fn shorter_and_longer_rules_both_surface() {
        let rules = compile("a => x\na b => y");
        let (lookup, offset) = lookup_of(&["a", "b"], false);

        let actions = collect_actions(&rules, &lookup, offset);
        let spans: Vec<(usize, usize)> = actions.iter().map(|a| (a.start, a.end)).collect();
        assert_eq!(spans, [(0, 1), (0, 2)]);
    }
}
