//! Rewrite orchestration.
//!
//! One rewrite pass walks the query tree, builds a position sequence per
//! boolean scope, matches it against the compiled rules and applies the
//! selected actions:
//!
//! ```text
//! ExpandedQuery ── rewrite ──► nested scopes first (no boundaries)
//!                              │
//!                              ▼
//!                  top-level scope: [LEFT] t0 t1 .. [RIGHT]
//!                              │ collect ► select ► apply
//!                              ▼
//!                  mutated clauses + extras + context side channel
//! ```
//!
//! Actions are applied in start order. Because a Replace can change the
//! number of clauses in the scope, a running clause-index delta keeps later
//! actions aligned; the delta is derived from the observed clause count, not
//! from instruction payloads.

use tracing::debug;

use super::collector::collect_actions;
use super::select::{SelectionStrategy, select};
use super::sequence::PositionSequence;
use crate::api::RequestContext;
use crate::error::RewriteError;
use crate::query::{DisjunctionMaxQuery, DmqClause, ExpandedQuery, QueryExtras, RewriteScope};
use crate::rules::RulesCollection;
use crate::{Action, InputElement, LEFT_BOUNDARY, RIGHT_BOUNDARY, Term};

/// Applies a compiled rules collection to queries. Cheap to share: holds
/// only frozen state and can serve many concurrent rewrites.
#[derive(Debug, Clone)]
pub struct Rewriter {
    rules: RulesCollection,
    selection: SelectionStrategy,
}

impl Rewriter {
    pub fn new(rules: RulesCollection) -> Self {
        Self::with_selection(rules, SelectionStrategy::default())
    }

    pub fn with_selection(rules: RulesCollection, selection: SelectionStrategy) -> Self {
        Rewriter { rules, selection }
    }

    pub fn rules(&self) -> &RulesCollection {
        &self.rules
    }

    pub fn selection(&self) -> SelectionStrategy {
        self.selection
    }

    /// Run one rewrite pass over `query`, mutating it in place and recording
    /// side effects (decorations, applied-rule log, debug trace) in `ctx`.
    pub fn rewrite(
        &self,
        query: &mut ExpandedQuery,
        ctx: &mut RequestContext,
    ) -> Result<(), RewriteError> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let mut extras = QueryExtras::default();
        self.rewrite_scope(&mut query.user_query.clauses, &mut extras, ctx, true)?;
        query.boost_up.append(&mut extras.boost_up);
        query.boost_down.append(&mut extras.boost_down);
        query.filter_queries.append(&mut extras.filter_queries);
        Ok(())
    }

    /// Rewrite one boolean scope. Nested sub-queries are handled first with
    /// their own sequence; only the top-level scope is boundary-anchored.
    fn rewrite_scope(
        &self,
        clauses: &mut Vec<DisjunctionMaxQuery>,
        extras: &mut QueryExtras,
        ctx: &mut RequestContext,
        top_level: bool,
    ) -> Result<(), RewriteError> {
        for dmq in clauses.iter_mut() {
            for sub in dmq.clauses.iter_mut() {
                if let DmqClause::Query(nested) = sub {
                    self.rewrite_scope(&mut nested.clauses, extras, ctx, false)?;
                }
            }
        }

        let mut sequence: PositionSequence<Term> = PositionSequence::new();
        for dmq in clauses.iter() {
            sequence.next_position();
            for term in dmq.terms() {
                sequence.add_element(term.clone());
            }
        }

        let (lookup, offset) =
            if top_level { (add_boundaries(&sequence), 1) } else { (to_input_sequence(&sequence), 0) };

        let candidates = collect_actions(&self.rules, &lookup, offset);
        let actions = select(self.selection, candidates);

        let mut delta: isize = 0;
        for action in &actions {
            if ctx.debug_enabled {
                ctx.debug_log.push(describe(action));
            }
            let start = shifted(action.start, delta);
            let mut end = shifted(action.end, delta);
            let scope_len = clauses.len() as isize;

            for instruction in action.instructions {
                let before = clauses.len() as isize;
                let mut scope = RewriteScope { clauses: &mut *clauses, extras: &mut *extras };
                instruction.apply(&sequence, &action.term_matches, start, end, &mut scope, ctx)?;
                // an instruction may grow or shrink the matched span
                end = shifted(end, clauses.len() as isize - before);
            }
            delta += clauses.len() as isize - scope_len;

            debug!(
                rule = action.instructions.log_message(),
                start = action.start,
                end = action.end,
                "applied rewrite action"
            );
            let message = action.instructions.log_message();
            if !ctx.applied_rules.iter().any(|m| m == message) {
                ctx.applied_rules.push(message.to_string());
            }
        }
        Ok(())
    }
}

fn shifted(position: usize, delta: isize) -> usize {
    usize::try_from(position as isize + delta).unwrap_or(0)
}

fn to_input_sequence(sequence: &PositionSequence<Term>) -> PositionSequence<InputElement> {
    let mut out = PositionSequence::new();
    for terms in sequence {
        out.next_position();
        for term in terms {
            out.add_element(InputElement::Term(term.clone()));
        }
    }
    out
}

fn add_boundaries(sequence: &PositionSequence<Term>) -> PositionSequence<InputElement> {
    let mut out = PositionSequence::new();
    out.next_position();
    out.add_element(LEFT_BOUNDARY);
    for terms in sequence {
        out.next_position();
        for term in terms {
            out.add_element(InputElement::Term(term.clone()));
        }
    }
    out.next_position();
    out.add_element(RIGHT_BOUNDARY);
    out
}

fn describe(action: &Action<'_>) -> String {
    let matched: Vec<&str> = action.term_matches.iter().map(|m| m.term.value.as_str()).collect();
    format!(
        "rule '{}' matched [{}..{}) on '{}'",
        action.instructions.log_message(),
        action.start,
        action.end,
        matched.join(" ")
    )
}
