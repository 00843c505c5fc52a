//! Overlap resolution.
//!
//! The collector reports every candidate match, including candidates whose
//! spans overlap. Selection resolves them into a conflict-free, stably
//! ordered action list so that side effects (query mutation, decoration and
//! log ordering) are reproducible on every invocation.

use tracing::debug;

use crate::Action;

/// Policy for resolving overlapping candidate actions.
///
/// Both policies are total orders, so equal candidates cannot tie: after the
/// primary criterion, the rule's declaration order decides, and the leftmost
/// start wins among remaining equals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionStrategy {
    /// Longer spans dominate overlapping shorter ones; among equal-length
    /// competitors the earlier-declared rule wins. Disjoint candidates are
    /// always kept. This is the default.
    #[default]
    TopByPriority,
    /// Scanning left to right, the first candidate wins regardless of span
    /// length; later overlapping candidates are discarded.
    FirstMatchWins,
}

/// Resolve `candidates` into a non-overlapping action list ordered by start
/// position. Deterministic: the same candidate set always yields the same
/// result.
pub(crate) fn select<'r>(
    strategy: SelectionStrategy,
    mut candidates: Vec<Action<'r>>,
) -> Vec<Action<'r>> {
    match strategy {
        SelectionStrategy::TopByPriority => candidates.sort_by(|a, b| {
            b.span_len()
                .cmp(&a.span_len())
                .then_with(|| a.ord().cmp(&b.ord()))
                .then_with(|| a.start.cmp(&b.start))
        }),
        SelectionStrategy::FirstMatchWins => {
            candidates.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.ord().cmp(&b.ord())));
        }
    }

    let mut chosen: Vec<Action<'r>> = Vec::new();
    for candidate in candidates {
        let disjoint =
            chosen.iter().all(|kept| candidate.end <= kept.start || candidate.start >= kept.end);
        if disjoint {
            chosen.push(candidate);
        }
    }
    chosen.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.ord().cmp(&b.ord())));

    debug!(selected = chosen.len(), ?strategy, "resolved overlapping candidates");
    chosen
}
