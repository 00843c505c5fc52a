extern crate self as querulus;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod query;
mod rules;
mod wordbreak;

pub use api::{Options, RequestContext, compile, compile_with};
pub use engine::{PositionSequence, Rewriter, SelectionStrategy};
pub use error::{ConfigError, RewriteError};
pub use query::{
    BooleanQuery, BoostQuery, DisjunctionMaxQuery, DmqClause, ExpandedQuery, Occur, QueryExtras,
    RewriteScope, parse as parse_query,
};
pub use rules::{BoostDirection, Instruction, InstructionKinds, Instructions, RulesCollection};
pub use wordbreak::{BreakSuggestion, DocumentFrequencyProvider, WordBreaker};

// --- Core matching types -----------------------------------------------------

/// An atomic matchable unit: a string value plus an optional field tag.
///
/// Terms produced by a rewrite carry `generated = true` so downstream
/// consumers can tell rewritten vocabulary from what the user typed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    pub value: String,
    pub field: Option<String>,
    pub generated: bool,
}

impl Term {
    pub fn new(value: impl Into<String>) -> Self {
        Term { value: value.into(), field: None, generated: false }
    }

    pub fn with_field(value: impl Into<String>, field: impl Into<String>) -> Self {
        Term { value: value.into(), field: Some(field.into()), generated: false }
    }

    pub(crate) fn generated(value: impl Into<String>) -> Self {
        Term { value: value.into(), field: None, generated: true }
    }
}

/// Sentinel marking the logical start or end of the full query.
///
/// Boundaries occupy virtual positions in the lookup sequence so that rules
/// can anchor themselves to the start or end of the whole query. Nested
/// sub-expressions never get boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    Left,
    Right,
}

/// One alternative at a lookup position: a concrete term or a boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum InputElement {
    Term(Term),
    Boundary(Boundary),
}

/// Process-wide boundary sentinels, shared read-only across all rewrites.
pub const LEFT_BOUNDARY: InputElement = InputElement::Boundary(Boundary::Left);
pub const RIGHT_BOUNDARY: InputElement = InputElement::Boundary(Boundary::Right);

/// The concrete term chosen at one matched position, plus the substring a
/// wildcard captured when the match went through a wildcard edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMatch {
    pub term: Term,
    pub capture: Option<String>,
}

impl TermMatch {
    pub fn exact(term: Term) -> Self {
        TermMatch { term, capture: None }
    }
}

/// Ordered term choices for a whole matched span, one per consumed position.
pub type TermMatches = Vec<TermMatch>;

/// A concrete, position-bound match of a rule pattern, ready for instruction
/// application. Transient: created per rewrite call, never persisted.
///
/// `start`/`end` are term positions (inclusive/exclusive). Boundary elements
/// are virtual and contribute neither a position nor a term match, so an
/// anchored action's span covers only real terms.
#[derive(Debug, Clone)]
pub struct Action<'r> {
    pub start: usize,
    pub end: usize,
    pub term_matches: TermMatches,
    pub instructions: &'r Instructions,
}

impl Action<'_> {
    /// Number of term positions the action consumes.
    pub fn span_len(&self) -> usize {
        self.end - self.start
    }

    pub(crate) fn ord(&self) -> usize {
        self.instructions.ord()
    }
}
