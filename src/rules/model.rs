//! Instructions and the compiled rules collection.

use crate::api::RequestContext;
use crate::engine::{DuplicateKey, PositionSequence, ROOT, SequenceTrie, WildcardSide};
use crate::error::RewriteError;
use crate::query::{BooleanQuery, BoostQuery, DisjunctionMaxQuery, DmqClause, Occur, RewriteScope};
use crate::{Boundary, Term, TermMatches};

bitflags::bitflags! {
    /// Which instruction variants a compiled rules collection contains.
    ///
    /// Lets embedders skip plumbing for effects that cannot occur, e.g. a
    /// decoration sink when no rule decorates.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InstructionKinds: u8 {
        const REPLACE  = 1 << 0;
        const SYNONYM  = 1 << 1;
        const DECORATE = 1 << 2;
        const BOOST    = 1 << 3;
        const FILTER   = 1 << 4;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostDirection {
    Up,
    Down,
}

/// One operation a matched rule performs.
///
/// Every variant shares the same `apply` contract: it either mutates the
/// query tree at the matched span, grows the auxiliary query fragments, or
/// writes into the per-request context. Applying the same instruction twice
/// with different spans in one rewrite pass is safe (decorations accumulate
/// into a set, fragments append).
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Substitute the matched span with the output token sequence. An empty
    /// output deletes the span. `$1` in an output token splices the
    /// wildcard-captured substring.
    Replace { terms: Vec<Term> },
    /// Add the output tokens as alternatives at every matched position,
    /// leaving the original terms in place.
    Synonym { terms: Vec<Term> },
    /// Add an opaque tag to the per-request decoration set.
    Decorate { value: String },
    /// Attach an auxiliary scoring fragment outside the matched span.
    Boost { terms: Vec<Term>, factor: f32, direction: BoostDirection },
    /// Attach an auxiliary filter fragment outside the matched span.
    Filter { terms: Vec<Term> },
}

impl Instruction {
    pub fn kind(&self) -> InstructionKinds {
        match self {
            Instruction::Replace { .. } => InstructionKinds::REPLACE,
            Instruction::Synonym { .. } => InstructionKinds::SYNONYM,
            Instruction::Decorate { .. } => InstructionKinds::DECORATE,
            Instruction::Boost { .. } => InstructionKinds::BOOST,
            Instruction::Filter { .. } => InstructionKinds::FILTER,
        }
    }

    /// Token values this instruction may introduce into a query. Empty for
    /// instructions that add nothing.
    pub fn generable_terms(&self) -> &[Term] {
        match self {
            Instruction::Replace { terms }
            | Instruction::Synonym { terms }
            | Instruction::Boost { terms, .. }
            | Instruction::Filter { terms } => terms,
            Instruction::Decorate { .. } => &[],
        }
    }

    /// Apply this instruction to the live query.
    ///
    /// `term_matches` holds the concrete term chosen at each consumed
    /// position, `start`/`end` the matched span within `scope.clauses`.
    /// The position sequence is available for reading original alternatives;
    /// none of the built-in variants need it.
    pub fn apply(
        &self,
        _sequence: &PositionSequence<Term>,
        term_matches: &TermMatches,
        start: usize,
        end: usize,
        scope: &mut RewriteScope<'_>,
        ctx: &mut RequestContext,
    ) -> Result<(), RewriteError> {
        let capture = term_matches.iter().find_map(|m| m.capture.as_deref());
        match self {
            Instruction::Replace { terms } => {
                check_span(start, end, scope.clauses.len())?;
                let replacement: Vec<DisjunctionMaxQuery> = terms
                    .iter()
                    .map(|t| DisjunctionMaxQuery::with_term(materialize(t, capture)))
                    .collect();
                scope.clauses.splice(start..end, replacement);
            }
            Instruction::Synonym { terms } => {
                check_span(start, end, scope.clauses.len())?;
                for position in start..end {
                    scope.clauses[position].clauses.push(synonym_clause(terms, capture));
                }
            }
            Instruction::Decorate { value } => {
                ctx.decorations.insert(value.clone());
            }
            Instruction::Boost { terms, factor, direction } => {
                let boost = BoostQuery { query: fragment(terms, capture), boost: *factor };
                match direction {
                    BoostDirection::Up => scope.extras.boost_up.push(boost),
                    BoostDirection::Down => scope.extras.boost_down.push(boost),
                }
            }
            Instruction::Filter { terms } => {
                scope.extras.filter_queries.push(fragment(terms, capture));
            }
        }
        Ok(())
    }
}

fn check_span(start: usize, end: usize, len: usize) -> Result<(), RewriteError> {
    if start > end || end > len {
        return Err(RewriteError::SpanOutOfBounds { start, end, len });
    }
    Ok(())
}

/// Turn an output token into a generated query term, splicing the wildcard
/// capture into `$1` when one exists.
fn materialize(template: &Term, capture: Option<&str>) -> Term {
    let value = match capture {
        Some(c) if template.value.contains("$1") => template.value.replace("$1", c),
        _ => template.value.clone(),
    };
    Term { value, field: template.field.clone(), generated: true }
}

fn synonym_clause(terms: &[Term], capture: Option<&str>) -> DmqClause {
    if let [single] = terms {
        DmqClause::Term(materialize(single, capture))
    } else {
        DmqClause::Query(fragment(terms, capture))
    }
}

fn fragment(terms: &[Term], capture: Option<&str>) -> BooleanQuery {
    BooleanQuery {
        occur: Occur::Should,
        clauses: terms
            .iter()
            .map(|t| DisjunctionMaxQuery::with_term(materialize(t, capture)))
            .collect(),
    }
}

/// The ordered operations of one rule plus its named properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Instructions {
    ord: usize,
    items: Vec<Instruction>,
    log_message: String,
}

impl Instructions {
    pub(crate) fn new(ord: usize, items: Vec<Instruction>, log_message: String) -> Self {
        Instructions { ord, items, log_message }
    }

    /// Declaration order of the owning rule. A total order over rules, used
    /// to break selection ties.
    pub fn ord(&self) -> usize {
        self.ord
    }

    /// Audit-trail message recorded when the rule fires.
    pub fn log_message(&self) -> &str {
        &self.log_message
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn kinds(&self) -> InstructionKinds {
        self.items.iter().fold(InstructionKinds::empty(), |acc, i| acc | i.kind())
    }
}

impl<'a> IntoIterator for &'a Instructions {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// One unit in the rules trie key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum PatternKey {
    Term(String),
    Boundary(Boundary),
}

/// One element of a parsed rule input pattern, already case-folded.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PatternElement {
    Term(String),
    Wildcard { stem: String, side: WildcardSide },
}

/// A validated rule input: optional boundary anchors around the elements.
/// The compiler guarantees at most one wildcard, in first or last position.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InputPattern {
    pub left_anchor: bool,
    pub right_anchor: bool,
    pub elements: Vec<PatternElement>,
}

/// The compiled, immutable mapping from rule input patterns to instructions.
///
/// Built once by the rule compiler, then only read. Lookups borrow shared
/// state, so the collection can serve unsynchronized concurrent rewrites.
#[derive(Debug, Clone)]
pub struct RulesCollection {
    trie: SequenceTrie<PatternKey, Instructions>,
    ignore_case: bool,
    kinds: InstructionKinds,
    rule_count: usize,
}

impl RulesCollection {
    pub(crate) fn new(ignore_case: bool) -> Self {
        RulesCollection {
            trie: SequenceTrie::new(),
            ignore_case,
            kinds: InstructionKinds::empty(),
            rule_count: 0,
        }
    }

    pub(crate) fn insert(
        &mut self,
        pattern: &InputPattern,
        instructions: Instructions,
    ) -> Result<(), DuplicateKey> {
        let wild = pattern
            .elements
            .iter()
            .position(|e| matches!(e, PatternElement::Wildcard { .. }));

        let keys_before = |elements: &[PatternElement]| -> Vec<PatternKey> {
            elements
                .iter()
                .filter_map(|e| match e {
                    PatternElement::Term(value) => Some(PatternKey::Term(value.clone())),
                    PatternElement::Wildcard { .. } => None,
                })
                .collect()
        };

        let split = wild.unwrap_or(pattern.elements.len());
        let mut node = ROOT;
        if pattern.left_anchor {
            node = self.trie.extend_path(node, [PatternKey::Boundary(Boundary::Left)]);
        }
        node = self.trie.extend_path(node, keys_before(&pattern.elements[..split]));
        if let Some(index) = wild {
            if let PatternElement::Wildcard { stem, side } = &pattern.elements[index] {
                node = self.trie.add_wildcard(node, *side, stem);
            }
            node = self.trie.extend_path(node, keys_before(&pattern.elements[index + 1..]));
        }
        if pattern.right_anchor {
            node = self.trie.extend_path(node, [PatternKey::Boundary(Boundary::Right)]);
        }

        self.kinds |= instructions.kinds();
        self.trie.set_value(node, instructions)?;
        self.rule_count += 1;
        Ok(())
    }

    /// Number of registered input patterns.
    pub fn len(&self) -> usize {
        self.rule_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Union of the instruction variants present in this collection.
    pub fn instruction_kinds(&self) -> InstructionKinds {
        self.kinds
    }

    /// Every token value any rule in this collection may introduce.
    /// Deduplicated and deterministically ordered.
    pub fn generable_terms(&self) -> Vec<&Term> {
        let mut out: Vec<&Term> = self
            .trie
            .values()
            .flat_map(|instructions| instructions.iter())
            .flat_map(Instruction::generable_terms)
            .collect();
        out.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.field.cmp(&b.field)));
        out.dedup();
        out
    }

    /// Case-fold a lookup form according to this collection's sensitivity.
    pub(crate) fn fold(&self, value: &str) -> String {
        if self.ignore_case { value.to_lowercase() } else { value.to_string() }
    }

    pub(crate) fn trie(&self) -> &SequenceTrie<PatternKey, Instructions> {
        &self.trie
    }
}
