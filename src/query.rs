//! Query tree model.
//!
//! The rewriter consumes and produces a visitable tree of boolean and
//! disjunction nodes over terms:
//!
//! ```text
//! ExpandedQuery
//!   ├─ user_query: BooleanQuery
//!   │    └─ clauses: [DisjunctionMaxQuery]       one per query position
//!   │         └─ clauses: [Term | BooleanQuery]  alternatives at that position
//!   ├─ boost_up / boost_down: [BoostQuery]       auxiliary scoring fragments
//!   └─ filter_queries: [BooleanQuery]            auxiliary filter fragments
//! ```
//!
//! Node kinds are closed enums with explicit traversal driven by the engine,
//! so adding a kind forces every match site to handle it.

use std::fmt;

use crate::Term;

/// Occurrence of a clause within its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occur {
    #[default]
    Should,
    Must,
    MustNot,
}

/// A conjunction of positions. The top-level user query is one of these.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BooleanQuery {
    pub occur: Occur,
    pub clauses: Vec<DisjunctionMaxQuery>,
}

impl BooleanQuery {
    /// Build a query with one single-term disjunction per token.
    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Self {
        BooleanQuery {
            occur: Occur::Should,
            clauses: terms.into_iter().map(DisjunctionMaxQuery::with_term).collect(),
        }
    }
}

/// One query position: a set of alternatives of which one will match.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisjunctionMaxQuery {
    pub occur: Occur,
    pub clauses: Vec<DmqClause>,
}

impl DisjunctionMaxQuery {
    pub fn with_term(term: Term) -> Self {
        DisjunctionMaxQuery { occur: Occur::Should, clauses: vec![DmqClause::Term(term)] }
    }

    /// The direct term alternatives at this position (nested sub-queries are
    /// their own matching scope and are not listed here).
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        self.clauses.iter().filter_map(|c| match c {
            DmqClause::Term(t) => Some(t),
            DmqClause::Query(_) => None,
        })
    }
}

/// Alternative under a disjunction: a term or a nested boolean sub-query.
#[derive(Debug, Clone, PartialEq)]
pub enum DmqClause {
    Term(Term),
    Query(BooleanQuery),
}

/// A scoring fragment attached outside the matched span.
#[derive(Debug, Clone, PartialEq)]
pub struct BoostQuery {
    pub query: BooleanQuery,
    pub boost: f32,
}

/// The user query plus the side collections a rewrite may grow.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpandedQuery {
    pub user_query: BooleanQuery,
    pub boost_up: Vec<BoostQuery>,
    pub boost_down: Vec<BoostQuery>,
    pub filter_queries: Vec<BooleanQuery>,
}

impl ExpandedQuery {
    pub fn new(user_query: BooleanQuery) -> Self {
        ExpandedQuery { user_query, ..Default::default() }
    }
}

/// Auxiliary fragments accumulated while one scope is being rewritten. They
/// are appended to the [`ExpandedQuery`] once the scope's clause list is no
/// longer borrowed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryExtras {
    pub boost_up: Vec<BoostQuery>,
    pub boost_down: Vec<BoostQuery>,
    pub filter_queries: Vec<BooleanQuery>,
}

/// The mutable slice of the query an instruction is allowed to touch: the
/// clause list of the scope being rewritten plus the extras accumulators.
#[derive(Debug)]
pub struct RewriteScope<'a> {
    pub clauses: &'a mut Vec<DisjunctionMaxQuery>,
    pub extras: &'a mut QueryExtras,
}

/// Parse a raw query string with the whitespace tokenizer: one single-term
/// disjunction per token.
pub fn parse(input: &str) -> BooleanQuery {
    BooleanQuery::from_terms(tokenize(input))
}

/// Whitespace tokenizer shared by query parsing and rule compilation.
pub(crate) fn tokenize(input: &str) -> Vec<Term> {
    regex!(r"\S+").find_iter(input).map(|m| Term::new(m.as_str())).collect()
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}:{}", field, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

impl fmt::Display for DisjunctionMaxQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.len() == 1 {
            return write!(f, "{}", DisplayClause(&self.clauses[0]));
        }
        write!(f, "(")?;
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", DisplayClause(clause))?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for BooleanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, dmq) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{dmq}")?;
        }
        Ok(())
    }
}

struct DisplayClause<'a>(&'a DmqClause);

impl fmt::Display for DisplayClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            DmqClause::Term(t) => write!(f, "{t}"),
            DmqClause::Query(q) => write!(f, "[{q}]"),
        }
    }
}
