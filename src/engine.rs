//! Matching and rewriting engine.
//!
//! This module is the operational core of the crate. Rewriting a query is a
//! pipeline:
//!
//! ```text
//! rule text ──► RulesCollection            (rules/compile.rs, rules/model.rs)
//!                    │
//! query tree ── Rewriter::rewrite ─┐
//!                                  │ per boolean scope, nested scopes first
//!                                  ▼
//!                     PositionSequence<Term>      (sequence.rs)
//!                                  │  + LEFT/RIGHT boundaries at top level
//!                                  ▼
//!                     collect_actions             (collector.rs)
//!                       - trie traversal states kept per start position
//!                       - exact, wildcard and boundary edges
//!                                  │
//!                                  ▼
//!                     select                      (select.rs)
//!                       - resolve overlaps deterministically
//!                                  │
//!                                  ▼
//!                     Instruction::apply          (rules/model.rs)
//!                       - mutate clauses, grow extras, decorate context
//! ```
//!
//! The compiled [`RulesCollection`](crate::RulesCollection) and its trie are
//! immutable after construction and shared read-only across concurrent
//! rewrites; everything else here is owned by a single rewrite call.

#[path = "engine/collector.rs"]
mod collector;
#[path = "engine/rewriter.rs"]
mod rewriter;
#[path = "engine/select.rs"]
mod select;
#[path = "engine/sequence.rs"]
mod sequence;
#[path = "engine/trie.rs"]
mod trie;

pub use rewriter::Rewriter;
pub use select::SelectionStrategy;
pub use sequence::PositionSequence;
pub(crate) use trie::{DuplicateKey, ROOT, SequenceTrie, WildcardSide};
