//! Rule model and compilation.
//!
//! - `model.rs`: the instruction variants, the per-rule `Instructions` bag
//!   and the compiled `RulesCollection` (a sequence trie keyed by pattern
//!   elements). Built once at configuration time, then frozen and shared
//!   read-only across rewrites.
//! - `compile.rs`: the line-oriented rule text parser that builds a
//!   `RulesCollection`, validating wildcard placement and duplicate inputs.

#[path = "rules/compile.rs"]
mod compile;
#[path = "rules/model.rs"]
mod model;

pub(crate) use compile::parse_rules;
pub use model::{BoostDirection, Instruction, InstructionKinds, Instructions, RulesCollection};
pub(crate) use model::PatternKey;
