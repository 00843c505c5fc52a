//! Error types.
//!
//! Two failure classes exist and they never mix:
//!
//! - [`ConfigError`]: raised while compiling rule text. Fatal for the whole
//!   compilation; no partially built rules collection is ever returned.
//! - [`RewriteError`]: raised while applying instructions to a live query.
//!   Fatal for that rewrite pass; the caller decides whether to retry or to
//!   serve the unmodified query.

use thiserror::Error;

/// Configuration error raised while parsing rule text.
///
/// Carries the offending rule text or key so that the rule file author can
/// find the broken line without a line-number diff.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The rule line is malformed: missing or repeated `=>`, empty input,
    /// illegal wildcard placement or an unparseable output clause.
    #[error(
        "rule not properly configured: {0}. Each non-empty line must start with # \
         or contain a rule with an input and an output, e.g. a => b. A wildcard * \
         may only appear as the very first or very last character of one input \
         segment, never on its own and never twice. The wildcard capture can be \
         spliced into a replacement with $1, e.g. a* => a $1."
    )]
    ImproperInput(String),

    /// The same canonical input key was registered twice.
    #[error("duplicate input: {0}")]
    DuplicateInput(String),
}

/// Error raised while applying a selected action to the query tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewriteError {
    /// An action span points outside the clause list it is applied to. This
    /// is an engine invariant violation, not a recoverable condition.
    #[error("rewrite span {start}..{end} exceeds scope of {len} clauses")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },
}
