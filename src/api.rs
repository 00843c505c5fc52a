use std::collections::BTreeSet;

use crate::engine::{Rewriter, SelectionStrategy};
use crate::error::ConfigError;
use crate::rules;

/// Construction-time configuration for rule compilation and rewriting.
#[derive(Debug, Clone)]
pub struct Options {
    /// Fold all trie keys and lookups through lower-casing.
    pub ignore_case: bool,
    /// Delimiter separating alternative input segments of one rule line.
    pub input_delimiter: String,
    /// Policy for resolving overlapping matches.
    pub selection: SelectionStrategy,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            ignore_case: true,
            input_delimiter: "\t".to_string(),
            selection: SelectionStrategy::default(),
        }
    }
}

/// Per-request side channel, exclusively owned by one rewrite call.
///
/// The engine reads `debug_enabled` and writes the other fields; repeated
/// rewrites against the same context accumulate rather than overwrite.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// When set, every applied action is described in `debug_log`.
    pub debug_enabled: bool,
    pub debug_log: Vec<String>,
    /// Opaque tags attached by Decorate instructions. A set: decorating with
    /// the same value twice keeps one entry.
    pub decorations: BTreeSet<String>,
    /// Log messages of the rules that fired, in application order, without
    /// repeats.
    pub applied_rules: Vec<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug() -> Self {
        RequestContext { debug_enabled: true, ..Self::default() }
    }
}

/// Compile `rules_text` with default [`Options`] into a ready [`Rewriter`].
///
/// # Example
/// ```
/// use querulus::{ExpandedQuery, RequestContext, compile, parse_query};
///
/// let rewriter = compile("cheep => cheap").unwrap();
/// let mut query = ExpandedQuery::new(parse_query("cheep flights"));
/// let mut ctx = RequestContext::new();
/// rewriter.rewrite(&mut query, &mut ctx).unwrap();
/// assert_eq!(query.user_query.to_string(), "cheap flights");
/// ```
pub fn compile(rules_text: &str) -> Result<Rewriter, ConfigError> {
    compile_with(rules_text, &Options::default())
}

/// Compile `rules_text` with explicit [`Options`].
pub fn compile_with(rules_text: &str, options: &Options) -> Result<Rewriter, ConfigError> {
    let collection = rules::parse_rules(rules_text, options)?;
    Ok(Rewriter::with_selection(collection, options.selection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{self, ExpandedQuery};
    use crate::{ConfigError, InstructionKinds};

    fn rewrite(rules: &str, query_text: &str) -> (ExpandedQuery, RequestContext) {
        let rewriter = compile(rules).unwrap();
        let mut query = ExpandedQuery::new(query::parse(query_text));
        let mut ctx = RequestContext::new();
        rewriter.rewrite(&mut query, &mut ctx).unwrap();
        (query, ctx)
    }

    #[test]
    fn replacement_end_to_end() {
        let rules = "c => d\na b => b";

        let (query, _) = rewrite(rules, "a b");
        assert_eq!(query.user_query.to_string(), "b");

        let (query, _) = rewrite(rules, "c");
        assert_eq!(query.user_query.to_string(), "d");

        let (query, ctx) = rewrite(rules, "x");
        assert_eq!(query.user_query.to_string(), "x");
        assert!(ctx.applied_rules.is_empty());
    }

    #[test]
    fn wildcard_end_to_end() {
        let rules = "ab* => cd";

        let (query, _) = rewrite(rules, "abc");
        assert_eq!(query.user_query.to_string(), "cd");

        let (query, _) = rewrite(rules, "xab");
        assert_eq!(query.user_query.to_string(), "xab");
    }

    #[test]
    fn wildcard_capture_spliced_into_output() {
        let (query, _) = rewrite("iph* => iphone $1", "iph8");
        assert_eq!(query.user_query.to_string(), "iphone 8");
    }

    #[test]
    fn suffix_wildcard_matches_token_endings() {
        let rules = "*phone => smartphone";

        let (query, _) = rewrite(rules, "iphone");
        assert_eq!(query.user_query.to_string(), "smartphone");

        let (query, _) = rewrite(rules, "phones");
        assert_eq!(query.user_query.to_string(), "phones");
    }

    #[test]
    fn anchored_rule_matches_only_at_query_start() {
        let rules = "\"sale => DECORATE: landing";

        let (_, ctx) = rewrite(rules, "sale shoes");
        assert!(ctx.decorations.contains("landing"));

        let (_, ctx) = rewrite(rules, "shoes sale");
        assert!(ctx.decorations.is_empty());
    }

    #[test]
    fn decorations_collapse_within_one_pass() {
        // the same decoration fires at two spans and stays a single tag
        let (_, ctx) = rewrite("a => DECORATE: tag", "a x a");
        assert_eq!(ctx.decorations.len(), 1);
        assert_eq!(ctx.applied_rules, ["a"]);
    }

    #[test]
    fn boost_and_filter_fragments_attach_to_the_expanded_query() {
        let (query, _) = rewrite("tv => UP(2.0): smart; DOWN(0.5): vhs; FILTER: instock", "tv");

        assert_eq!(query.user_query.to_string(), "tv");
        assert_eq!(query.boost_up.len(), 1);
        assert_eq!(query.boost_up[0].boost, 2.0);
        assert_eq!(query.boost_up[0].query.to_string(), "smart");
        assert_eq!(query.boost_down.len(), 1);
        assert_eq!(query.filter_queries.len(), 1);
        assert_eq!(query.filter_queries[0].to_string(), "instock");
    }

    #[test]
    fn synonym_keeps_the_original_term() {
        let (query, _) = rewrite("tv => SYNONYM: television", "tv stand");
        assert_eq!(query.user_query.to_string(), "(tv | television) stand");
    }

    #[test]
    fn multi_token_synonym_nests_a_sub_query() {
        let (query, _) = rewrite("tv => SYNONYM: flat screen", "tv");
        assert_eq!(query.user_query.to_string(), "(tv | [flat screen])");
    }

    #[test]
    fn case_insensitive_by_default() {
        let (query, _) = rewrite("cheep => cheap", "CHEEP");
        assert_eq!(query.user_query.to_string(), "cheap");
    }

    #[test]
    fn case_sensitive_when_configured() {
        let options = Options { ignore_case: false, ..Options::default() };
        let rewriter = compile_with("AB => cd", &options).unwrap();

        let mut query = ExpandedQuery::new(query::parse("ab"));
        let mut ctx = RequestContext::new();
        rewriter.rewrite(&mut query, &mut ctx).unwrap();
        assert_eq!(query.user_query.to_string(), "ab");

        let mut query = ExpandedQuery::new(query::parse("AB"));
        rewriter.rewrite(&mut query, &mut ctx).unwrap();
        assert_eq!(query.user_query.to_string(), "cd");
    }

    #[test]
    fn compile_reports_configuration_errors() {
        assert!(matches!(compile("no operator here"), Err(ConfigError::ImproperInput(_))));
        assert_eq!(
            compile("a => b\na => c").unwrap_err(),
            ConfigError::DuplicateInput("a".to_string())
        );
    }

    #[test]
    fn instruction_kinds_reflect_the_rule_set() {
        let rewriter = compile("a => b\nc => DECORATE: d").unwrap();
        assert_eq!(
            rewriter.rules().instruction_kinds(),
            InstructionKinds::REPLACE | InstructionKinds::DECORATE
        );
    }

    #[test]
    fn compiled_rules_serve_concurrent_rewrites() {
        let rewriter = compile("a => x\nb => DECORATE: tag").unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..50 {
                        let mut query = ExpandedQuery::new(query::parse("a b"));
                        let mut ctx = RequestContext::new();
                        rewriter.rewrite(&mut query, &mut ctx).unwrap();
                        assert_eq!(query.user_query.to_string(), "x b");
                        assert!(ctx.decorations.contains("tag"));
                    }
                });
            }
        });
    }
}
