//! Rule text compilation.
//!
//! Line-oriented format. `#` starts a comment line, blank lines are skipped,
//! every other line is `input => output`:
//!
//! ```text
//! # replacements and deletions
//! cheep => cheap
//! mens \t men => men
//! promo code =>
//!
//! # wildcards, anchors and the other instruction kinds
//! ab* => cd $1
//! "sale => DECORATE: landing-page
//! tv => SYNONYM: television; UP(2.0): smart
//! ```
//!
//! Segments of the input separated by the configured delimiter are
//! independent keys for the same instructions. Compilation is all or
//! nothing: the first malformed line or duplicate key aborts with a
//! [`ConfigError`] and no collection is returned.

use std::collections::HashSet;

use tracing::debug;

use crate::api::Options;
use crate::engine::WildcardSide;
use crate::error::ConfigError;
use crate::query::tokenize;
use crate::rules::model::{
    BoostDirection, InputPattern, Instruction, Instructions, PatternElement, RulesCollection,
};

const OPERATOR: &str = "=>";
const WILDCARD: char = '*';
const ANCHOR: char = '"';
const CAPTURE: &str = "$1";

/// Compile `text` into a frozen rules collection.
pub(crate) fn parse_rules(text: &str, options: &Options) -> Result<RulesCollection, ConfigError> {
    let mut collection = RulesCollection::new(options.ignore_case);
    let mut seen_inputs: HashSet<String> = HashSet::new();
    let mut ord = 0;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let improper = || ConfigError::ImproperInput(line.to_string());

        let parts: Vec<&str> = line.split(OPERATOR).collect();
        let [input, output] = parts.as_slice() else {
            return Err(improper());
        };
        let full_input = input.trim();
        if full_input.is_empty() {
            return Err(improper());
        }

        let segments: Vec<&str> = full_input
            .split(options.input_delimiter.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(improper());
        }

        let items = parse_output(output.trim(), line)?;
        // $1 can only splice something when a wildcard captures something
        let has_wildcard = segments.iter().any(|s| s.contains(WILDCARD));
        if !has_wildcard && references_capture(&items) {
            return Err(improper());
        }

        for segment in segments {
            let pattern = parse_segment(segment, options, line)?;
            let canonical = canonical_key(segment, options);
            if !seen_inputs.insert(canonical.clone()) {
                return Err(ConfigError::DuplicateInput(canonical));
            }
            let instructions = Instructions::new(ord, items.clone(), full_input.to_string());
            collection
                .insert(&pattern, instructions)
                .map_err(|_| ConfigError::DuplicateInput(canonical))?;
        }
        ord += 1;
    }

    debug!(rules = collection.len(), ignore_case = options.ignore_case, "compiled rules");
    Ok(collection)
}

/// Canonical duplicate-detection key: the segment with whitespace collapsed,
/// case-folded when the collection is case-insensitive. Wildcard and anchor
/// markers stay in the key, so `ab*` and `ab` are distinct inputs.
fn canonical_key(segment: &str, options: &Options) -> String {
    let joined = segment.split_whitespace().collect::<Vec<_>>().join(" ");
    if options.ignore_case { joined.to_lowercase() } else { joined }
}

fn parse_segment(
    segment: &str,
    options: &Options,
    line: &str,
) -> Result<InputPattern, ConfigError> {
    let improper = || ConfigError::ImproperInput(line.to_string());

    let mut body = segment;
    let left_anchor = body.starts_with(ANCHOR);
    if left_anchor {
        body = &body[1..];
    }
    let right_anchor = body.ends_with(ANCHOR) && !body.is_empty();
    if right_anchor {
        body = &body[..body.len() - 1];
    }
    let body = body.trim();
    if body.is_empty() {
        return Err(improper());
    }

    let stars = body.matches(WILDCARD).count();
    let leading = body.starts_with(WILDCARD);
    let trailing = body.ends_with(WILDCARD);
    if stars > 1 || (stars == 1 && !leading && !trailing) || body.len() == 1 && leading {
        return Err(improper());
    }

    let fold = |s: &str| if options.ignore_case { s.to_lowercase() } else { s.to_string() };

    let tokens = tokenize(body);
    let last = tokens.len() - 1;
    let mut elements = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        let value = token.value.as_str();
        if index == 0 && leading {
            let stem = &value[1..];
            if stem.is_empty() {
                return Err(improper());
            }
            elements.push(PatternElement::Wildcard { stem: fold(stem), side: WildcardSide::Suffix });
        } else if index == last && trailing {
            let stem = &value[..value.len() - 1];
            if stem.is_empty() {
                return Err(improper());
            }
            elements.push(PatternElement::Wildcard { stem: fold(stem), side: WildcardSide::Prefix });
        } else if value.contains(WILDCARD) {
            return Err(improper());
        } else {
            elements.push(PatternElement::Term(fold(value)));
        }
    }

    Ok(InputPattern { left_anchor, right_anchor, elements })
}

fn parse_output(output: &str, line: &str) -> Result<Vec<Instruction>, ConfigError> {
    if output.is_empty() {
        return Ok(vec![Instruction::Replace { terms: Vec::new() }]);
    }
    output.split(';').map(|clause| parse_clause(clause.trim(), line)).collect()
}

fn parse_clause(clause: &str, line: &str) -> Result<Instruction, ConfigError> {
    let improper = || ConfigError::ImproperInput(line.to_string());
    let payload = |rest: &str| -> Result<Vec<crate::Term>, ConfigError> {
        let terms = tokenize(rest);
        if terms.is_empty() { Err(improper()) } else { Ok(terms) }
    };

    if clause.is_empty() {
        return Err(improper());
    }
    if clause == "DELETE" {
        return Ok(Instruction::Replace { terms: Vec::new() });
    }
    if let Some(rest) = clause.strip_prefix("SYNONYM:") {
        return Ok(Instruction::Synonym { terms: payload(rest)? });
    }
    if let Some(rest) = clause.strip_prefix("DECORATE:") {
        let value = rest.trim();
        if value.is_empty() {
            return Err(improper());
        }
        return Ok(Instruction::Decorate { value: value.to_string() });
    }
    if let Some(rest) = clause.strip_prefix("FILTER:") {
        return Ok(Instruction::Filter { terms: payload(rest)? });
    }
    if clause.starts_with("UP(") || clause.starts_with("DOWN(") {
        let caps = regex!(r"^(UP|DOWN)\(([0-9]+(?:\.[0-9]+)?)\):(.*)$")
            .captures(clause)
            .ok_or_else(improper)?;
        let factor: f32 = caps[2].parse().map_err(|_| improper())?;
        let direction = if &caps[1] == "UP" { BoostDirection::Up } else { BoostDirection::Down };
        return Ok(Instruction::Boost { terms: payload(&caps[3])?, factor, direction });
    }
    Ok(Instruction::Replace { terms: tokenize(clause) })
}

fn references_capture(items: &[Instruction]) -> bool {
    items
        .iter()
        .flat_map(Instruction::generable_terms)
        .any(|term| term.value.contains(CAPTURE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::model::PatternKey;

    fn compile(rules: &str) -> Result<RulesCollection, ConfigError> {
        parse_rules(rules, &Options::default())
    }

    fn compile_case_sensitive(rules: &str) -> Result<RulesCollection, ConfigError> {
        parse_rules(rules, &Options { ignore_case: false, ..Options::default() })
    }

    fn term_keys(values: &[&str]) -> Vec<PatternKey> {
        values.iter().map(|v| PatternKey::Term((*v).to_string())).collect()
    }

    #[test]
    fn every_input_is_independently_retrievable() {
        let rules = "# comment\n\n ab  \t c d => e \n FG => hi jk  \n ";
        let collection = compile(rules).unwrap();

        let state = collection.trie().get(&term_keys(&["ab"]));
        assert!(state.is_known() && state.is_final());

        // a proper prefix of a multi-token key is known but not final
        let state = collection.trie().get(&term_keys(&["c"]));
        assert!(state.is_known());
        assert!(!state.is_final());

        let state = collection.trie().get(&term_keys(&["c", "d"]));
        assert!(state.is_final());

        let state = collection.trie().get(&term_keys(&["fg"]));
        assert!(state.is_final());
        let items: Vec<&Instruction> = state.value().unwrap().iter().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0],
            &Instruction::Replace { terms: vec![crate::Term::new("hi"), crate::Term::new("jk")] }
        );
    }

    #[test]
    fn duplicate_input_fails_case_insensitive() {
        let rules = "# comment\nc => d \n a   B => b \ne d \t a b => c";
        let err = compile(rules).unwrap_err();
        assert_eq!(err, ConfigError::DuplicateInput("a b".to_string()));
    }

    #[test]
    fn same_inputs_compile_when_case_sensitive() {
        let rules = "# comment\nc => d \n a   B => b \ne d \t a b => c";
        let collection = compile_case_sensitive(rules).unwrap();
        assert_eq!(collection.len(), 4);

        // `a B` and `a b` are distinct keys without folding
        assert!(collection.trie().get(&term_keys(&["a", "B"])).is_final());
        assert!(collection.trie().get(&term_keys(&["a", "b"])).is_final());
    }

    #[test]
    fn case_sensitive_lookup_keeps_original_form() {
        let collection = compile_case_sensitive("AB => cd").unwrap();
        assert!(!collection.trie().get(&term_keys(&["ab"])).is_known());
        assert!(collection.trie().get(&term_keys(&["AB"])).is_final());
    }

    #[test]
    fn line_without_operator_is_rejected() {
        let rules = "# comment\nsomething wrong \n FG => hi jk  \n ";
        let err = compile(rules).unwrap_err();
        assert_eq!(err, ConfigError::ImproperInput("something wrong".to_string()));
    }

    #[test]
    fn repeated_operator_is_rejected() {
        assert!(matches!(compile("a => b => c"), Err(ConfigError::ImproperInput(_))));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(compile(" => b"), Err(ConfigError::ImproperInput(_))));
    }

    #[test]
    fn standalone_wildcard_is_rejected() {
        assert!(matches!(compile("* => b"), Err(ConfigError::ImproperInput(_))));
    }

    #[test]
    fn doubled_wildcard_is_rejected() {
        assert!(matches!(compile("*a* => b"), Err(ConfigError::ImproperInput(_))));
    }

    #[test]
    fn interior_wildcard_is_rejected() {
        assert!(matches!(compile("a*b => c"), Err(ConfigError::ImproperInput(_))));
        assert!(matches!(compile("a *b c => d"), Err(ConfigError::ImproperInput(_))));
    }

    #[test]
    fn capture_without_wildcard_is_rejected() {
        assert!(matches!(compile("ab => cd $1"), Err(ConfigError::ImproperInput(_))));
        assert!(compile("ab* => cd $1").is_ok());
    }

    #[test]
    fn wildcard_and_exact_versions_of_a_key_coexist() {
        let collection = compile("ab => x\nab* => y").unwrap();
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn empty_output_compiles_to_a_deletion() {
        let collection = compile("noise =>").unwrap();
        let state = collection.trie().get(&term_keys(&["noise"]));
        let items: Vec<&Instruction> = state.value().unwrap().iter().collect();
        assert_eq!(items, [&Instruction::Replace { terms: Vec::new() }]);
    }

    #[test]
    fn keyword_clauses_parse_into_their_variants() {
        let collection =
            compile("tv => SYNONYM: television; UP(2.0): smart; DOWN(0.5): vhs; FILTER: instock; DECORATE: electronics")
                .unwrap();
        let state = collection.trie().get(&term_keys(&["tv"]));
        let kinds: Vec<InstructionKindsProbe> =
            state.value().unwrap().iter().map(probe).collect();
        assert_eq!(
            kinds,
            [
                InstructionKindsProbe::Synonym,
                InstructionKindsProbe::BoostUp(2.0),
                InstructionKindsProbe::BoostDown(0.5),
                InstructionKindsProbe::Filter,
                InstructionKindsProbe::Decorate
            ]
        );
    }

    #[derive(Debug, PartialEq)]
    enum InstructionKindsProbe {
        Synonym,
        BoostUp(f32),
        BoostDown(f32),
        Filter,
        Decorate,
        Replace,
    }

    fn probe(instruction: &Instruction) -> InstructionKindsProbe {
        match instruction {
            Instruction::Synonym { .. } => InstructionKindsProbe::Synonym,
            Instruction::Boost { factor, direction: BoostDirection::Up, .. } => {
                InstructionKindsProbe::BoostUp(*factor)
            }
            Instruction::Boost { factor, direction: BoostDirection::Down, .. } => {
                InstructionKindsProbe::BoostDown(*factor)
            }
            Instruction::Filter { .. } => InstructionKindsProbe::Filter,
            Instruction::Decorate { .. } => InstructionKindsProbe::Decorate,
            Instruction::Replace { .. } => InstructionKindsProbe::Replace,
        }
    }

    #[test]
    fn malformed_boost_factor_is_rejected() {
        assert!(matches!(compile("a => UP(x): b"), Err(ConfigError::ImproperInput(_))));
    }

    #[test]
    fn log_message_defaults_to_the_input_text() {
        let collection = compile("a   b => x").unwrap();
        let state = collection.trie().get(&term_keys(&["a", "b"]));
        assert_eq!(state.value().unwrap().log_message(), "a   b");
    }
}
