//! Static, shape-based ReDoS screening for user-supplied regex patterns.
//!
//! Both the response scanner and the injection detector compile
//! user-supplied pattern text; neither trusts it. `screen_pattern` rejects
//! a pattern before it is ever run against input, by matching its *source
//! text* against a small blacklist of constructions known to cause
//! catastrophic backtracking in a backtracking engine (nested quantifiers,
//! quantified alternation, a backreference directly followed by a
//! quantifier), rather than relying on a runtime timeout to catch it after
//! the fact.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::PatternRejected;

/// Patterns longer than this are rejected outright, regardless of shape.
pub const MAX_PATTERN_LEN: usize = 1000;

struct ShapeRule {
    shape: &'static str,
    detector: fn(&str) -> bool,
}

fn nested_quantifiers() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^()]*[+*][^()]*\)[+*]").unwrap())
}

fn quantified_alternation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([^()]*[+*][^()]*\|[^()]*[+*][^()]*\)[+*]").unwrap())
}

fn backreference_quantifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\[0-9][+*]").unwrap())
}

fn shape_rules() -> &'static [ShapeRule] {
    static RULES: OnceLock<Vec<ShapeRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        vec![
            ShapeRule {
                shape: "quantified-alternation",
                detector: |p| quantified_alternation().is_match(p),
            },
            ShapeRule {
                shape: "nested-quantifiers",
                detector: |p| nested_quantifiers().is_match(p),
            },
            ShapeRule {
                shape: "backreference-quantifier",
                detector: |p| backreference_quantifier().is_match(p),
            },
        ]
    })
}

/// Screen and compile a user-supplied pattern.
///
/// Checks length, then each blacklisted shape (in order, so the first
/// matching shape is the one reported), then attempts to compile. Returns
/// the compiled [`Regex`] only if all checks pass.
pub fn screen_pattern(name: &str, pattern: &str) -> Result<Regex, PatternRejected> {
    if pattern.len() > MAX_PATTERN_LEN {
        return Err(PatternRejected::TooLong {
            name: name.to_string(),
            len: pattern.len(),
            cap: MAX_PATTERN_LEN,
        });
    }

    for rule in shape_rules() {
        if (rule.detector)(pattern) {
            return Err(PatternRejected::RedosShape {
                name: name.to_string(),
                shape: rule.shape,
            });
        }
    }

    Regex::new(pattern).map_err(|e| PatternRejected::CompileError {
        name: name.to_string(),
        detail: e.to_string(),
    })
}
