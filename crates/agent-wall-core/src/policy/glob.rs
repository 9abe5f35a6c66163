//! Tool-name and argument glob matching (spec §4.2).
//!
//! Patterns are `|`-joined alternatives (`"read_*|list_*"`); each
//! alternative is a glob (`*`, `?`, `[...]`, matched via `globset`).
//! Matching is case-insensitive and Unicode-NFC-normalized before
//! comparison, so `"Read_File"` and `"read_\u{66}ile"`-with-combining-marks
//! both match `"read_*"`.
//!
//! Grounded on the teacher's `mcp::policy::matches_tool_pattern`, which
//! compares tool names with a single compiled `Regex`; generalized here to
//! `globset` because the spec's patterns are shell-glob syntax, not regex,
//! and to support `|`-joined alternatives, which the teacher's single-rule
//! model never needed.

use globset::{Glob, GlobMatcher};
use unicode_normalization::UnicodeNormalization;

fn normalize(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

fn compile_alt(alt: &str) -> Option<GlobMatcher> {
    Glob::new(&normalize(alt)).ok().map(|g| g.compile_matcher())
}

/// True if `candidate` matches any `|`-separated alternative in `pattern`.
///
/// An alternative that fails to compile as a glob (malformed bracket
/// expression, etc.) is skipped rather than treated as a hard error: a
/// typo in one alternative of a multi-alternative pattern should not make
/// the whole rule inert.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    let candidate = normalize(candidate);
    pattern
        .split('|')
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .filter_map(compile_alt)
        .any(|m| m.is_match(&candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_literal() {
        assert!(matches("read_file", "read_file"));
        assert!(!matches("read_file", "write_file"));
    }

    #[test]
    fn matches_wildcard() {
        assert!(matches("read_*", "read_file"));
        assert!(matches("read_*", "read_dir"));
        assert!(!matches("read_*", "write_file"));
    }

    #[test]
    fn matches_alternatives() {
        assert!(matches("read_*|list_*", "list_dir"));
        assert!(matches("read_*|list_*", "read_file"));
        assert!(!matches("read_*|list_*", "delete_file"));
    }

    #[test]
    fn matches_case_insensitively() {
        assert!(matches("Read_File", "read_file"));
    }

    #[test]
    fn star_matches_everything() {
        assert!(matches("*", "anything_at_all"));
    }

    #[test]
    fn malformed_alternative_is_skipped_not_fatal() {
        assert!(matches("read_*|[", "read_file"));
    }
}
