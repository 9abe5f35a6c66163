//! Path normalization, key-alias resolution, and argument-value matching
//! for policy rules (spec §4.2).
//!
//! A rule author writes `"path": "~/.ssh/*"` expecting it to catch both
//! `"../.ssh/id_rsa"` (this module collapses `.`/`..` segments and
//! backslash separators before the glob in [`crate::policy::glob`] ever
//! runs, the same way the teacher's `mcp::policy` module lowercases
//! before a tool-name comparison rather than asking every rule author to
//! write a case-insensitive pattern) and `"file": "..."` (a tool server
//! that happens to name its argument `file` instead of `path` — the
//! alias table below resolves either to the same rule clause).

use regex::Regex;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use super::glob;

/// Groups of interchangeable argument-key names. A rule clause written
/// against one member of a group matches a tool call using any other
/// member.
const ALIAS_GROUPS: &[&[&str]] = &[
    &["path", "file", "filepath", "file_path", "filename", "file_name", "target", "source", "destination", "dest", "src", "uri", "url"],
    &["command", "cmd", "shell", "exec", "script", "run"],
    &["content", "text", "body", "data", "input", "message"],
];

/// A bounded glob-to-regex translation is rejected past this many source
/// characters, matching [`crate::redos::MAX_PATTERN_LEN`]'s spirit: a
/// rule argument pattern this long is almost certainly a mistake, not a
/// legitimate glob.
const MAX_TRANSLATED_PATTERN_LEN: usize = 500;

/// Normalize a path-like string for comparison: backslashes become
/// forward slashes, then `.` segments are dropped and `..` segments pop
/// the preceding non-`..` segment (never escaping above the root of
/// whatever was given — a leading `..` is kept verbatim, since there is
/// nothing to pop).
pub fn normalize_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let is_absolute = unified.starts_with('/');

    let mut out: Vec<&str> = Vec::new();
    for seg in unified.split('/') {
        match seg {
            "" | "." => continue,
            ".." => {
                if matches!(out.last(), Some(&last) if last != "..") {
                    out.pop();
                } else if !is_absolute {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }

    let joined = out.join("/");
    if is_absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Render a JSON value as the string an argument-match pattern compares
/// against: strings pass through; everything else is rendered via its
/// compact JSON form.
fn argument_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// True if `text` should be treated as a filesystem path before
/// comparison (spec §4.2: "if it looks path-like").
fn looks_path_like(text: &str) -> bool {
    text.contains('/') || text.contains('\\') || text.starts_with('.') || text.starts_with('~')
}

/// Find the alias group (if any) containing `key`, case-insensitively.
fn alias_group_for(key: &str) -> Option<&'static [&'static str]> {
    ALIAS_GROUPS.iter().find(|group| group.iter().any(|a| a.eq_ignore_ascii_case(key))).copied()
}

/// Look up an argument value by (a) exact key, (b) case-insensitive key,
/// (c) the documented alias table — the first alias present (in table
/// order) wins (spec §4.2: "the first alias found yields the value").
fn resolve_value<'a>(arguments: &'a Value, key: &str) -> Option<&'a Value> {
    let obj = arguments.as_object()?;

    if let Some(v) = obj.get(key) {
        return Some(v);
    }
    if let Some((_, v)) = obj.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
        return Some(v);
    }
    let group = alias_group_for(key)?;
    for alias in group {
        if let Some((_, v)) = obj.iter().find(|(k, _)| k.eq_ignore_ascii_case(alias)) {
            return Some(v);
        }
    }
    None
}

/// Translate a glob alternative (`*`, `?`, literals) into an anchored,
/// case-insensitive regex, rejecting sources over
/// [`MAX_TRANSLATED_PATTERN_LEN`] characters rather than compiling an
/// arbitrarily large pattern.
fn bounded_glob_regex(alt: &str) -> Option<Regex> {
    if alt.len() > MAX_TRANSLATED_PATTERN_LEN {
        return None;
    }
    let mut out = String::from("(?i)^");
    for c in alt.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '.' | '^' | '$' | '+' | '(' | ')' | '{' | '}' | '[' | ']' | '|' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// True if `candidate` matches `alt` under any of spec §4.2's three
/// strategies: a dotfile-aware glob, a bounded glob-to-regex translation,
/// or (only for alternatives with no wildcard) a case-insensitive
/// substring.
fn alternative_matches(alt: &str, candidate: &str) -> bool {
    if glob::matches(alt, candidate) {
        return true;
    }
    if let Some(re) = bounded_glob_regex(alt) {
        if re.is_match(candidate) {
            return true;
        }
    }
    if !alt.contains('*') && !alt.contains('?') {
        return candidate.to_lowercase().contains(&alt.to_lowercase());
    }
    false
}

/// Look up `key` in a `tools/call`'s arguments (directly, case-insensitively,
/// or via the documented alias table), normalize the resolved value, and
/// test it against every `|`-separated alternative of `pattern`.
///
/// Returns `false` if no alias resolves to a present argument — a match
/// clause can only narrow a rule, never match on a missing argument.
pub fn argument_matches(arguments: &Value, key: &str, pattern: &str) -> bool {
    let Some(value) = resolve_value(arguments, key) else {
        return false;
    };

    let text: String = argument_to_text(value).nfc().collect();
    let path_like = looks_path_like(&text);
    let candidate = if path_like { normalize_path(&text) } else { text };

    pattern
        .split('|')
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .map(|alt| if path_like { normalize_path(alt) } else { alt.to_string() })
        .any(|alt| alternative_matches(&alt, &candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn collapses_dot_dot_traversal() {
        assert_eq!(normalize_path("a/b/../../.ssh/id_rsa"), ".ssh/id_rsa");
    }

    #[test]
    fn converts_backslashes() {
        assert_eq!(normalize_path(r"a\b\c"), "a/b/c");
    }

    #[test]
    fn preserves_leading_root() {
        assert_eq!(normalize_path("/a/./b/"), "/a/b");
    }

    #[test]
    fn argument_matches_traversal_against_plain_pattern() {
        let args = json!({"path": "a/b/../../.ssh/id_rsa"});
        assert!(argument_matches(&args, "path", "**/.ssh/*"));
    }

    #[test]
    fn argument_lookup_is_case_insensitive_on_key() {
        let args = json!({"Path": "/etc/passwd"});
        assert!(argument_matches(&args, "path", "/etc/*"));
    }

    #[test]
    fn missing_key_never_matches() {
        let args = json!({"other": "x"});
        assert!(!argument_matches(&args, "path", "*"));
    }

    #[test]
    fn alias_resolves_file_to_path_rule() {
        let args = json!({"file": "/etc/passwd"});
        assert!(argument_matches(&args, "path", "/etc/*"));
    }

    #[test]
    fn alias_resolves_cmd_to_command_rule() {
        let args = json!({"cmd": "rm -rf /"});
        assert!(argument_matches(&args, "command", "rm *"));
    }

    #[test]
    fn alias_resolves_body_to_content_rule() {
        let args = json!({"body": "DROP TABLE users"});
        assert!(argument_matches(&args, "content", "*drop table*"));
    }

    #[test]
    fn exact_key_wins_over_alias_group() {
        let args = json!({"path": "a.txt", "file": "b.txt"});
        assert!(argument_matches(&args, "path", "a.txt"));
        assert!(!argument_matches(&args, "path", "b.txt"));
    }

    #[test]
    fn substring_fallback_matches_wildcard_free_pattern() {
        let args = json!({"content": "the password is hunter2"});
        assert!(argument_matches(&args, "content", "password"));
    }

    #[test]
    fn oversized_pattern_falls_back_to_glob_only() {
        let huge = "a".repeat(600);
        let args = json!({"path": huge.clone()});
        assert!(argument_matches(&args, "path", &huge));
    }

    #[test]
    fn tilde_prefixed_value_is_treated_as_path() {
        let args = json!({"path": "~/.ssh/id_rsa"});
        assert!(argument_matches(&args, "path", "~/.ssh/*"));
    }
}
