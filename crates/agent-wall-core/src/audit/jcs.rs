//! JSON Canonicalization Scheme (RFC 8785) for audit-entry signing.
//!
//! The HMAC chain needs a deterministic byte representation of each entry
//! to sign over: lexicographic key order, no whitespace, deterministic
//! number formatting.

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize a value to JCS (RFC 8785) canonical JSON bytes.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_jcs::to_vec(value).context("JCS canonicalization failed")
}

/// Serialize to JCS canonical JSON string.
pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    serde_jcs::to_string(value).context("JCS canonicalization failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_ordering_is_lexicographic() {
        let input = json!({"z": 3, "b": 2, "a": 1});
        assert_eq!(to_string(&input).unwrap(), r#"{"a":1,"b":2,"z":3}"#);
    }

    #[test]
    fn nested_objects_are_also_ordered() {
        let input = json!({"outer": {"z": 1, "a": 2}, "first": true});
        assert_eq!(to_string(&input).unwrap(), r#"{"first":true,"outer":{"a":2,"z":1}}"#);
    }

    #[test]
    fn no_whitespace_in_output() {
        let input = json!({"key": "value", "array": [1, 2, 3]});
        let canonical = to_string(&input).unwrap();
        assert!(!canonical.contains(' '));
        assert!(!canonical.contains('\n'));
    }

    #[test]
    fn construction_order_does_not_affect_output() {
        let a = to_vec(&json!({"a": 1, "b": 2})).unwrap();
        let b = to_vec(&json!({"b": 2, "a": 1})).unwrap();
        assert_eq!(a, b);
    }
}
