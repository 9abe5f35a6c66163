//! Built-in secret/PII/exfiltration pattern library for the response
//! scanner (spec §4.3).
//!
//! Grounded in shape on the teacher's single compiled-once policy
//! constraint regex (`mcp::policy`), generalized to a static table of
//! named patterns compiled once at [`crate::scanner::ResponseScanner`]
//! construction time via [`crate::redos::screen_pattern`], exactly like
//! user-supplied patterns — the built-ins get no special trust.

use crate::config::ScanAction;

/// One built-in named pattern.
pub struct BuiltinPattern {
    /// Stable identifier, reported in findings and audit entries.
    pub name: &'static str,
    /// Category label.
    pub category: &'static str,
    /// Regex source.
    pub pattern: &'static str,
    /// Default action if this pattern matches.
    pub action: ScanAction,
}

/// Secret-detection patterns (spec §4.3 "detectSecrets").
pub const SECRET_PATTERNS: &[BuiltinPattern] = &[
    BuiltinPattern {
        name: "aws-access-key",
        category: "secrets",
        pattern: r"\bAKIA[0-9A-Z]{16}\b",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "aws-secret-key",
        category: "secrets",
        pattern: r#"(?i)aws_secret_access_key\s*[:=]\s*["']?[A-Za-z0-9/+=]{40}["']?"#,
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "github-token",
        category: "secrets",
        pattern: r"\bgh[pousr]_[A-Za-z0-9]{36,}\b",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "openai-api-key",
        category: "secrets",
        pattern: r"\bsk-[A-Za-z0-9]{20,}\b",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "generic-api-key",
        category: "secrets",
        pattern: r#"(?i)\b(?:api[_-]?key|apikey)\s*[:=]\s*["']?[A-Za-z0-9_\-]{16,}["']?"#,
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "bearer-token",
        category: "secrets",
        pattern: r"(?i)\bBearer\s+[A-Za-z0-9._\-]{10,}\b",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "jwt-token",
        category: "secrets",
        pattern: r"\bey[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "private-key",
        category: "secrets",
        pattern: r"-----BEGIN (?:RSA |EC |OPENSSH |DSA )?PRIVATE KEY-----",
        action: ScanAction::Block,
    },
    BuiltinPattern {
        name: "certificate",
        category: "secrets",
        pattern: r"-----BEGIN CERTIFICATE-----",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "database-url",
        category: "secrets",
        pattern: r"(?i)\b(?:postgres|postgresql|mysql|mongodb)://[^\s:]+:[^\s@]+@[^\s/]+",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "password-assignment",
        category: "secrets",
        pattern: r#"(?i)\bpassword\s*[:=]\s*["'][^"'\s]{4,}["']"#,
        action: ScanAction::Redact,
    },
];

/// PII-detection patterns (spec §4.3 "detectPII").
pub const PII_PATTERNS: &[BuiltinPattern] = &[
    BuiltinPattern {
        name: "email-address",
        category: "pii",
        pattern: r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "phone-number",
        category: "pii",
        pattern: r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b",
        action: ScanAction::Redact,
    },
    BuiltinPattern {
        name: "ssn",
        category: "pii",
        pattern: r"\b\d{3}-\d{2}-\d{4}\b",
        action: ScanAction::Block,
    },
    BuiltinPattern {
        name: "credit-card",
        category: "pii",
        pattern: r"\b(?:\d[ -]?){13,16}\b",
        action: ScanAction::Block,
    },
    BuiltinPattern {
        name: "ip-address",
        category: "pii",
        pattern: r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
        action: ScanAction::Pass,
    },
];

/// Exfiltration-marker patterns: not secrets themselves, but shapes a
/// response containing exfiltrated binary data tends to take.
pub const EXFIL_PATTERNS: &[BuiltinPattern] = &[
    BuiltinPattern {
        name: "large-base64-blob",
        category: "exfiltration",
        pattern: r"[A-Za-z0-9+/]{200,}={0,2}",
        action: ScanAction::Pass,
    },
    BuiltinPattern {
        name: "hex-dump",
        category: "exfiltration",
        pattern: r"(?:[0-9a-fA-F]{2}[ :]){100,}",
        action: ScanAction::Pass,
    },
];
