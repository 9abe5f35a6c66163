//! Built-in prompt-injection pattern library.
//!
//! Each pattern carries a minimum [`Sensitivity`] tier — `low`-tier
//! patterns are the highest-confidence, lowest-false-positive signals and
//! always run; `medium`/`high` tiers add progressively broader, noisier
//! coverage — and a [`Confidence`] describing how much weight a match
//! should carry once found, independent of the tier that enabled it.
//! Compiled the same way as [`crate::scanner::patterns`] — once, through
//! [`crate::redos::screen_pattern`], with no special trust for being
//! built-in.

use crate::config::Sensitivity;

/// How much weight a matched pattern should carry (spec §4.4: "overall
/// confidence = highest match confidence"; the proxy pipeline only blocks
/// on medium+, treating low as informational).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    /// Informational only; never blocks on its own.
    Low,
    /// Blocks when the pipeline's injection check is enabled.
    Medium,
    /// Blocks; reserved for the least ambiguous signals.
    High,
}

/// One built-in injection pattern.
pub struct BuiltinPattern {
    /// Stable identifier.
    pub name: &'static str,
    /// Category label.
    pub category: &'static str,
    /// Regex source, matched against one tool-call argument value.
    pub pattern: &'static str,
    /// Minimum sensitivity tier at which this pattern is active.
    pub min_sensitivity: Sensitivity,
    /// Confidence assigned to a match.
    pub confidence: Confidence,
}

pub const PATTERNS: &[BuiltinPattern] = &[
    // instruction-override
    BuiltinPattern {
        name: "ignore-previous-instructions",
        category: "instruction-override",
        pattern: r"(?i)\bignore\s+(?:all\s+)?(?:previous|prior|above)\s+instructions\b",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::High,
    },
    BuiltinPattern {
        name: "disregard-rules",
        category: "instruction-override",
        pattern: r"(?i)\bdisregard\s+(?:your|the|all)\s+(?:rules|guidelines|instructions)\b",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::High,
    },
    BuiltinPattern {
        name: "forget-everything-above",
        category: "instruction-override",
        pattern: r"(?i)\bforget\s+(?:everything|all)\s+(?:you\s+)?(?:were\s+told|above)\b",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "new-instructions-follow",
        category: "instruction-override",
        pattern: r"(?i)\bnew\s+instructions?\s*:",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "override-system-prompt",
        category: "instruction-override",
        pattern: r"(?i)\boverride\s+(?:the\s+)?system\s+prompt\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::High,
    },
    BuiltinPattern {
        name: "from-now-on-instruction",
        category: "instruction-override",
        pattern: r"(?i)\bfrom\s+now\s+on\s*,?\s+you\s+(?:will|must|shall)\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "reset-to-default-instruction",
        category: "instruction-override",
        pattern: r"(?i)\breset\s+(?:yourself\s+)?to\s+(?:your\s+)?default\s+(?:state|settings|configuration)\b",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Low,
    },
    // prompt-marker
    BuiltinPattern {
        name: "system-prompt-marker",
        category: "prompt-marker",
        pattern: r"(?i)\[?(?:system|assistant)\]?\s*:\s*",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Low,
    },
    BuiltinPattern {
        name: "end-of-context-marker",
        category: "prompt-marker",
        pattern: r"(?i)<\|?(?:end|im_start|im_end)\|?>",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "role-reassignment-marker",
        category: "prompt-marker",
        pattern: r"(?i)\byou\s+are\s+(?:no\s+longer|not)\s+an?\s+ai\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "tool-result-role-marker",
        category: "prompt-marker",
        pattern: r"(?i)\[?tool[_\s]result\]?\s*:\s*",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Low,
    },
    // authority-claim
    BuiltinPattern {
        name: "developer-mode-claim",
        category: "authority-claim",
        pattern: r"(?i)\byou\s+are\s+now\s+in\s+(?:developer|debug|admin)\s+mode\b",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "acting-as-root-claim",
        category: "authority-claim",
        pattern: r"(?i)\bact(?:ing)?\s+as\s+(?:root|administrator|system)\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "i-am-the-developer-claim",
        category: "authority-claim",
        pattern: r"(?i)\bi\s+am\s+(?:the\s+)?(?:developer|creator|owner)\s+of\s+this\s+(?:system|agent|model)\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "this-is-a-test-environment-claim",
        category: "authority-claim",
        pattern: r"(?i)\bthis\s+is\s+(?:a\s+)?(?:test|sandbox|training)\s+environment,?\s+(?:so\s+)?(?:safety\s+)?(?:rules|restrictions)\s+(?:do\s+not|don't)\s+apply\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    // exfil-instruction
    BuiltinPattern {
        name: "send-credentials-instruction",
        category: "exfil-instruction",
        pattern: r"(?i)\bsend\s+(?:the\s+)?(?:api\s*key|password|secret|token|credentials?|all\s+data)\s+to\b",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::High,
    },
    BuiltinPattern {
        name: "exfiltrate-to-url-instruction",
        category: "exfil-instruction",
        pattern: r"(?i)\b(?:upload|post|exfiltrate)\s+.{0,40}\bto\s+https?://",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::High,
    },
    BuiltinPattern {
        name: "email-contents-elsewhere-instruction",
        category: "exfil-instruction",
        pattern: r"(?i)\bemail\s+.{0,40}\bto\s+[a-z0-9._%+\-]+@",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "read-and-forward-file-instruction",
        category: "exfil-instruction",
        pattern: r"(?i)\bread\s+.{0,40}\band\s+(?:forward|send|paste)\s+(?:it|the\s+contents?)\s+to\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "append-to-external-document-instruction",
        category: "exfil-instruction",
        pattern: r"(?i)\bappend\s+.{0,40}\bto\s+(?:this|the\s+following)\s+(?:google\s+)?(?:doc|sheet|webhook)\b",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Medium,
    },
    // output-manipulation
    BuiltinPattern {
        name: "print-without-warning",
        category: "output-manipulation",
        pattern: r"(?i)\boutput\s+.{0,30}\bwithout\s+(?:any\s+)?warning\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "do-not-mention-instruction",
        category: "output-manipulation",
        pattern: r"(?i)\bdo\s+not\s+(?:mention|tell|reveal)\s+(?:this|the\s+user)\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "respond-only-with-instruction",
        category: "output-manipulation",
        pattern: r"(?i)\brespond\s+only\s+with\s+(?:the\s+word|exactly)\b",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Low,
    },
    BuiltinPattern {
        name: "claim-success-regardless-instruction",
        category: "output-manipulation",
        pattern: r"(?i)\b(?:always\s+)?(?:claim|say|report)\s+(?:that\s+)?(?:it|this)\s+(?:succeeded|worked)\s+regardless\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    // unicode-obfuscation
    BuiltinPattern {
        name: "zero-width-characters",
        category: "unicode-obfuscation",
        pattern: "[\u{200B}\u{200C}\u{200D}\u{FEFF}]",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "bidi-control-characters",
        category: "unicode-obfuscation",
        pattern: "[\u{202A}-\u{202E}\u{2066}-\u{2069}]",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "private-use-area-characters",
        category: "unicode-obfuscation",
        pattern: "[\u{E000}-\u{F8FF}]",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Low,
    },
    BuiltinPattern {
        name: "variation-selector-characters",
        category: "unicode-obfuscation",
        // VS1-16 and the supplementary VS17-256 block, used to hide
        // steganographic payloads inside otherwise-plain text.
        pattern: "[\u{FE00}-\u{FE0F}\u{E0100}-\u{E01EF}]",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Low,
    },
    BuiltinPattern {
        name: "tag-characters",
        category: "unicode-obfuscation",
        // Unicode tag block, historically used to smuggle invisible ASCII
        // payloads past filters that only inspect visible text.
        pattern: "[\u{E0001}\u{E0020}-\u{E007F}]",
        min_sensitivity: Sensitivity::Low,
        confidence: Confidence::High,
    },
    // encoded-injection
    BuiltinPattern {
        name: "base64-decode-instruction",
        category: "encoded-injection",
        pattern: r"(?i)\bdecode\s+(?:this|the\s+following)\s+base64\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "base64-encoded-ignore",
        category: "encoded-injection",
        // base64 of "ignore" (aW dnb3Jl variants) appears mid-token regardless
        // of padding/alignment; matched as a raw substring, not decoded.
        pattern: r"aWdub3Jl|lnb3Jl|pZ25vcmU",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "base64-encoded-system",
        category: "encoded-injection",
        // base64 of "system" across its three byte-alignments.
        pattern: r"c3lzdGVt|N5c3Rlb|zeXN0ZW0",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "rot13-ignore-instructions-marker",
        category: "encoded-injection",
        pattern: r"(?i)\borapber\s+cerivbhf\s+vafgehpgvbaf\b",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "hex-escaped-instruction-marker",
        category: "encoded-injection",
        pattern: r"(?i)(?:\\x[0-9a-f]{2}){6,}",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Low,
    },
    // delimiter-injection
    BuiltinPattern {
        name: "triple-backtick-role-injection",
        category: "delimiter-injection",
        pattern: r"```(?:system|assistant|user)\b",
        min_sensitivity: Sensitivity::Medium,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "xml-instruction-tag-injection",
        category: "delimiter-injection",
        pattern: r"(?i)</?(?:instructions?|system_prompt|directive)>",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Medium,
    },
    BuiltinPattern {
        name: "hash-triple-delimiter-injection",
        category: "delimiter-injection",
        pattern: r"###\s*(?:system|instruction|override)\b",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Low,
    },
    BuiltinPattern {
        name: "dashed-admin-block-delimiter",
        category: "delimiter-injection",
        pattern: r"(?i)-{3,}\s*(?:admin|root|override)\s+(?:block|mode)\s*-{3,}",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Low,
    },
    BuiltinPattern {
        name: "bracketed-directive-delimiter",
        category: "delimiter-injection",
        pattern: r"\[\[\s*(?:directive|override|admin)\s*\]\]",
        min_sensitivity: Sensitivity::High,
        confidence: Confidence::Medium,
    },
];
