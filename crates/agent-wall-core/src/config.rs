//! Configuration types recognized by the core (spec §3, §6).
//!
//! This module only defines shapes; parsing them out of YAML/JSON and
//! validating them against a schema is the external loader's job (spec §1
//! Out of scope). Every type here derives `Deserialize` so that loader can
//! hand the core a ready value via any `serde` format, and `Serialize` so
//! the dashboard bridge (§4.10) can echo the active config back to an
//! observer. Field names use the `camelCase` the spec's JSON shapes use
//! throughout (teacher convention: compare `mcp::policy::McpPolicy`, which
//! instead matches the bare snake_case YAML it was designed for — this
//! config's wire shape is specified directly by spec §6, so it is matched
//! byte-for-byte rather than adapted to a different external format).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Policy evaluation mode (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Unmatched tool calls fall through to `defaultAction`.
    #[default]
    Standard,
    /// Unmatched tool calls are denied outright ("zero-trust").
    Strict,
}

/// An action a policy rule (or the default policy) can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Forward the call.
    Allow,
    /// Reject the call with a synthesized JSON-RPC error.
    Deny,
    /// Escalate to the human-approval callback.
    Prompt,
}

/// A global call-rate ceiling, independent of any individual rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum calls allowed within the window.
    #[serde(rename = "maxCalls")]
    pub max_calls: u32,
    /// Window length, in seconds.
    #[serde(rename = "windowSeconds")]
    pub window_seconds: u64,
}

/// Argument-match clause of a `PolicyRule` (spec §3, §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgumentMatch {
    /// `argument-key -> glob-like pattern` pairs, all of which must match
    /// (logical AND) for the rule to apply.
    #[serde(default)]
    pub arguments: HashMap<String, String>,
}

/// One ordered policy rule (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    /// Rule name. SHOULD be unique; duplicates are tolerated, not rejected.
    pub name: String,
    /// `|`-joined glob alternatives matched against the tool name.
    #[serde(rename = "toolPattern")]
    pub tool_pattern: String,
    /// Optional per-argument match clause.
    #[serde(rename = "match", default)]
    pub match_: Option<ArgumentMatch>,
    /// Action to take on match.
    pub action: Action,
    /// Optional message; a default is synthesized if absent.
    #[serde(default)]
    pub message: Option<String>,
    /// Optional per-rule rate limit, consumed only once the rule matches.
    #[serde(rename = "rateLimit", default)]
    pub rate_limit: Option<RateLimitConfig>,
}

/// `block` or `redact` for response-scanner oversize handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizeAction {
    /// Block the response outright.
    Block,
    /// Truncate and redact.
    Redact,
}

/// `pass`, `redact`, or `block` — the priority-ordered scanner verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    /// No action; forward unchanged. Lowest priority.
    Pass,
    /// Replace matches with `[REDACTED]`.
    Redact,
    /// Refuse to forward the response. Highest priority.
    Block,
}

/// A user-supplied scanner pattern (spec §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPattern {
    /// Pattern name, used in findings and audit entries.
    pub name: String,
    /// Regex source text.
    pub pattern: String,
    /// Free-form category label (e.g. `"secrets"`, `"pii"`).
    #[serde(default = "default_category")]
    pub category: String,
    /// Action to take when this pattern matches.
    pub action: ScanAction,
    /// Optional human-readable message.
    #[serde(default)]
    pub message: Option<String>,
}

fn default_category() -> String {
    "custom".to_string()
}

/// Response-scanner configuration (spec §4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseScanningConfig {
    /// Whether the scanner runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum response size in bytes before the oversize finding fires;
    /// `0` disables the check.
    #[serde(rename = "maxResponseSize", default)]
    pub max_response_size: usize,
    /// Action to take for the oversize finding.
    #[serde(rename = "oversizeAction", default = "default_oversize_action")]
    pub oversize_action: OversizeAction,
    /// Whether built-in secret patterns are prepended.
    #[serde(rename = "detectSecrets", default = "default_true")]
    pub detect_secrets: bool,
    /// Whether built-in PII patterns are appended.
    #[serde(rename = "detectPII", default)]
    pub detect_pii: bool,
    /// Action for the large-base64-blob exfiltration marker.
    #[serde(rename = "base64Action", default = "default_pass")]
    pub base64_action: ScanAction,
    /// Cap on the number of user patterns compiled.
    #[serde(rename = "maxPatterns", default = "default_max_patterns")]
    pub max_patterns: usize,
    /// User-supplied patterns, screened for ReDoS shapes before use.
    #[serde(default)]
    pub patterns: Vec<UserPattern>,
}

fn default_true() -> bool {
    true
}
fn default_pass() -> ScanAction {
    ScanAction::Pass
}
fn default_oversize_action() -> OversizeAction {
    OversizeAction::Block
}
fn default_max_patterns() -> usize {
    100
}

impl Default for ResponseScanningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_response_size: 0,
            oversize_action: OversizeAction::Block,
            detect_secrets: true,
            detect_pii: false,
            base64_action: ScanAction::Pass,
            max_patterns: 100,
            patterns: Vec::new(),
        }
    }
}

/// Sensitivity tier gating which injection patterns run (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Only the highest-confidence patterns run.
    #[default]
    Low,
    /// Low + medium-sensitivity patterns run.
    Medium,
    /// All patterns run.
    High,
}

impl Sensitivity {
    /// Numeric level used to compare against a pattern's minimum
    /// sensitivity (low=1, medium=2, high=3).
    pub fn level(self) -> u8 {
        match self {
            Sensitivity::Low => 1,
            Sensitivity::Medium => 2,
            Sensitivity::High => 3,
        }
    }
}

/// Prompt-injection detector configuration (spec §4.4, §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InjectionDetectionConfig {
    /// Whether the detector runs at all.
    #[serde(default)]
    pub enabled: bool,
    /// Sensitivity gate.
    #[serde(default)]
    pub sensitivity: Sensitivity,
    /// Additional user-supplied regex patterns.
    #[serde(rename = "customPatterns", default)]
    pub custom_patterns: Vec<UserPattern>,
    /// Tools skipped entirely.
    #[serde(rename = "excludeTools", default)]
    pub exclude_tools: Vec<String>,
}

/// Egress-control configuration (spec §4.5, §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EgressControlConfig {
    /// Whether egress control runs at all.
    #[serde(default)]
    pub enabled: bool,
    /// If non-empty, only these domains (or subdomains of them) are
    /// reachable.
    #[serde(rename = "allowedDomains", default)]
    pub allowed_domains: Vec<String>,
    /// Domains (and their subdomains) that are always blocked.
    #[serde(rename = "blockedDomains", default)]
    pub blocked_domains: Vec<String>,
    /// Block RFC1918/loopback/link-local destinations.
    #[serde(rename = "blockPrivateIPs", default)]
    pub block_private_ips: bool,
    /// Block well-known cloud metadata endpoints.
    #[serde(rename = "blockMetadataEndpoints", default = "default_true")]
    pub block_metadata_endpoints: bool,
    /// Tools skipped entirely.
    #[serde(rename = "excludeTools", default)]
    pub exclude_tools: Vec<String>,
}

/// Kill-switch configuration (spec §4.6, §6).
///
/// **Open question resolved** (see `DESIGN.md`): the spec's config table
/// lists a singular `checkFile` and a `killFileNames` list but no explicit
/// watch-directory list. We resolve this as: `checkFile`, if set, is one
/// absolute path polled directly; `killFileNames` are filenames polled for
/// inside each of `watchDirs` (defaulting to `["."]`, never an environment
/// variable, per spec §6 "Environment variables consumed: None").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    /// Whether the kill switch runs at all.
    #[serde(default)]
    pub enabled: bool,
    /// A single explicit path polled directly.
    #[serde(rename = "checkFile", default)]
    pub check_file: Option<PathBuf>,
    /// Filenames polled for inside each of `watchDirs`.
    #[serde(rename = "killFileNames", default = "default_kill_file_names")]
    pub kill_file_names: Vec<String>,
    /// Directories searched for `killFileNames`.
    #[serde(rename = "watchDirs", default = "default_watch_dirs")]
    pub watch_dirs: Vec<PathBuf>,
    /// Poll interval, in milliseconds.
    #[serde(rename = "pollIntervalMs", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_kill_file_names() -> Vec<String> {
    vec![".agent-wall-kill".to_string()]
}
fn default_watch_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            check_file: None,
            kill_file_names: default_kill_file_names(),
            watch_dirs: default_watch_dirs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// A named, ordered tool-call sequence the chain detector watches for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainPattern {
    /// Pattern name, used as the audit/event rule id suffix.
    pub name: String,
    /// Severity; only `critical` denies (spec §4.9 step 7).
    pub severity: ChainSeverity,
    /// If true, matched calls' arguments are retained in the match report.
    #[serde(rename = "trackArguments", default)]
    pub track_arguments: bool,
    /// Ordered sequence of `|`-joined tool-name glob alternatives.
    pub sequence: Vec<String>,
}

/// Severity of a matched tool-call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainSeverity {
    /// Logged informationally; the call is still allowed.
    Medium,
    /// Logged informationally; the call is still allowed.
    High,
    /// The call that completed the chain is denied.
    Critical,
}

/// Chain-detector configuration (spec §4.7, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDetectionConfig {
    /// Whether the chain detector runs at all.
    #[serde(default)]
    pub enabled: bool,
    /// Maximum number of tracked calls retained.
    #[serde(rename = "windowSize", default = "default_window_size")]
    pub window_size: usize,
    /// Maximum age, in milliseconds, of a tracked call.
    #[serde(rename = "windowMs", default = "default_window_ms")]
    pub window_ms: u64,
    /// Additional user-defined chain patterns, appended after the
    /// built-ins.
    #[serde(rename = "customChains", default)]
    pub custom_chains: Vec<ChainPattern>,
}

fn default_window_size() -> usize {
    20
}
fn default_window_ms() -> u64 {
    60_000
}

impl Default for ChainDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_size: default_window_size(),
            window_ms: default_window_ms(),
            custom_chains: Vec::new(),
        }
    }
}

/// The `security.*` sub-configurations (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    /// Prompt-injection detector.
    #[serde(rename = "injectionDetection", default)]
    pub injection_detection: InjectionDetectionConfig,
    /// Egress/URL control.
    #[serde(rename = "egressControl", default)]
    pub egress_control: EgressControlConfig,
    /// Kill switch.
    #[serde(rename = "killSwitch", default)]
    pub kill_switch: KillSwitchConfig,
    /// Tool-chain detector.
    #[serde(rename = "chainDetection", default)]
    pub chain_detection: ChainDetectionConfig,
    /// Whether the audit log HMAC-chains its entries.
    #[serde(default)]
    pub signing: bool,
    /// HMAC signing key, required if `signing` is true.
    #[serde(rename = "signingKey", default)]
    pub signing_key: Option<String>,
}

/// The immutable policy configuration snapshot (spec §3).
///
/// Replaced atomically on reload; never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Schema/config version, starting at 1.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Evaluation mode.
    #[serde(default)]
    pub mode: Mode,
    /// Action taken when no rule matches (standard mode only).
    #[serde(rename = "defaultAction", default = "default_default_action")]
    pub default_action: Action,
    /// Optional global call-rate ceiling.
    #[serde(rename = "globalRateLimit", default)]
    pub global_rate_limit: Option<RateLimitConfig>,
    /// Ordered policy rules.
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
    /// Response scanner configuration.
    #[serde(rename = "responseScanning", default)]
    pub response_scanning: Option<ResponseScanningConfig>,
    /// Security module sub-configurations.
    #[serde(default)]
    pub security: SecurityConfig,
}

fn default_version() -> u32 {
    1
}
fn default_default_action() -> Action {
    Action::Prompt
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            version: 1,
            mode: Mode::Standard,
            default_action: Action::Prompt,
            global_rate_limit: None,
            rules: Vec::new(),
            response_scanning: Some(ResponseScanningConfig::default()),
            security: SecurityConfig::default(),
        }
    }
}
