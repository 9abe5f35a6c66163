//! Proxy pipeline events and the sinks that observe them (spec §4.9,
//! §4.10).
//!
//! Generalizes the teacher's `mcp::decision::DecisionEmitter` trait (one
//! method, `emit(&DecisionEvent)`, implemented by a `NullDecisionEmitter`
//! and a `FileDecisionEmitter` writing NDJSON) into an `EventSink` that
//! the dashboard bridge and the audit log both subscribe to, rather than
//! the proxy engine calling each of them directly — the same
//! "always emit, subscribers decide what to do with it" shape, with one
//! more subscriber than the teacher ever needed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Action;

/// Every externally observable thing the proxy pipeline does to one
/// `tools/call` (spec §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProxyEvent {
    /// The kill switch was active; the call was denied without running
    /// the rest of the pipeline.
    KillSwitchDenied { tool: String },
    /// The injection detector found a match.
    InjectionDetected { tool: String, patterns: Vec<String> },
    /// Egress control blocked a URL in the call's arguments.
    EgressBlocked { tool: String, url: String, reason: String },
    /// The policy engine reached a verdict.
    PolicyDecision { tool: String, rule: String, action: Action, reason: String },
    /// The chain detector matched a tracked sequence.
    ChainMatched { tool: String, pattern: String, critical: bool },
    /// The response scanner reached a verdict on the call's response.
    ResponseScanned { tool: String, action: String, findings: Vec<String> },
    /// A `prompt`-action policy rule escalated to human approval.
    Prompted { tool: String, rule: String, approved: bool },
}

impl ProxyEvent {
    /// The tool name this event concerns.
    pub fn tool(&self) -> &str {
        match self {
            ProxyEvent::KillSwitchDenied { tool }
            | ProxyEvent::InjectionDetected { tool, .. }
            | ProxyEvent::EgressBlocked { tool, .. }
            | ProxyEvent::PolicyDecision { tool, .. }
            | ProxyEvent::ChainMatched { tool, .. }
            | ProxyEvent::ResponseScanned { tool, .. }
            | ProxyEvent::Prompted { tool, .. } => tool,
        }
    }
}

/// Anything that wants to observe every [`ProxyEvent`] the pipeline
/// produces. Implementations must tolerate being called from whichever
/// thread is running the pipeline at the time.
pub trait EventSink: Send + Sync {
    /// Observe one event.
    fn emit(&self, event: &ProxyEvent);
}

/// A sink that discards everything. The default when no observers are
/// configured.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _event: &ProxyEvent) {}
}

/// A sink that appends each event as one NDJSON line to a file.
pub struct FileEventSink {
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Open (or create) `path` in append mode.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl EventSink for FileEventSink {
    fn emit(&self, event: &ProxyEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            if let Ok(mut f) = self.file.lock() {
                let _ = writeln!(f, "{json}");
            }
        }
    }
}

/// Render an event into the flat shape the audit log accepts, so the
/// audit log can itself be wired up as just another [`EventSink`]
/// implementor when convenient, without duplicating event-to-field logic.
///
/// The returned rule id is the one spec §8's end-to-end scenarios assert
/// on directly (e.g. `"block-ssh-keys"`, `"__egress_control__"`) — for a
/// [`ProxyEvent::PolicyDecision`] that means the actual matched rule's
/// name, not a generic module label.
pub fn as_audit_fields(event: &ProxyEvent) -> (String, &'static str, Option<Value>) {
    match event {
        ProxyEvent::KillSwitchDenied { .. } => ("__kill_switch__".to_string(), "deny", None),
        ProxyEvent::InjectionDetected { patterns, .. } => {
            ("__injection_detector__".to_string(), "deny", Some(Value::from(patterns.clone())))
        }
        ProxyEvent::EgressBlocked { url, reason, .. } => {
            ("__egress_control__".to_string(), "deny", Some(serde_json::json!({"url": url, "reason": reason})))
        }
        ProxyEvent::PolicyDecision { rule, action, .. } => (
            rule.clone(),
            match action {
                Action::Allow => "allow",
                Action::Deny => "deny",
                Action::Prompt => "prompt",
            },
            None,
        ),
        ProxyEvent::ChainMatched { pattern, critical, .. } => (
            "__chain_detector__".to_string(),
            if *critical { "deny" } else { "allow" },
            Some(serde_json::json!({"pattern": pattern})),
        ),
        ProxyEvent::ResponseScanned { action, findings, .. } => (
            "__response_scanner__".to_string(),
            match action.as_str() {
                "block" => "deny",
                _ => "allow",
            },
            Some(Value::from(findings.clone())),
        ),
        ProxyEvent::Prompted { rule, approved, .. } => (
            "__approval__".to_string(),
            if *approved { "allow" } else { "deny" },
            Some(serde_json::json!({"rule": rule})),
        ),
    }
}
