//! Policy engine: first-match-wins rule evaluation (spec §4.2).
//!
//! Grounded on the teacher's `mcp::policy::McpPolicy`/`evaluate_policy`
//! (simple allow/deny tool-name lists plus a single compiled constraint
//! regex), generalized here to ordered rules with glob tool-name matching,
//! per-argument matching, and both a global and per-rule sliding-window
//! rate limit — all of which the teacher's use case (gate one evaluation
//! run) never needed.

pub mod alias;
pub mod glob;
pub mod ratelimit;

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::config::{Action, Mode, PolicyConfig, PolicyRule};
use ratelimit::{RateLimiter, GLOBAL_KEY};

/// The outcome of evaluating one `tools/call` against the active policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Forward the call.
    Allow,
    /// Reject the call.
    Deny {
        /// Name of the rule that produced this verdict, or `"default"`.
        rule: String,
        /// Human-readable reason.
        reason: String,
    },
    /// Escalate to the human-approval callback.
    Prompt {
        /// Name of the rule that produced this verdict, or `"default"`.
        rule: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl PolicyDecision {
    /// True for [`PolicyDecision::Allow`].
    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

/// Evaluates `tools/call` requests against an immutable [`PolicyConfig`]
/// snapshot, tracking rate-limit state across calls.
pub struct PolicyEngine {
    config: Arc<PolicyConfig>,
    limiter: Mutex<RateLimiter>,
}

impl PolicyEngine {
    /// Build an engine from a config snapshot.
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config: Arc::new(config),
            limiter: Mutex::new(RateLimiter::new()),
        }
    }

    /// Atomically replace the active config and drop all rate-limit
    /// history, matching spec §3: "replaced atomically on reload".
    pub fn reload(&mut self, config: PolicyConfig) {
        self.config = Arc::new(config);
        self.limiter.lock().expect("rate limiter mutex poisoned").reset();
    }

    /// The active configuration snapshot.
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Evaluate a `tools/call` invocation.
    pub fn evaluate(&self, tool_name: &str, arguments: &Value) -> PolicyDecision {
        let mut limiter = self.limiter.lock().expect("rate limiter mutex poisoned");

        if let Some(global) = &self.config.global_rate_limit {
            if !limiter.check(GLOBAL_KEY, global.max_calls, global.window_seconds) {
                return PolicyDecision::Deny {
                    rule: "__global_rate_limit__".to_string(),
                    reason: "global rate limit exceeded".to_string(),
                };
            }
        }

        for rule in &self.config.rules {
            if !rule_matches(rule, tool_name, arguments) {
                continue;
            }

            if let Some(rl) = &rule.rate_limit {
                if !limiter.check(&rule.name, rl.max_calls, rl.window_seconds) {
                    return PolicyDecision::Deny {
                        rule: rule.name.clone(),
                        reason: format!("rate limit exceeded for rule {:?}", rule.name),
                    };
                }
            }

            let reason = rule
                .message
                .clone()
                .unwrap_or_else(|| default_reason(rule.action, &rule.name));
            return decision_for(rule.action, rule.name.clone(), reason);
        }

        if self.config.mode == Mode::Strict {
            return PolicyDecision::Deny {
                rule: "default".to_string(),
                reason: "no matching rule; strict mode denies by default".to_string(),
            };
        }

        let reason = default_reason(self.config.default_action, "default");
        decision_for(self.config.default_action, "default".to_string(), reason)
    }
}

fn rule_matches(rule: &PolicyRule, tool_name: &str, arguments: &Value) -> bool {
    if !glob::matches(&rule.tool_pattern, tool_name) {
        return false;
    }
    match &rule.match_ {
        None => true,
        Some(m) => m
            .arguments
            .iter()
            .all(|(key, pattern)| alias::argument_matches(arguments, key, pattern)),
    }
}

fn decision_for(action: Action, rule: String, reason: String) -> PolicyDecision {
    match action {
        Action::Allow => PolicyDecision::Allow,
        Action::Deny => PolicyDecision::Deny { rule, reason },
        Action::Prompt => PolicyDecision::Prompt { rule, reason },
    }
}

fn default_reason(action: Action, rule_name: &str) -> String {
    match action {
        Action::Allow => format!("allowed by rule {rule_name:?}"),
        Action::Deny => format!("denied by rule {rule_name:?}"),
        Action::Prompt => format!("requires approval per rule {rule_name:?}"),
    }
}
