//! Dashboard bridge: event-routing and stats-aggregation for an external
//! observer UI.
//!
//! The transport an observer connects over (websocket, IPC, whatever) is
//! explicitly out of scope here. This module is only the deterministic
//! part: an [`EventSink`] implementor that tallies what the pipeline did,
//! plus query operations (`stats`, kill-switch toggle, recent audit
//! entries) a transport layer would expose over the wire. None of it
//! needs a socket to be unit-tested.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::audit::AuditEntry;
use crate::config::Action;
use crate::error::AuditError;
use crate::kill_switch::{KillSwitch, KillSwitchStatus};
use crate::proxy::events::{EventSink, ProxyEvent};

/// Default interval at which a [`DashboardBridge::spawn_periodic_publisher`]
/// ticker calls its sink.
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_secs(2);

/// Default cap on how many audit entries [`DashboardBridge::recent_audit_entries`]
/// returns when the caller doesn't specify one.
pub const DEFAULT_MAX_AUDIT_ENTRIES: usize = 200;

/// Running tally of the nine event kinds the bridge tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub allowed: u64,
    pub denied: u64,
    pub prompted: u64,
    pub response_blocked: u64,
    pub response_redacted: u64,
    pub injection_detected: u64,
    pub egress_blocked: u64,
    pub kill_switch_active: u64,
    pub chain_detected: u64,
}

/// A point-in-time snapshot an observer would see as `stats`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Seconds since the bridge was constructed.
    pub uptime_seconds: u64,
    /// Totals by event kind.
    pub counts: EventCounts,
    /// Per-rule hit counts, across both policy allow/deny/prompt
    /// verdicts and the kill switch/egress/chain/scanner pseudo-rules.
    pub rule_hits: HashMap<String, u64>,
}

struct Inner {
    counts: EventCounts,
    rule_hits: HashMap<String, u64>,
}

/// Observes a [`crate::proxy::Pipeline`]'s events and answers query
/// operations: toggle kill-switch, fetch stats/config, fetch limited
/// audit entries.
pub struct DashboardBridge {
    started: Instant,
    inner: Mutex<Inner>,
    kill_switch: Option<Arc<KillSwitch>>,
    audit_path: Option<PathBuf>,
    publish_stop: Arc<AtomicBool>,
}

impl DashboardBridge {
    /// Build a bridge. `kill_switch` (for the toggle operation) and
    /// `audit_path` (for the audit-entry query) are both optional — a
    /// bridge with neither still aggregates event stats correctly.
    pub fn new(kill_switch: Option<Arc<KillSwitch>>, audit_path: Option<PathBuf>) -> Self {
        Self {
            started: Instant::now(),
            inner: Mutex::new(Inner { counts: EventCounts::default(), rule_hits: HashMap::new() }),
            kill_switch,
            audit_path,
            publish_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The current stats snapshot.
    pub fn stats(&self) -> Stats {
        let inner = self.inner.lock().expect("dashboard bridge mutex poisoned");
        Stats {
            uptime_seconds: self.started.elapsed().as_secs(),
            counts: inner.counts,
            rule_hits: inner.rule_hits.clone(),
        }
    }

    /// Engage or disengage the kill switch's programmatic trigger. A
    /// no-op if this bridge was built without a kill-switch handle.
    pub fn toggle_kill_switch(&self, active: bool) {
        let Some(ks) = &self.kill_switch else { return };
        if active {
            ks.activate();
        } else {
            ks.deactivate();
        }
    }

    /// The kill switch's full trigger breakdown, if this bridge has one.
    pub fn kill_switch_status(&self) -> Option<KillSwitchStatus> {
        self.kill_switch.as_ref().map(|ks| ks.get_status())
    }

    /// Read up to `limit` of the most recent entries from the audit log.
    /// Entries are returned oldest-first. Lines that fail to parse are
    /// skipped rather than aborting the read — a torn final line from a
    /// writer mid-flush shouldn't hide every entry before it.
    pub fn recent_audit_entries(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditError> {
        let Some(path) = &self.audit_path else {
            return Ok(Vec::new());
        };
        let file = File::open(path).map_err(|source| AuditError::Io { path: path.clone(), source })?;
        let mut all = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| AuditError::Io { path: path.clone(), source })?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(entry) = serde_json::from_str::<AuditEntry>(&line) {
                all.push(entry);
            }
        }
        let start = all.len().saturating_sub(limit);
        Ok(all.split_off(start))
    }

    /// Start a background thread that calls `sink.publish(self.stats())`
    /// every `interval`, until [`DashboardBridge::dispose`] is called.
    /// Mirrors the kill switch's own daemon-scheduled poll thread
    /// ([`crate::kill_switch::KillSwitch::new`]) rather than inventing a
    /// second ticker shape.
    pub fn spawn_periodic_publisher(self: &Arc<Self>, sink: Arc<dyn StatsSink>, interval: Duration) {
        let bridge = self.clone();
        let stop = self.publish_stop.clone();
        thread::spawn(move || loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            thread::sleep(interval);
            if stop.load(Ordering::Relaxed) {
                break;
            }
            sink.publish(&bridge.stats());
        });
    }

    /// Stop the periodic publisher, if one was started.
    pub fn dispose(&self) {
        self.publish_stop.store(true, Ordering::Relaxed);
    }
}

impl EventSink for DashboardBridge {
    fn emit(&self, event: &ProxyEvent) {
        let mut inner = self.inner.lock().expect("dashboard bridge mutex poisoned");
        match event {
            ProxyEvent::KillSwitchDenied { .. } => {
                inner.counts.kill_switch_active += 1;
                inner.counts.denied += 1;
            }
            ProxyEvent::InjectionDetected { .. } => {
                inner.counts.injection_detected += 1;
                inner.counts.denied += 1;
            }
            ProxyEvent::EgressBlocked { .. } => {
                inner.counts.egress_blocked += 1;
                inner.counts.denied += 1;
            }
            ProxyEvent::PolicyDecision { rule, action, .. } => {
                *inner.rule_hits.entry(rule.clone()).or_insert(0) += 1;
                match action {
                    Action::Allow => inner.counts.allowed += 1,
                    Action::Deny => inner.counts.denied += 1,
                    Action::Prompt => inner.counts.prompted += 1,
                }
            }
            ProxyEvent::ChainMatched { critical, .. } => {
                inner.counts.chain_detected += 1;
                if *critical {
                    inner.counts.denied += 1;
                }
            }
            ProxyEvent::ResponseScanned { action, .. } => match action.as_str() {
                "block" => inner.counts.response_blocked += 1,
                "redact" => inner.counts.response_redacted += 1,
                _ => {}
            },
            ProxyEvent::Prompted { approved, .. } => {
                if *approved {
                    inner.counts.allowed += 1;
                } else {
                    inner.counts.denied += 1;
                }
            }
        }
    }
}

/// Something a [`DashboardBridge`] can periodically hand a [`Stats`]
/// snapshot to — the transport-facing half this module deliberately
/// doesn't implement.
pub trait StatsSink: Send + Sync {
    /// Observe one stats snapshot.
    fn publish(&self, stats: &Stats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::config::KillSwitchConfig;

    #[test]
    fn tallies_policy_decisions_by_action() {
        let bridge = DashboardBridge::new(None, None);
        bridge.emit(&ProxyEvent::PolicyDecision {
            tool: "read_file".to_string(),
            rule: "allow-read".to_string(),
            action: Action::Allow,
            reason: String::new(),
        });
        bridge.emit(&ProxyEvent::PolicyDecision {
            tool: "delete_file".to_string(),
            rule: "deny-delete".to_string(),
            action: Action::Deny,
            reason: "nope".to_string(),
        });
        let stats = bridge.stats();
        assert_eq!(stats.counts.allowed, 1);
        assert_eq!(stats.counts.denied, 1);
        assert_eq!(stats.rule_hits["allow-read"], 1);
        assert_eq!(stats.rule_hits["deny-delete"], 1);
    }

    #[test]
    fn tallies_every_security_module_event_kind() {
        let bridge = DashboardBridge::new(None, None);
        bridge.emit(&ProxyEvent::KillSwitchDenied { tool: "x".to_string() });
        bridge.emit(&ProxyEvent::InjectionDetected { tool: "x".to_string(), patterns: vec!["a".to_string()] });
        bridge.emit(&ProxyEvent::EgressBlocked { tool: "x".to_string(), url: "http://x".to_string(), reason: "r".to_string() });
        bridge.emit(&ProxyEvent::ChainMatched { tool: "x".to_string(), pattern: "p".to_string(), critical: true });
        bridge.emit(&ProxyEvent::ResponseScanned { tool: "x".to_string(), action: "block".to_string(), findings: vec![] });
        bridge.emit(&ProxyEvent::ResponseScanned { tool: "x".to_string(), action: "redact".to_string(), findings: vec![] });
        bridge.emit(&ProxyEvent::Prompted { tool: "x".to_string(), rule: "r".to_string(), approved: false });

        let stats = bridge.stats();
        assert_eq!(stats.counts.kill_switch_active, 1);
        assert_eq!(stats.counts.injection_detected, 1);
        assert_eq!(stats.counts.egress_blocked, 1);
        assert_eq!(stats.counts.chain_detected, 1);
        assert_eq!(stats.counts.response_blocked, 1);
        assert_eq!(stats.counts.response_redacted, 1);
        // Denied: kill-switch, injection, egress, the critical chain match, and the auto-denied prompt.
        assert_eq!(stats.counts.denied, 5);
    }

    #[test]
    fn toggle_kill_switch_is_a_no_op_without_a_handle() {
        let bridge = DashboardBridge::new(None, None);
        bridge.toggle_kill_switch(true);
        assert!(bridge.kill_switch_status().is_none());
    }

    #[test]
    fn toggle_kill_switch_drives_the_real_switch() {
        let ks = Arc::new(KillSwitch::new(&KillSwitchConfig { enabled: false, ..KillSwitchConfig::default() }));
        let bridge = DashboardBridge::new(Some(ks.clone()), None);
        bridge.toggle_kill_switch(true);
        assert!(ks.is_active());
        bridge.toggle_kill_switch(false);
        assert!(!ks.is_active());
    }

    #[test]
    fn recent_audit_entries_reads_the_last_n_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), None);
        for i in 0..5 {
            log.log(&format!("rule-{i}"), "allow", None, None, None).unwrap();
        }
        let bridge = DashboardBridge::new(None, Some(path));
        let entries = bridge.recent_audit_entries(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rule_id, "rule-3");
        assert_eq!(entries[1].rule_id, "rule-4");
    }

    #[test]
    fn no_audit_path_yields_empty_entries() {
        let bridge = DashboardBridge::new(None, None);
        assert!(bridge.recent_audit_entries(10).unwrap().is_empty());
    }

    struct CollectingSink {
        seen: Mutex<Vec<Stats>>,
    }
    impl StatsSink for CollectingSink {
        fn publish(&self, stats: &Stats) {
            self.seen.lock().unwrap().push(stats.clone());
        }
    }

    #[test]
    fn periodic_publisher_calls_the_sink_and_can_be_disposed() {
        let bridge = Arc::new(DashboardBridge::new(None, None));
        let sink = Arc::new(CollectingSink { seen: Mutex::new(Vec::new()) });
        bridge.spawn_periodic_publisher(sink.clone(), Duration::from_millis(20));
        thread::sleep(Duration::from_millis(90));
        bridge.dispose();
        let count_after_dispose = sink.seen.lock().unwrap().len();
        assert!(count_after_dispose >= 2);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(sink.seen.lock().unwrap().len(), count_after_dispose);
    }
}
