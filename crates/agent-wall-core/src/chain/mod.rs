//! Tool-call chain detector (spec §4.7).
//!
//! Tracks a bounded, time-windowed history of recent tool calls and checks
//! it against an ordered list of tool-name-glob sequences after every new
//! call. Grounded in the teacher's preference for a `Mutex`-guarded
//! `VecDeque` over a crate dependency (see [`crate::policy::ratelimit`]);
//! sequence matching reuses [`crate::policy::glob`] so a chain step
//! written as `"read_*|list_*"` behaves exactly like a policy rule's tool
//! pattern.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::{ChainDetectionConfig, ChainPattern, ChainSeverity};
use crate::policy::glob;

/// One recorded call in the tracked history.
#[derive(Debug, Clone)]
struct TrackedCall {
    tool_name: String,
    at: Instant,
}

/// A chain pattern that matched the current history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMatch {
    /// The matched pattern's name.
    pub name: String,
    /// The matched pattern's severity.
    pub severity: ChainSeverity,
}

/// The eight built-in tool-sequence patterns (spec §4.7).
fn builtin_chains() -> Vec<ChainPattern> {
    let read = "read_*|get_*|view_*".to_string();
    let shell = "shell_*|run_*|execute_*|bash".to_string();
    let shell_short = "shell_*|run_*|bash".to_string();
    vec![
        ChainPattern {
            name: "read-then-network".to_string(),
            severity: ChainSeverity::High,
            track_arguments: false,
            sequence: vec![read.clone(), shell.clone()],
        },
        ChainPattern {
            name: "read-write-send".to_string(),
            severity: ChainSeverity::Critical,
            track_arguments: false,
            sequence: vec!["read_*|get_*".to_string(), "write_*|create_*".to_string(), shell_short.clone()],
        },
        ChainPattern {
            name: "env-then-network".to_string(),
            severity: ChainSeverity::Critical,
            track_arguments: true,
            sequence: vec![read, shell],
        },
        ChainPattern {
            name: "directory-scan".to_string(),
            severity: ChainSeverity::Medium,
            track_arguments: false,
            sequence: vec![
                "list_*|ls".to_string(),
                "list_*|ls".to_string(),
                "list_*|ls".to_string(),
                "read_*|get_*".to_string(),
            ],
        },
        ChainPattern {
            name: "write-execute".to_string(),
            severity: ChainSeverity::High,
            track_arguments: false,
            sequence: vec!["write_*|create_*".to_string(), shell_short.clone()],
        },
        ChainPattern {
            name: "write-chmod-execute".to_string(),
            severity: ChainSeverity::Critical,
            track_arguments: false,
            sequence: vec!["write_*|create_*".to_string(), shell_short.clone(), shell_short.clone()],
        },
        ChainPattern {
            name: "read-sensitive-then-write".to_string(),
            severity: ChainSeverity::Medium,
            track_arguments: true,
            sequence: vec!["read_*|get_*".to_string(), "write_*|create_*|edit_*".to_string()],
        },
        ChainPattern {
            name: "shell-burst".to_string(),
            severity: ChainSeverity::High,
            track_arguments: false,
            sequence: vec![shell_short.clone(), shell_short.clone(), shell_short.clone(), shell_short],
        },
    ]
}

struct State {
    history: VecDeque<TrackedCall>,
}

/// Watches a sliding window of recent tool calls for known dangerous
/// sequences.
pub struct ChainDetector {
    enabled: bool,
    window_size: usize,
    window: Duration,
    patterns: Vec<ChainPattern>,
    state: Mutex<State>,
}

impl ChainDetector {
    /// Build a detector from configuration. Built-in patterns always run
    /// first; `config.custom_chains` is appended after them.
    pub fn new(config: &ChainDetectionConfig) -> Self {
        let mut patterns = builtin_chains();
        patterns.extend(config.custom_chains.iter().cloned());
        Self {
            enabled: config.enabled,
            window_size: config.window_size,
            window: Duration::from_millis(config.window_ms),
            patterns,
            state: Mutex::new(State { history: VecDeque::new() }),
        }
    }

    /// Record a tool call and check whether it completes any known chain.
    /// Returns every pattern that matches, most severe detectors reported
    /// alongside the rest — the caller decides what to do with
    /// [`ChainSeverity::Critical`] matches (spec §4.9 step 7: deny).
    pub fn record(&self, tool_name: &str) -> Vec<ChainMatch> {
        if !self.enabled {
            return Vec::new();
        }

        let mut state = self.state.lock().expect("chain detector mutex poisoned");
        let now = Instant::now();

        state.history.retain(|c| now.duration_since(c.at) <= self.window);
        state.history.push_back(TrackedCall { tool_name: tool_name.to_string(), at: now });
        while state.history.len() > self.window_size {
            state.history.pop_front();
        }

        self.patterns
            .iter()
            .filter(|p| sequence_matches(&state.history, &p.sequence))
            .map(|p| ChainMatch { name: p.name.clone(), severity: p.severity })
            .collect()
    }

    /// Discard all tracked history, e.g. on a config reload.
    pub fn reset(&self) {
        self.state.lock().expect("chain detector mutex poisoned").history.clear();
    }
}

/// True if the tail of `history` matches `sequence` in order: the last
/// `sequence.len()` calls, oldest first, each matching the corresponding
/// step's glob pattern.
fn sequence_matches(history: &VecDeque<TrackedCall>, sequence: &[String]) -> bool {
    if sequence.is_empty() || history.len() < sequence.len() {
        return false;
    }
    let tail_start = history.len() - sequence.len();
    history
        .iter()
        .skip(tail_start)
        .zip(sequence.iter())
        .all(|(call, step)| glob::matches(step, &call.tool_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ChainDetector {
        ChainDetector::new(&ChainDetectionConfig { enabled: true, ..ChainDetectionConfig::default() })
    }

    #[test]
    fn detects_read_write_send_chain() {
        let d = detector();
        assert!(d.record("read_file").is_empty());
        assert!(d.record("write_file").is_empty());
        let matches = d.record("bash");
        assert!(matches.iter().any(|m| m.name == "read-write-send"));
    }

    #[test]
    fn unrelated_calls_never_match() {
        let d = detector();
        d.record("ping");
        d.record("pong");
        assert!(d.record("ping").is_empty());
    }

    #[test]
    fn window_size_bounds_tracked_history() {
        let cfg = ChainDetectionConfig { enabled: true, window_size: 2, ..ChainDetectionConfig::default() };
        let d = ChainDetector::new(&cfg);
        d.record("read_file");
        d.record("write_file");
        // "read_file" has fallen out of the bounded window; the 3-step
        // read-write-send chain can no longer complete here.
        let matches = d.record("bash");
        assert!(!matches.iter().any(|m| m.name == "read-write-send"));
    }

    #[test]
    fn disabled_detector_tracks_nothing() {
        let d = ChainDetector::new(&ChainDetectionConfig { enabled: false, ..ChainDetectionConfig::default() });
        assert!(d.record("read_file").is_empty());
        assert!(d.record("write_file").is_empty());
        assert!(d.record("http_post").is_empty());
    }

    #[test]
    fn custom_chain_pattern_is_matched() {
        let cfg = ChainDetectionConfig {
            enabled: true,
            custom_chains: vec![ChainPattern {
                name: "custom-probe".to_string(),
                severity: ChainSeverity::High,
                track_arguments: false,
                sequence: vec!["probe_a".to_string(), "probe_b".to_string()],
            }],
            ..ChainDetectionConfig::default()
        };
        let d = ChainDetector::new(&cfg);
        d.record("probe_a");
        let matches = d.record("probe_b");
        assert!(matches.iter().any(|m| m.name == "custom-probe"));
    }

    #[test]
    fn reset_clears_history() {
        let d = detector();
        d.record("read_file");
        d.record("write_file");
        d.reset();
        let matches = d.record("bash");
        assert!(!matches.iter().any(|m| m.name == "read-write-send"));
    }
}
