//! Sliding-window call-rate limiting (spec §4.2: global and per-rule rate
//! limits).
//!
//! Grounded on the teacher's `kill_switch` module's preference for a
//! `Mutex`-guarded `VecDeque`-backed counter over a crate dependency
//! (compare `assay-policy::tiers` pulling in `ipnet` only where the stdlib
//! genuinely has no equivalent) — a sliding window over call timestamps is
//! a few lines of `VecDeque` arithmetic, not a reason to add a crate.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Key used for the implicit cross-rule global bucket.
pub const GLOBAL_KEY: &str = "__global__";

/// A single named sliding window of call timestamps.
struct Window {
    calls: VecDeque<Instant>,
    max_calls: u32,
    window: Duration,
}

impl Window {
    fn evict_expired(&mut self, now: Instant) {
        while let Some(&front) = self.calls.front() {
            if now.duration_since(front) > self.window {
                self.calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a call attempt at `now`; returns true if it is allowed.
    fn record(&mut self, now: Instant) -> bool {
        self.evict_expired(now);
        if self.calls.len() as u32 >= self.max_calls {
            return false;
        }
        self.calls.push_back(now);
        true
    }
}

/// A registry of independent sliding-window buckets, keyed by rule name
/// (or [`GLOBAL_KEY`]).
#[derive(Default)]
pub struct RateLimiter {
    windows: HashMap<String, Window>,
}

impl RateLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call attempt against `key`'s bucket, creating it with the
    /// given limit on first use. Returns `true` if the call is within the
    /// limit and should proceed, `false` if it exceeds it.
    ///
    /// If `key` already has a bucket, the existing limit configuration is
    /// kept; only the caller's first observed `(max_calls, window)` for a
    /// given key takes effect. Configuration changes should go through
    /// [`RateLimiter::reset`].
    pub fn check(&mut self, key: &str, max_calls: u32, window_seconds: u64) -> bool {
        self.check_at(key, max_calls, window_seconds, Instant::now())
    }

    /// Same as [`RateLimiter::check`] but with an explicit clock reading,
    /// for deterministic tests.
    pub fn check_at(&mut self, key: &str, max_calls: u32, window_seconds: u64, now: Instant) -> bool {
        let window = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            calls: VecDeque::new(),
            max_calls,
            window: Duration::from_secs(window_seconds),
        });
        window.record(now)
    }

    /// Drop all tracked buckets, e.g. on a config reload.
    pub fn reset(&mut self) {
        self.windows.clear();
    }
}
