//! Request/response correlation table (spec §4.9: "responses are matched
//! back to the request that produced them by id, with a bounded TTL").
//!
//! A `tools/call` request's id is recorded here when it is forwarded; the
//! matching response looks the id up to recover the tool name (needed to
//! run the response scanner's tool-exclusion rules — the response itself
//! doesn't carry the tool name, only the request did). Entries older than
//! the TTL are swept periodically so a client that forwards a request and
//! never reads the reply doesn't leak memory for the life of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::message::Identifier;

/// Default time a pending call is retained before being swept.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);
/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

struct Entry {
    tool_name: String,
    recorded_at: Instant,
}

struct Inner {
    entries: HashMap<Identifier, Entry>,
}

/// Tracks outstanding `tools/call` requests until their response arrives
/// or they age out.
#[derive(Clone)]
pub struct PendingCallTable {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
    stop: Arc<std::sync::atomic::AtomicBool>,
}

impl PendingCallTable {
    /// Build a table and start its background sweep thread.
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        let inner = Arc::new(Mutex::new(Inner { entries: HashMap::new() }));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let sweep_inner = inner.clone();
        let sweep_stop = stop.clone();
        thread::spawn(move || loop {
            if sweep_stop.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }
            thread::sleep(sweep_interval);
            let now = Instant::now();
            let mut guard = sweep_inner.lock().expect("pending table mutex poisoned");
            guard.entries.retain(|_, e| now.duration_since(e.recorded_at) <= ttl);
        });

        Self { inner, ttl, stop }
    }

    /// Build a table with the default TTL and sweep interval.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_SWEEP_INTERVAL)
    }

    /// Record a forwarded call.
    pub fn insert(&self, id: Identifier, tool_name: String) {
        let mut guard = self.inner.lock().expect("pending table mutex poisoned");
        guard.entries.insert(id, Entry { tool_name, recorded_at: Instant::now() });
    }

    /// Remove and return the tool name for `id`, if it is still tracked
    /// (i.e. hasn't aged out past the TTL).
    pub fn take(&self, id: &Identifier) -> Option<String> {
        let mut guard = self.inner.lock().expect("pending table mutex poisoned");
        let entry = guard.entries.remove(id)?;
        if entry.recorded_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.tool_name)
    }

    /// Number of currently tracked calls, for diagnostics/tests.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("pending table mutex poisoned").entries.len()
    }

    /// True if no calls are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop the background sweep thread.
    pub fn dispose(&self) {
        self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_recovers_tool_name() {
        let table = PendingCallTable::new(Duration::from_secs(30), Duration::from_secs(300));
        table.insert(Identifier::Number(1), "read_file".to_string());
        assert_eq!(table.take(&Identifier::Number(1)), Some("read_file".to_string()));
        assert!(table.is_empty());
        table.dispose();
    }

    #[test]
    fn unknown_id_returns_none() {
        let table = PendingCallTable::new(Duration::from_secs(30), Duration::from_secs(300));
        assert_eq!(table.take(&Identifier::Number(99)), None);
        table.dispose();
    }

    #[test]
    fn background_sweep_evicts_expired_entries() {
        let table = PendingCallTable::new(Duration::from_millis(20), Duration::from_millis(30));
        table.insert(Identifier::Text("a".to_string()), "ping".to_string());
        thread::sleep(Duration::from_millis(200));
        assert!(table.is_empty());
        table.dispose();
    }
}
