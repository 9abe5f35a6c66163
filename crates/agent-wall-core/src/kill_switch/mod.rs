//! Kill switch: an OR of three independent deny-everything triggers.
//!
//! A daemonized `std::thread` ticker polls for a kill-file trigger; a
//! programmatic flag can be set directly; and a POSIX `SIGUSR2` handler,
//! wired through `signal_hook::flag`, flips a third. Any one of the three
//! being active flips a global deny-all flag the proxy engine consults
//! before every `tools/call`. Using `signal_hook::flag`'s register/
//! unregister pair instead of a hand-rolled `sigaction` handler keeps this
//! module free of `unsafe` code.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(unix)]
use std::sync::Mutex;
#[cfg(unix)]
use std::sync::OnceLock;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::KillSwitchConfig;

/// Current state of the kill switch, independent of which trigger set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillSwitchStatus {
    /// True if any of the three triggers is currently active.
    pub active: bool,
    /// True if activated via [`KillSwitch::activate`].
    pub programmatic: bool,
    /// True if activated by the presence of a configured kill-file.
    pub file_trigger: bool,
    /// True if activated by receipt of the configured POSIX signal.
    pub signal_trigger: bool,
}

#[derive(Default)]
struct Flags {
    programmatic: AtomicBool,
    file_trigger: AtomicBool,
}

/// A handle to the kill switch. Cloning shares the same underlying state;
/// the background poll thread and signal handler both hold a clone.
#[derive(Clone)]
pub struct KillSwitch {
    flags: Arc<Flags>,
    poll_stop: Arc<AtomicBool>,
}

#[cfg(unix)]
static SIGNAL_FLAG: OnceLock<Arc<AtomicBool>> = OnceLock::new();
#[cfg(unix)]
static SIGNAL_ID: Mutex<Option<signal_hook::SigId>> = Mutex::new(None);

#[cfg(unix)]
fn signal_flag() -> &'static Arc<AtomicBool> {
    SIGNAL_FLAG.get_or_init(|| Arc::new(AtomicBool::new(false)))
}

#[cfg(unix)]
fn signal_triggered() -> bool {
    signal_flag().load(Ordering::Relaxed)
}

#[cfg(not(unix))]
fn signal_triggered() -> bool {
    false
}

impl KillSwitch {
    /// Construct and, if `config.enabled`, start the background file-poll
    /// thread and install the signal handler.
    ///
    /// The returned switch never activates on its own when `enabled` is
    /// false — callers still get a working `is_active`/`activate` handle,
    /// it simply never observes file or signal triggers.
    pub fn new(config: &KillSwitchConfig) -> Self {
        let switch = Self { flags: Arc::new(Flags::default()), poll_stop: Arc::new(AtomicBool::new(false)) };

        if !config.enabled {
            return switch;
        }

        install_signal_handler();

        let check_file = config.check_file.clone();
        let kill_file_names = config.kill_file_names.clone();
        let watch_dirs = config.watch_dirs.clone();
        let poll_interval = Duration::from_millis(config.poll_interval_ms.max(50));
        let poll_flags = switch.flags.clone();
        let stop = switch.poll_stop.clone();

        thread::spawn(move || loop {
            if stop.load(Ordering::Relaxed) {
                break;
            }
            let present = kill_file_present(&check_file, &watch_dirs, &kill_file_names);
            poll_flags.file_trigger.store(present, Ordering::Relaxed);
            thread::sleep(poll_interval);
        });

        switch
    }

    /// Manually engage the kill switch.
    pub fn activate(&self) {
        self.flags.programmatic.store(true, Ordering::Relaxed);
    }

    /// Clear the programmatic trigger. File and signal triggers, if still
    /// present, keep the switch active.
    pub fn deactivate(&self) {
        self.flags.programmatic.store(false, Ordering::Relaxed);
    }

    /// True if any trigger is currently active.
    pub fn is_active(&self) -> bool {
        self.flags.programmatic.load(Ordering::Relaxed)
            || self.flags.file_trigger.load(Ordering::Relaxed)
            || signal_triggered()
    }

    /// Full trigger breakdown, for the dashboard bridge and diagnostics.
    pub fn get_status(&self) -> KillSwitchStatus {
        let programmatic = self.flags.programmatic.load(Ordering::Relaxed);
        let file_trigger = self.flags.file_trigger.load(Ordering::Relaxed);
        let signal_trigger = signal_triggered();
        KillSwitchStatus {
            active: programmatic || file_trigger || signal_trigger,
            programmatic,
            file_trigger,
            signal_trigger,
        }
    }

    /// Stop the background poll thread and detach the signal handler.
    /// The switch remains usable afterward; file and signal triggers
    /// simply stop updating.
    pub fn dispose(&self) {
        self.poll_stop.store(true, Ordering::Relaxed);
        uninstall_signal_handler();
    }
}

fn kill_file_present(check_file: &Option<PathBuf>, watch_dirs: &[PathBuf], names: &[String]) -> bool {
    if let Some(path) = check_file {
        if path.exists() {
            return true;
        }
    }
    watch_dirs
        .iter()
        .any(|dir| names.iter().any(|name| fs::metadata(dir.join(name)).is_ok()))
}

#[cfg(unix)]
fn install_signal_handler() {
    if let Ok(id) = signal_hook::flag::register(signal_hook::consts::SIGUSR2, Arc::clone(signal_flag())) {
        *SIGNAL_ID.lock().expect("signal id mutex poisoned") = Some(id);
    }
}

#[cfg(not(unix))]
fn install_signal_handler() {
    // No POSIX signal delivery on this platform; programmatic and
    // file-poll triggers still work.
}

#[cfg(unix)]
fn uninstall_signal_handler() {
    if let Some(id) = SIGNAL_ID.lock().expect("signal id mutex poisoned").take() {
        let _ = signal_hook::low_level::unregister(id);
    }
    signal_flag().store(false, Ordering::Relaxed);
}

#[cfg(not(unix))]
fn uninstall_signal_handler() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_by_default() {
        let ks = KillSwitch::new(&KillSwitchConfig { enabled: false, ..KillSwitchConfig::default() });
        assert!(!ks.is_active());
    }

    #[test]
    fn programmatic_trigger_activates_and_deactivates() {
        let ks = KillSwitch::new(&KillSwitchConfig { enabled: false, ..KillSwitchConfig::default() });
        ks.activate();
        assert!(ks.is_active());
        ks.deactivate();
        assert!(!ks.is_active());
    }

    #[test]
    fn file_trigger_flips_after_poll() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = KillSwitchConfig {
            enabled: true,
            check_file: None,
            kill_file_names: vec![".kill".to_string()],
            watch_dirs: vec![dir.path().to_path_buf()],
            poll_interval_ms: 20,
        };
        let ks = KillSwitch::new(&cfg);
        assert!(!ks.is_active());
        fs::write(dir.path().join(".kill"), b"").unwrap();
        thread::sleep(Duration::from_millis(150));
        assert!(ks.is_active());
        ks.dispose();
    }

    #[test]
    fn status_reports_which_trigger_fired() {
        let ks = KillSwitch::new(&KillSwitchConfig { enabled: false, ..KillSwitchConfig::default() });
        ks.activate();
        let status = ks.get_status();
        assert!(status.active);
        assert!(status.programmatic);
        assert!(!status.file_trigger);
    }
}
