//! Tamper-evident audit log.
//!
//! Each entry's signature chains to the previous one:
//! `sig_k = HMAC(key, canonical_json(entry_k without "signature") + "|" + sig_{k-1})`,
//! with `sig_0 = "genesis"`. Verifying the chain later (see
//! [`super::verify`]) means recomputing every signature in order and
//! comparing; altering or removing any entry breaks every signature after
//! it.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use crate::error::AuditError;

use super::jcs;

type HmacSha256 = Hmac<Sha256>;

/// Genesis value chained signatures start from.
pub const GENESIS: &str = "genesis";

/// Default rotation threshold: 50 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;

/// Default cap on retained rotated files (`<path>.1` .. `<path>.<N>`).
pub const DEFAULT_MAX_FILES: u32 = 5;

/// Argument values under a key matching this are replaced with
/// `"[REDACTED]"` before being written; the rest are truncated to
/// [`MAX_ARG_LEN`] characters.
const REDACT_KEY_SUBSTRINGS: &[&str] = &["password", "secret", "token", "key", "auth", "credential"];
const MAX_ARG_LEN: usize = 200;

/// One tamper-evident, HMAC-chained audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic sequence number, starting at 1.
    pub sequence: u64,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Identifier of the rule/module that produced this entry (e.g.
    /// `"policy:deny-ssh"`, `"scanner:private-key"`, `"kill-switch"`).
    pub rule_id: String,
    /// `"allow"`, `"deny"`, or `"prompt"`.
    pub decision: String,
    /// The tool name involved, if any.
    pub tool: Option<String>,
    /// Redacted/truncated arguments, if any.
    pub arguments: Option<Value>,
    /// Human-readable reason.
    pub reason: Option<String>,
    /// The previous entry's signature (or [`GENESIS`] for the first).
    pub prev_signature: String,
    /// This entry's HMAC signature.
    pub signature: String,
}

/// Compute the canonical signing payload (every field but `signature`).
fn signing_payload(e: &AuditEntry) -> Value {
    serde_json::json!({
        "sequence": e.sequence,
        "timestamp": e.timestamp,
        "rule_id": e.rule_id,
        "decision": e.decision,
        "tool": e.tool,
        "arguments": e.arguments,
        "reason": e.reason,
        "prev_signature": e.prev_signature,
    })
}

/// Compute `HMAC(key, canonical_json(payload) + "|" + prev_signature)`.
pub fn compute_signature(key: &[u8], entry: &AuditEntry) -> Result<String, AuditError> {
    let canonical = jcs::to_vec(&signing_payload(entry)).map_err(|e| AuditError::Io {
        path: PathBuf::new(),
        source: std::io::Error::other(e.to_string()),
    })?;
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(&canonical);
    mac.update(b"|");
    mac.update(entry.prev_signature.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn redact_arguments(arguments: &Value) -> Value {
    match arguments {
        Value::Object(map) => {
            let redacted: serde_json::Map<String, Value> = map
                .iter()
                .map(|(k, v)| {
                    let lower = k.to_lowercase();
                    if REDACT_KEY_SUBSTRINGS.iter().any(|s| lower.contains(s)) {
                        (k.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (k.clone(), truncate_value(v))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        other => truncate_value(other),
    }
}

fn truncate_value(v: &Value) -> Value {
    match v {
        Value::String(s) if s.chars().count() > MAX_ARG_LEN => {
            let head: String = s.chars().take(MAX_ARG_LEN).collect();
            Value::String(format!("{head}...[truncated]"))
        }
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), truncate_value(v))).collect()),
        Value::Array(items) => Value::Array(items.iter().map(truncate_value).collect()),
        other => other.clone(),
    }
}

struct Writer {
    file: File,
    path: PathBuf,
    bytes_written: u64,
}

/// An append-only, optionally HMAC-signed audit log with size-based
/// rotation.
pub struct AuditLog {
    writer: Option<Mutex<Writer>>,
    signing_key: Option<Vec<u8>>,
    max_bytes: u64,
    max_files: u32,
    sequence: Mutex<u64>,
    prev_signature: Mutex<String>,
}

impl AuditLog {
    /// Open (or create) the log file at `path`. If `path` is `None`, the
    /// log is a no-op sink — every call to [`AuditLog::log`] succeeds
    /// without writing anything, so absence of a configured path disables
    /// auditing without disabling the pipeline.
    pub fn new(path: Option<&Path>, signing_key: Option<Vec<u8>>) -> Self {
        let writer = path.and_then(|p| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(p)
                .ok()
                .map(|f| {
                    let bytes_written = f.metadata().map(|m| m.len()).unwrap_or(0);
                    Mutex::new(Writer { file: f, path: p.to_path_buf(), bytes_written })
                })
        });
        Self {
            writer,
            signing_key,
            max_bytes: DEFAULT_MAX_BYTES,
            max_files: DEFAULT_MAX_FILES,
            sequence: Mutex::new(1),
            prev_signature: Mutex::new(GENESIS.to_string()),
        }
    }

    /// Override the default rotation threshold.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Override the default cap on retained rotated files. The oldest
    /// (`<path>.<max_files>`) is deleted once rotation would exceed it.
    pub fn with_max_files(mut self, max_files: u32) -> Self {
        self.max_files = max_files;
        self
    }

    /// Append one entry. Arguments are redacted before writing; the
    /// signature chain and sequence counter advance only on a successful
    /// write. Audit I/O failures are surfaced via the returned `Err` and
    /// never block the proxy pipeline directly — the caller decides
    /// whether to act on the error.
    pub fn log(
        &self,
        rule_id: &str,
        decision: &str,
        tool: Option<&str>,
        arguments: Option<&Value>,
        reason: Option<&str>,
    ) -> Result<(), AuditError> {
        let Some(writer_lock) = &self.writer else {
            return Ok(());
        };

        let mut sequence_guard = self.sequence.lock().expect("sequence mutex poisoned");
        let mut prev_guard = self.prev_signature.lock().expect("prev-signature mutex poisoned");

        let mut entry = AuditEntry {
            sequence: *sequence_guard,
            timestamp: Utc::now().to_rfc3339(),
            rule_id: rule_id.to_string(),
            decision: decision.to_string(),
            tool: tool.map(str::to_string),
            arguments: arguments.map(redact_arguments),
            reason: reason.map(str::to_string),
            prev_signature: prev_guard.clone(),
            signature: String::new(),
        };

        let sign = |e: &AuditEntry| -> Result<String, AuditError> {
            match &self.signing_key {
                Some(key) => compute_signature(key, e),
                None => Ok(String::new()),
            }
        };
        entry.signature = sign(&entry)?;
        let mut line = serde_json::to_string(&entry)?;

        let mut writer = writer_lock.lock().expect("audit writer mutex poisoned");
        if self.max_bytes > 0 && writer.bytes_written + line.len() as u64 + 1 > self.max_bytes {
            rotate(&mut writer, self.max_files)?;
            // The rotated-out file ends its own chain; the entry that
            // triggered rotation opens a fresh genesis-rooted one in the
            // new active file, matching `verify_chain`'s expectation that
            // every file it walks starts at sequence 1 / `GENESIS`.
            entry.sequence = 1;
            entry.prev_signature = GENESIS.to_string();
            entry.signature = sign(&entry)?;
            line = serde_json::to_string(&entry)?;
        }
        writer
            .file
            .write_all(line.as_bytes())
            .and_then(|_| writer.file.write_all(b"\n"))
            .map_err(|source| AuditError::Io { path: writer.path.clone(), source })?;
        writer.bytes_written += line.len() as u64 + 1;

        *sequence_guard = entry.sequence + 1;
        *prev_guard = entry.signature;
        Ok(())
    }
}

/// Rotate `<path>` to `<path>.1`, shifting existing `<path>.k -> <path>.(k+1)`
/// for `k = max_files-1 .. 1` after deleting `<path>.<max_files>` (spec
/// §4.8) — `max_files == 0` means unbounded retention, so the delete step
/// and the shift's upper bound are both skipped. Reopens a fresh empty
/// file at `<path>` afterward.
fn rotate(writer: &mut Writer, max_files: u32) -> Result<(), AuditError> {
    let path = writer.path.clone();

    if max_files > 0 {
        let oldest = path_with_suffix(&path, max_files);
        if oldest.exists() {
            fs::remove_file(&oldest).map_err(|source| AuditError::Io { path: oldest, source })?;
        }
        for k in (1..max_files).rev() {
            let from = path_with_suffix(&path, k);
            if from.exists() {
                fs::rename(&from, path_with_suffix(&path, k + 1)).map_err(|source| AuditError::Io { path: from, source })?;
            }
        }
    } else {
        let mut highest = 1;
        while path_with_suffix(&path, highest).exists() {
            highest += 1;
        }
        for k in (1..highest).rev() {
            let from = path_with_suffix(&path, k);
            fs::rename(&from, path_with_suffix(&path, k + 1)).map_err(|source| AuditError::Io { path: from, source })?;
        }
    }

    fs::rename(&path, path_with_suffix(&path, 1)).map_err(|source| AuditError::Io { path: path.clone(), source })?;

    let fresh = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|source| AuditError::Io { path: path.clone(), source })?;
    writer.file = fresh;
    writer.bytes_written = 0;
    Ok(())
}

fn path_with_suffix(path: &Path, n: u32) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(format!(".{n}"));
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader};

    fn read_lines(path: &Path) -> Vec<String> {
        BufReader::new(File::open(path).unwrap()).lines().map(|l| l.unwrap()).collect()
    }

    #[test]
    fn no_path_is_a_silent_no_op() {
        let log = AuditLog::new(None, None);
        assert!(log.log("policy:x", "allow", Some("read_file"), None, None).is_ok());
    }

    #[test]
    fn writes_one_json_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), None);
        log.log("policy:a", "allow", Some("read_file"), None, None).unwrap();
        log.log("policy:b", "deny", Some("write_file"), None, Some("blocked")).unwrap();
        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        let first: AuditEntry = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.prev_signature, GENESIS);
    }

    #[test]
    fn redacts_sensitive_argument_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), None);
        log.log(
            "policy:a",
            "allow",
            Some("call_api"),
            Some(&json!({"api_key": "sk-verysecret", "note": "fine"})),
            None,
        )
        .unwrap();
        let entry: AuditEntry = serde_json::from_str(&read_lines(&path)[0]).unwrap();
        let args = entry.arguments.unwrap();
        assert_eq!(args["api_key"], "[REDACTED]");
        assert_eq!(args["note"], "fine");
    }

    #[test]
    fn signature_chain_links_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), Some(b"sekrit".to_vec()));
        log.log("a", "allow", None, None, None).unwrap();
        log.log("b", "allow", None, None, None).unwrap();
        let lines = read_lines(&path);
        let first: AuditEntry = serde_json::from_str(&lines[0]).unwrap();
        let second: AuditEntry = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(first.prev_signature, GENESIS);
        assert_eq!(second.prev_signature, first.signature);
        assert_ne!(first.signature, second.signature);
    }

    #[test]
    fn rotates_when_over_size_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), None).with_max_bytes(10);
        log.log("a", "allow", None, None, None).unwrap();
        log.log("b", "allow", None, None, None).unwrap();
        assert!(dir.path().join("audit.log.1").exists());
    }

    #[test]
    fn rotation_resets_sequence_and_prev_signature() {
        // Every call here is big enough to rotate immediately (10-byte
        // threshold), so after three calls the active file holds only
        // the third entry. Without resetting the counters on rotation it
        // would carry `sequence: 3` and the second entry's signature as
        // `prev_signature` instead of starting a fresh chain.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), Some(b"sekrit".to_vec())).with_max_bytes(10);
        log.log("a", "allow", None, None, None).unwrap();
        log.log("b", "allow", None, None, None).unwrap();
        log.log("c", "allow", None, None, None).unwrap();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        let active: AuditEntry = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(active.sequence, 1);
        assert_eq!(active.prev_signature, GENESIS);
    }

    #[test]
    fn max_files_caps_retained_generations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), None).with_max_bytes(10).with_max_files(2);

        // Each call writes one line over the 10-byte threshold, so every
        // call after the first rotates.
        for i in 0..6 {
            log.log(&format!("rule-{i}"), "allow", None, None, None).unwrap();
        }

        assert!(dir.path().join("audit.log.1").exists());
        assert!(dir.path().join("audit.log.2").exists());
        assert!(!dir.path().join("audit.log.3").exists());
    }
}
