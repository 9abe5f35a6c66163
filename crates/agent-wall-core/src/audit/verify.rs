//! Audit-chain verification: detects alteration or removal of past
//! entries.
//!
//! Walks a single audit log file in order, recomputing each entry's
//! signature from its own fields plus the previous entry's signature, and
//! compares it against what was written. A rotated log (`audit.log.1`,
//! `audit.log.2`, ...) verifies as a sequence of independent files, each
//! with its own genesis — rotation intentionally starts a fresh chain
//! rather than carrying `prev_signature` across the rotation boundary, so
//! verifying the active file never depends on retaining every historical
//! rotation.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::AuditError;

use super::log::{compute_signature, AuditEntry, GENESIS};

/// One point where the chain failed to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyFailure {
    /// Line number (1-based) where the failure was detected.
    pub line: usize,
    /// Human-readable reason.
    pub reason: String,
}

/// The result of verifying one audit log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of entries successfully verified before any failure.
    pub entries_checked: usize,
    /// Every failure found. Empty means the chain verified cleanly.
    pub failures: Vec<VerifyFailure>,
}

impl VerifyReport {
    /// True if no failures were found.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Verify the HMAC chain of the audit log at `path` using `key`.
pub fn verify_chain(path: &Path, key: &[u8]) -> Result<VerifyReport, AuditError> {
    let file = File::open(path).map_err(|source| AuditError::Io { path: path.to_path_buf(), source })?;
    let mut prev_signature = GENESIS.to_string();
    let mut entries_checked = 0usize;
    let mut failures = Vec::new();
    let mut expected_sequence = 1u64;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|source| AuditError::Io { path: path.to_path_buf(), source })?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: AuditEntry = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(e) => {
                failures.push(VerifyFailure { line: line_no, reason: format!("invalid JSON: {e}") });
                break;
            }
        };

        if entry.sequence != expected_sequence {
            failures.push(VerifyFailure {
                line: line_no,
                reason: format!("sequence gap: expected {expected_sequence}, found {}", entry.sequence),
            });
            break;
        }

        if entry.prev_signature != prev_signature {
            failures.push(VerifyFailure {
                line: line_no,
                reason: "prev_signature does not match the preceding entry's signature".to_string(),
            });
            break;
        }

        let expected_signature = compute_signature(key, &entry)?;
        if entry.signature != expected_signature {
            failures.push(VerifyFailure {
                line: line_no,
                reason: "signature does not match recomputed HMAC".to_string(),
            });
            break;
        }

        prev_signature = entry.signature.clone();
        expected_sequence += 1;
        entries_checked += 1;
    }

    Ok(VerifyReport { entries_checked, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::log::AuditLog;

    #[test]
    fn verifies_an_untampered_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), Some(b"sekrit".to_vec()));
        log.log("a", "allow", None, None, None).unwrap();
        log.log("b", "deny", None, None, None).unwrap();
        log.log("c", "allow", None, None, None).unwrap();

        let report = verify_chain(&path, b"sekrit").unwrap();
        assert!(report.is_valid());
        assert_eq!(report.entries_checked, 3);
    }

    #[test]
    fn detects_a_tampered_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), Some(b"sekrit".to_vec()));
        log.log("a", "allow", None, None, None).unwrap();
        log.log("b", "deny", None, None, None).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let tampered = contents.replacen("\"deny\"", "\"allow\"", 1);
        std::fs::write(&path, tampered).unwrap();

        let report = verify_chain(&path, b"sekrit").unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.entries_checked, 1);
    }

    #[test]
    fn active_file_verifies_cleanly_after_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), Some(b"sekrit".to_vec())).with_max_bytes(10);
        log.log("a", "allow", None, None, None).unwrap();
        log.log("b", "deny", None, None, None).unwrap();
        log.log("c", "allow", None, None, None).unwrap();

        assert!(dir.path().join("audit.log.1").exists());

        // The entry that triggered rotation reopens the active file as
        // its own genesis-rooted chain, not a continuation of the
        // rotated-out one.
        let report = verify_chain(&path, b"sekrit").unwrap();
        assert!(report.is_valid(), "{:?}", report.failures);
    }

    #[test]
    fn detects_wrong_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let log = AuditLog::new(Some(&path), Some(b"sekrit".to_vec()));
        log.log("a", "allow", None, None, None).unwrap();

        let report = verify_chain(&path, b"wrong-key").unwrap();
        assert!(!report.is_valid());
    }
}
