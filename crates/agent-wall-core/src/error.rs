//! Error kinds for the proxy engine and its modules (spec §7).
//!
//! Most checks in this crate never fail outright — a security module that
//! cannot reach a verdict returns a deny, it does not return `Err`. The
//! variants here cover the places where failure really is exceptional:
//! buffer limits, malformed wire input, and child-process lifecycle.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while accumulating and framing byte-stream input.
#[derive(Debug, Error)]
pub enum FrameError {
    /// More bytes were appended than the configured cap allows. The buffer
    /// has already been cleared by the time this is returned.
    #[error("frame buffer overflow: {pending} pending bytes exceeds cap of {cap}")]
    BufferOverflow {
        /// Bytes that would have been buffered had the cap not applied.
        pending: usize,
        /// The configured cap.
        cap: usize,
    },

    /// A line was received that is not valid JSON, or not a valid JSON-RPC
    /// message shape.
    #[error("invalid message on line: {reason}")]
    InvalidMessage {
        /// Human-readable parse/schema failure reason.
        reason: String,
    },
}

/// Errors raised by the proxy engine's process and pipeline lifecycle.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The child process could not be spawned.
    #[error("failed to spawn child process {command:?}: {source}")]
    ChildSpawnFailure {
        /// The command that was attempted.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while reading from or writing to the client or child.
    #[error("proxy I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the audit log's file I/O and rotation machinery.
///
/// Per spec §7, audit I/O errors are best-effort and never fatal to the
/// proxy; this type exists so callers that *do* want to observe them (tests,
/// diagnostics) can, while the engine itself only logs and continues.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Could not open or write the audit log file.
    #[error("audit log I/O error at {path:?}: {source}")]
    Io {
        /// Path the log writer was operating on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The entry could not be serialized to canonical JSON.
    #[error("audit entry serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A regex pattern was rejected during scanner/detector compilation.
///
/// Non-fatal: recorded in a per-scanner list (spec §4.3 `PatternRejected`),
/// scanning continues with the remaining patterns.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternRejected {
    /// Pattern text exceeded the configured length cap.
    #[error("pattern {name:?} rejected: length {len} exceeds cap {cap}")]
    TooLong {
        /// The pattern's name/identifier.
        name: String,
        /// Actual length.
        len: usize,
        /// Configured cap.
        cap: usize,
    },

    /// Pattern shape matched a known ReDoS-prone construction.
    #[error("pattern {name:?} rejected: ReDoS-prone shape ({shape})")]
    RedosShape {
        /// The pattern's name/identifier.
        name: String,
        /// Which blacklisted shape matched.
        shape: &'static str,
    },

    /// Pattern failed to compile as a regex.
    #[error("pattern {name:?} rejected: failed to compile: {detail}")]
    CompileError {
        /// The pattern's name/identifier.
        name: String,
        /// The underlying regex compiler error, stringified.
        detail: String,
    },
}
