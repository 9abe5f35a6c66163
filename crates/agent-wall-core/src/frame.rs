//! Newline-framed JSON-RPC stream parser.
//!
//! Accumulates bytes appended incrementally off a pipe, up to a size cap,
//! and extracts complete newline-delimited messages as they become
//! available: a thin owning struct around a growable buffer rather than a
//! generic streaming-parser abstraction.

use serde_json::Value;

use crate::error::FrameError;
use crate::message::Message;

/// Default maximum number of bytes buffered before `append` fails.
pub const DEFAULT_MAX_BUFFERED_BYTES: usize = 10 * 1024 * 1024;

/// Accumulates raw byte chunks and extracts complete newline-delimited
/// JSON-RPC messages, enforcing a maximum buffered size.
pub struct FrameParser {
    buffer: Vec<u8>,
    max_buffered_bytes: usize,
}

impl FrameParser {
    /// Create a parser with the default 10 MiB cap.
    pub fn new() -> Self {
        Self::with_cap(DEFAULT_MAX_BUFFERED_BYTES)
    }

    /// Create a parser with an explicit cap, in bytes.
    pub fn with_cap(max_buffered_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffered_bytes,
        }
    }

    /// Append raw bytes to the internal buffer.
    ///
    /// Fails with [`FrameError::BufferOverflow`] if the total pending byte
    /// count (UTF-8 byte length, never code points) would exceed the cap.
    /// On failure the buffer is cleared: a client that floods the proxy
    /// with an oversized message loses only that message, not subsequent
    /// ones hiding behind a poisoned partial buffer.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        let pending = self.buffer.len() + bytes.len();
        if pending > self.max_buffered_bytes {
            self.buffer.clear();
            return Err(FrameError::BufferOverflow {
                pending,
                cap: self.max_buffered_bytes,
            });
        }
        self.buffer.extend_from_slice(bytes);
        Ok(())
    }

    /// Extract and parse the next complete message, if one is buffered.
    ///
    /// Scans for `\n`; the line is everything before it, with a trailing
    /// `\r` stripped (CRLF tolerance); empty lines are skipped without
    /// consuming a "no message" result — the scan continues past them.
    /// A line that fails to parse as JSON or doesn't match the JSON-RPC
    /// variant schema yields `Err(InvalidMessage)`, but its bytes are
    /// still consumed, so the stream is not stuck: the line is dropped and
    /// the next call resumes on the following one.
    pub fn read_message(&mut self) -> Result<Option<Message>, FrameError> {
        self.read_raw_message().map(|opt| opt.map(|(_, msg)| msg))
    }

    /// Like [`FrameParser::read_message`], but also returns the raw line
    /// bytes (newline and any CR stripped) the message was parsed from —
    /// used by the proxy engine to forward a call's exact original bytes
    /// when the pipeline allows it, rather than a re-serialized copy.
    pub fn read_raw_message(&mut self) -> Result<Option<(Vec<u8>, Message)>, FrameError> {
        loop {
            let newline_pos = match self.buffer.iter().position(|&b| b == b'\n') {
                Some(pos) => pos,
                None => return Ok(None),
            };

            let mut line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            line.pop(); // remove '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if line.is_empty() {
                continue;
            }

            let text = match std::str::from_utf8(&line) {
                Ok(t) => t,
                Err(e) => {
                    return Err(FrameError::InvalidMessage {
                        reason: format!("invalid UTF-8: {e}"),
                    })
                }
            };

            let value: Value = match serde_json::from_str(text) {
                Ok(v) => v,
                Err(e) => {
                    return Err(FrameError::InvalidMessage {
                        reason: format!("invalid JSON: {e}"),
                    })
                }
            };

            return match Message::from_value(value) {
                Ok(msg) => Ok(Some((line, msg))),
                Err(e) => Err(e),
            };
        }
    }

    /// Drain every complete message currently buffered, in arrival order.
    /// Each element is the result of parsing one line; parse failures do
    /// not stop the drain.
    pub fn read_all(&mut self) -> Vec<Result<Message, FrameError>> {
        let mut out = Vec::new();
        loop {
            match self.read_message() {
                Ok(Some(msg)) => out.push(Ok(msg)),
                Ok(None) => break,
                Err(e) => out.push(Err(e)),
            }
        }
        out
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of bytes currently buffered (UTF-8 byte length).
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(s: &str) -> Vec<u8> {
        format!("{s}\n").into_bytes()
    }

    #[test]
    fn parses_single_message() {
        let mut p = FrameParser::new();
        p.append(&line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"x"}}"#))
            .unwrap();
        let msg = p.read_message().unwrap().unwrap();
        assert!(msg.is_tool_call());
        assert!(p.read_message().unwrap().is_none());
    }

    #[test]
    fn handles_split_message_across_chunks() {
        let mut p = FrameParser::new();
        let whole = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;
        let (a, b) = whole.split_at(10);
        p.append(a.as_bytes()).unwrap();
        assert!(p.read_message().unwrap().is_none());
        p.append(b.as_bytes()).unwrap();
        p.append(b"\n").unwrap();
        assert!(p.read_message().unwrap().is_some());
    }

    #[test]
    fn handles_crlf() {
        let mut p = FrameParser::new();
        p.append(b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\r\n").unwrap();
        assert!(p.read_message().unwrap().is_some());
    }

    #[test]
    fn skips_empty_lines() {
        let mut p = FrameParser::new();
        p.append(b"\n\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n\n").unwrap();
        let msgs = p.read_all();
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].is_ok());
    }

    #[test]
    fn reports_overflow_and_clears_buffer() {
        let mut p = FrameParser::with_cap(8);
        let err = p.append(b"0123456789").unwrap_err();
        assert!(matches!(err, FrameError::BufferOverflow { .. }));
        assert_eq!(p.pending_bytes(), 0);
    }

    #[test]
    fn invalid_json_drops_line_but_continues_stream() {
        let mut p = FrameParser::new();
        p.append(b"not json\n{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n")
            .unwrap();
        let results = p.read_all();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn byte_length_accounting_not_codepoints() {
        // "é" is 2 bytes in UTF-8 but 1 code point.
        let mut p = FrameParser::with_cap(3);
        assert!(p.append("é".as_bytes()).is_ok());
        assert_eq!(p.pending_bytes(), 2);
        assert!(p.append("é".as_bytes()).is_err());
    }
}
