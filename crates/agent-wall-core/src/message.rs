//! JSON-RPC message model (spec §3, §4.1 edge cases, §6 error codes).
//!
//! A `Message` is a tagged variant over the three JSON-RPC 2.0 shapes this
//! protocol uses: request, notification, response. Parsing is strict about
//! the *shape* (a response must carry `result` xor `error`, a request/
//! notification must carry `method`) but permissive about `params`/
//! `arguments`, which are explicitly "semantically opaque" per spec §3.
//!
//! Grounded on the teacher's `mcp::jsonrpc` module (`JsonRpcRequest`,
//! `CallToolParams`, `error_codes`), generalized to a full tagged-variant
//! model covering responses and notifications, which the teacher's
//! evaluation-framework use case never needed to parse.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FrameError;

/// A JSON-RPC request/response identifier: a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Integer identifier.
    Number(i64),
    /// String identifier.
    Text(String),
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Number(n) => write!(f, "{n}"),
            Identifier::Text(s) => write!(f, "{s}"),
        }
    }
}

/// JSON-RPC 2.0 error codes synthesized by this crate (spec §6).
pub mod error_codes {
    /// Policy or response-scanner denial.
    pub const POLICY_OR_SCANNER_DENIAL: i64 = -32001;
    /// Awaiting human approval.
    pub const AWAITING_APPROVAL: i64 = -32002;
}

/// A tagged JSON-RPC message. Immutable once parsed.
#[derive(Debug, Clone)]
pub enum Message {
    /// A request expecting a response.
    Request {
        /// Request identifier.
        id: Identifier,
        /// Method name.
        method: String,
        /// Optional parameters, opaque beyond `tools/call` extraction.
        params: Value,
    },
    /// A notification: no identifier, no response expected.
    Notification {
        /// Method name.
        method: String,
        /// Optional parameters.
        params: Value,
    },
    /// A response to a previously sent request.
    Response {
        /// The identifier of the request this responds to.
        id: Identifier,
        /// Either a success payload or an error payload.
        payload: ResponsePayload,
    },
}

/// The two shapes a JSON-RPC response can take.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// A successful result.
    Result(Value),
    /// An error.
    Error {
        /// Numeric error code.
        code: i64,
        /// Human-readable message.
        message: String,
        /// Optional structured detail.
        data: Option<Value>,
    },
}

/// `tools/call` request parameters (spec §3: `{name, arguments}`).
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    /// The tool name.
    pub name: String,
    /// Arguments, semantically opaque beyond their string leaves.
    #[serde(default)]
    pub arguments: Value,
}

const METHOD_TOOLS_CALL: &str = "tools/call";

impl Message {
    /// Parse a single JSON-RPC message from an already-JSON-decoded value.
    ///
    /// Validates the variant shape: a `method` field means request (with
    /// `id`) or notification (without); otherwise `result` xor `error`
    /// means response. Anything else is `InvalidMessage`.
    pub fn from_value(v: Value) -> Result<Self, FrameError> {
        let obj = v.as_object().ok_or_else(|| FrameError::InvalidMessage {
            reason: "top-level JSON value is not an object".to_string(),
        })?;

        if let Some(method) = obj.get("method").and_then(Value::as_str) {
            let params = obj.get("params").cloned().unwrap_or(Value::Null);
            return Ok(match obj.get("id") {
                Some(id_val) if !id_val.is_null() => Message::Request {
                    id: parse_identifier(id_val)?,
                    method: method.to_string(),
                    params,
                },
                _ => Message::Notification {
                    method: method.to_string(),
                    params,
                },
            });
        }

        let id_val = obj.get("id").ok_or_else(|| FrameError::InvalidMessage {
            reason: "response missing id".to_string(),
        })?;
        let id = parse_identifier(id_val)?;

        let has_result = obj.contains_key("result");
        let has_error = obj.contains_key("error");
        match (has_result, has_error) {
            (true, false) => Ok(Message::Response {
                id,
                payload: ResponsePayload::Result(obj.get("result").cloned().unwrap_or(Value::Null)),
            }),
            (false, true) => {
                let err = obj.get("error").cloned().unwrap_or(Value::Null);
                let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = err
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                let data = err.get("data").cloned();
                Ok(Message::Response {
                    id,
                    payload: ResponsePayload::Error { code, message, data },
                })
            }
            _ => Err(FrameError::InvalidMessage {
                reason: "response must carry exactly one of result/error".to_string(),
            }),
        }
    }

    /// True if this is a `tools/call` request (not a notification of the
    /// same method name — the pipeline only ever intercepts requests that
    /// expect a response).
    pub fn is_tool_call(&self) -> bool {
        matches!(self, Message::Request { method, .. } if method == METHOD_TOOLS_CALL)
    }

    /// Extract `{name, arguments}` from a `tools/call` request's params.
    pub fn tool_call_params(&self) -> Option<CallToolParams> {
        match self {
            Message::Request { method, params, .. } if method == METHOD_TOOLS_CALL => {
                serde_json::from_value(params.clone()).ok()
            }
            _ => None,
        }
    }

    /// The request identifier, if this message carries one.
    pub fn id(&self) -> Option<&Identifier> {
        match self {
            Message::Request { id, .. } | Message::Response { id, .. } => Some(id),
            Message::Notification { .. } => None,
        }
    }
}

fn parse_identifier(v: &Value) -> Result<Identifier, FrameError> {
    if let Some(n) = v.as_i64() {
        return Ok(Identifier::Number(n));
    }
    if let Some(s) = v.as_str() {
        return Ok(Identifier::Text(s.to_string()));
    }
    Err(FrameError::InvalidMessage {
        reason: "id must be a string or integer".to_string(),
    })
}

/// Build a synthesized JSON-RPC error response line (without trailing
/// newline; the frame writer appends it).
///
/// `message` is expected to already carry the `"Agent Wall: "` prefix
/// (spec §6) where the caller is synthesizing a user-visible denial.
pub fn error_response(id: Identifier, code: i64, message: &str) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": match id {
            Identifier::Number(n) => Value::from(n),
            Identifier::Text(s) => Value::from(s),
        },
        "error": {
            "code": code,
            "message": message,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_call_request() {
        let v = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "read_file", "arguments": {"path": "a.txt"}}
        });
        let msg = Message::from_value(v).unwrap();
        assert!(msg.is_tool_call());
        let params = msg.tool_call_params().unwrap();
        assert_eq!(params.name, "read_file");
        assert_eq!(params.arguments["path"], "a.txt");
    }

    #[test]
    fn parses_notification_without_id() {
        let v = serde_json::json!({"jsonrpc": "2.0", "method": "notifications/progress"});
        let msg = Message::from_value(v).unwrap();
        assert!(matches!(msg, Message::Notification { .. }));
        assert!(msg.id().is_none());
    }

    #[test]
    fn parses_success_and_error_response() {
        let ok = Message::from_value(serde_json::json!({"jsonrpc":"2.0","id":1,"result":{"ok":true}}))
            .unwrap();
        assert!(matches!(
            ok,
            Message::Response { payload: ResponsePayload::Result(_), .. }
        ));

        let err = Message::from_value(
            serde_json::json!({"jsonrpc":"2.0","id":2,"error":{"code":-1,"message":"boom"}}),
        )
        .unwrap();
        assert!(matches!(
            err,
            Message::Response { payload: ResponsePayload::Error { .. }, .. }
        ));
    }

    #[test]
    fn rejects_response_with_both_result_and_error() {
        let v = serde_json::json!({"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"x"}});
        assert!(Message::from_value(v).is_err());
    }

    #[test]
    fn rejects_non_object_top_level() {
        let v = serde_json::json!([1, 2, 3]);
        assert!(Message::from_value(v).is_err());
    }

    #[test]
    fn string_identifier_round_trips_in_error_response() {
        let resp = error_response(Identifier::Text("abc".into()), -32001, "Agent Wall: denied");
        assert_eq!(resp["id"], "abc");
        assert_eq!(resp["error"]["code"], -32001);
    }
}
