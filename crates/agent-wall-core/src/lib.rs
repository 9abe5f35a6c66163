//! Agent Wall's proxy engine: a security firewall that sits between an
//! AI-agent client and a spawned tool-server process, speaking the same
//! newline-delimited JSON-RPC 2.0 framing both ends already use.
//!
//! Every `tools/call` request is run through a defense-in-depth pipeline
//! — kill switch, prompt-injection detection, egress control, the policy
//! engine, and tool-chain detection, in that order — before being
//! forwarded; every response to a tracked call is scanned for secrets,
//! PII, and size abuse before being returned to the client. See
//! [`proxy::Pipeline`] for the full evaluation order and
//! [`proxy::ProxyEngine`] for the process-lifecycle plumbing around it.
//!
//! Grounded throughout on the teacher's `mcp` module tree (the same
//! spawn-pipe-and-forward shape, generalized from one policy check into
//! the full pipeline below); see `DESIGN.md` for the module-by-module
//! ledger.

pub mod audit;
pub mod chain;
pub mod config;
pub mod dashboard;
pub mod egress;
pub mod error;
pub mod frame;
pub mod injection;
pub mod kill_switch;
pub mod message;
pub mod policy;
pub mod proxy;
pub mod redos;
pub mod scanner;

pub use audit::AuditLog;
pub use config::PolicyConfig;
pub use error::{AuditError, FrameError, PatternRejected, ProxyError};
pub use message::Message;
pub use proxy::{ApprovalHandler, Pipeline, ProxyEngine};
