//! The proxy pipeline: spawns the child tool server, runs every request
//! through the security pipeline, and scans every tracked response.

pub mod approval;
pub mod engine;
pub mod events;
pub mod pending;

pub use approval::{ApprovalHandler, ApprovalOutcome};
pub use engine::{Pipeline, ProxyEngine, ShutdownTimings};
pub use events::{EventSink, FileEventSink, NullEventSink, ProxyEvent};
