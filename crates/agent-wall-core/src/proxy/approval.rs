//! Human-approval escalation for `prompt` policy verdicts (spec §4.9 step
//! 8, §7 `ApprovalFailure`).
//!
//! The terminal approval UI itself is an external collaborator (spec §1
//! Out of scope); this module only defines the seam the proxy pipeline
//! calls through. Absent a handler, every `prompt` verdict is treated as
//! a deny with an explanatory suffix, matching spec §7: "Unprompted
//! aborts (prompt-handler absent or throws) appear as denies with an
//! added parenthetical explaining why."

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;

/// Something that can escalate a `tools/call` to a human and return
/// whether it was approved. Implementations may block the calling thread
/// (spec §5: the approval callback is one of the few operations allowed
/// to suspend).
pub trait ApprovalHandler: Send + Sync {
    /// Ask whether `tool(arguments)` should proceed, given `reason` (the
    /// policy rule's message). Returns `true` to allow, `false` to deny.
    fn approve(&self, tool: &str, arguments: &Value, reason: &str) -> bool;
}

/// The outcome of escalating one call, already folded into the
/// deny-by-default rule from spec §7.
pub enum ApprovalOutcome {
    /// The handler approved the call.
    Approved,
    /// The handler denied it, or none was configured, or it panicked.
    Denied {
        /// Explanation appended to the synthesized denial message.
        detail: &'static str,
    },
}

/// Run `handler` (if any) against one call, never letting a panicking
/// handler escape — spec §7 `ApprovalFailure`: "exceptions inside the
/// human-approval callback are recovered as deny".
pub fn resolve(
    handler: Option<&dyn ApprovalHandler>,
    tool: &str,
    arguments: &Value,
    reason: &str,
) -> ApprovalOutcome {
    let Some(handler) = handler else {
        return ApprovalOutcome::Denied { detail: "no prompt handler" };
    };

    let result = catch_unwind(AssertUnwindSafe(|| handler.approve(tool, arguments, reason)));
    match result {
        Ok(true) => ApprovalOutcome::Approved,
        Ok(false) => ApprovalOutcome::Denied { detail: "denied by approval handler" },
        Err(_) => ApprovalOutcome::Denied { detail: "approval handler panicked" },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AlwaysApprove;
    impl ApprovalHandler for AlwaysApprove {
        fn approve(&self, _tool: &str, _arguments: &Value, _reason: &str) -> bool {
            true
        }
    }

    struct AlwaysDeny;
    impl ApprovalHandler for AlwaysDeny {
        fn approve(&self, _tool: &str, _arguments: &Value, _reason: &str) -> bool {
            false
        }
    }

    struct Panics;
    impl ApprovalHandler for Panics {
        fn approve(&self, _tool: &str, _arguments: &Value, _reason: &str) -> bool {
            panic!("boom");
        }
    }

    #[test]
    fn missing_handler_auto_denies() {
        assert!(matches!(
            resolve(None, "t", &json!({}), "r"),
            ApprovalOutcome::Denied { detail: "no prompt handler" }
        ));
    }

    #[test]
    fn approving_handler_allows() {
        assert!(matches!(resolve(Some(&AlwaysApprove), "t", &json!({}), "r"), ApprovalOutcome::Approved));
    }

    #[test]
    fn denying_handler_denies() {
        assert!(matches!(resolve(Some(&AlwaysDeny), "t", &json!({}), "r"), ApprovalOutcome::Denied { .. }));
    }

    #[test]
    fn panicking_handler_is_recovered_as_deny() {
        let prev = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        let outcome = resolve(Some(&Panics), "t", &json!({}), "r");
        std::panic::set_hook(prev);
        assert!(matches!(outcome, ApprovalOutcome::Denied { detail: "approval handler panicked" }));
    }
}
