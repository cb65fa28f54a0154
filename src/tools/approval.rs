//! Approval gate in front of tool execution.
//!
//! Every tool call passes through a [`ToolApprover`] before it runs. A denied
//! call is not an error: the denial reason becomes the tool result so the
//! model can continue without it.

use std::io::{self, BufRead, Write};

use serde_json::Value;

/// Tool result reported to the model when the user refuses a call.
pub const USER_CANCELLED: &str = "User cancelled.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    Execute,
    Deny { reason: String },
}

pub trait ToolApprover: Send + Sync {
    fn review(&self, tool: &str, arguments: &Value) -> ApprovalDecision;
}

/// Approves everything (`--yes`, or `confirm_tools: false`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ToolApprover for AutoApprove {
    fn review(&self, _tool: &str, _arguments: &Value) -> ApprovalDecision {
        ApprovalDecision::Execute
    }
}

/// Asks on the terminal: question on stderr, answer from stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptApprover;

impl ToolApprover for PromptApprover {
    fn review(&self, tool: &str, arguments: &Value) -> ApprovalDecision {
        let mut stderr = io::stderr().lock();
        if write!(stderr, "Use tool {tool} with arguments {arguments}? (y/n): ").is_err()
            || stderr.flush().is_err()
        {
            return deny();
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) if is_yes(&answer) => ApprovalDecision::Execute,
            _ => deny(),
        }
    }
}

fn deny() -> ApprovalDecision {
    ApprovalDecision::Deny {
        reason: USER_CANCELLED.to_string(),
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
