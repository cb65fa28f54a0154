//! Tools the model may call during a completion.
//!
//! - `run_command`: run a shell command through a [`CommandRunner`]
//! - `read_file`: read a local text file
//!
//! Execution never fails the pipeline. Bad arguments, unknown tools, refused
//! approvals and I/O errors are all reported back to the model as the tool
//! result text.

mod approval;
mod runner;

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::ai::conversation::ToolCallRequest;

pub use approval::{ApprovalDecision, AutoApprove, PromptApprover, ToolApprover, USER_CANCELLED};
pub use runner::{CommandOutput, CommandRunner, MAX_OUTPUT_BYTES, ShellRunner};

pub const TOOL_RUN_COMMAND: &str = "run_command";
pub const TOOL_READ_FILE: &str = "read_file";

/// A tool declaration sent to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// One executed tool call and what it returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub arguments: String,
    pub output: String,
}

#[derive(Debug, Deserialize)]
struct RunCommandArgs {
    command: String,
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    file_path: String,
}

pub struct ToolSet {
    runner: Box<dyn CommandRunner>,
    approver: Box<dyn ToolApprover>,
}

impl ToolSet {
    pub fn new(
        runner: impl CommandRunner + 'static,
        approver: impl ToolApprover + 'static,
    ) -> Self {
        Self {
            runner: Box::new(runner),
            approver: Box::new(approver),
        }
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: TOOL_RUN_COMMAND.to_string(),
                description: "Run a shell command on the user's machine and return its exit code, \
                              stdout and stderr."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "The command to execute"
                        }
                    },
                    "required": ["command"],
                    "additionalProperties": false
                }),
            },
            ToolDefinition {
                name: TOOL_READ_FILE.to_string(),
                description: "Read a text file on the user's machine and return its contents."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "The path to the file to read"
                        }
                    },
                    "required": ["file_path"],
                    "additionalProperties": false
                }),
            },
        ]
    }

    /// Execute one requested call and capture its result text.
    pub async fn execute(&self, call: &ToolCallRequest) -> ToolInvocation {
        let output = self.output_for(call).await;
        debug!(tool = %call.name, bytes = output.len(), "Tool finished");
        ToolInvocation {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            output,
        }
    }

    async fn output_for(&self, call: &ToolCallRequest) -> String {
        if call.name != TOOL_RUN_COMMAND && call.name != TOOL_READ_FILE {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return format!("Unknown tool: {}", call.name);
        }

        let raw = if call.arguments.trim().is_empty() {
            "{}"
        } else {
            call.arguments.as_str()
        };
        let arguments: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => return format!("Invalid arguments for {}: {}", call.name, e),
        };

        if let ApprovalDecision::Deny { reason } = self.approver.review(&call.name, &arguments) {
            debug!(tool = %call.name, "Tool call denied");
            return reason;
        }

        if call.name == TOOL_RUN_COMMAND {
            match serde_json::from_value::<RunCommandArgs>(arguments) {
                Ok(args) => self.run_command(&args.command).await,
                Err(e) => format!("Invalid arguments for {}: {}", call.name, e),
            }
        } else {
            match serde_json::from_value::<ReadFileArgs>(arguments) {
                Ok(args) => read_file(&args.file_path).await,
                Err(e) => format!("Invalid arguments for {}: {}", call.name, e),
            }
        }
    }

    async fn run_command(&self, command: &str) -> String {
        match self.runner.run(command).await {
            Ok(output) => output.render(),
            Err(e) => format!("Failed to run command '{command}': {e}"),
        }
    }
}

async fn read_file(file_path: &str) -> String {
    match tokio::fs::read(file_path).await {
        Ok(bytes) => {
            runner::truncate_bytes_utf8(&String::from_utf8_lossy(&bytes), MAX_OUTPUT_BYTES)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => format!("File not found: {file_path}"),
        Err(e) => format!("Error reading file {file_path}: {e}"),
    }
}
