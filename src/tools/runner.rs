//! Shell command execution for the `run_command` tool.
//!
//! Commands run through `sh -c` in a fresh, non-interactive subprocess with
//! stdin closed. Captured output is bounded per stream.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

/// Max bytes kept from each of stdout and stderr.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    /// Text handed back to the model as the tool result.
    pub fn render(&self) -> String {
        let code = self
            .exit_code
            .map_or_else(|| "terminated by signal".to_string(), |c| c.to_string());
        format!(
            "exit code: {}\nstdout:\n{}\nstderr:\n{}",
            code,
            self.stdout.trim_end(),
            self.stderr.trim_end()
        )
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> std::io::Result<CommandOutput>;
}

#[derive(Clone, Debug)]
pub struct ShellRunner {
    shell: String,
    max_output_bytes: usize,
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_output_bytes(mut self, max_output_bytes: usize) -> Self {
        self.max_output_bytes = max_output_bytes;
        self
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> std::io::Result<CommandOutput> {
        debug!(command = %command, "Executing shell command");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        let max = self.max_output_bytes;
        Ok(CommandOutput {
            stdout: truncate_bytes_utf8(&String::from_utf8_lossy(&output.stdout), max),
            stderr: truncate_bytes_utf8(&String::from_utf8_lossy(&output.stderr), max),
            exit_code: output.status.code(),
        })
    }
}

/// Cut `s` to at most `max_bytes` on a char boundary, marking the cut.
pub(crate) fn truncate_bytes_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let mut cut = 0usize;
    for (idx, _) in s.char_indices() {
        if idx > max_bytes {
            break;
        }
        cut = idx;
    }
    let mut out = s[..cut].to_string();
    out.push_str("\n...(truncated)...\n");
    out
}
