//! Append-only interaction log.
//!
//! Every pipeline run that gets as far as a prompt appends one JSON line to the
//! session log, whether it succeeded or not. The file is `$ASSISTANT_LOG` when
//! set, otherwise `~/.assistant.log`.
//!
//! Each entry is serialized first and written with a single `write_all` on a
//! file opened in append mode, so concurrent invocations interleave whole lines
//! rather than bytes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ai::CompletionResult;
use crate::config::home_dir;
use crate::error::{AssistantError, Result};
use crate::tools::ToolInvocation;

pub const LOG_ENV: &str = "ASSISTANT_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Ok,
    Error,
}

/// One pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub model: String,
    pub status: LogStatus,
    pub context: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogEntry {
    pub fn new(
        model: &str,
        context: &str,
        prompt: &str,
        outcome: std::result::Result<&CompletionResult, &AssistantError>,
    ) -> Self {
        let (status, response, tool_calls, error) = match outcome {
            Ok(result) => (
                LogStatus::Ok,
                Some(result.content.clone()),
                result.tool_calls.clone(),
                None,
            ),
            Err(e) => (LogStatus::Error, None, Vec::new(), Some(e.to_string())),
        };

        Self {
            timestamp: Local::now(),
            model: model.to_string(),
            status,
            context: context.to_string(),
            prompt: prompt.to_string(),
            response,
            tool_calls,
            error,
        }
    }

    /// Replace the recorded tool calls. A failed run still lists the calls
    /// that executed before the failure.
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolInvocation>) -> Self {
        self.tool_calls = tool_calls;
        self
    }
}

#[derive(Debug, Clone)]
pub struct SessionLogger {
    path: PathBuf,
}

impl SessionLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log at `$ASSISTANT_LOG`, falling back to `~/.assistant.log`.
    pub fn from_env() -> Self {
        match std::env::var_os(LOG_ENV) {
            Some(path) if !path.is_empty() => Self::new(path),
            _ => Self::new(home_dir().join(".assistant.log")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the outcome of one run.
    pub fn record(
        &self,
        model: &str,
        context: &str,
        prompt: &str,
        outcome: std::result::Result<&CompletionResult, &AssistantError>,
    ) -> Result<()> {
        self.append(&LogEntry::new(model, context, prompt, outcome))
    }

    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry).map_err(|e| self.write_error(e))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.write_error(e))?;
        file.flush().map_err(|e| self.write_error(e))?;

        debug!(path = %self.path.display(), status = ?entry.status, "Recorded session");
        Ok(())
    }

    /// Read every entry back, oldest first.
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            AssistantError::Config(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| {
                    AssistantError::Config(format!(
                        "invalid entry in {}: {}",
                        self.path.display(),
                        e
                    ))
                })
            })
            .collect()
    }

    fn write_error(&self, e: impl std::fmt::Display) -> AssistantError {
        AssistantError::LogWrite {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }
}
