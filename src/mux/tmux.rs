//! tmux-backed [`Multiplexer`].

use std::process::{Command, Stdio};

use tracing::debug;

use super::{Multiplexer, PaneId, PaneSelector, tail_lines};
use crate::error::{AssistantError, Result};

const CONTEXT: &str = "history";

#[derive(Clone, Debug, Default)]
pub struct Tmux {
    /// Value of `$TMUX`, set by tmux for every process inside a session.
    socket: Option<String>,
    /// Value of `$TMUX_PANE`, the pane this process runs in.
    pane: Option<String>,
}

impl Tmux {
    pub fn from_env() -> Self {
        Self {
            socket: std::env::var("TMUX").ok().filter(|s| !s.is_empty()),
            pane: std::env::var("TMUX_PANE").ok().filter(|s| !s.is_empty()),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(?args, "Running tmux");
        let output = Command::new("tmux")
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                AssistantError::context_unavailable(CONTEXT, format!("failed to run tmux: {e}"))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AssistantError::context_unavailable(
                CONTEXT,
                format!("tmux {} failed: {}", args.join(" "), stderr.trim()),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Multiplexer for Tmux {
    fn is_inside_session(&self) -> bool {
        self.socket.is_some()
    }

    fn list_panes(&self) -> Result<Vec<PaneId>> {
        let stdout = self.run(&self.list_panes_args())?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PaneId::new)
            .collect())
    }

    fn get_pane_text(&self, pane: &PaneSelector, max_lines: usize) -> Result<String> {
        let stdout = self.run(&self.capture_pane_args(pane))?;
        Ok(tail_lines(&stdout, max_lines))
    }
}

impl Tmux {
    /// Panes of the window holding `$TMUX_PANE`, or of the current window.
    fn list_panes_args(&self) -> Vec<&str> {
        let mut args = vec!["list-panes", "-F", "#{pane_id}"];
        if let Some(pane) = self.pane.as_deref() {
            args.extend(["-t", pane]);
        }
        args
    }

    fn capture_pane_args<'a>(&'a self, pane: &'a PaneSelector) -> Vec<&'a str> {
        // -J joins wrapped lines, -S - starts at the beginning of the scrollback.
        let mut args = vec!["capture-pane", "-p", "-J", "-S", "-"];
        let target = match pane {
            PaneSelector::Active => self.pane.as_deref(),
            PaneSelector::Pane(id) => Some(id.0.as_str()),
        };
        if let Some(target) = target {
            args.extend(["-t", target]);
        }
        args
    }
}
