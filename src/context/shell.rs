//! Active shell context.

use std::path::Path;

use super::{ContextBlock, ContextProvider};
use crate::error::Result;

const NAME: &str = "shell";
const UNKNOWN: &str = "unknown";

#[derive(Clone, Debug)]
pub struct Shell {
    shell_path: Option<String>,
}

impl Shell {
    /// Capture `$SHELL`.
    pub fn from_env() -> Self {
        Self::new(std::env::var("SHELL").ok())
    }

    pub fn new(shell_path: Option<String>) -> Self {
        Self { shell_path }
    }

    /// Program name of the shell (`/usr/bin/zsh` -> `zsh`).
    pub fn shell_name(&self) -> String {
        self.shell_path
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| Path::new(s).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

impl ContextProvider for Shell {
    fn name(&self) -> &str {
        NAME
    }

    fn produce(&self) -> Result<ContextBlock> {
        Ok(ContextBlock::new(NAME, self.shell_name()))
    }
}
