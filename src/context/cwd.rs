//! Current working directory context.

use std::env;
use std::path::PathBuf;

use super::{ContextBlock, ContextProvider};
use crate::error::{AssistantError, Result};

const NAME: &str = "pwd";

#[derive(Clone, Default, Debug)]
pub struct CurrentDir {
    /// Fixed path; `None` reads the process directory at produce time.
    path: Option<PathBuf>,
}

impl CurrentDir {
    /// Read the working directory of this process when produced.
    pub fn current() -> Self {
        Self { path: None }
    }

    pub fn fixed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

impl ContextProvider for CurrentDir {
    fn name(&self) -> &str {
        NAME
    }

    fn produce(&self) -> Result<ContextBlock> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => env::current_dir()
                .map_err(|e| AssistantError::context_unavailable(NAME, e.to_string()))?,
        };
        Ok(ContextBlock::new(NAME, path.to_string_lossy()))
    }
}
