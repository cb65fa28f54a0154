//! Terminal history captured from multiplexer panes.
//!
//! With `all_panes` unset only the active pane is read. Otherwise every pane of
//! the current window is read and the texts are concatenated in ascending
//! pane-id order, each under its own `--- pane <id> ---` header.

use tracing::debug;

use super::{ContextBlock, ContextProvider};
use crate::error::{AssistantError, Result};
use crate::mux::{Multiplexer, PaneSelector};

const NAME: &str = "history";

pub struct History {
    mux: Box<dyn Multiplexer>,
    /// Lines per pane; 0 means everything available.
    size: usize,
    all_panes: bool,
}

impl History {
    pub fn new<M>(mux: M, size: usize, all_panes: bool) -> Self
    where
        M: Multiplexer + 'static,
    {
        Self {
            mux: Box::new(mux),
            size,
            all_panes,
        }
    }

    fn capture_all(&self) -> Result<String> {
        let mut panes = self.mux.list_panes()?;
        panes.sort();
        debug!(panes = panes.len(), "Capturing all panes");

        let mut sections = Vec::with_capacity(panes.len());
        for pane in panes {
            let text = self
                .mux
                .get_pane_text(&PaneSelector::Pane(pane.clone()), self.size)?;
            sections.push(format!("--- pane {pane} ---\n{text}"));
        }
        Ok(sections.join("\n"))
    }
}

impl ContextProvider for History {
    fn name(&self) -> &str {
        NAME
    }

    fn produce(&self) -> Result<ContextBlock> {
        if !self.mux.is_inside_session() {
            return Err(AssistantError::context_unavailable(
                NAME,
                "not inside a tmux session",
            ));
        }

        let text = if self.all_panes {
            self.capture_all()?
        } else {
            self.mux.get_pane_text(&PaneSelector::Active, self.size)?
        };
        Ok(ContextBlock::new(NAME, text))
    }
}
