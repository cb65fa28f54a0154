//! Context gathering for the assistant prompt.
//!
//! Each [`ContextProvider`] reads one aspect of the live terminal state (pane
//! history, working directory, shell) and returns a labeled [`ContextBlock`].
//! The [`ContextAssembler`] runs the configured providers in order and joins
//! their blocks into the text placed ahead of the user prompt.

mod cwd;
mod history;
mod shell;

use tracing::debug;

use crate::config::HistoryOptions;
use crate::error::{AssistantError, Result};
use crate::mux::Multiplexer;

pub use cwd::CurrentDir;
pub use history::History;
pub use shell::Shell;

/// Separator between rendered blocks.
const BLOCK_SEPARATOR: &str = "\n\n";

/// One labeled piece of context, e.g. `pwd` with the current directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextBlock {
    pub label: String,
    pub text: String,
}

impl ContextBlock {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    /// `[label]` header followed by the payload.
    pub fn render(&self) -> String {
        format!("[{}]\n{}", self.label, self.text)
    }
}

pub trait ContextProvider {
    /// Name used in the `contexts` configuration list.
    fn name(&self) -> &str;

    fn produce(&self) -> Result<ContextBlock>;
}

/// Runs context providers by configured name.
#[derive(Default)]
pub struct ContextAssembler {
    providers: Vec<Box<dyn ContextProvider>>,
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in `history`, `pwd` and `shell` providers.
    pub fn with_builtin<M>(mux: M, history: &HistoryOptions) -> Self
    where
        M: Multiplexer + 'static,
    {
        Self::new()
            .with(History::new(mux, history.size, history.all_panes))
            .with(CurrentDir::current())
            .with(Shell::from_env())
    }

    pub fn with(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.register(provider);
        self
    }

    /// Register a provider; a later registration replaces one with the same name.
    pub fn register(&mut self, provider: impl ContextProvider + 'static) {
        self.providers.retain(|p| p.name() != provider.name());
        self.providers.push(Box::new(provider));
    }

    /// Produce one block per name, in the order given.
    pub fn collect(&self, names: &[String]) -> Result<Vec<ContextBlock>> {
        names
            .iter()
            .map(|name| {
                let provider = self
                    .providers
                    .iter()
                    .find(|p| p.name() == name.as_str())
                    .ok_or_else(|| AssistantError::UnknownContext(name.clone()))?;
                let block = provider.produce()?;
                debug!(context = %name, bytes = block.text.len(), "Collected context");
                Ok(block)
            })
            .collect()
    }

    /// Produce and render the named contexts into a single text.
    pub fn assemble(&self, names: &[String]) -> Result<String> {
        let blocks = self.collect(names)?;
        Ok(blocks
            .iter()
            .map(ContextBlock::render)
            .collect::<Vec<_>>()
            .join(BLOCK_SEPARATOR))
    }
}

/// Filter the configured context list, preserving its order.
pub fn select_contexts(configured: &[String], excluded: &[&str]) -> Vec<String> {
    configured
        .iter()
        .filter(|name| !excluded.contains(&name.as_str()))
        .cloned()
        .collect()
}
