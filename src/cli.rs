use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use term_assistant::ai::SystemMessage;
use term_assistant::config::{Config, HistoryOptions};
use term_assistant::context::select_contexts;
use term_assistant::pipeline::TalkRequest;

#[derive(Parser)]
#[command(name = "term-assistant")]
#[command(author, version, about = "Ask a language model about your terminal session", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the YAML configuration (default: ~/.assistant.yaml)
    #[arg(long, global = true, env = "ASSISTANT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a prompt, with terminal context, and print the answer
    Talk(TalkArgs),

    /// List the configured providers
    Providers,
}

#[derive(Args, Debug)]
pub struct TalkArgs {
    /// The question for the assistant
    pub prompt: String,

    /// Model to use, as provider/model
    #[arg(short, long)]
    pub model: Option<String>,

    /// System message: a configured name, or literal text
    #[arg(short, long)]
    pub system: Option<String>,

    /// Lines of history to capture per pane (0 = all available)
    #[arg(short = 'H', long)]
    pub history_size: Option<usize>,

    /// Include history from every pane of the current window
    #[arg(long)]
    pub all_panes: bool,

    /// Do not include any context in the prompt
    #[arg(long)]
    pub no_context: bool,

    /// Do not include the current directory
    #[arg(long)]
    pub no_pwd: bool,

    /// Do not include the current shell
    #[arg(long)]
    pub no_shell: bool,

    /// Do not include the terminal history
    #[arg(long)]
    pub no_history: bool,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling top-p
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Do not offer tools to the model
    #[arg(long)]
    pub no_tools: bool,

    /// Run tool calls without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Print the conversation instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

impl TalkArgs {
    /// Context names dropped by the `--no-*` flags.
    pub fn excluded_contexts(&self) -> Vec<&'static str> {
        let mut excluded = Vec::new();
        if self.no_pwd {
            excluded.push("pwd");
        }
        if self.no_shell {
            excluded.push("shell");
        }
        if self.no_history {
            excluded.push("history");
        }
        excluded
    }

    /// Apply the flags on top of the configuration.
    ///
    /// Returns the request and the history options the `history` context is
    /// built with.
    pub fn to_request(&self, config: &Config) -> (TalkRequest, HistoryOptions) {
        let contexts = if self.no_context {
            Vec::new()
        } else {
            select_contexts(&config.contexts, &self.excluded_contexts())
        };

        let mut history = config.history_context_options.clone();
        // 0 keeps the configured size
        if let Some(size) = self.history_size.filter(|&n| n > 0) {
            history.size = size;
        }
        history.all_panes |= self.all_panes;

        let mut generation = config.generation.clone();
        if let Some(temperature) = self.temperature {
            generation.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            generation.top_p = top_p;
        }
        generation.with_tools &= !self.no_tools;
        generation.confirm_tools &= !self.yes;

        let model = self
            .model
            .as_deref()
            .unwrap_or(&config.default_model)
            .to_lowercase();

        let request = TalkRequest {
            prompt: self.prompt.clone(),
            model,
            system: SystemMessage::from_flag(self.system.as_deref(), config),
            contexts,
            generation,
        };
        (request, history)
    }
}
