//! Main entry point for term-assistant.
//!
//! Parses the command line, loads the configuration, wires the pipeline and
//! prints the answer. Any error reaching `main` exits with a non-zero status.

mod cli;

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{debug, info};

use term_assistant::ai::{ModelDispatcher, OpenAiBackend};
use term_assistant::config::{self, Config};
use term_assistant::context::ContextAssembler;
use term_assistant::mux::Tmux;
use term_assistant::pipeline::Pipeline;
use term_assistant::session_log::SessionLogger;
use term_assistant::tools::{AutoApprove, PromptApprover, ShellRunner, ToolSet};
use term_assistant::utils;

use crate::cli::{Cli, Commands, TalkArgs};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Flushes the log file when main returns
    let _log_guard = utils::logger::init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = Config::load_from(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    match cli.command {
        Commands::Talk(args) => talk(config, args).await,
        Commands::Providers => {
            list_providers(&config);
            Ok(())
        }
    }
}

async fn talk(config: Config, args: TalkArgs) -> Result<()> {
    let (request, history) = args.to_request(&config);
    debug!(?request, "Prepared request");

    let tools = if request.generation.confirm_tools {
        ToolSet::new(ShellRunner::new(), PromptApprover)
    } else {
        ToolSet::new(ShellRunner::new(), AutoApprove)
    };
    let assembler = ContextAssembler::with_builtin(Tmux::from_env(), &history);
    let dispatcher = ModelDispatcher::new(config.providers.clone(), OpenAiBackend::new(), tools);
    let pipeline = Pipeline::new(config, assembler, dispatcher, SessionLogger::from_env());

    if args.dry_run {
        let prepared = pipeline.prepare(&request)?;
        for message in prepared.conversation.messages() {
            println!("--- {:?} ---\n{}", message.role, message.content);
        }
        info!("Dry run completed, using model {}", request.model);
        return Ok(());
    }

    let result = pipeline.run(&request).await?;
    println!("{}", result.content);
    Ok(())
}

fn list_providers(config: &Config) {
    println!("default model: {}", config.default_model);
    for (name, provider) in &config.providers {
        let key = if provider.api_key.is_empty() {
            "no key"
        } else {
            "key set"
        };
        println!("{name}\t{}\t{key}", provider.base_url);
    }
}
