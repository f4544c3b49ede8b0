// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! cmi - converse with language models and render the diagrams they write
//!
//! Entry point for the cmi CLI application.

use clap::Parser;

use cmi::cli::{ChatArgs, Cli, Commands};
use cmi::config::Settings;
use cmi::error::Result;

#[path = "main/chat_runtime.rs"]
mod chat_runtime;
#[path = "main/cli_commands.rs"]
mod cli_commands;

use chat_runtime::run_chat;
use cli_commands::{run_ask, run_config, run_models};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    // `-v` shows engine and adapter diagnostics, `-vv` everything cmi logs.
    // `RUST_LOG` still takes precedence.
    if cli.verbose > 0 {
        let directive = if cli.verbose > 1 { "cmi=trace" } else { "cmi=debug" };
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load_from(&config_path)?;
    cli.apply_overrides(&mut settings)?;

    match cli.command {
        None => run_chat(ChatArgs::default(), settings).await,
        Some(Commands::Chat(args)) => run_chat(args, settings).await,
        Some(Commands::Ask(args)) => run_ask(args, settings).await,
        Some(Commands::Models(args)) => run_models(args, settings).await,
        Some(Commands::Config(args)) => run_config(args, &settings, &config_path),
    }
}
