// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Defines all command-line arguments and subcommands for cmi.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Settings;
use crate::error::Result;

/// cmi - converse with language models and render the diagrams they write
#[derive(Parser, Debug)]
#[command(name = "cmi")]
#[command(version, about = "Converse with language models and render the diagrams they write")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// API key as <api_id>:<key>, e.g. OpenAI:sk-... (repeatable)
    #[arg(short = 'a', long = "api-key", value_name = "API_ID:KEY", global = true)]
    pub api_keys: Vec<String>,

    /// BPMN auto-layout service endpoint
    #[arg(long, value_name = "URL", global = true)]
    pub bpmn_endpoint: Option<String>,

    /// PlantUML server base URL
    #[arg(long, value_name = "URL", global = true)]
    pub plantuml_server: Option<String>,

    /// Directory for conversation logs
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Do not write conversation logs
    #[arg(long, global = true)]
    pub no_log: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive session (default when no command given)
    Chat(ChatArgs),

    /// Submit one prompt (or a batch) non-interactively
    Ask(AskArgs),

    /// List model families, models and interpreters
    Models(ModelsArgs),

    /// Show the resolved settings or write them to the settings file
    Config(ConfigArgs),
}

/// Arguments for the chat subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ChatArgs {
    /// Model to select at start
    #[arg(short, long)]
    pub model: Option<String>,

    /// Interpreter to select at start
    #[arg(short, long)]
    pub interpreter: Option<String>,
}

/// Arguments for the ask subcommand
#[derive(clap::Args, Debug)]
pub struct AskArgs {
    /// The prompt; batch prompts are separated by the delimiter on its own line
    pub prompt: Option<String>,

    /// Model to use
    #[arg(short, long)]
    pub model: Option<String>,

    /// Interpreter to render the response with
    #[arg(short, long)]
    pub interpreter: Option<String>,

    /// Read the prompt from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Write the rendered diagram to this file
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the models subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ModelsArgs {
    /// Ask local runtimes for their installed models
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for the config subcommand
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// Write the settings to the settings file. API keys given with -a are not written.
    #[arg(long)]
    pub save: bool,
}

impl Cli {
    /// Fold the command-line overrides into loaded settings
    pub fn apply_overrides(&self, settings: &mut Settings) -> Result<()> {
        for pair in &self.api_keys {
            let family = settings.apply_api_key(pair)?;
            tracing::debug!("API key for {} set from the command line", family);
        }
        if let Some(ref endpoint) = self.bpmn_endpoint {
            settings.interpreters.bpmn.endpoint = endpoint.clone();
        }
        if let Some(ref server) = self.plantuml_server {
            settings.interpreters.plantuml.server = server.clone();
        }
        if let Some(ref dir) = self.log_dir {
            settings.logging.directory = dir.to_string_lossy().into_owned();
        }
        if self.no_log {
            settings.logging.enabled = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModelFamily;
    use clap::Parser;

    #[test]
    fn test_cli_default_no_command() {
        let cli = Cli::parse_from(["cmi"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(cli.api_keys.is_empty());
    }

    #[test]
    fn test_cli_verbose_multiple() {
        let cli = Cli::parse_from(["cmi", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_repeated_api_keys() {
        let cli = Cli::parse_from(["cmi", "-a", "OpenAI:sk-1", "--api-key", "Replicate:r8"]);
        assert_eq!(cli.api_keys, vec!["OpenAI:sk-1", "Replicate:r8"]);
    }

    #[test]
    fn test_chat_with_selection() {
        let cli = Cli::parse_from([
            "cmi",
            "chat",
            "--model",
            "OpenAI/gpt-4",
            "-i",
            "Plantweb/PlantUML",
        ]);
        match cli.command {
            Some(Commands::Chat(args)) => {
                assert_eq!(args.model.as_deref(), Some("OpenAI/gpt-4"));
                assert_eq!(args.interpreter.as_deref(), Some("Plantweb/PlantUML"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_ask_prompt_and_output() {
        let cli = Cli::parse_from(["cmi", "ask", "draw a box", "-m", "Ollama/llama3", "-o", "out.svg"]);
        match cli.command {
            Some(Commands::Ask(args)) => {
                assert_eq!(args.prompt.as_deref(), Some("draw a box"));
                assert_eq!(args.output, Some(PathBuf::from("out.svg")));
                assert!(!args.stdin);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_models_refresh() {
        let cli = Cli::parse_from(["cmi", "models", "--refresh"]);
        assert!(matches!(cli.command, Some(Commands::Models(ModelsArgs { refresh: true }))));
    }

    #[test]
    fn test_config_save() {
        let cli = Cli::parse_from(["cmi", "config", "--save"]);
        assert!(matches!(cli.command, Some(Commands::Config(ConfigArgs { save: true }))));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["cmi", "chat", "--no-log", "--log-dir", "/tmp/logs"]);
        assert!(cli.no_log);
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_apply_overrides() {
        let cli = Cli::parse_from([
            "cmi",
            "-a",
            "OpenAI:sk-cli",
            "--bpmn-endpoint",
            "http://layout:3000/process-diagram",
            "--plantuml-server",
            "http://puml:8080",
            "--no-log",
        ]);
        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings).unwrap();

        assert_eq!(
            settings.model_api_key(ModelFamily::OpenAi).as_deref(),
            Some("sk-cli")
        );
        assert_eq!(settings.interpreters.bpmn.endpoint, "http://layout:3000/process-diagram");
        assert_eq!(settings.interpreters.plantuml.server, "http://puml:8080");
        assert!(!settings.logging.enabled);
    }

    #[test]
    fn test_apply_overrides_rejects_unknown_api_id() {
        let cli = Cli::parse_from(["cmi", "-a", "Nope:key"]);
        let mut settings = Settings::default();
        assert!(cli.apply_overrides(&mut settings).is_err());
    }
}
