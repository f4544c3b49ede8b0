// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Command handling for chat interface
//!
//! Turns a line of user input into a [`ChatCommand`]. Parsing is pure so the
//! routing can be tested without a terminal.

use std::path::PathBuf;

/// Represents the different things a line of chat input can ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Exit the chat session
    Exit,
    /// Show help information
    Help,
    /// List families, models and interpreters
    Models,
    /// Show the selected model
    Model,
    /// Select a model
    ModelSelect(String),
    /// Show the selected interpreter
    Interpreter,
    /// Select an interpreter
    InterpreterSelect(String),
    /// Show model parameters
    Params,
    /// Set a model parameter
    SetParam { name: String, value: String },
    /// Show interpreter parameters
    InterpreterParams,
    /// Set an interpreter parameter
    SetInterpreterParam { name: String, value: String },
    /// Clear the history, keeping the selection
    Clear,
    /// Clear the history and the selection
    New,
    /// Remove the latest prompt and what followed it
    Undo,
    /// Ask the model again for the latest prompt
    Rerun,
    /// Render the latest source again, optionally replaced by a file's content
    RerunInterpreter(Option<PathBuf>),
    /// Show the message history
    History,
    /// Add a note to the conversation log
    Note(String),
    /// Regular user message (not a command)
    Message(String),
    /// Empty input
    Empty,
    /// A known command used wrongly; holds the usage line
    Usage(&'static str),
    /// Unknown slash command
    Unknown(String),
}

/// Split `name=value` or `name value`.
///
/// The `=` form allows names with spaces, such as `Use cache=true`.
fn parse_assignment(args: &str) -> Option<(String, String)> {
    let (name, value) = match args.split_once('=') {
        Some(pair) => pair,
        None => args.rsplit_once(char::is_whitespace)?,
    };
    let (name, value) = (name.trim(), value.trim());
    if name.is_empty() || value.is_empty() {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

/// Parse a line of input into a command
pub fn parse_command(input: &str) -> ChatCommand {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return ChatCommand::Empty;
    }

    let lower = trimmed.to_lowercase();
    if lower == "exit" || lower == "quit" {
        return ChatCommand::Exit;
    }

    if !trimmed.starts_with('/') {
        return ChatCommand::Message(input.to_string());
    }

    let (command, args) = match trimmed.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (trimmed, ""),
    };

    match command.to_lowercase().as_str() {
        "/quit" | "/exit" => ChatCommand::Exit,
        "/help" | "/?" => ChatCommand::Help,
        "/models" => ChatCommand::Models,
        "/model" if args.is_empty() => ChatCommand::Model,
        "/model" => ChatCommand::ModelSelect(args.to_string()),
        "/interpreter" | "/int" if args.is_empty() => ChatCommand::Interpreter,
        "/interpreter" | "/int" => ChatCommand::InterpreterSelect(args.to_string()),
        "/params" => ChatCommand::Params,
        "/iparams" => ChatCommand::InterpreterParams,
        "/set" => match parse_assignment(args) {
            Some((name, value)) => ChatCommand::SetParam { name, value },
            None => ChatCommand::Usage("/set <name>=<value>"),
        },
        "/iset" => match parse_assignment(args) {
            Some((name, value)) => ChatCommand::SetInterpreterParam { name, value },
            None => ChatCommand::Usage("/iset <name>=<value>"),
        },
        "/clear" => ChatCommand::Clear,
        "/new" => ChatCommand::New,
        "/undo" => ChatCommand::Undo,
        "/rerun" => ChatCommand::Rerun,
        "/rerun-int" => {
            ChatCommand::RerunInterpreter((!args.is_empty()).then(|| PathBuf::from(args)))
        }
        "/history" => ChatCommand::History,
        "/note" if args.is_empty() => ChatCommand::Usage("/note <text>"),
        "/note" => ChatCommand::Note(args.to_string()),
        _ => ChatCommand::Unknown(command.to_string()),
    }
}
