// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    ExecutableCommand,
};

use cmi::chat::display::{format_catalog, format_history, format_parameters, help_text};
use cmi::chat::{parse_command, ChatCommand, ConsoleObserver};
use cmi::cli::ChatArgs;
use cmi::config::Settings;
use cmi::conversation::{ConversationEngine, TurnObserver};
use cmi::error::{CmiError, Result};
use cmi::llm::HttpBackendFactory;
use cmi::registry::Registry;
use cmi::store::{ConversationLog, JsonFileLog, NullLog};

/// Opens and closes a multi-line prompt
const MULTILINE_FENCE: &str = "\"\"\"";

/// The conversation log configured in settings
pub(super) fn open_log(settings: &Settings) -> Box<dyn ConversationLog> {
    if settings.logging.enabled {
        tracing::debug!("Logging conversations below {}", settings.logging.directory);
        Box::new(JsonFileLog::new(&settings.logging.directory))
    } else {
        Box::new(NullLog)
    }
}

/// Engine wired to the HTTP adapters and the configured log
pub(super) fn build_engine(settings: Settings) -> Result<ConversationEngine> {
    let registry = Registry::from_settings(&settings)?;
    let log = open_log(&settings);
    Ok(ConversationEngine::new(
        registry,
        settings,
        Arc::new(HttpBackendFactory::new()),
        log,
    ))
}

/// Select a model and interpreter, rejecting ids the registry cannot resolve
pub(super) fn apply_selection(
    engine: &mut ConversationEngine,
    model: Option<&str>,
    interpreter: Option<&str>,
) -> Result<()> {
    if let Some(model) = model {
        engine.registry().canonical_id(model)?;
        engine.select_model(model);
    }
    if let Some(interpreter) = interpreter {
        engine.registry().interpreter(interpreter)?;
        engine.select_interpreter(interpreter);
    }
    Ok(())
}

/// Read one prompt. A line holding only `"""` starts a block that runs
/// until the next such line. `None` at end of input.
pub(super) fn read_input_from(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    if line.trim() != MULTILINE_FENCE {
        return Ok(Some(line.trim().to_string()));
    }

    let mut block = Vec::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line.trim() == MULTILINE_FENCE {
            break;
        }
        block.push(line.trim_end_matches(['\r', '\n']).to_string());
    }
    Ok(Some(block.join("\n")))
}

fn read_user_input() -> Result<Option<String>> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Green))?;
    print!("you: ");
    stdout.execute(ResetColor)?;
    stdout.flush()?;

    Ok(read_input_from(&mut io::stdin().lock())?)
}

fn print_welcome(engine: &ConversationEngine) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Cyan))?;
    println!("cmi v{}", env!("CARGO_PKG_VERSION"));
    stdout.execute(ResetColor)?;
    println!(
        "Model: {}  Interpreter: {}",
        engine.selected_model().unwrap_or("none"),
        engine.selected_interpreter().unwrap_or("none")
    );
    println!("Type /help for commands, /quit to leave.");
    println!();
    Ok(())
}

fn print_error(error: &CmiError) -> Result<()> {
    let mut stdout = io::stdout();
    stdout.execute(SetForegroundColor(Color::Red))?;
    println!("Error: {}", error);
    stdout.execute(ResetColor)?;
    Ok(())
}

/// Run one chat command. Returns `false` when the session should end.
pub(super) async fn handle_command(
    engine: &mut ConversationEngine,
    command: ChatCommand,
    observer: &mut dyn TurnObserver,
) -> Result<bool> {
    match command {
        ChatCommand::Exit => return Ok(false),
        ChatCommand::Empty => {}
        ChatCommand::Help => {
            print!("{}", help_text(&engine.settings().conversation.batch_delimiter))
        }
        ChatCommand::Models => {
            engine.requery_models().await?;
            print!("{}", format_catalog(engine.registry()));
        }
        ChatCommand::Model => println!("Model: {}", engine.selected_model().unwrap_or("none")),
        ChatCommand::ModelSelect(id) => {
            apply_selection(engine, Some(&id), None)?;
            println!("Model: {}", id);
        }
        ChatCommand::Interpreter => println!(
            "Interpreter: {}",
            engine.selected_interpreter().unwrap_or("none")
        ),
        ChatCommand::InterpreterSelect(id) => {
            apply_selection(engine, None, Some(&id))?;
            println!("Interpreter: {}", id);
        }
        ChatCommand::Params => {
            engine.ensure_model_parameters().await?;
            print!(
                "{}",
                format_parameters(engine.model_parameters(), engine.model_parameter_defaults())
            );
        }
        ChatCommand::SetParam { name, value } => {
            engine.set_model_parameter(&name, &value).await?;
            println!("{} = {}", name, value);
        }
        ChatCommand::InterpreterParams => {
            engine.ensure_interpreter_parameters().await?;
            print!(
                "{}",
                format_parameters(
                    engine.interpreter_parameters(),
                    engine.interpreter_parameter_defaults()
                )
            );
        }
        ChatCommand::SetInterpreterParam { name, value } => {
            engine.set_interpreter_parameter(&name, &value).await?;
            println!("{} = {}", name, value);
        }
        ChatCommand::Clear => {
            engine.clear_history();
            println!("History cleared");
        }
        ChatCommand::New => {
            engine.new_conversation();
            println!("New conversation. Select a model with /model");
        }
        ChatCommand::Undo => {
            let removed = engine.remove_last_turn();
            println!("Removed {} messages", removed);
        }
        ChatCommand::Rerun => {
            if engine.rerun_llm(observer).await?.is_none() {
                println!("No prompt to rerun");
            }
        }
        ChatCommand::RerunInterpreter(path) => {
            let edited = match path {
                Some(path) => Some(std::fs::read_to_string(&path)?),
                None => None,
            };
            match engine.rerun_interpreter(edited).await? {
                Some(run) => observer.on_interpreter(&run),
                None => println!("No response to render"),
            }
        }
        ChatCommand::History => print!("{}", format_history(engine.messages())),
        ChatCommand::Note(text) => {
            engine.annotate(&text);
            println!("Noted");
        }
        ChatCommand::Message(text) => {
            engine.submit(&text, observer).await?;
        }
        ChatCommand::Usage(usage) => println!("Usage: {}", usage),
        ChatCommand::Unknown(command) => println!("Unknown command {}, try /help", command),
    }
    Ok(true)
}

/// Interactive session on stdin/stdout
pub(super) async fn run_chat(args: ChatArgs, settings: Settings) -> Result<()> {
    let mut engine = build_engine(settings)?;
    apply_selection(
        &mut engine,
        args.model.as_deref(),
        args.interpreter.as_deref(),
    )?;
    print_welcome(&engine)?;

    let colored = io::stdout().is_terminal();
    let mut observer = ConsoleObserver::new(io::stdout(), colored);

    while let Some(input) = read_user_input()? {
        match handle_command(&mut engine, parse_command(&input), &mut observer).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => print_error(&e)?,
        }
    }
    Ok(())
}
