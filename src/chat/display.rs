// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Display formatting for chat interface
//!
//! Functions here return formatted strings rather than writing to stdout,
//! which keeps them easy to test.

use std::time::Duration;

use crate::conversation::{InterpreterRun, Message, MessageContent, MessageFormat};
use crate::params::{Control, ParameterSet};
use crate::registry::{FamilyKind, Registry};

/// Truncate a string for display with ellipsis, on a character boundary
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Seconds with two decimals
pub fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Byte counts in the largest fitting unit
pub fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn kind_label(kind: FamilyKind) -> &'static str {
    match kind {
        FamilyKind::Api => "API",
        FamilyKind::LocalRuntime => "local",
    }
}

/// Families with their models, then the interpreters
pub fn format_catalog(registry: &Registry) -> String {
    let mut out = String::from("Models:\n");
    for family in registry.families() {
        out.push_str(&format!("  {} ({})\n", family, kind_label(family.kind())));
        let models: Vec<_> = registry
            .models()
            .iter()
            .filter(|m| m.family == *family)
            .collect();
        if models.is_empty() {
            let hint = if family.has_live_catalog() && !registry.is_requeried(*family) {
                "none listed, try --refresh"
            } else {
                "none"
            };
            out.push_str(&format!("    ({})\n", hint));
        }
        for model in models {
            out.push_str(&format!("    {}\n", model.id));
        }
    }

    out.push_str("Interpreters:\n");
    for interpreter in registry.interpreters() {
        out.push_str(&format!(
            "  {} ({}, {})\n",
            interpreter.id,
            interpreter.syntax,
            kind_label(interpreter.family.kind())
        ));
    }
    out
}

fn control_hint(control: &Control) -> String {
    match control {
        Control::Slider { min, max, .. } => format!("{}..{}", min, max),
        Control::Number { min: Some(min), .. } => format!(">= {}", min),
        Control::Number { min: None, .. } => "number".to_string(),
        Control::Toggle => "true/false".to_string(),
        Control::Select => "choice".to_string(),
        Control::TextInput => "text".to_string(),
    }
}

/// One line per parameter; values that differ from the default are marked
pub fn format_parameters(parameters: &ParameterSet, defaults: &ParameterSet) -> String {
    if parameters.is_empty() {
        return "  (no parameters bound yet)\n".to_string();
    }
    let mut out = String::new();
    for param in parameters.iter() {
        let changed = defaults
            .get(&param.name)
            .is_some_and(|default| *default != param.value);
        out.push_str(&format!(
            "  {}{} = {}  ({})\n",
            if changed { "*" } else { " " },
            param.name,
            param.value,
            control_hint(&param.control)
        ));
    }
    out
}

fn format_label(format: MessageFormat) -> &'static str {
    match format {
        MessageFormat::Init => "init",
        MessageFormat::Prompt => "prompt",
        MessageFormat::LlmResponse => "response",
        MessageFormat::InterpreterText => "interpreter",
        MessageFormat::InterpreterImage => "diagram",
    }
}

/// Compact listing of the message history
pub fn format_history(messages: &[Message]) -> String {
    let mut out = String::new();
    for (i, message) in messages.iter().enumerate() {
        let summary = match &message.content {
            MessageContent::Text(text) if message.format != MessageFormat::InterpreterImage => {
                truncate_string(&text.replace('\n', " "), 60)
            }
            content => format!(
                "{} {}",
                message.image_format.as_deref().unwrap_or("binary"),
                format_size(content.len())
            ),
        };
        let marker = if message.extracted_source.is_some() { " [source]" } else { "" };
        out.push_str(&format!(
            "{:>3} {:<10} {:<11} {}{}\n",
            i,
            message.role.as_str(),
            format_label(message.format),
            summary,
            marker
        ));
    }
    out
}

/// One-line outcome of an interpreter run
pub fn format_interpreter_run(run: &InterpreterRun) -> String {
    if let Some(ref error) = run.error {
        return format!("{} failed: {}", run.interpreter_id, error);
    }
    match (&run.output, &run.format) {
        (Some(payload), Some(format)) if !payload.is_empty() => format!(
            "{} rendered {} ({}) in {}",
            run.interpreter_id,
            format,
            format_size(payload.len()),
            format_duration(run.duration)
        ),
        (Some(_), _) => format!("{} returned an empty result", run.interpreter_id),
        _ => format!("{} produced no output", run.interpreter_id),
    }
}

/// Chat help text
pub fn help_text(batch_delimiter: &str) -> String {
    format!(
        "\
Commands:
  /models                  List models and interpreters
  /model [ID]              Show or select the model
  /interpreter [ID]        Show or select the interpreter
  /params, /iparams        Show model or interpreter parameters
  /set NAME=VALUE          Set a model parameter
  /iset NAME=VALUE         Set an interpreter parameter
  /clear                   Clear the history
  /new                     Clear the history and the selection
  /undo                    Remove the latest prompt and its replies
  /rerun                   Ask the model again
  /rerun-int [FILE]        Render again, optionally from edited source in FILE
  /history                 Show the message history
  /note TEXT               Add a note to the conversation log
  /quit                    Leave

Anything else is sent as a prompt. Start a line with \"\"\" to enter several
lines, end with \"\"\" again. A line holding only {} separates batch prompts.
",
        batch_delimiter
    )
}
