// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::sync::Arc;

use cmi::chat::display::format_catalog;
use cmi::chat::ConsoleObserver;
use cmi::cli::{AskArgs, ConfigArgs, ModelsArgs};
use cmi::config::Settings;
use cmi::conversation::{ConversationEngine, TurnReport};
use cmi::error::{CmiError, Result};
use cmi::interpreter::RenderPayload;
use cmi::llm::HttpBackendFactory;
use cmi::registry::Registry;
use cmi::store::NullLog;

use super::chat_runtime::{apply_selection, build_engine};

/// Latest non-empty diagram across a batch
fn last_diagram(reports: &[TurnReport]) -> Option<&RenderPayload> {
    reports
        .iter()
        .rev()
        .filter_map(|r| r.interpreter.as_ref())
        .find_map(|run| run.output.as_ref().filter(|p| !p.is_empty()))
}

/// Submit one prompt (or batch) and print the streamed reply
pub(super) async fn run_ask(args: AskArgs, settings: Settings) -> Result<()> {
    let prompt = if args.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        args.prompt.ok_or_else(|| {
            CmiError::InvalidInput("No prompt given; pass one or use --stdin".to_string())
        })?
    };
    let model = args
        .model
        .ok_or_else(|| CmiError::InvalidInput("ask needs --model".to_string()))?;

    let mut engine = build_engine(settings)?;
    apply_selection(&mut engine, Some(&model), args.interpreter.as_deref())?;

    let colored = io::stdout().is_terminal();
    let mut observer = ConsoleObserver::new(io::stdout(), colored);
    let reports = engine.submit(&prompt, &mut observer).await?;

    if let Some(path) = args.output {
        match last_diagram(&reports) {
            Some(payload) => {
                std::fs::write(&path, payload.as_bytes())?;
                eprintln!("Wrote {}", path.display());
            }
            None => tracing::warn!("No diagram to write to {}", path.display()),
        }
    }

    match reports.into_iter().find_map(|r| r.error) {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Print the catalog, optionally after asking local runtimes for their models
pub(super) async fn run_models(args: ModelsArgs, settings: Settings) -> Result<()> {
    let registry = Registry::from_settings(&settings)?;
    let configured = settings.configured_api_keys();
    let mut engine = ConversationEngine::new(
        registry,
        settings,
        Arc::new(HttpBackendFactory::new()),
        Box::new(NullLog),
    );
    if args.refresh {
        engine.requery_models().await?;
    }

    print!("{}", format_catalog(engine.registry()));
    if configured.is_empty() {
        println!("API keys: none configured");
    } else {
        println!("API keys: {}", configured.join(", "));
    }
    Ok(())
}

/// Show where settings live and what they resolve to; optionally save them
pub(super) fn run_config(args: ConfigArgs, settings: &Settings, path: &Path) -> Result<()> {
    println!("Settings file: {}", path.display());
    println!("OpenAI endpoint: {}", settings.providers.openai.base_url);
    println!("Replicate endpoint: {}", settings.providers.replicate.base_url);
    println!("Llama.cpp server: {}", settings.providers.llama_cpp.base_url);
    println!("Ollama server: {}", settings.providers.ollama.base_url);
    println!("BPMN endpoint: {}", settings.interpreters.bpmn.endpoint);
    println!("PlantUML server: {}", settings.interpreters.plantuml.server);
    if settings.logging.enabled {
        println!("Conversation logs: {}", settings.logging.directory);
    } else {
        println!("Conversation logs: disabled");
    }
    println!("API keys: {}", settings.configured_api_keys().join(", "));

    if args.save {
        settings.save_to(path)?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmi::conversation::InterpreterRun;
    use std::time::Duration;

    fn report_with(output: Option<RenderPayload>) -> TurnReport {
        TurnReport {
            prompt: "p".into(),
            response: Some("r".into()),
            duration: None,
            error: None,
            extracted: Some("A -> B".into()),
            interpreter: Some(InterpreterRun {
                interpreter_id: "Plantweb/PlantUML".into(),
                input: "@startuml\nA -> B\n@enduml".into(),
                output,
                format: Some("svg".into()),
                duration: Duration::ZERO,
                error: None,
            }),
        }
    }

    #[test]
    fn test_last_diagram_skips_empty() {
        let reports = vec![
            report_with(Some(RenderPayload::Text("<svg>1</svg>".into()))),
            report_with(Some(RenderPayload::Text(String::new()))),
        ];
        assert_eq!(
            last_diagram(&reports),
            Some(&RenderPayload::Text("<svg>1</svg>".into()))
        );
    }

    #[test]
    fn test_last_diagram_none() {
        assert!(last_diagram(&[report_with(None)]).is_none());
    }

    #[test]
    fn test_run_config_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        run_config(ConfigArgs { save: true }, &Settings::default(), &path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }
}
