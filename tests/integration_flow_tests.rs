// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! End-to-end conversation flows against mock backends and a real file log

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cmi::config::Settings;
use cmi::conversation::{
    ConversationEngine, MessageFormat, NoopObserver, EMPTY_RESULT_TEXT, INVALID_RESPONSE_TEXT,
};
use cmi::interpreter::mock_renderer::{MockRender, MockRenderer};
use cmi::interpreter::{RegexBpmnAssembler, RenderOutput, RenderPayload};
use cmi::llm::mock_backend::{MockBackend, MockFactory};
use cmi::registry::Registry;
use cmi::store::JsonFileLog;
use serde_json::Value;
use tempfile::TempDir;

const PLANTUML_REPLY: &str = "Here you go:\n@startuml\nAlice -> Bob: hello\n@enduml\nEnjoy.";

fn engine_in(dir: &Path, backend: MockBackend, renderer: MockRenderer) -> ConversationEngine {
    ConversationEngine::new(
        Registry::builtin().unwrap(),
        Settings::default(),
        Arc::new(MockFactory::new(backend, renderer)),
        Box::new(JsonFileLog::new(dir)),
    )
}

fn conversation_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_dir())
        .filter(|p| p.file_name().unwrap().to_string_lossy().starts_with("cmi-"))
        .collect();
    dirs.sort();
    dirs
}

fn read_conversation(dir: &Path) -> Value {
    let name = dir.file_name().unwrap().to_string_lossy().into_owned();
    let file = dir.join(format!("{}.json", name));
    serde_json::from_str(&std::fs::read_to_string(file).unwrap()).unwrap()
}

/// The content key of each conversation entry, in order
fn entry_kinds(log: &Value) -> Vec<String> {
    const KINDS: [&str; 7] = [
        "init_message",
        "user_prompt",
        "llm_response",
        "int_input",
        "int_output",
        "int_output_file",
        "message",
    ];
    log["conversation"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            KINDS
                .iter()
                .find(|k| entry.get(**k).is_some())
                .map(|k| k.to_string())
                .unwrap_or_default()
        })
        .collect()
}

#[tokio::test]
async fn test_plantuml_turn_is_logged_in_order() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(
        dir.path(),
        MockBackend::new().with_responses([PLANTUML_REPLY]),
        MockRenderer::new(),
    );
    engine.select_model("OpenAI/gpt-4");
    engine.select_interpreter("Plantweb/PlantUML");

    let reports = engine
        .submit("Draw Alice greeting Bob", &mut NoopObserver)
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].failed());
    assert!(reports[0].interpreter.as_ref().unwrap().is_rendered());

    let formats: Vec<MessageFormat> = engine.messages().iter().map(|m| m.format).collect();
    assert_eq!(
        formats,
        vec![
            MessageFormat::Init,
            MessageFormat::Prompt,
            MessageFormat::LlmResponse,
            MessageFormat::InterpreterImage,
        ]
    );

    let dirs = conversation_dirs(dir.path());
    assert_eq!(dirs.len(), 1);
    let log = read_conversation(&dirs[0]);
    assert_eq!(
        entry_kinds(&log),
        vec!["init_message", "user_prompt", "llm_response", "int_input", "int_output"]
    );

    let ids: Vec<u64> = log["conversation"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["message_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);

    assert_eq!(log["llm_configurations"][0]["llm"], "OpenAI/gpt-4");
    assert_eq!(log["int_configurations"][0]["interpreter"], "Plantweb/PlantUML");
    assert!(log["conversation"][2]["execution_duration_s"].is_number());
    assert!(log["conversation"][3]["int_input"]
        .as_str()
        .unwrap()
        .starts_with("@startuml"));
}

#[tokio::test]
async fn test_rerun_llm_replaces_response_and_diagram() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new().with_responses([
        "@startuml\nA -> B\n@enduml",
        "@startuml\nA -> C\n@enduml",
    ]);
    let renderer = MockRenderer::new();
    let mut engine = engine_in(dir.path(), backend.clone(), renderer.clone());
    engine.select_model("OpenAI/gpt-4");
    engine.select_interpreter("Plantweb/PlantUML");

    engine.submit("draw", &mut NoopObserver).await.unwrap();
    let report = engine.rerun_llm(&mut NoopObserver).await.unwrap().unwrap();

    assert_eq!(report.prompt, "draw");
    assert_eq!(report.extracted.as_deref(), Some("\nA -> C\n"));
    assert_eq!(backend.call_count(), 2);
    assert_eq!(renderer.call_count(), 2);
    // init, prompt, response, diagram
    assert_eq!(engine.messages().len(), 4);
    assert_eq!(
        engine.messages()[2].text(),
        Some("@startuml\nA -> C\n@enduml")
    );

    // The rerun continues the same log conversation
    let log = read_conversation(&conversation_dirs(dir.path())[0]);
    assert_eq!(
        entry_kinds(&log),
        vec![
            "init_message",
            "user_prompt",
            "llm_response",
            "int_input",
            "int_output",
            "user_prompt",
            "llm_response",
            "int_input",
            "int_output",
        ]
    );
}

#[tokio::test]
async fn test_rerun_interpreter_with_edited_source() {
    let dir = TempDir::new().unwrap();
    let renderer = MockRenderer::new();
    let mut engine = engine_in(
        dir.path(),
        MockBackend::new().with_responses([PLANTUML_REPLY]),
        renderer.clone(),
    );
    engine.select_model("OpenAI/gpt-4");
    engine.select_interpreter("Plantweb/PlantUML");
    engine.submit("draw", &mut NoopObserver).await.unwrap();

    let run = engine
        .rerun_interpreter(Some("Bob -> Alice: hi".to_string()))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(run.input, "@startuml\nBob -> Alice: hi\n@enduml");
    assert_eq!(renderer.recorded_sources().len(), 2);
    assert_eq!(engine.messages().len(), 4);
    assert_eq!(
        engine.messages()[2].extracted_source.as_deref(),
        Some("Bob -> Alice: hi")
    );
}

#[tokio::test]
async fn test_bpmn_flow_assembles_document() {
    let dir = TempDir::new().unwrap();
    let reply = "<bpmn:definitions id=\"x\">\
                 <bpmn:process id=\"order\"><bpmn:startEvent id=\"s\"/></bpmn:process>\
                 </bpmn:definitions>";
    let renderer = MockRenderer::new().with_script(vec![MockRender::Output(RenderOutput::new(
        RenderPayload::Text("<?xml version=\"1.0\"?><svg></svg>".into()),
        "svg",
    ))]);
    let mut engine = engine_in(
        dir.path(),
        MockBackend::new().with_responses([reply]),
        renderer.clone(),
    )
    .with_assembler(Box::new(RegexBpmnAssembler::with_id_generator(|| {
        "fixed".to_string()
    })));
    engine.select_model("Replicate/Llama2-13B");
    engine.select_interpreter("BPMN-Auto-Layout/BPMN-XML");

    let reports = engine.submit("Model an order process", &mut NoopObserver).await.unwrap();
    let run = reports[0].interpreter.as_ref().unwrap();
    assert!(run.is_rendered());

    let sources = renderer.recorded_sources();
    assert_eq!(sources.len(), 1);
    assert!(sources[0].contains("id=\"Definitions_fixed\""));
    assert!(sources[0].contains("<bpmn:process id=\"order\">"));

    let log = read_conversation(&conversation_dirs(dir.path())[0]);
    assert_eq!(log["int_configurations"][0]["interpreter"], "BPMN-Auto-Layout/BPMN-XML");
    let side_files: Vec<String> = std::fs::read_dir(&conversation_dirs(dir.path())[0])
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(side_files.iter().any(|n| n.ends_with("-int-input.xml")));
    assert!(side_files.iter().any(|n| n.ends_with("-int-output.svg")));
}

#[tokio::test]
async fn test_renderer_failures_become_messages() {
    let dir = TempDir::new().unwrap();
    let renderer = MockRenderer::new().with_script(vec![
        MockRender::TransportError("layout service down".into()),
        MockRender::Output(RenderOutput::new(RenderPayload::Text(String::new()), "svg")),
    ]);
    let mut engine = engine_in(
        dir.path(),
        MockBackend::new().with_responses([PLANTUML_REPLY, PLANTUML_REPLY]),
        renderer,
    );
    engine.select_model("OpenAI/gpt-4");
    engine.select_interpreter("Plantweb/PlantUML");

    let reports = engine
        .submit("first\n\\NEWPROMPT\nsecond", &mut NoopObserver)
        .await
        .unwrap();

    // Renderer failures do not stop the batch
    assert_eq!(reports.len(), 2);
    assert!(reports[0].interpreter.as_ref().unwrap().error.is_some());

    let interpreter_texts: Vec<&str> = engine
        .messages()
        .iter()
        .filter(|m| m.format == MessageFormat::InterpreterText)
        .filter_map(|m| m.text())
        .collect();
    assert_eq!(interpreter_texts, vec![INVALID_RESPONSE_TEXT, EMPTY_RESULT_TEXT]);
}

#[tokio::test]
async fn test_clear_history_starts_new_log_conversation() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in(
        dir.path(),
        MockBackend::new().with_responses(["one", "two"]),
        MockRenderer::new(),
    );
    engine.select_model("OpenAI/gpt-4");

    engine.submit("first", &mut NoopObserver).await.unwrap();
    engine.clear_history();
    assert_eq!(engine.messages().len(), 1);

    engine.submit("second", &mut NoopObserver).await.unwrap();

    let dirs = conversation_dirs(dir.path());
    assert_eq!(dirs.len(), 2);
    for dir in &dirs {
        let log = read_conversation(dir);
        assert_eq!(entry_kinds(&log), vec!["init_message", "user_prompt", "llm_response"]);
    }
}
