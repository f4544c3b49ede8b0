// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! JSON file conversation log
//!
//! One directory per conversation, `<root>/cmi-<yymmdd-HHMMSS>/`, holding
//! `<id>.json` with the arrays `llm_configurations`, `int_configurations`
//! and `conversation`, plus one raw side file per prompt, response and
//! interpreter exchange.

use chrono::{Local, Utc};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{ConversationLog, LogEvent};
use crate::error::Result;
use crate::interpreter::RenderPayload;
use crate::params::ParameterSet;

const LLM_CONFIG_LIST: &str = "llm_configurations";
const INT_CONFIG_LIST: &str = "int_configurations";
const CONVERSATION: &str = "conversation";

const PNG_MAGIC: &[u8] = b"\x89PNG";

/// State of the conversation currently being written
#[derive(Debug)]
struct ConversationFile {
    id: String,
    directory: PathBuf,
    file: PathBuf,
    init_message: String,
    message_id: u64,
    last_model: Option<(String, String)>,
    last_interpreter: Option<(String, String)>,
}

/// Writes conversations below a root directory
#[derive(Debug)]
pub struct JsonFileLog {
    root: PathBuf,
    current: Option<ConversationFile>,
}

fn timestamp() -> String {
    Local::now().format("%y%m%d-%H%M%S").to_string()
}

fn unix_time() -> i64 {
    Utc::now().timestamp()
}

/// File extension for a raw payload
pub(crate) fn file_extension(data: &[u8], format: Option<&str>) -> &'static str {
    let head = String::from_utf8_lossy(&data[..data.len().min(512)]);
    let head = head.trim_start();
    let is_markup = head.starts_with("<?xml") || head.starts_with("<svg");
    if is_markup && String::from_utf8_lossy(data).contains("<svg") {
        "svg"
    } else if head.starts_with("<?xml") {
        "xml"
    } else if data.starts_with(PNG_MAGIC) || format.is_some_and(|f| f.eq_ignore_ascii_case("png")) {
        "png"
    } else {
        "txt"
    }
}

impl JsonFileLog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the current conversation
    pub fn conversation_dir(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.directory.as_path())
    }

    /// JSON file of the current conversation
    pub fn conversation_file(&self) -> Option<&Path> {
        self.current.as_ref().map(|c| c.file.as_path())
    }

    fn open_conversation(&self, init_message: &str) -> ConversationFile {
        let base = format!("cmi-{}", timestamp());
        let mut id = base.clone();
        let mut n = 2;
        while self.root.join(&id).exists() {
            id = format!("{}-{}", base, n);
            n += 1;
        }
        let directory = self.root.join(&id);
        let file = directory.join(format!("{}.json", id));
        ConversationFile {
            id,
            directory,
            file,
            init_message: init_message.to_string(),
            message_id: 0,
            last_model: None,
            last_interpreter: None,
        }
    }

    fn handle(&mut self, event: LogEvent) -> Result<()> {
        let Some(conv) = self.current.as_mut() else {
            tracing::debug!("Conversation log event before start, ignoring");
            return Ok(());
        };

        match event {
            LogEvent::ModelConfiguration {
                model_id,
                parameters,
            } => {
                let config = config_json(&parameters);
                let key = (model_id.clone(), config.to_string());
                if conv.last_model.as_ref() != Some(&key) {
                    conv.last_model = Some(key);
                    let entry = json!({
                        "timestamp": unix_time(),
                        "message_id": conv.message_id + 1,
                        "llm": model_id,
                        "llm_configuration": config,
                    });
                    append_entry(&conv.file, LLM_CONFIG_LIST, entry)?;
                }
            }
            LogEvent::InterpreterConfiguration {
                interpreter_id,
                parameters,
            } => {
                let config = config_json(&parameters);
                let key = (interpreter_id.clone(), config.to_string());
                if conv.last_interpreter.as_ref() != Some(&key) {
                    conv.last_interpreter = Some(key);
                    let entry = json!({
                        "timestamp": unix_time(),
                        "message_id": conv.message_id + 1,
                        "interpreter": interpreter_id,
                        "int_configuration": config,
                    });
                    append_entry(&conv.file, INT_CONFIG_LIST, entry)?;
                }
            }
            LogEvent::Prompt(prompt) => {
                if conv.message_id == 0 {
                    let entry = json!({
                        "timestamp": unix_time(),
                        "message_id": 0,
                        "init_message": conv.init_message,
                    });
                    append_entry(&conv.file, CONVERSATION, entry)?;
                }
                conv.message_id += 1;
                let entry = json!({
                    "timestamp": unix_time(),
                    "message_id": conv.message_id,
                    "user_prompt": prompt,
                });
                append_entry(&conv.file, CONVERSATION, entry)?;
                write_side_file(conv, "llm-prompt", "txt", prompt.as_bytes())?;
            }
            LogEvent::Response { text, duration } => {
                conv.message_id += 1;
                let entry = json!({
                    "timestamp": unix_time(),
                    "message_id": conv.message_id,
                    "execution_duration_s": seconds(duration),
                    "llm_response": text.trim(),
                });
                append_entry(&conv.file, CONVERSATION, entry)?;
                write_side_file(conv, "llm-response", "txt", text.as_bytes())?;
            }
            LogEvent::InterpreterInput(input) => {
                conv.message_id += 1;
                let entry = json!({
                    "timestamp": unix_time(),
                    "message_id": conv.message_id,
                    "int_input": input,
                });
                append_entry(&conv.file, CONVERSATION, entry)?;
                let ext = file_extension(input.as_bytes(), None);
                write_side_file(conv, "int-input", ext, input.as_bytes())?;
            }
            LogEvent::InterpreterOutput {
                payload,
                format,
                duration,
            } => {
                conv.message_id += 1;
                let ext = file_extension(payload.as_bytes(), Some(&format));
                let side_file = write_side_file(conv, "int-output", ext, payload.as_bytes())?;
                let mut entry = Map::new();
                entry.insert("timestamp".into(), json!(unix_time()));
                entry.insert("message_id".into(), json!(conv.message_id));
                entry.insert("execution_duration_s".into(), json!(seconds(duration)));
                match text_of(&payload) {
                    Some(text) => entry.insert("int_output".into(), json!(text)),
                    None => entry.insert("int_output_file".into(), json!(side_file)),
                };
                append_entry(&conv.file, CONVERSATION, Value::Object(entry))?;
            }
            LogEvent::Annotation(message) => {
                conv.message_id += 1;
                let entry = json!({
                    "timestamp": unix_time(),
                    "message_id": conv.message_id,
                    "message": message,
                });
                append_entry(&conv.file, CONVERSATION, entry)?;
            }
        }
        Ok(())
    }
}

impl ConversationLog for JsonFileLog {
    fn start_conversation(&mut self, init_message: &str) {
        let conv = self.open_conversation(init_message);
        tracing::debug!("Logging conversation {} to {}", conv.id, conv.directory.display());
        self.current = Some(conv);
    }

    fn record(&mut self, event: LogEvent) {
        if let Err(e) = self.handle(event) {
            tracing::warn!("Failed to write conversation log: {}", e);
        }
    }
}

fn seconds(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

fn config_json(parameters: &ParameterSet) -> Value {
    Value::Object(parameters.to_json())
}

fn text_of(payload: &RenderPayload) -> Option<&str> {
    match payload {
        RenderPayload::Text(text) => Some(text),
        RenderPayload::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
    }
}

fn empty_log() -> Value {
    json!({
        LLM_CONFIG_LIST: [],
        INT_CONFIG_LIST: [],
        CONVERSATION: [],
    })
}

/// Append `entry` to the array `key` of the JSON log file, creating it if needed
fn append_entry(file: &Path, key: &str, entry: Value) -> Result<()> {
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut data = if file.exists() {
        serde_json::from_str(&std::fs::read_to_string(file)?)?
    } else {
        empty_log()
    };
    match data.get_mut(key).and_then(Value::as_array_mut) {
        Some(list) => list.push(entry),
        None => {
            if let Some(obj) = data.as_object_mut() {
                obj.insert(key.to_string(), Value::Array(vec![entry]));
            }
        }
    }
    std::fs::write(file, serde_json::to_string_pretty(&data)?)?;
    Ok(())
}

fn write_side_file(conv: &ConversationFile, kind: &str, ext: &str, data: &[u8]) -> Result<String> {
    std::fs::create_dir_all(&conv.directory)?;
    let name = format!("cmi-{}-{}-{}.{}", timestamp(), conv.message_id, kind, ext);
    std::fs::write(conv.directory.join(&name), data)?;
    Ok(name)
}
