// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for cmi
//!
//! Handles loading and saving settings from ~/.cmi/settings.json

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod access;
mod io;

pub use access::BackendAccess;

/// Main settings structure, stored in ~/.cmi/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Model backend configurations
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Diagram renderer configurations
    #[serde(default)]
    pub interpreters: InterpretersConfig,

    /// Conversation defaults
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Conversation log sink
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Keys given on the command line, by family id; never saved
    #[serde(skip)]
    pub api_key_overrides: BTreeMap<String, String>,
}

/// Configuration for model backends
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub replicate: ReplicateConfig,

    #[serde(default)]
    pub llama_cpp: LlamaCppConfig,

    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// OpenAI-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAiConfig {
    /// API key (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name for API key
    #[serde(default = "default_openai_api_key_env")]
    pub api_key_env: String,

    /// Base URL for API (for compatible endpoints)
    #[serde(default = "default_openai_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_openai_api_key_env(),
            base_url: default_openai_url(),
        }
    }
}

/// Replicate-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_replicate_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_replicate_url")]
    pub base_url: String,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_replicate_api_key_env(),
            base_url: default_replicate_url(),
        }
    }
}

/// llama.cpp server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlamaCppConfig {
    #[serde(default = "default_llama_cpp_url")]
    pub base_url: String,

    /// Extra models, name to model file path; same names override the built-in paths
    #[serde(default)]
    pub models: BTreeMap<String, String>,
}

impl Default for LlamaCppConfig {
    fn default() -> Self {
        Self {
            base_url: default_llama_cpp_url(),
            models: BTreeMap::new(),
        }
    }
}

/// Ollama configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
        }
    }
}

/// Configuration for renderers
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct InterpretersConfig {
    #[serde(default)]
    pub bpmn: BpmnConfig,

    #[serde(default)]
    pub plantuml: PlantUmlConfig,
}

/// BPMN auto-layout service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BpmnConfig {
    #[serde(default = "default_bpmn_endpoint")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for BpmnConfig {
    fn default() -> Self {
        Self {
            endpoint: default_bpmn_endpoint(),
            api_key: None,
        }
    }
}

/// PlantUML rendering server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantUmlConfig {
    #[serde(default = "default_plantuml_server")]
    pub server: String,
}

impl Default for PlantUmlConfig {
    fn default() -> Self {
        Self {
            server: default_plantuml_server(),
        }
    }
}

/// Conversation defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationConfig {
    /// First assistant message of every conversation
    #[serde(default = "default_init_message")]
    pub init_message: String,

    /// Instruction prefixed to transcripts sent to completion models
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,

    /// Line that separates prompts in a batch
    #[serde(default = "default_batch_delimiter")]
    pub batch_delimiter: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            init_message: default_init_message(),
            system_instruction: default_system_instruction(),
            batch_delimiter: default_batch_delimiter(),
        }
    }
}

/// Conversation log files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Relative paths are resolved against the working directory
    #[serde(default = "default_log_directory")]
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_log_directory(),
        }
    }
}

fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_url() -> String {
    crate::llm::providers::openai::DEFAULT_OPENAI_URL.to_string()
}

fn default_replicate_api_key_env() -> String {
    "REPLICATE_API_TOKEN".to_string()
}

fn default_replicate_url() -> String {
    crate::llm::providers::replicate::DEFAULT_REPLICATE_URL.to_string()
}

fn default_llama_cpp_url() -> String {
    crate::llm::providers::llama_cpp::DEFAULT_LLAMA_CPP_URL.to_string()
}

fn default_ollama_url() -> String {
    crate::llm::providers::ollama::DEFAULT_OLLAMA_URL.to_string()
}

fn default_bpmn_endpoint() -> String {
    crate::interpreter::bpmn::DEFAULT_BPMN_ENDPOINT.to_string()
}

fn default_plantuml_server() -> String {
    crate::interpreter::plantuml::DEFAULT_PLANTUML_SERVER.to_string()
}

fn default_init_message() -> String {
    "How may I assist you today?".to_string()
}

fn default_system_instruction() -> String {
    "You are a helpful assistant. You do not respond as 'user' or pretend to be 'user'. \
     You only respond once as 'assistant'."
        .to_string()
}

fn default_batch_delimiter() -> String {
    "\\NEWPROMPT".to_string()
}

fn default_log_directory() -> String {
    "cmi_logs".to_string()
}

fn default_true() -> bool {
    true
}
