// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Ollama local model backend
//!
//! Streams `/api/chat` as newline-delimited JSON and lists installed models
//! from `/api/tags`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::common::{connect_error, error_from_response, ndjson_values};
use crate::error::{ApiError, CmiError, Result};
use crate::llm::backend::{Dialogue, ModelBackend, ModelInit, Submission, UnwrapStrategy};
use crate::params::ParameterSet;
use crate::registry::{ModelFamily, ModelLister};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

const NOT_RUNNING: &str = "Ollama is not running. Start the Ollama app or run 'ollama serve'";

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Ollama chat backend
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaBackend {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model: String::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Value {
        let messages: Vec<Value> = dialogue
            .turns
            .iter()
            .map(|turn| json!({"role": turn.role.as_str(), "content": turn.content}))
            .collect();
        let options: Map<String, Value> = parameters.to_json();
        json!({
            "model": self.model,
            "messages": messages,
            "options": options,
            "stream": true,
        })
    }

    /// Names of the models installed on the server
    pub async fn list_local_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| connect_error(e, NOT_RUNNING))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response.text().await?;
        let tags: TagsResponse = serde_json::from_str(&body)
            .map_err(|e| CmiError::Api(ApiError::InvalidResponse(e.to_string())))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    fn family(&self) -> ModelFamily {
        ModelFamily::Ollama
    }

    async fn initialize(&mut self, init: &ModelInit) -> Result<()> {
        if !init.access.endpoint.is_empty() {
            self.base_url = init.access.endpoint.trim_end_matches('/').to_string();
        }
        self.model = init.canonical_id.clone();
        tracing::info!("Ollama backend bound to {}", self.model);
        Ok(())
    }

    async fn submit(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Result<Submission> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.build_body(dialogue, parameters);
        tracing::debug!("POST {} with {} turns", url, dialogue.len());

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| connect_error(e, NOT_RUNNING))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(Submission::new(
            ndjson_values(response),
            UnwrapStrategy::ChatEnvelope,
        ))
    }
}

#[async_trait]
impl ModelLister for OllamaBackend {
    fn family(&self) -> ModelFamily {
        ModelFamily::Ollama
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        self.list_local_models().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendAccess;
    use crate::llm::backend::TurnRole;
    use crate::params::model_defaults;
    use futures::TryStreamExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend_for(server: &MockServer) -> OllamaBackend {
        let mut backend = OllamaBackend::new();
        backend
            .initialize(&ModelInit {
                model_id: "Ollama/llama3:latest".into(),
                canonical_id: "llama3:latest".into(),
                parameters: model_defaults(ModelFamily::Ollama),
                access: BackendAccess::new(None, server.uri()),
            })
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_ndjson_chat_stream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "llama3:latest",
                "stream": true,
                "options": {"num_ctx": 4096}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
                "{\"message\":{\"role\":\"assistant\",\"content\":\"digraph \"},\"done\":false}\n",
                "{\"message\":{\"role\":\"assistant\",\"content\":\"{a->b}\"},\"done\":false}\n",
                "{\"done\":true}\n",
            )))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let mut dialogue = Dialogue::new(None);
        dialogue.push(TurnRole::User, "graph please");
        let submission = backend
            .submit(&dialogue, &model_defaults(ModelFamily::Ollama))
            .await
            .unwrap();
        assert_eq!(submission.unwrap, UnwrapStrategy::ChatEnvelope);
        let items: Vec<Value> = submission.items.try_collect().await.unwrap();
        let text: String = items
            .iter()
            .map(|i| UnwrapStrategy::ChatEnvelope.unwrap(i))
            .collect();
        assert_eq!(text, "digraph {a->b}");
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{"name": "llama3:latest"}, {"name": "mistral:7b"}]
            })))
            .mount(&server)
            .await;

        let backend = OllamaBackend::with_base_url(server.uri());
        let names = backend.list_models().await.unwrap();
        assert_eq!(names, vec!["llama3:latest", "mistral:7b"]);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let backend = OllamaBackend::with_base_url("http://127.0.0.1:9");
        let err = backend.list_local_models().await.unwrap_err();
        assert!(err.is_transport());
    }
}
