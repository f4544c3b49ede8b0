// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI chat completions backend
//!
//! Streams `chat/completions` over SSE. Each `data:` payload is one item,
//! unwrapped with the chat-delta strategy.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};

use super::common::{connect_error, error_from_response, sse_events};
use crate::error::{ApiError, CmiError, Result};
use crate::llm::backend::{
    Dialogue, ItemStream, ModelBackend, ModelInit, Submission, UnwrapStrategy,
};
use crate::params::ParameterSet;
use crate::registry::ModelFamily;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat backend
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl Default for OpenAiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenAiBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            model: String::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_body(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Value {
        let messages: Vec<Value> = dialogue
            .turns
            .iter()
            .map(|turn| json!({"role": turn.role.as_str(), "content": turn.content}))
            .collect();

        let mut body = parameters.to_json();
        body.insert("model".into(), Value::String(self.model.clone()));
        body.insert("messages".into(), Value::Array(messages));
        body.insert("stream".into(), Value::Bool(true));
        Value::Object(body)
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    fn family(&self) -> ModelFamily {
        ModelFamily::OpenAi
    }

    async fn initialize(&mut self, init: &ModelInit) -> Result<()> {
        if !init.access.endpoint.is_empty() {
            self.base_url = init.access.endpoint.trim_end_matches('/').to_string();
        }
        self.api_key = init.access.api_key.clone();
        if self.api_key.is_none() {
            tracing::warn!("No OpenAI API key configured; requests will be rejected");
        }
        self.model = init.canonical_id.clone();
        tracing::info!("OpenAI backend bound to {}", self.model);
        Ok(())
    }

    async fn submit(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Result<Submission> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(dialogue, parameters);
        tracing::debug!("POST {} with {} turns", url, dialogue.len());

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| connect_error(e, "OpenAI"))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let mut events = sse_events(response);
        let items: ItemStream = Box::pin(async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = event?;
                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    break;
                }
                let item: Value = serde_json::from_str(data).map_err(|e| {
                    CmiError::Api(ApiError::InvalidResponse(e.to_string()))
                })?;
                yield item;
            }
        });

        Ok(Submission::new(items, UnwrapStrategy::ChatDelta))
    }
}
