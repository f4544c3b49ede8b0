// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! llama.cpp server backend
//!
//! Talks to a local `llama-server` through its OpenAI-compatible
//! `/v1/completions` route. The request is not streamed: the whole JSON
//! completion is yielded as a single item.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::common::{connect_error, error_from_response};
use crate::error::{ApiError, CmiError, Result};
use crate::llm::backend::{
    Dialogue, ItemStream, ModelBackend, ModelInit, Submission, UnwrapStrategy,
};
use crate::params::ParameterSet;
use crate::registry::ModelFamily;

pub const DEFAULT_LLAMA_CPP_URL: &str = "http://localhost:8080";

/// Turn a model writes when it starts speaking for the user
const STOP_SEQUENCE: &str = "user:";

/// Client for a llama.cpp completion server
pub struct LlamaCppBackend {
    client: Client,
    base_url: String,
    model_path: String,
}

impl Default for LlamaCppBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LlamaCppBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_LLAMA_CPP_URL.to_string(),
            model_path: String::new(),
        }
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    fn build_body(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Value {
        let mut body = json!({
            "model": self.model_path,
            "prompt": dialogue.transcript(),
            "stop": [STOP_SEQUENCE],
            "stream": false,
        });
        if let Some(max) = parameters.get("n_tokens_max").and_then(|v| v.as_i64()) {
            body["max_tokens"] = json!(max);
        }
        if let Some(min) = parameters.get("n_tokens_min").and_then(|v| v.as_i64()) {
            if min > 0 {
                body["min_tokens"] = json!(min);
            }
        }
        for name in ["temperature", "top_p"] {
            if let Some(value) = parameters.get(name).and_then(|v| v.as_f64()) {
                body[name] = json!(value);
            }
        }
        if let Some(top_k) = parameters.get("top_k").and_then(|v| v.as_i64()) {
            body["top_k"] = json!(top_k);
        }
        body
    }
}

#[async_trait]
impl ModelBackend for LlamaCppBackend {
    fn family(&self) -> ModelFamily {
        ModelFamily::LlamaCpp
    }

    async fn initialize(&mut self, init: &ModelInit) -> Result<()> {
        if !init.access.endpoint.is_empty() {
            self.base_url = init.access.endpoint.trim_end_matches('/').to_string();
        }
        self.model_path = init.canonical_id.clone();
        if let Some(n_ctx) = init.parameters.get("n_ctx").and_then(|v| v.as_i64()) {
            tracing::debug!("Context size {} is fixed by the server at load time", n_ctx);
        }
        tracing::info!("llama.cpp backend bound to {}", self.model_path);
        Ok(())
    }

    async fn submit(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Result<Submission> {
        let url = format!("{}/v1/completions", self.base_url);
        let body = self.build_body(dialogue, parameters);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| connect_error(e, "llama.cpp server"))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let text = response.text().await?;
        let completion: Value = serde_json::from_str(&text)
            .map_err(|e| CmiError::Api(ApiError::InvalidResponse(e.to_string())))?;

        let items: ItemStream = Box::pin(futures::stream::once(async move { Ok(completion) }));
        Ok(Submission::new(items, UnwrapStrategy::CompletionEnvelope))
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

    async fn backend_for(server: &MockServer) -> LlamaCppBackend {
        let mut backend = LlamaCppBackend::new();
        backend
            .initialize(&ModelInit {
                model_id: "Llama.cpp/Llama2-13B-GGML".into(),
                canonical_id: "models/llama-2-13b.ggmlv3.q4_0.bin".into(),
                parameters: model_defaults(ModelFamily::LlamaCpp),
                access: BackendAccess::new(None, server.uri()),
            })
            .await
            .unwrap();
        backend
    }

    #[test]
    fn test_body_maps_token_limits() {
        let mut backend = LlamaCppBackend::new();
        backend.model_path = "m.bin".into();
        let mut dialogue = Dialogue::new(None);
        dialogue.push(TurnRole::User, "Hi");
        let body = backend.build_body(&dialogue, &model_defaults(ModelFamily::LlamaCpp));
        assert_eq!(body["model"], "m.bin");
        assert_eq!(body["prompt"], "user: Hi\n\nassistant: ");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["top_k"], 50);
        assert_eq!(body["stop"], json!(["user:"]));
        assert!(body.get("min_tokens").is_none());
        assert!(body.get("n_ctx").is_none());
    }

    #[tokio::test]
    async fn test_single_completion_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/completions"))
            .and(body_partial_json(json!({
                "model": "models/llama-2-13b.ggmlv3.q4_0.bin",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"text": "@startuml\nA -> B\n@enduml", "index": 0}]
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let mut dialogue = Dialogue::new(None);
        dialogue.push(TurnRole::User, "Draw");
        let submission = backend
            .submit(&dialogue, &model_defaults(ModelFamily::LlamaCpp))
            .await
            .unwrap();
        let items: Vec<Value> = submission.items.try_collect().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            UnwrapStrategy::CompletionEnvelope.unwrap(&items[0]),
            "@startuml\nA -> B\n@enduml"
        );
    }

    #[tokio::test]
    async fn test_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let err = backend
            .submit(&Dialogue::new(None), &model_defaults(ModelFamily::LlamaCpp))
            .await
            .err()
            .unwrap();
        assert!(err.is_transport());
    }
}
