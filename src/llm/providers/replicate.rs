// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Replicate prediction backend
//!
//! A submission creates a streaming prediction, then follows its
//! `urls.stream` SSE feed. `output` events carry bare text fragments.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::common::{connect_error, error_from_response, sse_events};
use crate::error::{ApiError, CmiError, Result};
use crate::llm::backend::{
    Dialogue, ItemStream, ModelBackend, ModelInit, Submission, UnwrapStrategy,
};
use crate::params::ParameterSet;
use crate::registry::ModelFamily;

pub const DEFAULT_REPLICATE_URL: &str = "https://api.replicate.com/v1";

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    urls: PredictionUrls,
}

#[derive(Debug, Default, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    stream: Option<String>,
}

/// Version hash of an `owner/model:version` reference; a bare hash is returned as is
pub fn version_of(canonical_id: &str) -> &str {
    canonical_id
        .rsplit_once(':')
        .map(|(_, version)| version)
        .unwrap_or(canonical_id)
}

/// Replicate text-completion backend
pub struct ReplicateBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    version: String,
}

impl Default for ReplicateBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicateBackend {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_REPLICATE_URL.to_string(),
            api_key: None,
            version: String::new(),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn build_body(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Value {
        let mut input = parameters.to_json();
        input.insert("prompt".into(), Value::String(dialogue.transcript()));
        json!({
            "version": self.version,
            "input": input,
            "stream": true,
        })
    }

    async fn create_prediction(&self, body: &Value) -> Result<Prediction> {
        let url = format!("{}/predictions", self.base_url);
        tracing::debug!("POST {}", url);
        let mut request = self.client.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| connect_error(e, "Replicate"))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| CmiError::Api(ApiError::InvalidResponse(e.to_string())))
    }
}

#[async_trait]
impl ModelBackend for ReplicateBackend {
    fn family(&self) -> ModelFamily {
        ModelFamily::Replicate
    }

    async fn initialize(&mut self, init: &ModelInit) -> Result<()> {
        if !init.access.endpoint.is_empty() {
            self.base_url = init.access.endpoint.trim_end_matches('/').to_string();
        }
        self.api_key = init.access.api_key.clone();
        if self.api_key.is_none() {
            tracing::warn!("No Replicate API token configured; requests will be rejected");
        }
        self.version = version_of(&init.canonical_id).to_string();
        tracing::info!("Replicate backend bound to version {}", self.version);
        Ok(())
    }

    async fn submit(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Result<Submission> {
        let body = self.build_body(dialogue, parameters);
        let prediction = self.create_prediction(&body).await?;
        let stream_url = prediction.urls.stream.ok_or_else(|| {
            CmiError::Api(ApiError::InvalidResponse(format!(
                "prediction {} has no stream url",
                prediction.id
            )))
        })?;
        tracing::debug!("Following prediction {} at {}", prediction.id, stream_url);

        let mut request = self
            .client
            .get(&stream_url)
            .header("Accept", "text/event-stream")
            .header("Cache-Control", "no-store");
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| connect_error(e, "Replicate stream"))?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let mut events = sse_events(response);
        let items: ItemStream = Box::pin(async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = event?;
                match event.event.as_str() {
                    "output" => yield Value::String(event.data),
                    "error" => {
                        Err(CmiError::Api(ApiError::StreamError(event.data)))?;
                    }
                    "done" => break,
                    other => tracing::debug!("Ignoring Replicate event {}", other),
                }
            }
        });

        Ok(Submission::new(items, UnwrapStrategy::PlainText))
    }
}
