// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! BPMN auto-layout renderer
//!
//! Posts an assembled BPMN document to a layout service that answers with
//! JSON containing the laid-out diagram as SVG.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::renderer::{RenderOutput, RenderPayload, Renderer, RendererInit};
use crate::error::{ApiError, CmiError, Result};
use crate::params::ParameterSet;
use crate::registry::InterpreterFamily;

pub const DEFAULT_BPMN_ENDPOINT: &str = "http://172.17.0.1:3000/process-diagram";

#[derive(Debug, Deserialize)]
struct LayoutResponse {
    #[serde(default)]
    svg: Option<String>,
}

/// Renderer backed by a BPMN auto-layout service
pub struct BpmnRenderer {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl Default for BpmnRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl BpmnRenderer {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_BPMN_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Renderer for BpmnRenderer {
    fn family(&self) -> InterpreterFamily {
        InterpreterFamily::BpmnAutoLayout
    }

    async fn initialize(&mut self, init: &RendererInit) -> Result<()> {
        if !init.access.endpoint.is_empty() {
            self.endpoint = init.access.endpoint.clone();
        }
        self.api_key = init.access.api_key.clone();
        tracing::info!("BPMN layout endpoint {}", self.endpoint);
        Ok(())
    }

    async fn render(
        &self,
        source: &str,
        _parameters: &ParameterSet,
    ) -> Result<Option<RenderOutput>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/plain")
            .body(source.to_string());
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CmiError::Api(ApiError::ServerError {
                status: status.as_u16(),
                message: body,
            }));
        }

        let body = response.text().await?;
        let parsed: LayoutResponse = serde_json::from_str(&body)
            .map_err(|e| CmiError::Api(ApiError::InvalidResponse(e.to_string())))?;

        Ok(Some(RenderOutput::new(
            RenderPayload::Text(parsed.svg.unwrap_or_default()),
            "svg",
        )))
    }
}
