// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock renderer for testing
//!
//! Returns scripted outputs and records every source it was asked to render.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::renderer::{RenderOutput, RenderPayload, Renderer, RendererInit};
use crate::error::{ApiError, CmiError, Result};
use crate::params::ParameterSet;
use crate::registry::InterpreterFamily;

/// One scripted renderer reaction
#[derive(Debug, Clone)]
pub enum MockRender {
    Output(RenderOutput),
    /// The renderer produced nothing
    Nothing,
    /// A transport failure
    TransportError(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock renderer lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// A mock renderer; clones share state
#[derive(Clone)]
pub struct MockRenderer {
    family: InterpreterFamily,
    script: Arc<Mutex<Vec<MockRender>>>,
    call_count: Arc<AtomicUsize>,
    recorded_sources: Arc<Mutex<Vec<String>>>,
    initializations: Arc<Mutex<Vec<RendererInit>>>,
}

impl Default for MockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRenderer {
    /// Renders every input as a small SVG
    pub fn new() -> Self {
        Self {
            family: InterpreterFamily::Plantweb,
            script: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_sources: Arc::new(Mutex::new(Vec::new())),
            initializations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_family(mut self, family: InterpreterFamily) -> Self {
        self.family = family;
        self
    }

    /// Queue reactions, consumed in order; once exhausted the default SVG is returned
    pub fn with_script(self, script: Vec<MockRender>) -> Self {
        *lock(&self.script) = script;
        self
    }

    /// Fail every call with a transport error
    pub fn failing(self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.with_script(vec![MockRender::TransportError(message); 64])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn recorded_sources(&self) -> Vec<String> {
        lock(&self.recorded_sources).clone()
    }

    pub fn initializations(&self) -> Vec<RendererInit> {
        lock(&self.initializations).clone()
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    fn family(&self) -> InterpreterFamily {
        self.family
    }

    async fn initialize(&mut self, init: &RendererInit) -> Result<()> {
        lock(&self.initializations).push(init.clone());
        Ok(())
    }

    async fn render(
        &self,
        source: &str,
        _parameters: &ParameterSet,
    ) -> Result<Option<RenderOutput>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.recorded_sources).push(source.to_string());

        let next = {
            let mut script = lock(&self.script);
            if script.is_empty() {
                None
            } else {
                Some(script.remove(0))
            }
        };

        match next {
            Some(MockRender::Output(output)) => Ok(Some(output)),
            Some(MockRender::Nothing) => Ok(None),
            Some(MockRender::TransportError(message)) => {
                Err(CmiError::Api(ApiError::Network(message)))
            }
            None => Ok(Some(RenderOutput::new(
                RenderPayload::Bytes(format!("<svg><!-- {} --></svg>", source.len()).into_bytes()),
                "svg",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_output_is_svg() {
        let renderer = MockRenderer::new();
        let output = renderer
            .render("abc", &ParameterSet::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(output.format, "svg");
        assert_eq!(renderer.call_count(), 1);
        assert_eq!(renderer.recorded_sources(), vec!["abc".to_string()]);
    }

    #[tokio::test]
    async fn test_script_order() {
        let renderer = MockRenderer::new().with_script(vec![
            MockRender::Nothing,
            MockRender::TransportError("down".into()),
        ]);
        let params = ParameterSet::new();
        assert!(renderer.render("a", &params).await.unwrap().is_none());
        assert!(renderer.render("b", &params).await.unwrap_err().is_transport());
        assert!(renderer.render("c", &params).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let renderer = MockRenderer::new();
        let observer = renderer.clone();
        renderer.render("x", &ParameterSet::new()).await.unwrap();
        assert_eq!(observer.call_count(), 1);
    }
}
