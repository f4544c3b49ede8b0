// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Renderer trait and output types

use async_trait::async_trait;
use serde::Serialize;

use super::DiagramSyntax;
use crate::config::BackendAccess;
use crate::error::Result;
use crate::params::ParameterSet;
use crate::registry::InterpreterFamily;

/// What a renderer needs to know about the selected interpreter
#[derive(Debug, Clone)]
pub struct RendererInit {
    pub interpreter_id: String,
    pub syntax: DiagramSyntax,
    pub parameters: ParameterSet,
    pub access: BackendAccess,
}

/// Rendered payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RenderPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl RenderPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            RenderPayload::Text(t) => t.is_empty(),
            RenderPayload::Bytes(b) => b.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RenderPayload::Text(t) => t.len(),
            RenderPayload::Bytes(b) => b.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            RenderPayload::Text(t) => t.as_bytes(),
            RenderPayload::Bytes(b) => b,
        }
    }
}

/// Raw renderer result: a payload plus its format tag (`svg`, `png`)
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub payload: RenderPayload,
    pub format: String,
}

impl RenderOutput {
    pub fn new(payload: RenderPayload, format: impl Into<String>) -> Self {
        Self {
            payload,
            format: format.into(),
        }
    }
}

/// Decode SVG byte payloads as UTF-8 text, leave everything else as returned
pub fn finalize_output(output: RenderOutput) -> RenderPayload {
    match output.payload {
        RenderPayload::Bytes(bytes) if output.format.eq_ignore_ascii_case("svg") => {
            RenderPayload::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
        payload => payload,
    }
}

/// A diagram rendering backend
#[async_trait]
pub trait Renderer: Send + Sync {
    fn family(&self) -> InterpreterFamily;

    /// Bind the renderer to the selected interpreter
    async fn initialize(&mut self, init: &RendererInit) -> Result<()>;

    /// Render normalized source.
    ///
    /// `Ok(None)` means the renderer produced nothing at all, which is not the
    /// same as an empty payload.
    async fn render(&self, source: &str, parameters: &ParameterSet)
        -> Result<Option<RenderOutput>>;
}
