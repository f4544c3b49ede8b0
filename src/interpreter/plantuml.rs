// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! PlantUML server renderer
//!
//! Renders PlantUML, Graphviz and DITAA source through a PlantUML server.
//! The source is deflated and encoded with PlantUML's URL alphabet, then
//! fetched as `GET {server}/{svg|png}/{encoded}`.

use async_trait::async_trait;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use super::renderer::{RenderOutput, RenderPayload, Renderer, RendererInit};
use super::DiagramSyntax;
use crate::error::{ApiError, CmiError, Result};
use crate::params::ParameterSet;
use crate::registry::InterpreterFamily;

pub const DEFAULT_PLANTUML_SERVER: &str = "https://www.plantuml.com/plantuml";

const PLANTUML_ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

/// Encode diagram source the way PlantUML servers expect it in the URL
pub fn encode_source(source: &str) -> Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(encode64(&compressed))
}

fn encode64(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(3) {
        let b1 = chunk[0];
        let b2 = chunk.get(1).copied().unwrap_or(0);
        let b3 = chunk.get(2).copied().unwrap_or(0);
        let indices = [
            b1 >> 2,
            ((b1 & 0x3) << 4) | (b2 >> 4),
            ((b2 & 0xF) << 2) | (b3 >> 6),
            b3 & 0x3F,
        ];
        for i in indices {
            out.push(PLANTUML_ALPHABET[i as usize] as char);
        }
    }
    out
}

/// Add the DITAA engine directives when the source lacks them
fn with_engine_directives(syntax: DiagramSyntax, source: &str) -> String {
    match syntax {
        DiagramSyntax::Ditaa if !source.contains("@startditaa") => {
            let mut wrapped = format!("@startditaa\n{}", source);
            if !source.contains("@endditaa") {
                wrapped.push_str("\n@endditaa");
            }
            wrapped
        }
        _ => source.to_string(),
    }
}

fn cache_key(format: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format.as_bytes());
    hasher.update([0u8]);
    hasher.update(source.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Renderer backed by a PlantUML server
pub struct PlantUmlRenderer {
    client: Client,
    server: String,
    syntax: DiagramSyntax,
    cache: Mutex<HashMap<String, Vec<u8>>>,
}

impl Default for PlantUmlRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PlantUmlRenderer {
    pub fn new() -> Self {
        Self::with_server(DEFAULT_PLANTUML_SERVER)
    }

    pub fn with_server(server: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            server: server.into().trim_end_matches('/').to_string(),
            syntax: DiagramSyntax::PlantUml,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// URL for rendering `source` in `format`
    pub fn render_url(&self, format: &str, source: &str) -> Result<String> {
        Ok(format!("{}/{}/{}", self.server, format, encode_source(source)?))
    }

    fn cached(&self, key: &str) -> Option<Vec<u8>> {
        let cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Render cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        cache.get(key).cloned()
    }

    fn store(&self, key: String, bytes: Vec<u8>) {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Render cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        cache.insert(key, bytes);
    }
}

#[async_trait]
impl Renderer for PlantUmlRenderer {
    fn family(&self) -> InterpreterFamily {
        InterpreterFamily::Plantweb
    }

    async fn initialize(&mut self, init: &RendererInit) -> Result<()> {
        self.syntax = init.syntax;
        if !init.access.endpoint.is_empty() {
            self.server = init.access.endpoint.trim_end_matches('/').to_string();
        }
        tracing::info!(
            "PlantUML renderer for {} via {}",
            init.interpreter_id,
            self.server
        );
        Ok(())
    }

    async fn render(
        &self,
        source: &str,
        parameters: &ParameterSet,
    ) -> Result<Option<RenderOutput>> {
        let format = parameters
            .get("Output format")
            .and_then(|v| v.as_str())
            .unwrap_or("SVG")
            .to_lowercase();
        let use_cache = parameters
            .get("Use cache")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let source = with_engine_directives(self.syntax, source);
        let key = cache_key(&format, &source);
        if use_cache {
            if let Some(bytes) = self.cached(&key) {
                tracing::debug!("Render cache hit");
                return Ok(Some(RenderOutput::new(RenderPayload::Bytes(bytes), format)));
            }
        }

        let url = self.render_url(&format, &source)?;
        tracing::debug!("Rendering {} via {}", self.syntax, url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CmiError::Api(ApiError::ServerError {
                status: status.as_u16(),
                message: body,
            }));
        }

        let bytes = response.bytes().await?.to_vec();
        if use_cache {
            self.store(key, bytes.clone());
        }
        Ok(Some(RenderOutput::new(RenderPayload::Bytes(bytes), format)))
    }
}
