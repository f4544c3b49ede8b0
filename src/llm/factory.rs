// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Backend factory
//!
//! Centralizes construction of model backends, renderers and live model
//! listers so the engine only ever deals in family tags.

use crate::config::BackendAccess;
use crate::error::Result;
use crate::interpreter::bpmn::BpmnRenderer;
use crate::interpreter::plantuml::PlantUmlRenderer;
use crate::interpreter::Renderer;
use crate::llm::backend::ModelBackend;
use crate::llm::providers::{LlamaCppBackend, OllamaBackend, OpenAiBackend, ReplicateBackend};
use crate::registry::{InterpreterFamily, ModelFamily, ModelLister};

/// Creates uninitialized clients for a family
pub trait BackendFactory: Send + Sync {
    fn create_model_backend(&self, family: ModelFamily) -> Result<Box<dyn ModelBackend>>;

    fn create_renderer(&self, family: InterpreterFamily) -> Result<Box<dyn Renderer>>;

    /// A lister for families whose catalog is queried live, `None` otherwise
    fn model_lister(
        &self,
        family: ModelFamily,
        access: &BackendAccess,
    ) -> Option<Box<dyn ModelLister>>;
}

/// Factory producing the real HTTP clients
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpBackendFactory;

impl HttpBackendFactory {
    pub fn new() -> Self {
        Self
    }
}

impl BackendFactory for HttpBackendFactory {
    fn create_model_backend(&self, family: ModelFamily) -> Result<Box<dyn ModelBackend>> {
        let backend: Box<dyn ModelBackend> = match family {
            ModelFamily::OpenAi => Box::new(OpenAiBackend::new()),
            ModelFamily::Replicate => Box::new(ReplicateBackend::new()),
            ModelFamily::LlamaCpp => Box::new(LlamaCppBackend::new()),
            ModelFamily::Ollama => Box::new(OllamaBackend::new()),
        };
        Ok(backend)
    }

    fn create_renderer(&self, family: InterpreterFamily) -> Result<Box<dyn Renderer>> {
        let renderer: Box<dyn Renderer> = match family {
            InterpreterFamily::BpmnAutoLayout => Box::new(BpmnRenderer::new()),
            InterpreterFamily::Plantweb => Box::new(PlantUmlRenderer::new()),
        };
        Ok(renderer)
    }

    fn model_lister(
        &self,
        family: ModelFamily,
        access: &BackendAccess,
    ) -> Option<Box<dyn ModelLister>> {
        match family {
            ModelFamily::Ollama => Some(Box::new(OllamaBackend::with_base_url(
                access.endpoint.trim_end_matches('/'),
            ))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_families_match() {
        let factory = HttpBackendFactory::new();
        for family in ModelFamily::ALL {
            let backend = factory.create_model_backend(family).unwrap();
            assert_eq!(backend.family(), family);
        }
    }

    #[test]
    fn test_renderer_families_match() {
        let factory = HttpBackendFactory::new();
        for family in InterpreterFamily::ALL {
            let renderer = factory.create_renderer(family).unwrap();
            assert_eq!(renderer.family(), family);
        }
    }

    #[test]
    fn test_only_live_catalogs_have_listers() {
        let factory = HttpBackendFactory::new();
        let access = BackendAccess::new(None, "http://localhost:11434/");
        for family in ModelFamily::ALL {
            let lister = factory.model_lister(family, &access);
            assert_eq!(lister.is_some(), family.has_live_catalog());
        }
    }
}
