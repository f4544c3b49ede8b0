// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model and interpreter registry
//!
//! The registry is an explicit configuration object handed to the engine at
//! construction. It maps full ids such as `OpenAI/gpt-4` to a backend family
//! by prefix and to the backend's own canonical identifier. The only mutation
//! after construction is a one-shot merge of a live model list from a local
//! runtime.

mod catalog;

pub use catalog::qualified_id;

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;

use crate::config::Settings;
use crate::error::{CmiError, Result};
use crate::interpreter::DiagramSyntax;
use crate::llm::UnwrapStrategy;

/// Whether a family is reached through a hosted API or a local runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FamilyKind {
    Api,
    LocalRuntime,
}

/// LLM backend families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ModelFamily {
    OpenAi,
    Replicate,
    LlamaCpp,
    Ollama,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::OpenAi,
        ModelFamily::Replicate,
        ModelFamily::LlamaCpp,
        ModelFamily::Ollama,
    ];

    /// Family identifier, also the prefix of every model id in the family
    pub fn id(&self) -> &'static str {
        match self {
            ModelFamily::OpenAi => "OpenAI",
            ModelFamily::Replicate => "Replicate",
            ModelFamily::LlamaCpp => "Llama.cpp",
            ModelFamily::Ollama => "Ollama",
        }
    }

    pub fn kind(&self) -> FamilyKind {
        match self {
            ModelFamily::OpenAi | ModelFamily::Replicate => FamilyKind::Api,
            ModelFamily::LlamaCpp | ModelFamily::Ollama => FamilyKind::LocalRuntime,
        }
    }

    /// How text is pulled out of each streamed item of this family
    pub fn unwrap_strategy(&self) -> UnwrapStrategy {
        match self {
            ModelFamily::OpenAi => UnwrapStrategy::ChatDelta,
            ModelFamily::Replicate => UnwrapStrategy::PlainText,
            ModelFamily::LlamaCpp => UnwrapStrategy::CompletionEnvelope,
            ModelFamily::Ollama => UnwrapStrategy::ChatEnvelope,
        }
    }

    /// Chat families take structured turns; the others take a rendered transcript.
    pub fn is_chat(&self) -> bool {
        matches!(self, ModelFamily::OpenAi | ModelFamily::Ollama)
    }

    /// Whether the model list can be queried from a running server
    pub fn has_live_catalog(&self) -> bool {
        matches!(self, ModelFamily::Ollama)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Diagram rendering families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InterpreterFamily {
    BpmnAutoLayout,
    Plantweb,
}

impl InterpreterFamily {
    pub const ALL: [InterpreterFamily; 2] =
        [InterpreterFamily::BpmnAutoLayout, InterpreterFamily::Plantweb];

    pub fn id(&self) -> &'static str {
        match self {
            InterpreterFamily::BpmnAutoLayout => "BPMN-Auto-Layout",
            InterpreterFamily::Plantweb => "Plantweb",
        }
    }

    /// API-backed interpreters call a configurable rendering service
    pub fn kind(&self) -> FamilyKind {
        match self {
            InterpreterFamily::BpmnAutoLayout => FamilyKind::Api,
            InterpreterFamily::Plantweb => FamilyKind::LocalRuntime,
        }
    }
}

impl fmt::Display for InterpreterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A selectable model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub family: ModelFamily,
    pub canonical_id: String,
}

/// A selectable interpreter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpreterDescriptor {
    pub id: String,
    pub family: InterpreterFamily,
    pub syntax: DiagramSyntax,
    /// Rendering service endpoint
    pub endpoint: Option<String>,
}

/// Something that can list the models installed on a local runtime
#[async_trait]
pub trait ModelLister: Send + Sync {
    fn family(&self) -> ModelFamily;

    async fn list_models(&self) -> Result<Vec<String>>;
}

/// Check that no family id is a prefix of another, so prefix dispatch is unambiguous
pub fn validate_family_ids(ids: &[&str]) -> Result<()> {
    for (i, a) in ids.iter().enumerate() {
        for (j, b) in ids.iter().enumerate() {
            if i != j && b.starts_with(*a) {
                return Err(CmiError::Config(format!(
                    "Family id '{}' is a prefix of '{}'",
                    a, b
                )));
            }
        }
    }
    Ok(())
}

fn longest_prefix<T: Copy>(id: &str, candidates: impl Iterator<Item = (&'static str, T)>) -> Option<T> {
    candidates
        .filter(|(prefix, _)| id.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, family)| family)
}

/// The catalog of selectable models and interpreters
#[derive(Debug, Clone)]
pub struct Registry {
    models: Vec<ModelDescriptor>,
    interpreters: Vec<InterpreterDescriptor>,
    requeried: Vec<ModelFamily>,
}

impl Registry {
    /// Build a registry from descriptor lists, validating the family ids
    pub fn new(
        models: Vec<ModelDescriptor>,
        interpreters: Vec<InterpreterDescriptor>,
    ) -> Result<Self> {
        let model_ids: Vec<&str> = ModelFamily::ALL.iter().map(|f| f.id()).collect();
        validate_family_ids(&model_ids)?;
        let interpreter_ids: Vec<&str> = InterpreterFamily::ALL.iter().map(|f| f.id()).collect();
        validate_family_ids(&interpreter_ids)?;

        Ok(Self {
            models,
            interpreters,
            requeried: Vec::new(),
        })
    }

    /// The built-in catalog with default endpoints
    pub fn builtin() -> Result<Self> {
        Self::from_settings(&Settings::default())
    }

    /// The built-in catalog plus the models and endpoints configured in settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut models: Vec<ModelDescriptor> = catalog::BUILTIN_MODELS
            .iter()
            .map(|(family, name, canonical)| ModelDescriptor {
                id: qualified_id(family.id(), name),
                family: *family,
                canonical_id: canonical.to_string(),
            })
            .collect();

        for (name, path) in &settings.providers.llama_cpp.models {
            let id = qualified_id(ModelFamily::LlamaCpp.id(), name);
            match models.iter_mut().find(|m| m.id == id) {
                Some(existing) => existing.canonical_id = path.clone(),
                None => models.push(ModelDescriptor {
                    id,
                    family: ModelFamily::LlamaCpp,
                    canonical_id: path.clone(),
                }),
            }
        }

        let interpreters = catalog::BUILTIN_INTERPRETERS
            .iter()
            .map(|(family, name, syntax)| InterpreterDescriptor {
                id: qualified_id(family.id(), name),
                family: *family,
                syntax: *syntax,
                endpoint: Some(settings.interpreter_endpoint(*family)),
            })
            .collect();

        Self::new(models, interpreters)
    }

    pub fn families(&self) -> &'static [ModelFamily] {
        &ModelFamily::ALL
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn interpreters(&self) -> &[InterpreterDescriptor] {
        &self.interpreters
    }

    pub fn model(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Family of a model id, by longest prefix match
    pub fn model_family(&self, id: &str) -> Result<ModelFamily> {
        longest_prefix(id, ModelFamily::ALL.iter().map(|f| (f.id(), *f)))
            .ok_or_else(|| CmiError::UnknownModel(id.to_string()))
    }

    /// Backend-specific identifier for a model id.
    ///
    /// Ids not in the catalog but carrying a known family prefix resolve to
    /// the part after `<family>/`, so a model installed after the last
    /// requery can still be addressed.
    pub fn canonical_id(&self, id: &str) -> Result<String> {
        if let Some(model) = self.model(id) {
            return Ok(model.canonical_id.clone());
        }
        let family = self.model_family(id)?;
        id.strip_prefix(family.id())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CmiError::UnknownModel(id.to_string()))
    }

    pub fn interpreter(&self, id: &str) -> Result<&InterpreterDescriptor> {
        self.interpreters
            .iter()
            .find(|i| i.id == id)
            .ok_or_else(|| CmiError::UnknownInterpreter(id.to_string()))
    }

    pub fn interpreter_family(&self, id: &str) -> Result<InterpreterFamily> {
        longest_prefix(id, InterpreterFamily::ALL.iter().map(|f| (f.id(), *f)))
            .ok_or_else(|| CmiError::UnknownInterpreter(id.to_string()))
    }

    /// Whether a family's live model list has already been merged
    pub fn is_requeried(&self, family: ModelFamily) -> bool {
        self.requeried.contains(&family)
    }

    /// Merge the live model list of a local runtime, at most once per registry.
    ///
    /// Returns `false` without contacting the lister if the family was already
    /// queried. A failed query leaves the registry untouched and may be retried.
    pub async fn requery_models(&mut self, lister: &dyn ModelLister) -> Result<bool> {
        let family = lister.family();
        if self.is_requeried(family) {
            tracing::debug!("Model list for {} already queried", family);
            return Ok(false);
        }

        let names = lister.list_models().await?;
        let mut added = 0;
        for name in names {
            let id = qualified_id(family.id(), &name);
            if self.model(&id).is_none() {
                self.models.push(ModelDescriptor {
                    id,
                    family,
                    canonical_id: name,
                });
                added += 1;
            }
        }

        tracing::info!("Merged {} models from {}", added, family);
        self.requeried.push(family);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticLister {
        names: Vec<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelLister for StaticLister {
        fn family(&self) -> ModelFamily {
            ModelFamily::Ollama
        }

        async fn list_models(&self) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.names.clone())
        }
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.models().len(), 11);
        assert_eq!(registry.interpreters().len(), 4);
        assert!(registry.model("OpenAI/gpt-4").is_some());
        assert!(registry.interpreter("Plantweb/DITAA").is_ok());
    }

    #[test]
    fn test_family_ids_are_prefix_free() {
        let ids: Vec<&str> = ModelFamily::ALL.iter().map(|f| f.id()).collect();
        assert!(validate_family_ids(&ids).is_ok());
        assert!(validate_family_ids(&["Llama", "Llama.cpp"]).is_err());
    }

    #[test]
    fn test_model_family_prefix_match() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(
            registry.model_family("OpenAI/gpt-4").unwrap(),
            ModelFamily::OpenAi
        );
        assert_eq!(
            registry.model_family("Llama.cpp/Llama2-13B-GGML").unwrap(),
            ModelFamily::LlamaCpp
        );
        assert_eq!(
            registry.model_family("Ollama/mistral").unwrap(),
            ModelFamily::Ollama
        );
        assert!(matches!(
            registry.model_family("Acme/model-x"),
            Err(CmiError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_canonical_id() {
        let registry = Registry::builtin().unwrap();
        assert!(registry
            .canonical_id("Replicate/Llama2-7B")
            .unwrap()
            .ends_with("4f0a4744c7295c024a1de15e1a63c880d3da035fa1f49bfd344fe076074c8eea"));
        assert_eq!(registry.canonical_id("Ollama/llama3").unwrap(), "llama3");
        assert!(registry.canonical_id("Ollama/").is_err());
        assert!(registry.canonical_id("Other/x").is_err());
    }

    #[test]
    fn test_interpreter_lookup() {
        let registry = Registry::builtin().unwrap();
        let bpmn = registry.interpreter("BPMN-Auto-Layout/BPMN-XML").unwrap();
        assert_eq!(bpmn.syntax, DiagramSyntax::Bpmn);
        assert_eq!(
            bpmn.endpoint.as_deref(),
            Some("http://172.17.0.1:3000/process-diagram")
        );
        assert_eq!(
            registry.interpreter_family("Plantweb/Graphviz").unwrap(),
            InterpreterFamily::Plantweb
        );
        assert!(matches!(
            registry.interpreter("Plantweb/Mermaid"),
            Err(CmiError::UnknownInterpreter(_))
        ));
    }

    #[test]
    fn test_settings_add_llama_cpp_models() {
        let mut settings = Settings::default();
        settings
            .providers
            .llama_cpp
            .models
            .insert("Mistral-7B".into(), "models/mistral.gguf".into());
        settings.providers.llama_cpp.models.insert(
            "Llama2-13B-GGML".into(),
            "/opt/models/llama-2-13b.gguf".into(),
        );
        let registry = Registry::from_settings(&settings).unwrap();
        assert_eq!(
            registry.canonical_id("Llama.cpp/Mistral-7B").unwrap(),
            "models/mistral.gguf"
        );
        assert_eq!(
            registry.canonical_id("Llama.cpp/Llama2-13B-GGML").unwrap(),
            "/opt/models/llama-2-13b.gguf"
        );
    }

    #[test]
    fn test_family_metadata() {
        assert_eq!(ModelFamily::OpenAi.kind(), FamilyKind::Api);
        assert_eq!(ModelFamily::Ollama.kind(), FamilyKind::LocalRuntime);
        assert!(ModelFamily::OpenAi.is_chat());
        assert!(!ModelFamily::Replicate.is_chat());
        assert_eq!(
            ModelFamily::LlamaCpp.unwrap_strategy(),
            UnwrapStrategy::CompletionEnvelope
        );
    }

    #[tokio::test]
    async fn test_requery_models_once() {
        let mut registry = Registry::builtin().unwrap();
        let lister = StaticLister {
            names: vec!["llama3:latest".into(), "mistral:7b".into()],
            calls: AtomicUsize::new(0),
        };

        assert!(registry.requery_models(&lister).await.unwrap());
        assert_eq!(
            registry.canonical_id("Ollama/mistral:7b").unwrap(),
            "mistral:7b"
        );
        assert_eq!(registry.models().len(), 13);

        assert!(!registry.requery_models(&lister).await.unwrap());
        assert_eq!(lister.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.models().len(), 13);
    }
}
