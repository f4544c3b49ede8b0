// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Credential and endpoint resolution per backend family

use crate::error::{CmiError, Result};
use crate::registry::{InterpreterFamily, ModelFamily};

use super::Settings;

/// Resolved credentials and endpoint handed to a backend at initialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendAccess {
    pub api_key: Option<String>,
    /// Empty means the backend's built-in default
    pub endpoint: String,
}

impl BackendAccess {
    pub fn new(api_key: Option<String>, endpoint: impl Into<String>) -> Self {
        Self {
            api_key,
            endpoint: endpoint.into(),
        }
    }
}

impl Settings {
    /// Resolve an API key. Priority: command line > env var > config file.
    fn resolve_key(&self, family_id: &str, env: Option<&str>, stored: &Option<String>) -> Option<String> {
        self.api_key_overrides
            .get(family_id)
            .cloned()
            .or_else(|| env.and_then(|name| std::env::var(name).ok()))
            .filter(|key| !key.is_empty())
            .or_else(|| stored.clone())
    }

    /// API key for a model family, if it needs one
    pub fn model_api_key(&self, family: ModelFamily) -> Option<String> {
        let providers = &self.providers;
        match family {
            ModelFamily::OpenAi => self.resolve_key(
                family.id(),
                Some(&providers.openai.api_key_env),
                &providers.openai.api_key,
            ),
            ModelFamily::Replicate => self.resolve_key(
                family.id(),
                Some(&providers.replicate.api_key_env),
                &providers.replicate.api_key,
            ),
            ModelFamily::LlamaCpp | ModelFamily::Ollama => None,
        }
    }

    /// Credentials and endpoint for a model family
    pub fn model_access(&self, family: ModelFamily) -> BackendAccess {
        let providers = &self.providers;
        let endpoint = match family {
            ModelFamily::OpenAi => &providers.openai.base_url,
            ModelFamily::Replicate => &providers.replicate.base_url,
            ModelFamily::LlamaCpp => &providers.llama_cpp.base_url,
            ModelFamily::Ollama => &providers.ollama.base_url,
        };
        BackendAccess::new(self.model_api_key(family), endpoint.clone())
    }

    /// Rendering service endpoint for an interpreter family
    pub fn interpreter_endpoint(&self, family: InterpreterFamily) -> String {
        match family {
            InterpreterFamily::BpmnAutoLayout => self.interpreters.bpmn.endpoint.clone(),
            InterpreterFamily::Plantweb => self.interpreters.plantuml.server.clone(),
        }
    }

    /// Credentials and endpoint for an interpreter family
    pub fn interpreter_access(&self, family: InterpreterFamily) -> BackendAccess {
        let api_key = match family {
            InterpreterFamily::BpmnAutoLayout => {
                self.resolve_key(family.id(), None, &self.interpreters.bpmn.api_key)
            }
            InterpreterFamily::Plantweb => None,
        };
        BackendAccess::new(api_key, self.interpreter_endpoint(family))
    }

    /// Apply an `<api_id>:<key>` pair from the command line.
    ///
    /// The api id is a family id such as `OpenAI` or `BPMN-Auto-Layout`.
    /// Returns the api id on success.
    pub fn apply_api_key(&mut self, pair: &str) -> Result<String> {
        let (api_id, key) = pair
            .trim()
            .split_once(':')
            .filter(|(id, key)| !id.is_empty() && !key.is_empty())
            .ok_or_else(|| {
                CmiError::Config(format!("Expected <api_id>:<api_key>, got '{}'", pair))
            })?;

        let known = ModelFamily::ALL
            .iter()
            .map(|f| f.id())
            .chain(InterpreterFamily::ALL.iter().map(|f| f.id()))
            .any(|id| id == api_id);
        if !known {
            return Err(CmiError::Config(format!("Unknown api id '{}'", api_id)));
        }

        tracing::info!("Setting API key for {}", api_id);
        self.api_key_overrides
            .insert(api_id.to_string(), key.to_string());
        Ok(api_id.to_string())
    }

    /// Family ids that currently resolve to an API key
    pub fn configured_api_keys(&self) -> Vec<&'static str> {
        let models = ModelFamily::ALL
            .iter()
            .filter(|f| self.model_api_key(**f).is_some())
            .map(|f| f.id());
        let interpreters = InterpreterFamily::ALL
            .iter()
            .filter(|f| self.interpreter_access(**f).api_key.is_some())
            .map(|f| f.id());
        models.chain(interpreters).collect()
    }
}
