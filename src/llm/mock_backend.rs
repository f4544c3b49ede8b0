// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock model backend for testing
//!
//! Streams scripted replies in small chunks, shaped like the items of the
//! family it pretends to be, and records every dialogue it receives.
//! [`MockFactory`] hands out clones of a mock backend and renderer so a
//! test can keep a handle on the shared state.

use async_trait::async_trait;
use futures::stream;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::BackendAccess;
use crate::error::{ApiError, CmiError, Result};
use crate::interpreter::mock_renderer::MockRenderer;
use crate::interpreter::Renderer;
use crate::llm::backend::{
    Dialogue, ItemStream, ModelBackend, ModelInit, Submission, UnwrapStrategy,
};
use crate::llm::factory::BackendFactory;
use crate::params::ParameterSet;
use crate::registry::{InterpreterFamily, ModelFamily, ModelLister};

/// One scripted backend reaction
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Stream this text to completion
    Text(String),
    /// Stream `partial`, then fail with a transport error
    FailMidStream { partial: String, message: String },
    /// Refuse the submission before any item is produced
    DispatchError(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock backend lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Wrap a text fragment the way `strategy` expects to find it
pub fn wrap_item(strategy: UnwrapStrategy, text: &str) -> Value {
    match strategy {
        UnwrapStrategy::ChatDelta => json!({"choices": [{"delta": {"content": text}}]}),
        UnwrapStrategy::PlainText => Value::String(text.to_string()),
        UnwrapStrategy::CompletionEnvelope => json!({"choices": [{"text": text}]}),
        UnwrapStrategy::ChatEnvelope => {
            json!({"message": {"role": "assistant", "content": text}, "done": false})
        }
    }
}

fn chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// A mock model backend; clones share state
#[derive(Clone)]
pub struct MockBackend {
    family: ModelFamily,
    chunk_size: usize,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    call_count: Arc<AtomicUsize>,
    recorded_dialogues: Arc<Mutex<Vec<Dialogue>>>,
    recorded_parameters: Arc<Mutex<Vec<ParameterSet>>>,
    initializations: Arc<Mutex<Vec<ModelInit>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            family: ModelFamily::OpenAi,
            chunk_size: 4,
            replies: Arc::new(Mutex::new(VecDeque::new())),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_dialogues: Arc::new(Mutex::new(Vec::new())),
            recorded_parameters: Arc::new(Mutex::new(Vec::new())),
            initializations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue plain text replies
    pub fn with_responses<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_replies(responses.into_iter().map(MockReply::text))
    }

    /// Queue scripted replies, consumed in order
    pub fn with_replies(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
        lock(&self.replies).extend(replies);
        self
    }

    pub fn with_family(mut self, family: ModelFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn recorded_dialogues(&self) -> Vec<Dialogue> {
        lock(&self.recorded_dialogues).clone()
    }

    pub fn recorded_parameters(&self) -> Vec<ParameterSet> {
        lock(&self.recorded_parameters).clone()
    }

    pub fn initializations(&self) -> Vec<ModelInit> {
        lock(&self.initializations).clone()
    }

    fn items_for(&self, strategy: UnwrapStrategy, text: &str) -> Vec<Result<Value>> {
        chunks(text, self.chunk_size)
            .iter()
            .map(|chunk| Ok(wrap_item(strategy, chunk)))
            .collect()
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn family(&self) -> ModelFamily {
        self.family
    }

    async fn initialize(&mut self, init: &ModelInit) -> Result<()> {
        lock(&self.initializations).push(init.clone());
        Ok(())
    }

    async fn submit(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Result<Submission> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        lock(&self.recorded_dialogues).push(dialogue.clone());
        lock(&self.recorded_parameters).push(parameters.clone());

        let reply = lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| MockReply::text("Mock response"));
        let strategy = self.family.unwrap_strategy();

        let items = match reply {
            MockReply::Text(text) => self.items_for(strategy, &text),
            MockReply::FailMidStream { partial, message } => {
                let mut items = self.items_for(strategy, &partial);
                items.push(Err(CmiError::Api(ApiError::StreamError(message))));
                items
            }
            MockReply::DispatchError(message) => {
                return Err(CmiError::Api(ApiError::Network(message)));
            }
        };

        let items: ItemStream = Box::pin(stream::iter(items));
        Ok(Submission::new(items, strategy))
    }
}

/// Lister returning a fixed set of names
#[derive(Debug, Clone)]
pub struct StaticLister {
    family: ModelFamily,
    names: Vec<String>,
}

impl StaticLister {
    pub fn new(family: ModelFamily, names: Vec<String>) -> Self {
        Self { family, names }
    }
}

#[async_trait]
impl ModelLister for StaticLister {
    fn family(&self) -> ModelFamily {
        self.family
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.names.clone())
    }
}

/// Factory handing out the shared mock backend and renderer
#[derive(Clone, Default)]
pub struct MockFactory {
    pub backend: MockBackend,
    pub renderer: MockRenderer,
    pub live_models: Vec<String>,
}

impl MockFactory {
    pub fn new(backend: MockBackend, renderer: MockRenderer) -> Self {
        Self {
            backend,
            renderer,
            live_models: Vec::new(),
        }
    }

    pub fn with_live_models(mut self, names: Vec<String>) -> Self {
        self.live_models = names;
        self
    }
}

impl BackendFactory for MockFactory {
    fn create_model_backend(&self, family: ModelFamily) -> Result<Box<dyn ModelBackend>> {
        Ok(Box::new(self.backend.clone().with_family(family)))
    }

    fn create_renderer(&self, family: InterpreterFamily) -> Result<Box<dyn Renderer>> {
        Ok(Box::new(self.renderer.clone().with_family(family)))
    }

    fn model_lister(
        &self,
        family: ModelFamily,
        _access: &BackendAccess,
    ) -> Option<Box<dyn ModelLister>> {
        family
            .has_live_catalog()
            .then(|| Box::new(StaticLister::new(family, self.live_models.clone())) as Box<dyn ModelLister>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::backend::TurnRole;
    use futures::StreamExt;

    async fn collect_text(submission: Submission) -> (String, Option<CmiError>) {
        let Submission { mut items, unwrap } = submission;
        let mut text = String::new();
        while let Some(item) = items.next().await {
            match item {
                Ok(item) => text.push_str(unwrap.unwrap(&item)),
                Err(e) => return (text, Some(e)),
            }
        }
        (text, None)
    }

    #[tokio::test]
    async fn test_replies_in_order_then_default() {
        let backend = MockBackend::new().with_responses(["first", "second"]);
        let dialogue = Dialogue::new(None);
        let params = ParameterSet::new();
        for expected in ["first", "second", "Mock response"] {
            let submission = backend.submit(&dialogue, &params).await.unwrap();
            assert_eq!(collect_text(submission).await.0, expected);
        }
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_items_follow_family_shape() {
        for family in ModelFamily::ALL {
            let backend = MockBackend::new()
                .with_family(family)
                .with_chunk_size(2)
                .with_responses(["héllo"]);
            let submission = backend
                .submit(&Dialogue::new(None), &ParameterSet::new())
                .await
                .unwrap();
            assert_eq!(submission.unwrap, family.unwrap_strategy());
            assert_eq!(collect_text(submission).await.0, "héllo");
        }
    }

    #[tokio::test]
    async fn test_fail_mid_stream_keeps_partial() {
        let backend = MockBackend::new().with_replies([MockReply::FailMidStream {
            partial: "@startuml\nA".into(),
            message: "connection reset".into(),
        }]);
        let submission = backend
            .submit(&Dialogue::new(None), &ParameterSet::new())
            .await
            .unwrap();
        let (text, error) = collect_text(submission).await;
        assert_eq!(text, "@startuml\nA");
        assert!(error.unwrap().is_transport());
    }

    #[tokio::test]
    async fn test_dispatch_error() {
        let backend = MockBackend::new().with_replies([MockReply::DispatchError("down".into())]);
        assert!(backend
            .submit(&Dialogue::new(None), &ParameterSet::new())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_records_dialogues() {
        let backend = MockBackend::new();
        let observer = backend.clone();
        let mut dialogue = Dialogue::new(None);
        dialogue.push(TurnRole::User, "Hi");
        backend.submit(&dialogue, &ParameterSet::new()).await.unwrap();
        assert_eq!(observer.recorded_dialogues(), vec![dialogue]);
    }

    #[tokio::test]
    async fn test_factory_shares_state() {
        let factory = MockFactory::default().with_live_models(vec!["llama3".into()]);
        let backend = factory.create_model_backend(ModelFamily::Ollama).unwrap();
        assert_eq!(backend.family(), ModelFamily::Ollama);
        backend
            .submit(&Dialogue::new(None), &ParameterSet::new())
            .await
            .unwrap();
        assert_eq!(factory.backend.call_count(), 1);

        let access = BackendAccess::new(None, "");
        assert!(factory.model_lister(ModelFamily::OpenAi, &access).is_none());
        let lister = factory.model_lister(ModelFamily::Ollama, &access).unwrap();
        assert_eq!(lister.list_models().await.unwrap(), vec!["llama3"]);
    }
}
