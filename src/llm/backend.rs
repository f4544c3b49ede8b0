// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model backend trait and related types
//!
//! Every backend family returns a lazy stream of opaque JSON items plus the
//! name of the strategy that turns one item into text. Items differ per
//! family: an SSE chat delta, a completion envelope, a chat envelope or a
//! bare string.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::config::BackendAccess;
use crate::error::Result;
use crate::params::ParameterSet;
use crate::registry::ModelFamily;

/// Stream of raw backend items
pub type ItemStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value>> + Send>>;

/// Named strategies for pulling text out of a streamed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnwrapStrategy {
    /// `choices[0].delta.content`
    ChatDelta,
    /// The item is the text
    PlainText,
    /// `choices[0].text`
    CompletionEnvelope,
    /// `message.content`
    ChatEnvelope,
}

impl UnwrapStrategy {
    /// Extract the text carried by `item`; items without text yield ""
    pub fn unwrap<'a>(&self, item: &'a serde_json::Value) -> &'a str {
        let text = match self {
            UnwrapStrategy::ChatDelta => item
                .pointer("/choices/0/delta/content")
                .and_then(|v| v.as_str()),
            UnwrapStrategy::PlainText => item.as_str(),
            UnwrapStrategy::CompletionEnvelope => {
                item.pointer("/choices/0/text").and_then(|v| v.as_str())
            }
            UnwrapStrategy::ChatEnvelope => {
                item.pointer("/message/content").and_then(|v| v.as_str())
            }
        };
        text.unwrap_or("")
    }
}

/// Speaker of a dialogue turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

/// One user or assistant turn sent to a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub role: TurnRole,
    pub content: String,
}

/// The conversational context for one submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dialogue {
    /// Instruction prefixed to rendered transcripts
    pub system: Option<String>,
    pub turns: Vec<DialogueTurn>,
}

impl Dialogue {
    pub fn new(system: Option<String>) -> Self {
        Self {
            system,
            turns: Vec::new(),
        }
    }

    pub fn push(&mut self, role: TurnRole, content: impl Into<String>) {
        self.turns.push(DialogueTurn {
            role,
            content: content.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&DialogueTurn> {
        self.turns.last()
    }

    /// Render as a plain-text transcript for completion-style models:
    /// the system instruction, then `role: content` blocks, then an open
    /// `assistant: ` cue.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        if let Some(ref system) = self.system {
            out.push_str(system);
            out.push_str("\n\n");
        }
        for turn in &self.turns {
            out.push_str(turn.role.as_str());
            out.push_str(": ");
            out.push_str(&turn.content);
            out.push_str("\n\n");
        }
        out.push_str("assistant: ");
        out
    }
}

/// What a backend needs to know about the selected model
#[derive(Debug, Clone)]
pub struct ModelInit {
    pub model_id: String,
    pub canonical_id: String,
    pub parameters: ParameterSet,
    pub access: BackendAccess,
}

/// A started submission: raw items plus how to unwrap them
pub struct Submission {
    pub items: ItemStream,
    pub unwrap: UnwrapStrategy,
}

impl Submission {
    pub fn new(items: ItemStream, unwrap: UnwrapStrategy) -> Self {
        Self { items, unwrap }
    }
}

/// A model backend family client
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn family(&self) -> ModelFamily;

    /// Bind the backend to a model, its parameters and credentials
    async fn initialize(&mut self, init: &ModelInit) -> Result<()>;

    /// Start a submission with the current parameter values
    async fn submit(&self, dialogue: &Dialogue, parameters: &ParameterSet) -> Result<Submission>;
}
