// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation message types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interpreter::RenderPayload;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Interpreter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Interpreter => "interpreter",
        }
    }
}

/// What kind of message this is; drives the history transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    Init,
    Prompt,
    LlmResponse,
    InterpreterText,
    InterpreterImage,
}

impl MessageFormat {
    pub fn is_interpreter(&self) -> bool {
        matches!(
            self,
            MessageFormat::InterpreterText | MessageFormat::InterpreterImage
        )
    }
}

/// Message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum MessageContent {
    Text(String),
    /// Binary image data such as PNG
    Bytes(Vec<u8>),
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Bytes(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MessageContent::Text(text) => text.len(),
            MessageContent::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<RenderPayload> for MessageContent {
    fn from(payload: RenderPayload) -> Self {
        match payload {
            RenderPayload::Text(text) => MessageContent::Text(text),
            RenderPayload::Bytes(bytes) => MessageContent::Bytes(bytes),
        }
    }
}

/// A single message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub format: MessageFormat,
    pub content: MessageContent,
    /// Diagram source found in an assistant response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_source: Option<String>,
    /// Image format tag of an interpreter image, e.g. `svg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_format: Option<String>,
}

impl Message {
    fn new(role: Role, format: MessageFormat, content: MessageContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            format,
            content,
            extracted_source: None,
            image_format: None,
        }
    }

    pub fn init(text: impl Into<String>) -> Self {
        Self::new(
            Role::Assistant,
            MessageFormat::Init,
            MessageContent::Text(text.into()),
        )
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(
            Role::User,
            MessageFormat::Prompt,
            MessageContent::Text(text.into()),
        )
    }

    pub fn llm_response(text: impl Into<String>) -> Self {
        Self::new(
            Role::Assistant,
            MessageFormat::LlmResponse,
            MessageContent::Text(text.into()),
        )
    }

    pub fn interpreter_text(text: impl Into<String>) -> Self {
        Self::new(
            Role::Interpreter,
            MessageFormat::InterpreterText,
            MessageContent::Text(text.into()),
        )
    }

    pub fn interpreter_image(payload: RenderPayload, format: impl Into<String>) -> Self {
        let mut message = Self::new(
            Role::Interpreter,
            MessageFormat::InterpreterImage,
            payload.into(),
        );
        message.image_format = Some(format.into());
        message
    }

    pub fn text(&self) -> Option<&str> {
        self.content.as_text()
    }

    /// Whether the message takes part in model context
    pub fn is_dialogue(&self) -> bool {
        matches!(self.role, Role::User | Role::Assistant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_set_role_and_format() {
        let init = Message::init("Hello");
        assert_eq!((init.role, init.format), (Role::Assistant, MessageFormat::Init));
        let prompt = Message::prompt("Draw");
        assert_eq!((prompt.role, prompt.format), (Role::User, MessageFormat::Prompt));
        let text = Message::interpreter_text("*Interpreter response invalid*");
        assert!(text.format.is_interpreter());
        assert!(!text.is_dialogue());
        assert_ne!(init.id, prompt.id);
    }

    #[test]
    fn test_interpreter_image_from_payload() {
        let image = Message::interpreter_image(RenderPayload::Bytes(vec![0x89, b'P']), "png");
        assert_eq!(image.content, MessageContent::Bytes(vec![0x89, b'P']));
        assert_eq!(image.image_format.as_deref(), Some("png"));
        assert!(image.text().is_none());

        let svg = Message::interpreter_image(RenderPayload::Text("<svg/>".into()), "svg");
        assert_eq!(svg.text(), Some("<svg/>"));
    }

    #[test]
    fn test_serialized_shape() {
        let message = Message::llm_response("hi");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["format"], "llm_response");
        assert_eq!(value["content"]["type"], "text");
        assert!(value.get("extracted_source").is_none());
    }
}
