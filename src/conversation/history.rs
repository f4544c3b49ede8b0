// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Ordered message log with tail-only mutations
//!
//! The log always starts with the init message. Every mutation works on the
//! tail and leaves the init message in place, so calling any of them on a
//! fresh log is a no-op.

use super::message::{Message, MessageFormat, Role};
use crate::llm::{Dialogue, TurnRole};

#[derive(Debug, Clone)]
pub struct History {
    init_message: String,
    messages: Vec<Message>,
}

impl History {
    pub fn new(init_message: impl Into<String>) -> Self {
        let init_message = init_message.into();
        Self {
            messages: vec![Message::init(init_message.clone())],
            init_message,
        }
    }

    pub fn init_message(&self) -> &str {
        &self.init_message
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the init message is present
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Message> {
        self.messages.last_mut()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the log with a fresh init message
    pub fn clear(&mut self) {
        self.messages = vec![Message::init(self.init_message.clone())];
    }

    fn pop_while(&mut self, pred: impl Fn(&Message) -> bool) -> usize {
        let mut popped = 0;
        while self.messages.len() > 1 {
            match self.messages.last() {
                Some(last) if pred(last) => {
                    self.messages.pop();
                    popped += 1;
                }
                _ => break,
            }
        }
        popped
    }

    /// Drop the trailing responses, then the trailing user prompts.
    /// Returns the number of removed messages.
    pub fn remove_last_turn(&mut self) -> usize {
        let responses = self.pop_while(|m| m.role != Role::User);
        let prompts = self.pop_while(|m| m.role == Role::User);
        responses + prompts
    }

    /// Drop the interpreter and model responses of the last turn and return
    /// the prompt to resubmit. The prompt stays in the log.
    pub fn rerun_llm(&mut self) -> Option<String> {
        if !self.messages.iter().any(|m| m.format == MessageFormat::Prompt) {
            return None;
        }
        self.pop_while(|m| m.format.is_interpreter());
        self.pop_while(|m| m.format == MessageFormat::LlmResponse);
        match self.messages.last() {
            Some(last) if last.format == MessageFormat::Prompt => last.text().map(str::to_string),
            _ => None,
        }
    }

    /// Drop trailing interpreter responses and return the diagram source of
    /// the preceding model response, replaced by `edited` when given.
    pub fn rerun_interpreter(&mut self, edited: Option<String>) -> Option<String> {
        let has_response = self
            .messages
            .iter()
            .any(|m| m.format == MessageFormat::LlmResponse);
        if !has_response {
            return None;
        }
        self.pop_while(|m| m.format.is_interpreter());
        let last = self.messages.last_mut()?;
        if last.format != MessageFormat::LlmResponse {
            return None;
        }
        if let Some(edited) = edited {
            last.extracted_source = Some(edited);
        }
        last.extracted_source.clone()
    }

    /// User and assistant turns in order, interpreter messages left out
    pub fn dialogue(&self, system: Option<String>) -> Dialogue {
        let mut dialogue = Dialogue::new(system);
        for message in self.messages.iter().filter(|m| m.is_dialogue()) {
            let role = match message.role {
                Role::User => TurnRole::User,
                _ => TurnRole::Assistant,
            };
            if let Some(text) = message.text() {
                dialogue.push(role, text);
            }
        }
        dialogue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::RenderPayload;
    use proptest::prelude::*;

    fn formats(history: &History) -> Vec<MessageFormat> {
        history.messages().iter().map(|m| m.format).collect()
    }

    fn svg() -> Message {
        Message::interpreter_image(RenderPayload::Text("<svg/>".into()), "svg")
    }

    #[test]
    fn test_new_has_init() {
        let history = History::new("Hi");
        assert_eq!(formats(&history), vec![MessageFormat::Init]);
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("a"));
        history.push(Message::llm_response("b"));
        history.clear();
        assert_eq!(formats(&history), vec![MessageFormat::Init]);
        assert_eq!(history.messages()[0].text(), Some("Hi"));
    }

    #[test]
    fn test_remove_last_turn_full_turn() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("a"));
        history.push(Message::llm_response("b"));
        history.push(svg());
        assert_eq!(history.remove_last_turn(), 3);
        assert_eq!(formats(&history), vec![MessageFormat::Init]);
    }

    #[test]
    fn test_remove_last_turn_keeps_earlier_turns() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("a"));
        history.push(Message::llm_response("b"));
        history.push(Message::prompt("c"));
        history.push(Message::prompt("d"));
        history.remove_last_turn();
        assert_eq!(
            formats(&history),
            vec![MessageFormat::Init, MessageFormat::Prompt, MessageFormat::LlmResponse]
        );
    }

    #[test]
    fn test_remove_last_turn_on_fresh_log() {
        let mut history = History::new("Hi");
        assert_eq!(history.remove_last_turn(), 0);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_rerun_llm() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("draw"));
        history.push(Message::llm_response("@startuml\n@enduml"));
        history.push(Message::interpreter_text("*Interpreter response invalid*"));
        assert_eq!(history.rerun_llm().as_deref(), Some("draw"));
        assert_eq!(formats(&history), vec![MessageFormat::Init, MessageFormat::Prompt]);
    }

    #[test]
    fn test_rerun_llm_after_failed_dispatch() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("draw"));
        assert_eq!(history.rerun_llm().as_deref(), Some("draw"));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_rerun_llm_without_prompt_is_noop() {
        let mut history = History::new("Hi");
        assert!(history.rerun_llm().is_none());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_rerun_interpreter_uses_edit() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("draw"));
        let mut response = Message::llm_response("```\nA -> B\n```");
        response.extracted_source = Some("A -> B".into());
        history.push(response);
        history.push(svg());
        history.push(Message::interpreter_text("note"));

        assert_eq!(
            history.rerun_interpreter(Some("A -> C".into())).as_deref(),
            Some("A -> C")
        );
        assert_eq!(
            formats(&history),
            vec![MessageFormat::Init, MessageFormat::Prompt, MessageFormat::LlmResponse]
        );
        assert_eq!(
            history.last().unwrap().extracted_source.as_deref(),
            Some("A -> C")
        );
        assert_eq!(history.rerun_interpreter(None).as_deref(), Some("A -> C"));
    }

    #[test]
    fn test_rerun_interpreter_without_response_is_noop() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("draw"));
        assert!(history.rerun_interpreter(Some("x".into())).is_none());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_dialogue_skips_interpreter_messages() {
        let mut history = History::new("Hi");
        history.push(Message::prompt("draw"));
        history.push(Message::llm_response("ok"));
        history.push(svg());
        let dialogue = history.dialogue(Some("sys".into()));
        assert_eq!(dialogue.system.as_deref(), Some("sys"));
        let roles: Vec<TurnRole> = dialogue.turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::Assistant, TurnRole::User, TurnRole::Assistant]);
    }

    fn arb_message() -> impl Strategy<Value = Message> {
        prop_oneof![
            Just(Message::prompt("p")),
            Just(Message::llm_response("r")),
            Just(Message::interpreter_text("t")),
        ]
    }

    proptest! {
        #[test]
        fn prop_mutations_keep_init(messages in prop::collection::vec(arb_message(), 0..12), op in 0u8..4) {
            let mut history = History::new("Hi");
            for m in messages {
                history.push(m);
            }
            match op {
                0 => { history.remove_last_turn(); }
                1 => { history.rerun_llm(); }
                2 => { history.rerun_interpreter(None); }
                _ => history.clear(),
            }
            prop_assert!(history.len() >= 1);
            prop_assert_eq!(history.messages()[0].format, MessageFormat::Init);
        }

        #[test]
        fn prop_remove_last_turn_leaves_no_trailing_prompt_run(messages in prop::collection::vec(arb_message(), 0..12)) {
            let mut history = History::new("Hi");
            for m in messages {
                history.push(m);
            }
            history.remove_last_turn();
            prop_assert_ne!(history.last().map(|m| m.role), Some(Role::User));
        }
    }
}
