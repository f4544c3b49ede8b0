// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation log sinks
//!
//! The engine reports log-worthy events here. Sinks persist them however
//! they like and never influence engine control flow.

mod file;

pub use file::JsonFileLog;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::interpreter::RenderPayload;
use crate::params::ParameterSet;

/// Something worth recording about a conversation
#[derive(Debug, Clone, PartialEq)]
pub enum LogEvent {
    ModelConfiguration {
        model_id: String,
        parameters: ParameterSet,
    },
    InterpreterConfiguration {
        interpreter_id: String,
        parameters: ParameterSet,
    },
    Prompt(String),
    Response {
        text: String,
        duration: Duration,
    },
    InterpreterInput(String),
    InterpreterOutput {
        payload: RenderPayload,
        format: String,
        duration: Duration,
    },
    Annotation(String),
}

/// Receiver of conversation events
pub trait ConversationLog: Send {
    /// Begin a new conversation whose first message is `init_message`
    fn start_conversation(&mut self, init_message: &str);

    fn record(&mut self, event: LogEvent);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLog;

impl ConversationLog for NullLog {
    fn start_conversation(&mut self, _init_message: &str) {}

    fn record(&mut self, _event: LogEvent) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Memory log lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Keeps events in memory; clones share the same buffer
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    conversations: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Init messages of every started conversation
    pub fn conversations(&self) -> Vec<String> {
        lock(&self.conversations).clone()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        lock(&self.events).clone()
    }
}

impl ConversationLog for MemoryLog {
    fn start_conversation(&mut self, init_message: &str) {
        lock(&self.conversations).push(init_message.to_string());
    }

    fn record(&mut self, event: LogEvent) {
        lock(&self.events).push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_clones_share_events() {
        let log = MemoryLog::new();
        let mut writer = log.clone();
        writer.start_conversation("Hi");
        writer.record(LogEvent::Prompt("draw".into()));
        assert_eq!(log.conversations(), vec!["Hi"]);
        assert_eq!(log.events(), vec![LogEvent::Prompt("draw".into())]);
    }

    #[test]
    fn test_null_log_accepts_everything() {
        let mut log = NullLog;
        log.start_conversation("Hi");
        log.record(LogEvent::Annotation("note".into()));
    }
}
