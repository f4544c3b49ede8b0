// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation state and the engine that drives it

pub mod engine;
pub mod history;
pub mod message;
pub mod pipeline;
pub mod selection;
pub mod streaming;

pub use engine::{
    ConversationEngine, InterpreterRun, TurnReport, EMPTY_RESULT_TEXT, INVALID_RESPONSE_TEXT,
};
pub use history::History;
pub use message::{Message, MessageContent, MessageFormat, Role};
pub use pipeline::split_batch;
pub use selection::SelectionSide;
pub use streaming::{NoopObserver, ResponseStream, StreamOutcome, TurnObserver};
