// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! cmi - converse with language models and render the diagrams they write.
//!
//! This crate exposes the runtime used by the `cmi` CLI (`src/main.rs`).
//!
//! Architecture highlights:
//! - `conversation`: the engine, message history and selection state
//! - `llm`: model backend trait, HTTP adapters (OpenAI, Replicate, llama.cpp, Ollama) and mocks
//! - `interpreter`: syntax extraction, input normalization and diagram renderers
//! - `registry`, `params`: selectable models/interpreters and their typed parameters
//! - `store`: conversation log sinks
//! - `config`, `cli`, `chat`: settings, argument parsing and the line-based front end

pub mod chat;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod interpreter;
pub mod llm;
pub mod params;
pub mod registry;
pub mod store;

pub use error::{CmiError, Result};
