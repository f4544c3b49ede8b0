// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Model backend implementations

pub mod common;
pub mod llama_cpp;
pub mod ollama;
pub mod openai;
pub mod replicate;

pub use llama_cpp::LlamaCppBackend;
pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;
pub use replicate::ReplicateBackend;
