// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for cmi
//!
//! Provides the backend abstraction over hosted and local model families.

pub mod backend;
pub mod factory;
pub mod mock_backend;
pub mod providers;

pub use backend::*;
pub use factory::{BackendFactory, HttpBackendFactory};
