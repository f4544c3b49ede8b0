// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Configuration module for cmi
//!
//! Handles loading, saving, and resolving credentials and endpoints.

pub mod settings;

pub use settings::*;
