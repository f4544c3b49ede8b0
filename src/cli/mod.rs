// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI module for cmi
//!
//! Handles command-line argument parsing and settings overrides.

pub mod args;

pub use args::*;
