// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat front end
//!
//! Command parsing, display formatting and the console turn observer used by
//! the interactive session.

pub mod commands;
pub mod display;
pub mod streaming;

pub use commands::{parse_command, ChatCommand};
pub use streaming::ConsoleObserver;
