// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming response display
//!
//! [`ConsoleObserver`] prints a turn as it happens: deltas as they arrive,
//! then a short summary of timing, extraction and rendering.

use std::io::Write;
use std::time::Duration;

use crossterm::{
    style::{Color, ResetColor, SetForegroundColor},
    QueueableCommand,
};

use super::display::{format_duration, format_interpreter_run};
use crate::conversation::{InterpreterRun, TurnObserver};
use crate::error::CmiError;

/// Writes turn progress to a terminal or any other writer
pub struct ConsoleObserver<W: Write + Send> {
    out: W,
    colored: bool,
    /// Whether anything was printed since the last response line started
    mid_line: bool,
}

impl<W: Write + Send> ConsoleObserver<W> {
    pub fn new(out: W, colored: bool) -> Self {
        Self {
            out,
            colored,
            mid_line: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn try_emit(&mut self, color: Option<Color>, text: &str) -> std::io::Result<()> {
        match color {
            Some(color) if self.colored => {
                self.out.queue(SetForegroundColor(color))?;
                self.out.write_all(text.as_bytes())?;
                self.out.queue(ResetColor)?;
            }
            _ => self.out.write_all(text.as_bytes())?,
        }
        self.out.flush()
    }

    fn emit(&mut self, color: Option<Color>, text: &str) {
        if let Err(e) = self.try_emit(color, text) {
            tracing::debug!("Console write failed: {}", e);
        }
    }

    fn end_line(&mut self) {
        if self.mid_line {
            self.emit(None, "\n");
            self.mid_line = false;
        }
    }
}

impl<W: Write + Send> TurnObserver for ConsoleObserver<W> {
    fn on_prompt(&mut self, prompt: &str) {
        self.end_line();
        let first_line = prompt.lines().next().unwrap_or_default();
        self.emit(Some(Color::DarkGrey), &format!("> {}\n", first_line));
    }

    fn on_delta(&mut self, delta: &str) {
        self.emit(None, delta);
        self.mid_line = !delta.ends_with('\n');
    }

    fn on_response(&mut self, _text: &str, duration: Duration) {
        self.end_line();
        self.emit(
            Some(Color::DarkGrey),
            &format!("({})\n", format_duration(duration)),
        );
    }

    fn on_stream_error(&mut self, error: &CmiError) {
        self.end_line();
        self.emit(Some(Color::Red), &format!("Error: {}\n", error));
    }

    fn on_extracted(&mut self, source: &str) {
        self.emit(
            Some(Color::Cyan),
            &format!("Extracted {} lines of diagram source\n", source.trim().lines().count()),
        );
    }

    fn on_interpreter(&mut self, run: &InterpreterRun) {
        let color = if run.is_rendered() { Color::Green } else { Color::Yellow };
        self.emit(Some(color), &format!("{}\n", format_interpreter_run(run)));
    }
}
