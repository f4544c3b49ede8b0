// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Batch prompt splitting

/// Split `input` on lines consisting of `delimiter` alone.
///
/// Segments keep their order, are trimmed, and empty segments are dropped,
/// so input without the delimiter yields one prompt.
pub fn split_batch(input: &str, delimiter: &str) -> Vec<String> {
    let mut prompts = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let mut flush = |lines: &mut Vec<&str>| {
        let prompt = lines.join("\n");
        let prompt = prompt.trim();
        if !prompt.is_empty() {
            prompts.push(prompt.to_string());
        }
        lines.clear();
    };

    for line in input.lines() {
        if !delimiter.is_empty() && line.trim() == delimiter {
            flush(&mut current);
        } else {
            current.push(line);
        }
    }
    flush(&mut current);
    prompts
}
