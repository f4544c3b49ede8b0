// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! BPMN document assembly
//!
//! Model replies rarely contain a complete, well-formed BPMN document. The
//! assembler lifts the `process` and `BPMNDiagram` elements out of whatever
//! the model produced and places them into a fixed definitions document.
//! The splicing is regex based; callers only see [`DocumentAssembler`].

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PROCESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<(bpmn:)?process\b.*?</(bpmn:)?process>").unwrap());

static DIAGRAM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(bpmndi:)?BPMNDiagram\b.*?</(bpmndi:)?BPMNDiagram>").unwrap()
});

static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// Definitions document the extracted elements are spliced into
pub const BPMN_TEMPLATE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:bpmndi="http://www.omg.org/spec/BPMN/20100524/DI" xmlns:dc="http://www.omg.org/spec/DD/20100524/DC" xmlns:di="http://www.omg.org/spec/DD/20100524/DI" id="Definitions_{{process_id}}" targetNamespace="http://bpmn.io/schema/bpmn">
{{process}}
{{diagram}}
</bpmn:definitions>
"#;

/// Builds a complete document from a fragment of model output
pub trait DocumentAssembler: Send + Sync {
    fn assemble(&self, fragment: &str) -> String;
}

type IdGenerator = Box<dyn Fn() -> String + Send + Sync>;

/// Regex-based BPMN assembler
pub struct RegexBpmnAssembler {
    next_id: IdGenerator,
}

impl Default for RegexBpmnAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexBpmnAssembler {
    /// Assembler generating a random process id per document
    pub fn new() -> Self {
        Self::with_id_generator(|| uuid::Uuid::new_v4().simple().to_string())
    }

    /// Assembler with a custom id source, for reproducible output
    pub fn with_id_generator(generator: impl Fn() -> String + Send + Sync + 'static) -> Self {
        Self {
            next_id: Box::new(generator),
        }
    }
}

impl DocumentAssembler for RegexBpmnAssembler {
    fn assemble(&self, fragment: &str) -> String {
        let mut values: HashMap<&str, String> = HashMap::new();
        values.insert("process_id", (self.next_id)());
        values.insert(
            "process",
            PROCESS_PATTERN
                .find(fragment)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        );
        values.insert(
            "diagram",
            DIAGRAM_PATTERN
                .find(fragment)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        );

        if values["process"].is_empty() && values["diagram"].is_empty() {
            tracing::warn!("BPMN fragment has neither a process nor a diagram element");
        }

        fill_template(BPMN_TEMPLATE, &values)
    }
}

/// Replace `{{name}}` placeholders; unknown names become empty
pub fn fill_template(template: &str, values: &HashMap<&str, String>) -> String {
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
