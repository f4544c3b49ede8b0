// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Syntax extraction from model replies
//!
//! Each interpreter has a primary pattern for its concrete syntax and a
//! generic fenced code block fallback. The primary pattern is tried first on
//! the whole reply; the fallback only runs when the primary finds nothing.
//! Exactly one of primary, fallback or nothing applies to any reply.

use regex::Regex;
use std::sync::LazyLock;

use super::DiagramSyntax;

static BPMN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(<bpmn(:definitions)?.*?/bpmn(:definitions)?>)").unwrap());

static PLANTUML_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)@startuml(.*?)@enduml").unwrap());

static GRAPHVIZ_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)((?:strict\s+)?\b(?:di)?graph\s*[\w.]*\s*\{.*\})").unwrap()
});

static FENCED_BLOCK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());

/// Which rule produced an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Primary,
    Fallback,
}

/// Extracted diagram source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub source: String,
    pub rule: MatchRule,
}

fn primary_pattern(syntax: DiagramSyntax) -> &'static Regex {
    match syntax {
        DiagramSyntax::Bpmn => &BPMN_PATTERN,
        DiagramSyntax::PlantUml => &PLANTUML_PATTERN,
        DiagramSyntax::Graphviz => &GRAPHVIZ_PATTERN,
        DiagramSyntax::Ditaa => &FENCED_BLOCK_PATTERN,
    }
}

fn first_group(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pull the diagram source for `syntax` out of a model reply
pub fn extract(syntax: DiagramSyntax, text: &str) -> Option<Extraction> {
    if let Some(source) = first_group(primary_pattern(syntax), text) {
        return Some(Extraction {
            source,
            rule: MatchRule::Primary,
        });
    }

    first_group(&FENCED_BLOCK_PATTERN, text).map(|source| Extraction {
        source,
        rule: MatchRule::Fallback,
    })
}
