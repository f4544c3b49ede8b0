// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Per-interpreter input normalization

use super::assembler::DocumentAssembler;
use super::DiagramSyntax;

/// Language tags a fenced block may open with
const LANGUAGE_TAGS: &[&str] = &[
    "plantuml", "puml", "uml", "graphviz", "dot", "ditaa", "xml", "bpmn",
];

/// Drop a leading language-tag line such as `plantuml\n`
pub fn strip_language_tag(source: &str) -> &str {
    if let Some((first, rest)) = source.split_once('\n') {
        let tag = first.trim();
        if LANGUAGE_TAGS.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return rest;
        }
    }
    source
}

fn wrap_directives(source: &str, start: &str, end: &str) -> String {
    let mut wrapped = String::with_capacity(source.len() + start.len() + end.len() + 2);
    if !source.contains(start) {
        wrapped.push_str(start);
        wrapped.push('\n');
    }
    wrapped.push_str(source);
    if !source.contains(end) {
        wrapped.push('\n');
        wrapped.push_str(end);
    }
    wrapped
}

/// Reshape extracted source into what the renderer for `syntax` expects
pub fn normalize(
    syntax: DiagramSyntax,
    source: &str,
    assembler: &dyn DocumentAssembler,
) -> String {
    let source = strip_language_tag(source);
    match syntax {
        DiagramSyntax::PlantUml => wrap_directives(source, "@startuml", "@enduml"),
        DiagramSyntax::Graphviz => wrap_directives(source, "@startdot", "@enddot"),
        DiagramSyntax::Ditaa => source.to_string(),
        DiagramSyntax::Bpmn => assembler.assemble(source),
    }
}
