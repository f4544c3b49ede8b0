// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Diagram interpreters
//!
//! Pulls diagram source out of model replies, reshapes it for the target
//! renderer and hands it to a rendering backend.

pub mod assembler;
pub mod bpmn;
pub mod extract;
pub mod mock_renderer;
pub mod normalize;
pub mod plantuml;
pub mod renderer;

pub use assembler::{DocumentAssembler, RegexBpmnAssembler};
pub use extract::{extract, Extraction, MatchRule};
pub use normalize::{normalize, strip_language_tag};
pub use renderer::{finalize_output, RenderOutput, RenderPayload, Renderer, RendererInit};

use serde::Serialize;
use std::fmt;

/// The concrete syntax an interpreter consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagramSyntax {
    Bpmn,
    PlantUml,
    Graphviz,
    Ditaa,
}

impl DiagramSyntax {
    pub fn name(&self) -> &'static str {
        match self {
            DiagramSyntax::Bpmn => "BPMN",
            DiagramSyntax::PlantUml => "PlantUML",
            DiagramSyntax::Graphviz => "Graphviz",
            DiagramSyntax::Ditaa => "DITAA",
        }
    }
}

impl fmt::Display for DiagramSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
