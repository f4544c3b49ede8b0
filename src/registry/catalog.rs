// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Built-in model and interpreter catalog

use super::{InterpreterFamily, ModelFamily};
use crate::interpreter::DiagramSyntax;

/// Models known without asking any server: (family, name, canonical id)
pub(crate) const BUILTIN_MODELS: &[(ModelFamily, &str, &str)] = &[
    (ModelFamily::OpenAi, "gpt-4", "gpt-4"),
    (ModelFamily::OpenAi, "gpt-3.5-turbo", "gpt-3.5-turbo"),
    (ModelFamily::OpenAi, "gpt-3.5-turbo-16k", "gpt-3.5-turbo-16k"),
    (
        ModelFamily::OpenAi,
        "gpt-3.5-turbo-instruct",
        "gpt-3.5-turbo-instruct",
    ),
    (
        ModelFamily::Replicate,
        "Llama2-70B-Chat",
        "replicate/llama-2-70b-chat:2796ee9483c3fd7aa2e171d38f4ca12251a30609463dcfd4cd76703f22e96cdf",
    ),
    (
        ModelFamily::Replicate,
        "Llama2-70B",
        "replicate/llama70b-v2-chat:e951f18578850b652510200860fc4ea62b3b16fac280f83ff32282f87bbd2e48",
    ),
    (
        ModelFamily::Replicate,
        "Llama2-13B",
        "a16z-infra/llama13b-v2-chat:df7690f1994d94e96ad9d568eac121aecf50684a0b0963b25a41cc40061269e5",
    ),
    (
        ModelFamily::Replicate,
        "Llama2-7B",
        "a16z-infra/llama7b-v2-chat:4f0a4744c7295c024a1de15e1a63c880d3da035fa1f49bfd344fe076074c8eea",
    ),
    (
        ModelFamily::LlamaCpp,
        "WizardLM-1.1-13B-GGML",
        "models/wizardlm-13b-v1.1.ggmlv3.q4_1.bin",
    ),
    (
        ModelFamily::LlamaCpp,
        "Llama2-13B-GGML",
        "models/llama-2-13b-chat.ggmlv3.q5_K_M.bin",
    ),
    (
        ModelFamily::LlamaCpp,
        "OpenOrca-Platypus2-13B-GGML",
        "models/openorca-platypus2-13b.ggmlv3.q5_K_M.bin",
    ),
];

/// Interpreters: (family, name, syntax)
pub(crate) const BUILTIN_INTERPRETERS: &[(InterpreterFamily, &str, DiagramSyntax)] = &[
    (
        InterpreterFamily::BpmnAutoLayout,
        "BPMN-XML",
        DiagramSyntax::Bpmn,
    ),
    (InterpreterFamily::Plantweb, "PlantUML", DiagramSyntax::PlantUml),
    (InterpreterFamily::Plantweb, "Graphviz", DiagramSyntax::Graphviz),
    (InterpreterFamily::Plantweb, "DITAA", DiagramSyntax::Ditaa),
];

/// Join a family id and a model or interpreter name into a full id
pub fn qualified_id(family_id: &str, name: &str) -> String {
    format!("{}/{}", family_id, name)
}
