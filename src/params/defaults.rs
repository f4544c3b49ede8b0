// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Default parameter sets per backend family

use super::{Control, ParamValue, Parameter, ParameterSet};
use crate::registry::{InterpreterFamily, ModelFamily};

fn temperature() -> Parameter {
    Parameter::new(
        "temperature",
        ParamValue::Float(0.2),
        Control::Slider {
            min: 0.01,
            max: 5.0,
            step: 0.01,
        },
    )
}

fn top_p() -> Parameter {
    Parameter::new(
        "top_p",
        ParamValue::Float(0.9),
        Control::Slider {
            min: 0.01,
            max: 1.0,
            step: 0.01,
        },
    )
}

fn penalty(name: &str) -> Parameter {
    Parameter::new(
        name,
        ParamValue::Float(0.0),
        Control::Slider {
            min: -2.0,
            max: 2.0,
            step: 0.01,
        },
    )
}

fn int_param(name: &str, value: i64, min: Option<f64>, step: f64) -> Parameter {
    Parameter::new(name, ParamValue::Int(value), Control::Number { min, step })
}

fn output_format(options: &[&str]) -> Parameter {
    Parameter::new(
        "Output format",
        ParamValue::Choice {
            options: options.iter().map(|o| o.to_string()).collect(),
            selected: options.first().map(|o| o.to_string()).unwrap_or_default(),
        },
        Control::Select,
    )
}

/// Defaults for a model family
pub fn model_defaults(family: ModelFamily) -> ParameterSet {
    let base = ParameterSet::new().with(temperature()).with(top_p());
    match family {
        ModelFamily::OpenAi => base
            .with(penalty("presence_penalty"))
            .with(penalty("frequency_penalty")),
        ModelFamily::Replicate => base
            .with(int_param("max_new_tokens", 4096, Some(64.0), 8.0))
            .with(int_param("min_new_tokens", -1, Some(-1.0), 1.0))
            .with(int_param("top_k", 50, Some(1.0), 1.0)),
        ModelFamily::LlamaCpp => base
            .with(int_param("top_k", 50, Some(1.0), 1.0))
            .with(int_param("n_tokens_max", 4096, Some(64.0), 8.0))
            .with(int_param("n_tokens_min", -1, Some(-1.0), 1.0))
            .with(int_param("n_ctx", 4096, None, 1.0)),
        ModelFamily::Ollama => base
            .with(int_param("top_k", 50, Some(1.0), 1.0))
            .with(int_param("num_ctx", 4096, None, 1.0)),
    }
}

/// Defaults for an interpreter family
pub fn interpreter_defaults(family: InterpreterFamily) -> ParameterSet {
    match family {
        InterpreterFamily::BpmnAutoLayout => ParameterSet::new().with(output_format(&["SVG"])),
        InterpreterFamily::Plantweb => ParameterSet::new()
            .with(output_format(&["SVG", "PNG"]))
            .with(Parameter::new(
                "Use cache",
                ParamValue::Bool(false),
                Control::Toggle,
            )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_defaults() {
        let params = model_defaults(ModelFamily::OpenAi);
        assert_eq!(
            params.names(),
            vec![
                "temperature",
                "top_p",
                "presence_penalty",
                "frequency_penalty"
            ]
        );
        assert_eq!(params.get("temperature"), Some(&ParamValue::Float(0.2)));
        assert_eq!(params.get("top_p"), Some(&ParamValue::Float(0.9)));
    }

    #[test]
    fn test_replicate_defaults() {
        let params = model_defaults(ModelFamily::Replicate);
        assert_eq!(params.get("max_new_tokens"), Some(&ParamValue::Int(4096)));
        assert_eq!(params.get("min_new_tokens"), Some(&ParamValue::Int(-1)));
        assert_eq!(params.get("top_k"), Some(&ParamValue::Int(50)));
    }

    #[test]
    fn test_llama_cpp_defaults() {
        let params = model_defaults(ModelFamily::LlamaCpp);
        assert_eq!(params.len(), 6);
        assert_eq!(params.get("n_ctx"), Some(&ParamValue::Int(4096)));
    }

    #[test]
    fn test_ollama_defaults() {
        let params = model_defaults(ModelFamily::Ollama);
        assert_eq!(params.get("num_ctx"), Some(&ParamValue::Int(4096)));
    }

    #[test]
    fn test_min_new_tokens_bound() {
        let mut params = model_defaults(ModelFamily::Replicate);
        assert!(params.set("min_new_tokens", ParamValue::Int(-2)).is_err());
        assert!(params.set("max_new_tokens", ParamValue::Int(32)).is_err());
    }

    #[test]
    fn test_interpreter_defaults() {
        let bpmn = interpreter_defaults(InterpreterFamily::BpmnAutoLayout);
        assert_eq!(bpmn.names(), vec!["Output format"]);
        assert_eq!(bpmn.get("Output format").unwrap().as_str(), Some("SVG"));

        let plantweb = interpreter_defaults(InterpreterFamily::Plantweb);
        assert_eq!(plantweb.get("Use cache"), Some(&ParamValue::Bool(false)));
        match plantweb.get("Output format") {
            Some(ParamValue::Choice { options, .. }) => assert_eq!(options, &["SVG", "PNG"]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
