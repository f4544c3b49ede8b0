// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Typed parameter sets for models and interpreters
//!
//! Every backend family declares its parameters up front: a name, a typed
//! value and a control hint describing how a front end should edit it.
//! Values are validated against the declared type and bounds on every write.

mod defaults;

pub use defaults::{interpreter_defaults, model_defaults};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CmiError, Result};

/// A typed parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParamValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    /// One of a fixed list of options
    Choice {
        options: Vec<String>,
        selected: String,
    },
}

impl ParamValue {
    /// A short name for the value type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Float(_) => "float",
            ParamValue::Int(_) => "integer",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Text(_) => "text",
            ParamValue::Choice { .. } => "choice",
        }
    }

    /// The plain JSON form sent to backends. A choice becomes its selected option.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Float(v) => serde_json::json!(v),
            ParamValue::Int(v) => serde_json::json!(v),
            ParamValue::Bool(v) => serde_json::Value::Bool(*v),
            ParamValue::Text(v) => serde_json::Value::String(v.clone()),
            ParamValue::Choice { selected, .. } => serde_json::Value::String(selected.clone()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value or the selected option of a choice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v),
            ParamValue::Choice { selected, .. } => Some(selected),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
            ParamValue::Choice { options, selected } => {
                write!(f, "{} [{}]", selected, options.join(", "))
            }
        }
    }
}

/// How a front end should present a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Control {
    /// Bounded slider
    Slider { min: f64, max: f64, step: f64 },
    /// Number input with an optional lower bound
    Number { min: Option<f64>, step: f64 },
    Toggle,
    Select,
    TextInput,
}

impl Control {
    fn check_bounds(&self, name: &str, value: f64) -> Result<()> {
        match self {
            Control::Slider { min, max, .. } if value < *min || value > *max => {
                Err(CmiError::InvalidInput(format!(
                    "{} must be between {} and {}, got {}",
                    name, min, max, value
                )))
            }
            Control::Number { min: Some(min), .. } if value < *min => Err(CmiError::InvalidInput(
                format!("{} must be at least {}, got {}", name, min, value),
            )),
            _ => Ok(()),
        }
    }
}

/// A single named parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: ParamValue,
    pub control: Control,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ParamValue, control: Control) -> Self {
        Self {
            name: name.into(),
            value,
            control,
        }
    }
}

/// An ordered set of parameters for one backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used by the default tables
    pub fn with(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.params.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Set a parameter, checking the name, the value type and the control bounds.
    ///
    /// Integers are accepted for float parameters. For a choice parameter either a
    /// text value naming one of the options or a full choice with the same options
    /// is accepted.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<()> {
        let param = self
            .params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| CmiError::InvalidInput(format!("Unknown parameter: {}", name)))?;

        let next = match (&param.value, value) {
            (ParamValue::Float(_), value @ (ParamValue::Float(_) | ParamValue::Int(_))) => {
                let v = value.as_f64().unwrap_or_default();
                param.control.check_bounds(name, v)?;
                ParamValue::Float(v)
            }
            (ParamValue::Int(_), ParamValue::Int(v)) => {
                param.control.check_bounds(name, v as f64)?;
                ParamValue::Int(v)
            }
            (ParamValue::Bool(_), ParamValue::Bool(v)) => ParamValue::Bool(v),
            (ParamValue::Text(_), ParamValue::Text(v)) => ParamValue::Text(v),
            (ParamValue::Choice { options, .. }, ParamValue::Text(choice))
            | (ParamValue::Choice { options, .. }, ParamValue::Choice { selected: choice, .. }) => {
                let matched = options
                    .iter()
                    .find(|o| o.eq_ignore_ascii_case(&choice))
                    .cloned()
                    .ok_or_else(|| {
                        CmiError::InvalidInput(format!(
                            "{} must be one of [{}], got {}",
                            name,
                            options.join(", "),
                            choice
                        ))
                    })?;
                ParamValue::Choice {
                    options: options.clone(),
                    selected: matched,
                }
            }
            (current, value) => {
                return Err(CmiError::InvalidInput(format!(
                    "{} expects a {} value, got {}",
                    name,
                    current.type_name(),
                    value.type_name()
                )))
            }
        };

        param.value = next;
        Ok(())
    }

    /// Parse `raw` according to the declared type of `name` and set it
    pub fn set_from_str(&mut self, name: &str, raw: &str) -> Result<()> {
        let current = self
            .get(name)
            .ok_or_else(|| CmiError::InvalidInput(format!("Unknown parameter: {}", name)))?;
        let raw = raw.trim();
        let parse_err = |kind: &str| {
            CmiError::InvalidInput(format!("{} expects a {} value, got '{}'", name, kind, raw))
        };

        let value = match current {
            ParamValue::Float(_) => ParamValue::Float(raw.parse().map_err(|_| parse_err("float"))?),
            ParamValue::Int(_) => ParamValue::Int(raw.parse().map_err(|_| parse_err("integer"))?),
            ParamValue::Bool(_) => match raw.to_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => ParamValue::Bool(true),
                "false" | "off" | "no" | "0" => ParamValue::Bool(false),
                _ => return Err(parse_err("boolean")),
            },
            ParamValue::Text(_) | ParamValue::Choice { .. } => ParamValue::Text(raw.to_string()),
        };

        self.set(name, value)
    }

    /// Flatten into a JSON object of plain values
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.params
            .iter()
            .map(|p| (p.name.clone(), p.value.to_json()))
            .collect()
    }
}
