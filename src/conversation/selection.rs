// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Selected id plus its live and default parameters

use crate::params::ParameterSet;

/// One side of the selection state: the model or the interpreter
#[derive(Debug, Clone, Default)]
pub struct SelectionSide {
    selected: Option<String>,
    pub(crate) parameters: ParameterSet,
    pub(crate) parameters_default: ParameterSet,
}

impl SelectionSide {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameters_default(&self) -> &ParameterSet {
        &self.parameters_default
    }

    /// Store `id` and reset both parameter maps if it differs from the
    /// current one. An empty id means "nothing selected".
    pub fn select(&mut self, id: &str) -> bool {
        let id = id.trim();
        let requested = (!id.is_empty()).then(|| id.to_string());
        if requested == self.selected {
            return false;
        }
        self.selected = requested;
        self.reset();
        true
    }

    /// Forget the bound parameters, keeping the selection
    pub fn reset(&mut self) {
        self.parameters.clear();
        self.parameters_default.clear();
    }

    /// Bind freshly created defaults to both maps
    pub fn bind(&mut self, defaults: ParameterSet) {
        self.parameters = defaults.clone();
        self.parameters_default = defaults;
    }
}
