// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation engine
//!
//! Owns the message history and the current model/interpreter selection,
//! drives prompts through the selected backend and renders whatever diagram
//! source comes back.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::history::History;
use super::message::{Message, MessageFormat};
use super::pipeline::split_batch;
use super::selection::SelectionSide;
use super::streaming::{ResponseStream, StreamOutcome, TurnObserver};
use crate::config::Settings;
use crate::error::{CmiError, Result};
use crate::interpreter::{
    extract, finalize_output, normalize, DocumentAssembler, RegexBpmnAssembler, RenderPayload,
    Renderer, RendererInit,
};
use crate::llm::{BackendFactory, ModelBackend, ModelInit};
use crate::params::{interpreter_defaults, model_defaults, ParameterSet};
use crate::registry::Registry;
use crate::store::{ConversationLog, LogEvent};

/// Shown in place of a diagram when the renderer failed or produced nothing
pub const INVALID_RESPONSE_TEXT: &str = "*Interpreter response invalid*";

/// Shown when the renderer answered with an empty payload
pub const EMPTY_RESULT_TEXT: &str = "*Interpreter returned an empty result*";

/// One pass of extracted source through the renderer
#[derive(Debug)]
pub struct InterpreterRun {
    pub interpreter_id: String,
    /// Normalized source as sent to the renderer
    pub input: String,
    pub output: Option<RenderPayload>,
    pub format: Option<String>,
    pub duration: Duration,
    pub error: Option<CmiError>,
}

impl InterpreterRun {
    /// Whether a non-empty diagram was produced
    pub fn is_rendered(&self) -> bool {
        self.output.as_ref().is_some_and(|p| !p.is_empty())
    }
}

/// What happened to a single prompt
#[derive(Debug)]
pub struct TurnReport {
    pub prompt: String,
    /// `None` when the request never got a response stream
    pub response: Option<String>,
    pub duration: Option<Duration>,
    /// Transport error that ended the turn early
    pub error: Option<CmiError>,
    pub extracted: Option<String>,
    pub interpreter: Option<InterpreterRun>,
}

impl TurnReport {
    fn new(prompt: String) -> Self {
        Self {
            prompt,
            response: None,
            duration: None,
            error: None,
            extracted: None,
            interpreter: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Drives a conversation between the user, a model and a diagram renderer
pub struct ConversationEngine {
    registry: Registry,
    settings: Settings,
    factory: Arc<dyn BackendFactory>,
    log: Box<dyn ConversationLog>,
    assembler: Box<dyn DocumentAssembler>,
    history: History,
    model: SelectionSide,
    interpreter: SelectionSide,
    model_backend: Option<Box<dyn ModelBackend>>,
    renderer: Option<Box<dyn Renderer>>,
}

impl ConversationEngine {
    pub fn new(
        registry: Registry,
        settings: Settings,
        factory: Arc<dyn BackendFactory>,
        mut log: Box<dyn ConversationLog>,
    ) -> Self {
        let history = History::new(settings.conversation.init_message.clone());
        log.start_conversation(history.init_message());
        Self {
            registry,
            settings,
            factory,
            log,
            assembler: Box::new(RegexBpmnAssembler::new()),
            history,
            model: SelectionSide::new(),
            interpreter: SelectionSide::new(),
            model_backend: None,
            renderer: None,
        }
    }

    /// Replace the BPMN document assembler
    pub fn with_assembler(mut self, assembler: Box<dyn DocumentAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn messages(&self) -> &[Message] {
        self.history.messages()
    }

    pub fn selected_model(&self) -> Option<&str> {
        self.model.selected()
    }

    pub fn selected_interpreter(&self) -> Option<&str> {
        self.interpreter.selected()
    }

    /// Live model parameters; empty until the model has been initialized
    pub fn model_parameters(&self) -> &ParameterSet {
        self.model.parameters()
    }

    pub fn model_parameter_defaults(&self) -> &ParameterSet {
        self.model.parameters_default()
    }

    pub fn interpreter_parameters(&self) -> &ParameterSet {
        self.interpreter.parameters()
    }

    pub fn interpreter_parameter_defaults(&self) -> &ParameterSet {
        self.interpreter.parameters_default()
    }

    /// Select a model by id. Returns whether the selection changed; a change
    /// drops the backend and its parameters. An empty id deselects.
    pub fn select_model(&mut self, id: &str) -> bool {
        let changed = self.model.select(id);
        if changed {
            self.model_backend = None;
            info!("Selected model: {}", self.model.selected().unwrap_or("none"));
        }
        changed
    }

    /// Select an interpreter by id, same rules as [`Self::select_model`]
    pub fn select_interpreter(&mut self, id: &str) -> bool {
        let changed = self.interpreter.select(id);
        if changed {
            self.renderer = None;
            info!(
                "Selected interpreter: {}",
                self.interpreter.selected().unwrap_or("none")
            );
        }
        changed
    }

    /// Create and initialize the backend for the selected model if needed,
    /// then hand out its live parameters.
    ///
    /// Parameters are only bound after initialization succeeded, so a failed
    /// attempt leaves the side unbound and the next call retries.
    pub async fn ensure_model_parameters(&mut self) -> Result<&mut ParameterSet> {
        let id = self
            .model
            .selected()
            .ok_or(CmiError::NoModelSelected)?
            .to_string();

        if self.model_backend.is_none() || self.model.parameters.is_empty() {
            let family = self.registry.model_family(&id)?;
            let canonical_id = self.registry.canonical_id(&id)?;
            let defaults = model_defaults(family);
            let init = ModelInit {
                model_id: id.clone(),
                canonical_id,
                parameters: defaults.clone(),
                access: self.settings.model_access(family),
            };

            let mut backend = self.factory.create_model_backend(family)?;
            backend.initialize(&init).await?;
            debug!("Initialized {} backend for {}", family, id);

            self.model.bind(defaults);
            self.model_backend = Some(backend);
            self.log.record(LogEvent::ModelConfiguration {
                model_id: id,
                parameters: self.model.parameters.clone(),
            });
        }

        Ok(&mut self.model.parameters)
    }

    /// Interpreter counterpart of [`Self::ensure_model_parameters`]
    pub async fn ensure_interpreter_parameters(&mut self) -> Result<&mut ParameterSet> {
        let id = self
            .interpreter
            .selected()
            .ok_or(CmiError::NoInterpreterSelected)?
            .to_string();

        if self.renderer.is_none() || self.interpreter.parameters.is_empty() {
            let descriptor = self.registry.interpreter(&id)?.clone();
            let defaults = interpreter_defaults(descriptor.family);
            let mut access = self.settings.interpreter_access(descriptor.family);
            if let Some(endpoint) = descriptor.endpoint {
                access.endpoint = endpoint;
            }
            let init = RendererInit {
                interpreter_id: id.clone(),
                syntax: descriptor.syntax,
                parameters: defaults.clone(),
                access,
            };

            let mut renderer = self.factory.create_renderer(descriptor.family)?;
            renderer.initialize(&init).await?;
            debug!("Initialized {} renderer for {}", descriptor.family, id);

            self.interpreter.bind(defaults);
            self.renderer = Some(renderer);
            self.log.record(LogEvent::InterpreterConfiguration {
                interpreter_id: id,
                parameters: self.interpreter.parameters.clone(),
            });
        }

        Ok(&mut self.interpreter.parameters)
    }

    /// Set a model parameter from user text
    pub async fn set_model_parameter(&mut self, name: &str, raw: &str) -> Result<()> {
        self.ensure_model_parameters().await?.set_from_str(name, raw)
    }

    /// Set an interpreter parameter from user text
    pub async fn set_interpreter_parameter(&mut self, name: &str, raw: &str) -> Result<()> {
        self.ensure_interpreter_parameters()
            .await?
            .set_from_str(name, raw)
    }

    /// Send the dialogue ending in the latest prompt to the selected model
    pub async fn start_response(&mut self) -> Result<ResponseStream> {
        self.ensure_model_parameters().await?;

        let prompt = match self.history.last() {
            Some(m) if m.format == MessageFormat::Prompt => m.text().unwrap_or_default().to_string(),
            _ => {
                return Err(CmiError::InvalidInput(
                    "The conversation does not end with a prompt".to_string(),
                ))
            }
        };
        let model_id = self
            .model
            .selected()
            .ok_or(CmiError::NoModelSelected)?
            .to_string();

        self.log.record(LogEvent::ModelConfiguration {
            model_id: model_id.clone(),
            parameters: self.model.parameters.clone(),
        });
        self.log.record(LogEvent::Prompt(prompt));

        let dialogue = self
            .history
            .dialogue(Some(self.settings.conversation.system_instruction.clone()));
        let backend = self
            .model_backend
            .as_ref()
            .ok_or(CmiError::NoModelSelected)?;

        info!("Submitting {} turns to {}", dialogue.len(), model_id);
        let started = Instant::now();
        let submission = backend.submit(&dialogue, &self.model.parameters).await?;
        Ok(ResponseStream::new(submission, started))
    }

    /// Append a finished (or cut short) response to the history
    pub fn record_response(&mut self, outcome: &StreamOutcome) {
        self.history.push(Message::llm_response(outcome.text.clone()));
        self.log.record(LogEvent::Response {
            text: outcome.text.clone(),
            duration: outcome.duration,
        });
    }

    /// Pull diagram source out of the latest response for the selected
    /// interpreter and remember it on the message
    pub fn process_response(&mut self) -> Option<String> {
        let id = self.interpreter.selected()?.to_string();
        let syntax = match self.registry.interpreter(&id) {
            Ok(descriptor) => descriptor.syntax,
            Err(e) => {
                warn!("{}", e);
                return None;
            }
        };

        let last = self.history.last_mut()?;
        if last.format != MessageFormat::LlmResponse {
            return None;
        }
        let text = last.text()?.to_string();

        match extract(syntax, &text) {
            Some(extraction) => {
                debug!("Extracted {} source via {:?}", syntax, extraction.rule);
                last.extracted_source = Some(extraction.source.clone());
                Some(extraction.source)
            }
            None => {
                debug!("No {} source in response", syntax);
                None
            }
        }
    }

    /// Normalize `source`, render it and append the result to the history.
    ///
    /// Renderer failures become an interpreter message, not an error; only
    /// a failure to set up the renderer is returned as `Err`.
    pub async fn run_interpreter(&mut self, source: &str) -> Result<InterpreterRun> {
        self.ensure_interpreter_parameters().await?;

        let id = self
            .interpreter
            .selected()
            .ok_or(CmiError::NoInterpreterSelected)?
            .to_string();
        let syntax = self.registry.interpreter(&id)?.syntax;
        let input = normalize(syntax, source, self.assembler.as_ref());

        self.log.record(LogEvent::InterpreterConfiguration {
            interpreter_id: id.clone(),
            parameters: self.interpreter.parameters.clone(),
        });
        self.log.record(LogEvent::InterpreterInput(input.clone()));

        let renderer = self
            .renderer
            .as_ref()
            .ok_or(CmiError::NoInterpreterSelected)?;
        let started = Instant::now();
        let result = renderer.render(&input, &self.interpreter.parameters).await;
        let duration = started.elapsed();

        let mut run = InterpreterRun {
            interpreter_id: id,
            input,
            output: None,
            format: None,
            duration,
            error: None,
        };

        match result {
            Ok(Some(output)) => {
                let format = output.format.clone();
                let payload = finalize_output(output);
                self.log.record(LogEvent::InterpreterOutput {
                    payload: payload.clone(),
                    format: format.clone(),
                    duration,
                });
                if payload.is_empty() {
                    warn!("{} returned an empty {} payload", run.interpreter_id, format);
                    self.history.push(Message::interpreter_text(EMPTY_RESULT_TEXT));
                } else {
                    info!(
                        "Rendered {} bytes of {} in {:.2}s",
                        payload.len(),
                        format,
                        duration.as_secs_f64()
                    );
                    self.history
                        .push(Message::interpreter_image(payload.clone(), format.clone()));
                }
                run.output = Some(payload);
                run.format = Some(format);
            }
            Ok(None) => {
                warn!("{} produced no output", run.interpreter_id);
                self.history.push(Message::interpreter_text(INVALID_RESPONSE_TEXT));
            }
            Err(e) => {
                warn!("{} failed: {}", run.interpreter_id, e);
                self.history.push(Message::interpreter_text(INVALID_RESPONSE_TEXT));
                run.error = Some(e);
            }
        }

        Ok(run)
    }

    /// Submit user input, which may hold several prompts separated by the
    /// batch delimiter. Prompts run in order; a turn that fails in transport
    /// ends the batch.
    pub async fn submit(
        &mut self,
        input: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<Vec<TurnReport>> {
        self.ensure_model_parameters().await?;

        let prompts = split_batch(input, &self.settings.conversation.batch_delimiter);
        if prompts.is_empty() {
            return Err(CmiError::InvalidInput("Empty prompt".to_string()));
        }

        let count = prompts.len();
        let mut reports = Vec::with_capacity(count);
        for (i, prompt) in prompts.into_iter().enumerate() {
            self.history.push(Message::prompt(prompt.clone()));
            observer.on_prompt(&prompt);

            let report = self.run_turn(prompt, observer).await?;
            let failed = report.failed();
            reports.push(report);
            if failed && i + 1 < count {
                warn!("Stopping batch after failed prompt {} of {}", i + 1, count);
                break;
            }
        }
        Ok(reports)
    }

    async fn run_turn(
        &mut self,
        prompt: String,
        observer: &mut dyn TurnObserver,
    ) -> Result<TurnReport> {
        let mut report = TurnReport::new(prompt);

        let stream = match self.start_response().await {
            Ok(stream) => stream,
            Err(e) if e.is_transport() => {
                warn!("Request failed: {}", e);
                observer.on_stream_error(&e);
                report.error = Some(e);
                return Ok(report);
            }
            Err(e) => return Err(e),
        };

        let outcome = stream.collect(observer).await;
        self.record_response(&outcome);
        observer.on_response(&outcome.text, outcome.duration);

        report.duration = Some(outcome.duration);
        report.response = Some(outcome.text);
        report.error = outcome.error;

        if let Some(source) = self.process_response() {
            observer.on_extracted(&source);
            let run = self.run_interpreter(&source).await?;
            observer.on_interpreter(&run);
            report.extracted = Some(source);
            report.interpreter = Some(run);
        }

        Ok(report)
    }

    /// Drop the latest response and everything rendered from it, then ask
    /// the model again. `None` when there is no prompt to rerun.
    pub async fn rerun_llm(&mut self, observer: &mut dyn TurnObserver) -> Result<Option<TurnReport>> {
        self.ensure_model_parameters().await?;
        match self.history.rerun_llm() {
            Some(prompt) => {
                observer.on_prompt(&prompt);
                Ok(Some(self.run_turn(prompt, observer).await?))
            }
            None => Ok(None),
        }
    }

    /// Render the latest response's source again, optionally replaced by an
    /// edited version. `None` when there is nothing to render.
    pub async fn rerun_interpreter(&mut self, edited: Option<String>) -> Result<Option<InterpreterRun>> {
        self.ensure_interpreter_parameters().await?;
        match self.history.rerun_interpreter(edited) {
            Some(source) => Ok(Some(self.run_interpreter(&source).await?)),
            None => Ok(None),
        }
    }

    /// Remove the latest prompt with everything that followed it
    pub fn remove_last_turn(&mut self) -> usize {
        let removed = self.history.remove_last_turn();
        debug!("Removed {} messages", removed);
        removed
    }

    /// Forget every message but the init message and start a new log
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.log.start_conversation(self.history.init_message());
        info!("Conversation history cleared");
    }

    /// Clear the history and drop both selections
    pub fn new_conversation(&mut self) {
        self.select_model("");
        self.select_interpreter("");
        self.clear_history();
    }

    /// Attach a free-form note to the conversation log
    pub fn annotate(&mut self, text: &str) {
        self.log.record(LogEvent::Annotation(text.to_string()));
    }

    /// Merge live model lists from local runtimes that can report them.
    ///
    /// Returns whether any family was newly merged. An unreachable runtime is
    /// logged and skipped.
    pub async fn requery_models(&mut self) -> Result<bool> {
        let mut merged = false;
        for family in self.registry.families() {
            let Some(lister) = self
                .factory
                .model_lister(*family, &self.settings.model_access(*family))
            else {
                continue;
            };
            match self.registry.requery_models(lister.as_ref()).await {
                Ok(changed) => merged |= changed,
                Err(e) if e.is_transport() => warn!("Could not list {} models: {}", family, e),
                Err(e) => return Err(e),
            }
        }
        Ok(merged)
    }
}
