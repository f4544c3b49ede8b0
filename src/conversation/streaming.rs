// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streamed response assembly and turn observation

use futures::StreamExt;
use std::time::{Duration, Instant};

use super::engine::InterpreterRun;
use crate::error::CmiError;
use crate::llm::Submission;

/// Receives progress of a turn as it happens. Every method defaults to a no-op.
pub trait TurnObserver: Send {
    fn on_prompt(&mut self, _prompt: &str) {}

    fn on_delta(&mut self, _delta: &str) {}

    fn on_response(&mut self, _text: &str, _duration: Duration) {}

    fn on_stream_error(&mut self, _error: &CmiError) {}

    fn on_extracted(&mut self, _source: &str) {}

    fn on_interpreter(&mut self, _run: &InterpreterRun) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

/// Result of draining a response stream
#[derive(Debug)]
pub struct StreamOutcome {
    /// Everything received before the stream ended or failed
    pub text: String,
    pub duration: Duration,
    /// Transport error that cut the stream short
    pub error: Option<CmiError>,
}

impl StreamOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// A started model response with its start marker
pub struct ResponseStream {
    submission: Submission,
    started: Instant,
}

impl ResponseStream {
    pub fn new(submission: Submission, started: Instant) -> Self {
        Self {
            submission,
            started,
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Pull every item, unwrap it and accumulate the text.
    ///
    /// A failing item ends the stream; the text gathered so far is kept.
    pub async fn collect(self, observer: &mut dyn TurnObserver) -> StreamOutcome {
        let Submission { mut items, unwrap } = self.submission;
        let mut text = String::new();
        let mut error = None;

        while let Some(item) = items.next().await {
            match item {
                Ok(item) => {
                    let delta = unwrap.unwrap(&item);
                    if !delta.is_empty() {
                        text.push_str(delta);
                        observer.on_delta(delta);
                    }
                }
                Err(e) => {
                    tracing::warn!("Response stream failed after {} bytes: {}", text.len(), e);
                    observer.on_stream_error(&e);
                    error = Some(e);
                    break;
                }
            }
        }

        StreamOutcome {
            text,
            duration: self.started.elapsed(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::llm::{ItemStream, UnwrapStrategy};
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        deltas: Vec<String>,
        errors: usize,
    }

    impl TurnObserver for Recorder {
        fn on_delta(&mut self, delta: &str) {
            self.deltas.push(delta.to_string());
        }

        fn on_stream_error(&mut self, _error: &CmiError) {
            self.errors += 1;
        }
    }

    fn stream_of(items: Vec<crate::error::Result<serde_json::Value>>) -> ResponseStream {
        let items: ItemStream = Box::pin(futures::stream::iter(items));
        ResponseStream::new(
            Submission::new(items, UnwrapStrategy::PlainText),
            Instant::now(),
        )
    }

    #[tokio::test]
    async fn test_collect_concatenates_deltas() {
        let mut recorder = Recorder::default();
        let outcome = stream_of(vec![Ok(json!("a")), Ok(json!(null)), Ok(json!("b"))])
            .collect(&mut recorder)
            .await;
        assert_eq!(outcome.text, "ab");
        assert!(outcome.is_complete());
        assert_eq!(recorder.deltas, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_collect_keeps_partial_on_error() {
        let mut recorder = Recorder::default();
        let outcome = stream_of(vec![
            Ok(json!("part")),
            Err(CmiError::Api(ApiError::StreamError("reset".into()))),
            Ok(json!("never")),
        ])
        .collect(&mut recorder)
        .await;
        assert_eq!(outcome.text, "part");
        assert!(outcome.error.unwrap().is_transport());
        assert_eq!(recorder.errors, 1);
    }

    #[tokio::test]
    async fn test_noop_observer() {
        let stream = stream_of(vec![]);
        let started = stream.started();
        let outcome = stream.collect(&mut NoopObserver).await;
        assert_eq!(outcome.text, "");
        assert!(outcome.duration <= started.elapsed());
    }
}
