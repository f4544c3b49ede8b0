// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Wire helpers shared by the HTTP backends

use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Deserialize;
use std::pin::Pin;

use crate::error::{ApiError, CmiError, Result};

/// One server-sent event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event name, `message` when the server sent none
    pub event: String,
    pub data: String,
}

/// Incremental SSE parser; feed it raw bytes as they arrive
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every event it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing event not followed by a blank line
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let event = SseEvent {
            event: self
                .event
                .take()
                .unwrap_or_else(|| "message".to_string()),
            data: self.data.join("\n"),
        };
        self.data.clear();
        Some(event)
    }
}

/// Turn a streaming HTTP response into SSE events
pub(crate) fn sse_events(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<SseEvent>> + Send>> {
    let mut bytes = response.bytes_stream();
    Box::pin(async_stream::try_stream! {
        let mut parser = SseParser::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(stream_error)?;
            for event in parser.feed(&chunk) {
                yield event;
            }
        }
        if let Some(event) = parser.finish() {
            yield event;
        }
    })
}

/// Turn a newline-delimited JSON response into JSON values
pub(crate) fn ndjson_values(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<serde_json::Value>> + Send>> {
    let mut bytes = response.bytes_stream();
    Box::pin(async_stream::try_stream! {
        let mut buffer: Vec<u8> = Vec::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(stream_error)?;
            buffer.extend_from_slice(&chunk);
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(value) = parse_json_line(&line)? {
                    yield value;
                }
            }
        }
        if let Some(value) = parse_json_line(&buffer)? {
            yield value;
        }
    })
}

fn parse_json_line(line: &[u8]) -> Result<Option<serde_json::Value>> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| CmiError::Api(ApiError::InvalidResponse(e.to_string())))
}

pub(crate) fn stream_error(e: reqwest::Error) -> CmiError {
    CmiError::Api(ApiError::StreamError(e.to_string()))
}

/// Parse numeric Retry-After header (seconds).
pub(crate) fn parse_retry_after_seconds(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u32>().ok())
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed {
        message: String,
        #[serde(default)]
        code: Option<serde_json::Value>,
    },
    Plain(String),
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    detail: String,
}

/// Map an unsuccessful HTTP status and body onto an API error
pub(crate) fn parse_error(status: u16, body: &str, retry_after: Option<u32>) -> CmiError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| match e.error {
            ErrorBody::Detailed { message, code } => {
                let code = code
                    .as_ref()
                    .and_then(|c| c.as_str())
                    .unwrap_or_default()
                    .to_string();
                (message, code)
            }
            ErrorBody::Plain(message) => (message, String::new()),
        })
        .or_else(|_| {
            serde_json::from_str::<DetailEnvelope>(body).map(|d| (d.detail, String::new()))
        })
        .unwrap_or_else(|_| (body.to_string(), String::new()));
    let (message, code) = message;

    let error = match (status, code.as_str()) {
        (401, _) | (_, "invalid_api_key") => ApiError::AuthenticationFailed,
        (429, _) | (_, "rate_limit_exceeded") => ApiError::RateLimited(retry_after.unwrap_or(60)),
        (404, _) | (_, "model_not_found") => ApiError::ModelNotFound(message),
        _ => ApiError::ServerError { status, message },
    };
    CmiError::Api(error)
}

/// Read the body of a failed response and map it onto an API error
pub(crate) async fn error_from_response(response: reqwest::Response) -> CmiError {
    let status = response.status().as_u16();
    let retry_after = parse_retry_after_seconds(response.headers());
    let body = response.text().await.unwrap_or_default();
    parse_error(status, &body, retry_after)
}

/// Map connection failures to a readable network error
pub(crate) fn connect_error(e: reqwest::Error, what: &str) -> CmiError {
    if e.is_connect() {
        CmiError::Api(ApiError::Network(format!("{} is not reachable: {}", what, e)))
    } else {
        CmiError::Http(e)
    }
}
