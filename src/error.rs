// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for cmi
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for cmi operations
#[derive(Error, Debug)]
pub enum CmiError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// The model id does not belong to any known backend family
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The interpreter id does not belong to any known renderer family
    #[error("Unknown interpreter: {0}")]
    UnknownInterpreter(String),

    /// An operation needed a model but none has been selected
    #[error("No model selected")]
    NoModelSelected,

    /// An operation needed an interpreter but none has been selected
    #[error("No interpreter selected")]
    NoInterpreterSelected,

    /// Renderer failures that are not transport errors
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Requested model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

impl CmiError {
    /// Whether this error came from talking to a backend or renderer.
    ///
    /// Transport errors are recovered locally: the partial state is kept and
    /// the error is shown, the session carries on.
    pub fn is_transport(&self) -> bool {
        matches!(self, CmiError::Api(_) | CmiError::Http(_))
    }
}

/// Result type alias for cmi operations
pub type Result<T> = std::result::Result<T, CmiError>;
