// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use cmi::error::{ApiError, CmiError};
use std::io;

#[test]
fn test_io_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
    let cmi_error: CmiError = io_error.into();

    match cmi_error {
        CmiError::Io(_) => {} // Expected
        _ => panic!("Expected Io error, got different error type"),
    }
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let cmi_error: CmiError = json_error.into();
    assert!(matches!(cmi_error, CmiError::Json(_)));
    assert!(!cmi_error.is_transport());
}

#[test]
fn test_config_error_display() {
    let error = CmiError::Config("Missing API key".to_string());
    assert_eq!(error.to_string(), "Configuration error: Missing API key");
}

#[test]
fn test_selection_errors_display() {
    assert_eq!(CmiError::NoModelSelected.to_string(), "No model selected");
    assert_eq!(
        CmiError::NoInterpreterSelected.to_string(),
        "No interpreter selected"
    );
}

#[test]
fn test_render_error_is_not_transport() {
    let error = CmiError::Render("unsupported format".to_string());
    assert_eq!(error.to_string(), "Render error: unsupported format");
    assert!(!error.is_transport());
}

#[test]
fn test_api_rate_limited_error() {
    let error = ApiError::RateLimited(30);
    assert_eq!(error.to_string(), "Rate limited: retry after 30 seconds");
}

#[test]
fn test_api_authentication_error() {
    let error = ApiError::AuthenticationFailed;
    assert_eq!(error.to_string(), "Authentication failed: invalid API key");
}

#[test]
fn test_api_model_not_found_error() {
    let error = ApiError::ModelNotFound("gpt-17".to_string());
    assert_eq!(error.to_string(), "Model not found: gpt-17");
}

#[test]
fn test_api_server_error_display() {
    let error = ApiError::ServerError {
        status: 503,
        message: "layout service unavailable".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "API error (503): layout service unavailable"
    );
}

#[test]
fn test_wrapped_api_errors_are_transport() {
    let errors: Vec<CmiError> = vec![
        ApiError::Network("connection refused".to_string()).into(),
        ApiError::InvalidResponse("no choices".to_string()).into(),
        ApiError::StreamError("eof".to_string()).into(),
    ];
    for error in errors {
        assert!(error.is_transport(), "{} should be transport", error);
        assert!(error.to_string().starts_with("API error: "));
    }
}

#[test]
fn test_local_errors_are_not_transport() {
    assert!(!CmiError::UnknownModel("x".into()).is_transport());
    assert!(!CmiError::UnknownInterpreter("x".into()).is_transport());
    assert!(!CmiError::InvalidInput("x".into()).is_transport());
    assert!(!CmiError::NoModelSelected.is_transport());
}
