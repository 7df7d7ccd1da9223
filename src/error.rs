// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Rostrum
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;

/// Main error type for Rostrum operations
#[derive(Error, Debug)]
pub enum RostrumError {
    /// API-related errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// No usable credential at model-invocation time
    #[error("No API credential configured: supply one in settings or via GEMINI_API_KEY")]
    MissingCredential,

    /// Judge called before any debater has spoken
    #[error("The judge needs at least one argument on record")]
    InsufficientTranscript,

    /// Judge evaluation failed (transport or parse)
    #[error("Judge evaluation failed: {0}")]
    JudgeEvaluation(String),

    /// Operation referenced an unknown session id
    #[error("No debate found in history with id {0}")]
    HistoryNotFound(String),

    /// Session/state errors (invalid transitions, re-entrant calls)
    #[error("Session error: {0}")]
    Session(String),

    /// Invalid user input (empty topic, over-length argument)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Backend rejected the request; status and body preserved for display
    #[error("API error ({status}): {body}")]
    Server { status: u16, body: String },

    /// Transport failure after retries exhausted without a definitive API response
    #[error("Network error: {0}")]
    Network(String),

    /// Streaming transport error
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Response arrived but could not be interpreted
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for Rostrum operations
pub type Result<T> = std::result::Result<T, RostrumError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_server() {
        let err = ApiError::Server {
            status: 429,
            body: "quota exceeded".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_api_error_network() {
        let err = ApiError::Network("connection refused".to_string());
        assert!(err.to_string().contains("Network error"));
    }

    #[test]
    fn test_error_from_api_error() {
        let api_err = ApiError::Network("timeout".to_string());
        let err: RostrumError = api_err.into();
        assert!(err.to_string().contains("API error"));
    }

    #[test]
    fn test_error_missing_credential() {
        let err = RostrumError::MissingCredential;
        assert!(err.to_string().contains("credential"));
    }

    #[test]
    fn test_error_insufficient_transcript() {
        let err = RostrumError::InsufficientTranscript;
        assert!(err.to_string().contains("at least one argument"));
    }

    #[test]
    fn test_error_judge_evaluation() {
        let err = RostrumError::JudgeEvaluation("bad JSON".to_string());
        assert!(err.to_string().contains("Judge evaluation failed"));
        assert!(err.to_string().contains("bad JSON"));
    }

    #[test]
    fn test_error_history_not_found() {
        let err = RostrumError::HistoryNotFound("abc123".to_string());
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_error_session() {
        let err = RostrumError::Session("a call is already in flight".to_string());
        assert!(err.to_string().contains("Session error"));
    }

    #[test]
    fn test_error_invalid_input() {
        let err = RostrumError::InvalidInput("topic is empty".to_string());
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RostrumError = io_err.into();
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_error_debug() {
        let err = RostrumError::MissingCredential;
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("MissingCredential"));
    }

    #[test]
    fn test_result_type_alias() {
        fn test_fn() -> Result<i32> {
            Ok(42)
        }

        assert_eq!(test_fn().unwrap(), 42);
    }
}
