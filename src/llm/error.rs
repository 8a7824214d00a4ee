//! Classifier backend errors
//!
//! Every variant is recoverable from the pipeline's point of view: a failed
//! call makes the calling stage fall back to its deterministic strategy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors that can occur while talking to a classifier backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BackendError {
    /// API request failed with the given message
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    /// Authentication failed or credentials are invalid
    AuthenticationError { message: String },

    /// Request timed out after the specified duration (in seconds)
    TimeoutError { seconds: u64 },

    /// Rate limit exceeded
    RateLimitError { retry_after: Option<u64> },

    /// The backend answered, but not with anything usable
    InvalidResponse {
        message: String,
        raw_response: Option<String>,
    },

    /// Missing API keys, invalid settings, etc.
    ConfigurationError { message: String },

    /// Network-related error
    NetworkError { message: String },

    /// Generic error for other cases
    Other { message: String },
}

impl BackendError {
    /// Transport-level failures (timeouts, connection problems, HTTP errors)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BackendError::ApiError { .. }
                | BackendError::TimeoutError { .. }
                | BackendError::RateLimitError { .. }
                | BackendError::NetworkError { .. }
        )
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::ApiError {
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "API error ({}): {}", code, message)
                } else {
                    write!(f, "API error: {}", message)
                }
            }
            BackendError::AuthenticationError { message } => {
                write!(f, "Authentication failed: {}", message)
            }
            BackendError::TimeoutError { seconds } => {
                write!(f, "Request timed out after {} seconds", seconds)
            }
            BackendError::RateLimitError { retry_after } => {
                if let Some(seconds) = retry_after {
                    write!(f, "Rate limit exceeded, retry after {} seconds", seconds)
                } else {
                    write!(f, "Rate limit exceeded")
                }
            }
            BackendError::InvalidResponse { message, .. } => {
                write!(f, "Invalid response from classifier: {}", message)
            }
            BackendError::ConfigurationError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            BackendError::NetworkError { message } => {
                write!(f, "Network error: {}", message)
            }
            BackendError::Other { message } => {
                write!(f, "Error: {}", message)
            }
        }
    }
}

impl std::error::Error for BackendError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_status_code() {
        let err = BackendError::ApiError {
            message: "bad gateway".to_string(),
            status_code: Some(502),
        };
        assert_eq!(err.to_string(), "API error (502): bad gateway");
    }

    #[test]
    fn test_transport_classification() {
        assert!(BackendError::TimeoutError { seconds: 30 }.is_transport());
        assert!(BackendError::NetworkError {
            message: "refused".to_string()
        }
        .is_transport());
        assert!(!BackendError::InvalidResponse {
            message: "empty".to_string(),
            raw_response: None,
        }
        .is_transport());
    }
}
