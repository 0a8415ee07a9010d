//! Shared error types for the services crate.

use thiserror::Error;

use crate::flow::FlowPhase;

/// Message shown when a backend failure has no more specific explanation.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Errors emitted by `ExerciseBackend` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("invalid backend base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("content rejected as inappropriate: {message}")]
    InappropriateContent { message: String },
    #[error("backend error {status} ({code}): {message}")]
    Api {
        status: reqwest::StatusCode,
        code: String,
        message: String,
    },
    #[error("backend request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl BackendError {
    /// Text suitable for showing to the learner.
    ///
    /// Content-specific rejections keep the backend's wording; everything else maps to a
    /// generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InappropriateContent { message } if !message.trim().is_empty() => {
                message.clone()
            }
            Self::InappropriateContent { .. } => {
                "This content was flagged as inappropriate.".to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// Errors emitted by `ExerciseFlow`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FlowError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: FlowPhase,
        action: &'static str,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inappropriate_content_keeps_backend_wording() {
        let err = BackendError::InappropriateContent {
            message: "Please keep your email polite.".into(),
        };
        assert_eq!(err.user_message(), "Please keep your email polite.");
    }

    #[test]
    fn other_failures_use_generic_message() {
        let err = BackendError::HttpStatus(reqwest::StatusCode::BAD_GATEWAY);
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn transition_error_names_phase_and_action() {
        let err = FlowError::InvalidTransition {
            from: FlowPhase::Loading,
            action: "finish",
        };
        assert_eq!(err.to_string(), "cannot finish while loading");
    }
}
