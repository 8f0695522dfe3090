//! Error types for quizwise-core

use thiserror::Error;

use crate::session::SessionPhase;
use crate::types::Difficulty;

/// Top-level error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// No (or not enough) eligible questions for the requested draw
    #[error(
        "No content available for {category}/{difficulty}: requested {requested}, found {available}"
    )]
    NoContentAvailable {
        category: String,
        difficulty: Difficulty,
        requested: usize,
        available: usize,
    },

    /// Operation called outside the session phase where it is valid
    #[error("Invalid transition: cannot {operation} while session is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: SessionPhase,
    },

    /// The selected value does not name an option of the current question
    #[error("Invalid answer: {0}")]
    InvalidAnswer(String),

    /// Question store or learner profile store failed
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// Configuration could not be loaded or is invalid
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// True when the session has already finished and the call was rejected
    pub fn is_already_finished(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition {
                state: SessionPhase::Finished,
                ..
            }
        )
    }

    /// True for conditions a caller may retry or work around
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoContentAvailable { .. } | Self::StoreUnavailable(_)
        )
    }
}

/// Errors raised by question and learner profile stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend could not be reached or refused the request
    #[error("{0}")]
    Unavailable(String),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors loading or validating engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_content_display() {
        let err = EngineError::NoContentAvailable {
            category: "crypto".into(),
            difficulty: Difficulty::Hard,
            requested: 10,
            available: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("crypto"));
        assert!(msg.contains("hard"));
        assert!(msg.contains("requested 10"));
    }

    #[test]
    fn test_invalid_transition_after_finish_is_already_finished() {
        let err = EngineError::InvalidTransition {
            operation: "answer",
            state: SessionPhase::Finished,
        };
        assert!(err.is_already_finished());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("cannot answer"));
    }

    #[test]
    fn test_invalid_transition_before_start_is_not_finished() {
        let err = EngineError::InvalidTransition {
            operation: "advance",
            state: SessionPhase::Uninitialized,
        };
        assert!(!err.is_already_finished());
    }

    #[test]
    fn test_store_error_converts_and_is_recoverable() {
        let err: EngineError = StoreError::Unavailable("timeout".into()).into();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_store_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_config_error_invalid_display() {
        let err = ConfigError::Invalid("window_size must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "Invalid config: window_size must be at least 1"
        );
    }
}
