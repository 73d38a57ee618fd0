use thiserror::Error;

use crate::llm::LlmError;

/// Errors related to conversation operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("conversation not found")]
    NotFound,

    #[error("access denied to conversation")]
    AccessDenied,

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// Errors from repository operations (used by trait definitions in shopchat-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors that end a chat turn.
///
/// `Validation` and `AccessDenied` are raised before anything is written;
/// the rest can occur after the user message is durable.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{0}")]
    Validation(String),

    #[error("access denied to conversation")]
    AccessDenied,

    #[error("storage error: {0}")]
    Persistence(#[from] RepositoryError),

    #[error(transparent)]
    Model(#[from] LlmError),
}

impl From<ChatError> for TurnError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Validation(msg) => TurnError::Validation(msg),
            ChatError::AccessDenied => TurnError::AccessDenied,
            ChatError::NotFound => TurnError::Persistence(RepositoryError::NotFound),
            ChatError::Storage(e) => TurnError::Persistence(e),
        }
    }
}

/// Errors from configuration values that cannot fall back to a default.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_chat_error_from_repository() {
        let err: ChatError = RepositoryError::Connection.into();
        assert_eq!(err.to_string(), "storage error: database connection error");
    }

    #[test]
    fn test_turn_error_from_chat_error() {
        let err: TurnError = ChatError::Validation("Please enter a message.".to_string()).into();
        assert_eq!(err.to_string(), "Please enter a message.");
        assert!(matches!(
            TurnError::from(ChatError::AccessDenied),
            TurnError::AccessDenied
        ));
    }

    #[test]
    fn test_turn_error_model_is_transparent() {
        let err: TurnError = LlmError::AuthenticationFailed.into();
        assert_eq!(err.to_string(), "authentication failed");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            key: "SHOPCHAT_PORT",
            reason: "not a number".to_string(),
        };
        assert_eq!(err.to_string(), "invalid value for SHOPCHAT_PORT: not a number");
    }
}
