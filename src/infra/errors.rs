// src/infra/errors.rs — Error types for adreply

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdReplyError {
    // Input errors (handled locally, never surfaced to the suggestion caller)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Store errors (retriable)
    #[error("Store unavailable during '{operation}': {message}")]
    StoreUnavailable { operation: String, message: String },

    // Data errors (isolated per key)
    #[error("Corrupt record '{key}': {message}")]
    DataCorruption { key: String, message: String },

    #[error("Template validation failed: {0}")]
    Validation(String),

    #[error("Template '{id}' not found")]
    TemplateNotFound { id: String },

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AdReplyError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, AdReplyError::StoreUnavailable { .. })
    }

    pub fn unavailable(operation: &str, message: impl std::fmt::Display) -> Self {
        AdReplyError::StoreUnavailable {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AdReplyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_unavailable_is_retriable() {
        assert!(AdReplyError::unavailable("get_templates", "timeout").is_retriable());
        assert!(!AdReplyError::Validation("empty body".into()).is_retriable());
        assert!(!AdReplyError::InvalidInput("empty".into()).is_retriable());
        assert!(!AdReplyError::DataCorruption {
            key: "stats/general".into(),
            message: "chosen > matches".into(),
        }
        .is_retriable());
    }

    #[test]
    fn test_display_messages() {
        let e = AdReplyError::unavailable("get_group_history", "channel closed");
        assert_eq!(
            e.to_string(),
            "Store unavailable during 'get_group_history': channel closed"
        );
        let e = AdReplyError::TemplateNotFound { id: "t-9".into() };
        assert_eq!(e.to_string(), "Template 't-9' not found");
    }
}
