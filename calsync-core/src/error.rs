//! Error types for calsync.

use thiserror::Error;

/// Errors that can occur while loading, expanding or committing events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The store was unreachable or rejected the request.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not parse recurrence rule '{rule}': {reason}")]
    RecurrenceParse { rule: String, reason: String },

    /// A change referenced an id that is not in the local cache.
    #[error("Event not found in cache: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    pub fn recurrence(rule: &str, reason: impl ToString) -> Self {
        SyncError::RecurrenceParse {
            rule: rule.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for calsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
