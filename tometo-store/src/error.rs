//! Error types for task persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by backend")]
    RateLimited,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("invalid task: {0}")]
    Invalid(String),

    #[error("backend not configured: {0}")]
    NotConfigured(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Transient failures worth another attempt.
    pub fn should_retry(&self) -> bool {
        match self {
            StoreError::Http(e) => !e.is_decode() && !e.is_builder(),
            StoreError::RateLimited => true,
            StoreError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
