//! Error types for schedsync.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while syncing a schedule into a calendar.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The schedule could not be fetched. Fatal for the whole run.
    #[error("Schedule source unavailable: {0}")]
    SourceUnavailable(String),

    /// Network error, timeout or rate limit. Safe to retry.
    #[error("Transient provider error: {message}")]
    TransientProvider {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Permission denied, malformed payload, missing event. Never retried.
    #[error("Provider error: {0}")]
    PermanentProvider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request timed out after {0}s")]
    ProviderTimeout(u64),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SyncError {
    pub fn transient(message: impl Into<String>) -> Self {
        SyncError::TransientProvider {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        SyncError::PermanentProvider(message.into())
    }
}

/// Classifies errors for the retry combinator.
pub trait Retryable {
    /// Whether another attempt may succeed.
    fn is_transient(&self) -> bool;

    /// Minimum wait the remote asked for before the next attempt.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl Retryable for SyncError {
    fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::TransientProvider { .. } | SyncError::ProviderTimeout(_)
        )
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::TransientProvider { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for schedsync operations.
pub type SyncResult<T> = Result<T, SyncError>;
