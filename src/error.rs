//! Error types for txflow

use thiserror::Error;

/// Main error type for the crate
///
/// Lifecycle failures (estimation, submission, reverts) never surface here:
/// they are classified and reported by the sender. This type covers setup
/// problems, sink failures, and the caller's own completion callback.
#[derive(Error, Debug)]
pub enum TxError {
    #[error("Network {name} not configured")]
    NetworkNotFound { name: String },

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Report sink error: {0}")]
    Report(String),

    #[error("Completion callback failed: {0}")]
    Callback(#[source] anyhow::Error),
}

impl TxError {
    /// Check if error originated in caller-supplied code
    pub fn is_callback(&self) -> bool {
        matches!(self, TxError::Callback(_))
    }
}

/// Result type for txflow operations
pub type TxResult<T> = Result<T, TxError>;
