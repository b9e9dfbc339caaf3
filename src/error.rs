//! Error taxonomy for store and persistence operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing file exists but does not hold a valid snapshot.
    #[error("corrupt store file {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialize store: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("username not found: {0}")]
    NotFound(String),

    #[error("incorrect master password")]
    AuthenticationFailed,

    #[error("store is locked; authenticate first")]
    Locked,

    #[error("store has no master password set")]
    Uninitialized,
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the caller may continue the session after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::AuthenticationFailed)
    }
}
