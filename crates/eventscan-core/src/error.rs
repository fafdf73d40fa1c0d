//! Error types for the ingestion pipeline.

use thiserror::Error;

/// Errors that can occur while scanning, decoding, or persisting events.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error for event {id} ({kind}): {reason}")]
    Decode { id: i64, kind: String, reason: String },

    #[error("outbound lookup failed for event {id}: {reason}")]
    Enrich { id: i64, reason: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("scanner is already running")]
    AlreadyRunning,

    #[error("scanner is not running")]
    NotRunning,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScanError {
    /// Returns `true` if the error is a transient transport failure
    /// (retried indefinitely by the scan loop).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` for contract errors that are reported to the caller
    /// synchronously rather than logged by the loop.
    pub fn is_contract(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning | Self::NotRunning | Self::InvalidConfig(_)
        )
    }
}
