//! Error types for the storage-engine client.

use ferry_common::{ErrorCategory, FerryError};
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Table does not exist.
    #[error("table '{0}' not found")]
    TableNotFound(String),

    /// Session could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Session already closed.
    #[error("session closed")]
    SessionClosed,

    /// Write or commit rejected by the engine.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// Transaction is unknown to the engine.
    #[error("transaction with start timestamp {start_ts} not found")]
    TransactionNotFound {
        /// The transaction's start timestamp.
        start_ts: u64,
    },

    /// Cursor could not be opened or advanced.
    #[error("cursor error: {0}")]
    CursorFailed(String),

    /// Row does not match the table schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Encoding/decoding error.
    #[error("encoding error: {0}")]
    EncodingError(String),

    /// Row-id allocator ran out of identifiers.
    #[error("row-id space exhausted for table '{0}'")]
    RowIdExhausted(String),

    /// A fresh row-id block overlaps ids already handed out.
    #[error("row-id block starting at {start} overlaps ids below {end}")]
    BlockRegressed {
        /// First id of the fresh block.
        start: i64,
        /// End of the exhausted block.
        end: i64,
    },

    /// Resource release failed.
    #[error("close failed: {0}")]
    CloseFailed(String),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] FerryError),
}

impl ClientError {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TableNotFound(_) | Self::Config(_) => ErrorCategory::Configuration,
            Self::SchemaMismatch(_) => ErrorCategory::Data,
            Self::CloseFailed(_) => ErrorCategory::Teardown,
            Self::SessionClosed => ErrorCategory::State,
            Self::ConnectionFailed(_)
            | Self::WriteFailed(_)
            | Self::TransactionNotFound { .. }
            | Self::CursorFailed(_)
            | Self::EncodingError(_)
            | Self::RowIdExhausted(_)
            | Self::BlockRegressed { .. } => ErrorCategory::Resource,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::EncodingError(e.to_string())
    }
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
