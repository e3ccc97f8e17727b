//! Error types for the write path.

use ferry_client::ClientError;
use ferry_common::{ErrorCategory, FerryError};
use thiserror::Error;

use crate::writer::WriterState;

/// Sink error type.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Invalid sink configuration.
    #[error(transparent)]
    Config(#[from] FerryError),

    /// A row's key collides with a buffered row and deduplication is off.
    #[error("duplicate key in one batch for table '{table}' (row {position})")]
    DuplicateKey {
        /// Target table.
        table: String,
        /// Ordinal of the rejected row among all rows received.
        position: u64,
    },

    /// A storage-client call failed.
    #[error("failed to {operation}: {source}")]
    Client {
        /// The operation that failed.
        operation: &'static str,
        /// The underlying client error.
        #[source]
        source: ClientError,
    },

    /// The call is not allowed in the writer's current state.
    #[error("cannot {operation} while writer is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The writer's state.
        state: WriterState,
    },

    /// The buffer refused a row right after being flushed.
    #[error("buffer of capacity {capacity} refused a row after flushing")]
    BufferOverflow {
        /// Buffer capacity.
        capacity: usize,
    },

    /// The global transaction is not pending.
    #[error("global transaction is already {0}")]
    TransactionFinished(&'static str),
}

impl SinkError {
    /// Wraps a client error with the operation that failed.
    pub fn client(operation: &'static str, source: ClientError) -> Self {
        Self::Client { operation, source }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::DuplicateKey { .. } => ErrorCategory::Data,
            Self::Client { source, .. } => source.category(),
            Self::InvalidState { .. } | Self::BufferOverflow { .. } | Self::TransactionFinished(_) => {
                ErrorCategory::State
            }
        }
    }

    /// Returns true if this is a duplicate-key error.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }
}

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;
