//! Error types for the read path.

use ferry_client::ClientError;
use ferry_common::{ErrorCategory, FerryError};
use thiserror::Error;

use crate::reader::ReaderState;

/// Source error type.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Invalid reader configuration, e.g. a malformed snapshot override.
    #[error(transparent)]
    Config(#[from] FerryError),

    /// A storage-client call failed.
    #[error("failed to {operation}: {source}")]
    Client {
        /// The operation that failed.
        operation: &'static str,
        /// The underlying client error.
        #[source]
        source: ClientError,
    },

    /// The cursor produced a row narrower than the requested columns.
    #[error("cursor row has no field {index} ({count} fields)")]
    MissingField {
        /// Requested field.
        index: usize,
        /// Fields in the row.
        count: usize,
    },

    /// The call is not allowed in the reader's current state.
    #[error("cannot {operation} while reader is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The reader's state.
        state: ReaderState,
    },
}

impl SourceError {
    /// Wraps a client error with the operation that failed.
    pub fn client(operation: &'static str, source: ClientError) -> Self {
        Self::Client { operation, source }
    }

    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Client { source, .. } => source.category(),
            Self::MissingField { .. } => ErrorCategory::Data,
            Self::InvalidState { .. } => ErrorCategory::State,
        }
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let err: SourceError = FerryError::InvalidVersion {
            value: "x".into(),
            reason: "invalid digit".into(),
        }
        .into();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err = SourceError::client(
            "open cursor",
            ClientError::CursorFailed("region unavailable".into()),
        );
        assert_eq!(err.category(), ErrorCategory::Resource);
        assert_eq!(
            err.to_string(),
            "failed to open cursor: cursor error: region unavailable"
        );

        let err = SourceError::InvalidState {
            operation: "read",
            state: ReaderState::Closed,
        };
        assert_eq!(err.category(), ErrorCategory::State);
    }
}
