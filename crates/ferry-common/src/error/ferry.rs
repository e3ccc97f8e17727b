//! Configuration-layer error types.

use thiserror::Error;

use super::ErrorCategory;

/// Errors raised while interpreting configuration.
///
/// Every variant is a configuration error: the job cannot make progress
/// until the configuration is fixed.
///
/// # Example
///
/// ```rust
/// use ferry_common::error::{ErrorCategory, FerryError};
///
/// let err = FerryError::invalid_option("sink.buffer-size", "abc", "expected an integer");
/// assert_eq!(err.category(), ErrorCategory::Configuration);
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FerryError {
    /// An option value could not be parsed.
    #[error("invalid value '{value}' for option '{key}': {reason}")]
    InvalidOption {
        /// The option key.
        key: String,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A required option is absent.
    #[error("missing required option '{key}'")]
    MissingOption {
        /// The option key.
        key: String,
    },

    /// A snapshot version token is not an unsigned 64-bit integer.
    #[error("malformed snapshot version '{value}': {reason}")]
    InvalidVersion {
        /// The rejected token.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A snapshot timestamp is not an ISO-8601 instant with offset.
    #[error("malformed snapshot timestamp '{value}': {reason}")]
    InvalidTimestamp {
        /// The rejected timestamp.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// No row-id start value is configured for a writer ordinal.
    #[error("no row-id start configured for writer {index} ({available} configured)")]
    MissingRowIdStart {
        /// The writer ordinal.
        index: usize,
        /// Number of configured start values.
        available: usize,
    },

    /// A table reference could not be parsed.
    #[error("invalid table reference '{value}'")]
    InvalidTableRef {
        /// The rejected reference.
        value: String,
    },
}

impl FerryError {
    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }

    /// Creates an invalid option error.
    #[must_use]
    pub fn invalid_option(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Creates a missing option error.
    #[must_use]
    pub fn missing_option(key: impl Into<String>) -> Self {
        Self::MissingOption { key: key.into() }
    }
}
