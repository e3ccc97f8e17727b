//! Error handling for Ferry.
//!
//! This module provides the configuration-layer error type and the
//! category taxonomy that every Ferry crate's error maps into.

mod category;
mod ferry;

pub use category::ErrorCategory;
pub use ferry::FerryError;

/// Result type alias for configuration-layer operations.
pub type FerryResult<T> = std::result::Result<T, FerryError>;
