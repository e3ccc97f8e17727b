//! # ferry-common
//!
//! Common types, errors, and option parsing for Ferry.
//!
//! This crate provides the foundational types shared by the bulk write
//! path (`ferry-sink`) and the snapshot read path (`ferry-source`):
//!
//! - **Types**: `SnapshotTimestamp`, `RowId`, `TableRef`
//! - **Errors**: the configuration-layer `FerryError` and the
//!   `ErrorCategory` taxonomy every Ferry error maps into
//! - **Config**: typed access to the string property maps handed over by
//!   host frameworks
//! - **Constants**: option keys and defaults
//!
//! ## Example
//!
//! ```rust
//! use ferry_common::types::SnapshotTimestamp;
//! use ferry_common::error::FerryResult;
//!
//! fn example() -> FerryResult<()> {
//!     let ts = SnapshotTimestamp::parse_iso8601("2024-01-01T00:00:00Z")?;
//!     assert_eq!(ts.logical(), 0);
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::Properties;
pub use constants::*;
pub use error::{ErrorCategory, FerryError, FerryResult};
pub use types::{RowId, SnapshotTimestamp, TableRef};
