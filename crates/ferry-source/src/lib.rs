//! # ferry-source
//!
//! Snapshot reader for Ferry.
//!
//! A batch record scanner assigns each reader one [`Split`] of a table and
//! pulls rows from it one at a time. Every row the reader returns belongs to
//! one fixed snapshot, so re-running a job against the same configuration
//! reads the same data.
//!
//! The snapshot is chosen by [`resolve_timestamp`]: an explicit version
//! token, else an explicit wall-clock timestamp, else the split's default.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ferry_client::memory::MemoryEngine;
//! use ferry_client::{ClientConfig, ColumnInfo, DataType, SessionFactory, TableInfo};
//! use ferry_common::TableRef;
//! use ferry_source::{plan_splits, SnapshotReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = MemoryEngine::new();
//! let table = TableRef::new("shop", "orders");
//! engine.create_table(TableInfo::new(
//!     table.clone(),
//!     vec![ColumnInfo::new("item", DataType::Text)],
//! ))?;
//!
//! let mut session = engine.create_session(&ClientConfig::new())?;
//! let splits = plan_splits(session.as_ref(), &table, 4, None)?;
//! session.close()?;
//!
//! for split in splits {
//!     let mut reader = SnapshotReader::new(Arc::new(engine.clone()), ClientConfig::new(), split);
//!     while let Some(record) = reader.next_record()? {
//!         println!("{record}");
//!     }
//!     reader.close();
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Split`]: ferry_client::Split

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

pub mod reader;
pub mod record;
pub mod split;
pub mod timestamp;

pub use error::{SourceError, SourceResult};
pub use reader::{ReaderState, SnapshotReader};
pub use record::{OutputField, OutputRecord};
pub use split::plan_splits;
pub use timestamp::{resolve_timestamp, ResolvedTimestamp, TimestampSource};
