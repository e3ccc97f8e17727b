//! # ferry-sink
//!
//! Bounded batch writer for Ferry.
//!
//! A stream-processing sink pushes rows one at a time into a
//! [`BatchWriter`]. The writer buffers them, detects duplicate keys within a
//! batch, and writes each full buffer in a single round trip. Parallel
//! writers never collide on row ids: each is seeded with its own block of
//! ids, planned up front by [`plan_row_id_starts`].
//!
//! Two write modes are provided:
//!
//! - **MiniBatch**: every flush is its own transaction
//! - **Global**: every writer prewrites into one job-wide transaction owned
//!   by a [`GlobalCommitter`], which commits all batches at once
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use ferry_client::memory::MemoryEngine;
//! use ferry_client::{row, ColumnInfo, DataType, TableInfo};
//! use ferry_common::{Properties, TableRef};
//! use ferry_sink::BatchWriter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = MemoryEngine::new();
//! engine.create_table(
//!     TableInfo::new(
//!         TableRef::new("shop", "orders"),
//!         vec![
//!             ColumnInfo::new("id", DataType::BigInt).not_null(),
//!             ColumnInfo::new("item", DataType::Text),
//!         ],
//!     )
//!     .with_primary_key(vec![0]),
//! )?;
//!
//! let props = Properties::new().with("sink.buffer-size", "2");
//! let mut writer = BatchWriter::new(Arc::new(engine.clone()));
//! writer.open(TableRef::new("shop", "orders"), &props, 0)?;
//! writer.receive(row![1, "tea"])?;
//! writer.receive(row![2, "milk"])?;
//! writer.receive(row![3, "sugar"])?;
//! writer.finish()?;
//! writer.close();
//!
//! assert_eq!(writer.stats().flushes, 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Sink options.
pub mod options;

pub mod coordinator;
pub mod mode;
pub mod writer;

pub use coordinator::{plan_row_id_starts, GlobalCommitter};
pub use error::{SinkError, SinkResult};
pub use mode::{FlushReport, GlobalMode, MiniBatchMode, WriteMode};
pub use options::{GlobalTxn, SinkOptions, WriteModeKind};
pub use writer::{BatchWriter, WriterState, WriterStats};
