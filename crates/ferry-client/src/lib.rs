//! # ferry-client
//!
//! Storage-engine client contract for Ferry.
//!
//! Ferry's writers and readers reach the storage engine only through the
//! traits defined here. This crate provides:
//!
//! - **Session contract**: `SessionFactory`, `Session`, `RowEncoder`,
//!   `WriteHelper` and `RecordCursor`
//! - **Row-id allocation**: block-refilling allocators for tables without
//!   an integer primary key
//! - **Row buffers**: the bounded, key-aware buffer a writer fills between
//!   flushes
//! - **Values and metadata**: rows, values, column and table descriptions
//! - **In-memory engine**: a complete implementation of the contract with
//!   snapshot reads and fault injection
//!
//! ## Quick Start
//!
//! ```rust
//! use ferry_client::memory::MemoryEngine;
//! use ferry_client::session::SessionFactory;
//! use ferry_client::table::{ColumnInfo, TableInfo};
//! use ferry_client::value::DataType;
//! use ferry_client::{row, ClientConfig};
//! use ferry_common::{RowId, TableRef};
//!
//! # fn main() -> Result<(), ferry_client::ClientError> {
//! let engine = MemoryEngine::new();
//! let table = engine.create_table(TableInfo::new(
//!     TableRef::new("shop", "orders"),
//!     vec![ColumnInfo::new("item", DataType::Text)],
//! ))?;
//!
//! let mut session = engine.create_session(&ClientConfig::new())?;
//! let start_ts = session.current_timestamp()?;
//! let mut ids = session.row_id_allocator(&table, 100, RowId::FIRST)?;
//! let pairs = session.row_encoder(&table)?.encode(&[row!["tea"]], ids.as_mut())?;
//! let commit_ts = session.write_helper(start_ts, None)?.commit(pairs)?;
//!
//! assert_eq!(engine.scan(&table.table_ref, commit_ts)?, vec![row!["tea"]]);
//! session.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types.
pub mod error;

/// Values, rows and data types.
pub mod value;

/// Table metadata.
pub mod table;

/// Key ranges and splits.
pub mod scan;

/// Client configuration.
pub mod config;

pub mod allocator;
pub mod buffer;
pub mod memory;
pub mod session;

pub use allocator::{DynamicRowIdAllocator, RowIdAllocator, RowIdBlockSource};
pub use buffer::{AddOutcome, KeyedRowBuffer, MergePolicy, RowBuffer};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use scan::{KeyRange, Split};
pub use session::{KvPair, RecordCursor, RowEncoder, Session, SessionFactory, WriteHelper};
pub use table::{ColumnInfo, IndexInfo, TableInfo};
pub use value::{DataType, Row, Value};
