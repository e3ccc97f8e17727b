//! The storage-client contract.
//!
//! Ferry never talks to the storage engine directly. Everything it needs is
//! expressed by the traits in this module, and a storage client plugs in by
//! implementing them:
//!
//! ```text
//! ┌──────────────────┐  create_session   ┌───────────────────────────────┐
//! │  SessionFactory  │ ────────────────▶ │            Session            │
//! └──────────────────┘                   │  table_info / current_ts      │
//!                                        │  row_id_allocator             │
//!                                        │  row_encoder ─▶ RowEncoder    │
//!                                        │  write_helper ─▶ WriteHelper  │
//!                                        │  open_cursor ─▶ RecordCursor  │
//!                                        └───────────────────────────────┘
//! ```
//!
//! All calls are blocking: the calling thread waits for the round trip.
//! Timeouts and cancellation are the storage client's business.

use bytes::Bytes;
use ferry_common::{RowId, SnapshotTimestamp, TableRef};

use crate::allocator::RowIdAllocator;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::scan::{KeyRange, Split};
use crate::table::{ColumnInfo, TableInfo};
use crate::value::{Row, Value};

/// An encoded key-value pair ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    /// Encoded row key.
    pub key: Bytes,
    /// Encoded row value.
    pub value: Bytes,
}

impl KvPair {
    /// Creates a pair.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Creates sessions against the storage engine.
pub trait SessionFactory: Send + Sync {
    /// Establishes a new session.
    fn create_session(&self, config: &ClientConfig) -> ClientResult<Box<dyn Session>>;
}

/// A session against the storage engine.
pub trait Session: Send {
    /// Resolves table metadata. Fails with `TableNotFound` if absent.
    fn table_info(&self, table: &TableRef) -> ClientResult<TableInfo>;

    /// Obtains a fresh timestamp from the engine's timestamp oracle.
    fn current_timestamp(&self) -> ClientResult<SnapshotTimestamp>;

    /// Reserves one block of `step` row ids and returns its first id.
    fn allocate_row_id_block(&self, table: &TableInfo, step: u64) -> ClientResult<RowId>;

    /// Marks every id below `end` as taken, so no later block starts below it.
    fn reserve_row_ids(&self, table: &TableInfo, end: RowId) -> ClientResult<()>;

    /// Creates a row-id allocator whose first block is `[start, start + step)`.
    ///
    /// The first block is reserved with the engine. Later blocks are
    /// requested from the engine as each one runs out.
    fn row_id_allocator(
        &self,
        table: &TableInfo,
        step: u64,
        start: RowId,
    ) -> ClientResult<Box<dyn RowIdAllocator>>;

    /// Creates an encoder turning rows of `table` into key-value pairs.
    fn row_encoder(&self, table: &TableInfo) -> ClientResult<Box<dyn RowEncoder>>;

    /// Creates a write helper for a transaction started at `start_ts`.
    ///
    /// With a `primary_key` the helper joins a global transaction whose
    /// primary was prewritten by a coordinator.
    fn write_helper(
        &self,
        start_ts: SnapshotTimestamp,
        primary_key: Option<Bytes>,
    ) -> ClientResult<Box<dyn WriteHelper>>;

    /// Prewrites the primary lock of a global transaction.
    fn prewrite_primary(&self, primary_key: &Bytes, start_ts: SnapshotTimestamp)
        -> ClientResult<()>;

    /// Commits a global transaction by committing its primary key.
    ///
    /// Every secondary prewritten under the primary becomes visible at
    /// `commit_ts`.
    fn commit_primary(
        &self,
        primary_key: &Bytes,
        start_ts: SnapshotTimestamp,
        commit_ts: SnapshotTimestamp,
    ) -> ClientResult<()>;

    /// Rolls back a global transaction, discarding its secondaries.
    fn rollback_primary(&self, primary_key: &Bytes, start_ts: SnapshotTimestamp)
        -> ClientResult<()>;

    /// Divides a table's key space into at most `count` ranges.
    fn key_ranges(&self, table: &TableInfo, count: usize) -> ClientResult<Vec<KeyRange>>;

    /// Opens a cursor over a split, observing the snapshot at `timestamp`.
    fn open_cursor(
        &self,
        split: &Split,
        columns: &[ColumnInfo],
        timestamp: SnapshotTimestamp,
    ) -> ClientResult<Box<dyn RecordCursor>>;

    /// Closes the session.
    fn close(&mut self) -> ClientResult<()>;
}

/// Encodes rows into the engine's key-value format.
pub trait RowEncoder: Send {
    /// Encodes rows, drawing a row id for every row that needs one.
    ///
    /// Ids drawn here are consumed even if the pairs are never written.
    fn encode(
        &mut self,
        rows: &[Row],
        allocator: &mut dyn RowIdAllocator,
    ) -> ClientResult<Vec<KvPair>>;

    /// Releases encoder resources.
    fn close(&mut self) -> ClientResult<()>;
}

/// Writes encoded pairs within one transaction.
pub trait WriteHelper: Send {
    /// Writes and commits the pairs in one round trip. Returns the commit
    /// timestamp.
    fn commit(&mut self, pairs: Vec<KvPair>) -> ClientResult<SnapshotTimestamp>;

    /// Prewrites the pairs as secondaries of the global transaction's
    /// primary key. They stay invisible until the primary commits.
    fn prewrite_secondaries(&mut self, pairs: Vec<KvPair>) -> ClientResult<()>;

    /// Releases helper resources.
    fn close(&mut self) -> ClientResult<()>;
}

/// A pull-based cursor over a snapshot of a split.
pub trait RecordCursor: Send {
    /// Moves to the next row. Returns false once exhausted.
    fn advance(&mut self) -> ClientResult<bool>;

    /// Number of fields in the current row.
    fn field_count(&self) -> usize;

    /// Value of field `index` in the current row.
    fn value(&self, index: usize) -> Option<&Value>;

    /// Releases the server-side cursor.
    fn close(&mut self) -> ClientResult<()>;
}
