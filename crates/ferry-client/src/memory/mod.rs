//! An in-memory storage engine.
//!
//! Implements the whole client contract over a multi-version map, so writers
//! and readers can be exercised without a cluster. Committed rows become
//! visible at their commit timestamp; a snapshot read at `ts` sees exactly
//! the versions committed at or before `ts`.
//!
//! Failures are injected through [`Faults`] and the engine's activity is
//! observable through [`EngineStats`].
//!
//! ```
//! use ferry_client::memory::MemoryEngine;
//! use ferry_client::table::{ColumnInfo, TableInfo};
//! use ferry_client::value::DataType;
//! use ferry_common::TableRef;
//!
//! let engine = MemoryEngine::new();
//! let table = engine
//!     .create_table(TableInfo::new(
//!         TableRef::new("shop", "orders"),
//!         vec![ColumnInfo::new("item", DataType::Text)],
//!     ))
//!     .unwrap();
//! assert_eq!(table.table_id, 1);
//! ```

mod codec;
mod cursor;
mod encoder;
mod session;
mod state;
mod writer;

pub use codec::{decode_handle, encode_row_key};
pub use state::{EngineStats, Faults};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ferry_common::{SnapshotTimestamp, TableRef};
use tracing::{debug, warn};

use self::session::MemorySession;
use self::state::EngineState;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::{Session, SessionFactory};
use crate::table::TableInfo;
use crate::value::Row;

/// Handle to an in-memory engine. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    state: Arc<EngineState>,
    sessions: Arc<AtomicU64>,
}

impl MemoryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table and assigns its table id.
    pub fn create_table(&self, table: TableInfo) -> ClientResult<TableInfo> {
        let table = self.state.create_table(table)?;
        debug!(table = %table.table_ref, table_id = table.table_id, "created table");
        Ok(table)
    }

    /// Returns the fault switches.
    pub fn faults(&self) -> &Faults {
        &self.state.faults
    }

    /// Returns a snapshot of the activity counters.
    pub fn stats(&self) -> EngineStats {
        self.state.stats.read().clone()
    }

    /// Issues a fresh timestamp.
    pub fn current_timestamp(&self) -> SnapshotTimestamp {
        self.state.next_timestamp()
    }

    /// Returns every row of `table` visible at `timestamp`, in key order.
    pub fn scan(&self, table: &TableRef, timestamp: SnapshotTimestamp) -> ClientResult<Vec<Row>> {
        let info = self.state.table(table)?;
        let start = codec::table_start(info.table_id);
        let end = codec::table_end(info.table_id);

        let data = self.state.data.read();
        data.range(start..end)
            .filter_map(|(_, versions)| EngineState::visible(versions, timestamp))
            .map(|value| serde_json::from_slice(value).map_err(ClientError::from))
            .collect()
    }

    /// Returns the number of global transactions awaiting their primary commit.
    pub fn pending_transactions(&self) -> usize {
        self.state.pending.lock().len()
    }
}

impl SessionFactory for MemoryEngine {
    fn create_session(&self, config: &ClientConfig) -> ClientResult<Box<dyn Session>> {
        if self.state.faults.take_session_create() {
            warn!(endpoints = ?config.endpoints, "refusing session");
            return Err(ClientError::ConnectionFailed(
                "injected session failure".into(),
            ));
        }
        let id = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.stats.write().sessions_created += 1;
        debug!(session = id, database = ?config.database, "opened session");
        Ok(Box::new(MemorySession::new(Arc::clone(&self.state), id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::scan::{KeyRange, Split};
    use crate::table::ColumnInfo;
    use crate::value::{DataType, Value};
    use bytes::Bytes;

    fn engine_with_users() -> (MemoryEngine, TableInfo) {
        let engine = MemoryEngine::new();
        let table = engine
            .create_table(
                TableInfo::new(
                    TableRef::new("app", "users"),
                    vec![
                        ColumnInfo::new("id", DataType::BigInt).not_null(),
                        ColumnInfo::new("name", DataType::Text),
                    ],
                )
                .with_primary_key(vec![0]),
            )
            .unwrap();
        (engine, table)
    }

    fn write(session: &dyn Session, table: &TableInfo, rows: &[Row]) -> SnapshotTimestamp {
        let start_ts = session.current_timestamp().unwrap();
        let mut encoder = session.row_encoder(table).unwrap();
        let mut ids = session
            .row_id_allocator(table, 10, ferry_common::RowId::FIRST)
            .unwrap();
        let pairs = encoder.encode(rows, ids.as_mut()).unwrap();
        let mut helper = session.write_helper(start_ts, None).unwrap();
        helper.commit(pairs).unwrap()
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let (engine, table) = engine_with_users();
        assert!(engine.create_table(table).is_err());
    }

    #[test]
    fn test_commit_then_snapshot_read() {
        let (engine, table) = engine_with_users();
        let session = engine.create_session(&ClientConfig::new()).unwrap();

        let before = engine.current_timestamp();
        let commit_ts = write(session.as_ref(), &table, &[row![2, "bo"], row![1, "al"]]);

        assert!(engine.scan(&table.table_ref, before).unwrap().is_empty());
        let rows = engine.scan(&table.table_ref, commit_ts).unwrap();
        // Key order is handle order.
        assert_eq!(rows, vec![row![1, "al"], row![2, "bo"]]);
        assert_eq!(engine.stats().commits, 1);
    }

    #[test]
    fn test_cursor_projects_by_name() {
        let (engine, table) = engine_with_users();
        let session = engine.create_session(&ClientConfig::new()).unwrap();
        let ts = write(session.as_ref(), &table, &[row![1, "al"]]);

        let split = Split::new(table.table_ref.clone(), KeyRange::full(), ts);
        let columns = vec![ColumnInfo::new("name", DataType::Text)];
        let mut cursor = session.open_cursor(&split, &columns, ts).unwrap();

        assert!(cursor.value(0).is_none());
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.field_count(), 1);
        assert_eq!(cursor.value(0), Some(&Value::from("al")));
        assert!(!cursor.advance().unwrap());
        assert!(!cursor.advance().unwrap());
        cursor.close().unwrap();
    }

    #[test]
    fn test_global_transaction_visible_after_primary_commit() {
        let (engine, table) = engine_with_users();
        let session = engine.create_session(&ClientConfig::new()).unwrap();
        let primary = Bytes::from_static(b"primary");
        let start_ts = session.current_timestamp().unwrap();
        session.prewrite_primary(&primary, start_ts).unwrap();

        let mut encoder = session.row_encoder(&table).unwrap();
        let mut ids = session
            .row_id_allocator(&table, 10, ferry_common::RowId::FIRST)
            .unwrap();
        let pairs = encoder.encode(&[row![7, "gus"]], ids.as_mut()).unwrap();
        let mut helper = session.write_helper(start_ts, Some(primary.clone())).unwrap();
        assert!(helper.commit(pairs.clone()).is_err());
        helper.prewrite_secondaries(pairs).unwrap();

        let mid = engine.current_timestamp();
        assert!(engine.scan(&table.table_ref, mid).unwrap().is_empty());

        let commit_ts = session.current_timestamp().unwrap();
        session.commit_primary(&primary, start_ts, commit_ts).unwrap();
        assert_eq!(
            engine.scan(&table.table_ref, commit_ts).unwrap(),
            vec![row![7, "gus"]]
        );
        assert_eq!(engine.pending_transactions(), 0);
    }

    #[test]
    fn test_rollback_discards_secondaries() {
        let (engine, _) = engine_with_users();
        let session = engine.create_session(&ClientConfig::new()).unwrap();
        let primary = Bytes::from_static(b"p");
        let start_ts = session.current_timestamp().unwrap();

        session.prewrite_primary(&primary, start_ts).unwrap();
        assert!(session.prewrite_primary(&primary, start_ts).is_err());
        session.rollback_primary(&primary, start_ts).unwrap();
        assert!(matches!(
            session.commit_primary(&primary, start_ts, start_ts.next()),
            Err(ClientError::TransactionNotFound { .. })
        ));
    }

    #[test]
    fn test_key_ranges_cover_table() {
        let (engine, table) = engine_with_users();
        let session = engine.create_session(&ClientConfig::new()).unwrap();
        let rows: Vec<Row> = (1..=10).map(|i| row![i, format!("u{i}")]).collect();
        let ts = write(session.as_ref(), &table, &rows);

        let ranges = session.key_ranges(&table, 3).unwrap();
        assert_eq!(ranges.len(), 3);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }

        let mut total = 0;
        for range in ranges {
            let split = Split::new(table.table_ref.clone(), range, ts);
            let mut cursor = session.open_cursor(&split, &table.columns, ts).unwrap();
            let mut n = 0;
            while cursor.advance().unwrap() {
                n += 1;
            }
            assert!(n > 0);
            total += n;
        }
        assert_eq!(total, 10);
    }

    #[test]
    fn test_key_ranges_of_empty_table() {
        let (engine, table) = engine_with_users();
        let session = engine.create_session(&ClientConfig::new()).unwrap();
        assert_eq!(session.key_ranges(&table, 4).unwrap().len(), 1);
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let (engine, table) = engine_with_users();
        let mut session = engine.create_session(&ClientConfig::new()).unwrap();
        session.close().unwrap();
        session.close().unwrap();

        assert!(matches!(
            session.table_info(&table.table_ref),
            Err(ClientError::SessionClosed)
        ));
        assert_eq!(engine.stats().sessions_closed, 1);
    }

    #[test]
    fn test_faults_fire_once() {
        let (engine, _) = engine_with_users();
        engine.faults().fail_next_session_create();
        assert!(engine.create_session(&ClientConfig::new()).is_err());

        let session = engine.create_session(&ClientConfig::new()).unwrap();
        engine.faults().fail_next_write();
        let start_ts = session.current_timestamp().unwrap();
        let mut helper = session.write_helper(start_ts, None).unwrap();
        assert!(helper.commit(Vec::new()).is_err());
        assert!(helper.commit(Vec::new()).is_ok());
        assert_eq!(engine.stats().failed_writes, 1);
    }
}
