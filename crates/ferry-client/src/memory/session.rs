//! Sessions against the in-memory engine.

use std::sync::Arc;

use bytes::Bytes;
use ferry_common::{RowId, SnapshotTimestamp, TableRef};
use tracing::debug;

use super::codec::{table_end, table_start};
use super::cursor::MemoryCursor;
use super::encoder::MemoryRowEncoder;
use super::state::{EngineState, PendingTxn};
use super::writer::MemoryWriteHelper;
use crate::allocator::{DynamicRowIdAllocator, RowIdAllocator, RowIdBlockSource};
use crate::error::{ClientError, ClientResult};
use crate::scan::{KeyRange, Split};
use crate::session::{RecordCursor, RowEncoder, Session, WriteHelper};
use crate::table::{ColumnInfo, TableInfo};

/// Reserves blocks from the engine's per-table id counter.
struct EngineBlockSource {
    state: Arc<EngineState>,
    table_id: u64,
}

impl RowIdBlockSource for EngineBlockSource {
    fn allocate_block(&mut self, step: u64) -> ClientResult<RowId> {
        self.state.allocate_block(self.table_id, step)
    }
}

pub(crate) struct MemorySession {
    state: Arc<EngineState>,
    id: u64,
    closed: bool,
}

impl MemorySession {
    pub fn new(state: Arc<EngineState>, id: u64) -> Self {
        Self {
            state,
            id,
            closed: false,
        }
    }

    fn check_open(&self) -> ClientResult<()> {
        if self.closed {
            return Err(ClientError::SessionClosed);
        }
        Ok(())
    }
}

impl Session for MemorySession {
    fn table_info(&self, table: &TableRef) -> ClientResult<TableInfo> {
        self.check_open()?;
        self.state.table(table)
    }

    fn current_timestamp(&self) -> ClientResult<SnapshotTimestamp> {
        self.check_open()?;
        Ok(self.state.next_timestamp())
    }

    fn allocate_row_id_block(&self, table: &TableInfo, step: u64) -> ClientResult<RowId> {
        self.check_open()?;
        self.state.allocate_block(table.table_id, step)
    }

    fn reserve_row_ids(&self, table: &TableInfo, end: RowId) -> ClientResult<()> {
        self.check_open()?;
        self.state.reserve_through(table.table_id, end);
        debug!(table = %table.table_ref, end = %end, "reserved row ids");
        Ok(())
    }

    fn row_id_allocator(
        &self,
        table: &TableInfo,
        step: u64,
        start: RowId,
    ) -> ClientResult<Box<dyn RowIdAllocator>> {
        self.check_open()?;
        let seed_end = start
            .checked_add(step)
            .ok_or_else(|| ClientError::RowIdExhausted(table.table_ref.to_string()))?;
        self.state.reserve_through(table.table_id, seed_end);

        let source = EngineBlockSource {
            state: Arc::clone(&self.state),
            table_id: table.table_id,
        };
        let allocator = DynamicRowIdAllocator::new(source, table.table_ref.to_string(), step, start)?;
        Ok(Box::new(allocator))
    }

    fn row_encoder(&self, table: &TableInfo) -> ClientResult<Box<dyn RowEncoder>> {
        self.check_open()?;
        Ok(Box::new(MemoryRowEncoder::new(table.clone())))
    }

    fn write_helper(
        &self,
        start_ts: SnapshotTimestamp,
        primary_key: Option<Bytes>,
    ) -> ClientResult<Box<dyn WriteHelper>> {
        self.check_open()?;
        Ok(Box::new(MemoryWriteHelper::new(
            Arc::clone(&self.state),
            start_ts,
            primary_key,
        )))
    }

    fn prewrite_primary(
        &self,
        primary_key: &Bytes,
        start_ts: SnapshotTimestamp,
    ) -> ClientResult<()> {
        self.check_open()?;
        let mut pending = self.state.pending.lock();
        if let Some(existing) = pending.get(primary_key) {
            return Err(ClientError::WriteFailed(format!(
                "primary already locked by transaction {}",
                existing.start_ts
            )));
        }
        pending.insert(
            primary_key.clone(),
            PendingTxn {
                start_ts,
                secondaries: Vec::new(),
            },
        );
        debug!(session = self.id, start_ts = %start_ts, "prewrote primary");
        Ok(())
    }

    fn commit_primary(
        &self,
        primary_key: &Bytes,
        start_ts: SnapshotTimestamp,
        commit_ts: SnapshotTimestamp,
    ) -> ClientResult<()> {
        self.check_open()?;
        let txn = {
            let mut pending = self.state.pending.lock();
            let owned = pending
                .get(primary_key)
                .is_some_and(|txn| txn.start_ts == start_ts);
            if owned {
                pending.remove(primary_key)
            } else {
                None
            }
        }
        .ok_or(ClientError::TransactionNotFound {
            start_ts: start_ts.version(),
        })?;

        let count = txn.secondaries.len();
        if let Err(e) = self.state.apply(txn.secondaries, start_ts, commit_ts) {
            self.state.record_failed_write();
            return Err(e);
        }
        self.state.stats.write().primary_commits += 1;

        debug!(session = self.id, start_ts = %start_ts, commit_ts = %commit_ts, pairs = count, "committed primary");
        Ok(())
    }

    fn rollback_primary(
        &self,
        primary_key: &Bytes,
        start_ts: SnapshotTimestamp,
    ) -> ClientResult<()> {
        self.check_open()?;
        let mut pending = self.state.pending.lock();
        let owned = pending
            .get(primary_key)
            .is_some_and(|txn| txn.start_ts == start_ts);
        if !owned {
            return Err(ClientError::TransactionNotFound {
                start_ts: start_ts.version(),
            });
        }
        pending.remove(primary_key);
        debug!(session = self.id, start_ts = %start_ts, "rolled back primary");
        Ok(())
    }

    fn key_ranges(&self, table: &TableInfo, count: usize) -> ClientResult<Vec<KeyRange>> {
        self.check_open()?;
        let start = table_start(table.table_id);
        let end = table_end(table.table_id);
        let count = count.max(1);

        let keys: Vec<Bytes> = self
            .state
            .data
            .read()
            .range(start.clone()..end.clone())
            .map(|(key, _)| key.clone())
            .collect();

        // Boundaries are existing keys, so no range is empty while data exists.
        let mut bounds = vec![start];
        for i in 1..count {
            let position = i * keys.len() / count;
            if position == 0 {
                continue;
            }
            let key = &keys[position];
            if bounds.last() != Some(key) {
                bounds.push(key.clone());
            }
        }
        bounds.push(end);

        Ok(bounds
            .windows(2)
            .map(|pair| KeyRange::new(pair[0].clone(), pair[1].clone()))
            .collect())
    }

    fn open_cursor(
        &self,
        split: &Split,
        columns: &[ColumnInfo],
        timestamp: SnapshotTimestamp,
    ) -> ClientResult<Box<dyn RecordCursor>> {
        self.check_open()?;
        if self.state.faults.take_cursor_open() {
            return Err(ClientError::CursorFailed("injected cursor open failure".into()));
        }
        let table = self.state.table(&split.table_ref)?;
        let cursor = MemoryCursor::open(Arc::clone(&self.state), &table, split, columns, timestamp)?;
        self.state.stats.write().cursors_opened += 1;
        Ok(Box::new(cursor))
    }

    fn close(&mut self) -> ClientResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.state.stats.write().sessions_closed += 1;
        debug!(session = self.id, "closed session");

        if self.state.faults.take_session_close() {
            return Err(ClientError::CloseFailed("injected session close failure".into()));
        }
        Ok(())
    }
}
