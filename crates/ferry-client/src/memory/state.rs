//! Shared state of the in-memory engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use ferry_common::{RowId, SnapshotTimestamp, TableRef};
use parking_lot::{Mutex, RwLock};

use crate::error::{ClientError, ClientResult};
use crate::session::KvPair;
use crate::table::TableInfo;

/// One committed version of a key.
#[derive(Debug, Clone)]
pub(crate) struct Version {
    pub commit_ts: SnapshotTimestamp,
    pub value: Bytes,
}

/// A global transaction whose primary is prewritten but not committed.
#[derive(Debug)]
pub(crate) struct PendingTxn {
    pub start_ts: SnapshotTimestamp,
    pub secondaries: Vec<KvPair>,
}

/// Counters describing what the engine has been asked to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Sessions created.
    pub sessions_created: u64,
    /// Sessions closed, including failed closes.
    pub sessions_closed: u64,
    /// Successful one-shot commits.
    pub commits: u64,
    /// Successful secondary prewrites.
    pub prewrites: u64,
    /// Global transactions committed through their primary.
    pub primary_commits: u64,
    /// Write round trips that failed.
    pub failed_writes: u64,
    /// Row-id blocks reserved from table counters.
    pub row_id_blocks: u64,
    /// Cursors opened.
    pub cursors_opened: u64,
    /// Cursors closed, including failed closes.
    pub cursors_closed: u64,
    /// Write helpers closed.
    pub helpers_closed: u64,
}

/// One-shot fault switches.
///
/// Each switch arms a single failure: the next matching call fails and
/// disarms it.
#[derive(Debug, Default)]
pub struct Faults {
    write: AtomicBool,
    session_create: AtomicBool,
    session_close: AtomicBool,
    cursor_open: AtomicBool,
    cursor_close: AtomicBool,
    helper_close: AtomicBool,
}

impl Faults {
    /// Fails the next commit or prewrite.
    pub fn fail_next_write(&self) {
        self.write.store(true, Ordering::SeqCst);
    }

    /// Fails the next session creation.
    pub fn fail_next_session_create(&self) {
        self.session_create.store(true, Ordering::SeqCst);
    }

    /// Fails the next session close.
    pub fn fail_next_session_close(&self) {
        self.session_close.store(true, Ordering::SeqCst);
    }

    /// Fails the next cursor open.
    pub fn fail_next_cursor_open(&self) {
        self.cursor_open.store(true, Ordering::SeqCst);
    }

    /// Fails the next cursor close.
    pub fn fail_next_cursor_close(&self) {
        self.cursor_close.store(true, Ordering::SeqCst);
    }

    /// Fails the next write-helper close.
    pub fn fail_next_helper_close(&self) {
        self.helper_close.store(true, Ordering::SeqCst);
    }

    pub(crate) fn take_write(&self) -> bool {
        self.write.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_session_create(&self) -> bool {
        self.session_create.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_session_close(&self) -> bool {
        self.session_close.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_cursor_open(&self) -> bool {
        self.cursor_open.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_cursor_close(&self) -> bool {
        self.cursor_close.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn take_helper_close(&self) -> bool {
        self.helper_close.swap(false, Ordering::SeqCst)
    }
}

/// Everything sessions of one engine share.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    /// Last timestamp issued by the oracle.
    last_ts: Mutex<SnapshotTimestamp>,
    tables: RwLock<HashMap<TableRef, TableInfo>>,
    next_table_id: AtomicU64,
    /// Committed versions, newest last.
    pub data: RwLock<BTreeMap<Bytes, Vec<Version>>>,
    /// Pending global transactions by primary key.
    pub pending: Mutex<HashMap<Bytes, PendingTxn>>,
    /// Next free row id per table id.
    auto_ids: Mutex<HashMap<u64, i64>>,
    pub faults: Faults,
    pub stats: RwLock<EngineStats>,
}

impl EngineState {
    /// Issues a timestamp greater than every timestamp issued before.
    pub fn next_timestamp(&self) -> SnapshotTimestamp {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_millis() as u64;

        let mut last = self.last_ts.lock();
        let next = if now > last.physical() {
            SnapshotTimestamp::new(now, 0)
        } else {
            last.next()
        };
        *last = next;
        next
    }

    pub fn create_table(&self, info: TableInfo) -> ClientResult<TableInfo> {
        let mut tables = self.tables.write();
        if tables.contains_key(&info.table_ref) {
            return Err(ClientError::WriteFailed(format!(
                "table '{}' already exists",
                info.table_ref
            )));
        }
        let id = self.next_table_id.fetch_add(1, Ordering::SeqCst) + 1;
        let info = info.with_table_id(id);
        tables.insert(info.table_ref.clone(), info.clone());
        Ok(info)
    }

    pub fn table(&self, table: &TableRef) -> ClientResult<TableInfo> {
        self.tables
            .read()
            .get(table)
            .cloned()
            .ok_or_else(|| ClientError::TableNotFound(table.to_string()))
    }

    pub fn allocate_block(&self, table_id: u64, step: u64) -> ClientResult<RowId> {
        let mut auto_ids = self.auto_ids.lock();
        let next = auto_ids.entry(table_id).or_insert(RowId::FIRST.as_i64());
        let start = RowId::new(*next);
        let end = start
            .checked_add(step)
            .ok_or_else(|| ClientError::RowIdExhausted(format!("table id {table_id}")))?;
        *next = end.as_i64();
        drop(auto_ids);

        self.stats.write().row_id_blocks += 1;
        Ok(start)
    }

    /// Moves the table's id counter to at least `end`. Never moves it back.
    pub fn reserve_through(&self, table_id: u64, end: RowId) {
        let mut auto_ids = self.auto_ids.lock();
        let next = auto_ids.entry(table_id).or_insert(RowId::FIRST.as_i64());
        *next = (*next).max(end.as_i64());
    }

    /// Installs versions at `commit_ts`, failing if any key has a version
    /// committed after `start_ts`.
    pub fn apply(
        &self,
        pairs: Vec<KvPair>,
        start_ts: SnapshotTimestamp,
        commit_ts: SnapshotTimestamp,
    ) -> ClientResult<()> {
        let mut data = self.data.write();
        for pair in &pairs {
            let newer = data
                .get(&pair.key)
                .and_then(|versions| versions.last())
                .is_some_and(|v| v.commit_ts > start_ts);
            if newer {
                return Err(ClientError::WriteFailed(format!(
                    "write conflict on key {:02x?} since {}",
                    pair.key.as_ref(),
                    start_ts
                )));
            }
        }
        for pair in pairs {
            data.entry(pair.key).or_default().push(Version {
                commit_ts,
                value: pair.value,
            });
        }
        Ok(())
    }

    /// Returns the value of `key` visible at `ts`.
    pub fn visible<'a>(versions: &'a [Version], ts: SnapshotTimestamp) -> Option<&'a Bytes> {
        versions
            .iter()
            .rev()
            .find(|v| v.commit_ts <= ts)
            .map(|v| &v.value)
    }

    pub fn record_failed_write(&self) {
        self.stats.write().failed_writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oracle_is_monotonic() {
        let state = EngineState::default();
        let mut last = state.next_timestamp();
        for _ in 0..1000 {
            let ts = state.next_timestamp();
            assert!(ts > last);
            last = ts;
        }
    }

    #[test]
    fn test_blocks_are_disjoint() {
        let state = EngineState::default();
        let a = state.allocate_block(1, 100).unwrap();
        let b = state.allocate_block(1, 100).unwrap();
        let other = state.allocate_block(2, 100).unwrap();

        assert_eq!(a, RowId::FIRST);
        assert_eq!(b.as_i64(), a.as_i64() + 100);
        assert_eq!(other, RowId::FIRST);
        assert_eq!(state.stats.read().row_id_blocks, 3);
    }

    #[test]
    fn test_reserve_through_is_monotonic() {
        let state = EngineState::default();
        state.reserve_through(1, RowId::new(201));
        state.reserve_through(1, RowId::new(101));
        assert_eq!(state.allocate_block(1, 100).unwrap(), RowId::new(201));

        // Already past the reservation.
        state.reserve_through(1, RowId::new(50));
        assert_eq!(state.allocate_block(1, 100).unwrap(), RowId::new(301));
    }

    #[test]
    fn test_apply_detects_conflict() {
        let state = EngineState::default();
        let t1 = state.next_timestamp();
        let t2 = state.next_timestamp();
        let t3 = state.next_timestamp();

        state
            .apply(vec![KvPair::new(&b"k"[..], &b"v1"[..])], t1, t2)
            .unwrap();
        // Started before t2 committed.
        assert!(state
            .apply(vec![KvPair::new(&b"k"[..], &b"v2"[..])], t1, t3)
            .is_err());

        let data = state.data.read();
        let versions = data.get(&Bytes::from_static(b"k")).unwrap();
        assert_eq!(EngineState::visible(versions, t1), None);
        assert_eq!(
            EngineState::visible(versions, t3).map(|b| b.as_ref()),
            Some(&b"v1"[..])
        );
    }
}
