//! Transactional writes against the in-memory engine.

use std::sync::Arc;

use bytes::Bytes;
use ferry_common::SnapshotTimestamp;
use tracing::debug;

use super::state::EngineState;
use crate::error::{ClientError, ClientResult};
use crate::session::{KvPair, WriteHelper};

pub(crate) struct MemoryWriteHelper {
    state: Arc<EngineState>,
    start_ts: SnapshotTimestamp,
    primary_key: Option<Bytes>,
}

impl MemoryWriteHelper {
    pub fn new(
        state: Arc<EngineState>,
        start_ts: SnapshotTimestamp,
        primary_key: Option<Bytes>,
    ) -> Self {
        Self {
            state,
            start_ts,
            primary_key,
        }
    }

    fn check_fault(&self) -> ClientResult<()> {
        if self.state.faults.take_write() {
            self.state.record_failed_write();
            return Err(ClientError::WriteFailed("injected write failure".into()));
        }
        Ok(())
    }
}

impl WriteHelper for MemoryWriteHelper {
    fn commit(&mut self, pairs: Vec<KvPair>) -> ClientResult<SnapshotTimestamp> {
        if self.primary_key.is_some() {
            return Err(ClientError::WriteFailed(
                "helper of a global transaction cannot commit on its own".into(),
            ));
        }
        self.check_fault()?;

        let count = pairs.len();
        let commit_ts = self.state.next_timestamp();
        if let Err(e) = self.state.apply(pairs, self.start_ts, commit_ts) {
            self.state.record_failed_write();
            return Err(e);
        }
        self.state.stats.write().commits += 1;

        debug!(start_ts = %self.start_ts, commit_ts = %commit_ts, pairs = count, "committed");
        Ok(commit_ts)
    }

    fn prewrite_secondaries(&mut self, pairs: Vec<KvPair>) -> ClientResult<()> {
        let Some(primary) = self.primary_key.as_ref() else {
            return Err(ClientError::WriteFailed(
                "prewrite requires a primary key".into(),
            ));
        };
        self.check_fault()?;

        let mut pending = self.state.pending.lock();
        let txn = pending
            .get_mut(primary)
            .filter(|txn| txn.start_ts == self.start_ts)
            .ok_or(ClientError::TransactionNotFound {
                start_ts: self.start_ts.version(),
            })?;
        let count = pairs.len();
        txn.secondaries.extend(pairs);
        drop(pending);

        self.state.stats.write().prewrites += 1;
        debug!(start_ts = %self.start_ts, pairs = count, "prewrote secondaries");
        Ok(())
    }

    fn close(&mut self) -> ClientResult<()> {
        self.state.stats.write().helpers_closed += 1;
        if self.state.faults.take_helper_close() {
            return Err(ClientError::CloseFailed("injected helper close failure".into()));
        }
        Ok(())
    }
}
