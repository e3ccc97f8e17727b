//! Job-level coordination run once before and after the parallel writers.

use bytes::Bytes;
use ferry_client::{ClientConfig, Session, SessionFactory};
use ferry_common::{RowId, SnapshotTimestamp, TableRef};
use tracing::{info, warn};

use crate::error::{SinkError, SinkResult};
use crate::options::GlobalTxn;

/// Reserves one row-id block per writer and returns the block starts.
///
/// Blocks come from the engine's id counter for the table, so the starts
/// are pairwise at least `step` apart and never overlap any later block
/// the writers refill from the same counter.
pub fn plan_row_id_starts(
    session: &dyn Session,
    table_ref: &TableRef,
    parallelism: usize,
    step: u64,
) -> SinkResult<Vec<RowId>> {
    let table = session
        .table_info(table_ref)
        .map_err(|e| SinkError::client("resolve table", e))?;

    let starts = (0..parallelism)
        .map(|_| {
            session
                .allocate_row_id_block(&table, step)
                .map_err(|e| SinkError::client("reserve row-id block", e))
        })
        .collect::<SinkResult<Vec<_>>>()?;

    info!(table = %table_ref, writers = parallelism, step, "planned row-id starts");
    Ok(starts)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxnState {
    Pending,
    Committed,
    Aborted,
}

impl TxnState {
    fn name(self) -> &'static str {
        match self {
            TxnState::Pending => "pending",
            TxnState::Committed => "committed",
            TxnState::Aborted => "aborted",
        }
    }
}

/// Owns the primary lock of a global-mode job.
///
/// `begin` locks a primary key at a fresh start timestamp. Writers join the
/// transaction through [`SinkOptions::global`](crate::SinkOptions::global)
/// and prewrite their batches as secondaries. `commit` then makes every
/// batch of every writer visible at one commit timestamp. Dropping a pending
/// committer rolls the transaction back.
pub struct GlobalCommitter {
    session: Option<Box<dyn Session>>,
    txn: GlobalTxn,
    state: TxnState,
}

impl GlobalCommitter {
    /// Starts a global transaction for writes into `table_ref`.
    pub fn begin(
        factory: &dyn SessionFactory,
        config: &ClientConfig,
        table_ref: &TableRef,
    ) -> SinkResult<Self> {
        let mut session = factory
            .create_session(config)
            .map_err(|e| SinkError::client("create session", e))?;

        match Self::lock_primary(session.as_ref(), table_ref) {
            Ok(txn) => {
                info!(table = %table_ref, start_ts = %txn.start_ts, "began global transaction");
                Ok(Self {
                    session: Some(session),
                    txn,
                    state: TxnState::Pending,
                })
            }
            Err(e) => {
                if let Err(close_err) = session.close() {
                    warn!(error = %close_err, "failed to close session");
                }
                Err(e)
            }
        }
    }

    fn lock_primary(session: &dyn Session, table_ref: &TableRef) -> SinkResult<GlobalTxn> {
        let table = session
            .table_info(table_ref)
            .map_err(|e| SinkError::client("resolve table", e))?;
        let start_ts = session
            .current_timestamp()
            .map_err(|e| SinkError::client("obtain start timestamp", e))?;
        let primary_key = Bytes::from(format!(
            "ferry/{}/{}/{}",
            table.table_id,
            table.table_ref,
            start_ts.version()
        ));
        session
            .prewrite_primary(&primary_key, start_ts)
            .map_err(|e| SinkError::client("prewrite primary", e))?;
        Ok(GlobalTxn {
            start_ts,
            primary_key,
        })
    }

    /// Returns the transaction writers join.
    pub fn transaction(&self) -> &GlobalTxn {
        &self.txn
    }

    /// Commits the transaction and returns its commit timestamp.
    pub fn commit(&mut self) -> SinkResult<SnapshotTimestamp> {
        let session = self.pending_session()?;
        let commit_ts = session
            .current_timestamp()
            .map_err(|e| SinkError::client("obtain commit timestamp", e))?;
        let result = session
            .commit_primary(&self.txn.primary_key, self.txn.start_ts, commit_ts)
            .map_err(|e| SinkError::client("commit primary", e));

        if let Err(e) = result {
            // A failed commit leaves the primary locked; release it.
            self.rollback();
            return Err(e);
        }
        self.state = TxnState::Committed;
        info!(start_ts = %self.txn.start_ts, commit_ts = %commit_ts, "committed global transaction");
        self.release();
        Ok(commit_ts)
    }

    /// Rolls the transaction back, discarding every prewritten batch.
    pub fn abort(&mut self) -> SinkResult<()> {
        self.pending_session()?;
        self.rollback();
        Ok(())
    }

    fn pending_session(&self) -> SinkResult<&dyn Session> {
        match (&self.session, self.state) {
            (Some(session), TxnState::Pending) => Ok(session.as_ref()),
            (_, state) => Err(SinkError::TransactionFinished(state.name())),
        }
    }

    fn rollback(&mut self) {
        if let Some(session) = &self.session {
            match session.rollback_primary(&self.txn.primary_key, self.txn.start_ts) {
                Ok(()) => info!(start_ts = %self.txn.start_ts, "rolled back global transaction"),
                Err(e) => warn!(start_ts = %self.txn.start_ts, error = %e, "failed to roll back global transaction"),
            }
        }
        self.state = TxnState::Aborted;
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close() {
                warn!(error = %e, "failed to close session");
            }
        }
    }
}

impl Drop for GlobalCommitter {
    fn drop(&mut self) {
        if self.state == TxnState::Pending {
            warn!(start_ts = %self.txn.start_ts, "global transaction dropped before commit");
            self.rollback();
        }
        self.release();
    }
}

impl std::fmt::Debug for GlobalCommitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalCommitter")
            .field("txn", &self.txn)
            .field("state", &self.state)
            .finish()
    }
}
