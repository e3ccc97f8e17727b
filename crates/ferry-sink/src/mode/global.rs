//! One transaction for the whole job.

use ferry_client::{Row, RowEncoder, RowIdAllocator, Session, TableInfo, WriteHelper};
use tracing::debug;

use super::{FlushReport, WriteMode};
use crate::error::{SinkError, SinkResult};
use crate::options::GlobalTxn;
use crate::writer::WriterState;

/// Prewrites every batch into a transaction shared by all writers.
///
/// Nothing becomes visible until the coordinator commits the primary key,
/// at which point every writer's batches appear at once.
pub struct GlobalMode {
    txn: GlobalTxn,
    encoder: Option<Box<dyn RowEncoder>>,
    helper: Option<Box<dyn WriteHelper>>,
}

impl GlobalMode {
    /// Creates a mode joining `txn`.
    pub fn new(txn: GlobalTxn) -> Self {
        Self {
            txn,
            encoder: None,
            helper: None,
        }
    }

    /// Returns the joined transaction.
    pub fn transaction(&self) -> &GlobalTxn {
        &self.txn
    }
}

impl WriteMode for GlobalMode {
    fn name(&self) -> &'static str {
        "global"
    }

    fn setup(&mut self, session: &dyn Session, table: &TableInfo) -> SinkResult<()> {
        let encoder = session
            .row_encoder(table)
            .map_err(|e| SinkError::client("create row encoder", e))?;
        self.encoder = Some(encoder);

        let helper = session
            .write_helper(self.txn.start_ts, Some(self.txn.primary_key.clone()))
            .map_err(|e| SinkError::client("create write helper", e))?;
        self.helper = Some(helper);

        debug!(start_ts = %self.txn.start_ts, "joined global transaction");
        Ok(())
    }

    fn flush(
        &mut self,
        _session: &dyn Session,
        rows: &[Row],
        allocator: &mut dyn RowIdAllocator,
    ) -> SinkResult<FlushReport> {
        let (Some(encoder), Some(helper)) = (self.encoder.as_mut(), self.helper.as_mut()) else {
            return Err(SinkError::InvalidState {
                operation: "flush",
                state: WriterState::Uninitialized,
            });
        };

        let pairs = encoder
            .encode(rows, allocator)
            .map_err(|e| SinkError::client("encode batch", e))?;
        helper
            .prewrite_secondaries(pairs)
            .map_err(|e| SinkError::client("prewrite batch", e))?;

        debug!(rows = rows.len(), start_ts = %self.txn.start_ts, "prewrote batch");
        Ok(FlushReport {
            rows: rows.len(),
            start_ts: self.txn.start_ts,
            commit_ts: None,
        })
    }

    fn close(&mut self) -> SinkResult<()> {
        let helper = self
            .helper
            .take()
            .map_or(Ok(()), |mut helper| helper.close())
            .map_err(|e| SinkError::client("close write helper", e));
        let encoder = self
            .encoder
            .take()
            .map_or(Ok(()), |mut encoder| encoder.close())
            .map_err(|e| SinkError::client("close row encoder", e));
        helper.and(encoder)
    }
}
