//! One transaction per batch.

use ferry_client::{Row, RowEncoder, RowIdAllocator, Session, TableInfo};
use tracing::{debug, warn};

use super::{FlushReport, WriteMode};
use crate::error::{SinkError, SinkResult};
use crate::writer::WriterState;

/// Commits every flushed batch as its own transaction.
///
/// Each flush takes a fresh start timestamp, so a batch sees every batch
/// committed before it and becomes visible at its own commit timestamp.
///
/// A flush makes one write round trip, the commit. The start timestamp
/// comes from a separate call to the timestamp oracle, and creating the
/// write helper stays local to the session.
#[derive(Default)]
pub struct MiniBatchMode {
    encoder: Option<Box<dyn RowEncoder>>,
}

impl MiniBatchMode {
    /// Creates the mode.
    pub fn new() -> Self {
        Self::default()
    }
}

impl WriteMode for MiniBatchMode {
    fn name(&self) -> &'static str {
        "minibatch"
    }

    fn setup(&mut self, session: &dyn Session, table: &TableInfo) -> SinkResult<()> {
        let encoder = session
            .row_encoder(table)
            .map_err(|e| SinkError::client("create row encoder", e))?;
        self.encoder = Some(encoder);
        Ok(())
    }

    fn flush(
        &mut self,
        session: &dyn Session,
        rows: &[Row],
        allocator: &mut dyn RowIdAllocator,
    ) -> SinkResult<FlushReport> {
        let encoder = self.encoder.as_mut().ok_or(SinkError::InvalidState {
            operation: "flush",
            state: WriterState::Uninitialized,
        })?;

        let start_ts = session
            .current_timestamp()
            .map_err(|e| SinkError::client("obtain start timestamp", e))?;
        let pairs = encoder
            .encode(rows, allocator)
            .map_err(|e| SinkError::client("encode batch", e))?;

        let mut helper = session
            .write_helper(start_ts, None)
            .map_err(|e| SinkError::client("create write helper", e))?;
        let committed = helper.commit(pairs);
        if let Err(e) = helper.close() {
            warn!(error = %e, "failed to close write helper");
        }
        let commit_ts = committed.map_err(|e| SinkError::client("commit batch", e))?;

        debug!(rows = rows.len(), start_ts = %start_ts, commit_ts = %commit_ts, "committed batch");
        Ok(FlushReport {
            rows: rows.len(),
            start_ts,
            commit_ts: Some(commit_ts),
        })
    }

    fn close(&mut self) -> SinkResult<()> {
        match self.encoder.take() {
            Some(mut encoder) => encoder
                .close()
                .map_err(|e| SinkError::client("close row encoder", e)),
            None => Ok(()),
        }
    }
}
