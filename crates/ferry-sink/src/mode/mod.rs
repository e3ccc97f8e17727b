//! Write modes.
//!
//! A write mode decides how a drained batch reaches the engine. The writer
//! owns everything else (session, buffer, allocator, lifecycle) and calls
//! into the mode at exactly two points:
//!
//! ```text
//! open ──▶ setup(session, table)
//! flush ─▶ flush(session, rows, allocator)
//! close ─▶ close()
//! ```

mod global;
mod minibatch;

pub use global::GlobalMode;
pub use minibatch::MiniBatchMode;

use ferry_client::{Row, RowIdAllocator, Session, TableInfo};
use ferry_common::{FerryResult, SnapshotTimestamp};

use crate::error::SinkResult;
use crate::options::{SinkOptions, WriteModeKind};

/// What one flush wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Rows written.
    pub rows: usize,
    /// Start timestamp of the transaction the rows were written in.
    pub start_ts: SnapshotTimestamp,
    /// Commit timestamp, if the rows are already visible.
    pub commit_ts: Option<SnapshotTimestamp>,
}

/// Mode-specific part of a batch writer.
pub trait WriteMode: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Prepares the mode once session, table and allocator are ready.
    fn setup(&mut self, session: &dyn Session, table: &TableInfo) -> SinkResult<()>;

    /// Writes one batch in a single round trip.
    fn flush(
        &mut self,
        session: &dyn Session,
        rows: &[Row],
        allocator: &mut dyn RowIdAllocator,
    ) -> SinkResult<FlushReport>;

    /// Releases what `setup` acquired. Every resource is attempted even if
    /// an earlier one fails; the first failure is returned.
    fn close(&mut self) -> SinkResult<()> {
        Ok(())
    }
}

/// Builds the mode selected by `options`.
pub fn from_options(options: &SinkOptions) -> FerryResult<Box<dyn WriteMode>> {
    Ok(match options.write_mode {
        WriteModeKind::MiniBatch => Box::new(MiniBatchMode::new()),
        WriteModeKind::Global => Box::new(GlobalMode::new(options.global_transaction()?)),
    })
}

