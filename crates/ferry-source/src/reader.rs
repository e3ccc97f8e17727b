//! The snapshot reader.
//!
//! ```text
//!                first read                 cursor opened
//! Uninitialized ───────────▶ SessionReady ───────────────▶ Iterating
//!                                                             │ advance() == false
//!                                                             ▼
//!        close (from any state) ─────▶ Closed           Exhausted
//! ```
//!
//! Nothing touches the engine until the first read. The snapshot timestamp
//! is resolved once, when the cursor is opened, and fixed from then on.

use std::fmt;
use std::sync::Arc;

use ferry_client::{ClientConfig, ColumnInfo, RecordCursor, Session, SessionFactory, Split};
use ferry_common::PROGRESS_UNKNOWN;
use tracing::{debug, info, warn};

use crate::error::{SourceError, SourceResult};
use crate::record::OutputRecord;
use crate::timestamp::{resolve_timestamp, ResolvedTimestamp};

/// Lifecycle state of a [`SnapshotReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Nothing acquired yet.
    Uninitialized,
    /// Session established, cursor not open.
    SessionReady,
    /// Cursor open, rows remain.
    Iterating,
    /// Cursor drained.
    Exhausted,
    /// Resources released.
    Closed,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReaderState::Uninitialized => "uninitialized",
            ReaderState::SessionReady => "session-ready",
            ReaderState::Iterating => "iterating",
            ReaderState::Exhausted => "exhausted",
            ReaderState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// An open cursor with what is needed to materialize its rows.
struct OpenCursor {
    cursor: Box<dyn RecordCursor>,
    columns: Vec<ColumnInfo>,
    resolved: ResolvedTimestamp,
}

enum Phase {
    Uninitialized,
    SessionReady {
        session: Box<dyn Session>,
    },
    Iterating {
        session: Box<dyn Session>,
        open: OpenCursor,
    },
    Exhausted {
        session: Box<dyn Session>,
        open: OpenCursor,
    },
    Closed,
}

impl Phase {
    fn state(&self) -> ReaderState {
        match self {
            Phase::Uninitialized => ReaderState::Uninitialized,
            Phase::SessionReady { .. } => ReaderState::SessionReady,
            Phase::Iterating { .. } => ReaderState::Iterating,
            Phase::Exhausted { .. } => ReaderState::Exhausted,
            Phase::Closed => ReaderState::Closed,
        }
    }
}

/// Reads one split at a fixed snapshot, one row per call.
pub struct SnapshotReader {
    factory: Arc<dyn SessionFactory>,
    config: ClientConfig,
    split: Split,
    phase: Phase,
    position: u64,
}

impl SnapshotReader {
    /// Creates a reader. No session is created until the first read.
    pub fn new(factory: Arc<dyn SessionFactory>, config: ClientConfig, split: Split) -> Self {
        Self {
            factory,
            config,
            split,
            phase: Phase::Uninitialized,
            position: 0,
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ReaderState {
        self.phase.state()
    }

    /// Returns the split being read.
    pub fn split(&self) -> &Split {
        &self.split
    }

    /// Returns the number of rows returned so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the fraction of the split read so far.
    ///
    /// The total row count is unknown, so this is always
    /// [`PROGRESS_UNKNOWN`].
    pub fn progress(&self) -> f32 {
        PROGRESS_UNKNOWN
    }

    /// Returns the snapshot the reader observes, once the cursor is open.
    pub fn resolved_timestamp(&self) -> Option<ResolvedTimestamp> {
        match &self.phase {
            Phase::Iterating { open, .. } | Phase::Exhausted { open, .. } => Some(open.resolved),
            _ => None,
        }
    }

    /// Returns the columns being read, once the cursor is open.
    pub fn columns(&self) -> Option<&[ColumnInfo]> {
        match &self.phase {
            Phase::Iterating { open, .. } | Phase::Exhausted { open, .. } => Some(&open.columns),
            _ => None,
        }
    }

    /// Reads the next row into `record`.
    ///
    /// Returns false once the split is exhausted, on this and every later
    /// call, leaving `record` untouched.
    pub fn next_into(&mut self, record: &mut OutputRecord) -> SourceResult<bool> {
        self.ensure_session()?;
        self.ensure_cursor()?;

        let Phase::Iterating { open, .. } = &mut self.phase else {
            return match self.phase.state() {
                ReaderState::Exhausted => Ok(false),
                state => Err(SourceError::InvalidState {
                    operation: "read",
                    state,
                }),
            };
        };

        let advanced = open
            .cursor
            .advance()
            .map_err(|e| SourceError::client("advance cursor", e))?;
        if !advanced {
            debug!(split = %self.split.range, rows = self.position, "cursor exhausted");
            self.phase = match std::mem::replace(&mut self.phase, Phase::Closed) {
                Phase::Iterating { session, open } => Phase::Exhausted { session, open },
                other => other,
            };
            return Ok(false);
        }

        let count = open.cursor.field_count();
        record.clear();
        for (index, column) in open.columns.iter().enumerate() {
            let value = open
                .cursor
                .value(index)
                .ok_or(SourceError::MissingField { index, count })?;
            record.push(column.name.clone(), column.data_type.clone(), value.clone());
        }
        self.position += 1;
        Ok(true)
    }

    /// Reads the next row, or `None` once the split is exhausted.
    pub fn next_record(&mut self) -> SourceResult<Option<OutputRecord>> {
        let mut record = OutputRecord::new();
        Ok(self.next_into(&mut record)?.then_some(record))
    }

    fn ensure_session(&mut self) -> SourceResult<()> {
        match self.phase {
            Phase::Uninitialized => {}
            Phase::Closed => {
                return Err(SourceError::InvalidState {
                    operation: "read",
                    state: ReaderState::Closed,
                })
            }
            _ => return Ok(()),
        }

        let session = self
            .factory
            .create_session(&self.config)
            .map_err(|e| SourceError::client("create session", e))?;
        debug!(table = %self.split.table_ref, "created reader session");
        self.phase = Phase::SessionReady { session };
        Ok(())
    }

    fn ensure_cursor(&mut self) -> SourceResult<()> {
        let Phase::SessionReady { session } = &self.phase else {
            return Ok(());
        };

        let resolved = resolve_timestamp(&self.config, &self.split)?;
        let columns = session
            .table_info(&self.split.table_ref)
            .map_err(|e| SourceError::client("resolve table", e))?
            .columns;
        let cursor = session
            .open_cursor(&self.split, &columns, resolved.timestamp)
            .map_err(|e| SourceError::client("open cursor", e))?;

        info!(
            table = %self.split.table_ref,
            range = %self.split.range,
            timestamp = %resolved.timestamp,
            source = %resolved.source,
            "opened snapshot cursor"
        );

        let open = OpenCursor {
            cursor,
            columns,
            resolved,
        };
        self.phase = match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::SessionReady { session } => Phase::Iterating { session, open },
            other => other,
        };
        Ok(())
    }

    /// Releases the cursor, then the session.
    ///
    /// Failures are logged and never returned. Closing twice is a no-op.
    pub fn close(&mut self) {
        let (session, cursor) = match std::mem::replace(&mut self.phase, Phase::Closed) {
            Phase::Uninitialized | Phase::Closed => (None, None),
            Phase::SessionReady { session } => (Some(session), None),
            Phase::Iterating { session, open } | Phase::Exhausted { session, open } => {
                (Some(session), Some(open.cursor))
            }
        };

        if let Some(mut cursor) = cursor {
            if let Err(e) = cursor.close() {
                warn!(table = %self.split.table_ref, error = %e, "failed to close cursor");
            }
        }
        if let Some(mut session) = session {
            if let Err(e) = session.close() {
                warn!(table = %self.split.table_ref, error = %e, "failed to close session");
            }
            debug!(table = %self.split.table_ref, rows = self.position, "closed snapshot reader");
        }
    }
}

impl Drop for SnapshotReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SnapshotReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotReader")
            .field("split", &self.split)
            .field("state", &self.state())
            .field("position", &self.position)
            .finish()
    }
}
