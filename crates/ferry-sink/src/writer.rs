//! The bounded batch writer.
//!
//! ```text
//!                open                 finish                close
//! Uninitialized ─────▶ Open ─────────────────▶ Draining ─────────▶ Closed
//!                       │ ▲ receive / flush                          ▲
//!                       └─┘                                          │
//!                       │ flush fails                                │
//!                       └──────────────────▶ Failed ─────────────────┘
//! ```
//!
//! A writer buffers rows until the buffer is full, then flushes them in one
//! write before accepting the next row. `finish` flushes whatever is left.
//!
//! # Failed flushes
//!
//! The buffer is drained before the write is attempted. If the write fails
//! the drained rows are dropped along with every row id drawn while
//! encoding them, and the writer moves to `Failed`: it accepts nothing but
//! `close`. Ids are never handed out twice, at the price of a gap in the id
//! sequence; recovery is a job restart.

use std::fmt;
use std::sync::Arc;

use ferry_client::{
    AddOutcome, ClientConfig, KeyedRowBuffer, MergePolicy, Row, RowBuffer, RowIdAllocator,
    Session, SessionFactory, TableInfo,
};
use ferry_common::{Properties, RowId, TableRef};
use tracing::{debug, info, warn};

use crate::error::{SinkError, SinkResult};
use crate::mode::{self, FlushReport, WriteMode};
use crate::options::SinkOptions;

/// Lifecycle state of a [`BatchWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Created, not yet opened.
    Uninitialized,
    /// Accepting rows.
    Open,
    /// Input finished and flushed; waiting for close.
    Draining,
    /// A flush failed; only close is accepted.
    Failed,
    /// Resources released.
    Closed,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::Uninitialized => "uninitialized",
            WriterState::Open => "open",
            WriterState::Draining => "draining",
            WriterState::Failed => "failed",
            WriterState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Counters of one writer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Rows passed to `receive`.
    pub rows_received: u64,
    /// Duplicate rows absorbed by deduplication.
    pub duplicates_absorbed: u64,
    /// Successful flushes.
    pub flushes: u64,
    /// Rows written by successful flushes.
    pub rows_flushed: u64,
    /// The most recent successful flush.
    pub last_flush: Option<FlushReport>,
}

/// What an open writer holds.
struct Resources {
    session: Box<dyn Session>,
    table: TableInfo,
    allocator: Box<dyn RowIdAllocator>,
    buffer: KeyedRowBuffer,
    options: SinkOptions,
}

/// Accumulates rows and writes them in bounded batches.
///
/// One writer serves one parallel writer instance. Calls on a writer are
/// never concurrent.
pub struct BatchWriter {
    factory: Arc<dyn SessionFactory>,
    mode: Option<Box<dyn WriteMode>>,
    state: WriterState,
    resources: Option<Resources>,
    writer_index: usize,
    stats: WriterStats,
}

impl BatchWriter {
    /// Creates a writer whose write mode is chosen from the options at open.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            mode: None,
            state: WriterState::Uninitialized,
            resources: None,
            writer_index: 0,
            stats: WriterStats::default(),
        }
    }

    /// Creates a writer with an explicit write mode.
    pub fn with_mode(factory: Arc<dyn SessionFactory>, mode: Box<dyn WriteMode>) -> Self {
        let mut writer = Self::new(factory);
        writer.mode = Some(mode);
        writer
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Returns the counters.
    pub fn stats(&self) -> &WriterStats {
        &self.stats
    }

    /// Returns the buffered rows in arrival order.
    pub fn buffered(&self) -> &[Row] {
        match &self.resources {
            Some(resources) => resources.buffer.rows(),
            None => &[],
        }
    }

    /// Returns the resolved table, once open.
    pub fn table(&self) -> Option<&TableInfo> {
        self.resources.as_ref().map(|resources| &resources.table)
    }

    /// Opens the writer from host properties.
    pub fn open(
        &mut self,
        table_ref: TableRef,
        properties: &Properties,
        writer_index: usize,
    ) -> SinkResult<()> {
        let config = ClientConfig::from_properties(properties)?;
        let options = SinkOptions::from_properties(properties)?;
        self.open_with(table_ref, &config, options, writer_index)
    }

    /// Opens the writer with parsed configuration.
    ///
    /// Creates the session, resolves the table, seeds the row-id allocator
    /// with this writer's start and runs the mode's setup. On failure every
    /// resource acquired so far is released and the writer is `Failed`.
    pub fn open_with(
        &mut self,
        table_ref: TableRef,
        config: &ClientConfig,
        options: SinkOptions,
        writer_index: usize,
    ) -> SinkResult<()> {
        self.expect_state("open", WriterState::Uninitialized)?;
        options.validate()?;

        let mut mode = match self.mode.take() {
            Some(mode) => mode,
            None => mode::from_options(&options)?,
        };

        let mut session = match self.factory.create_session(config) {
            Ok(session) => session,
            Err(e) => {
                self.state = WriterState::Failed;
                self.mode = Some(mode);
                return Err(SinkError::client("create session", e));
            }
        };

        match Self::prepare(session.as_ref(), mode.as_mut(), &table_ref, &options, writer_index) {
            Ok((table, allocator)) => {
                info!(
                    table = %table.table_ref,
                    writer = writer_index,
                    mode = mode.name(),
                    buffer_size = options.buffer_size,
                    deduplicate = options.deduplicate,
                    "opened batch writer"
                );
                let policy = if options.deduplicate {
                    options.merge_policy
                } else {
                    MergePolicy::KeepFirst
                };
                let buffer = KeyedRowBuffer::new(&table, options.buffer_size, policy);
                self.resources = Some(Resources {
                    session,
                    table,
                    allocator,
                    buffer,
                    options,
                });
                self.mode = Some(mode);
                self.writer_index = writer_index;
                self.state = WriterState::Open;
                Ok(())
            }
            Err(e) => {
                warn!(table = %table_ref, writer = writer_index, error = %e, "failed to open batch writer");
                if let Err(close_err) = mode.close() {
                    warn!(error = %close_err, "failed to release write mode");
                }
                if let Err(close_err) = session.close() {
                    warn!(error = %close_err, "failed to close session");
                }
                self.mode = Some(mode);
                self.state = WriterState::Failed;
                Err(e)
            }
        }
    }

    fn prepare(
        session: &dyn Session,
        mode: &mut dyn WriteMode,
        table_ref: &TableRef,
        options: &SinkOptions,
        writer_index: usize,
    ) -> SinkResult<(TableInfo, Box<dyn RowIdAllocator>)> {
        let table = session
            .table_info(table_ref)
            .map_err(|e| SinkError::client("resolve table", e))?;

        // Tables with an integer handle never draw ids, so their writers
        // need no configured start.
        let start = if table.needs_row_ids() {
            options.row_id_start(writer_index)?
        } else {
            options
                .row_id_start(writer_index)
                .unwrap_or(RowId::FIRST)
        };
        // Refills must never land in another writer's seed block, even one
        // whose writer has not opened yet.
        if table.needs_row_ids() {
            if let Some(seed_end) = options.row_id_seed_end() {
                session
                    .reserve_row_ids(&table, seed_end)
                    .map_err(|e| SinkError::client("reserve row-id seeds", e))?;
            }
        }
        let allocator = session
            .row_id_allocator(&table, options.row_id_step, start)
            .map_err(|e| SinkError::client("create row-id allocator", e))?;
        debug!(table = %table.table_ref, start = %start, step = options.row_id_step, "seeded row-id allocator");

        mode.setup(session, &table)?;
        Ok((table, allocator))
    }

    /// Accepts one row.
    ///
    /// A full buffer is flushed before the row is added. A row whose key
    /// collides with a buffered row fails with
    /// [`SinkError::DuplicateKey`] and leaves the buffer unchanged, unless
    /// deduplication is on, in which case it is absorbed.
    pub fn receive(&mut self, row: Row) -> SinkResult<()> {
        self.expect_state("receive", WriterState::Open)?;
        self.stats.rows_received += 1;

        if self.resources.as_ref().is_some_and(|r| r.buffer.is_full()) {
            self.flush_buffer()?;
        }

        let state = self.state;
        let Some(resources) = self.resources.as_mut() else {
            return Err(SinkError::InvalidState {
                operation: "receive",
                state,
            });
        };
        let outcome = resources
            .buffer
            .add(row)
            .map_err(|e| SinkError::client("buffer row", e))?;

        match outcome {
            AddOutcome::Added => Ok(()),
            AddOutcome::Duplicate if resources.options.deduplicate => {
                self.stats.duplicates_absorbed += 1;
                Ok(())
            }
            AddOutcome::Duplicate => Err(SinkError::DuplicateKey {
                table: resources.table.table_ref.to_string(),
                position: self.stats.rows_received,
            }),
            AddOutcome::Full => Err(SinkError::BufferOverflow {
                capacity: resources.buffer.capacity(),
            }),
        }
    }

    /// Writes every buffered row now.
    pub fn flush(&mut self) -> SinkResult<()> {
        self.expect_state("flush", WriterState::Open)?;
        self.flush_buffer()
    }

    /// Ends the input: flushes the residual rows and starts draining.
    pub fn finish(&mut self) -> SinkResult<()> {
        self.expect_state("finish", WriterState::Open)?;
        self.flush_buffer()?;
        self.state = WriterState::Draining;
        info!(
            writer = self.writer_index,
            rows = self.stats.rows_flushed,
            flushes = self.stats.flushes,
            "finished batch writer"
        );
        Ok(())
    }

    /// Releases the write mode and the session.
    ///
    /// Failures are logged and never returned, after every resource has
    /// been attempted. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.state == WriterState::Closed {
            return;
        }
        if let Some(mode) = self.mode.as_mut() {
            if let Err(e) = mode.close() {
                warn!(writer = self.writer_index, error = %e, "failed to release write mode");
            }
        }
        if let Some(mut resources) = self.resources.take() {
            if !resources.buffer.is_empty() {
                warn!(
                    writer = self.writer_index,
                    rows = resources.buffer.len(),
                    "discarding unflushed rows"
                );
            }
            if let Err(e) = resources.session.close() {
                warn!(writer = self.writer_index, error = %e, "failed to close session");
            }
        }
        debug!(writer = self.writer_index, from = %self.state, "closed batch writer");
        self.state = WriterState::Closed;
    }

    fn flush_buffer(&mut self) -> SinkResult<()> {
        let mode = match self.mode.as_mut() {
            Some(mode) => mode,
            None => {
                return Err(SinkError::InvalidState {
                    operation: "flush",
                    state: self.state,
                })
            }
        };
        let Some(resources) = self.resources.as_mut() else {
            return Err(SinkError::InvalidState {
                operation: "flush",
                state: self.state,
            });
        };

        let rows = resources.buffer.drain();
        if rows.is_empty() {
            return Ok(());
        }

        match mode.flush(resources.session.as_ref(), &rows, resources.allocator.as_mut()) {
            Ok(report) => {
                self.stats.flushes += 1;
                self.stats.rows_flushed += report.rows as u64;
                self.stats.last_flush = Some(report);
                debug!(
                    writer = self.writer_index,
                    mode = mode.name(),
                    rows = report.rows,
                    start_ts = %report.start_ts,
                    "flushed batch"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    writer = self.writer_index,
                    rows = rows.len(),
                    error = %e,
                    "flush failed, dropping batch"
                );
                self.state = WriterState::Failed;
                Err(e)
            }
        }
    }

    fn expect_state(&self, operation: &'static str, expected: WriterState) -> SinkResult<()> {
        if self.state != expected {
            return Err(SinkError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        if self.resources.is_some() {
            self.close();
        }
    }
}

impl fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchWriter")
            .field("state", &self.state)
            .field("writer_index", &self.writer_index)
            .field("buffered", &self.buffered().len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_client::memory::MemoryEngine;
    use ferry_client::{row, ColumnInfo, DataType, IndexInfo};
    use ferry_common::ErrorCategory;
    use parking_lot::Mutex;

    /// Records every flushed batch and the row ids drawn for it.
    #[derive(Clone, Default)]
    struct Recorder {
        batches: Arc<Mutex<Vec<Vec<Row>>>>,
        ids: Arc<Mutex<Vec<i64>>>,
        fail_next: Arc<Mutex<bool>>,
    }

    struct RecordingMode(Recorder);

    impl WriteMode for RecordingMode {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn setup(&mut self, _session: &dyn Session, _table: &TableInfo) -> SinkResult<()> {
            Ok(())
        }

        fn flush(
            &mut self,
            session: &dyn Session,
            rows: &[Row],
            allocator: &mut dyn RowIdAllocator,
        ) -> SinkResult<FlushReport> {
            for _ in rows {
                let id = allocator
                    .next()
                    .map_err(|e| SinkError::client("draw row id", e))?;
                self.0.ids.lock().push(id.as_i64());
            }
            if std::mem::take(&mut *self.0.fail_next.lock()) {
                return Err(SinkError::client(
                    "commit batch",
                    ferry_client::ClientError::WriteFailed("injected".into()),
                ));
            }
            self.0.batches.lock().push(rows.to_vec());
            Ok(FlushReport {
                rows: rows.len(),
                start_ts: session.current_timestamp().map_err(|e| SinkError::client("ts", e))?,
                commit_ts: None,
            })
        }
    }

    fn engine() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine
            .create_table(
                TableInfo::new(
                    TableRef::new("shop", "items"),
                    vec![
                        ColumnInfo::new("sku", DataType::Varchar(16)).not_null(),
                        ColumnInfo::new("qty", DataType::Int),
                    ],
                )
                .with_primary_key(vec![0]),
            )
            .unwrap();
        engine
            .create_table(
                TableInfo::new(
                    TableRef::new("shop", "stock"),
                    vec![
                        ColumnInfo::new("id", DataType::BigInt).not_null(),
                        ColumnInfo::new("qty", DataType::Int),
                    ],
                )
                .with_primary_key(vec![0]),
            )
            .unwrap();
        engine
    }

    fn recording_writer(engine: &MemoryEngine, options: SinkOptions) -> (BatchWriter, Recorder) {
        let recorder = Recorder::default();
        let mut writer = BatchWriter::with_mode(
            Arc::new(engine.clone()),
            Box::new(RecordingMode(recorder.clone())),
        );
        writer
            .open_with(
                TableRef::new("shop", "items"),
                &ClientConfig::new(),
                options,
                0,
            )
            .unwrap();
        (writer, recorder)
    }

    fn small(buffer_size: usize) -> SinkOptions {
        SinkOptions::new()
            .buffer_size(buffer_size)
            .row_id_step(100)
            .row_id_starts([RowId::new(1)])
    }

    #[test]
    fn test_capacity_two_flushes_in_order() {
        let engine = engine();
        let (mut writer, recorder) = recording_writer(&engine, small(2));

        writer.receive(row!["r1", 1]).unwrap();
        writer.receive(row!["r2", 2]).unwrap();
        assert_eq!(writer.buffered().len(), 2);
        assert!(recorder.batches.lock().is_empty());

        writer.receive(row!["r3", 3]).unwrap();
        assert_eq!(writer.buffered(), &[row!["r3", 3]]);
        assert_eq!(*recorder.batches.lock(), vec![vec![row!["r1", 1], row!["r2", 2]]]);

        writer.finish().unwrap();
        assert!(writer.buffered().is_empty());
        assert_eq!(
            *recorder.batches.lock(),
            vec![
                vec![row!["r1", 1], row!["r2", 2]],
                vec![row!["r3", 3]],
            ]
        );
        assert_eq!(writer.stats().flushes, 2);
        assert_eq!(writer.state(), WriterState::Draining);
        writer.close();
    }

    #[test]
    fn test_short_input_flushes_once_on_finish() {
        let engine = engine();
        let (mut writer, recorder) = recording_writer(&engine, small(10));
        let rows: Vec<Row> = (0..7).map(|i| row![format!("sku{i}"), i]).collect();
        for row in &rows {
            writer.receive(row.clone()).unwrap();
        }
        assert!(recorder.batches.lock().is_empty());

        writer.finish().unwrap();
        assert_eq!(*recorder.batches.lock(), vec![rows]);
    }

    #[test]
    fn test_flush_happens_before_row_past_capacity() {
        let engine = engine();
        let (mut writer, recorder) = recording_writer(&engine, small(3));
        for i in 0..3 {
            writer.receive(row![format!("sku{i}"), i]).unwrap();
        }
        assert!(recorder.batches.lock().is_empty());

        writer.receive(row!["sku3", 3]).unwrap();
        assert_eq!(recorder.batches.lock().len(), 1);
        assert_eq!(recorder.batches.lock()[0].len(), 3);
        assert_eq!(writer.buffered().len(), 1);
    }

    #[test]
    fn test_finish_with_empty_buffer_does_not_flush() {
        let engine = engine();
        let (mut writer, recorder) = recording_writer(&engine, small(2));
        writer.receive(row!["a", 1]).unwrap();
        writer.receive(row!["b", 2]).unwrap();
        writer.flush().unwrap();

        writer.finish().unwrap();
        assert_eq!(recorder.batches.lock().len(), 1);
    }

    #[test]
    fn test_duplicate_without_dedup_fails_and_keeps_buffer() {
        let engine = engine();
        let (mut writer, _) = recording_writer(&engine, small(10));
        writer.receive(row!["a", 1]).unwrap();

        let err = writer.receive(row!["a", 99]).unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(err.category(), ErrorCategory::Data);
        assert_eq!(writer.buffered(), &[row!["a", 1]]);
        // A rejected duplicate does not poison the writer.
        writer.receive(row!["b", 2]).unwrap();
    }

    #[test]
    fn test_duplicate_with_dedup_is_absorbed() {
        let engine = engine();
        let (mut writer, _) = recording_writer(&engine, small(10).deduplicate(true));
        writer.receive(row!["a", 1]).unwrap();
        writer.receive(row!["a", 99]).unwrap();

        assert_eq!(writer.buffered(), &[row!["a", 1]]);
        assert_eq!(writer.stats().duplicates_absorbed, 1);
    }

    #[test]
    fn test_dedup_keep_last_replaces() {
        let engine = engine();
        let options = small(10)
            .deduplicate(true)
            .merge_policy(MergePolicy::KeepLast);
        let (mut writer, _) = recording_writer(&engine, options);
        writer.receive(row!["a", 1]).unwrap();
        writer.receive(row!["b", 2]).unwrap();
        writer.receive(row!["a", 99]).unwrap();

        assert_eq!(writer.buffered(), &[row!["a", 99], row!["b", 2]]);
    }

    #[test]
    fn test_keep_last_ignored_without_dedup() {
        let engine = engine();
        let options = small(10).merge_policy(MergePolicy::KeepLast);
        let (mut writer, _) = recording_writer(&engine, options);
        writer.receive(row!["a", 1]).unwrap();

        assert!(writer.receive(row!["a", 99]).is_err());
        assert_eq!(writer.buffered(), &[row!["a", 1]]);
    }

    #[test]
    fn test_lifecycle_guards() {
        let engine = engine();
        let mut writer = BatchWriter::new(Arc::new(engine.clone()));
        assert!(matches!(
            writer.receive(row!["a", 1]),
            Err(SinkError::InvalidState {
                state: WriterState::Uninitialized,
                ..
            })
        ));

        let (mut writer, _) = recording_writer(&engine, small(2));
        writer.finish().unwrap();
        assert!(matches!(
            writer.receive(row!["a", 1]),
            Err(SinkError::InvalidState {
                state: WriterState::Draining,
                ..
            })
        ));
        assert!(writer.finish().is_err());

        writer.close();
        writer.close();
        assert_eq!(writer.state(), WriterState::Closed);
        assert!(writer
            .open_with(TableRef::new("shop", "items"), &ClientConfig::new(), small(2), 0)
            .is_err());
    }

    #[test]
    fn test_missing_table_is_configuration_error() {
        let engine = engine();
        let mut writer = BatchWriter::new(Arc::new(engine.clone()));
        let err = writer
            .open_with(
                TableRef::new("shop", "nope"),
                &ClientConfig::new(),
                small(2),
                0,
            )
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(writer.state(), WriterState::Failed);
        // The session opened for the attempt was released.
        assert_eq!(engine.stats().sessions_closed, 1);
    }

    #[test]
    fn test_missing_row_id_start() {
        let engine = engine();
        engine
            .create_table(TableInfo::new(
                TableRef::new("shop", "log"),
                vec![ColumnInfo::new("line", DataType::Text)],
            ))
            .unwrap();

        let mut writer = BatchWriter::new(Arc::new(engine.clone()));
        let options = SinkOptions::new().row_id_starts([RowId::new(1)]);
        let err = writer
            .open_with(TableRef::new("shop", "log"), &ClientConfig::new(), options, 4)
            .unwrap_err();
        assert!(matches!(
            err,
            SinkError::Config(ferry_common::FerryError::MissingRowIdStart {
                index: 4,
                available: 1
            })
        ));
    }

    #[test]
    fn test_failed_flush_drops_batch_and_fails_writer() {
        let engine = engine();
        let (mut writer, recorder) = recording_writer(&engine, small(2));
        writer.receive(row!["a", 1]).unwrap();
        writer.receive(row!["b", 2]).unwrap();

        *recorder.fail_next.lock() = true;
        let err = writer.receive(row!["c", 3]).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Resource);
        assert_eq!(writer.state(), WriterState::Failed);
        assert!(writer.buffered().is_empty());
        // Ids drawn for the failed batch stay consumed.
        assert_eq!(*recorder.ids.lock(), vec![1, 2]);

        assert!(matches!(
            writer.receive(row!["d", 4]),
            Err(SinkError::InvalidState {
                state: WriterState::Failed,
                ..
            })
        ));
        assert!(writer.flush().is_err());
        assert!(writer.finish().is_err());

        writer.close();
        assert_eq!(writer.state(), WriterState::Closed);
        assert_eq!(engine.stats().sessions_closed, 1);
    }

    #[test]
    fn test_close_swallows_teardown_failures() {
        let engine = engine();
        let mut writer = BatchWriter::new(Arc::new(engine.clone()));
        writer
            .open_with(
                TableRef::new("shop", "stock"),
                &ClientConfig::new(),
                SinkOptions::new(),
                0,
            )
            .unwrap();
        writer.receive(row![1, 10]).unwrap();
        writer.finish().unwrap();

        engine.faults().fail_next_session_close();
        writer.close();
        assert_eq!(writer.state(), WriterState::Closed);
        assert_eq!(engine.stats().sessions_closed, 1);
    }

    #[test]
    fn test_minibatch_commits_each_flush() {
        let engine = engine();
        let mut writer = BatchWriter::new(Arc::new(engine.clone()));
        writer
            .open_with(
                TableRef::new("shop", "stock"),
                &ClientConfig::new(),
                SinkOptions::new().buffer_size(2),
                0,
            )
            .unwrap();
        for i in 1..=5 {
            writer.receive(row![i, i * 10]).unwrap();
        }
        writer.finish().unwrap();
        writer.close();

        // One commit round trip per flush, nothing prewritten.
        assert_eq!(writer.stats().flushes, 3);
        assert_eq!(engine.stats().commits, 3);
        assert_eq!(engine.stats().prewrites, 0);
        let rows = engine
            .scan(&TableRef::new("shop", "stock"), engine.current_timestamp())
            .unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], row![1, 10]);
    }

    #[test]
    fn test_failed_commit_against_engine() {
        let engine = engine();
        let mut writer = BatchWriter::new(Arc::new(engine.clone()));
        writer
            .open_with(
                TableRef::new("shop", "stock"),
                &ClientConfig::new(),
                SinkOptions::new().buffer_size(1),
                0,
            )
            .unwrap();
        writer.receive(row![1, 10]).unwrap();

        engine.faults().fail_next_write();
        let err = writer.receive(row![2, 20]).unwrap_err();
        assert!(matches!(err, SinkError::Client { operation: "commit batch", .. }));
        writer.close();

        let rows = engine
            .scan(&TableRef::new("shop", "stock"), engine.current_timestamp())
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_unique_index_duplicates() {
        let engine = engine();
        engine
            .create_table(
                TableInfo::new(
                    TableRef::new("shop", "users"),
                    vec![
                        ColumnInfo::new("id", DataType::BigInt).not_null(),
                        ColumnInfo::new("email", DataType::Varchar(64)),
                    ],
                )
                .with_primary_key(vec![0])
                .with_index(IndexInfo::new("uk_email", vec![1], true)),
            )
            .unwrap();

        let mut writer = BatchWriter::new(Arc::new(engine.clone()));
        writer
            .open_with(
                TableRef::new("shop", "users"),
                &ClientConfig::new(),
                SinkOptions::new(),
                0,
            )
            .unwrap();
        writer.receive(row![1, "a@x"]).unwrap();
        assert!(writer.receive(row![2, "a@x"]).unwrap_err().is_duplicate());
    }
}
