//! Snapshot cursors over the in-memory engine.

use std::sync::Arc;

use ferry_common::SnapshotTimestamp;

use super::codec::{table_end, table_start};
use super::state::EngineState;
use crate::error::{ClientError, ClientResult};
use crate::scan::Split;
use crate::session::RecordCursor;
use crate::table::{ColumnInfo, TableInfo};
use crate::value::{Row, Value};

/// A cursor over rows materialized when it was opened.
///
/// Rows committed after the snapshot timestamp are never visible, so
/// materializing up front yields the same result as a lazy scan.
pub(crate) struct MemoryCursor {
    state: Arc<EngineState>,
    rows: Vec<Vec<Value>>,
    /// Index of the current row; `None` before the first advance.
    current: Option<usize>,
    width: usize,
}

impl MemoryCursor {
    pub fn open(
        state: Arc<EngineState>,
        table: &TableInfo,
        split: &Split,
        columns: &[ColumnInfo],
        timestamp: SnapshotTimestamp,
    ) -> ClientResult<Self> {
        let projection = columns
            .iter()
            .map(|column| {
                table.column_index(&column.name).ok_or_else(|| {
                    ClientError::SchemaMismatch(format!(
                        "column '{}' not in table {}",
                        column.name, table.table_ref
                    ))
                })
            })
            .collect::<ClientResult<Vec<_>>>()?;

        let start = table_start(table.table_id);
        let end = table_end(table.table_id);
        let mut rows = Vec::new();
        {
            let data = state.data.read();
            for (key, versions) in data.range(start..end) {
                if !split.range.contains(key) {
                    continue;
                }
                let Some(value) = EngineState::visible(versions, timestamp) else {
                    continue;
                };
                let row: Row = serde_json::from_slice(value)?;
                let projected = row.project(&projection).ok_or_else(|| {
                    ClientError::SchemaMismatch(format!("stored row {row} is too narrow"))
                })?;
                rows.push(projected);
            }
        }

        Ok(Self {
            state,
            rows,
            current: None,
            width: columns.len(),
        })
    }
}

impl RecordCursor for MemoryCursor {
    fn advance(&mut self) -> ClientResult<bool> {
        let next = self.current.map_or(0, |i| i + 1);
        if next >= self.rows.len() {
            self.current = Some(self.rows.len());
            return Ok(false);
        }
        self.current = Some(next);
        Ok(true)
    }

    fn field_count(&self) -> usize {
        self.width
    }

    fn value(&self, index: usize) -> Option<&Value> {
        self.current
            .and_then(|row| self.rows.get(row))
            .and_then(|row| row.get(index))
    }

    fn close(&mut self) -> ClientResult<()> {
        self.rows.clear();
        self.state.stats.write().cursors_closed += 1;
        if self.state.faults.take_cursor_close() {
            return Err(ClientError::CloseFailed("injected cursor close failure".into()));
        }
        Ok(())
    }
}
