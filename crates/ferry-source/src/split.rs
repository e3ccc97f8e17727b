//! Split planning.

use ferry_client::{Session, Split};
use ferry_common::{SnapshotTimestamp, TableRef};
use tracing::info;

use crate::error::{SourceError, SourceResult};

/// Divides `table_ref` into at most `count` splits.
///
/// Every split carries the same default timestamp: `timestamp` if given,
/// otherwise a fresh one from the session clock, so readers of all splits
/// observe one consistent snapshot unless overridden.
pub fn plan_splits(
    session: &dyn Session,
    table_ref: &TableRef,
    count: usize,
    timestamp: Option<SnapshotTimestamp>,
) -> SourceResult<Vec<Split>> {
    let table = session
        .table_info(table_ref)
        .map_err(|e| SourceError::client("resolve table", e))?;
    let timestamp = match timestamp {
        Some(ts) => ts,
        None => session
            .current_timestamp()
            .map_err(|e| SourceError::client("obtain snapshot timestamp", e))?,
    };
    let ranges = session
        .key_ranges(&table, count)
        .map_err(|e| SourceError::client("divide key space", e))?;

    info!(table = %table_ref, splits = ranges.len(), timestamp = %timestamp, "planned splits");
    Ok(ranges
        .into_iter()
        .map(|range| Split::new(table_ref.clone(), range, timestamp))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_client::memory::MemoryEngine;
    use ferry_client::{ClientConfig, ColumnInfo, DataType, SessionFactory, TableInfo};

    #[test]
    fn test_plan_empty_table() {
        let engine = MemoryEngine::new();
        engine
            .create_table(TableInfo::new(
                TableRef::new("db", "t"),
                vec![ColumnInfo::new("c", DataType::Text)],
            ))
            .unwrap();
        let session = engine.create_session(&ClientConfig::new()).unwrap();

        let ts = SnapshotTimestamp::new(9, 0);
        let splits = plan_splits(session.as_ref(), &TableRef::new("db", "t"), 4, Some(ts)).unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].timestamp, ts);
        assert_eq!(splits[0].table_ref, TableRef::new("db", "t"));
    }

    #[test]
    fn test_plan_uses_session_clock() {
        let engine = MemoryEngine::new();
        engine
            .create_table(TableInfo::new(
                TableRef::new("db", "t"),
                vec![ColumnInfo::new("c", DataType::Text)],
            ))
            .unwrap();
        let before = engine.current_timestamp();
        let session = engine.create_session(&ClientConfig::new()).unwrap();

        let splits = plan_splits(session.as_ref(), &TableRef::new("db", "t"), 2, None).unwrap();
        assert!(splits.iter().all(|s| s.timestamp > before));
    }

    #[test]
    fn test_plan_unknown_table() {
        let engine = MemoryEngine::new();
        let session = engine.create_session(&ClientConfig::new()).unwrap();
        assert!(plan_splits(session.as_ref(), &TableRef::new("db", "nope"), 2, None).is_err());
    }
}
