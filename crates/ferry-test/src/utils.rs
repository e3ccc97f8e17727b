use std::sync::Arc;

use ferry_client::memory::MemoryEngine;
use ferry_client::{
    ClientConfig, ColumnInfo, DataType, IndexInfo, Row, SessionFactory, TableInfo,
};
use ferry_common::{SnapshotTimestamp, TableRef};
use ferry_source::{plan_splits, SnapshotReader};
use tracing_subscriber::EnvFilter;

/// Installs a test log subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to warnings from Ferry crates. Later calls
/// are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ferry_client=warn,ferry_sink=warn,ferry_source=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// `shop.orders`: integer primary key, rows stored under the key.
pub fn orders() -> TableRef {
    TableRef::new("shop", "orders")
}

/// `shop.events`: no primary key, rows stored under allocated row ids.
pub fn events() -> TableRef {
    TableRef::new("shop", "events")
}

/// `shop.customers`: composite key plus a unique email.
pub fn customers() -> TableRef {
    TableRef::new("shop", "customers")
}

/// Creates an engine with the fixture tables.
pub fn engine() -> MemoryEngine {
    let engine = MemoryEngine::new();
    let tables = [
        TableInfo::new(
            orders(),
            vec![
                ColumnInfo::new("id", DataType::BigInt).not_null(),
                ColumnInfo::new("item", DataType::Varchar(64)),
                ColumnInfo::new("qty", DataType::Int),
            ],
        )
        .with_primary_key(vec![0]),
        TableInfo::new(
            events(),
            vec![
                ColumnInfo::new("source", DataType::Varchar(32)),
                ColumnInfo::new("payload", DataType::Json),
            ],
        ),
        TableInfo::new(
            customers(),
            vec![
                ColumnInfo::new("region", DataType::Varchar(8)).not_null(),
                ColumnInfo::new("number", DataType::Int).not_null(),
                ColumnInfo::new("email", DataType::Varchar(128)),
            ],
        )
        .with_primary_key(vec![0, 1])
        .with_index(IndexInfo::new("uk_email", vec![2], true)),
    ];
    for table in tables {
        if let Err(e) = engine.create_table(table) {
            panic!("fixture table: {e}");
        }
    }
    engine
}

/// Returns the engine as a shared session factory.
pub fn factory(engine: &MemoryEngine) -> Arc<dyn SessionFactory> {
    Arc::new(engine.clone())
}

/// Reads a whole table through `splits` snapshot readers and returns the
/// rows in split order.
pub fn read_all(
    engine: &MemoryEngine,
    table: &TableRef,
    config: &ClientConfig,
    splits: usize,
    timestamp: Option<SnapshotTimestamp>,
) -> Vec<Row> {
    let mut session = match engine.create_session(config) {
        Ok(session) => session,
        Err(e) => panic!("planning session: {e}"),
    };
    let planned = match plan_splits(session.as_ref(), table, splits, timestamp) {
        Ok(planned) => planned,
        Err(e) => panic!("plan splits: {e}"),
    };
    let _ = session.close();

    let mut rows = Vec::new();
    for split in planned {
        let mut reader = SnapshotReader::new(factory(engine), config.clone(), split);
        loop {
            match reader.next_record() {
                Ok(Some(record)) => rows.push(Row::new(record.values().cloned().collect())),
                Ok(None) => break,
                Err(e) => panic!("read: {e}"),
            }
        }
        reader.close();
    }
    rows
}
