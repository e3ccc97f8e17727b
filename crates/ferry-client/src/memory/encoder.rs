//! Row encoding for the in-memory engine.

use bytes::Bytes;

use super::codec::encode_row_key;
use crate::allocator::RowIdAllocator;
use crate::error::{ClientError, ClientResult};
use crate::session::{KvPair, RowEncoder};
use crate::table::TableInfo;
use crate::value::Row;

/// Encodes rows as JSON values under handle-ordered keys.
#[derive(Debug)]
pub(crate) struct MemoryRowEncoder {
    table: TableInfo,
    handle_column: Option<usize>,
}

impl MemoryRowEncoder {
    pub fn new(table: TableInfo) -> Self {
        let handle_column = table.handle_column();
        Self {
            table,
            handle_column,
        }
    }

    fn handle(&self, row: &Row, allocator: &mut dyn RowIdAllocator) -> ClientResult<i64> {
        match self.handle_column {
            Some(column) => row
                .get(column)
                .and_then(|value| value.as_i64())
                .ok_or_else(|| {
                    ClientError::SchemaMismatch(format!(
                        "row {} has no integer handle in column {}",
                        row, self.table.columns[column].name
                    ))
                }),
            None => Ok(allocator.next()?.as_i64()),
        }
    }
}

impl RowEncoder for MemoryRowEncoder {
    fn encode(
        &mut self,
        rows: &[Row],
        allocator: &mut dyn RowIdAllocator,
    ) -> ClientResult<Vec<KvPair>> {
        let mut pairs = Vec::with_capacity(rows.len());
        for row in rows {
            if row.num_columns() != self.table.num_columns() {
                return Err(ClientError::SchemaMismatch(format!(
                    "table {} has {} columns, row has {}",
                    self.table.table_ref,
                    self.table.num_columns(),
                    row.num_columns()
                )));
            }
            let handle = self.handle(row, allocator)?;
            let key = encode_row_key(self.table.table_id, handle);
            let value = Bytes::from(serde_json::to_vec(row)?);
            pairs.push(KvPair { key, value });
        }
        Ok(pairs)
    }

    fn close(&mut self) -> ClientResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::codec::decode_handle;
    use crate::row;
    use crate::table::ColumnInfo;
    use crate::value::DataType;
    use ferry_common::{RowId, TableRef};

    struct Fixed(i64);

    impl RowIdAllocator for Fixed {
        fn next(&mut self) -> ClientResult<RowId> {
            self.0 += 1;
            Ok(RowId::new(self.0))
        }

        fn step(&self) -> u64 {
            1
        }
    }

    #[test]
    fn test_integer_primary_key_is_handle() {
        let table = TableInfo::new(
            TableRef::new("db", "t"),
            vec![
                ColumnInfo::new("id", DataType::BigInt).not_null(),
                ColumnInfo::new("name", DataType::Text),
            ],
        )
        .with_primary_key(vec![0])
        .with_table_id(5);

        let mut encoder = MemoryRowEncoder::new(table);
        let mut ids = Fixed(100);
        let pairs = encoder.encode(&[row![42, "x"]], &mut ids).unwrap();

        assert_eq!(decode_handle(&pairs[0].key), Some(42));
        // No id drawn.
        assert_eq!(ids.0, 100);
    }

    #[test]
    fn test_rows_without_handle_draw_ids() {
        let table = TableInfo::new(
            TableRef::new("db", "t"),
            vec![ColumnInfo::new("name", DataType::Text)],
        )
        .with_table_id(5);

        let mut encoder = MemoryRowEncoder::new(table);
        let mut ids = Fixed(0);
        let pairs = encoder.encode(&[row!["a"], row!["b"]], &mut ids).unwrap();

        let handles: Vec<_> = pairs.iter().map(|p| decode_handle(&p.key)).collect();
        assert_eq!(handles, vec![Some(1), Some(2)]);
        let decoded: Row = serde_json::from_slice(&pairs[1].value).unwrap();
        assert_eq!(decoded, row!["b"]);
    }
}
