//! Table metadata as resolved from the storage engine.

use ferry_common::TableRef;
use serde::{Deserialize, Serialize};

use crate::value::DataType;

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,
    /// Engine type tag.
    pub data_type: DataType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl ColumnInfo {
    /// Creates a nullable column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Index information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Column indices in the index.
    pub columns: Vec<usize>,
    /// Whether the index is unique.
    pub unique: bool,
}

impl IndexInfo {
    /// Creates a new index.
    pub fn new(name: impl Into<String>, columns: Vec<usize>, unique: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
        }
    }
}

/// Information about a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Engine-assigned table id.
    pub table_id: u64,
    /// Qualified name.
    pub table_ref: TableRef,
    /// Columns in storage order.
    pub columns: Vec<ColumnInfo>,
    /// Primary key column indices.
    pub primary_key: Vec<usize>,
    /// Secondary indexes.
    pub indexes: Vec<IndexInfo>,
}

impl TableInfo {
    /// Creates a table with no keys.
    pub fn new(table_ref: TableRef, columns: Vec<ColumnInfo>) -> Self {
        Self {
            table_id: 0,
            table_ref,
            columns,
            primary_key: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Sets the primary key columns.
    pub fn with_primary_key(mut self, columns: Vec<usize>) -> Self {
        self.primary_key = columns;
        self
    }

    /// Adds an index.
    pub fn with_index(mut self, index: IndexInfo) -> Self {
        self.indexes.push(index);
        self
    }

    /// Sets the table id.
    pub fn with_table_id(mut self, id: u64) -> Self {
        self.table_id = id;
        self
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.table_ref.table
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the column used as the row handle.
    ///
    /// A table whose primary key is a single integer column stores rows
    /// under that value. Every other table stores rows under an implicit
    /// row id handed out by a row-id allocator.
    pub fn handle_column(&self) -> Option<usize> {
        match self.primary_key.as_slice() {
            [only] if self.columns.get(*only).is_some_and(|c| c.data_type.is_integer()) => {
                Some(*only)
            }
            _ => None,
        }
    }

    /// Returns true if rows need allocator-issued row ids.
    pub fn needs_row_ids(&self) -> bool {
        self.handle_column().is_none()
    }

    /// Returns every key whose values must be unique: the primary key
    /// first, then each unique index.
    pub fn unique_keys(&self) -> Vec<&[usize]> {
        let mut keys = Vec::with_capacity(1 + self.indexes.len());
        if !self.primary_key.is_empty() {
            keys.push(self.primary_key.as_slice());
        }
        keys.extend(
            self.indexes
                .iter()
                .filter(|index| index.unique)
                .map(|index| index.columns.as_slice()),
        );
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableInfo {
        TableInfo::new(
            TableRef::new("app", "users"),
            vec![
                ColumnInfo::new("id", DataType::BigInt).not_null(),
                ColumnInfo::new("email", DataType::Varchar(255)),
                ColumnInfo::new("name", DataType::Text),
            ],
        )
    }

    #[test]
    fn test_integer_primary_key_is_handle() {
        let table = users().with_primary_key(vec![0]);
        assert_eq!(table.handle_column(), Some(0));
        assert!(!table.needs_row_ids());
    }

    #[test]
    fn test_non_integer_key_needs_row_ids() {
        let table = users().with_primary_key(vec![1]);
        assert_eq!(table.handle_column(), None);
        assert!(table.needs_row_ids());

        let composite = users().with_primary_key(vec![0, 1]);
        assert!(composite.needs_row_ids());

        assert!(users().needs_row_ids());
    }

    #[test]
    fn test_unique_keys() {
        let table = users()
            .with_primary_key(vec![0])
            .with_index(IndexInfo::new("uk_email", vec![1], true))
            .with_index(IndexInfo::new("idx_name", vec![2], false));

        assert_eq!(table.unique_keys(), vec![&[0][..], &[1][..]]);
        assert_eq!(table.column_index("name"), Some(2));
        assert_eq!(table.name(), "users");
    }
}
