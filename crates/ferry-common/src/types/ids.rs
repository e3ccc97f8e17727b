//! Identifier types for Ferry.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FerryError, FerryResult};

/// Row identifier - the implicit handle of a row in a table without an
/// integer primary key.
///
/// Row ids are handed out by a row-id allocator in contiguous blocks and
/// are never reused within the lifetime of a table.
///
/// # Example
///
/// ```rust
/// use ferry_common::types::RowId;
///
/// let id = RowId::new(41);
/// assert_eq!(id.next().as_i64(), 42);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RowId(i64);

impl RowId {
    /// First row id handed out by a fresh table.
    pub const FIRST: Self = Self(1);

    /// Creates a new `RowId` from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_i64(self) -> i64 {
        self.0
    }

    /// Returns the next row id.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the id `step` positions after this one, or `None` on overflow.
    #[inline]
    #[must_use]
    pub const fn checked_add(self, step: u64) -> Option<Self> {
        match self.0.checked_add_unsigned(step) {
            Some(id) => Some(Self(id)),
            None => None,
        }
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RowId {
    #[inline]
    fn from(id: i64) -> Self {
        Self::new(id)
    }
}

impl From<RowId> for i64 {
    #[inline]
    fn from(id: RowId) -> Self {
        id.0
    }
}

/// A fully qualified table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    /// Database name.
    pub database: String,
    /// Table name.
    pub table: String,
}

impl TableRef {
    /// Creates a new table reference.
    #[must_use]
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
        }
    }

    /// Parses `database.table`.
    pub fn parse(value: &str) -> FerryResult<Self> {
        match value.split_once('.') {
            Some((database, table))
                if !database.is_empty() && !table.is_empty() && !table.contains('.') =>
            {
                Ok(Self::new(database, table))
            }
            _ => Err(FerryError::InvalidTableRef {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_id() {
        let id = RowId::new(10);
        assert_eq!(id.next(), RowId::new(11));
        assert_eq!(id.checked_add(5), Some(RowId::new(15)));
        assert_eq!(RowId::new(i64::MAX).checked_add(1), None);
        assert!(RowId::new(1) < RowId::new(2));
    }

    #[test]
    fn test_table_ref_parse() {
        let table = TableRef::parse("shop.orders").unwrap();
        assert_eq!(table.database, "shop");
        assert_eq!(table.table, "orders");
        assert_eq!(table.to_string(), "shop.orders");

        assert!(TableRef::parse("orders").is_err());
        assert!(TableRef::parse(".orders").is_err());
        assert!(TableRef::parse("a.b.c").is_err());
    }
}
